//! Frame scheduler — отложенные single-shot задачи на том же simulation thread
//!
//! НЕ concurrent timer: задачи достаются tick-системой (`drain_due`) на более позднем кадре.
//! Каждая задача имеет `TaskToken`; `cancel` инвалидирует token синхронно,
//! отменённая задача уже никогда не сработает.

use bevy::prelude::*;

/// Cancellation token отложенной задачи (уникален на весь scheduler)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Reflect)]
pub struct TaskToken(u64);

#[derive(Debug, Clone)]
struct ScheduledTask<T> {
    token: TaskToken,
    due: f64,
    payload: T,
}

#[derive(Debug, Clone)]
pub struct FrameScheduler<T> {
    next_id: u64,
    tasks: Vec<ScheduledTask<T>>,
}

impl<T> Default for FrameScheduler<T> {
    fn default() -> Self {
        Self {
            next_id: 0,
            tasks: Vec::new(),
        }
    }
}

impl<T> FrameScheduler<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Запланировать задачу на время `due` (секунды симуляции)
    pub fn schedule(&mut self, due: f64, payload: T) -> TaskToken {
        let token = TaskToken(self.next_id);
        self.next_id += 1;
        self.tasks.push(ScheduledTask { token, due, payload });
        token
    }

    /// Отменить задачу. false — token уже сработал или отменён.
    pub fn cancel(&mut self, token: TaskToken) -> bool {
        let before = self.tasks.len();
        self.tasks.retain(|task| task.token != token);
        self.tasks.len() != before
    }

    pub fn is_pending(&self, token: TaskToken) -> bool {
        self.tasks.iter().any(|task| task.token == token)
    }

    /// Ближайшее время срабатывания
    pub fn next_due(&self) -> Option<f64> {
        self.tasks.iter().map(|task| task.due).reduce(f64::min)
    }

    /// Забрать все задачи с `due <= now` (по порядку due, при равенстве — по порядку schedule)
    pub fn drain_due(&mut self, now: f64) -> Vec<(TaskToken, T)> {
        let (mut due, pending): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.tasks).into_iter().partition(|task| task.due <= now);
        self.tasks = pending;

        due.sort_by(|a, b| a.due.total_cmp(&b.due).then(a.token.cmp(&b.token)));
        due.into_iter().map(|task| (task.token, task.payload)).collect()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}
