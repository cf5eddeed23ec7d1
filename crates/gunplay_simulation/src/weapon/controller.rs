//! Fire controller — Weapon aggregate + fire state machine
//!
//! States: Idle → Firing → (AutoReArmed | Idle), Reloading — из Firing при пустом магазине.
//!
//! Flow `try_fire(now)`:
//! 1. trigger отпущен → no-op (stale re-fire после release)
//! 2. gate отказал → diagnostic, Idle, без reschedule
//! 3. есть патрон → effects, hitscan, ammo, recoil kick, last_fire_time,
//!    full-auto: re-fire task на now + time_between_shots
//! 4. магазин пуст, запас есть → reload
//! 5. иначе → out of ammo
//!
//! Все неудачи — non-fatal: `FireOutcome` + лог, никаких panic.

use bevy::prelude::*;
use std::sync::Arc;

use super::accuracy::{adjusted_direction, SpreadSampler};
use super::ammo::{AmmoError, AmmoState};
use super::collaborators::{
    AimAccess, EffectsSink, HitscanProvider, HitscanResult, MontageRequest, VelocityProvider,
};
use super::config::{FiringMode, WeaponConfig};
use super::fire_rate::can_fire_again;
use super::recoil::{AimRotation, RecoilState};
use super::schedule::{FrameScheduler, TaskToken};
use crate::logger;

/// Scheduler re-fire задач: payload — weapon entity
pub type RefireScheduler = FrameScheduler<Entity>;

/// Состояние fire state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Reflect)]
pub enum FireState {
    #[default]
    Idle,
    /// Выстрел в процессе (внутри `try_fire`)
    Firing,
    /// Full-auto: re-fire task взведена
    AutoReArmed,
    /// Reload в процессе (внутри `try_fire`)
    Reloading,
}

/// Тайминг огня
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct FireTiming {
    /// None — ещё не стреляли (gate открыт)
    pub last_fire_time: Option<f64>,
    /// Token взведённой re-fire задачи
    pub pending_refire: Option<TaskToken>,
    pub trigger_held: bool,
}

impl FireTiming {
    pub fn auto_fire_armed(&self) -> bool {
        self.pending_refire.is_some()
    }
}

/// Отчёт о выстреле
#[derive(Debug, Clone, PartialEq)]
pub struct ShotReport {
    pub fired_at: f64,
    pub origin: Vec3,
    pub direction: Vec3,
    pub hit: HitscanResult,
    pub damage: f32,
    /// Kick, реально применённый к aim (None — aim не тронут)
    pub recoil: Option<AimRotation>,
}

/// Результат попытки выстрела
#[derive(Debug, Clone, PartialEq)]
pub enum FireOutcome {
    Fired(ShotReport),
    /// Trigger не зажат
    TriggerReleased,
    /// Rate-of-fire gate не пропустил
    Gated { elapsed: f64 },
    Reloaded { loaded: u32 },
    ReloadRejected,
    OutOfAmmo,
}

impl FireOutcome {
    pub fn is_fired(&self) -> bool {
        matches!(self, FireOutcome::Fired(_))
    }
}

/// Всё внешнее, что нужно выстрелу
///
/// `aim` и `velocity` опциональны: без aim нет recoil, без velocity нет movement penalty.
pub struct FireContext<'a> {
    pub aim: Option<&'a mut dyn AimAccess>,
    pub velocity: Option<&'a dyn VelocityProvider>,
    pub hitscan: &'a mut dyn HitscanProvider,
    pub effects: &'a mut dyn EffectsSink,
    pub spread: &'a mut dyn SpreadSampler,
    /// Начало луча (глаза стрелка)
    pub eye_position: Vec3,
    /// Transform дула для muzzle effects
    pub muzzle: Transform,
}

/// Оружие: config (shared, read-only) + эксклюзивный runtime state
#[derive(Component, Debug, Clone)]
pub struct Weapon {
    config: Arc<WeaponConfig>,
    pub ammo: AmmoState,
    pub recoil: RecoilState,
    pub timing: FireTiming,
    pub state: FireState,
    /// Non-owning ссылка на стрелка
    wielder: Option<Entity>,
}

impl Weapon {
    /// Новое оружие: полный магазин, без отдачи, Idle
    pub fn new(config: Arc<WeaponConfig>) -> Self {
        Self {
            ammo: AmmoState::full(&config),
            recoil: RecoilState::default(),
            timing: FireTiming::default(),
            state: FireState::Idle,
            wielder: None,
            config,
        }
    }

    pub fn from_config(config: WeaponConfig) -> Self {
        Self::new(Arc::new(config))
    }

    pub fn config(&self) -> &WeaponConfig {
        &self.config
    }

    pub fn shared_config(&self) -> Arc<WeaponConfig> {
        Arc::clone(&self.config)
    }

    pub fn wielder(&self) -> Option<Entity> {
        self.wielder
    }

    /// Прикрепить к стрелку (он читает/пишет aim и даёт velocity)
    pub fn attach_to(&mut self, wielder: Entity) {
        self.wielder = Some(wielder);
    }

    pub fn detach(&mut self) {
        self.wielder = None;
    }

    /// Input edge: trigger нажат
    pub fn press_trigger(
        &mut self,
        weapon: Entity,
        now: f64,
        ctx: &mut FireContext,
        scheduler: &mut RefireScheduler,
    ) -> FireOutcome {
        self.timing.trigger_held = true;
        self.try_fire(weapon, now, ctx, scheduler)
    }

    /// Input edge: trigger отпущен. Синхронно отменяет re-fire. true — задача была взведена.
    pub fn release_trigger(&mut self, scheduler: &mut RefireScheduler) -> bool {
        self.timing.trigger_held = false;
        let cancelled = self.cancel_refire(scheduler);
        if self.state == FireState::AutoReArmed {
            self.state = FireState::Idle;
        }
        cancelled
    }

    /// Re-fire task сработала. Чужой/отменённый token игнорируется (None).
    pub fn on_refire_due(
        &mut self,
        token: TaskToken,
        weapon: Entity,
        now: f64,
        ctx: &mut FireContext,
        scheduler: &mut RefireScheduler,
    ) -> Option<FireOutcome> {
        if self.timing.pending_refire != Some(token) {
            logger::log(&format!("Stale re-fire task {:?} for weapon {:?} ignored", token, weapon));
            return None;
        }

        self.timing.pending_refire = None;
        self.state = FireState::Idle;
        Some(self.try_fire(weapon, now, ctx, scheduler))
    }

    /// Re-fire task уже снята со scheduler'а, но выстрела не будет (стрелка нет).
    /// Очередь обрывается; trigger_held не трогаем. true — token был текущим.
    pub fn abandon_refire(&mut self, token: TaskToken) -> bool {
        if self.timing.pending_refire != Some(token) {
            return false;
        }

        self.timing.pending_refire = None;
        if self.state == FireState::AutoReArmed {
            self.state = FireState::Idle;
        }
        true
    }

    /// Один выстрел если можно, иначе reload
    pub fn try_fire(
        &mut self,
        weapon: Entity,
        now: f64,
        ctx: &mut FireContext,
        scheduler: &mut RefireScheduler,
    ) -> FireOutcome {
        if !self.timing.trigger_held {
            return FireOutcome::TriggerReleased;
        }

        if let Some(last) = self.timing.last_fire_time {
            if !can_fire_again(
                now,
                last,
                self.config.time_between_shots,
                self.config.rate_of_fire_forgiveness,
            ) {
                let elapsed = now - last;
                logger::log_warning(&format!(
                    "Weapon {:?}: elapsed time since last shot is {:.6}s (< {}s), shot dropped",
                    weapon, elapsed, self.config.time_between_shots
                ));
                self.state = FireState::Idle;
                return FireOutcome::Gated { elapsed };
            }
        }

        if self.ammo.has_round_chambered() {
            return FireOutcome::Fired(self.fire_shot(weapon, now, ctx, scheduler));
        }

        if self.ammo.rounds_total > 0 {
            logger::log_warning(&format!(
                "Weapon {:?}: magazine empty but {} rounds in reserve, reloading",
                weapon, self.ammo.rounds_total
            ));
            self.state = FireState::Reloading;
            let outcome = match self.reload(scheduler) {
                Ok(loaded) => FireOutcome::Reloaded { loaded },
                Err(_) => FireOutcome::ReloadRejected,
            };
            self.state = FireState::Idle;
            return outcome;
        }

        logger::log_warning(&format!("Weapon {:?}: cannot fire, completely out of ammo", weapon));
        self.state = FireState::Idle;
        FireOutcome::OutOfAmmo
    }

    /// Reload магазина; успешный reload отменяет взведённый re-fire
    pub fn reload(&mut self, scheduler: &mut RefireScheduler) -> Result<u32, AmmoError> {
        match self.ammo.reload() {
            Ok(loaded) => {
                logger::log_info(&format!(
                    "Magazine reloaded: +{} ({}/{}, {} total)",
                    loaded, self.ammo.rounds_in_magazine, self.ammo.magazine_capacity, self.ammo.rounds_total
                ));
                self.cancel_refire(scheduler);
                if self.state == FireState::AutoReArmed {
                    self.state = FireState::Idle;
                }
                Ok(loaded)
            }
            Err(err) => {
                logger::log_warning(&format!("Unable to reload: {}", err));
                Err(err)
            }
        }
    }

    /// Направление выстрела до spread: view + невосстановленная отдача
    ///
    /// Пока идёт compensation, пуля уходит на offset дальше прицела
    /// (не двигая мышь, игрок видит попадания "выше" крестика).
    pub fn aim_direction(&self, view: AimRotation) -> Vec3 {
        let aim = if self.recoil.is_compensating {
            view + self.recoil.total_offset_added
        } else {
            view
        };
        aim.forward()
    }

    /// Frame tick: refresh compensating → recovery → pattern decay (порядок важен)
    pub fn tick(&mut self, delta: f32, mut aim: Option<&mut (dyn AimAccess + '_)>) {
        self.recoil.refresh_compensating();
        self.recoil
            .recover_step(delta, self.config.recoil_recovery_rate, aim.as_deref_mut());
        self.recoil
            .decay_pattern_progress(&self.config, self.timing.trigger_held);
    }

    fn fire_shot(
        &mut self,
        weapon: Entity,
        now: f64,
        ctx: &mut FireContext,
        scheduler: &mut RefireScheduler,
    ) -> ShotReport {
        self.state = FireState::Firing;
        let config = Arc::clone(&self.config);

        ctx.effects.play_fire_effects(&ctx.muzzle);
        if let (Some(montage), Some(play_rate)) = (&config.fire_montage, config.montage_play_rate()) {
            ctx.effects.play_montage(&MontageRequest {
                name: montage.name.clone(),
                play_rate,
                section: montage.section.clone(),
            });
        }

        let view = match ctx.aim.as_deref() {
            Some(aim) => aim.view_rotation(),
            None => AimRotation::ZERO,
        };
        let speed = ctx.velocity.map(|velocity| velocity.speed()).unwrap_or(0.0);
        let direction = adjusted_direction(
            self.aim_direction(view),
            config.no_spread,
            config.first_shot_base_spread,
            config.movement_spread_penalty,
            speed,
            &mut *ctx.spread,
        );
        let hit = ctx.hitscan.cast(ctx.eye_position, direction, config.max_range);

        if !config.unlimited_ammo {
            if let Err(err) = self.ammo.consume_round() {
                logger::log_warning(&format!("Weapon {:?}: {}", weapon, err));
            }
        }

        let recoil = self.recoil.on_shot_fired(&config, ctx.aim.as_deref_mut());
        self.timing.last_fire_time = Some(now);

        match config.firing_mode {
            FiringMode::FullAuto => {
                self.cancel_refire(scheduler);
                let token = scheduler.schedule(now + config.time_between_shots, weapon);
                self.timing.pending_refire = Some(token);
                self.state = FireState::AutoReArmed;
            }
            FiringMode::SemiAuto => {
                self.state = FireState::Idle;
            }
        }

        ShotReport {
            fired_at: now,
            origin: ctx.eye_position,
            direction,
            hit,
            damage: config.base_damage,
            recoil,
        }
    }

    fn cancel_refire(&mut self, scheduler: &mut RefireScheduler) -> bool {
        match self.timing.pending_refire.take() {
            Some(token) => scheduler.cancel(token),
            None => false,
        }
    }
}
