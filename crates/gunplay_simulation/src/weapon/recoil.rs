//! Recoil engine — отдача и её восстановление
//!
//! Flow:
//! 1. Выстрел → `on_shot_fired`: kick добавляется в view rotation И в `total_offset_added`
//! 2. Каждый tick → `refresh_compensating` → `recover_step` → `decay_pattern_progress`
//!    (порядок важен: recover читает флаг, выставленный refresh'ем ДО него)
//!
//! Recovery идёт с постоянной угловой скоростью (не exponential decay):
//! прицел возвращается к pre-recoil aim одинаково быстро независимо от величины offset.
//!
//! View rotation пишется ТОЛЬКО если aim accessor — local authority.

use bevy::prelude::*;
use serde::Deserialize;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};

use super::collaborators::AimAccess;
use super::config::{RecoilPolicy, WeaponConfig};
use crate::logger;

/// Pitch/yaw rotation в градусах (roll для прицела не нужен)
#[derive(Debug, Clone, Copy, Default, PartialEq, Deserialize, Reflect)]
pub struct AimRotation {
    pub pitch: f32,
    pub yaw: f32,
}

impl AimRotation {
    pub const ZERO: Self = Self { pitch: 0.0, yaw: 0.0 };

    pub const fn new(pitch: f32, yaw: f32) -> Self {
        Self { pitch, yaw }
    }

    /// Recoil vector из pattern: x → yaw, y → pitch
    pub fn from_recoil_vector(vector: Vec2) -> Self {
        Self::new(vector.y, vector.x)
    }

    /// Точный ноль (без tolerance)
    pub fn is_zero(&self) -> bool {
        self.pitch == 0.0 && self.yaw == 0.0
    }

    pub fn is_nearly_zero(&self, tolerance: f32) -> bool {
        self.pitch.abs() <= tolerance && self.yaw.abs() <= tolerance
    }

    /// Углы в диапазон (-180, 180]
    pub fn normalized(&self) -> Self {
        Self::new(normalize_axis(self.pitch), normalize_axis(self.yaw))
    }

    pub fn to_quat(&self) -> Quat {
        Quat::from_euler(
            EulerRot::YXZ,
            self.yaw.to_radians(),
            self.pitch.to_radians(),
            0.0,
        )
    }

    /// Направление взгляда (-Z forward, +Y up; положительный pitch — вверх)
    pub fn forward(&self) -> Vec3 {
        self.to_quat() * Vec3::NEG_Z
    }
}

impl Add for AimRotation {
    type Output = Self;

    fn add(self, rhs: Self) -> Self {
        Self::new(self.pitch + rhs.pitch, self.yaw + rhs.yaw)
    }
}

impl Sub for AimRotation {
    type Output = Self;

    fn sub(self, rhs: Self) -> Self {
        Self::new(self.pitch - rhs.pitch, self.yaw - rhs.yaw)
    }
}

impl Neg for AimRotation {
    type Output = Self;

    fn neg(self) -> Self {
        Self::new(-self.pitch, -self.yaw)
    }
}

impl AddAssign for AimRotation {
    fn add_assign(&mut self, rhs: Self) {
        *self = *self + rhs;
    }
}

impl SubAssign for AimRotation {
    fn sub_assign(&mut self, rhs: Self) {
        *self = *self - rhs;
    }
}

fn normalize_axis(angle: f32) -> f32 {
    // В диапазоне — без арифметики, иначе теряем младшие биты малых отрицательных углов
    if angle > -180.0 && angle <= 180.0 {
        return angle;
    }

    let wrapped = angle.rem_euclid(360.0);
    if wrapped > 180.0 {
        wrapped - 360.0
    } else {
        wrapped
    }
}

pub const INTERP_SNAP_TOLERANCE: f32 = 1e-4;

/// Движение от `current` к `target` с постоянной скоростью (градусы/сек)
///
/// Шаг по каждой оси clamp'ится в `speed * delta`, поэтому target никогда не перелетаем.
/// `speed <= 0` → сразу target. Остаток меньше `INTERP_SNAP_TOLERANCE` → target.
pub fn interp_constant_to(current: AimRotation, target: AimRotation, delta: f32, speed: f32) -> AimRotation {
    if delta == 0.0 || current == target {
        return current;
    }

    if speed <= 0.0 {
        return target;
    }

    let max_step = speed * delta;
    let delta_move = (target - current).normalized();

    let result = AimRotation::new(
        current.pitch + delta_move.pitch.clamp(-max_step, max_step),
        current.yaw + delta_move.yaw.clamp(-max_step, max_step),
    )
    .normalized();

    if (target - result).normalized().is_nearly_zero(INTERP_SNAP_TOLERANCE) {
        return target;
    }

    result
}

/// Recoil state оружия
///
/// Инварианты:
/// - `is_compensating == !total_offset_added.is_zero()` после `refresh_compensating`
/// - `0 ≤ pattern_progress ≤ pattern_progress_bound`
#[derive(Debug, Clone, Copy, Default, PartialEq, Reflect)]
pub struct RecoilState {
    /// Накопленная и ещё не восстановленная отдача
    pub total_offset_added: AimRotation,

    /// Где мы в recoil pattern (секунды стрельбы, растёт на выстрел, падает в idle)
    pub pattern_progress: f32,

    /// Derived: есть что восстанавливать
    pub is_compensating: bool,
}

impl RecoilState {
    /// Progress как доля полного pattern (магазин очередью), clamp [0, 1]
    pub fn pattern_fraction(&self, config: &WeaponConfig) -> f32 {
        let duration = config.pattern_duration();
        if duration <= 0.0 {
            return 0.0;
        }

        (self.pattern_progress / duration).clamp(0.0, 1.0)
    }

    /// Сколько отдачи даст следующий kick при текущем progress
    pub fn recoil_to_add(&self, config: &WeaponConfig) -> AimRotation {
        match &config.recoil {
            RecoilPolicy::FixedKick(kick) => *kick,
            RecoilPolicy::Pattern(pattern) => {
                AimRotation::from_recoil_vector(pattern.sample(self.pattern_fraction(config)))
            }
        }
    }

    /// Kick на выстрел
    ///
    /// Pattern policy сначала двигает progress на `time_between_shots`.
    /// Возвращает применённый kick (None — aim не тронут: нет accessor или не local authority).
    pub fn on_shot_fired(
        &mut self,
        config: &WeaponConfig,
        aim: Option<&mut (dyn AimAccess + '_)>,
    ) -> Option<AimRotation> {
        if matches!(config.recoil, RecoilPolicy::Pattern(_)) {
            self.pattern_progress = (self.pattern_progress + config.time_between_shots as f32)
                .clamp(0.0, config.pattern_progress_bound);
        }

        let Some(aim) = aim else {
            logger::log_warning("Recoil skipped: weapon has no aim accessor");
            return None;
        };

        if !aim.is_local_authority() {
            return None;
        }

        let kick = self.recoil_to_add(config);
        let view = aim.view_rotation();
        aim.set_view_rotation(view + kick);
        self.total_offset_added += kick;

        Some(kick)
    }

    /// Tick: флаг compensating из текущего offset
    pub fn refresh_compensating(&mut self) {
        self.is_compensating = !self.total_offset_added.is_zero();
    }

    /// Tick: возврат прицела
    ///
    /// Не compensating → offset принудительно в точный ноль (без float drift).
    /// Возвращает compensation, вычтенную из view в этот tick.
    pub fn recover_step(
        &mut self,
        delta: f32,
        recovery_rate: f32,
        aim: Option<&mut (dyn AimAccess + '_)>,
    ) -> AimRotation {
        if !self.is_compensating {
            self.total_offset_added = AimRotation::ZERO;
            return AimRotation::ZERO;
        }

        let Some(aim) = aim else {
            return AimRotation::ZERO;
        };

        if !aim.is_local_authority() {
            return AimRotation::ZERO;
        }

        let compensation =
            interp_constant_to(AimRotation::ZERO, self.total_offset_added, delta, recovery_rate);

        let view = aim.view_rotation();
        aim.set_view_rotation(view - compensation);
        self.total_offset_added -= compensation;

        compensation
    }

    /// Tick: пока trigger отпущен, pattern откатывается к началу
    ///
    /// Шаг `time_between_shots²` за tick; пока trigger зажат — progress заморожен.
    pub fn decay_pattern_progress(&mut self, config: &WeaponConfig, trigger_held: bool) {
        if trigger_held {
            return;
        }

        let tbs = config.time_between_shots as f32;
        self.pattern_progress =
            (self.pattern_progress - tbs * tbs).clamp(0.0, config.pattern_progress_bound);
    }
}
