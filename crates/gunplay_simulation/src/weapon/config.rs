//! Weapon tuning data (immutable per weapon instance)
//!
//! Архитектура:
//! - WeaponConfig грузится ОДИН раз (RON или preset), валидируется, шарится через Arc
//! - Runtime state (ammo, recoil, timing) живёт в `Weapon`, не здесь
//! - Recoil policy: fixed kick ИЛИ curve-driven pattern (одна enum, две стратегии)

use bevy::prelude::*;
use bevy_math::curve::{Curve, UnevenSampleAutoCurve};
use serde::Deserialize;
use thiserror::Error;

use super::recoil::AimRotation;

/// Ошибки загрузки/валидации weapon config
#[derive(Debug, Error)]
pub enum WeaponConfigError {
    #[error("failed to parse weapon config: {0}")]
    Parse(#[from] ron::error::SpannedError),

    #[error("time_between_shots must be finite and > 0 (got {0})")]
    InvalidTimeBetweenShots(f64),

    #[error("{field} must be finite and >= 0 (got {value})")]
    NegativeValue { field: &'static str, value: f64 },

    #[error("recoil pattern needs at least 2 keys with finite times (got {keys})")]
    InvalidRecoilPattern { keys: usize },
}

/// Тип оружия (для анимаций и presets)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Reflect)]
pub enum WeaponType {
    Rifle,
    Pistol,
}

/// Режим огня
///
/// SemiAuto — один выстрел на нажатие, FullAuto — re-fire пока trigger зажат.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Reflect)]
pub enum FiringMode {
    SemiAuto,
    FullAuto,
}

/// Ключ recoil pattern: progress (0..1) → recoil vector (x = yaw, y = pitch), градусы
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
pub struct RecoilPatternKey {
    pub time: f32,
    pub x: f32,
    pub y: f32,
}

/// Recoil pattern — кривая по normalized progress
///
/// Между ключами линейная интерполяция, за пределами domain — clamp к крайним ключам.
#[derive(Debug, Clone, Deserialize)]
#[serde(try_from = "Vec<RecoilPatternKey>")]
pub struct RecoilPattern {
    keys: Vec<RecoilPatternKey>,
    curve: UnevenSampleAutoCurve<Vec2>,
}

impl RecoilPattern {
    pub fn new(keys: Vec<RecoilPatternKey>) -> Result<Self, WeaponConfigError> {
        let curve = UnevenSampleAutoCurve::new(keys.iter().map(|key| (key.time, Vec2::new(key.x, key.y))))
            .map_err(|_| WeaponConfigError::InvalidRecoilPattern { keys: keys.len() })?;

        Ok(Self { keys, curve })
    }

    /// Recoil vector для progress в [0, 1] (вне диапазона — clamp)
    pub fn sample(&self, progress: f32) -> Vec2 {
        let progress = if progress.is_finite() { progress.clamp(0.0, 1.0) } else { 0.0 };
        self.curve.sample_clamped(progress)
    }

    pub fn keys(&self) -> &[RecoilPatternKey] {
        &self.keys
    }
}

impl TryFrom<Vec<RecoilPatternKey>> for RecoilPattern {
    type Error = WeaponConfigError;

    fn try_from(keys: Vec<RecoilPatternKey>) -> Result<Self, Self::Error> {
        Self::new(keys)
    }
}

/// Стратегия отдачи
#[derive(Debug, Clone, Deserialize)]
pub enum RecoilPolicy {
    /// Константный kick на каждый выстрел
    FixedKick(AimRotation),
    /// Kick берётся из pattern по накопленному progress
    Pattern(RecoilPattern),
}

/// Firing montage (анимация выстрела, проигрывается внешним effects sink)
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct FireMontage {
    pub name: String,
    /// Длина клипа (секунды) — play rate подгоняется под fire rate
    pub clip_length: f32,
    pub section: String,
}

/// Полный набор weapon tuning values
///
/// `#[serde(default)]` — RON может переопределять только нужные поля поверх rifle preset.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct WeaponConfig {
    pub weapon_type: WeaponType,
    pub firing_mode: FiringMode,

    /// Базовый урон за выстрел
    pub base_damage: f32,

    pub magazine_capacity: u32,
    /// Сколько патронов у оружия при spawn (включая магазин)
    pub starting_reserve: u32,

    /// Период огня (секунды), f = 1/T. 0.1 → 600 RPM
    pub time_between_shots: f64,
    /// Допуск на jitter scheduler'а при periodic re-fire
    pub rate_of_fire_forgiveness: f64,

    /// Cheat: патроны не тратятся
    pub unlimited_ammo: bool,

    // === Accuracy ===
    /// Half-angle конуса разброса первого выстрела (радианы)
    pub first_shot_base_spread: f32,
    /// Добавка к spread за единицу скорости стрелка
    pub movement_spread_penalty: f32,
    /// Cheat: без разброса
    pub no_spread: bool,

    // === Recoil ===
    pub recoil: RecoilPolicy,
    /// Скорость возврата прицела (градусы/сек)
    pub recoil_recovery_rate: f32,
    /// Верхняя граница pattern progress accumulator
    pub pattern_progress_bound: f32,

    // === Hitscan ===
    pub max_range: f32,

    pub fire_montage: Option<FireMontage>,
}

impl Default for WeaponConfig {
    fn default() -> Self {
        Self::rifle()
    }
}

impl WeaponConfig {
    pub const DEFAULT_FORGIVENESS: f64 = 1e-4;
    pub const DEFAULT_PATTERN_BOUND: f32 = 3.0;
    pub const DEFAULT_MAX_RANGE: f32 = 3000.0;

    /// Автомат: 600 RPM, магазин 30, curve-driven recoil
    pub fn rifle() -> Self {
        Self {
            weapon_type: WeaponType::Rifle,
            firing_mode: FiringMode::FullAuto,
            base_damage: 25.0,
            magazine_capacity: 30,
            starting_reserve: 120,
            time_between_shots: 0.1,
            rate_of_fire_forgiveness: Self::DEFAULT_FORGIVENESS,
            unlimited_ammo: false,
            first_shot_base_spread: 0.005,
            movement_spread_penalty: 0.00025,
            no_spread: false,
            recoil: RecoilPolicy::Pattern(rifle_recoil_pattern()),
            recoil_recovery_rate: 20.0,
            pattern_progress_bound: Self::DEFAULT_PATTERN_BOUND,
            max_range: Self::DEFAULT_MAX_RANGE,
            fire_montage: Some(FireMontage {
                name: "FiringWeapon".to_string(),
                clip_length: 0.25,
                section: "Firing_Standing".to_string(),
            }),
        }
    }

    /// Пистолет: semi-auto, fixed pitch kick
    pub fn pistol() -> Self {
        Self {
            weapon_type: WeaponType::Pistol,
            firing_mode: FiringMode::SemiAuto,
            base_damage: 20.0,
            magazine_capacity: 12,
            starting_reserve: 48,
            time_between_shots: 0.2,
            recoil: RecoilPolicy::FixedKick(AimRotation::new(2.0, 0.0)),
            recoil_recovery_rate: 15.0,
            first_shot_base_spread: 0.01,
            ..Self::rifle()
        }
    }

    /// Загрузка из RON + валидация
    ///
    /// ```ignore
    /// let config = WeaponConfig::from_ron("(magazine_capacity: 20, firing_mode: SemiAuto)")?;
    /// ```
    pub fn from_ron(source: &str) -> Result<Self, WeaponConfigError> {
        let config: Self = ron::from_str(source)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), WeaponConfigError> {
        if !self.time_between_shots.is_finite() || self.time_between_shots <= 0.0 {
            return Err(WeaponConfigError::InvalidTimeBetweenShots(self.time_between_shots));
        }

        let non_negative = [
            ("rate_of_fire_forgiveness", self.rate_of_fire_forgiveness),
            ("first_shot_base_spread", self.first_shot_base_spread as f64),
            ("recoil_recovery_rate", self.recoil_recovery_rate as f64),
            ("pattern_progress_bound", self.pattern_progress_bound as f64),
            ("max_range", self.max_range as f64),
        ];

        for (field, value) in non_negative {
            if !value.is_finite() || value < 0.0 {
                return Err(WeaponConfigError::NegativeValue { field, value });
            }
        }

        Ok(())
    }

    /// Длительность полного pattern (весь магазин очередью), секунды
    pub fn pattern_duration(&self) -> f32 {
        self.magazine_capacity as f32 * self.time_between_shots as f32
    }

    /// Play rate montage: клип растягивается/сжимается под период огня
    pub fn montage_play_rate(&self) -> Option<f32> {
        self.fire_montage
            .as_ref()
            .map(|montage| montage.clip_length / self.time_between_shots as f32)
    }
}

/// Climb вверх с покачиванием по yaw (градусы на выстрел)
fn rifle_recoil_pattern() -> RecoilPattern {
    let keys = vec![
        RecoilPatternKey { time: 0.0, x: 0.0, y: 0.6 },
        RecoilPatternKey { time: 0.25, x: 0.3, y: 0.8 },
        RecoilPatternKey { time: 0.5, x: -0.4, y: 0.9 },
        RecoilPatternKey { time: 0.75, x: 0.5, y: 0.7 },
        RecoilPatternKey { time: 1.0, x: -0.2, y: 0.5 },
    ];

    RecoilPattern::new(keys).expect("built-in rifle pattern has 5 finite keys")
}
