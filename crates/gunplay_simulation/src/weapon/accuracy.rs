//! Accuracy model — разброс направления выстрела
//!
//! effective_spread = base_spread + speed * movement_penalty (clamp ≥ 0),
//! направление — равномерно внутри конуса с half-angle effective_spread.
//!
//! Источник случайности — `SpreadSampler`: в симуляции seeded ChaCha8,
//! в тестах фиксированный sample.

use bevy::prelude::*;
use rand::Rng;
use rand_chacha::ChaCha8Rng;
use std::f32::consts::TAU;

/// Пара равномерных чисел в [0, 1) для выбора точки в конусе
pub trait SpreadSampler {
    fn next_unit_pair(&mut self) -> (f32, f32);
}

impl SpreadSampler for ChaCha8Rng {
    fn next_unit_pair(&mut self) -> (f32, f32) {
        (self.gen::<f32>(), self.gen::<f32>())
    }
}

/// Фиксированный sample (детерминированное направление)
///
/// `(0.0, _)` → ось конуса без отклонения, `(1.0, phi)` → край конуса.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedSpread {
    pub deviation: f32,
    pub around: f32,
}

impl FixedSpread {
    /// Всегда ровно по оси
    pub const CENTER: Self = Self { deviation: 0.0, around: 0.0 };
}

impl SpreadSampler for FixedSpread {
    fn next_unit_pair(&mut self) -> (f32, f32) {
        (self.deviation, self.around)
    }
}

/// Spread с учётом движения (радианы, никогда не отрицательный)
pub fn effective_spread(base_spread: f32, movement_penalty: f32, mover_speed: f32) -> f32 {
    (base_spread + mover_speed * movement_penalty).max(0.0)
}

/// Равномерная точка на сферическом сегменте вокруг `axis`
///
/// `deviation` выбирает cos угла в [cos(half_angle), 1], `around` — азимут.
pub fn random_cone(axis: Vec3, half_angle: f32, deviation: f32, around: f32) -> Vec3 {
    let axis = axis.try_normalize().unwrap_or(Vec3::NEG_Z);
    if half_angle <= 0.0 {
        return axis;
    }

    let cos_max = half_angle.min(std::f32::consts::PI).cos();
    let cos_theta = 1.0 - deviation.clamp(0.0, 1.0) * (1.0 - cos_max);
    let sin_theta = (1.0 - cos_theta * cos_theta).max(0.0).sqrt();
    let phi = around * TAU;

    // Локальный конус вокруг +Z, потом поворот на axis
    let local = Vec3::new(sin_theta * phi.cos(), sin_theta * phi.sin(), cos_theta);
    (Quat::from_rotation_arc(Vec3::Z, axis) * local).normalize()
}

/// Направление выстрела с разбросом
pub fn adjusted_direction(
    base_direction: Vec3,
    no_spread_cheat: bool,
    base_spread: f32,
    movement_penalty: f32,
    mover_speed: f32,
    sampler: &mut dyn SpreadSampler,
) -> Vec3 {
    if no_spread_cheat {
        return base_direction;
    }

    let spread = effective_spread(base_spread, movement_penalty, mover_speed);
    let (deviation, around) = sampler.next_unit_pair();

    random_cone(base_direction, spread, deviation, around)
}
