//! Внешние collaborators weapon core
//!
//! Core НЕ делает ray cast, не играет звук/партиклы/анимации и не владеет камерой.
//! Всё это — узкие traits, реализуемые engine layer (или test doubles):
//! - HitscanProvider: ray cast origin + direction + range → hit
//! - EffectsSink: muzzle flash/sound + firing montage (fire-and-forget)
//! - AimAccess: view rotation стрелка (+ проверка local authority)
//! - VelocityProvider: скорость стрелка для accuracy model

use bevy::prelude::*;

use super::recoil::AimRotation;

/// Результат hitscan
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct HitscanResult {
    pub hit: bool,
    /// Точка попадания (или конец луча если промах)
    pub location: Vec3,
}

impl HitscanResult {
    pub fn miss(origin: Vec3, direction: Vec3, max_range: f32) -> Self {
        Self {
            hit: false,
            location: origin + direction * max_range,
        }
    }

    pub fn hit_at(location: Vec3) -> Self {
        Self { hit: true, location }
    }
}

/// Ray cast против world geometry
pub trait HitscanProvider {
    fn cast(&mut self, origin: Vec3, direction: Vec3, max_range: f32) -> HitscanResult;
}

/// Hitscan без геометрии: всегда промах (headless default)
#[derive(Debug, Clone, Copy, Default)]
pub struct NoHitscan;

impl HitscanProvider for NoHitscan {
    fn cast(&mut self, origin: Vec3, direction: Vec3, max_range: f32) -> HitscanResult {
        HitscanResult::miss(origin, direction, max_range)
    }
}

/// Запрос на проигрывание firing montage
#[derive(Debug, Clone, PartialEq)]
pub struct MontageRequest {
    pub name: String,
    pub play_rate: f32,
    pub section: String,
}

/// Звук/партиклы/анимация выстрела
pub trait EffectsSink {
    /// Muzzle flash + fire sound в точке дула
    fn play_fire_effects(&mut self, muzzle: &Transform);

    fn play_montage(&mut self, request: &MontageRequest);
}

/// Effects sink, который всё игнорирует
#[derive(Debug, Clone, Copy, Default)]
pub struct NullEffects;

impl EffectsSink for NullEffects {
    fn play_fire_effects(&mut self, _muzzle: &Transform) {}

    fn play_montage(&mut self, _request: &MontageRequest) {}
}

/// Доступ к view rotation контроллера стрелка
///
/// Recoil пишет в aim ТОЛЬКО если `is_local_authority()` (local input-feel эффект).
pub trait AimAccess {
    fn is_local_authority(&self) -> bool;

    fn view_rotation(&self) -> AimRotation;

    fn set_view_rotation(&mut self, rotation: AimRotation);
}

/// Простая view rotation по значению
///
/// ECS layer копирует `ViewRotation` компонент сюда и пишет обратно после выстрела/tick.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewAim {
    pub rotation: AimRotation,
    pub local_authority: bool,
}

impl ViewAim {
    pub fn local(rotation: AimRotation) -> Self {
        Self { rotation, local_authority: true }
    }

    pub fn remote(rotation: AimRotation) -> Self {
        Self { rotation, local_authority: false }
    }
}

impl AimAccess for ViewAim {
    fn is_local_authority(&self) -> bool {
        self.local_authority
    }

    fn view_rotation(&self) -> AimRotation {
        self.rotation
    }

    fn set_view_rotation(&mut self, rotation: AimRotation) {
        self.rotation = rotation;
    }
}

/// Скорость стрелка (модуль velocity)
pub trait VelocityProvider {
    fn speed(&self) -> f32;
}

impl VelocityProvider for Vec3 {
    fn speed(&self) -> f32 {
        self.length()
    }
}

impl VelocityProvider for f32 {
    fn speed(&self) -> f32 {
        *self
    }
}
