//! Shooter components
//!
//! Стрелок — entity с view rotation (прицел), скоростью и ссылкой на оружие в руках.
//! Weapon core читает эти компоненты через `AimAccess` / `VelocityProvider`.

use bevy::prelude::*;

use crate::weapon::recoil::AimRotation;

/// Marker component для player-controlled entity
///
/// Только такие entities принимают TriggerInput.
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct Player;

/// View rotation контроллера (pitch/yaw в градусах)
///
/// Recoil добавляет kick сюда и потом постепенно вычитает его обратно.
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct ViewRotation(pub AimRotation);

/// Marker: этот стрелок управляется локальной машиной
///
/// Без маркера recoil не трогает ViewRotation (remote стрелок получает aim по сети).
#[derive(Component, Debug, Clone, Copy, Default, Reflect)]
#[reflect(Component)]
pub struct LocalAuthority;

/// Velocity стрелка (пишет movement layer), модуль идёт в accuracy model
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Reflect)]
#[reflect(Component)]
pub struct MoverVelocity(pub Vec3);

/// Смещение глаз от Transform стрелка (начало hitscan луча)
#[derive(Component, Debug, Clone, Copy, PartialEq, Reflect)]
#[reflect(Component)]
pub struct EyeOffset(pub Vec3);

impl Default for EyeOffset {
    fn default() -> Self {
        Self(Vec3::new(0.0, 1.6, 0.0))
    }
}

/// Оружие в руках (non-owning ссылка на weapon entity)
#[derive(Component, Debug, Clone, Copy, Default, PartialEq, Eq, Reflect)]
#[reflect(Component)]
pub struct EquippedWeapon(pub Option<Entity>);

/// Bundle стрелка по умолчанию (local player, смотрит вдоль -Z)
pub fn shooter_bundle(position: Vec3) -> impl Bundle {
    (
        Player,
        LocalAuthority,
        ViewRotation::default(),
        MoverVelocity::default(),
        EyeOffset::default(),
        EquippedWeapon::default(),
        Transform::from_translation(position),
    )
}
