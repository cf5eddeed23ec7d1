//! Weapon events
//!
//! Input → ECS: TriggerInput (edges, не состояние кнопки, один поток в порядке прихода)
//! ECS → engine layer: WeaponFired, WeaponReloaded, FireEffectsRequested, FireMontageRequested

use bevy::prelude::*;

use super::collaborators::MontageRequest;

/// Fire input edge
///
/// Press и release идут одним event'ом: порядок edges внутри tick сохраняется,
/// последний edge определяет, зажат ли trigger.
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerInput {
    Pressed { player: Entity },
    Released { player: Entity },
}

impl TriggerInput {
    pub fn player(&self) -> Entity {
        match *self {
            Self::Pressed { player } | Self::Released { player } => player,
        }
    }
}

/// Event: выстрел произведён (hitscan уже сделан)
///
/// Damage НЕ применяется здесь: это задача gameplay layer, читающего событие.
#[derive(Event, Debug, Clone, PartialEq)]
pub struct WeaponFired {
    pub weapon: Entity,
    pub shooter: Entity,
    pub fired_at: f64,
    pub origin: Vec3,
    pub direction: Vec3,
    /// Some — луч попал в геометрию
    pub hit_location: Option<Vec3>,
    pub damage: f32,
}

/// Event: магазин перезаряжен
#[derive(Event, Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeaponReloaded {
    pub weapon: Entity,
    pub loaded: u32,
    pub rounds_in_magazine: u32,
    pub rounds_total: u32,
}

/// Event: muzzle flash + fire sound (engine layer проигрывает)
#[derive(Event, Debug, Clone, Copy, PartialEq)]
pub struct FireEffectsRequested {
    pub weapon: Entity,
    pub muzzle: Transform,
}

/// Event: firing montage на модели стрелка
#[derive(Event, Debug, Clone, PartialEq)]
pub struct FireMontageRequested {
    pub shooter: Entity,
    pub request: MontageRequest,
}
