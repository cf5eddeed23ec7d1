//! Weapon module — hitscan огнестрел
//!
//! Core (без ECS зависимостей в логике):
//! - config: WeaponConfig (RON + presets), recoil pattern
//! - ammo: магазин и запас
//! - fire_rate: rate-of-fire gate
//! - accuracy: spread cone
//! - recoil: kick + constant-rate recovery
//! - schedule: отложенные re-fire задачи
//! - controller: Weapon aggregate, fire state machine
//!
//! ECS layer: events + systems (FixedUpdate), `WeaponPlugin`.

use bevy::prelude::*;

pub mod accuracy;
pub mod ammo;
pub mod collaborators;
pub mod config;
pub mod controller;
pub mod events;
pub mod fire_rate;
pub mod recoil;
pub mod schedule;
pub mod systems;


pub use accuracy::{adjusted_direction, effective_spread, FixedSpread, SpreadSampler};
pub use ammo::{AmmoError, AmmoState};
pub use collaborators::{
    AimAccess, EffectsSink, HitscanProvider, HitscanResult, MontageRequest, NoHitscan, NullEffects,
    VelocityProvider, ViewAim,
};
pub use config::{
    FireMontage, FiringMode, RecoilPattern, RecoilPatternKey, RecoilPolicy, WeaponConfig,
    WeaponConfigError, WeaponType,
};
pub use controller::{
    FireContext, FireOutcome, FireState, FireTiming, RefireScheduler, ShotReport, Weapon,
};
pub use events::{
    FireEffectsRequested, FireMontageRequested, TriggerInput, WeaponFired, WeaponReloaded,
};
pub use fire_rate::can_fire_again;
pub use recoil::{interp_constant_to, AimRotation, RecoilState};
pub use schedule::{FrameScheduler, TaskToken};
pub use systems::{
    equip_weapon, handle_trigger_edges, run_due_refires, tick_weapons, HitscanBackend, RefireQueue,
};

/// Weapon Plugin
///
/// Регистрирует weapon системы в FixedUpdate.
///
/// Порядок выполнения:
/// 1. handle_trigger_edges — input edges (press стреляет сразу)
/// 2. run_due_refires — full-auto очередь
/// 3. tick_weapons — recoil recovery + pattern decay
pub struct WeaponPlugin;

impl Plugin for WeaponPlugin {
    fn build(&self, app: &mut App) {
        app.add_event::<TriggerInput>()
            .add_event::<WeaponFired>()
            .add_event::<WeaponReloaded>()
            .add_event::<FireEffectsRequested>()
            .add_event::<FireMontageRequested>();

        app.init_resource::<RefireQueue>()
            .init_resource::<HitscanBackend>();

        app.add_systems(
            FixedUpdate,
            (handle_trigger_edges, run_due_refires, tick_weapons).chain(),
        );
    }
}
