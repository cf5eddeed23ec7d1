//! GUNPLAY Simulation Core
//!
//! Hitscan огнестрел на Bevy 0.16 (ECS strategic layer)
//!
//! HYBRID ARCHITECTURE:
//! - ECS = rules: ammo, rate of fire, spread, recoil, fire state machine
//! - Engine layer = ray cast, звук, партиклы, анимации (через traits и events)

use bevy::prelude::*;
use bevy::time::TimeUpdateStrategy;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::time::Duration;

// Публичные модули
pub mod logger;
pub mod player;
pub mod weapon;

// Re-export базовых типов для удобства
pub use logger::init_logger;
pub use player::{
    shooter_bundle, EquippedWeapon, EyeOffset, LocalAuthority, MoverVelocity, Player, ViewRotation,
};
pub use weapon::{
    equip_weapon, AimRotation, FireOutcome, FiringMode, HitscanBackend, TriggerInput, Weapon,
    WeaponConfig, WeaponFired, WeaponPlugin, WeaponReloaded,
};

/// Частота simulation tick
pub const SIMULATION_HZ: f64 = 60.0;

/// Главный plugin симуляции (объединяет все подсистемы)
pub struct SimulationPlugin;

impl Plugin for SimulationPlugin {
    fn build(&self, app: &mut App) {
        app
            // Fixed timestep 60Hz для simulation tick
            .insert_resource(Time::<Fixed>::from_hz(SIMULATION_HZ))
            // Детерминистичный RNG (seed по умолчанию, create_headless_app не перетирает свой)
            .init_resource::<DeterministicRng>()
            .add_plugins(WeaponPlugin);
    }
}

/// Детерминистичный RNG resource (seeded)
#[derive(Resource)]
pub struct DeterministicRng {
    pub rng: ChaCha8Rng,
    pub seed: u64,
}

impl DeterministicRng {
    pub const DEFAULT_SEED: u64 = 42;

    pub fn new(seed: u64) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(seed),
            seed,
        }
    }
}

impl Default for DeterministicRng {
    fn default() -> Self {
        Self::new(Self::DEFAULT_SEED)
    }
}

/// Создаёт minimal Bevy App для headless симуляции
///
/// Время двигается ровно на один fixed step за `app.update()`
/// (кроме самого первого update — он только запускает часы).
pub fn create_headless_app(seed: u64) -> App {
    let mut app = App::new();
    init_logger();
    app.add_plugins(MinimalPlugins)
        .insert_resource(DeterministicRng::new(seed))
        .insert_resource(TimeUpdateStrategy::ManualDuration(Duration::from_secs_f64(
            1.0 / SIMULATION_HZ,
        )))
        .add_plugins(SimulationPlugin);

    app
}

/// Snapshot мира для сравнения детерминизма
pub fn world_snapshot<T: Component>(world: &mut World) -> Vec<u8>
where
    T: std::fmt::Debug,
{
    // Собираем все компоненты в детерминированный формат
    let mut snapshot = Vec::new();
    let mut query = world.query::<(Entity, &T)>();
    let mut entities: Vec<_> = query.iter(world).collect();

    // Сортируем по Entity ID для детерминизма
    entities.sort_by_key(|(entity, _)| entity.index());

    // Сериализуем в байты через Debug (простейший способ)
    for (entity, component) in entities {
        snapshot.extend_from_slice(&entity.index().to_le_bytes());
        snapshot.extend_from_slice(format!("{:?}", component).as_bytes());
    }

    snapshot
}
