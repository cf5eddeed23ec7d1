//! Weapon firing integration test
//!
//! Headless App + SimulationPlugin, input только через TriggerInput.
//!
//! Проверяем:
//! - Магазин → reload → остаток → out of ammo
//! - Несколько стрелков не мешают друг другу
//! - Конфиг из RON
//! - Recoil pattern progress и возврат прицела

use bevy::prelude::*;
use std::sync::Arc;
use gunplay_simulation::*;

#[derive(Resource, Default)]
struct Counters {
    fired: Vec<WeaponFired>,
    reloaded: Vec<WeaponReloaded>,
}

fn count_events(
    mut fired: EventReader<WeaponFired>,
    mut reloaded: EventReader<WeaponReloaded>,
    mut counters: ResMut<Counters>,
) {
    counters.fired.extend(fired.read().cloned());
    counters.reloaded.extend(reloaded.read().copied());
}

/// Helper: App + счётчики events
fn create_firing_app(seed: u64) -> App {
    let mut app = create_headless_app(seed);
    app.init_resource::<Counters>()
        .add_systems(Update, count_events);
    app
}

fn spawn_armed_player(app: &mut App, position: Vec3, config: WeaponConfig) -> (Entity, Entity) {
    let player = app.world_mut().spawn(shooter_bundle(position)).id();
    let weapon = equip_weapon(app.world_mut(), player, Arc::new(config));
    (player, weapon)
}

fn ticks(app: &mut App, count: usize) {
    for _ in 0..count {
        app.update();
    }
}

#[test]
fn test_ron_config_magazine_reload_out_of_ammo() {
    let config = WeaponConfig::from_ron(
        "(magazine_capacity: 10, starting_reserve: 15, no_spread: true)",
    )
    .unwrap();
    assert_eq!(config.firing_mode, FiringMode::FullAuto);

    let mut app = create_firing_app(42);
    let (player, weapon) = spawn_armed_player(&mut app, Vec3::ZERO, config);
    app.update();

    // Очередь: 10 выстрелов, потом reload остатка
    app.world_mut().send_event(TriggerInput::Pressed { player });
    ticks(&mut app, 90);
    {
        let counters = app.world().resource::<Counters>();
        assert_eq!(counters.fired.len(), 10);
        assert_eq!(counters.reloaded.len(), 1);
        assert_eq!(counters.reloaded[0].loaded, 5);
    }

    // Вторая очередь: 5 выстрелов и всё
    app.world_mut().send_event(TriggerInput::Released { player });
    app.update();
    app.world_mut().send_event(TriggerInput::Pressed { player });
    ticks(&mut app, 90);

    let counters = app.world().resource::<Counters>();
    assert_eq!(counters.fired.len(), 15);
    assert_eq!(counters.reloaded.len(), 1);

    let weapon = app.world().get::<Weapon>(weapon).unwrap();
    assert_eq!(weapon.ammo.rounds_in_magazine, 0);
    assert_eq!(weapon.ammo.rounds_total, 0);
    assert!(!weapon.timing.auto_fire_armed());
}

#[test]
fn test_shooters_are_independent() {
    let mut app = create_firing_app(42);
    let (rifleman, rifle) = spawn_armed_player(
        &mut app,
        Vec3::ZERO,
        WeaponConfig {
            no_spread: true,
            ..WeaponConfig::rifle()
        },
    );
    let (gunslinger, pistol) = spawn_armed_player(
        &mut app,
        Vec3::new(5.0, 0.0, 0.0),
        WeaponConfig {
            no_spread: true,
            ..WeaponConfig::pistol()
        },
    );
    app.update();

    app.world_mut().send_event(TriggerInput::Pressed { player: rifleman });
    app.world_mut().send_event(TriggerInput::Pressed { player: gunslinger });
    // 1 секунда
    ticks(&mut app, 60);
    app.world_mut().send_event(TriggerInput::Released { player: rifleman });
    app.world_mut().send_event(TriggerInput::Released { player: gunslinger });
    ticks(&mut app, 10);

    let counters = app.world().resource::<Counters>();
    let rifle_shots = counters.fired.iter().filter(|shot| shot.weapon == rifle).count();
    let pistol_shots: Vec<_> = counters.fired.iter().filter(|shot| shot.weapon == pistol).collect();

    assert_eq!(rifle_shots, 10);
    assert_eq!(pistol_shots.len(), 1);
    assert_eq!(pistol_shots[0].shooter, gunslinger);
    assert_eq!(pistol_shots[0].origin, Vec3::new(5.0, 1.6, 0.0));
    assert_eq!(pistol_shots[0].damage, 20.0);
}

#[test]
fn test_pattern_progress_advances_then_decays() {
    let mut app = create_firing_app(42);
    let (player, weapon) = spawn_armed_player(
        &mut app,
        Vec3::ZERO,
        WeaponConfig {
            no_spread: true,
            ..WeaponConfig::rifle()
        },
    );
    app.update();

    app.world_mut().send_event(TriggerInput::Pressed { player });
    ticks(&mut app, 60);

    // 10 выстрелов по 0.1s, пока trigger зажат decay нет
    let progress = app.world().get::<Weapon>(weapon).unwrap().recoil.pattern_progress;
    assert!(progress > 0.9);

    app.world_mut().send_event(TriggerInput::Released { player });
    ticks(&mut app, 600);

    let view = app.world().get::<ViewRotation>(player).unwrap().0;
    assert!(view.is_nearly_zero(1e-3), "view = {:?}", view);

    // Pattern откатился в начало
    let weapon = app.world().get::<Weapon>(weapon).unwrap();
    assert_eq!(weapon.recoil.pattern_progress, 0.0);
    assert!(weapon.recoil.total_offset_added.is_zero());
}
