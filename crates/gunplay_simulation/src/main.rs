//! Headless симуляция GUNPLAY
//!
//! Игрок с автоматом зажимает trigger на 4 секунды (магазин + reload),
//! потом отпускает и ждёт, пока прицел вернётся после отдачи.
//!
//! Опционально: путь к RON файлу с WeaponConfig первым аргументом.

use std::sync::Arc;

use bevy::prelude::*;
use gunplay_simulation::logger;
use gunplay_simulation::{
    create_headless_app, equip_weapon, shooter_bundle, TriggerInput, ViewRotation, Weapon,
    WeaponConfig, WeaponFired, WeaponReloaded,
};

/// Счётчики для итогового отчёта
#[derive(Resource, Default)]
struct ShotStats {
    fired: usize,
    reloads: usize,
}

fn count_shots(
    mut fired: EventReader<WeaponFired>,
    mut reloaded: EventReader<WeaponReloaded>,
    mut stats: ResMut<ShotStats>,
) {
    stats.fired += fired.read().count();
    stats.reloads += reloaded.read().count();
}

fn load_config() -> WeaponConfig {
    let Some(path) = std::env::args().nth(1) else {
        return WeaponConfig::rifle();
    };

    let source = match std::fs::read_to_string(&path) {
        Ok(source) => source,
        Err(err) => {
            logger::log_error(&format!("Cannot read {}: {}, using rifle preset", path, err));
            return WeaponConfig::rifle();
        }
    };

    match WeaponConfig::from_ron(&source) {
        Ok(config) => config,
        Err(err) => {
            logger::log_error(&format!("Invalid weapon config {}: {}, using rifle preset", path, err));
            WeaponConfig::rifle()
        }
    }
}

fn main() {
    let seed = 42;
    println!("Starting GUNPLAY headless simulation (seed: {})", seed);

    let mut app = create_headless_app(seed);
    app.init_resource::<ShotStats>()
        .add_systems(Update, count_shots);

    let config = Arc::new(load_config());
    let player = app.world_mut().spawn(shooter_bundle(Vec3::ZERO)).id();
    let weapon = equip_weapon(app.world_mut(), player, config);

    // Первый update только запускает часы
    app.update();
    app.world_mut().send_event(TriggerInput::Pressed { player });

    // 60Hz: 240 тиков = 4 секунды огня
    for tick in 0..360 {
        if tick == 240 {
            app.world_mut().send_event(TriggerInput::Released { player });
        }

        app.update();

        if tick % 60 == 0 {
            let world = app.world();
            if let (Some(weapon), Some(view)) = (world.get::<Weapon>(weapon), world.get::<ViewRotation>(player)) {
                println!(
                    "Tick {}: ammo {}/{}, view pitch {:.2} yaw {:.2}",
                    tick, weapon.ammo.rounds_in_magazine, weapon.ammo.rounds_total, view.0.pitch, view.0.yaw
                );
            }
        }
    }

    let stats = app.world().resource::<ShotStats>();
    println!("Simulation complete! {} shots, {} reloads", stats.fired, stats.reloads);
}
