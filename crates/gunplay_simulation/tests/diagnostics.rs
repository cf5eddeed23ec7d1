//! Диагностики weapon core идут через logger
//!
//! Отдельный test binary: logger глобальный, подменяем его printer'ом с буфером.

use once_cell::sync::Lazy;
use std::sync::{Arc, Mutex};

use bevy::prelude::*;
use gunplay_simulation::logger::{self, LogLevel, LogPrinter};
use gunplay_simulation::weapon::{
    FireContext, FireOutcome, FixedSpread, NoHitscan, NullEffects, RefireScheduler, ViewAim,
};
use gunplay_simulation::{AimRotation, Weapon, WeaponConfig};

static CAPTURED: Lazy<Mutex<Vec<(LogLevel, String)>>> = Lazy::new(|| Mutex::new(Vec::new()));

struct CapturingLogger;

impl LogPrinter for CapturingLogger {
    fn log(&self, level: LogLevel, message: &str) {
        CAPTURED.lock().unwrap().push((level, message.to_string()));
    }
}

fn warnings_containing(text: &str) -> usize {
    CAPTURED
        .lock()
        .unwrap()
        .iter()
        .filter(|(level, message)| *level == LogLevel::Warning && message.contains(text))
        .count()
}

#[test]
fn test_weapon_diagnostics_are_logged() {
    logger::set_logger(Box::new(CapturingLogger));
    logger::set_log_level(LogLevel::Debug);

    let weapon_entity = Entity::from_raw(3);
    let mut weapon = Weapon::new(Arc::new(WeaponConfig::rifle()));
    let mut scheduler = RefireScheduler::new();
    let mut aim = ViewAim::local(AimRotation::ZERO);
    let mut hitscan = NoHitscan;
    let mut effects = NullEffects;
    let mut spread = FixedSpread::CENTER;

    let mut press = |weapon: &mut Weapon, scheduler: &mut RefireScheduler, now: f64| {
        let mut ctx = FireContext {
            aim: Some(&mut aim),
            velocity: None,
            hitscan: &mut hitscan,
            effects: &mut effects,
            spread: &mut spread,
            eye_position: Vec3::ZERO,
            muzzle: Transform::default(),
        };
        weapon.press_trigger(weapon_entity, now, &mut ctx, scheduler)
    };

    // Gate
    assert!(press(&mut weapon, &mut scheduler, 0.0).is_fired());
    weapon.release_trigger(&mut scheduler);
    assert!(matches!(press(&mut weapon, &mut scheduler, 0.02), FireOutcome::Gated { .. }));
    assert_eq!(warnings_containing("shot dropped"), 1);
    weapon.release_trigger(&mut scheduler);

    // Reload rejected: всё в магазине
    weapon.ammo = gunplay_simulation::weapon::AmmoState::new(5, 5, 30);
    assert!(weapon.reload(&mut scheduler).is_err());
    assert_eq!(warnings_containing("Unable to reload"), 1);

    // Out of ammo
    weapon.ammo = gunplay_simulation::weapon::AmmoState::new(0, 0, 30);
    assert_eq!(press(&mut weapon, &mut scheduler, 5.0), FireOutcome::OutOfAmmo);
    assert_eq!(warnings_containing("out of ammo"), 1);

    // Фильтр уровня: Error пропускает warnings
    logger::set_log_level(LogLevel::Error);
    weapon.release_trigger(&mut scheduler);
    assert_eq!(press(&mut weapon, &mut scheduler, 10.0), FireOutcome::OutOfAmmo);
    assert_eq!(warnings_containing("out of ammo"), 1);
}
