//! Weapon systems (FixedUpdate, strategic layer)
//!
//! Порядок (один `.chain()`):
//! 1. handle_trigger_edges — TriggerInput → press / release (в порядке прихода)
//! 2. run_due_refires — сработавшие re-fire задачи → повторный выстрел
//! 3. tick_weapons — refresh compensating → recoil recovery → pattern decay
//!
//! Engine layer (hitscan, звук, анимации) — снаружи: hitscan через `HitscanBackend`,
//! эффекты уходят events'ами.

use bevy::ecs::system::SystemParam;
use bevy::prelude::*;
use rand_chacha::ChaCha8Rng;
use std::sync::Arc;

use super::collaborators::{
    AimAccess, EffectsSink, HitscanProvider, MontageRequest, NoHitscan, VelocityProvider, ViewAim,
};
use super::config::WeaponConfig;
use super::controller::{FireContext, FireOutcome, RefireScheduler, Weapon};
use super::events::{
    FireEffectsRequested, FireMontageRequested, TriggerInput, WeaponFired, WeaponReloaded,
};
use super::schedule::TaskToken;
use crate::logger;
use crate::player::{
    EquippedWeapon, EyeOffset, LocalAuthority, MoverVelocity, Player, ViewRotation,
};
use crate::DeterministicRng;

/// Timestamps `Time<Fixed>` — целые наносекунды: задача на `t + 0.1` иначе
/// ждала бы лишний tick из-за потерянной доли наносекунды.
const TIMER_SLACK: f64 = 1e-6;

/// Re-fire задачи всех оружий (payload — weapon entity)
#[derive(Resource, Default)]
pub struct RefireQueue(pub RefireScheduler);

/// Hitscan провайдер engine layer (по умолчанию — всегда промах)
#[derive(Resource)]
pub struct HitscanBackend(pub Box<dyn HitscanProvider + Send + Sync>);

impl Default for HitscanBackend {
    fn default() -> Self {
        Self(Box::new(NoHitscan))
    }
}

impl HitscanBackend {
    pub fn new(provider: impl HitscanProvider + Send + Sync + 'static) -> Self {
        Self(Box::new(provider))
    }
}

/// Все output events оружия
#[derive(SystemParam)]
pub struct WeaponEventWriters<'w> {
    fired: EventWriter<'w, WeaponFired>,
    reloaded: EventWriter<'w, WeaponReloaded>,
    effects: EventWriter<'w, FireEffectsRequested>,
    montages: EventWriter<'w, FireMontageRequested>,
}

/// Стрелок: aim, authority, velocity, позиция глаз
type ShooterData = (
    Option<&'static mut ViewRotation>,
    Has<LocalAuthority>,
    Option<&'static MoverVelocity>,
    Option<&'static Transform>,
    Option<&'static EyeOffset>,
);

/// Effects sink → буфер events (пишутся после выстрела)
#[derive(Default)]
struct BufferedEffects {
    weapon: Option<Entity>,
    shooter: Option<Entity>,
    effects: Vec<FireEffectsRequested>,
    montages: Vec<FireMontageRequested>,
}

impl BufferedEffects {
    fn begin(&mut self, weapon: Entity, shooter: Entity) {
        self.weapon = Some(weapon);
        self.shooter = Some(shooter);
    }
}

impl EffectsSink for BufferedEffects {
    fn play_fire_effects(&mut self, muzzle: &Transform) {
        if let Some(weapon) = self.weapon {
            self.effects.push(FireEffectsRequested { weapon, muzzle: *muzzle });
        }
    }

    fn play_montage(&mut self, request: &MontageRequest) {
        if let Some(shooter) = self.shooter {
            self.montages.push(FireMontageRequested {
                shooter,
                request: request.clone(),
            });
        }
    }
}

/// Что запустило попытку выстрела
#[derive(Debug, Clone, Copy)]
enum FireCause {
    Press,
    Refire(TaskToken),
}

/// Общие ресурсы одной попытки выстрела
struct FireEnv<'a> {
    now: f64,
    scheduler: &'a mut RefireScheduler,
    hitscan: &'a mut (dyn HitscanProvider + Send + Sync),
    rng: &'a mut ChaCha8Rng,
    effects: BufferedEffects,
    fired: Vec<WeaponFired>,
    reloaded: Vec<WeaponReloaded>,
}

impl FireEnv<'_> {
    fn flush(self, writers: &mut WeaponEventWriters) {
        writers.effects.write_batch(self.effects.effects);
        writers.montages.write_batch(self.effects.montages);
        writers.fired.write_batch(self.fired);
        writers.reloaded.write_batch(self.reloaded);
    }
}

/// Press или re-fire одного оружия с контекстом его стрелка
fn drive_weapon(
    cause: FireCause,
    weapon_entity: Entity,
    weapon: &mut Weapon,
    weapon_transform: Option<&Transform>,
    shooters: &mut Query<ShooterData>,
    env: &mut FireEnv,
) {
    let Some(shooter) = weapon.wielder() else {
        logger::log_warning(&format!("Weapon {:?} has no wielder, fire ignored", weapon_entity));
        abandon(cause, weapon);
        return;
    };

    let Ok((view, local, velocity, transform, eye)) = shooters.get_mut(shooter) else {
        logger::log_warning(&format!(
            "Weapon {:?}: wielder {:?} not found, fire ignored",
            weapon_entity, shooter
        ));
        abandon(cause, weapon);
        return;
    };

    // ViewRotation → ViewAim, после выстрела пишем обратно
    let mut aim = view.as_deref().map(|view| ViewAim {
        rotation: view.0,
        local_authority: local,
    });
    let position = transform.map(|t| t.translation).unwrap_or(Vec3::ZERO);
    let eye_position = position + eye.copied().unwrap_or_default().0;
    let muzzle = weapon_transform
        .or(transform)
        .copied()
        .unwrap_or_default();

    env.effects.begin(weapon_entity, shooter);

    let outcome = {
        let mut ctx = FireContext {
            aim: aim.as_mut().map(|aim| aim as &mut dyn AimAccess),
            velocity: velocity.map(|velocity| &velocity.0 as &dyn VelocityProvider),
            hitscan: &mut *env.hitscan,
            effects: &mut env.effects,
            spread: &mut *env.rng,
            eye_position,
            muzzle,
        };

        match cause {
            FireCause::Press => {
                Some(weapon.press_trigger(weapon_entity, env.now, &mut ctx, env.scheduler))
            }
            FireCause::Refire(token) => {
                weapon.on_refire_due(token, weapon_entity, env.now, &mut ctx, env.scheduler)
            }
        }
    };

    if let (Some(mut view), Some(aim)) = (view, aim) {
        if view.0 != aim.rotation {
            view.0 = aim.rotation;
        }
    }

    match outcome {
        Some(FireOutcome::Fired(report)) => {
            env.fired.push(WeaponFired {
                weapon: weapon_entity,
                shooter,
                fired_at: report.fired_at,
                origin: report.origin,
                direction: report.direction,
                hit_location: report.hit.hit.then_some(report.hit.location),
                damage: report.damage,
            });
        }
        Some(FireOutcome::Reloaded { loaded }) => {
            env.reloaded.push(WeaponReloaded {
                weapon: weapon_entity,
                loaded,
                rounds_in_magazine: weapon.ammo.rounds_in_magazine,
                rounds_total: weapon.ammo.rounds_total,
            });
        }
        _ => {}
    }
}

/// Re-fire задача уже снята scheduler'ом: без выстрела оружие не должно считаться взведённым
fn abandon(cause: FireCause, weapon: &mut Weapon) {
    if let FireCause::Refire(token) = cause {
        weapon.abandon_refire(token);
    }
}

/// System: input edges → press / release
///
/// Edges применяются в порядке прихода: press→release в одном tick даёт
/// один выстрел, release→press оставляет trigger зажатым.
pub fn handle_trigger_edges(
    mut inputs: EventReader<TriggerInput>,
    time: Res<Time>,
    players: Query<&EquippedWeapon, With<Player>>,
    mut shooters: Query<ShooterData>,
    mut weapons: Query<(&mut Weapon, Option<&Transform>)>,
    mut queue: ResMut<RefireQueue>,
    mut hitscan: ResMut<HitscanBackend>,
    mut rng: ResMut<DeterministicRng>,
    mut writers: WeaponEventWriters,
) {
    let mut env = FireEnv {
        now: time.elapsed_secs_f64(),
        scheduler: &mut queue.0,
        hitscan: hitscan.0.as_mut(),
        rng: &mut rng.rng,
        effects: BufferedEffects::default(),
        fired: Vec::new(),
        reloaded: Vec::new(),
    };

    for input in inputs.read() {
        let player = input.player();
        let Some(weapon_entity) = equipped_weapon(&players, player) else {
            logger::log(&format!("Player {:?} used trigger without a weapon", player));
            continue;
        };

        let Ok((mut weapon, weapon_transform)) = weapons.get_mut(weapon_entity) else {
            logger::log_warning(&format!("Equipped weapon {:?} not found", weapon_entity));
            continue;
        };

        match input {
            TriggerInput::Pressed { .. } => drive_weapon(
                FireCause::Press,
                weapon_entity,
                &mut weapon,
                weapon_transform,
                &mut shooters,
                &mut env,
            ),
            TriggerInput::Released { .. } => {
                weapon.release_trigger(env.scheduler);
            }
        }
    }

    env.flush(&mut writers);
}

/// System: сработавшие re-fire задачи
pub fn run_due_refires(
    time: Res<Time>,
    mut shooters: Query<ShooterData>,
    mut weapons: Query<(&mut Weapon, Option<&Transform>)>,
    mut queue: ResMut<RefireQueue>,
    mut hitscan: ResMut<HitscanBackend>,
    mut rng: ResMut<DeterministicRng>,
    mut writers: WeaponEventWriters,
) {
    let now = time.elapsed_secs_f64();
    let due = queue.0.drain_due(now + TIMER_SLACK);
    if due.is_empty() {
        return;
    }

    let mut env = FireEnv {
        now,
        scheduler: &mut queue.0,
        hitscan: hitscan.0.as_mut(),
        rng: &mut rng.rng,
        effects: BufferedEffects::default(),
        fired: Vec::new(),
        reloaded: Vec::new(),
    };

    for (token, weapon_entity) in due {
        // Оружие удалено, пока задача ждала
        let Ok((mut weapon, weapon_transform)) = weapons.get_mut(weapon_entity) else {
            continue;
        };

        drive_weapon(
            FireCause::Refire(token),
            weapon_entity,
            &mut weapon,
            weapon_transform,
            &mut shooters,
            &mut env,
        );
    }

    env.flush(&mut writers);
}

/// System: recoil recovery + pattern decay каждый tick
pub fn tick_weapons(
    time: Res<Time>,
    mut weapons: Query<&mut Weapon>,
    mut shooters: Query<(Option<&mut ViewRotation>, Has<LocalAuthority>)>,
) {
    let delta = time.delta_secs();

    for mut weapon in weapons.iter_mut() {
        let wielder = weapon.wielder();
        let Some(Ok((Some(mut view), local))) = wielder.map(|s| shooters.get_mut(s)) else {
            weapon.tick(delta, None);
            continue;
        };

        let mut aim = ViewAim {
            rotation: view.0,
            local_authority: local,
        };
        weapon.tick(delta, Some(&mut aim));

        if view.0 != aim.rotation {
            view.0 = aim.rotation;
        }
    }
}

fn equipped_weapon(
    players: &Query<&EquippedWeapon, With<Player>>,
    player: Entity,
) -> Option<Entity> {
    players.get(player).ok().and_then(|equipped| equipped.0)
}

/// Спавнит оружие и даёт его игроку (прежнее оружие остаётся в мире, но отвязывается)
pub fn equip_weapon(world: &mut World, player: Entity, config: Arc<WeaponConfig>) -> Entity {
    let mut weapon = Weapon::new(config);
    weapon.attach_to(player);
    let weapon_entity = world.spawn(weapon).id();

    let previous = world
        .get::<EquippedWeapon>(player)
        .and_then(|equipped| equipped.0);

    if let Some(previous) = previous {
        world.init_resource::<RefireQueue>();
        world.resource_scope(|world, mut queue: Mut<RefireQueue>| {
            if let Some(mut old) = world.get_mut::<Weapon>(previous) {
                old.release_trigger(&mut queue.0);
                old.detach();
            }
        });
    }

    world.entity_mut(player).insert(EquippedWeapon(Some(weapon_entity)));
    logger::log_info(&format!("Player {:?} equipped weapon {:?}", player, weapon_entity));

    weapon_entity
}
