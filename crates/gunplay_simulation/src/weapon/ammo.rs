//! Ammo ledger — магазин и общий запас патронов
//!
//! `rounds_total` включает патроны в магазине (магазин — подмножество запаса).
//! Reload только перекладывает патроны из "не в магазине" в магазин, total не меняется.

use bevy::prelude::*;
use thiserror::Error;

use super::config::WeaponConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AmmoError {
    #[error("magazine empty, {reserve} rounds in reserve, reload needed")]
    MagazineEmpty { reserve: u32 },

    #[error("completely out of ammo")]
    OutOfAmmo,

    #[error("unable to reload ({in_magazine}/{capacity} in magazine, {total} total)")]
    CannotReload { in_magazine: u32, capacity: u32, total: u32 },
}

/// Патроны оружия
///
/// Инварианты:
/// - `rounds_in_magazine ≤ magazine_capacity`
/// - `rounds_in_magazine ≤ rounds_total`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub struct AmmoState {
    pub rounds_in_magazine: u32,
    pub rounds_total: u32,
    pub magazine_capacity: u32,
}

impl AmmoState {
    /// Полное оружие при spawn
    pub fn full(config: &WeaponConfig) -> Self {
        Self::new(config.magazine_capacity, config.starting_reserve, config.magazine_capacity)
    }

    /// Произвольное состояние (магазин обрезается до capacity и до total)
    pub fn new(rounds_in_magazine: u32, rounds_total: u32, magazine_capacity: u32) -> Self {
        Self {
            rounds_in_magazine: rounds_in_magazine.min(magazine_capacity).min(rounds_total),
            rounds_total,
            magazine_capacity,
        }
    }

    /// Можно стрелять прямо сейчас (без reload)
    pub fn has_round_chambered(&self) -> bool {
        self.rounds_in_magazine > 0 && self.rounds_total > 0
    }

    /// Патроны вне магазина (0, если поля выставлены мимо инварианта)
    pub fn reserve_outside_magazine(&self) -> u32 {
        self.rounds_total.saturating_sub(self.rounds_in_magazine)
    }

    /// Тратим один патрон (оба счётчика -1)
    pub fn consume_round(&mut self) -> Result<(), AmmoError> {
        if self.has_round_chambered() {
            self.rounds_in_magazine -= 1;
            self.rounds_total -= 1;
            return Ok(());
        }

        if self.rounds_total > 0 {
            Err(AmmoError::MagazineEmpty { reserve: self.rounds_total })
        } else {
            Err(AmmoError::OutOfAmmo)
        }
    }

    pub fn can_reload(&self) -> bool {
        self.rounds_in_magazine < self.magazine_capacity && self.rounds_total > self.rounds_in_magazine
    }

    /// Добивает магазин до полного (или сколько есть). Возвращает число заряженных патронов.
    pub fn reload(&mut self) -> Result<u32, AmmoError> {
        if !self.can_reload() {
            return Err(AmmoError::CannotReload {
                in_magazine: self.rounds_in_magazine,
                capacity: self.magazine_capacity,
                total: self.rounds_total,
            });
        }

        let missing = self.magazine_capacity - self.rounds_in_magazine;
        let to_load = missing.min(self.reserve_outside_magazine());
        self.rounds_in_magazine += to_load;

        Ok(to_load)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_invariant(ammo: &AmmoState) {
        assert!(ammo.rounds_in_magazine <= ammo.rounds_total, "{:?}", ammo);
        assert!(ammo.rounds_in_magazine <= ammo.magazine_capacity, "{:?}", ammo);
    }

    #[test]
    fn test_full_from_config() {
        let ammo = AmmoState::full(&WeaponConfig::rifle());
        assert_eq!(ammo.rounds_in_magazine, 30);
        assert_eq!(ammo.rounds_total, 120);
    }

    #[test]
    fn test_full_with_small_reserve_keeps_invariant() {
        let config = WeaponConfig { starting_reserve: 10, ..WeaponConfig::rifle() };
        let ammo = AmmoState::full(&config);
        assert_eq!(ammo.rounds_in_magazine, 10);
        assert_invariant(&ammo);
    }

    #[test]
    fn test_consume_round_decrements_both() {
        let mut ammo = AmmoState::new(30, 120, 30);
        assert_eq!(ammo.consume_round(), Ok(()));
        assert_eq!(ammo.rounds_in_magazine, 29);
        assert_eq!(ammo.rounds_total, 119);
        assert_invariant(&ammo);
    }

    #[test]
    fn test_consume_round_empty_magazine_is_no_op() {
        let mut ammo = AmmoState::new(0, 50, 30);
        assert_eq!(ammo.consume_round(), Err(AmmoError::MagazineEmpty { reserve: 50 }));
        assert_eq!(ammo, AmmoState::new(0, 50, 30));

        let mut empty = AmmoState::new(0, 0, 30);
        assert_eq!(empty.consume_round(), Err(AmmoError::OutOfAmmo));
        assert_eq!(empty.rounds_total, 0);
    }

    #[test]
    fn test_reload_fills_magazine_total_unchanged() {
        let mut ammo = AmmoState::new(0, 50, 30);
        assert!(ammo.can_reload());
        assert_eq!(ammo.reload(), Ok(30));
        assert_eq!(ammo.rounds_in_magazine, 30);
        assert_eq!(ammo.rounds_total, 50);
        assert_eq!(ammo.reserve_outside_magazine(), 20);
    }

    #[test]
    fn test_reload_partial_reserve() {
        let mut ammo = AmmoState::new(0, 10, 30);
        assert_eq!(ammo.reload(), Ok(10));
        assert_eq!(ammo.rounds_in_magazine, 10);
        assert_invariant(&ammo);
    }

    #[test]
    fn test_reload_rejected_when_everything_is_in_magazine() {
        let mut ammo = AmmoState::new(25, 25, 30);
        assert!(!ammo.can_reload());
        assert!(matches!(ammo.reload(), Err(AmmoError::CannotReload { .. })));
        assert_eq!(ammo.rounds_in_magazine, 25);
    }

    #[test]
    fn test_reload_rejected_when_magazine_full() {
        let mut ammo = AmmoState::new(30, 90, 30);
        assert!(!ammo.can_reload());
        assert!(ammo.reload().is_err());
    }

    #[test]
    fn test_reserve_outside_magazine_never_underflows() {
        // Поля публичные: собираем состояние в обход new()
        let ammo = AmmoState {
            rounds_in_magazine: 12,
            rounds_total: 5,
            magazine_capacity: 30,
        };
        assert_eq!(ammo.reserve_outside_magazine(), 0);
        assert!(!ammo.can_reload());

        assert_eq!(AmmoState::new(10, 40, 30).reserve_outside_magazine(), 30);
    }

    #[test]
    fn test_invariant_holds_through_mixed_sequence() {
        let mut ammo = AmmoState::new(30, 75, 30);

        for step in 0..200 {
            if step % 7 == 3 {
                let _ = ammo.reload();
            } else {
                let _ = ammo.consume_round();
            }
            assert_invariant(&ammo);
        }

        assert_eq!(ammo.rounds_total, 0);
    }
}
