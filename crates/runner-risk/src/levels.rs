//! Stop, target, lock and trailing levels.
//!
//! All level math is mirrored for shorts. "Favourable" means higher for a
//! long and lower for a short; the ratchet only ever moves a stop in the
//! favourable direction.

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use runner_core::Direction;

/// Exit parameters, as fractions (0.10 = 10 %).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExitLevels {
    pub target_pct: Decimal,
    pub stop_loss_pct: Decimal,
    pub trail_pct: Decimal,
    /// Gap between the target and the locked-in stop once fast mode starts
    pub lock_eps: Decimal,
}

impl Default for ExitLevels {
    fn default() -> Self {
        Self {
            target_pct: dec!(0.10),
            stop_loss_pct: dec!(0.01),
            trail_pct: dec!(0.02),
            lock_eps: dec!(0.002),
        }
    }
}

impl ExitLevels {
    pub fn validate(&self) -> Result<(), String> {
        if self.target_pct <= Decimal::ZERO {
            return Err("target_pct must be positive".into());
        }
        if self.stop_loss_pct <= Decimal::ZERO || self.stop_loss_pct >= Decimal::ONE {
            return Err("stop_loss_pct must be in (0, 1)".into());
        }
        if self.trail_pct < Decimal::ZERO || self.trail_pct >= Decimal::ONE {
            return Err("trail_pct must be in [0, 1)".into());
        }
        if self.lock_eps < Decimal::ZERO || self.lock_eps >= self.target_pct {
            return Err("lock_eps must be in [0, target_pct)".into());
        }
        Ok(())
    }

    /// Stop placed at entry.
    pub fn initial_stop(&self, entry: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => entry * (Decimal::ONE - self.stop_loss_pct),
            Direction::Short => entry * (Decimal::ONE + self.stop_loss_pct),
        }
    }

    pub fn target_price(&self, entry: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => entry * (Decimal::ONE + self.target_pct),
            Direction::Short => entry * (Decimal::ONE - self.target_pct),
        }
    }

    pub fn hit_target(&self, entry: Decimal, price: Decimal, direction: Direction) -> bool {
        let target = self.target_price(entry, direction);
        match direction {
            Direction::Long => price >= target,
            Direction::Short => price <= target,
        }
    }

    /// Minimum stop once fast mode is on: just short of the target.
    pub fn lock_level(&self, entry: Decimal, direction: Direction) -> Decimal {
        match direction {
            Direction::Long => entry * (Decimal::ONE + self.target_pct - self.lock_eps),
            Direction::Short => entry * (Decimal::ONE - self.target_pct + self.lock_eps),
        }
    }

    /// Stop implied by trailing the best price seen.
    pub fn trailing_level(&self, extreme: Decimal, direction: Direction) -> Decimal {
        let trail = self.trail_pct.max(Decimal::ZERO);
        match direction {
            Direction::Long => extreme * (Decimal::ONE - trail),
            Direction::Short => extreme * (Decimal::ONE + trail),
        }
    }

    /// Fast-mode stop: the most favourable of current, trailing and lock.
    pub fn fast_stop(
        &self,
        current: Decimal,
        entry: Decimal,
        extreme: Decimal,
        direction: Direction,
    ) -> Decimal {
        let trailing = self.trailing_level(extreme, direction);
        let lock = self.lock_level(entry, direction);
        ratchet(ratchet(current, trailing, direction), lock, direction)
    }

    /// Whether `price` has crossed `stop` against the holder.
    pub fn is_triggered(&self, stop: Decimal, price: Decimal, direction: Direction) -> bool {
        match direction {
            Direction::Long => price <= stop,
            Direction::Short => price >= stop,
        }
    }
}

/// Keep whichever of `current` and `candidate` favours the holder.
pub fn ratchet(current: Decimal, candidate: Decimal, direction: Direction) -> Decimal {
    match direction {
        Direction::Long => current.max(candidate),
        Direction::Short => current.min(candidate),
    }
}

/// Pump condition over 1-minute closes.
///
/// True when the close moved at least `pct` in the holder's favour over the
/// last `lookback` bars. Needs at least `max(lookback + 1, 5)` closes.
pub fn is_pumping(closes: &[f64], lookback: usize, pct: f64, direction: Direction) -> bool {
    let n = closes.len();
    if n < (lookback + 1).max(5) {
        return false;
    }
    let past = closes[n - 1 - lookback];
    let now = closes[n - 1];
    if past <= 0.0 {
        return false;
    }
    let change = now / past - 1.0;
    match direction {
        Direction::Long => change >= pct,
        Direction::Short => -change >= pct,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_initial_stop_and_target() {
        let levels = ExitLevels::default();
        assert_eq!(levels.initial_stop(dec!(100), Direction::Long), dec!(99));
        assert_eq!(levels.initial_stop(dec!(100), Direction::Short), dec!(101));
        assert!(levels.hit_target(dec!(100), dec!(110), Direction::Long));
        assert!(!levels.hit_target(dec!(100), dec!(109.99), Direction::Long));
        assert!(levels.hit_target(dec!(100), dec!(90), Direction::Short));
    }

    #[test]
    fn test_lock_level() {
        let levels = ExitLevels::default();
        assert_eq!(levels.lock_level(dec!(100), Direction::Long), dec!(109.8));
        assert_eq!(levels.lock_level(dec!(100), Direction::Short), dec!(90.2));
    }

    #[test]
    fn test_fast_stop_trails_extreme() {
        let levels = ExitLevels::default();
        // extreme 130, trail 2% -> 127.4, above lock 109.8
        assert_eq!(
            levels.fast_stop(dec!(109.8), dec!(100), dec!(130), Direction::Long),
            dec!(127.4)
        );
        // previous stop already higher than both candidates
        assert_eq!(
            levels.fast_stop(dec!(128), dec!(100), dec!(130), Direction::Long),
            dec!(128)
        );
        // right after activation the lock dominates
        assert_eq!(
            levels.fast_stop(dec!(99), dec!(100), dec!(110), Direction::Long),
            dec!(109.8)
        );
    }

    #[test]
    fn test_fast_stop_short() {
        let levels = ExitLevels::default();
        assert_eq!(
            levels.fast_stop(dec!(101), dec!(100), dec!(80), Direction::Short),
            dec!(81.6)
        );
    }

    #[test]
    fn test_triggered() {
        let levels = ExitLevels::default();
        assert!(levels.is_triggered(dec!(99), dec!(99), Direction::Long));
        assert!(!levels.is_triggered(dec!(99), dec!(99.01), Direction::Long));
        assert!(levels.is_triggered(dec!(101), dec!(101.5), Direction::Short));
    }

    #[test]
    fn test_pump_condition() {
        let closes = [100.0, 100.0, 100.0, 100.0, 100.0, 105.0, 111.0];
        assert!(is_pumping(&closes, 5, 0.10, Direction::Long));
        assert!(!is_pumping(&closes, 5, 0.12, Direction::Long));
        assert!(!is_pumping(&closes, 5, 0.10, Direction::Short));
        // not enough history
        assert!(!is_pumping(&closes[..4], 2, 0.01, Direction::Long));
    }

    proptest! {
        #[test]
        fn fast_stop_never_moves_against_long(
            entry in 1u32..100_000,
            stop_bp in 0u32..20_000,
            prices in prop::collection::vec(1u32..200_000, 1..50),
        ) {
            let levels = ExitLevels::default();
            let entry = Decimal::from(entry);
            let mut stop = entry * Decimal::new(stop_bp as i64, 4);
            let mut extreme = entry;
            for p in prices {
                extreme = extreme.max(Decimal::from(p));
                let next = levels.fast_stop(stop, entry, extreme, Direction::Long);
                prop_assert!(next >= stop);
                prop_assert!(next >= levels.lock_level(entry, Direction::Long));
                stop = next;
            }
        }

        #[test]
        fn fast_stop_never_moves_against_short(
            entry in 1u32..100_000,
            prices in prop::collection::vec(1u32..200_000, 1..50),
        ) {
            let levels = ExitLevels::default();
            let entry = Decimal::from(entry);
            let mut stop = levels.initial_stop(entry, Direction::Short);
            let mut extreme = entry;
            for p in prices {
                extreme = extreme.min(Decimal::from(p));
                let next = levels.fast_stop(stop, entry, extreme, Direction::Short);
                prop_assert!(next <= stop);
                stop = next;
            }
        }
    }
}
