//! Position state machine.
//!
//! A pure per-tick transition over the open position: track the extreme,
//! latch fast mode when the target is reached quickly, ratchet the stop and
//! decide on at most one exit. Nothing here talks to the exchange.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use runner_core::{ExitReason, Position};
use runner_risk::{is_pumping, ratchet, ExitLevels};

/// Inputs the machine needs beyond the position itself.
#[derive(Debug, Clone, Copy)]
pub struct MarketTick<'a> {
    /// Latest close
    pub price: Decimal,
    /// 1-minute closes, oldest first, for the pump check
    pub closes: &'a [f64],
    pub now: DateTime<Utc>,
}

/// Result of one transition.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    /// The position after this tick's updates
    pub next: Position,
    /// Fast mode latched on this tick
    pub fast_activated: bool,
    /// Stop moved on this tick
    pub stop_moved: bool,
    pub exit: Option<ExitReason>,
}

/// Fast-runner transition rules.
#[derive(Debug, Clone)]
pub struct PositionMachine {
    levels: ExitLevels,
    fast_window_secs: i64,
    pump_lookback: usize,
    pump_pct: f64,
}

impl PositionMachine {
    pub fn new(levels: ExitLevels, fast_window_secs: i64, pump_lookback: usize, pump_pct: f64) -> Self {
        Self {
            levels,
            fast_window_secs,
            pump_lookback,
            pump_pct,
        }
    }

    pub fn levels(&self) -> &ExitLevels {
        &self.levels
    }

    /// Advance `position` by one tick.
    ///
    /// The input is not modified; callers commit [`Step::next`] only when no
    /// exit is requested or the exit fill is confirmed.
    pub fn step(&self, position: &Position, tick: &MarketTick<'_>) -> Step {
        let direction = position.direction;
        let price = tick.price;
        let mut next = position.clone();
        let mut fast_activated = false;

        next.extreme_price = ratchet(next.extreme_price, price, direction);

        let hit_target = self.levels.hit_target(next.entry_price, price, direction);
        if !next.fast_mode && hit_target {
            let quick = next.held_secs(tick.now) <= self.fast_window_secs;
            let pumping = is_pumping(tick.closes, self.pump_lookback, self.pump_pct, direction);
            if quick || pumping {
                next.fast_mode = true;
                fast_activated = true;
                let lock = self.levels.lock_level(next.entry_price, direction);
                next.stop_price = ratchet(next.stop_price, lock, direction);
            }
        }

        if next.fast_mode {
            next.stop_price = self.levels.fast_stop(
                next.stop_price,
                next.entry_price,
                next.extreme_price,
                direction,
            );
        }

        // stop before target when both hold
        let exit = if self.levels.is_triggered(next.stop_price, price, direction) {
            Some(if next.fast_mode {
                ExitReason::Trailing
            } else {
                ExitReason::Stop
            })
        } else if hit_target && !next.fast_mode {
            Some(ExitReason::Target)
        } else {
            None
        };

        Step {
            stop_moved: next.stop_price != position.stop_price,
            next,
            fast_activated,
            exit,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};
    use proptest::prelude::*;
    use runner_core::Direction;
    use rust_decimal_macros::dec;

    fn machine() -> PositionMachine {
        PositionMachine::new(ExitLevels::default(), 600, 5, 0.10)
    }

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
    }

    fn long_at(entry: Decimal) -> Position {
        let stop = ExitLevels::default().initial_stop(entry, Direction::Long);
        Position::open("BTCUSDT", Direction::Long, dec!(1), entry, stop, t0())
    }

    fn tick(price: Decimal, secs: i64) -> MarketTick<'static> {
        MarketTick {
            price,
            closes: &[],
            now: t0() + Duration::seconds(secs),
        }
    }

    #[test]
    fn test_target_in_window_activates_fast_mode() {
        let step = machine().step(&long_at(dec!(100)), &tick(dec!(110), 120));
        assert!(step.fast_activated);
        assert!(step.next.fast_mode);
        assert!(step.next.stop_price >= dec!(109.8));
        assert_eq!(step.exit, None);
    }

    #[test]
    fn test_stop_before_target() {
        let step = machine().step(&long_at(dec!(100)), &tick(dec!(99), 30));
        assert_eq!(step.exit, Some(ExitReason::Stop));
        assert!(!step.next.fast_mode);
    }

    #[test]
    fn test_late_target_takes_profit() {
        let step = machine().step(&long_at(dec!(100)), &tick(dec!(110), 601));
        assert!(!step.fast_activated);
        assert_eq!(step.exit, Some(ExitReason::Target));
    }

    #[test]
    fn test_late_target_with_pump_activates() {
        let closes = [95.0, 96.0, 97.0, 99.0, 100.0, 104.0, 110.0];
        let step = machine().step(
            &long_at(dec!(100)),
            &MarketTick {
                price: dec!(110),
                closes: &closes,
                now: t0() + Duration::seconds(3600),
            },
        );
        assert!(step.fast_activated);
        assert_eq!(step.exit, None);
    }

    #[test]
    fn test_fast_mode_trails_extreme() {
        let mut pos = long_at(dec!(100));
        pos.fast_mode = true;
        pos.stop_price = dec!(109.8);
        pos.extreme_price = dec!(125);

        let step = machine().step(&pos, &tick(dec!(130), 900));
        assert_eq!(step.next.extreme_price, dec!(130));
        assert_eq!(step.next.stop_price, dec!(127.4));
        assert!(step.stop_moved);
        assert_eq!(step.exit, None);

        // no take-profit in fast mode, only the trailing stop
        let step = machine().step(&step.next, &tick(dec!(127.4), 960));
        assert_eq!(step.exit, Some(ExitReason::Trailing));
    }

    #[test]
    fn test_short_mirrors_long() {
        let levels = ExitLevels::default();
        let pos = Position::open(
            "ETHUSDT",
            Direction::Short,
            dec!(1),
            dec!(100),
            levels.initial_stop(dec!(100), Direction::Short),
            t0(),
        );

        let step = machine().step(&pos, &tick(dec!(90), 60));
        assert!(step.fast_activated);
        assert!(step.next.stop_price <= dec!(90.2));

        let step = machine().step(&pos, &tick(dec!(101), 60));
        assert_eq!(step.exit, Some(ExitReason::Stop));
    }

    #[test]
    fn test_input_position_untouched() {
        let pos = long_at(dec!(100));
        let before = pos.clone();
        let _ = machine().step(&pos, &tick(dec!(110), 10));
        assert_eq!(pos, before);
    }

    proptest! {
        #[test]
        fn prop_fast_mode_latches_and_stop_ratchets(
            moves in proptest::collection::vec(-300i64..300, 1..60)
        ) {
            let machine = machine();
            let mut pos = long_at(dec!(100));
            pos.fast_mode = true;
            pos.stop_price = dec!(109.8);
            pos.extreme_price = dec!(110);

            let mut price = dec!(115);
            for (i, m) in moves.into_iter().enumerate() {
                price = (price + Decimal::new(m, 2)).max(dec!(1));
                let step = machine.step(&pos, &tick(price, 700 + i as i64 * 5));
                prop_assert!(step.next.fast_mode);
                prop_assert!(step.next.stop_price >= pos.stop_price);
                prop_assert!(step.next.stop_price >= dec!(109.8));
                if step.exit.is_some() {
                    prop_assert_eq!(step.exit, Some(ExitReason::Trailing));
                    break;
                }
                pos = step.next;
            }
        }
    }
}
