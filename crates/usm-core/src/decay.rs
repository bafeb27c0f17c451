use serde::{Deserialize, Serialize};

/// How a decayed signal relaxes back to its baseline.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecayKind {
    /// Baseline 1. The stored factor is raised to a shrinking exponent:
    /// `stored ^ (0.5 ^ (elapsed / half_life))`. Used for price adjustments.
    Multiplicative,
    /// Baseline 0. The stored value is scaled down:
    /// `stored * 0.5 ^ (elapsed / half_life)`. Used for the price floor.
    Linear,
}

impl DecayKind {
    pub fn baseline(self) -> f64 {
        match self {
            DecayKind::Multiplicative => 1.0,
            DecayKind::Linear => 0.0,
        }
    }
}

/// A quantity whose effective value decays geometrically toward a baseline
/// as time passes since it was last set.
///
/// Reading never mutates: the effective value is a function of the stored
/// pair and the caller's clock.
#[derive(Debug, Clone, PartialEq)]
pub struct DecayedSignal {
    kind: DecayKind,
    half_life_secs: f64,
    stored_value: f64,
    stored_at: f64,
}

impl DecayedSignal {
    /// A signal sitting at its baseline. `half_life_secs` must be positive;
    /// the engine validates it through its configuration.
    pub fn at_baseline(kind: DecayKind, half_life_secs: f64, now: f64) -> Self {
        Self {
            kind,
            half_life_secs,
            stored_value: kind.baseline(),
            stored_at: now,
        }
    }

    /// Effective value at `now`.
    pub fn effective(&self, now: f64) -> f64 {
        let elapsed = (now - self.stored_at).max(0.0);
        let weight = 0.5_f64.powf(elapsed / self.half_life_secs);
        match self.kind {
            DecayKind::Multiplicative => self.stored_value.powf(weight),
            DecayKind::Linear => self.stored_value * weight,
        }
    }

    /// Overwrite both the stored value and its timestamp.
    pub fn set(&mut self, value: f64, now: f64) {
        self.stored_value = value;
        self.stored_at = now;
    }

    /// Return to the baseline as of `now`.
    pub fn reset(&mut self, now: f64) {
        self.set(self.kind.baseline(), now);
    }

    pub fn is_at_baseline(&self) -> bool {
        self.stored_value == self.kind.baseline()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    const HALF_LIFE: f64 = 60.0;

    fn adjustment(value: f64) -> DecayedSignal {
        let mut signal = DecayedSignal::at_baseline(DecayKind::Multiplicative, HALF_LIFE, 0.0);
        signal.set(value, 1_000.0);
        signal
    }

    fn floor(value: f64) -> DecayedSignal {
        let mut signal = DecayedSignal::at_baseline(DecayKind::Linear, HALF_LIFE, 0.0);
        signal.set(value, 1_000.0);
        signal
    }

    #[test]
    fn fresh_signals_read_their_baseline() {
        let adj = DecayedSignal::at_baseline(DecayKind::Multiplicative, HALF_LIFE, 5.0);
        let flr = DecayedSignal::at_baseline(DecayKind::Linear, HALF_LIFE, 5.0);
        assert_eq!(adj.effective(500.0), 1.0);
        assert_eq!(flr.effective(500.0), 0.0);
        assert!(adj.is_at_baseline());
        assert!(flr.is_at_baseline());
    }

    #[test]
    fn multiplicative_decay_takes_square_root_per_half_life() {
        // 1.5 -> 1.2247 -> 1.1067
        let signal = adjustment(1.5);
        assert_eq!(signal.effective(1_000.0), 1.5);
        assert!((signal.effective(1_060.0) - 1.5_f64.sqrt()).abs() < 1e-12);
        assert!((signal.effective(1_120.0) - 1.5_f64.powf(0.25)).abs() < 1e-12);
    }

    #[test]
    fn multiplicative_decay_below_one_rises_toward_one() {
        let signal = adjustment(0.64);
        assert!((signal.effective(1_060.0) - 0.8).abs() < 1e-12);
    }

    #[test]
    fn linear_decay_halves_per_half_life() {
        let signal = floor(0.08);
        assert_eq!(signal.effective(1_000.0), 0.08);
        assert!((signal.effective(1_060.0) - 0.04).abs() < 1e-15);
        assert!((signal.effective(1_180.0) - 0.01).abs() < 1e-15);
    }

    #[test]
    fn reset_returns_to_baseline() {
        let mut signal = floor(0.08);
        assert!(!signal.is_at_baseline());
        signal.reset(2_000.0);
        assert!(signal.is_at_baseline());
        assert_eq!(signal.effective(2_000.0), 0.0);
        assert_eq!(signal.effective(2_000.0 + 86_400.0), 0.0);
    }

    #[test]
    fn reading_does_not_mutate() {
        let signal = adjustment(1.5);
        let before = signal.clone();
        let _ = signal.effective(10_000.0);
        assert_eq!(signal, before);
    }

    proptest! {
        #[test]
        fn multiplicative_decay_is_monotonic_toward_one(
            value in 0.01f64..100.0,
            t1 in 0.0f64..10_000.0,
            dt in 0.0f64..10_000.0,
        ) {
            let signal = adjustment(value);
            let early = signal.effective(1_000.0 + t1);
            let late = signal.effective(1_000.0 + t1 + dt);
            prop_assert!((late - 1.0).abs() <= (early - 1.0).abs() + 1e-12);
            prop_assert!((signal.effective(1_000.0) - value).abs() <= 1e-12 * value.max(1.0));
        }

        #[test]
        fn linear_decay_is_monotonic_toward_zero(
            value in 0.0f64..1_000.0,
            t1 in 0.0f64..1_000_000.0,
            dt in 0.0f64..1_000_000.0,
        ) {
            let signal = floor(value);
            let early = signal.effective(1_000.0 + t1);
            let late = signal.effective(1_000.0 + t1 + dt);
            prop_assert!(late <= early);
            prop_assert!(late >= 0.0);
        }

        #[test]
        fn decay_reaches_baseline_eventually(value in 0.01f64..100.0) {
            let adj = adjustment(value);
            let flr = floor(value);
            let far = 1_000.0 + HALF_LIFE * 2_000.0;
            prop_assert!((adj.effective(far) - 1.0).abs() < 1e-9);
            prop_assert!(flr.effective(far) < 1e-9);
        }
    }
}
