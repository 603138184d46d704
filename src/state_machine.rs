//! Order/chaos state machine
//!
//! Produces the scalar `t_order` that blends the crystalline (1.0) and
//! chaotic (0.0) physics regimes. Only `update(dt)` and `click()` mutate it.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::easing::{ease_in_out_quad, ease_out_cubic};

/// Default duration of the ordered -> chaos transition, in seconds
pub const DEFAULT_SHATTER_DURATION: f32 = 1.5;

/// Default duration of the chaos -> ordered transition, in seconds
pub const DEFAULT_REASSEMBLE_DURATION: f32 = 2.0;

/// The four phases of the cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Phase {
    /// Crystal at rest, `t_order = 1`
    Ordered,
    /// Easing out of the crystal
    Shattering,
    /// Fully chaotic, `t_order = 0`
    Chaos,
    /// Easing back into the crystal
    Reassembling,
}

impl Phase {
    /// Lowercase name for logs and reports
    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Ordered => "ordered",
            Phase::Shattering => "shattering",
            Phase::Chaos => "chaos",
            Phase::Reassembling => "reassembling",
        }
    }
}

impl std::fmt::Display for Phase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Transition durations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TransitionTimings {
    /// Seconds spent in `Shattering`
    pub shatter: f32,
    /// Seconds spent in `Reassembling`
    pub reassemble: f32,
}

impl Default for TransitionTimings {
    fn default() -> Self {
        Self {
            shatter: DEFAULT_SHATTER_DURATION,
            reassemble: DEFAULT_REASSEMBLE_DURATION,
        }
    }
}

/// Order/chaos state machine.
///
/// # Example
///
/// ```
/// use crystal_entropy::state_machine::{OrderChaosStateMachine, Phase};
///
/// let mut sm = OrderChaosStateMachine::new();
/// assert!(sm.click());
/// for _ in 0..15 {
///     sm.update(0.1);
/// }
/// assert_eq!(sm.phase(), Phase::Chaos);
/// assert_eq!(sm.t_order(), 0.0);
/// ```
#[derive(Debug, Clone)]
pub struct OrderChaosStateMachine {
    phase: Phase,
    t_order: f32,
    elapsed: f32,
    timings: TransitionTimings,
}

impl OrderChaosStateMachine {
    /// Start in `Ordered` with default timings
    pub fn new() -> Self {
        Self::with_timings(TransitionTimings::default())
    }

    pub fn with_timings(timings: TransitionTimings) -> Self {
        Self {
            phase: Phase::Ordered,
            t_order: 1.0,
            elapsed: 0.0,
            timings,
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn t_order(&self) -> f32 {
        self.t_order
    }

    /// Seconds elapsed in the current transition (0 in stable phases)
    pub fn elapsed(&self) -> f32 {
        self.elapsed
    }

    /// Clicks are only accepted in the two stable phases
    pub fn can_click(&self) -> bool {
        matches!(self.phase, Phase::Ordered | Phase::Chaos)
    }

    /// Request the next transition.
    ///
    /// Returns `true` if a transition started. Clicks during a transition
    /// are dropped, not queued.
    pub fn click(&mut self) -> bool {
        let next = match self.phase {
            Phase::Ordered => Phase::Shattering,
            Phase::Chaos => Phase::Reassembling,
            Phase::Shattering | Phase::Reassembling => return false,
        };
        self.enter(next);
        true
    }

    /// Advance the active transition by `dt` seconds
    pub fn update(&mut self, dt: f32) {
        let dt = dt.max(0.0);
        match self.phase {
            Phase::Ordered | Phase::Chaos => {}
            Phase::Shattering => {
                let progress = self.advance(dt, self.timings.shatter);
                if progress >= 1.0 {
                    self.enter(Phase::Chaos);
                } else {
                    self.t_order = 1.0 - ease_out_cubic(progress);
                }
            }
            Phase::Reassembling => {
                let progress = self.advance(dt, self.timings.reassemble);
                if progress >= 1.0 {
                    self.enter(Phase::Ordered);
                } else {
                    self.t_order = ease_in_out_quad(progress);
                }
            }
        }
    }

    fn advance(&mut self, dt: f32, duration: f32) -> f32 {
        self.elapsed += dt;
        if duration <= 0.0 {
            return 1.0;
        }
        (self.elapsed / duration).min(1.0)
    }

    fn enter(&mut self, phase: Phase) {
        debug!(from = %self.phase, to = %phase, "phase transition");
        self.phase = phase;
        self.elapsed = 0.0;
        match phase {
            Phase::Ordered => self.t_order = 1.0,
            Phase::Chaos => self.t_order = 0.0,
            // Transitions start from where the stable phase left off
            Phase::Shattering | Phase::Reassembling => {}
        }
    }
}

impl Default for OrderChaosStateMachine {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starts_ordered() {
        let sm = OrderChaosStateMachine::new();
        assert_eq!(sm.phase(), Phase::Ordered);
        assert_eq!(sm.t_order(), 1.0);
        assert!(sm.can_click());
    }

    #[test]
    fn update_in_stable_phase_is_inert() {
        let mut sm = OrderChaosStateMachine::new();
        sm.update(10.0);
        assert_eq!(sm.phase(), Phase::Ordered);
        assert_eq!(sm.t_order(), 1.0);
    }

    #[test]
    fn click_then_fifteen_steps_reaches_chaos() {
        let mut sm = OrderChaosStateMachine::new();
        assert!(sm.click());
        assert_eq!(sm.phase(), Phase::Shattering);

        let mut elapsed = 0.0f32;
        for _ in 0..15 {
            sm.update(0.1);
            elapsed += 0.1;
            if sm.phase() == Phase::Chaos {
                break;
            }
        }

        assert!(elapsed >= 1.5 - 1e-4);
        assert_eq!(sm.phase(), Phase::Chaos);
        assert_eq!(sm.t_order(), 0.0);
    }

    #[test]
    fn click_while_shattering_is_noop() {
        let mut sm = OrderChaosStateMachine::new();
        sm.click();
        sm.update(0.3);

        let phase = sm.phase();
        let t = sm.t_order();
        let elapsed = sm.elapsed();

        assert!(!sm.can_click());
        assert!(!sm.click());
        assert_eq!(sm.phase(), phase);
        assert_eq!(sm.t_order(), t);
        assert_eq!(sm.elapsed(), elapsed);
    }

    #[test]
    fn t_order_decreases_while_shattering() {
        let mut sm = OrderChaosStateMachine::new();
        sm.click();
        let mut prev = sm.t_order();
        for _ in 0..14 {
            sm.update(0.1);
            assert!(sm.t_order() <= prev);
            assert!((0.0..=1.0).contains(&sm.t_order()));
            prev = sm.t_order();
        }
    }

    #[test]
    fn reassembling_returns_to_ordered() {
        let mut sm = OrderChaosStateMachine::new();
        sm.click();
        sm.update(2.0);
        assert_eq!(sm.phase(), Phase::Chaos);

        assert!(sm.click());
        assert_eq!(sm.phase(), Phase::Reassembling);
        assert_eq!(sm.t_order(), 0.0);

        sm.update(1.0);
        assert!((sm.t_order() - 0.5).abs() < 1e-6);

        sm.update(1.0);
        assert_eq!(sm.phase(), Phase::Ordered);
        assert_eq!(sm.t_order(), 1.0);
    }

    #[test]
    fn custom_timings_are_honoured() {
        let mut sm = OrderChaosStateMachine::with_timings(TransitionTimings {
            shatter: 0.2,
            reassemble: 0.4,
        });
        sm.click();
        sm.update(0.1);
        assert_eq!(sm.phase(), Phase::Shattering);
        sm.update(0.1);
        assert_eq!(sm.phase(), Phase::Chaos);
    }

    #[test]
    fn negative_dt_does_not_rewind() {
        let mut sm = OrderChaosStateMachine::new();
        sm.click();
        sm.update(0.5);
        let t = sm.t_order();
        sm.update(-1.0);
        assert_eq!(sm.t_order(), t);
    }

    #[test]
    fn full_cycle_phase_trace() {
        let mut sm = OrderChaosStateMachine::new();
        let mut trace = vec![sm.phase().to_string()];
        for step in 0..50 {
            if step % 20 == 0 {
                sm.click();
            }
            sm.update(0.125);
            if trace.last().map(String::as_str) != Some(sm.phase().as_str()) {
                trace.push(sm.phase().to_string());
            }
        }
        insta::assert_snapshot!(
            trace.join(" -> "),
            @"ordered -> shattering -> chaos -> reassembling -> ordered -> shattering"
        );
    }
}
