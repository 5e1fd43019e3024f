//! Weight stabilization state machine.
//!
//! Turns a jittery weight stream into one stable event per physical placement.
//! Removal (weight below the reset threshold) is checked before anything else
//! on every sample, so it pre-empts stabilization and an in-flight result.
//!
//! Out-of-tolerance samples re-anchor on the new weight instead of abandoning
//! the attempt. A weight that drifts slowly by more than the variance per
//! sample therefore keeps re-anchoring and never stabilizes; this is expected.

use crate::config::StabilityCfg;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScaleState {
    #[default]
    Idle,
    Stabilizing,
    Processing,
    Result,
}

impl ScaleState {
    pub fn as_str(self) -> &'static str {
        match self {
            ScaleState::Idle => "IDLE",
            ScaleState::Stabilizing => "STABILIZING",
            ScaleState::Processing => "PROCESSING",
            ScaleState::Result => "RESULT",
        }
    }
}

impl std::fmt::Display for ScaleState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Anchor and run length of the current stabilization attempt.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StabilityWindow {
    pub anchor_weight: f64,
    pub consecutive_stable_count: u32,
}

/// Emitted exactly once per IDLE -> STABILIZING -> PROCESSING cycle.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StableEvent {
    pub weight_g: f64,
}

/// What a single sample did to the engine.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Transition {
    /// State unchanged.
    None,
    /// Moved between states without a stable event.
    Changed { from: ScaleState, to: ScaleState },
    /// Entered PROCESSING; the caller must run the pipeline and then call `complete()`.
    Stable(StableEvent),
}

#[derive(Debug, Clone)]
pub struct StabilizationEngine {
    cfg: StabilityCfg,
    state: ScaleState,
    window: StabilityWindow,
}

impl StabilizationEngine {
    pub fn new(cfg: StabilityCfg) -> Self {
        Self {
            cfg,
            state: ScaleState::Idle,
            window: StabilityWindow::default(),
        }
    }

    pub fn state(&self) -> ScaleState {
        self.state
    }

    pub fn window(&self) -> StabilityWindow {
        self.window
    }

    pub fn cfg(&self) -> &StabilityCfg {
        &self.cfg
    }

    /// Feed one weight sample.
    pub fn feed(&mut self, weight_g: f64) -> Transition {
        let from = self.state;

        // Removal wins over everything, including an in-flight result.
        if weight_g < self.cfg.reset_threshold_g && self.state != ScaleState::Idle {
            tracing::info!(weight_g, from = %from, "weight removed, resetting to IDLE");
            self.state = ScaleState::Idle;
            self.window.consecutive_stable_count = 0;
            return Transition::Changed {
                from,
                to: ScaleState::Idle,
            };
        }

        match self.state {
            ScaleState::Idle => {
                if weight_g > self.cfg.start_threshold_g {
                    tracing::info!(weight_g, "weight detected, stabilizing");
                    self.state = ScaleState::Stabilizing;
                    self.window = StabilityWindow {
                        anchor_weight: weight_g,
                        consecutive_stable_count: 0,
                    };
                    return Transition::Changed {
                        from,
                        to: ScaleState::Stabilizing,
                    };
                }
                Transition::None
            }
            ScaleState::Stabilizing => {
                let deviation = (weight_g - self.window.anchor_weight).abs();
                if deviation < self.cfg.stable_variance_g {
                    self.window.consecutive_stable_count =
                        self.window.consecutive_stable_count.saturating_add(1);
                    tracing::trace!(
                        weight_g,
                        deviation,
                        count = self.window.consecutive_stable_count,
                        "stable sample"
                    );
                    if self.window.consecutive_stable_count >= self.cfg.required_stable_samples {
                        tracing::info!(weight_g, "weight stable");
                        self.state = ScaleState::Processing;
                        return Transition::Stable(StableEvent { weight_g });
                    }
                } else {
                    tracing::trace!(weight_g, deviation, "out of tolerance, re-anchoring");
                    self.window = StabilityWindow {
                        anchor_weight: weight_g,
                        consecutive_stable_count: 0,
                    };
                }
                Transition::None
            }
            // Held until complete(); stability bookkeeping is suspended.
            ScaleState::Processing => Transition::None,
            // Waits for removal, handled above.
            ScaleState::Result => Transition::None,
        }
    }

    /// Signal that the pipeline finished (success or failure). PROCESSING -> RESULT.
    ///
    /// Returns false and leaves the state untouched when not in PROCESSING.
    pub fn complete(&mut self) -> bool {
        if self.state != ScaleState::Processing {
            tracing::debug!(state = %self.state, "complete() outside PROCESSING ignored");
            return false;
        }
        self.state = ScaleState::Result;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn engine() -> StabilizationEngine {
        StabilizationEngine::new(StabilityCfg::default())
    }

    #[test]
    fn thresholds_are_strict() {
        let mut e = engine();
        assert_eq!(e.feed(10.0), Transition::None);
        assert_eq!(e.state(), ScaleState::Idle);

        e.feed(150.0);
        assert_eq!(e.state(), ScaleState::Stabilizing);
        // Exactly at the reset threshold does not reset.
        e.feed(5.0);
        assert_eq!(e.state(), ScaleState::Stabilizing);
    }

    #[test]
    fn deviation_equal_to_variance_re_anchors() {
        let mut e = engine();
        e.feed(150.0);
        e.feed(151.0);
        assert_eq!(e.window().consecutive_stable_count, 1);
        e.feed(153.0); // |153 - 150| = 3 >= 2
        assert_eq!(
            e.window(),
            StabilityWindow {
                anchor_weight: 153.0,
                consecutive_stable_count: 0
            }
        );
        e.feed(155.0); // exactly 2.0 away is not stable
        assert_eq!(e.window().anchor_weight, 155.0);
        assert_eq!(e.window().consecutive_stable_count, 0);
    }

    #[test]
    fn processing_ignores_samples_until_complete() {
        let mut e = StabilizationEngine::new(StabilityCfg {
            required_stable_samples: 1,
            ..StabilityCfg::default()
        });
        e.feed(100.0);
        assert!(matches!(e.feed(100.0), Transition::Stable(_)));
        assert_eq!(e.feed(400.0), Transition::None);
        assert_eq!(e.state(), ScaleState::Processing);
        assert!(e.complete());
        assert_eq!(e.state(), ScaleState::Result);
        assert!(!e.complete());
    }

    #[test]
    fn complete_is_a_noop_when_idle() {
        let mut e = engine();
        assert!(!e.complete());
        assert_eq!(e.state(), ScaleState::Idle);
    }

    #[test]
    fn removal_pre_empts_result() {
        let mut e = StabilizationEngine::new(StabilityCfg {
            required_stable_samples: 1,
            ..StabilityCfg::default()
        });
        e.feed(100.0);
        e.feed(100.0);
        e.complete();
        assert_eq!(e.feed(100.0), Transition::None);
        assert_eq!(
            e.feed(0.0),
            Transition::Changed {
                from: ScaleState::Result,
                to: ScaleState::Idle
            }
        );
        assert_eq!(e.window().consecutive_stable_count, 0);
    }
}
