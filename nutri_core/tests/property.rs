use nutri_core::{ScaleState, StabilityCfg, StabilizationEngine, Transition};
use proptest::prelude::*;

fn cfg(required: u32) -> StabilityCfg {
    StabilityCfg {
        required_stable_samples: required,
        ..StabilityCfg::default()
    }
}

proptest! {
    // At most one stable event between two visits to IDLE, whatever the input.
    #[test]
    fn one_stable_event_per_placement(
        weights in proptest::collection::vec(-20.0f64..400.0, 0..400),
        required in 1u32..12,
        complete_every in 0usize..4,
    ) {
        let mut e = StabilizationEngine::new(cfg(required));
        let mut events_since_idle = 0u32;
        for (i, w) in weights.iter().enumerate() {
            match e.feed(*w) {
                Transition::Stable(ev) => {
                    events_since_idle += 1;
                    prop_assert_eq!(ev.weight_g, *w);
                    prop_assert_eq!(e.state(), ScaleState::Processing);
                }
                Transition::Changed { to: ScaleState::Idle, .. } => events_since_idle = 0,
                _ => {}
            }
            prop_assert!(events_since_idle <= 1);
            if complete_every > 0 && i % complete_every == 0 {
                e.complete();
            }
        }
    }

    // Any sample under the reset threshold leaves the engine IDLE with a zero count.
    #[test]
    fn removal_always_resets(
        prefix in proptest::collection::vec(0.0f64..400.0, 0..100),
        removed in -50.0f64..4.999,
    ) {
        let mut e = StabilizationEngine::new(cfg(3));
        for w in &prefix {
            e.feed(*w);
            e.complete();
        }
        e.feed(removed);
        prop_assert_eq!(e.state(), ScaleState::Idle);
        prop_assert_eq!(e.window().consecutive_stable_count, 0);
    }

    // A constant weight above the start threshold stabilizes after exactly `required` further samples.
    #[test]
    fn constant_weight_stabilizes_on_schedule(w in 10.001f64..5000.0, required in 1u32..20) {
        let mut e = StabilizationEngine::new(cfg(required));
        let started = matches!(e.feed(w), Transition::Changed { to: ScaleState::Stabilizing, .. });
        prop_assert!(started);
        for _ in 1..required {
            prop_assert_eq!(e.feed(w), Transition::None);
        }
        prop_assert!(matches!(e.feed(w), Transition::Stable(_)));
    }
}
