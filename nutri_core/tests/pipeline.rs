//! End-to-end cycles through `SmartScale::step` with mock collaborators.

use nutri_core::mocks::{RecordingSink, ScriptedEngine, StaticCamera};
use nutri_core::{
    CycleOutcome, NoResultReason, ScaleError, ScaleState, SmartScale, StabilityCfg, StepStatus,
};
use std::time::{Duration, Instant};

fn quick() -> StabilityCfg {
    StabilityCfg {
        required_stable_samples: 3,
        ..StabilityCfg::default()
    }
}

fn drive(scale: &mut SmartScale, weights: &[f64]) -> Vec<CycleOutcome> {
    weights
        .iter()
        .filter_map(|w| match scale.step(*w) {
            StepStatus::Cycle(o) => Some(o),
            _ => None,
        })
        .collect()
}

fn wait_for(sink: &RecordingSink, n: usize) -> Vec<nutri_traits::NutritionFacts> {
    let deadline = Instant::now() + Duration::from_secs(2);
    loop {
        let got = sink.taken();
        if got.len() >= n || Instant::now() > deadline {
            return got;
        }
        std::thread::sleep(Duration::from_millis(5));
    }
}

#[test]
fn granny_smith_on_the_scale_reports_apple() {
    let sink = RecordingSink::default();
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("current_food.jpg"))
        .with_engine(ScriptedEngine::new([("Granny Smith", 0.62), ("lemon", 0.06)]))
        .with_sink(sink.clone())
        .with_stability(quick())
        .try_build()
        .unwrap();

    let outcomes = drive(&mut scale, &[0.0, 150.0, 150.4, 149.8, 150.1, 150.2, 150.0]);
    assert_eq!(outcomes.len(), 1);
    let facts = outcomes[0].facts().expect("measured");
    assert_eq!(facts.food_key, "apple");
    assert_eq!(facts.weight_g, 150.1);
    assert_eq!(scale.state(), ScaleState::Result);

    let delivered = wait_for(&sink, 1);
    assert_eq!(delivered.len(), 1);
    assert_eq!(delivered[0].food_key, "apple");
}

#[test]
fn one_result_per_placement_until_removed() {
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("banana", 0.9)]))
        .with_stability(quick())
        .try_build()
        .unwrap();

    let mut weights = vec![120.0; 20];
    weights.push(0.0);
    weights.extend([118.0; 10]);
    let outcomes = drive(&mut scale, &weights);
    assert_eq!(outcomes.len(), 2);
    assert_eq!(scale.cycles(), 2);
}

#[test]
fn low_confidence_ends_cycle_without_result() {
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("hotdog", 0.3)]))
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[200.0; 5]);
    assert!(matches!(
        outcomes[..],
        [CycleOutcome::NoResult(NoResultReason::Rejected { .. })]
    ));
    assert_eq!(scale.state(), ScaleState::Result);
}

#[test]
fn capture_failure_is_contained() {
    let camera = StaticCamera::failing();
    let mut scale = SmartScale::builder()
        .with_camera(camera.clone())
        .with_engine(ScriptedEngine::new([("banana", 0.9)]))
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[200.0; 5]);
    assert!(matches!(
        outcomes[..],
        [CycleOutcome::NoResult(NoResultReason::CaptureFailed(ScaleError::Capture(_)))]
    ));
    assert_eq!(camera.count(), 1);
}

#[test]
fn inference_failure_is_contained() {
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::failing())
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[200.0; 5]);
    assert!(matches!(
        outcomes[..],
        [CycleOutcome::NoResult(NoResultReason::InferenceFailed(_))]
    ));
}

#[test]
fn accepted_label_without_nutrition_entry_is_unknown_food() {
    // "fig" is a known alias but the built-in table has no fig entry.
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("fig", 0.8)]))
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[200.0; 5]);
    assert!(matches!(
        outcomes[..],
        [CycleOutcome::NoResult(NoResultReason::UnknownFood(_))]
    ));
}

#[test]
fn quantized_scores_pass_the_known_gate() {
    // 64/255 ~ 0.25 >= 0.2 once normalized.
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("tench", 120.0), ("orange", 64.0)]).quantized())
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[100.0; 5]);
    assert_eq!(outcomes[0].facts().map(|f| f.food_key.as_str()), Some("orange"));
}

#[test]
fn predictions_beyond_top_k_are_ignored() {
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("tench", 0.7), ("goldfish", 0.1), ("banana", 0.1)]))
        .with_classifier(nutri_core::ClassifierCfg {
            top_k: 2,
            ..Default::default()
        })
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[100.0; 5]);
    assert!(matches!(
        outcomes[..],
        [CycleOutcome::NoResult(NoResultReason::UnknownFood(_))]
    ));
}

#[test]
fn engine_unknown_class_is_not_a_resolution_failure() {
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("Unknown", 0.9)]))
        .with_stability(quick())
        .try_build()
        .unwrap();
    let outcomes = drive(&mut scale, &[200.0; 5]);
    assert_eq!(
        outcomes,
        vec![CycleOutcome::NoResult(NoResultReason::Unidentified {
            confidence: 0.9
        })]
    );
    assert_eq!(scale.state(), ScaleState::Result);
}

#[test]
fn slow_failing_sink_does_not_hold_up_the_cycle() {
    let sink = RecordingSink::slow(Duration::from_millis(300)).failing();
    let mut scale = SmartScale::builder()
        .with_camera(StaticCamera::new("x.jpg"))
        .with_engine(ScriptedEngine::new([("banana", 0.9)]))
        .with_sink(sink.clone())
        .with_stability(quick())
        .try_build()
        .unwrap();

    let t0 = Instant::now();
    let outcomes = drive(&mut scale, &[120.0; 5]);
    assert!(t0.elapsed() < Duration::from_millis(200));
    assert_eq!(outcomes[0].facts().map(|f| f.food_key.as_str()), Some("banana"));
    assert_eq!(scale.state(), ScaleState::Result);

    // Dropping the scale waits for the pending delivery attempt.
    drop(scale);
    assert_eq!(sink.taken().len(), 1);
}
