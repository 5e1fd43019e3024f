//! Config mapping, hardware assembly, and subcommand execution.

use eyre::WrapErr;
use nutri_config::{CameraBackendPref, Config, InferenceKind, SensorKind, SinkKind};
use nutri_core::classifier::{self, Classifier, Verdict};
use nutri_core::conversions::{resolver_from, score_scale};
use nutri_core::error::Result as CoreResult;
use nutri_core::runner::{self, RunSummary};
use nutri_core::sampler::Sampler;
use nutri_core::{
    ClassifierCfg, CycleOutcome, LabelResolver, LoopCfg, ScaleState, SmartScale, StabilityCfg,
    StepStatus,
};
use nutri_hardware::camera::{BackendPref, CaptureSettings, probe};
use nutri_hardware::{CommandEngine, CommandSink, JsonlSink, SerialScale, SimulatedEngine, SimulatedScale};
use nutri_traits::{Camera, ImageHandle, InferenceEngine, NutritionFacts, RankedPrediction, ResultSink};
use nutri_traits::clock::MonotonicClock;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

fn backend_pref(p: CameraBackendPref) -> BackendPref {
    match p {
        CameraBackendPref::Auto => BackendPref::Auto,
        CameraBackendPref::Rpicam => BackendPref::Rpicam,
        CameraBackendPref::Libcamera => BackendPref::Libcamera,
        CameraBackendPref::Mock => BackendPref::Mock,
    }
}

fn capture_settings(cfg: &Config, out: Option<PathBuf>) -> CaptureSettings {
    CaptureSettings {
        output: out.unwrap_or_else(|| PathBuf::from(&cfg.camera.output)),
        width: cfg.camera.width,
        height: cfg.camera.height,
        warmup: Duration::from_millis(cfg.camera.warmup_ms),
        timeout: Duration::from_millis(cfg.camera.warmup_ms.saturating_add(10_000)),
    }
}

pub fn build_camera(cfg: &Config, out: Option<PathBuf>) -> Box<dyn Camera + Send> {
    nutri_hardware::select_camera(backend_pref(cfg.camera.backend), capture_settings(cfg, out))
}

pub fn build_engine(cfg: &Config) -> CoreResult<Box<dyn InferenceEngine + Send>> {
    let inf = &cfg.inference;
    let scale = score_scale(inf.score_scale);
    match inf.kind {
        InferenceKind::Simulated => {
            let preds = inf
                .predictions
                .iter()
                .map(|p| RankedPrediction::new(p.label.clone(), p.score))
                .collect();
            Ok(Box::new(SimulatedEngine::new(preds, scale)))
        }
        InferenceKind::Command => {
            let template = inf.command.as_deref().unwrap_or_default();
            let labels = cfg.labels().map_err(config_error)?;
            let engine = CommandEngine::new(
                template,
                labels,
                scale,
                Duration::from_millis(inf.timeout_ms),
            )
            .map_err(|e| config_error(eyre::eyre!("inference.command: {e}")))?;
            Ok(Box::new(engine))
        }
    }
}

/// `None` when results are not delivered anywhere.
pub fn build_sink(cfg: &Config) -> CoreResult<Option<Box<dyn ResultSink + Send>>> {
    let s = &cfg.sink;
    match s.kind {
        SinkKind::None => Ok(None),
        SinkKind::Jsonl => {
            let path = s.path.clone().unwrap_or_default();
            tracing::info!(%path, "results appended as JSON lines");
            Ok(Some(Box::new(JsonlSink::new(path))))
        }
        SinkKind::Command => {
            if s.api_key_missing() {
                tracing::warn!("sink.api_key not set, result upload disabled");
                return Ok(None);
            }
            let sink = CommandSink::new(
                s.command.as_deref().unwrap_or_default(),
                s.api_key.as_deref().unwrap_or_default(),
                Duration::from_millis(s.timeout_ms),
            )
            .map_err(|e| config_error(eyre::eyre!("sink.command: {e}")))?;
            Ok(Some(Box::new(sink)))
        }
    }
}

pub fn build_resolver(cfg: &Config) -> CoreResult<LabelResolver> {
    let foods = cfg.foods().map_err(config_error)?;
    Ok(resolver_from(&foods, &cfg.aliases)?)
}

pub fn build_scale(cfg: &Config) -> CoreResult<SmartScale> {
    let scale = SmartScale::builder()
        .with_boxed_camera(build_camera(cfg, None))
        .with_boxed_engine(build_engine(cfg)?)
        .with_boxed_sink(build_sink(cfg)?)
        .with_stability(StabilityCfg::from(&cfg.scale))
        .with_classifier(ClassifierCfg::from(&cfg.classifier))
        .with_resolver(build_resolver(cfg)?)
        .try_build()?;
    Ok(scale)
}

pub fn spawn_sampler(cfg: &Config) -> Sampler {
    let s = &cfg.sensor;
    let timeout = Duration::from_millis(s.read_timeout_ms);
    let reconnect = Duration::from_millis(s.reconnect_ms);
    match s.kind {
        SensorKind::Simulated => Sampler::spawn(
            SimulatedScale::new(s.script.clone()),
            s.rate_hz,
            timeout,
            reconnect,
            MonotonicClock::new(),
        ),
        SensorKind::Serial => {
            let device = s.device.clone().unwrap_or_default();
            Sampler::spawn_event(
                SerialScale::open_or_wait(device),
                timeout,
                reconnect,
                MonotonicClock::new(),
            )
        }
    }
}

pub fn config_error(e: eyre::Report) -> eyre::Report {
    eyre::Report::new(nutri_core::ScaleError::Config(format!("{e:#}")))
}

pub fn print_facts(facts: &NutritionFacts, json: bool) {
    if json {
        println!(
            "{}",
            serde_json::json!({
                "food": facts.food_key,
                "weight_g": facts.weight_g,
                "calories": facts.calories,
                "protein_g": facts.protein_g,
                "carbs_g": facts.carbs_g,
                "fats_g": facts.fats_g,
            })
        );
        return;
    }
    let rule = "=".repeat(30);
    println!("\n{rule}");
    println!(" FOOD DETECTED: {}", facts.display_name());
    println!(" WEIGHT: {:.1}g", facts.weight_g);
    println!("{}", "-".repeat(30));
    println!(" CALORIES: {:.1} kcal", facts.calories);
    println!(" PROTEIN:  {:.1} g", facts.protein_g);
    println!(" CARBS:    {:.1} g", facts.carbs_g);
    println!(" FATS:     {:.1} g", facts.fats_g);
    println!("{rule}\n");
}

/// Any reset to IDLE: the item came off the scale, whether or not it was measured.
fn item_removed(status: &StepStatus) -> bool {
    matches!(
        status,
        StepStatus::Transitioned {
            to: ScaleState::Idle,
            ..
        }
    )
}

pub fn run_loop(
    cfg: &Config,
    max_cycles: Option<u64>,
    poll_ms: Option<u64>,
    stop: Arc<AtomicBool>,
    json: bool,
) -> CoreResult<RunSummary> {
    let mut scale = build_scale(cfg)?;
    if !scale.pipeline().has_sink() {
        tracing::info!("no result sink configured");
    }
    let sampler = spawn_sampler(cfg);
    let mut loop_cfg = LoopCfg::from(&cfg.scale);
    loop_cfg.max_cycles = max_cycles;
    if let Some(ms) = poll_ms {
        loop_cfg.poll_ms = ms;
    }

    let summary = runner::run(
        &mut scale,
        &sampler,
        &MonotonicClock::new(),
        &loop_cfg,
        &stop,
        |status| match status {
            StepStatus::Cycle(CycleOutcome::Measured(facts)) => print_facts(facts, json),
            s if !json && item_removed(s) => println!("\n--- READY FOR NEXT ITEM ---\n"),
            _ => {}
        },
    )?;
    // Dropping the scale joins the sink worker so queued results are delivered.
    drop(scale);
    drop(sampler);
    Ok(summary)
}

pub fn resolve(cfg: &Config, label: &str, grams: f64, json: bool) -> CoreResult<()> {
    let resolver = build_resolver(cfg)?;
    let facts = resolver.resolve(label, grams)?;
    print_facts(&facts, json);
    Ok(())
}

pub fn classify(cfg: &Config, image: PathBuf, json: bool) -> CoreResult<()> {
    if !image.is_file() {
        eyre::bail!("image not found: {}", image.display());
    }
    let mut engine = build_engine(cfg)?;
    let resolver = build_resolver(cfg)?;
    let classifier = Classifier::new(ClassifierCfg::from(&cfg.classifier));

    let mut preds = engine
        .classify(&ImageHandle::new(image))
        .map_err(|e| eyre::Report::new(nutri_core::ScaleError::Inference(e.to_string())))?;
    classifier::normalize(&mut preds, engine.score_scale());
    preds.truncate(classifier.cfg().top_k);
    let verdict = classifier.decide(&preds, &resolver.known_keywords());

    if json {
        let (label, confidence, accepted) = match &verdict {
            Verdict::Accepted(d) => (Some(d.label.clone()), d.confidence, true),
            Verdict::Rejected {
                label, confidence, ..
            } => (label.clone(), *confidence, false),
        };
        let top: Vec<_> = preds
            .iter()
            .map(|p| serde_json::json!({ "label": p.label, "score": p.score }))
            .collect();
        println!(
            "{}",
            serde_json::json!({ "predictions": top, "label": label, "confidence": confidence, "accepted": accepted })
        );
        return Ok(());
    }

    for (rank, p) in preds.iter().enumerate() {
        println!("{:>2}. {:<30} {:.3}", rank + 1, p.label, p.score);
    }
    match verdict {
        Verdict::Accepted(d) => println!(
            "decision: {} ({:.3}{})",
            d.label,
            d.confidence,
            if d.promoted { ", known food" } else { "" }
        ),
        Verdict::Rejected {
            label,
            confidence,
            threshold,
        } => println!(
            "rejected: {} ({confidence:.3} < {threshold:.2})",
            label.as_deref().unwrap_or("-")
        ),
    }
    Ok(())
}

pub fn capture(cfg: &Config, out: Option<PathBuf>) -> CoreResult<()> {
    let mut camera = build_camera(cfg, out);
    let handle = camera
        .capture()
        .map_err(|e| eyre::Report::new(nutri_core::ScaleError::Capture(e.to_string())))?;
    println!("{}", handle.path.display());
    Ok(())
}

pub fn self_check(cfg: &Config, json: bool) -> CoreResult<()> {
    let backend = probe(backend_pref(cfg.camera.backend));
    let camera = backend.program().unwrap_or("mock");
    let sensor = match cfg.sensor.kind {
        SensorKind::Simulated => "simulated".to_string(),
        SensorKind::Serial => {
            let dev = cfg.sensor.device.as_deref().unwrap_or_default();
            let present = std::path::Path::new(dev).exists();
            format!("serial {dev} ({})", if present { "present" } else { "absent" })
        }
    };
    let engine = match cfg.inference.kind {
        InferenceKind::Simulated => "simulated".to_string(),
        InferenceKind::Command => format!(
            "command: {}",
            cfg.inference.command.as_deref().unwrap_or_default()
        ),
    };
    let sink = match cfg.sink.kind {
        SinkKind::None => "none".to_string(),
        SinkKind::Jsonl => format!("jsonl {}", cfg.sink.path.as_deref().unwrap_or_default()),
        SinkKind::Command if cfg.sink.api_key_missing() => "command (disabled: no api key)".to_string(),
        SinkKind::Command => "command".to_string(),
    };
    let resolver = build_resolver(cfg)?;
    let foods = resolver.table().len();
    let aliases = resolver.aliases().len();

    if json {
        println!(
            "{}",
            serde_json::json!({
                "ok": true,
                "sensor": sensor,
                "camera": camera,
                "inference": engine,
                "sink": sink,
                "foods": foods,
                "aliases": aliases,
            })
        );
    } else {
        println!("OK");
        println!("sensor:    {sensor}");
        println!("camera:    {camera}");
        println!("inference: {engine}");
        println!("sink:      {sink}");
        println!("tables:    {foods} foods, {aliases} aliases");
    }
    Ok(())
}
