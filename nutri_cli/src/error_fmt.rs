//! Human-readable error descriptions and structured JSON error formatting.

use nutri_core::error::{BuildError, ResolveError, ScaleError};

/// Map an eyre::Report to a human-readable explanation with likely causes and fix hints.
pub fn humanize(err: &eyre::Report) -> String {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCamera => {
                "What happened: No camera was provided to the scale.\nLikely causes: Camera backend failed to initialize.\nHow to fix: Set [camera] backend = \"mock\" to run without a camera, or install rpicam-still.".to_string()
            }
            BuildError::MissingEngine => {
                "What happened: No inference engine was provided to the scale.\nLikely causes: [inference] could not be set up.\nHow to fix: Check [inference] kind and command in the config.".to_string()
            }
            BuildError::InvalidConfig(msg) => format!(
                "What happened: Invalid configuration ({msg}).\nLikely causes: Out-of-range thresholds in [scale] or [classifier].\nHow to fix: Edit the config file, then rerun. See etc/nutriscale.toml for a sample."
            ),
            BuildError::InvalidFood { food, reason } => format!(
                "What happened: Nutrition entry '{food}' is invalid ({reason}).\nLikely causes: A typo or negative value in [[nutrition.foods]] or the nutrition CSV.\nHow to fix: Correct the entry; macros are per 100 g and must be >= 0."
            ),
        };
    }

    if let Some(re) = err.downcast_ref::<ResolveError>() {
        return match re {
            ResolveError::EmptyLabel => {
                "What happened: The label is empty.\nHow to fix: Pass a non-empty --label.".to_string()
            }
            ResolveError::NotFound { label } => format!(
                "What happened: No nutrition data for '{label}'.\nLikely causes: The food is not in the nutrition table and no alias maps to it.\nHow to fix: Add it to [[nutrition.foods]] or the CSV, or add an [[aliases]] entry."
            ),
        };
    }

    if let Some(se) = err.downcast_ref::<ScaleError>() {
        return match se {
            ScaleError::Config(msg) => format!(
                "What happened: Configuration could not be loaded ({msg}).\nLikely causes: TOML syntax error, unknown value, or a missing table file.\nHow to fix: Fix the config file and rerun."
            ),
            ScaleError::Capture(msg) => format!(
                "What happened: Image capture failed ({msg}).\nLikely causes: Camera not connected or another process holds it.\nHow to fix: Run `nutriscale self-check` and try `rpicam-still -o test.jpg` by hand."
            ),
            ScaleError::Inference(msg) => format!(
                "What happened: Classification failed ({msg}).\nLikely causes: Classifier command missing, crashed, or printed an unexpected format.\nHow to fix: Run the command by hand; each line must be '<score> <label-or-index>'."
            ),
            ScaleError::SensorTimeout | ScaleError::Sensor(_) | ScaleError::Disconnected(_) => format!(
                "What happened: {se}.\nLikely causes: Scale powered off or not paired.\nHow to fix: Check the device path in [sensor] and that the link is bound."
            ),
            other => format!(
                "What happened: {other}.\nLikely causes: See logs.\nHow to fix: Re-run with --log-level=debug or set RUST_LOG for more detail."
            ),
        };
    }

    let msg = err.to_string();
    let mut cause = String::new();
    if let Some(src) = err.source() {
        cause = format!(" Cause: {src}");
    }
    format!(
        "Something went wrong.{cause}\nHow to fix: Re-run with --log-level=debug for details. Original: {msg}"
    )
}

/// Stable exit codes: configuration 2, assembly 3, anything else 1.
pub fn exit_code_for_error(err: &eyre::Report) -> i32 {
    if matches!(err.downcast_ref::<ScaleError>(), Some(ScaleError::Config(_))) {
        return 2;
    }
    if err.downcast_ref::<BuildError>().is_some() {
        return 3;
    }
    1
}

fn reason_name(err: &eyre::Report) -> &'static str {
    if let Some(be) = err.downcast_ref::<BuildError>() {
        return match be {
            BuildError::MissingCamera => "MissingCamera",
            BuildError::MissingEngine => "MissingEngine",
            BuildError::InvalidConfig(_) => "InvalidConfig",
            BuildError::InvalidFood { .. } => "InvalidFood",
        };
    }
    if let Some(re) = err.downcast_ref::<ResolveError>() {
        return match re {
            ResolveError::EmptyLabel => "EmptyLabel",
            ResolveError::NotFound { .. } => "NotFound",
        };
    }
    match err.downcast_ref::<ScaleError>() {
        Some(ScaleError::Config(_)) => "Config",
        Some(ScaleError::Capture(_)) => "Capture",
        Some(ScaleError::Inference(_)) => "Inference",
        Some(_) => "Scale",
        None => "Error",
    }
}

/// Structured JSON for errors when --json is enabled.
pub fn format_error_json(err: &eyre::Report) -> String {
    serde_json::json!({
        "reason": reason_name(err),
        "exit_code": exit_code_for_error(err),
        "message": humanize(err),
    })
    .to_string()
}
