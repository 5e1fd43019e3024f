//! Polling control loop.
//!
//! Every `poll_ms` the loop reads the newest sample from a `WeightSource` and
//! feeds it to the `SmartScale`. A missing sample or a disconnected source is
//! not an error: the loop logs the change and keeps polling. Stop requests are
//! honored between iterations, never in the middle of a cycle.
use crate::config::LoopCfg;
use crate::error::Result as CoreResult;
use crate::status::StepStatus;
use crate::SmartScale;
use nutri_traits::WeightSource;
use nutri_traits::clock::Clock;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RunSummary {
    pub iterations: u64,
    pub cycles: u64,
    pub measured: u64,
}

/// Run until `stop` is set or `cfg.max_cycles` cycles have completed.
///
/// `on_status` sees every step result, including idle ones.
pub fn run<W, C, F>(
    scale: &mut SmartScale,
    source: &W,
    clock: &C,
    cfg: &LoopCfg,
    stop: &AtomicBool,
    mut on_status: F,
) -> CoreResult<RunSummary>
where
    W: WeightSource + ?Sized,
    C: Clock + ?Sized,
    F: FnMut(&StepStatus),
{
    if cfg.poll_ms == 0 {
        eyre::bail!("poll_ms must be >= 1");
    }
    let period = Duration::from_millis(cfg.poll_ms);
    let mut summary = RunSummary::default();
    let mut was_available: Option<bool> = None;
    tracing::info!(poll_ms = cfg.poll_ms, max_cycles = ?cfg.max_cycles, "control loop start");

    loop {
        if stop.load(Ordering::Relaxed) {
            tracing::info!("stop requested");
            break;
        }
        if cfg.max_cycles.is_some_and(|max| summary.cycles >= max) {
            tracing::info!(cycles = summary.cycles, "cycle limit reached");
            break;
        }
        summary.iterations = summary.iterations.saturating_add(1);

        let sample = if source.is_connected() {
            source.latest()
        } else {
            None
        };

        let available = sample.is_some();
        if was_available != Some(available) {
            if available {
                tracing::info!("weight data available");
            } else {
                tracing::warn!(connected = source.is_connected(), "no weight data, waiting for sensor");
            }
            was_available = Some(available);
        }

        if let Some(s) = sample {
            let status = scale.step(s.value);
            if let StepStatus::Cycle(outcome) = &status {
                summary.cycles = summary.cycles.saturating_add(1);
                if outcome.facts().is_some() {
                    summary.measured = summary.measured.saturating_add(1);
                }
            }
            on_status(&status);
        }

        clock.sleep(period);
    }

    tracing::info!(
        iterations = summary.iterations,
        cycles = summary.cycles,
        measured = summary.measured,
        "control loop stopped"
    );
    Ok(summary)
}
