mod cli;
mod error_fmt;
mod run;

use clap::Parser;
use cli::{Cli, Commands, FILE_GUARD, JSON_MODE};
use nutri_config::Config;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing_subscriber::{EnvFilter, Layer};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Parsed and validated config; the flag is false when built-in defaults were used.
fn load_config(path: &Path) -> eyre::Result<(Config, bool)> {
    let found = path.exists();
    let cfg = if found {
        nutri_config::load_file(path).map_err(run::config_error)?
    } else {
        Config::default()
    };
    cfg.validate().map_err(run::config_error)?;
    Ok((cfg, found))
}

fn init_tracing(cli: &Cli, cfg: &Config) {
    let level = cfg.logging.level.as_deref().unwrap_or(&cli.log_level);
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    // Console always logs to stderr so stdout carries only results.
    let console = if cli.json {
        tracing_subscriber::fmt::layer()
            .json()
            .with_writer(std::io::stderr)
            .boxed()
    } else {
        tracing_subscriber::fmt::layer()
            .with_target(false)
            .with_writer(std::io::stderr)
            .boxed()
    };

    let file = cfg.logging.file.as_deref().map(|path| {
        let p = Path::new(path);
        let dir = p.parent().filter(|d| !d.as_os_str().is_empty()).unwrap_or(Path::new("."));
        let name = p
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_else(|| "nutriscale.log".to_string());
        let appender = match cfg.logging.rotation.as_deref() {
            Some("daily") => tracing_appender::rolling::daily(dir, name),
            Some("hourly") => tracing_appender::rolling::hourly(dir, name),
            _ => tracing_appender::rolling::never(dir, name),
        };
        let (writer, guard) = tracing_appender::non_blocking(appender);
        let _ = FILE_GUARD.set(guard);
        tracing_subscriber::fmt::layer()
            .json()
            .with_ansi(false)
            .with_writer(writer)
    });

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(console)
        .with(file)
        .try_init();
}

fn dispatch(cli: &Cli, cfg: &Config, stop: Arc<AtomicBool>) -> eyre::Result<()> {
    match &cli.cmd {
        Commands::Run {
            max_cycles,
            poll_ms,
        } => {
            let summary = run::run_loop(cfg, *max_cycles, *poll_ms, stop, cli.json)?;
            tracing::info!(
                cycles = summary.cycles,
                measured = summary.measured,
                "run finished"
            );
            Ok(())
        }
        Commands::Resolve { label, grams } => run::resolve(cfg, label, *grams, cli.json),
        Commands::Classify { image } => run::classify(cfg, image.clone(), cli.json),
        Commands::Capture { out } => run::capture(cfg, out.clone()),
        Commands::SelfCheck => run::self_check(cfg, cli.json),
    }
}

fn report(err: &eyre::Report) -> i32 {
    if JSON_MODE.get().copied().unwrap_or(false) {
        eprintln!("{}", error_fmt::format_error_json(err));
    } else {
        eprintln!("{}", error_fmt::humanize(err));
        tracing::debug!(error = ?err, "error detail");
    }
    error_fmt::exit_code_for_error(err)
}

fn main() {
    let cli = Cli::parse();
    let _ = JSON_MODE.set(cli.json);
    let _ = color_eyre::install();

    let (cfg, found) = match load_config(&cli.config) {
        Ok(loaded) => loaded,
        Err(e) => std::process::exit(report(&e)),
    };
    init_tracing(&cli, &cfg);
    if !found {
        tracing::warn!(path = %cli.config.display(), "config file not found, using built-in defaults");
    }

    let stop = Arc::new(AtomicBool::new(false));
    {
        let stop = stop.clone();
        if let Err(e) = ctrlc::set_handler(move || {
            stop.store(true, Ordering::Relaxed);
        }) {
            tracing::warn!(error = %e, "could not install Ctrl-C handler");
        }
    }

    if let Err(e) = dispatch(&cli, &cfg, stop) {
        std::process::exit(report(&e));
    }
}
