//! `keyhook` — install a global keyboard hook, register hotkeys, and run a
//! command when they fire.
//!
//! Run `keyhook listen` to stream raw events, `keyhook hotkey <spec> -- cmd`
//! to bind one hotkey for the process lifetime, or `keyhook names` to see
//! the canonical key name table for the active backend.

use clap::Parser;
use keyhook::backend::default_backend;
use keyhook::cli::{Cli, Commands, ConfigAction};
use keyhook::config::Config;
use keyhook::engine::Engine;
use keyhook::event::WireEvent;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn init_logging(cli: &Cli, configured_level: &str) {
    let level = if cli.quiet {
        "error"
    } else {
        match cli.verbose {
            0 => configured_level,
            1 => "debug",
            _ => "trace",
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .with_target(false)
        .init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let config = match Config::load(cli.config.as_deref()) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error loading config: {e}");
            return ExitCode::FAILURE;
        }
    };
    init_logging(&cli, &config.log.level);

    match run(cli, config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli, config: Config) -> keyhook::Result<()> {
    match cli.command {
        Commands::Listen { device } => listen(config, device).await,
        Commands::Record { until, output } => record(config, &until, output).await,
        Commands::Replay { file, speed } => replay(config, &file, speed).await,
        Commands::Hotkey { spec, suppress, command } => {
            run_hotkey(config, &spec, suppress, command).await
        }
        Commands::Names => names(config),
        Commands::Config { action } => config_command(cli.config, action),
    }
}

fn build_engine(config: &Config) -> keyhook::Result<Engine> {
    let backend = default_backend()?;
    let engine = Engine::new(backend)?;
    for (name, alias) in config.extra_aliases()? {
        tracing::debug!(name, alias, "loaded alias override (applied on next reload)");
    }
    Ok(engine)
}

async fn listen(config: Config, device: Option<String>) -> keyhook::Result<()> {
    if let Some(device) = &device {
        tracing::info!(device, "device override requested (passed to backend where supported)");
    }
    let engine = build_engine(&config)?;
    let hub = engine.hub().clone();

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    hub.add_hook(
        keyhook::HookFilter::any(),
        false,
        Box::new(move |event| {
            let _ = tx.send(WireEvent::from(event));
            keyhook::SuppressionVote::Allow
        }),
    )?;

    tracing::info!("listening; press Ctrl-C to stop");
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = async {
            while let Some(wire) = rx.recv().await {
                if let Ok(json) = serde_json::to_string(&wire) {
                    println!("{json}");
                }
            }
        } => {}
    }

    engine.shutdown()
}

async fn record(config: Config, until: &str, output: Option<std::path::PathBuf>) -> keyhook::Result<()> {
    let engine = build_engine(&config)?;
    tracing::info!(until, "recording until hotkey fires");
    let events = engine.record(until)?;
    let wire: Vec<WireEvent> = events.iter().map(WireEvent::from).collect();
    let json = serde_json::to_string_pretty(&wire)?;

    match output {
        Some(path) => std::fs::write(&path, json)?,
        None => println!("{json}"),
    }
    engine.shutdown()
}

async fn replay(config: Config, file: &std::path::Path, speed: f64) -> keyhook::Result<()> {
    let engine = build_engine(&config)?;
    let text = std::fs::read_to_string(file)?;
    let wire: Vec<WireEvent> = serde_json::from_str(&text)?;
    let events: Vec<keyhook::Event> = wire.into_iter().map(Into::into).collect();

    tracing::info!(count = events.len(), speed, "replaying recorded events");
    engine.play(&events, speed)?;
    engine.shutdown()
}

async fn run_hotkey(
    config: Config,
    spec: &str,
    suppress: bool,
    command: Vec<String>,
) -> keyhook::Result<()> {
    let engine = build_engine(&config)?;
    let policy = config.hotkeys.suppress_policy;
    let timeout = config.hotkeys.timeout;

    let Some((program, args)) = command.split_first() else {
        return Err(keyhook::KeyhookError::Config("no command given".into()));
    };
    let program = program.clone();
    let args = args.to_vec();

    engine.add_hotkey(
        spec,
        Box::new(move || {
            let status = std::process::Command::new(&program).args(&args).status();
            if let Err(e) = status {
                tracing::warn!(error = %e, program, "failed to spawn hotkey command");
            }
        }),
        suppress,
        policy,
        timeout,
        false,
    )?;

    tracing::info!(spec, "hotkey registered; press Ctrl-C to stop");
    tokio::signal::ctrl_c().await.ok();
    engine.shutdown()
}

fn names(config: Config) -> keyhook::Result<()> {
    let engine = build_engine(&config)?;
    for (name, codes) in engine.names_dump() {
        println!("{name}: {codes:?}");
    }
    engine.shutdown()
}

fn config_command(path: Option<std::path::PathBuf>, action: ConfigAction) -> keyhook::Result<()> {
    match action {
        ConfigAction::Show => {
            let config = Config::load(path.as_deref())?;
            print!("{}", toml::to_string_pretty(&config).map_err(|e| keyhook::KeyhookError::Config(e.to_string()))?);
            Ok(())
        }
        ConfigAction::Init => {
            let target = path
                .or_else(Config::default_path)
                .ok_or_else(|| keyhook::KeyhookError::Config("no config directory for this platform".into()))?;
            if target.exists() {
                println!("{} already exists, leaving it untouched", target.display());
                return Ok(());
            }
            if let Some(parent) = target.parent() {
                std::fs::create_dir_all(parent)?;
            }
            std::fs::write(&target, keyhook::config::DEFAULT_CONFIG)?;
            println!("wrote {}", target.display());
            Ok(())
        }
    }
}
