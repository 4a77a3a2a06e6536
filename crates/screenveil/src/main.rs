//! `sveil` - CLI for screenveil
//!
//! This binary provides the command-line interface for scanning and masking
//! sensitive text and for running the blur service.

#![warn(missing_debug_implementations)]
#![deny(unsafe_code)]

use std::io::Read;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::io::AsyncBufReadExt;
use tokio::sync::mpsc;

use screenveil::cli::{
    Cli, Command, ConfigCommand, MaskCommand, OutputFormat, ScanCommand, ServeCommand,
    StatusCommand,
};
use screenveil::detect::{ChannelDetector, ShareDetector, ShareEvent, ShareSource};
use screenveil::scan::Matcher;
use screenveil::service::{BlurService, LogIndicator, ServiceHandle};
use screenveil::storage::Store;
use screenveil::{init_logging, Config, Settings};

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on verbosity
    init_logging(cli.verbosity());

    // Load configuration
    let config = Config::load_from(cli.config.clone())?;

    // Execute the command
    match cli.command {
        Command::Scan(cmd) => handle_scan(&config, &cmd),
        Command::Mask(cmd) => handle_mask(&config, &cmd),
        Command::Serve(cmd) => handle_serve(&config, &cmd),
        Command::Status(cmd) => handle_status(&config, &cmd),
        Command::Config(cmd) => handle_config(&config, cmd),
    }
}

/// Read the input text for scan/mask: argument, file, or stdin.
fn read_input(text: Option<&str>, file: Option<&std::path::Path>) -> anyhow::Result<String> {
    if let Some(text) = text {
        return Ok(text.to_string());
    }
    if let Some(path) = file {
        return std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()));
    }
    let mut buffer = String::new();
    std::io::stdin()
        .read_to_string(&mut buffer)
        .context("failed to read stdin")?;
    Ok(buffer)
}

/// Build a matcher from persisted settings plus configured custom patterns.
fn build_matcher(config: &Config) -> anyhow::Result<Matcher> {
    let settings = load_settings(config)?;
    Ok(Matcher::with_config(
        &settings.matcher_config(&config.scan.custom_patterns),
    ))
}

/// Load persisted settings, falling back to defaults when the store is
/// unavailable.
fn load_settings(config: &Config) -> anyhow::Result<Settings> {
    match Store::open(config.database_path()) {
        Ok(store) => Ok(store.load_settings()?),
        Err(e) => {
            tracing::warn!(error = %e, "Could not open store; using default settings");
            Ok(Settings::default())
        }
    }
}

fn handle_scan(config: &Config, cmd: &ScanCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.text.as_deref(), cmd.file.as_deref())?;
    let matcher = build_matcher(config)?;
    let spans = matcher.find_spans(&text);

    match cmd.format {
        OutputFormat::Json => {
            let entries: Vec<_> = spans
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "start": s.start,
                        "end": s.end,
                        "kind": s.kind,
                        "text": s.matched(&text),
                    })
                })
                .collect();
            println!("{}", serde_json::to_string_pretty(&entries)?);
        }
        OutputFormat::Table => {
            if spans.is_empty() {
                println!("No sensitive spans found.");
            } else {
                println!("{:<8} {:<8} {:<15} TEXT", "START", "END", "KIND");
                for span in &spans {
                    println!(
                        "{:<8} {:<8} {:<15} {}",
                        span.start,
                        span.end,
                        span.kind.to_string(),
                        span.matched(&text)
                    );
                }
            }
        }
        OutputFormat::Plain => {
            for span in &spans {
                println!("{}..{} {} {}", span.start, span.end, span.kind, span.matched(&text));
            }
        }
    }
    Ok(())
}

fn handle_mask(config: &Config, cmd: &MaskCommand) -> anyhow::Result<()> {
    let text = read_input(cmd.text.as_deref(), cmd.file.as_deref())?;
    let matcher = build_matcher(config)?;
    print!("{}", matcher.mask(&text, cmd.placeholder.as_deref()));
    if !text.ends_with('\n') {
        println!();
    }
    Ok(())
}

fn handle_serve(config: &Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    let runtime = tokio::runtime::Runtime::new().context("failed to start runtime")?;
    runtime.block_on(serve(config, cmd))
}

async fn serve(config: &Config, cmd: &ServeCommand) -> anyhow::Result<()> {
    let store = if cmd.no_store {
        None
    } else {
        let store = Store::open(config.database_path())?;
        store.prune_sessions(config.storage.max_sessions)?;
        Some(store)
    };
    let settings = match &store {
        Some(store) => store.load_settings()?,
        None => Settings::default(),
    };

    let (handle, join) = BlurService::spawn(
        settings,
        store,
        Arc::new(LogIndicator),
        config.request_timeout(),
    );

    // Wire the in-process detector: control lines inject share events
    let (mut detector, inject) = ChannelDetector::new();
    let (events_tx, events_rx) = mpsc::channel(64);
    detector
        .start(events_tx)
        .await
        .context("failed to start detector")?;
    let _forwarder = handle.forward_events(events_rx);

    println!("Blur service running. Commands: share-start [google-meet|zoom],");
    println!("share-stop, toggle, state, quit. Ctrl-C to exit.");

    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    let mut lines = stdin.lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => match line? {
                Some(line) => {
                    if !handle_control_line(line.trim(), &inject, &handle).await? {
                        break;
                    }
                }
                None => {
                    // Stdin closed; keep serving until interrupted
                    tokio::signal::ctrl_c().await?;
                    break;
                }
            },
        }
    }

    detector.stop();
    drop(handle);
    join.await.context("service task failed")?;
    Ok(())
}

/// Apply one control line. Returns `false` to stop serving.
async fn handle_control_line(
    line: &str,
    inject: &mpsc::Sender<ShareEvent>,
    handle: &ServiceHandle,
) -> anyhow::Result<bool> {
    let mut parts = line.split_whitespace();
    match parts.next() {
        Some("share-start") => {
            let source = parts.next().and_then(|s| s.parse::<ShareSource>().ok());
            inject
                .send(ShareEvent::Started { source })
                .await
                .context("detector channel closed")?;
        }
        Some("share-stop") => {
            inject
                .send(ShareEvent::Stopped)
                .await
                .context("detector channel closed")?;
        }
        Some("toggle") => {
            let snapshot = handle.toggle_blur().await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Some("state") => {
            let snapshot = handle.get_state().await?;
            println!("{}", serde_json::to_string(&snapshot)?);
        }
        Some("quit" | "exit") => return Ok(false),
        Some(other) => println!("Unknown command: {other}"),
        None => {}
    }
    Ok(true)
}

fn handle_status(config: &Config, cmd: &StatusCommand) -> anyhow::Result<()> {
    let store = Store::open(config.database_path())?;
    let settings = store.load_settings()?;
    let sessions = store.recent_sessions(cmd.limit)?;

    if cmd.json {
        let status = serde_json::json!({
            "databasePath": config.database_path(),
            "settings": settings,
            "recentSessions": sessions
                .iter()
                .map(|s| {
                    serde_json::json!({
                        "id": s.id,
                        "source": s.source,
                        "startedAt": s.started_at.to_rfc3339(),
                        "endedAt": s.ended_at.map(|t| t.to_rfc3339()),
                    })
                })
                .collect::<Vec<_>>(),
        });
        println!("{}", serde_json::to_string_pretty(&status)?);
    } else {
        println!("sveil status");
        println!("------------");
        println!("Database:        {}", config.database_path().display());
        println!();
        println!("[Settings]");
        println!("  Enabled:         {}", settings.enabled);
        println!("  Blur intensity:  {}px", settings.blur_intensity);
        println!("  Auto-enable:     {}", settings.auto_enable);
        println!("  Show indicator:  {}", settings.show_indicator);
        println!("  Data types on:   {}", settings.data_types.enabled_kinds().len());
        println!();
        if sessions.is_empty() {
            println!("No share sessions recorded.");
        } else {
            println!("[Recent share sessions]");
            for session in &sessions {
                let source = session
                    .source
                    .map_or_else(|| "unknown".to_string(), |s| s.to_string());
                let ended = session
                    .ended_at
                    .map_or_else(|| "active".to_string(), |t| t.to_rfc3339());
                println!(
                    "  #{:<5} {:<12} {} -> {}",
                    session.id,
                    source,
                    session.started_at.to_rfc3339(),
                    ended
                );
            }
        }
    }
    Ok(())
}

fn handle_config(config: &Config, cmd: ConfigCommand) -> anyhow::Result<()> {
    match cmd {
        ConfigCommand::Show { json } => {
            if json {
                println!("{}", serde_json::to_string_pretty(config)?);
            } else {
                println!("Current Configuration");
                println!("=====================");
                println!();
                println!("[Storage]");
                println!("  Database path:    {}", config.database_path().display());
                println!("  Max sessions:     {}", config.storage.max_sessions);
                println!();
                println!("[Watcher]");
                println!("  Debounce:         {}ms", config.watcher.debounce_ms);
                println!();
                println!("[Service]");
                println!(
                    "  Request timeout:  {}ms",
                    config.service.request_timeout_ms
                );
                println!();
                println!("[Scan]");
                println!(
                    "  Custom patterns:  {}",
                    config.scan.custom_patterns.len()
                );
            }
        }
        ConfigCommand::Path => {
            println!("{}", Config::default_config_path().display());
        }
        ConfigCommand::Reset { yes } => {
            if yes {
                let store = Store::open(config.database_path())?;
                store.save_settings(&Settings::default())?;
                println!("Blur settings reset to defaults.");
            } else {
                println!("This will reset persisted blur settings to defaults.");
                println!("Use --yes to confirm.");
            }
        }
        ConfigCommand::Validate { file } => {
            let path = file.unwrap_or_else(Config::default_config_path);
            println!("Validating configuration: {}", path.display());
            match Config::load_from(Some(path)) {
                Ok(_) => println!("Configuration is valid."),
                Err(e) => println!("Configuration error: {e}"),
            }
        }
    }
    Ok(())
}
