//! Demo binary.
//!
//! Usage:
//!   cargo run -p entsync_client --bin entsync-demo -- [--config sync.json]
//!       [--ticks 300] [--remotes 3] [--tick-hz 30] [--seed 7] [--json]
//!
//! Runs the player sync layer against the headless backend and a loopback
//! host, then prints a summary of what the client sent.

use std::env;

use anyhow::Context;
use entsync_client::demo::{self, DemoOptions};
use entsync_shared::config::SyncConfig;
use tracing::info;

struct Args {
    config_path: Option<String>,
    tick_hz: Option<u32>,
    json: bool,
    opts: DemoOptions,
}

fn parse_args() -> Args {
    let mut out = Args {
        config_path: None,
        tick_hz: None,
        json: false,
        opts: DemoOptions::default(),
    };
    let args: Vec<String> = env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--config" if i + 1 < args.len() => {
                out.config_path = Some(args[i + 1].clone());
                i += 2;
            }
            "--ticks" if i + 1 < args.len() => {
                out.opts.ticks = args[i + 1].parse().unwrap_or(out.opts.ticks);
                i += 2;
            }
            "--remotes" if i + 1 < args.len() => {
                out.opts.remotes = args[i + 1].parse().unwrap_or(out.opts.remotes);
                i += 2;
            }
            "--tick-hz" if i + 1 < args.len() => {
                out.tick_hz = args[i + 1].parse().ok();
                i += 2;
            }
            "--seed" if i + 1 < args.len() => {
                out.opts.seed = args[i + 1].parse().unwrap_or(out.opts.seed);
                i += 2;
            }
            "--json" => {
                out.json = true;
                i += 1;
            }
            _ => i += 1,
        }
    }
    out
}

fn load_config(path: Option<&str>) -> anyhow::Result<SyncConfig> {
    let Some(path) = path else {
        return Ok(SyncConfig::default());
    };
    let text = std::fs::read_to_string(path).with_context(|| format!("read config {path}"))?;
    SyncConfig::from_json_str(&text).with_context(|| format!("parse config {path}"))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = parse_args();
    let mut config = load_config(args.config_path.as_deref())?;
    if let Some(tick_hz) = args.tick_hz {
        config.tick_hz = tick_hz;
    }

    info!(
        tick_hz = config.tick_hz,
        ticks = args.opts.ticks,
        remotes = args.opts.remotes,
        "Starting demo"
    );

    let report = demo::run(config, args.opts).await.context("demo run")?;

    if args.json {
        let text = serde_json::to_string_pretty(&report).context("serialize report")?;
        println!("{text}");
        return Ok(());
    }

    println!("ticks:             {}", report.ticks);
    println!("messages sent:     {}", report.messages_sent);
    println!("bytes sent:        {}", report.bytes_sent);
    println!("entries completed: {}", report.entries_completed);
    println!("exits completed:   {}", report.exits_completed);
    println!("remotes spawned:   {}", report.remotes_spawned);
    Ok(())
}
