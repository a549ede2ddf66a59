use anyhow::{Context, Result};
use clap::Parser;
use liftoff_execution::RoundEngine;
use liftoff_live_table::{Args, LiveTable};
use liftoff_types::TableEvent;
use tracing::{debug, info};

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    tracing_subscriber::fmt()
        .with_max_level(args.log_level)
        .init();

    let config = args.engine_config()?;
    let seed = args.seed.unwrap_or_else(rand::random);
    let engine = RoundEngine::seeded(config, seed).context("failed to build engine")?;
    info!(seed, "starting live table");

    let table = LiveTable::new(engine);
    let mut events = table.subscribe();
    table.start().context("failed to start table")?;

    let mut completed = 0u64;
    loop {
        tokio::select! {
            signal = tokio::signal::ctrl_c() => {
                signal.context("failed to listen for ctrl-c")?;
                info!("shutdown requested");
                break;
            }
            event = events.recv() => {
                let Some(event) = event else {
                    break;
                };
                if args.emit_json {
                    println!("{}", serde_json::to_string(&event)?);
                } else {
                    debug!(?event, "table event");
                }
                if let TableEvent::RoundEnded { .. } = event {
                    completed += 1;
                    if args.rounds.is_some_and(|rounds| completed >= rounds) {
                        break;
                    }
                }
            }
        }
    }

    table.force_stop().await;
    let stats = table.history_stats();
    info!(
        rounds = completed,
        retained = stats.rounds,
        crashed = stats.crashed,
        escaped = stats.escaped,
        mean_final_multiplier = ?stats.mean_final_multiplier,
        "live table stopped"
    );
    Ok(())
}
