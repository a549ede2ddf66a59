use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use liftoff_types::{EngineConfig, MultiplierBucket};

/// Command line for the live table. Every timing knob falls back to a
/// `LIVE_TABLE_*` environment variable.
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Betting window length in milliseconds.
    #[arg(long, env = "LIVE_TABLE_BETTING_MS", default_value_t = 15_000)]
    pub betting_ms: u64,

    /// Countdown cadence in milliseconds.
    #[arg(long, env = "LIVE_TABLE_COARSE_TICK_MS", default_value_t = 1_000)]
    pub coarse_tick_ms: u64,

    /// Multiplier tick cadence in milliseconds.
    #[arg(long, env = "LIVE_TABLE_FINE_TICK_MS", default_value_t = 100)]
    pub fine_tick_ms: u64,

    #[arg(long, env = "LIVE_TABLE_MULTIPLIER_STEP", default_value_t = 0.01)]
    pub multiplier_step: f64,

    /// Pause between the end of a round and the next betting window.
    #[arg(long, env = "LIVE_TABLE_COOLDOWN_MS", default_value_t = 10_000)]
    pub cooldown_ms: u64,

    #[arg(long, env = "LIVE_TABLE_HISTORY_CAPACITY", default_value_t = 12)]
    pub history_capacity: usize,

    #[arg(long, env = "LIVE_TABLE_ESCAPE_PROBABILITY", default_value_t = 0.10)]
    pub escape_probability: f64,

    /// Lowest target that may escape.
    #[arg(long, env = "LIVE_TABLE_ESCAPE_FLOOR", default_value_t = 3.0)]
    pub escape_floor: f64,

    /// Added to the target to produce an escaped round's final multiplier.
    #[arg(long, env = "LIVE_TABLE_ESCAPE_MARGIN", default_value_t = 1.0)]
    pub escape_margin: f64,

    /// JSON file holding the bucket table (`[{"weight":..,"low":..,"high":..}]`).
    #[arg(long, env = "LIVE_TABLE_BUCKETS")]
    pub buckets: Option<PathBuf>,

    /// Seed for outcome generation (random when unset).
    #[arg(long, env = "LIVE_TABLE_SEED")]
    pub seed: Option<u64>,

    /// Stop after this many rounds (at least one).
    #[arg(long, value_parser = clap::value_parser!(u64).range(1..))]
    pub rounds: Option<u64>,

    #[arg(long, env = "LIVE_TABLE_LOG_LEVEL", default_value = "info")]
    pub log_level: tracing::Level,

    /// Print every table event as a JSON line on stdout.
    #[arg(long, default_value_t = false)]
    pub emit_json: bool,
}

impl Args {
    /// Build and validate the engine configuration.
    pub fn engine_config(&self) -> Result<EngineConfig> {
        let buckets = match &self.buckets {
            Some(path) => load_buckets(path)?,
            None => EngineConfig::default().buckets,
        };
        let config = EngineConfig {
            betting_ms: self.betting_ms,
            coarse_tick_ms: self.coarse_tick_ms,
            fine_tick_ms: self.fine_tick_ms,
            multiplier_step: self.multiplier_step,
            cooldown_ms: self.cooldown_ms,
            history_capacity: self.history_capacity,
            escape_probability: self.escape_probability,
            escape_floor: self.escape_floor,
            escape_margin: self.escape_margin,
            buckets,
        };
        config.validate().context("invalid table configuration")?;
        Ok(config)
    }
}

fn load_buckets(path: &Path) -> Result<Vec<MultiplierBucket>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read bucket table {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse bucket table {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_match_engine_defaults() {
        let args = Args::parse_from(["liftoff-live-table"]);
        assert_eq!(args.engine_config().unwrap(), EngineConfig::default());
        assert_eq!(args.log_level, tracing::Level::INFO);
        assert!(!args.emit_json);
        assert_eq!(args.seed, None);
    }

    #[test]
    fn test_overrides() {
        let args = Args::parse_from([
            "liftoff-live-table",
            "--betting-ms",
            "5000",
            "--cooldown-ms",
            "1500",
            "--escape-probability",
            "0",
            "--seed",
            "7",
            "--rounds",
            "3",
            "--log-level",
            "debug",
            "--emit-json",
        ]);
        let config = args.engine_config().unwrap();
        assert_eq!(config.betting_ms, 5_000);
        assert_eq!(config.cooldown_ms, 1_500);
        assert_eq!(config.escape_probability, 0.0);
        assert_eq!(args.seed, Some(7));
        assert_eq!(args.rounds, Some(3));
        assert_eq!(args.log_level, tracing::Level::DEBUG);
        assert!(args.emit_json);
    }

    #[test]
    fn test_invalid_values_rejected() {
        let args = Args::parse_from(["liftoff-live-table", "--escape-floor", "0.5"]);
        let err = args.engine_config().unwrap_err();
        assert!(format!("{err:#}").contains("escape_floor"));

        let args = Args::parse_from(["liftoff-live-table", "--fine-tick-ms", "0"]);
        assert!(args.engine_config().is_err());
    }

    #[test]
    fn test_zero_rounds_rejected() {
        let err = Args::try_parse_from(["liftoff-live-table", "--rounds", "0"]).unwrap_err();
        assert_eq!(err.kind(), clap::error::ErrorKind::ValueValidation);
        let args = Args::try_parse_from(["liftoff-live-table", "--rounds", "1"]).unwrap();
        assert_eq!(args.rounds, Some(1));
    }

    #[test]
    fn test_bucket_file() {
        let path = std::env::temp_dir().join(format!("liftoff-buckets-{}.json", std::process::id()));
        std::fs::write(
            &path,
            r#"[{"weight":0.5,"low":1.0,"high":2.0},{"weight":0.5,"low":2.0,"high":3.0}]"#,
        )
        .unwrap();

        let args = Args::parse_from([
            "liftoff-live-table",
            "--buckets",
            path.to_str().unwrap(),
        ]);
        let config = args.engine_config().unwrap();
        assert_eq!(
            config.buckets,
            vec![
                MultiplierBucket::new(0.5, 1.0, 2.0),
                MultiplierBucket::new(0.5, 2.0, 3.0),
            ]
        );

        std::fs::write(&path, r#"[{"weight":0.4,"low":1.0,"high":2.0}]"#).unwrap();
        assert!(args.engine_config().is_err());
        std::fs::remove_file(&path).unwrap();
    }

    #[test]
    fn test_missing_bucket_file() {
        let args = Args::parse_from([
            "liftoff-live-table",
            "--buckets",
            "/nonexistent/liftoff-buckets.json",
        ]);
        let err = args.engine_config().unwrap_err();
        assert!(err.to_string().contains("failed to read bucket table"));
    }
}
