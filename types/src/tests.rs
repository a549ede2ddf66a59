use super::*;
use proptest::prelude::*;

#[test]
fn test_phase_cycle_closes() {
    let mut phase = Phase::BettingOpen;
    for expected in Phase::CYCLE.iter().cycle().skip(1).take(10) {
        phase = phase.next();
        assert_eq!(phase, *expected);
    }
    assert_eq!(Phase::Waiting.next(), Phase::BettingOpen);
}

#[test]
fn test_only_betting_open_accepts_bets() {
    for phase in Phase::CYCLE {
        assert_eq!(phase.accepts_bets(), phase == Phase::BettingOpen);
    }
}

#[test]
fn test_phase_display_matches_wire_name() {
    for phase in Phase::CYCLE {
        let wire = serde_json::to_string(&phase).unwrap();
        assert_eq!(wire, format!("\"{phase}\""));
    }
    for terminal in [Terminal::Crashed, Terminal::Escaped] {
        let wire = serde_json::to_string(&terminal).unwrap();
        assert_eq!(wire, format!("\"{terminal}\""));
    }
}

#[test]
fn test_outcome_constructors() {
    let crash = RoundOutcome::crash(2.5);
    assert_eq!(crash.terminal, Terminal::Crashed);
    assert!(!crash.will_escape);
    assert_eq!(crash.final_multiplier, 2.5);

    let escape = RoundOutcome::escape(4.0, 1.0);
    assert_eq!(escape.terminal, Terminal::Escaped);
    assert!(escape.will_escape);
    assert_eq!(escape.final_multiplier, 5.0);
    assert_eq!(escape.with_duration(1_234).duration_ms, 1_234);
}

#[test]
fn test_default_config_is_valid() {
    let config = EngineConfig::default();
    config.validate().expect("defaults must validate");
    assert_eq!(config.betting_ms, 15_000);
    assert_eq!(config.cooldown_ms, 10_000);
    assert_eq!(config.history_capacity, 12);
    assert_eq!(config.buckets.len(), 4);
}

#[test]
fn test_config_rejects_zero_durations() {
    let config = EngineConfig {
        betting_ms: 0,
        ..EngineConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroDuration { field: "betting_ms" })
    );

    let config = EngineConfig {
        fine_tick_ms: 0,
        ..EngineConfig::default()
    };
    assert_eq!(
        config.validate(),
        Err(ConfigError::ZeroDuration {
            field: "fine_tick_ms"
        })
    );
}

#[test]
fn test_config_rejects_bad_escape_settings() {
    let config = EngineConfig {
        escape_floor: 0.5,
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EscapeFloorBelowOne(_))
    ));

    let config = EngineConfig {
        escape_floor: f64::NAN,
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EscapeFloorBelowOne(_))
    ));

    let config = EngineConfig {
        escape_probability: 1.5,
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::EscapeProbabilityOutOfRange(_))
    ));

    let config = EngineConfig {
        escape_margin: -1.0,
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidEscapeMargin(_))
    ));
}

#[test]
fn test_config_rejects_bad_buckets() {
    let config = EngineConfig {
        buckets: vec![],
        ..EngineConfig::default()
    };
    assert_eq!(config.validate(), Err(ConfigError::EmptyBucketTable));

    let config = EngineConfig {
        buckets: vec![MultiplierBucket::new(0.5, 1.0, 2.0)],
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::WeightsDoNotSumToOne { .. })
    ));

    let config = EngineConfig {
        buckets: vec![
            MultiplierBucket::new(0.5, 0.5, 2.0),
            MultiplierBucket::new(0.5, 2.0, 3.0),
        ],
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBucketRange { index: 0, .. })
    ));

    let config = EngineConfig {
        buckets: vec![
            MultiplierBucket::new(1.5, 1.0, 2.0),
            MultiplierBucket::new(-0.5, 2.0, 3.0),
        ],
        ..EngineConfig::default()
    };
    assert!(matches!(
        config.validate(),
        Err(ConfigError::InvalidBucketWeight { index: 1, .. })
    ));
}

#[test]
fn test_config_deserializes_partial_json() {
    let config: EngineConfig =
        serde_json::from_str(r#"{"betting_ms": 5000, "history_capacity": 3}"#).unwrap();
    assert_eq!(config.betting_ms, 5_000);
    assert_eq!(config.history_capacity, 3);
    assert_eq!(config.cooldown_ms, 10_000);
    config.validate().unwrap();
}

#[test]
fn test_event_json_shape() {
    let event = TableEvent::RoundEnded {
        round_id: 7,
        terminal: Terminal::Escaped,
        final_multiplier: 5.0,
        duration_ms: 40_000,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "roundEnded");
    assert_eq!(value["terminal"], "escaped");
    assert_eq!(value["finalMultiplier"], 5.0);

    let event = TableEvent::PhaseChanged {
        round_id: 1,
        phase: Phase::BettingOpen,
        entered_at_ms: 10,
    };
    let value = serde_json::to_value(&event).unwrap();
    assert_eq!(value["type"], "phaseChanged");
    assert_eq!(value["phase"], "bettingOpen");
    assert_eq!(value["enteredAtMs"], 10);
}

proptest! {
    #[test]
    fn test_single_bucket_tables_validate(low in 1.0f64..50.0, width in 0.001f64..50.0) {
        let config = EngineConfig {
            buckets: vec![MultiplierBucket::new(1.0, low, low + width)],
            ..EngineConfig::default()
        };
        prop_assert!(config.validate().is_ok());
    }
}
