use serde::{Deserialize, Serialize};

use crate::round::{HistoryEntry, Phase, Terminal};

/// Event emitted by the round engine, in the exact order it happened.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TableEvent {
    #[serde(rename_all = "camelCase")]
    PhaseChanged {
        round_id: u64,
        phase: Phase,
        entered_at_ms: u64,
    },
    /// Coarse countdown update during `BettingOpen` and `Waiting`.
    #[serde(rename_all = "camelCase")]
    Countdown { phase: Phase, remaining_ms: u64 },
    /// Only emitted while `Running`.
    MultiplierTick { value: f64 },
    #[serde(rename_all = "camelCase")]
    RoundEnded {
        round_id: u64,
        terminal: Terminal,
        final_multiplier: f64,
        duration_ms: u64,
    },
    HistoryAppended { entry: HistoryEntry },
}

impl TableEvent {
    /// The phase entered, if this is a phase change.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            TableEvent::PhaseChanged { phase, .. } => Some(*phase),
            _ => None,
        }
    }
}

/// Acknowledgement of an accepted wager.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BetReceipt {
    pub bet_id: u64,
    pub round_id: u64,
    pub player: String,
    pub amount: u64,
}

/// Point-in-time copy of the table, safe to hand to any reader.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TableSnapshot {
    pub round_id: u64,
    pub phase: Phase,
    pub epoch: u64,
    pub phase_started_at_ms: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub time_remaining_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub live_multiplier: Option<f64>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub pending_bets: Vec<BetReceipt>,
    /// Newest first.
    pub history: Vec<HistoryEntry>,
}
