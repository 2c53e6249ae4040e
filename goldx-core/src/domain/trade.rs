//! Trade log entries, one per position state transition.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TradeKind {
    /// Entry on a golden cross.
    Buy,
    /// Exit on a death cross.
    Sell,
    /// Exit because the close fell below the stop level.
    Stop,
}

impl TradeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            TradeKind::Buy => "buy",
            TradeKind::Sell => "sell",
            TradeKind::Stop => "stop",
        }
    }
}

/// A single fill in the append-only trade log.
///
/// Fills happen at the signal bar's close. `stop_level` is only set on `Buy`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub kind: TradeKind,
    pub bar_index: usize,
    pub timestamp: NaiveDateTime,
    pub price: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stop_level: Option<f64>,
}

impl TradeRecord {
    pub fn is_entry(&self) -> bool {
        self.kind == TradeKind::Buy
    }
}

/// A closed buy → sell/stop pair reconstructed from the trade log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoundTrip {
    pub entry_bar: usize,
    pub entry_price: f64,
    pub exit_bar: usize,
    pub exit_price: f64,
    pub exit_kind: TradeKind,
}

impl RoundTrip {
    /// Return on the round trip as a fraction of entry price.
    pub fn return_pct(&self) -> f64 {
        if self.entry_price == 0.0 {
            return 0.0;
        }
        self.exit_price / self.entry_price - 1.0
    }

    pub fn bars_held(&self) -> usize {
        self.exit_bar - self.entry_bar
    }
}

/// Pair consecutive entries and exits. A trailing open entry is ignored.
pub fn round_trips(trades: &[TradeRecord]) -> Vec<RoundTrip> {
    let mut out = Vec::new();
    let mut open: Option<&TradeRecord> = None;
    for trade in trades {
        match (trade.kind, open) {
            (TradeKind::Buy, _) => open = Some(trade),
            (kind, Some(entry)) => {
                out.push(RoundTrip {
                    entry_bar: entry.bar_index,
                    entry_price: entry.price,
                    exit_bar: trade.bar_index,
                    exit_price: trade.price,
                    exit_kind: kind,
                });
                open = None;
            }
            (_, None) => {}
        }
    }
    out
}
