//! Two-state position machine for a long-only strategy.

use serde::{Deserialize, Serialize};

/// Generator-internal position state.
///
/// Entry price and stop level live inside `Long`, so they exist exactly when
/// the strategy holds a position. The stop is fixed at entry; it never trails.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PositionState {
    #[default]
    Flat,
    Long {
        entry_index: usize,
        entry_price: f64,
        stop_level: f64,
    },
}

impl PositionState {
    pub fn is_long(&self) -> bool {
        matches!(self, PositionState::Long { .. })
    }

    pub fn entry_price(&self) -> Option<f64> {
        match self {
            PositionState::Long { entry_price, .. } => Some(*entry_price),
            PositionState::Flat => None,
        }
    }

    pub fn stop_level(&self) -> Option<f64> {
        match self {
            PositionState::Long { stop_level, .. } => Some(*stop_level),
            PositionState::Flat => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flat_has_no_entry_or_stop() {
        let s = PositionState::Flat;
        assert!(!s.is_long());
        assert_eq!(s.entry_price(), None);
        assert_eq!(s.stop_level(), None);
    }

    #[test]
    fn long_exposes_entry_and_stop() {
        let s = PositionState::Long {
            entry_index: 5,
            entry_price: 100.0,
            stop_level: 94.0,
        };
        assert!(s.is_long());
        assert_eq!(s.entry_price(), Some(100.0));
        assert_eq!(s.stop_level(), Some(94.0));
    }
}
