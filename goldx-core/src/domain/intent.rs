//! Per-bar position intent emitted by the signal state machine.

use serde::{Deserialize, Serialize};

/// What the strategy wants to hold at the close of a bar.
///
/// Every bar carries exactly one label. `EnterLong` and the exits mark state
/// transitions; `Hold` is the label for bars between them, so a long stretch
/// reads `EnterLong, Hold, Hold, ..., ExitBy*`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    #[default]
    Flat,
    EnterLong,
    Hold,
    ExitByReversal,
    ExitByStop,
}

impl Intent {
    /// Whether the strategy is long at the close of this bar.
    pub fn is_long(&self) -> bool {
        matches!(self, Intent::EnterLong | Intent::Hold)
    }

    /// Binary exposure used by the engine: 1.0 long, 0.0 flat.
    pub fn exposure(&self) -> f64 {
        if self.is_long() {
            1.0
        } else {
            0.0
        }
    }

    /// True for the bars that change the position state.
    pub fn is_transition(&self) -> bool {
        matches!(
            self,
            Intent::EnterLong | Intent::ExitByReversal | Intent::ExitByStop
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exposure_follows_long_state() {
        assert_eq!(Intent::EnterLong.exposure(), 1.0);
        assert_eq!(Intent::Hold.exposure(), 1.0);
        assert_eq!(Intent::Flat.exposure(), 0.0);
        assert_eq!(Intent::ExitByStop.exposure(), 0.0);
        assert_eq!(Intent::ExitByReversal.exposure(), 0.0);
    }

    #[test]
    fn hold_is_not_a_transition() {
        assert!(!Intent::Hold.is_transition());
        assert!(!Intent::Flat.is_transition());
        assert!(Intent::EnterLong.is_transition());
        assert!(Intent::ExitByStop.is_transition());
    }

    #[test]
    fn serializes_snake_case() {
        let json = serde_json::to_string(&Intent::ExitByStop).unwrap();
        assert_eq!(json, "\"exit_by_stop\"");
    }
}
