//! Domain types for GoldX

pub mod bar;
pub mod intent;
pub mod trade;

pub use bar::{check_timeline, closes, Bar};
pub use intent::Intent;
pub use trade::{round_trips, RoundTrip, TradeKind, TradeRecord};
