//! GoldX Core: domain types, indicators, the golden-cross signal state
//! machine, and the backtest/evaluation engine.
//!
//! Data flows one way:
//! bars → `IndicatorProvider` → `SignalGenerator` → `engine::run` → `engine::evaluate`
//!
//! Every stage is a pure function of its inputs; nothing here performs I/O.

pub mod domain;
pub mod engine;
pub mod error;
pub mod fingerprint;
pub mod indicators;
pub mod serde_nan;
pub mod signals;

pub use error::InputError;
