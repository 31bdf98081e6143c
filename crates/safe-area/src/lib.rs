//! Area risk advisory pipeline.
//!
//! A coordinate goes in; an [`risk::Assessment`] always comes out, sourced from the
//! remote scoring service when it answers and from the deterministic scorer when it
//! does not. Nearby hospitals and police stations are resolved alongside on a
//! best-effort basis.

pub mod config;
pub mod dispatch;
pub mod error;
pub mod facilities;
pub mod geo;
pub mod location;
pub mod pipeline;
pub mod risk;
pub mod telemetry;
pub mod transport;
