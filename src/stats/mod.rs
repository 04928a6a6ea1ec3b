//! Periodic latency and throughput reports of all simulated clients.

mod errors;
mod stats;

pub use errors::*;
pub use self::stats::*;
