#[macro_use]
extern crate quick_error;
#[macro_use]
extern crate slog;

mod errors;
pub use errors::*;

pub mod conf;
pub mod discovery;
pub mod endpoint;
pub mod harness;
pub mod outstanding;
pub mod setup;
pub mod shaper;
pub mod stats;
pub mod wire;
pub mod workload;
