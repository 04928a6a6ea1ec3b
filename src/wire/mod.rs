//! Frames exchanged with a replica over a raw client connection.

mod errors;
mod wire;

pub use errors::*;
pub use self::wire::*;
