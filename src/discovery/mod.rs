//! Finding the replicas and the leader of the cluster under test.

mod discovery;
mod errors;

pub use self::discovery::*;
pub use errors::*;

#[cfg(test)]
mod test_discovery;
