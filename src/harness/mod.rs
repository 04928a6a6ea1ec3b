mod harness;

pub use self::harness::*;
