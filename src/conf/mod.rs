mod args;
mod conf;
mod errors;

pub use args::*;
pub use self::conf::*;
pub use errors::*;

#[cfg(test)]
mod test_args;
