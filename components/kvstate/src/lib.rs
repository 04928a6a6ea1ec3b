#[macro_use]
extern crate quick_error;

mod errors;
pub use errors::*;

mod command;
pub use command::*;

mod state;
pub use state::*;


#[cfg(test)]
mod test_state;
