//! Workload generation: which key and which operation a simulated client issues next.

mod keys;
mod ops;

pub use keys::*;
pub use ops::*;

use rand::rngs::StdRng;
use rand::SeedableRng;

use kvstate::{Command, Operation, Value, NIL};

use crate::conf::{ConfError, WorkloadConf};



/// client_rng returns the random source of one stream of one client.
/// With a seed every (client, stream) pair gets its own reproducible sequence.
pub fn client_rng(seed: Option<u64>, client: usize, stream: u64) -> StdRng {
    match seed {
        Some(s) => StdRng::seed_from_u64(
            s.wrapping_mul(31)
                .wrapping_add((client as u64) << 8)
                .wrapping_add(stream),
        ),
        None => StdRng::from_entropy(),
    }
}

/// Workload builds the commands issued by one simulated client.
pub struct Workload {
    keys: KeyDistribution,
    ops: OpPicker,
}

impl Workload {
    pub fn new(conf: &WorkloadConf, client: usize) -> Result<Workload, ConfError> {
        let keys = KeyDistribution::new(
            KeyPolicy::from_conf(conf),
            client_rng(conf.seed, client, 0),
        )?;
        let ops = OpPicker::new(
            OpMix::from_conf(conf, client),
            client_rng(conf.seed, client, 1),
        );
        Ok(Workload { keys, ops })
    }

    /// next_command returns the command for request `id`. A PUT writes its own id as the value.
    pub fn next_command(&mut self, id: i32) -> Command {
        let key = self.keys.next_key(id);
        let op = self.ops.next_op();
        let value: Value = match op {
            Operation::Put => id as Value,
            _ => NIL,
        };
        Command::of(op, key, value)
    }
}
