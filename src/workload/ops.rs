use rand::rngs::StdRng;
use rand::Rng;

use kvstate::Operation;

use crate::conf::WorkloadConf;

/// OpMix decides the kind of operation a client issues.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum OpMix {
    /// Every operation of this client is a write (PUT) or a read (GET).
    Role { writer: bool },

    /// Each operation is a RMW with probability `rmws`, otherwise a write with probability
    /// `writes`, otherwise a read.
    Fraction { writes: f64, rmws: f64 },
}

impl OpMix {
    pub fn from_conf(conf: &WorkloadConf, client: usize) -> OpMix {
        match conf.writers {
            Some(n) => OpMix::Role { writer: client < n },
            None => OpMix::Fraction {
                writes: conf.writes,
                rmws: conf.rmws,
            },
        }
    }
}

pub struct OpPicker {
    mix: OpMix,
    rng: StdRng,
}

impl OpPicker {
    pub fn new(mix: OpMix, rng: StdRng) -> OpPicker {
        OpPicker { mix, rng }
    }

    pub fn next_op(&mut self) -> Operation {
        match self.mix {
            OpMix::Role { writer: true } => Operation::Put,
            OpMix::Role { writer: false } => Operation::Get,
            OpMix::Fraction { writes, rmws } => {
                if rmws > 0.0 && rmws > self.rng.gen::<f64>() {
                    Operation::Rmw
                } else if writes > self.rng.gen::<f64>() {
                    Operation::Put
                } else {
                    Operation::Get
                }
            }
        }
    }
}
