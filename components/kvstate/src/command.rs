use std::convert::TryFrom;
use std::fmt;

use crate::CommandError;

pub type Key = i64;
pub type Value = i64;

/// NIL is the value of an absent key.
pub const NIL: Value = 0;

/// Operation is the kind of a command. The discriminant is also the tag used on the wire.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
#[repr(u8)]
pub enum Operation {
    None = 0,
    Put = 1,
    Get = 2,
    Delete = 3,
    RLock = 4,
    Rmw = 5,
}

impl Operation {
    /// is_write returns true if executing this op may change the stored value.
    pub fn is_write(&self) -> bool {
        match self {
            Operation::Put | Operation::Rmw => true,
            _ => false,
        }
    }
}

impl TryFrom<u8> for Operation {
    type Error = CommandError;

    fn try_from(tag: u8) -> Result<Self, Self::Error> {
        let op = match tag {
            0 => Operation::None,
            1 => Operation::Put,
            2 => Operation::Get,
            3 => Operation::Delete,
            4 => Operation::RLock,
            5 => Operation::Rmw,
            _ => return Err(CommandError::UnknownOp(tag)),
        };
        Ok(op)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Operation::None => "None",
            Operation::Put => "Put",
            Operation::Get => "Get",
            Operation::Delete => "Delete",
            Operation::RLock => "RLock",
            Operation::Rmw => "Rmw",
        };
        write!(f, "{}", s)
    }
}

/// Command is the unit of work sent to a replica.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub struct Command {
    pub op: Operation,
    pub key: Key,
    pub value: Value,
}

impl Command {
    pub fn of(op: Operation, key: Key, value: Value) -> Command {
        Command { op, key, value }
    }

    /// is_read returns true for a plain GET.
    pub fn is_read(&self) -> bool {
        self.op == Operation::Get
    }
}

impl Default for Command {
    fn default() -> Self {
        Command::of(Operation::None, 0, NIL)
    }
}

impl From<(Operation, Key, Value)> for Command {
    fn from(t: (Operation, Key, Value)) -> Command {
        Command::of(t.0, t.1, t.2)
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}={}", self.op, self.key, self.value)
    }
}

/// Conflict defines API to check if two vars conflicts with each other.
pub trait Conflict {
    fn conflict(&self, with: &Self) -> bool;
}

impl Conflict for Command {
    /// Two commands conflict iff they touch the same key and at least one of them writes it.
    /// Two reads of the same key never conflict.
    fn conflict(&self, with: &Self) -> bool {
        self.key == with.key && (self.op.is_write() || with.op.is_write())
    }
}

/// conflict_batch checks every pair across two batches and returns true on the first conflict.
pub fn conflict_batch(a: &[Command], b: &[Command]) -> bool {
    a.iter().any(|x| b.iter().any(|y| x.conflict(y)))
}
