use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::MutexGuard;

use crate::{Command, Key, Operation, Value, NIL};

/// State is an in-memory key-value table that commands are executed against.
///
/// Every `execute` holds the table lock for the whole command, thus a RMW never interleaves
/// with another command dispatched through the same State.
#[derive(Debug, Default)]
pub struct State {
    store: Mutex<HashMap<Key, Value>>,
}

impl State {
    pub fn new() -> State {
        State {
            store: Mutex::new(HashMap::new()),
        }
    }

    /// execute applies `cmd` and returns the resulting value:
    /// - Put: the written value.
    /// - Get: the stored value, or NIL.
    /// - Rmw: the stored value plus one; an absent key reads as 0.
    /// - Delete: removes the key and returns NIL.
    /// - None and RLock have no effect and return NIL.
    pub fn execute(&self, cmd: &Command) -> Value {
        let mut store = self.lock();

        match cmd.op {
            Operation::Put => {
                store.insert(cmd.key, cmd.value);
                cmd.value
            }
            Operation::Get => store.get(&cmd.key).copied().unwrap_or(NIL),
            Operation::Rmw => {
                let v = store.entry(cmd.key).or_insert(0);
                *v += 1;
                *v
            }
            Operation::Delete => {
                store.remove(&cmd.key);
                NIL
            }
            Operation::None | Operation::RLock => NIL,
        }
    }

    pub fn get(&self, key: Key) -> Option<Value> {
        self.lock().get(&key).copied()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A poisoned lock only means another thread panicked in the middle of a single insert or
    // remove, which never leaves the map half updated.
    fn lock(&self) -> MutexGuard<'_, HashMap<Key, Value>> {
        match self.store.lock() {
            Ok(g) => g,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
