use std::sync::Arc;
use std::thread;

#[cfg(test)]
use pretty_assertions::assert_eq;

use rand::Rng;

use crate::*;

#[test]
fn test_execute() {
    let st = State::new();

    assert_eq!(NIL, st.execute(&Command::of(Operation::Get, 1, 0)));
    assert_eq!(None, st.get(1));

    assert_eq!(10, st.execute(&Command::of(Operation::Put, 1, 10)));
    assert_eq!(10, st.execute(&Command::of(Operation::Get, 1, 0)));

    assert_eq!(11, st.execute(&Command::of(Operation::Rmw, 1, 0)));
    assert_eq!(Some(11), st.get(1));

    assert_eq!(NIL, st.execute(&Command::of(Operation::Delete, 1, 0)));
    assert_eq!(None, st.get(1));

    assert_eq!(NIL, st.execute(&Command::of(Operation::None, 2, 3)));
    assert_eq!(NIL, st.execute(&Command::of(Operation::RLock, 2, 3)));
    assert!(st.is_empty());
}

#[test]
fn test_rmw_monotonic() {
    let st = State::new();
    let mut rng = rand::thread_rng();

    let k = 42;
    for want in 1..=200 {
        // unrelated keys in between must not disturb the counter.
        for _ in 0..rng.gen_range(0..4) {
            let other = rng.gen_range(100..200);
            match rng.gen_range(0..3) {
                0 => st.execute(&Command::of(Operation::Put, other, 7)),
                1 => st.execute(&Command::of(Operation::Get, other, 0)),
                _ => st.execute(&Command::of(Operation::Rmw, other, 0)),
            };
        }

        assert_eq!(want, st.execute(&Command::of(Operation::Rmw, k, 0)));
    }
}

#[test]
fn test_rmw_concurrent() {
    let st = Arc::new(State::new());
    let n_threads = 8;
    let per_thread = 1000;

    let handles: Vec<_> = (0..n_threads)
        .map(|_| {
            let st = st.clone();
            thread::spawn(move || {
                for _ in 0..per_thread {
                    st.execute(&Command::of(Operation::Rmw, 5, 0));
                }
            })
        })
        .collect();

    for h in handles {
        h.join().unwrap();
    }

    assert_eq!(Some(n_threads * per_thread), st.get(5));
}
