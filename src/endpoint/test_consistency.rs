use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use slog::{o, Discard, Logger};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

use kvstate::{Key, State, Value, NIL};

use super::*;
use crate::conf::WorkloadConf;
use crate::outstanding::OutstandingRequests;
use crate::shaper::RateShaper;
use crate::stats::Response;
use crate::workload::{client_rng, Workload};

fn ctx(
    conf: &WorkloadConf,
    tx: mpsc::Sender<Response>,
    cancel: CancellationToken,
) -> (ClientCtx, Arc<OutstandingRequests>) {
    let table = Arc::new(OutstandingRequests::new(conf.outstanding));
    let ctx = ClientCtx {
        replica: 1,
        table: table.clone(),
        workload: Workload::new(conf, 1).unwrap(),
        shaper: RateShaper::new(table.clone(), conf.arrival(), client_rng(conf.seed, 1, 2)),
        tx,
        cancel,
        logger: Logger::root(Discard, o!()),
    };
    (ctx, table)
}

/// WriteFails fails every write and counts the calls.
struct WriteFails {
    calls: Arc<AtomicU64>,
}

impl ConsistencyClient for WriteFails {
    fn read(&mut self, _key: Key) -> (bool, Value) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (true, NIL)
    }

    fn write(&mut self, _key: Key, _value: Value) -> bool {
        self.calls.fetch_add(1, Ordering::SeqCst);
        false
    }

    fn rmw(&mut self, _key: Key) -> (bool, Value) {
        self.calls.fetch_add(1, Ordering::SeqCst);
        (false, NIL)
    }
}

#[tokio::test]
async fn test_local_state() {
    let conf = WorkloadConf {
        writes: 0.5,
        seed: Some(2),
        ..Default::default()
    };
    let state = Arc::new(State::new());
    let client = StateClient::new(state.clone(), Duration::from_micros(100));

    let (tx, mut rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();
    let (c, table) = ctx(&conf, tx, cancel.clone());

    let h = tokio::spawn(Endpoint::Consistency(ConsistencyEndpoint::new(c, Box::new(client))).run());

    let mut reads = 0;
    for _ in 0..100 {
        let r = rx.recv().await.unwrap();
        assert_eq!(1, r.replica_id);
        assert!(r.rtt_ms >= 0.1, "rtt={}", r.rtt_ms);
        if r.is_read {
            reads += 1;
        }
    }
    assert!(reads > 0 && reads < 100, "reads={}", reads);

    cancel.cancel();
    timeout(Duration::from_secs(5), h).await.unwrap().unwrap();

    // every write is a distinct cold key.
    assert!(state.len() >= 100 - reads);
    assert!(table.len() <= 1);
}

#[tokio::test]
async fn test_rmw() {
    let conf = WorkloadConf {
        conflicts: 100,
        rmws: 1.0,
        seed: Some(3),
        ..Default::default()
    };
    let state = Arc::new(State::new());
    let client = StateClient::new(state.clone(), Duration::from_secs(0));

    let (tx, mut rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();
    let (c, _) = ctx(&conf, tx, cancel.clone());

    let h = tokio::spawn(ConsistencyEndpoint::new(c, Box::new(client)).run());

    for _ in 0..20 {
        let r = rx.recv().await.unwrap();
        assert!(!r.is_read);
    }
    cancel.cancel();
    timeout(Duration::from_secs(5), h).await.unwrap().unwrap();

    // all on the hot key.
    assert_eq!(1, state.len());
    assert!(state.get(42).unwrap() >= 20);
}

#[tokio::test]
async fn test_failed_operation_emits_nothing() {
    let conf = WorkloadConf {
        writes: 1.0,
        outstanding: 2,
        seed: Some(4),
        ..Default::default()
    };
    let calls = Arc::new(AtomicU64::new(0));
    let client = WriteFails {
        calls: calls.clone(),
    };

    let (tx, mut rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();
    let (c, table) = ctx(&conf, tx, cancel.clone());

    let h = tokio::spawn(ConsistencyEndpoint::new(c, Box::new(client)).run());

    assert!(timeout(Duration::from_millis(200), rx.recv()).await.is_err());
    assert!(calls.load(Ordering::SeqCst) > 10);

    cancel.cancel();
    timeout(Duration::from_secs(5), h).await.unwrap().unwrap();

    // failed operations are completed too.
    assert!(table.is_empty());
    assert_eq!(2, table.admission().available_permits());
}
