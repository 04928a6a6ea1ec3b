use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use futures::{SinkExt, StreamExt};

#[cfg(test)]
use pretty_assertions::assert_eq;

use slog::{o, Discard, Logger};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::time::{sleep, timeout};
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use super::*;
use crate::conf::WorkloadConf;
use crate::outstanding::OutstandingRequests;
use crate::shaper::RateShaper;
use crate::stats::Response;
use crate::wire::{ProposeCodec, ProposeReply, ReplyCodec};
use crate::workload::{client_rng, Workload};

/// replica replies to every propose after `delay`. Commands with id >= `refuse_from` are
/// refused.
async fn replica(delay: Duration, refuse_from: i32) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        while let Ok((s, _)) = listener.accept().await {
            tokio::spawn(async move {
                let (r, w) = s.into_split();
                let mut proposes = FramedRead::new(r, ProposeCodec);
                let mut replies = FramedWrite::new(w, ReplyCodec);

                while let Some(Ok(p)) = proposes.next().await {
                    sleep(delay).await;
                    let reply = ProposeReply {
                        ok: if p.command_id < refuse_from { 1 } else { 0 },
                        command_id: p.command_id,
                        value: p.command.value,
                        timestamp: 0,
                    };
                    if replies.send(reply).await.is_err() {
                        return;
                    }
                }
            });
        }
    });

    addr
}

fn ctx(
    outstanding: usize,
    writes: f64,
    tx: mpsc::Sender<Response>,
    cancel: CancellationToken,
) -> (ClientCtx, Arc<OutstandingRequests>) {
    let conf = WorkloadConf {
        writes,
        outstanding,
        seed: Some(1),
        ..Default::default()
    };

    let table = Arc::new(OutstandingRequests::new(outstanding));
    let ctx = ClientCtx {
        replica: 3,
        table: table.clone(),
        workload: Workload::new(&conf, 0).unwrap(),
        shaper: RateShaper::new(table.clone(), conf.arrival(), client_rng(conf.seed, 0, 2)),
        tx,
        cancel,
        logger: Logger::root(Discard, o!()),
    };
    (ctx, table)
}

#[tokio::test]
async fn test_raw_responses() {
    let addr = replica(Duration::from_millis(2), i32::MAX).await;

    let (tx, mut rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();
    let (c, table) = ctx(4, 0.5, tx, cancel.clone());

    let ep = RawEndpoint::connect(&addr.to_string(), c).await.unwrap();
    let h = tokio::spawn(Endpoint::Raw(ep).run());

    let mut reads = 0;
    for _ in 0..50 {
        let r = rx.recv().await.unwrap();
        assert_eq!(3, r.replica_id);
        assert_eq!(0.0, r.commit_latency_ms);
        assert!(r.rtt_ms >= 2.0, "rtt={}", r.rtt_ms);
        if r.is_read {
            reads += 1;
        }
        assert!(table.len() <= 4);
    }
    assert!(reads > 0 && reads < 50, "reads={}", reads);

    cancel.cancel();
    timeout(Duration::from_secs(5), h).await.unwrap().unwrap();
    assert!(table.len() <= 4);
}

#[tokio::test]
async fn test_refused_command_stops_client() {
    let addr = replica(Duration::from_millis(1), 10).await;

    let (tx, mut rx) = mpsc::channel(1000);
    let cancel = CancellationToken::new();
    let (c, table) = ctx(1, 1.0, tx, cancel.clone());

    let ep = RawEndpoint::connect(&addr.to_string(), c).await.unwrap();

    // stops by itself.
    timeout(Duration::from_secs(5), Endpoint::Raw(ep).run())
        .await
        .unwrap();

    assert!(cancel.is_cancelled());
    assert!(table.is_closed());

    let mut got = 0;
    while let Ok(r) = rx.try_recv() {
        assert!(!r.is_read);
        got += 1;
    }
    assert_eq!(10, got);
}

#[tokio::test]
async fn test_connect_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap().to_string();
    drop(listener);

    let (tx, _rx) = mpsc::channel(1);
    let (c, _) = ctx(1, 1.0, tx, CancellationToken::new());

    match RawEndpoint::connect(&addr, c).await {
        Err(EndpointError::Connect(a, _)) => assert_eq!(addr, a),
        Err(e) => panic!("unexpected error: {}", e),
        Ok(_) => panic!("nothing is listening"),
    }
}
