use std::sync::Arc;
use std::time::{Instant, SystemTime};

use futures::{SinkExt, StreamExt};
use slog::Logger;
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio_util::codec::{FramedRead, FramedWrite};
use tokio_util::sync::CancellationToken;

use crate::outstanding::OutstandingRequests;
use crate::shaper::RateShaper;
use crate::stats::Response;
use crate::wire::{Propose, ProposeCodec, ReplyCodec};
use crate::workload::Workload;

use super::errors::EndpointError;
use super::ClientCtx;

/// RawEndpoint sends propose frames over one connection. The issuer and the receiver run as
/// two tasks sharing the outstanding request table, replies are matched to requests by id.
pub struct RawEndpoint {
    ctx: ClientCtx,
    stream: TcpStream,
}

impl RawEndpoint {
    pub async fn connect(addr: &str, ctx: ClientCtx) -> Result<RawEndpoint, EndpointError> {
        let stream = TcpStream::connect(addr)
            .await
            .map_err(|e| EndpointError::Connect(addr.to_string(), e))?;
        stream
            .set_nodelay(true)
            .map_err(|e| EndpointError::Connect(addr.to_string(), e))?;

        info!(ctx.logger, "connected"; "addr" => addr, "replica" => ctx.replica);

        Ok(RawEndpoint { ctx, stream })
    }

    pub async fn run(self) {
        let ctx = self.ctx;
        let (r, w) = self.stream.into_split();

        let issuer = tokio::spawn(issue(
            FramedWrite::new(w, ProposeCodec),
            ctx.workload,
            ctx.shaper,
            ctx.table.clone(),
            ctx.cancel.clone(),
            ctx.logger.clone(),
        ));

        receive(
            FramedRead::new(r, ReplyCodec),
            ctx.table,
            ctx.tx,
            ctx.replica,
            ctx.cancel,
            ctx.logger.clone(),
        )
        .await;

        match issuer.await {
            Ok(sent) => {
                info!(ctx.logger, "client stopped"; "sent" => sent);
            }
            Err(e) => {
                error!(ctx.logger, "issuer panicked"; "err" => %e);
            }
        }
    }
}

/// issue sends one request for every admission, and returns the number of requests sent.
async fn issue(
    mut sink: FramedWrite<OwnedWriteHalf, ProposeCodec>,
    mut workload: Workload,
    mut shaper: RateShaper,
    table: Arc<OutstandingRequests>,
    cancel: CancellationToken,
    logger: Logger,
) -> u64 {
    let mut id: i32 = 0;
    let mut sent = 0;

    loop {
        let cmd = workload.next_command(id);

        let admitted = tokio::select! {
            _ = cancel.cancelled() => false,
            r = shaper.admit() => r.is_ok(),
        };
        if !admitted {
            break;
        }

        table.insert(id, Instant::now(), cmd.is_read());

        let res = tokio::select! {
            _ = cancel.cancelled() => break,
            r = sink.send(Propose::new(id, cmd)) => r,
        };

        if let Err(e) = res {
            warn!(logger, "failed to send"; "id" => id, "err" => %e);
            ClientCtx::stop(&cancel, &table);
            break;
        }

        sent += 1;
        id = id.wrapping_add(1);
    }

    debug!(logger, "issuer stopped"; "sent" => sent, "queued" => shaper.queued());
    sent
}

/// receive completes requests as their replies arrive. A broken stream or a refused command
/// stops the whole client.
async fn receive(
    mut stream: FramedRead<OwnedReadHalf, ReplyCodec>,
    table: Arc<OutstandingRequests>,
    tx: mpsc::Sender<Response>,
    replica: usize,
    cancel: CancellationToken,
    logger: Logger,
) {
    loop {
        let next = tokio::select! {
            _ = cancel.cancelled() => break,
            n = stream.next() => n,
        };

        let reply = match next {
            Some(Ok(r)) if r.is_ok() => r,
            Some(Ok(r)) => {
                warn!(logger, "replica refused command"; "id" => r.command_id, "ok" => r.ok);
                break;
            }
            Some(Err(e)) => {
                warn!(logger, "error when reading"; "err" => %e);
                break;
            }
            None => {
                info!(logger, "connection closed by replica");
                break;
            }
        };

        let after = Instant::now();
        let received_at = SystemTime::now();

        let pending = match table.complete(reply.command_id) {
            Some(p) => p,
            None => {
                debug!(logger, "reply of unknown command"; "id" => reply.command_id);
                continue;
            }
        };

        let rtt_ms = after.duration_since(pending.issued_at).as_secs_f64() * 1000.0;
        let resp = Response::new(received_at, rtt_ms, pending.is_read, replica);

        if tx.send(resp).await.is_err() {
            debug!(logger, "stats aggregator is gone");
            break;
        }
    }

    ClientCtx::stop(&cancel, &table);
}
