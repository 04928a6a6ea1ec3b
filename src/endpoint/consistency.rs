use std::time::{Instant, SystemTime};

use crate::stats::Response;

use super::client::{execute, ConsistencyClient};
use super::ClientCtx;

/// ConsistencyEndpoint drives a blocking `ConsistencyClient`, one operation at a time.
/// The client is moved onto the blocking thread pool for every call and handed back with the
/// result, so that a slow call never stalls the async workers. A call still running when the
/// client is cancelled is abandoned together with the client; the blocking thread ends once
/// the call returns or times out.
pub struct ConsistencyEndpoint {
    ctx: ClientCtx,
    client: Box<dyn ConsistencyClient>,
}

impl ConsistencyEndpoint {
    pub fn new(ctx: ClientCtx, client: Box<dyn ConsistencyClient>) -> ConsistencyEndpoint {
        ConsistencyEndpoint { ctx, client }
    }

    pub async fn run(self) {
        let mut ctx = self.ctx;
        let mut client = self.client;

        let mut id: i32 = 0;
        let mut done: u64 = 0;
        let mut failed: u64 = 0;

        loop {
            let cmd = ctx.workload.next_command(id);

            let admitted = tokio::select! {
                _ = ctx.cancel.cancelled() => false,
                r = ctx.shaper.admit() => r.is_ok(),
            };
            if !admitted {
                break;
            }

            ctx.table.insert(id, Instant::now(), cmd.is_read());

            let call = tokio::task::spawn_blocking(move || {
                let start = Instant::now();
                let ok = execute(client.as_mut(), &cmd);
                (client, ok, start.elapsed())
            });

            let joined = tokio::select! {
                _ = ctx.cancel.cancelled() => {
                    ctx.table.complete(id);
                    info!(ctx.logger, "call abandoned on stop"; "id" => id, "cmd" => %cmd);
                    break;
                }
                r = call => r,
            };

            let (c, ok, rtt) = match joined {
                Ok(r) => r,
                Err(e) => {
                    error!(ctx.logger, "client call panicked"; "id" => id, "err" => %e);
                    ClientCtx::stop(&ctx.cancel, &ctx.table);
                    break;
                }
            };
            client = c;
            let received_at = SystemTime::now();

            let pending = ctx.table.complete(id);

            if ok {
                done += 1;
                let is_read = pending.map(|p| p.is_read).unwrap_or_else(|| cmd.is_read());
                let resp = Response::new(
                    received_at,
                    rtt.as_secs_f64() * 1000.0,
                    is_read,
                    ctx.replica,
                );
                if ctx.tx.send(resp).await.is_err() {
                    debug!(ctx.logger, "stats aggregator is gone");
                    break;
                }
            } else {
                failed += 1;
                warn!(ctx.logger, "operation failed"; "id" => id, "cmd" => %cmd);
            }

            id = id.wrapping_add(1);
        }

        info!(ctx.logger, "client stopped"; "done" => done, "failed" => failed);
    }
}
