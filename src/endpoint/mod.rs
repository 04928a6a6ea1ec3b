//! A simulated client: it issues generated commands to one replica and reports every
//! completed one to the stats aggregator.

mod client;
mod consistency;
mod errors;
mod raw;

pub use client::*;
pub use consistency::*;
pub use errors::*;
pub use raw::*;

use std::sync::Arc;

use slog::Logger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use crate::outstanding::OutstandingRequests;
use crate::shaper::RateShaper;
use crate::stats::Response;
use crate::workload::Workload;


#[cfg(test)]
mod test_consistency;

#[cfg(test)]
mod test_raw;

/// ClientCtx is everything a simulated client owns or shares with the harness.
pub struct ClientCtx {
    /// Index of the replica this client talks to, reported in every response.
    pub replica: usize,

    pub table: Arc<OutstandingRequests>,
    pub workload: Workload,
    pub shaper: RateShaper,

    pub tx: mpsc::Sender<Response>,

    /// Cancelled when the client must stop, either by the harness or by a failing receiver.
    pub cancel: CancellationToken,
    pub logger: Logger,
}

impl ClientCtx {
    /// stop cancels the client and wakes up an issuer waiting for admission.
    pub fn stop(cancel: &CancellationToken, table: &OutstandingRequests) {
        cancel.cancel();
        table.close();
    }
}

pub enum Endpoint {
    Raw(RawEndpoint),
    Consistency(ConsistencyEndpoint),
}

impl Endpoint {
    /// run issues requests until the client is cancelled or its connection fails.
    pub async fn run(self) {
        match self {
            Endpoint::Raw(e) => e.run().await,
            Endpoint::Consistency(e) => e.run().await,
        }
    }
}
