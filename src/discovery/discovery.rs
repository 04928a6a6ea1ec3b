use std::time::Duration;

use futures::future::{self, BoxFuture};
use slog::Logger;
use tokio::time::sleep;

use crate::conf::ClusterConf;

use super::errors::DiscoveryError;

/// ReplicaList is the answer of a discovery service. Addresses are meaningful only if `ready`.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct ReplicaList {
    pub ready: bool,
    pub replicas: Vec<String>,
}

/// Discovery tells the harness where the replicas are.
/// Both calls may go over the network, they are awaited on the runtime.
pub trait Discovery {
    fn replica_list(&self) -> BoxFuture<'_, Result<ReplicaList, DiscoveryError>>;

    /// leader returns the index of the current leader in the replica list.
    fn leader(&self) -> BoxFuture<'_, Result<usize, DiscoveryError>>;
}

/// StaticDiscovery serves a fixed cluster description and is always ready.
#[derive(Clone, Debug)]
pub struct StaticDiscovery {
    cluster: ClusterConf,
}

impl StaticDiscovery {
    pub fn new(cluster: ClusterConf) -> StaticDiscovery {
        StaticDiscovery { cluster }
    }
}

impl Discovery for StaticDiscovery {
    fn replica_list(&self) -> BoxFuture<'_, Result<ReplicaList, DiscoveryError>> {
        Box::pin(future::ready(Ok(ReplicaList {
            ready: true,
            replicas: self.cluster.replicas.clone(),
        })))
    }

    fn leader(&self) -> BoxFuture<'_, Result<usize, DiscoveryError>> {
        Box::pin(future::ready(Ok(self.cluster.leader)))
    }
}

/// Cluster is the discovered replica set.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Cluster {
    pub replicas: Vec<String>,
    pub leader: usize,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.replicas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.replicas.is_empty()
    }
}

/// discover asks `d` for a ready replica list and the leader, retrying every `backoff` up to
/// `attempts` times. A not-ready list or an error is retried.
/// `forced_leader` replaces the leader reported by `d`.
pub async fn discover(
    d: &(dyn Discovery + Send + Sync),
    forced_leader: Option<usize>,
    attempts: u32,
    backoff: Duration,
    logger: &Logger,
) -> Result<Cluster, DiscoveryError> {
    for attempt in 1..=attempts {
        match discover_once(d, forced_leader).await {
            Ok(Some(cluster)) => {
                if cluster.leader >= cluster.len() {
                    return Err(DiscoveryError::BadLeader(cluster.leader, cluster.len()));
                }
                info!(logger, "replicas discovered";
                    "replicas" => ?cluster.replicas,
                    "leader" => cluster.leader,
                    "forced" => forced_leader.is_some());
                return Ok(cluster);
            }
            Ok(None) => {
                info!(logger, "replica list not ready"; "attempt" => attempt);
            }
            Err(e) => {
                warn!(logger, "discovery failed"; "attempt" => attempt, "err" => %e);
            }
        }

        if attempt < attempts {
            sleep(backoff).await;
        }
    }

    Err(DiscoveryError::Exhausted(attempts))
}

async fn discover_once(
    d: &(dyn Discovery + Send + Sync),
    forced_leader: Option<usize>,
) -> Result<Option<Cluster>, DiscoveryError> {
    let list = d.replica_list().await?;
    if !list.ready || list.replicas.is_empty() {
        return Ok(None);
    }

    let leader = match forced_leader {
        Some(l) => l,
        None => d.leader().await?,
    };

    Ok(Some(Cluster {
        replicas: list.replicas,
        leader,
    }))
}
