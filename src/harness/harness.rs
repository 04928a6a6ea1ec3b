use std::sync::Arc;

use slog::Logger;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use kvstate::State;

use crate::conf::{BenchConfig, ConfError, Protocol};
use crate::discovery::{discover, Cluster, Discovery};
use crate::endpoint::{
    create_client, Backend, ClientCtx, ConsistencyEndpoint, Endpoint, RawEndpoint,
};
use crate::outstanding::OutstandingRequests;
use crate::shaper::RateShaper;
use crate::stats::StatsAggregator;
use crate::workload::{client_rng, Workload};
use crate::BenchError;

/// replica_of returns the replica that client `client` talks to.
/// In a single cluster test clients are spread over all `n` replicas, otherwise they all talk
/// to the leader.
pub fn replica_of(client: usize, n: usize, leader: usize, single_cluster: bool) -> usize {
    if single_cluster {
        client % n
    } else {
        leader
    }
}

/// Harness starts all simulated clients and the stats aggregator of one run.
pub struct Harness {
    conf: BenchConfig,
    logger: Logger,
}

impl Harness {
    pub fn new(conf: BenchConfig, logger: Logger) -> Harness {
        Harness { conf, logger }
    }

    pub fn conf(&self) -> &BenchConfig {
        &self.conf
    }

    /// run discovers the replicas, connects every client and reports until `max_ticks` ticks are
    /// done or `shutdown` is cancelled. Without both it runs until the process is killed.
    /// It returns the number of ticks reported.
    ///
    /// `discovery` is not used with protocol `local`, which runs against `num_servers`
    /// in-process replicas.
    pub async fn run(
        &self,
        discovery: Option<&(dyn Discovery + Send + Sync)>,
        max_ticks: Option<u64>,
        shutdown: CancellationToken,
    ) -> Result<u64, BenchError> {
        let conf = &self.conf;
        conf.validate()?;

        let cluster = match conf.protocol {
            Protocol::Local => None,
            _ => {
                let d = discovery.ok_or(ConfError::NoReplica)?;
                let c = discover(
                    d,
                    conf.forced_leader(),
                    conf.discovery_attempts,
                    conf.discovery_backoff,
                    &self.logger,
                )
                .await?;
                Some(c)
            }
        };

        let (n, leader) = match &cluster {
            Some(c) => (c.len(), c.leader),
            None => (conf.num_servers, conf.forced_leader().unwrap_or(0)),
        };
        if leader >= n {
            return Err(ConfError::LeaderOutOfRange(leader, n).into());
        }

        info!(self.logger, "starting clients";
            "protocol" => ?conf.protocol,
            "clients" => conf.clients,
            "replicas" => n,
            "leader" => leader,
            "single_cluster" => conf.single_cluster,
            "outstanding" => conf.workload.outstanding,
            "poisson_us" => conf.workload.poisson_us);

        let tables: Vec<Arc<OutstandingRequests>> = (0..conf.clients)
            .map(|_| Arc::new(OutstandingRequests::new(conf.workload.outstanding)))
            .collect();

        let (tx, rx) = mpsc::channel(conf.channel_capacity);

        // Output files are created before any client starts.
        let aggregator = StatsAggregator::open(
            &conf.stats,
            n,
            rx,
            conf.channel_capacity,
            tables.clone(),
            self.logger.new(o!("component" => "stats")),
        )?;

        let root = shutdown.child_token();
        let backend = self.backend(cluster.as_ref());

        let mut endpoints = Vec::with_capacity(conf.clients);
        for (i, table) in tables.iter().enumerate() {
            let replica = replica_of(i, n, leader, conf.single_cluster);
            let logger = self.logger.new(o!("client" => i, "replica" => replica));

            let ctx = ClientCtx {
                replica,
                table: table.clone(),
                workload: Workload::new(&conf.workload, i)?,
                shaper: RateShaper::new(
                    table.clone(),
                    conf.workload.arrival(),
                    client_rng(conf.workload.seed, i, 2),
                ),
                tx: tx.clone(),
                cancel: root.child_token(),
                logger: logger.clone(),
            };

            let ep = match (&cluster, &backend) {
                (_, Some(backend)) => {
                    let mut opts = conf.client.clone();
                    opts.client_id = opts.client_id.wrapping_add(i as i32);
                    let client = create_client(&opts, backend, logger)?;
                    Endpoint::Consistency(ConsistencyEndpoint::new(ctx, client))
                }
                (Some(c), None) => {
                    let addr = c
                        .replicas
                        .get(replica)
                        .ok_or(ConfError::LeaderOutOfRange(replica, n))?;
                    Endpoint::Raw(RawEndpoint::connect(addr, ctx).await?)
                }
                (None, None) => return Err(ConfError::NoReplica.into()),
            };
            endpoints.push(ep);
        }
        drop(tx);

        let handles: Vec<_> = endpoints
            .into_iter()
            .map(|ep| tokio::spawn(ep.run()))
            .collect();

        info!(self.logger, "clients started"; "clients" => handles.len());

        let ticks = aggregator.run(max_ticks, root.clone()).await;

        root.cancel();
        for t in tables.iter() {
            t.close();
        }
        for (i, h) in handles.into_iter().enumerate() {
            if let Err(e) = h.await {
                error!(self.logger, "client panicked"; "client" => i, "err" => %e);
            }
        }

        info!(self.logger, "run finished"; "ticks" => ticks);
        Ok(ticks)
    }

    /// backend returns what consistency clients run against, None for raw clients.
    fn backend(&self, cluster: Option<&Cluster>) -> Option<Backend> {
        if !self.conf.protocol.uses_client() {
            return None;
        }
        match (self.conf.protocol, cluster) {
            (Protocol::Local, _) => Some(Backend::State {
                state: Arc::new(State::new()),
                delay: self.conf.local_delay,
            }),
            (_, Some(c)) => Some(Backend::Replicas(c.clone())),
            (_, None) => None,
        }
    }
}
