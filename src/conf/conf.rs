use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::errors::ConfError;
use crate::workload::MAX_START_RANGE;

/// Protocol selects how a simulated client talks to the replicas.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Protocol {
    /// Raw propose frames over a persistent connection, with separate issuer and receiver.
    Raw,
    /// A consistency-aware client with blocking read/write calls.
    Gryff,
    /// A consistency-aware client executing against an in-process state.
    Local,
}

impl Protocol {
    /// uses_client returns true if operations go through a `ConsistencyClient`.
    pub fn uses_client(&self) -> bool {
        *self != Protocol::Raw
    }
}

impl FromStr for Protocol {
    type Err = ConfError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "gryff" => Ok(Protocol::Gryff),
            "local" => Ok(Protocol::Local),
            // every replication protocol other than gryff speaks the raw propose frames.
            "raw" | "gus" | "epaxos" | "mencius" | "gpaxos" | "paxos" => Ok(Protocol::Raw),
            _ => Err(ConfError::BadProtocol(s.to_string())),
        }
    }
}

/// WorkloadConf describes what a single simulated client issues and how fast.
#[derive(Clone, Debug, PartialEq)]
pub struct WorkloadConf {
    /// Percentage of operations on the hot key. A negative value selects zipfian keys.
    pub conflicts: i32,
    pub start_range: i64,
    pub theta: f64,
    pub zipf_keys: u64,

    /// Fraction of operations that are writes, the rest are reads.
    pub writes: f64,
    /// Fraction of operations that are RMW, drawn before `writes`.
    pub rmws: f64,
    /// If set, clients with index below this always write and the others always read.
    pub writers: Option<usize>,
    pub blind_writes: bool,

    /// Mean interval between requests in microseconds. Zero or negative disables open-loop.
    pub poisson_us: i64,
    /// Max outstanding requests of one client.
    pub outstanding: usize,

    pub seed: Option<u64>,
}

impl Default for WorkloadConf {
    fn default() -> Self {
        WorkloadConf {
            conflicts: 0,
            start_range: 0,
            theta: 0.99,
            zipf_keys: 1_000_000_000,
            writes: 1.0,
            rmws: 0.0,
            writers: None,
            blind_writes: false,
            poisson_us: -1,
            outstanding: 1,
            seed: None,
        }
    }
}

impl WorkloadConf {
    pub fn validate(&self) -> Result<(), ConfError> {
        if self.conflicts > 100 {
            return Err(ConfError::BadConflicts(self.conflicts));
        }
        if self.conflicts < 0 {
            if self.zipf_keys == 0 {
                return Err(ConfError::BadZipf("zero keys".into()));
            }
            if !(self.theta >= 0.0) {
                return Err(ConfError::BadZipf(format!("theta:{}", self.theta)));
            }
        }
        if self.start_range < 0 || self.start_range > MAX_START_RANGE {
            return Err(ConfError::OutOfRange("start_range", self.start_range));
        }
        check_fraction("writes", self.writes)?;
        check_fraction("rmws", self.rmws)?;
        if self.outstanding < 1 {
            return Err(ConfError::OutOfRange(
                "outstanding",
                self.outstanding as i64,
            ));
        }
        Ok(())
    }

    /// arrival returns the mean open-loop inter-arrival time, None means closed-loop.
    pub fn arrival(&self) -> Option<Duration> {
        if self.poisson_us > 0 {
            Some(Duration::from_micros(self.poisson_us as u64))
        } else {
            None
        }
    }
}

fn check_fraction(field: &'static str, v: f64) -> Result<(), ConfError> {
    if (0.0..=1.0).contains(&v) {
        Ok(())
    } else {
        Err(ConfError::BadFraction(field, v))
    }
}

/// StatsConf controls the aggregator output.
#[derive(Clone, Debug, PartialEq)]
pub struct StatsConf {
    /// Seconds at the start of a run excluded from multi-file output.
    pub ramp_up: u64,
    /// Seconds before `timeout` excluded from multi-file output.
    pub ramp_down: u64,
    /// Configured run length in seconds. Only used to place the ramp-down window.
    pub timeout: u64,

    pub output_dir: PathBuf,
    pub tick: Duration,

    /// Split traces per replica and per op type, and apply the ramp window.
    pub multi_file: bool,
}

impl Default for StatsConf {
    fn default() -> Self {
        StatsConf {
            ramp_up: 15,
            ramp_down: 15,
            timeout: 180,
            output_dir: PathBuf::from("."),
            tick: Duration::from_secs(1),
            multi_file: true,
        }
    }
}

/// ClientOptions are handed to a `ConsistencyClient` when it is created.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ClientOptions {
    pub client_id: i32,
    pub master_addr: String,
    pub master_port: u16,
    /// Replica index to talk to, negative means "pick one by client id".
    pub forced_replica: i32,
    pub stats_file: String,
    pub regular: bool,
    pub sequential: bool,
    pub proxy_writes: bool,
    pub thrifty: bool,
    pub default_replica_order: bool,
    pub epaxos_mode: bool,
    pub blind_writes: bool,
    /// Read and write timeout of every replica connection. Zero means no timeout.
    pub op_timeout: Duration,
}

/// BenchConfig is everything a run needs.
#[derive(Clone, Debug, PartialEq)]
pub struct BenchConfig {
    pub master_addr: String,
    pub master_port: u16,

    /// Worker threads of the runtime.
    pub threads: usize,
    /// Number of simulated clients.
    pub clients: usize,

    /// Replica every client talks to, overriding the discovered leader. Negative means unset.
    pub force_leader: i32,
    /// Used as the server count when replicas are not discovered.
    pub num_servers: usize,
    /// Spread clients over all replicas instead of sending everything to the leader.
    pub single_cluster: bool,

    pub protocol: Protocol,
    pub client: ClientOptions,
    pub workload: WorkloadConf,
    pub stats: StatsConf,

    pub debug: bool,
    pub log_file: Option<PathBuf>,

    /// Capacity of the response channel shared by all clients and the aggregator.
    pub channel_capacity: usize,

    pub discovery_attempts: u32,
    pub discovery_backoff: Duration,

    /// Time every call of the in-process client takes, with protocol `local`.
    pub local_delay: Duration,
}

impl Default for BenchConfig {
    fn default() -> Self {
        BenchConfig {
            master_addr: String::new(),
            master_port: 7087,
            threads: 2,
            clients: 16,
            force_leader: -1,
            num_servers: 5,
            single_cluster: true,
            protocol: Protocol::Raw,
            client: ClientOptions {
                master_port: 7087,
                forced_replica: -1,
                sequential: true,
                proxy_writes: true,
                op_timeout: Duration::from_secs(5),
                ..Default::default()
            },
            workload: WorkloadConf::default(),
            stats: StatsConf::default(),
            debug: false,
            log_file: None,
            channel_capacity: 100_000,
            discovery_attempts: 30,
            discovery_backoff: Duration::from_millis(500),
            local_delay: Duration::from_secs(0),
        }
    }
}

impl BenchConfig {
    pub fn validate(&self) -> Result<(), ConfError> {
        self.workload.validate()?;

        if self.clients < 1 {
            return Err(ConfError::OutOfRange("clients", self.clients as i64));
        }
        if self.threads < 1 {
            return Err(ConfError::OutOfRange("threads", self.threads as i64));
        }
        if self.channel_capacity < 1 {
            return Err(ConfError::OutOfRange(
                "channel_capacity",
                self.channel_capacity as i64,
            ));
        }
        if self.discovery_attempts < 1 {
            return Err(ConfError::OutOfRange(
                "discovery_attempts",
                self.discovery_attempts as i64,
            ));
        }
        if self.protocol == Protocol::Local && self.num_servers < 1 {
            return Err(ConfError::OutOfRange("num_servers", 0));
        }
        Ok(())
    }

    /// forced_leader returns the replica index given by the user, if any.
    pub fn forced_leader(&self) -> Option<usize> {
        if self.force_leader >= 0 {
            Some(self.force_leader as usize)
        } else {
            None
        }
    }
}

/// ClusterConf is a static description of the replicas, read from yaml:
///
/// ```yaml
/// replicas:
///   - 127.0.0.1:7070
///   - 127.0.0.1:7071
/// leader: 0
/// ```
#[derive(Serialize, Deserialize, Debug, Clone, Eq, PartialEq)]
pub struct ClusterConf {
    pub replicas: Vec<String>,

    #[serde(default)]
    pub leader: usize,
}

impl ClusterConf {
    /// from_file read cluster conf yaml from a local file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<ClusterConf, ConfError> {
        let content = fs::read_to_string(path)?;
        ClusterConf::from_yaml(content.as_str())
    }

    pub fn from_yaml(content: &str) -> Result<ClusterConf, ConfError> {
        let cluster: ClusterConf = serde_yaml::from_str(content)?;
        cluster.check()?;
        Ok(cluster)
    }

    /// from_list builds a conf from comma separated addresses, with replica 0 as the leader.
    pub fn from_list(addrs: &str) -> Result<ClusterConf, ConfError> {
        let replicas: Vec<String> = addrs
            .split(',')
            .map(|s| s.trim())
            .filter(|s| !s.is_empty())
            .map(String::from)
            .collect();

        let cluster = ClusterConf {
            replicas,
            leader: 0,
        };
        cluster.check()?;
        Ok(cluster)
    }

    pub fn check(&self) -> Result<(), ConfError> {
        if self.replicas.is_empty() {
            return Err(ConfError::NoReplica);
        }
        if self.leader >= self.replicas.len() {
            return Err(ConfError::LeaderOutOfRange(
                self.leader,
                self.replicas.len(),
            ));
        }
        Ok(())
    }
}
