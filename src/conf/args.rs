use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use clap::{App, Arg, ArgMatches};

use super::conf::{BenchConfig, ClusterConf, Protocol};
use super::errors::ConfError;

/// CliArgs is the result of parsing the command line.
#[derive(Clone, Debug, PartialEq)]
pub struct CliArgs {
    pub conf: BenchConfig,
    /// Static replica list from `--cluster` or `--replicas`.
    pub cluster: Option<ClusterConf>,
}

fn opt(name: &'static str, default: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .default_value(default)
        .help(help)
}

/// A boolean flag: `--name` or `--name=true` sets it, `--name=false` clears it.
fn switch(name: &'static str, help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name(name)
        .long(name)
        .takes_value(true)
        .min_values(0)
        .require_equals(true)
        .help(help)
}

pub fn bench_app() -> App<'static, 'static> {
    App::new("celebench")
        .version("0.1.0")
        .author("openacid")
        .about("load generator of a replicated kv service")
        .arg(opt(
            "maddr",
            "",
            "Master address. Only logged, replicas come from --cluster or --replicas",
        ))
        .arg(opt(
            "mport",
            "7087",
            "Master port. Only logged, replicas come from --cluster or --replicas",
        ))
        .arg(opt("procs", "2", "Number of worker threads").short("p"))
        .arg(
            opt(
                "conflicts",
                "0",
                "Percentage of conflicts. If negative, uses Zipfian distribution",
            )
            .short("c")
            .allow_hyphen_values(true),
        )
        .arg(
            opt("leader", "-1", "Force clients to talk to a certain replica")
                .short("l")
                .allow_hyphen_values(true),
        )
        .arg(opt("sr", "0", "Key range start"))
        .arg(opt("clients", "16", "Number of simulated clients").short("T"))
        .arg(opt(
            "or",
            "1",
            "Number of outstanding requests a client can have at any given time",
        ))
        .arg(opt("theta", "0.99", "Theta zipfian parameter"))
        .arg(opt("z", "1000000000", "Number of unique keys in zipfian distribution").short("z"))
        .arg(
            opt(
                "poisson",
                "-1",
                "The average number of microseconds between requests. -1 disables Poisson",
            )
            .allow_hyphen_values(true),
        )
        .arg(opt(
            "writes",
            "1",
            "Fraction of requests that are writes. The remainder are reads",
        ))
        .arg(opt("rmws", "0", "Fraction of requests that are read-modify-writes"))
        .arg(
            Arg::with_name("writers")
                .long("writers")
                .takes_value(true)
                .help("Clients with an index below this always write, the others always read"),
        )
        .arg(switch(
            "blindwrites",
            "True if writes don't need to execute before clients receive responses",
        ))
        .arg(switch(
            "singleClusterTest",
            "True if clients run in a single cluster, default true",
        ))
        .arg(opt(
            "rampUp",
            "15",
            "Length of the warm-up period before statistics are measured (in seconds)",
        ))
        .arg(opt(
            "rampDown",
            "15",
            "Length of the cool-down period after statistics are measured (in seconds)",
        ))
        .arg(opt("timeout", "180", "Length of a run (in seconds)"))
        .arg(opt(
            "replProtocol",
            "gus",
            "Replication protocol: gryff, local, or one speaking raw propose frames",
        ))
        .arg(opt("n", "5", "Number of servers, used if replicas are not discovered").short("n"))
        .arg(opt("clientId", "0", "Client identifier of the first client"))
        .arg(switch("debug", "Enable debug output"))
        .arg(switch(
            "defaultReplicaOrder",
            "Use default replica order for coordination",
        ))
        .arg(switch("epaxosMode", "Run with the same message pattern as EPaxos"))
        .arg(switch("proxy", "Proxy writes at local replica, default true"))
        .arg(switch(
            "regular",
            "Perform operations with regular consistency",
        ))
        .arg(switch(
            "sequential",
            "Perform operations with sequential consistency, default true",
        ))
        .arg(opt(
            "statsFile",
            "",
            "Only logged by gryff clients. Statistics are written to --out",
        ))
        .arg(switch(
            "thrifty",
            "Only initially send messages to nearest quorum of replicas",
        ))
        .arg(
            Arg::with_name("cluster")
                .long("cluster")
                .takes_value(true)
                .conflicts_with("replicas")
                .help("cluster config in yaml"),
        )
        .arg(
            Arg::with_name("replicas")
                .long("replicas")
                .takes_value(true)
                .help("comma separated replica addresses, the first one is the leader"),
        )
        .arg(opt("out", ".", "Directory of the output files"))
        .arg(
            Arg::with_name("log")
                .long("log")
                .takes_value(true)
                .help("log file, defaults to stderr"),
        )
        .arg(
            Arg::with_name("seed")
                .long("seed")
                .takes_value(true)
                .help("seed of key and operation draws"),
        )
        .arg(opt(
            "localDelay",
            "0",
            "Microseconds every operation takes with protocol local",
        ))
        .arg(opt(
            "opTimeout",
            "5000",
            "Milliseconds a gryff client waits for a replica before the operation fails, 0 waits forever",
        ))
}

fn value<T: FromStr>(m: &ArgMatches, name: &str) -> Result<T, ConfError> {
    let v = m.value_of(name).unwrap_or("");
    v.parse()
        .map_err(|_| ConfError::BadArg(name.to_string(), v.to_string()))
}

fn value_opt<T: FromStr>(m: &ArgMatches, name: &str) -> Result<Option<T>, ConfError> {
    if m.is_present(name) {
        value(m, name).map(Some)
    } else {
        Ok(None)
    }
}

fn flag(m: &ArgMatches, name: &str, default: bool) -> Result<bool, ConfError> {
    if !m.is_present(name) {
        return Ok(default);
    }
    match m.value_of(name) {
        None => Ok(true),
        Some("true") | Some("1") => Ok(true),
        Some("false") | Some("0") => Ok(false),
        Some(v) => Err(ConfError::BadArg(name.to_string(), v.to_string())),
    }
}

/// from_matches builds and validates the config from parsed arguments, and loads the static
/// cluster description if one is given.
pub fn from_matches(m: &ArgMatches) -> Result<CliArgs, ConfError> {
    let mut c = BenchConfig::default();

    c.master_addr = value(m, "maddr")?;
    c.master_port = value(m, "mport")?;
    c.threads = value(m, "procs")?;
    c.clients = value(m, "clients")?;
    c.force_leader = value(m, "leader")?;
    c.num_servers = value(m, "n")?;
    c.single_cluster = flag(m, "singleClusterTest", true)?;
    c.protocol = Protocol::from_str(m.value_of("replProtocol").unwrap_or(""))?;
    c.debug = flag(m, "debug", false)?;
    c.log_file = m.value_of("log").map(PathBuf::from);

    let w = &mut c.workload;
    w.conflicts = value(m, "conflicts")?;
    w.start_range = value(m, "sr")?;
    w.theta = value(m, "theta")?;
    w.zipf_keys = value(m, "z")?;
    w.writes = value(m, "writes")?;
    w.rmws = value(m, "rmws")?;
    w.writers = value_opt(m, "writers")?;
    w.blind_writes = flag(m, "blindwrites", false)?;
    w.poisson_us = value(m, "poisson")?;
    w.outstanding = value(m, "or")?;
    w.seed = value_opt(m, "seed")?;

    let s = &mut c.stats;
    s.ramp_up = value(m, "rampUp")?;
    s.ramp_down = value(m, "rampDown")?;
    s.timeout = value(m, "timeout")?;
    s.output_dir = PathBuf::from(m.value_of("out").unwrap_or("."));
    s.multi_file = c.single_cluster;

    c.client.client_id = value(m, "clientId")?;
    c.client.master_addr = c.master_addr.clone();
    c.client.master_port = c.master_port;
    c.client.forced_replica = c.force_leader;
    c.client.stats_file = value(m, "statsFile")?;
    c.client.regular = flag(m, "regular", false)?;
    c.client.sequential = flag(m, "sequential", true)?;
    c.client.proxy_writes = flag(m, "proxy", true)?;
    c.client.thrifty = flag(m, "thrifty", false)?;
    c.client.default_replica_order = flag(m, "defaultReplicaOrder", false)?;
    c.client.epaxos_mode = flag(m, "epaxosMode", false)?;
    c.client.blind_writes = c.workload.blind_writes;

    let timeout_ms: u64 = value(m, "opTimeout")?;
    c.client.op_timeout = Duration::from_millis(timeout_ms);

    let delay_us: u64 = value(m, "localDelay")?;
    c.local_delay = Duration::from_micros(delay_us);

    c.validate()?;

    let cluster = if let Some(path) = m.value_of("cluster") {
        Some(ClusterConf::from_file(path)?)
    } else if let Some(list) = m.value_of("replicas") {
        Some(ClusterConf::from_list(list)?)
    } else {
        None
    };

    Ok(CliArgs { conf: c, cluster })
}
