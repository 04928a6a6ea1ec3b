use std::path::PathBuf;
use std::time::Duration;

#[cfg(test)]
use pretty_assertions::assert_eq;

use super::*;

fn parse(args: &[&str]) -> Result<CliArgs, ConfError> {
    let mut argv = vec!["celebench"];
    argv.extend_from_slice(args);
    let m = bench_app().get_matches_from_safe(argv).unwrap();
    from_matches(&m)
}

#[test]
fn test_defaults() {
    let a = parse(&[]).unwrap();
    let c = &a.conf;

    assert_eq!(None, a.cluster);
    assert_eq!(Protocol::Raw, c.protocol);
    assert_eq!(16, c.clients);
    assert_eq!(2, c.threads);
    assert_eq!(None, c.forced_leader());
    assert_eq!(5, c.num_servers);
    assert!(c.single_cluster);
    assert!(c.stats.multi_file);
    assert_eq!(15, c.stats.ramp_up);
    assert_eq!(15, c.stats.ramp_down);
    assert_eq!(180, c.stats.timeout);
    assert_eq!(PathBuf::from("."), c.stats.output_dir);

    assert_eq!(WorkloadConf::default(), c.workload);

    assert_eq!(7087, c.client.master_port);
    assert_eq!(-1, c.client.forced_replica);
    assert!(c.client.sequential);
    assert!(c.client.proxy_writes);
    assert!(!c.client.regular);
    assert_eq!(Duration::from_secs(5), c.client.op_timeout);
}

#[test]
fn test_go_style_flags() {
    let a = parse(&[
        "-c",
        "-1",
        "-T",
        "8",
        "--or",
        "4",
        "--theta",
        "0.5",
        "-z",
        "1000",
        "--poisson",
        "200",
        "--writes",
        "0.1",
        "-l",
        "2",
        "--replProtocol",
        "gryff",
        "--singleClusterTest=false",
        "--proxy=false",
        "--regular",
        "--seed",
        "7",
        "--localDelay",
        "50",
        "--opTimeout",
        "250",
        "--replicas",
        "a:1,b:2,c:3",
    ])
    .unwrap();
    let c = &a.conf;

    assert_eq!(-1, c.workload.conflicts);
    assert_eq!(8, c.clients);
    assert_eq!(4, c.workload.outstanding);
    assert_eq!(0.5, c.workload.theta);
    assert_eq!(1000, c.workload.zipf_keys);
    assert_eq!(Some(Duration::from_micros(200)), c.workload.arrival());
    assert_eq!(0.1, c.workload.writes);
    assert_eq!(Some(7), c.workload.seed);
    assert_eq!(Some(2), c.forced_leader());
    assert_eq!(2, c.client.forced_replica);
    assert_eq!(Protocol::Gryff, c.protocol);
    assert!(!c.single_cluster);
    assert!(!c.stats.multi_file);
    assert!(!c.client.proxy_writes);
    assert!(c.client.regular);
    assert_eq!(Duration::from_micros(50), c.local_delay);
    assert_eq!(Duration::from_millis(250), c.client.op_timeout);

    let cluster = a.cluster.unwrap();
    assert_eq!(3, cluster.replicas.len());
    assert_eq!(0, cluster.leader);
}

#[test]
fn test_writers_and_rmws() {
    let a = parse(&["--writers", "3", "--rmws", "0.25"]).unwrap();
    assert_eq!(Some(3), a.conf.workload.writers);
    assert_eq!(0.25, a.conf.workload.rmws);
}

#[test]
fn test_bad_args() {
    assert_eq!(
        ConfError::BadArg("clients".into(), "x".into()),
        parse(&["-T", "x"]).unwrap_err()
    );
    assert_eq!(
        ConfError::BadArg("proxy".into(), "maybe".into()),
        parse(&["--proxy=maybe"]).unwrap_err()
    );
    assert_eq!(
        ConfError::BadProtocol("foo".into()),
        parse(&["--replProtocol", "foo"]).unwrap_err()
    );
    assert_eq!(
        ConfError::BadConflicts(101),
        parse(&["-c", "101"]).unwrap_err()
    );
    assert_eq!(
        ConfError::BadFraction("writes", 1.5),
        parse(&["--writes", "1.5"]).unwrap_err()
    );
    assert_eq!(ConfError::NoReplica, parse(&["--replicas", " , "]).unwrap_err());
}

#[test]
fn test_master_flags_are_documented_as_unused() {
    let mut buf = Vec::new();
    bench_app().write_long_help(&mut buf).unwrap();
    let help = String::from_utf8(buf).unwrap();

    assert!(help.matches("Only logged").count() >= 3, "{}", help);

    // they do not change where replicas come from.
    let a = parse(&["--maddr", "10.0.0.1", "--mport", "1234"]).unwrap();
    assert_eq!(None, a.cluster);
    assert_eq!("10.0.0.1", a.conf.client.master_addr);
    assert_eq!(1234, a.conf.client.master_port);
}
