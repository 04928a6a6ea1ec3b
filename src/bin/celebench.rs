#[macro_use]
extern crate slog;

use std::process;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use bench::conf::{bench_app, from_matches};
use bench::discovery::{Discovery, StaticDiscovery};
use bench::harness::Harness;
use bench::setup::init_logger;

fn main() {
    let matches = bench_app().get_matches();

    let args = match from_matches(&matches) {
        Ok(a) => a,
        Err(e) => {
            eprintln!("invalid arguments: {}", e);
            process::exit(2);
        }
    };
    let conf = args.conf;

    let logger = match init_logger(conf.log_file.as_deref(), conf.debug) {
        Ok(l) => l,
        Err(e) => {
            eprintln!("failed to init logger: {}", e);
            process::exit(1);
        }
    };

    let rt = match tokio::runtime::Builder::new_multi_thread()
        .worker_threads(conf.threads)
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(e) => {
            crit!(logger, "failed to build runtime"; "err" => %e);
            process::exit(1);
        }
    };

    let discovery = args.cluster.map(StaticDiscovery::new);
    let harness = Harness::new(conf, logger.clone());

    let res = rt.block_on(async {
        let shutdown = CancellationToken::new();
        let s = shutdown.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                s.cancel();
            }
        });

        let d = discovery
            .as_ref()
            .map(|d| d as &(dyn Discovery + Send + Sync));
        harness.run(d, None, shutdown).await
    });

    // abandoned gryff calls end at the latest when their op timeout fires.
    let grace = harness.conf().client.op_timeout + Duration::from_secs(1);
    rt.shutdown_timeout(grace);

    match res {
        Ok(ticks) => {
            info!(logger, "bye"; "ticks" => ticks);
        }
        Err(e) => {
            crit!(logger, "run failed"; "err" => %e);
            // let the async drain write out the last records.
            drop(harness);
            drop(logger);
            process::exit(1);
        }
    }
}
