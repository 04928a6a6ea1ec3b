use std::fs::{self, File};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use slog::Logger;
use tokio::sync::mpsc;
use tokio::time::{interval_at, Instant};
use tokio_util::sync::CancellationToken;

use crate::conf::StatsConf;
use crate::outstanding::OutstandingRequests;

use super::errors::StatsError;

pub const SUMMARY_FILE: &str = "lattput.txt";
pub const TRACE_FILE: &str = "latency.txt";

/// Response describes one completed operation.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Response {
    pub received_at: SystemTime,
    pub rtt_ms: f64,
    /// Not measured by any endpoint yet, always 0.
    pub commit_latency_ms: f64,
    pub is_read: bool,
    pub replica_id: usize,
}

impl Response {
    pub fn new(received_at: SystemTime, rtt_ms: f64, is_read: bool, replica_id: usize) -> Response {
        Response {
            received_at,
            rtt_ms,
            commit_latency_ms: 0.0,
            is_read,
            replica_id,
        }
    }

    pub fn trace_line(&self) -> String {
        format!(
            "{} {:.6} {:.6}",
            unix_nanos(self.received_at),
            self.rtt_ms,
            self.commit_latency_ms
        )
    }
}

/// TickSummary is what one tick reports.
#[derive(Clone, Debug, PartialEq)]
pub struct TickSummary {
    pub end_ns: i64,
    pub avg_rtt_ms: f64,
    pub throughput: f64,
    pub count: usize,
    pub outstanding: usize,
    pub avg_commit_ms: f64,
}

impl TickSummary {
    pub fn line(&self) -> String {
        format!(
            "{} {:.6} {:.6} {} {} {:.6}",
            self.end_ns,
            self.avg_rtt_ms,
            self.throughput,
            self.count,
            self.outstanding,
            self.avg_commit_ms
        )
    }
}

/// in_window returns true if a tick at `elapsed` seconds since the start of a run is outside
/// of both the ramp-up and the ramp-down period. Bounds are exclusive.
pub fn in_window(elapsed: u64, ramp_up: u64, ramp_down: u64, timeout: u64) -> bool {
    ramp_up < elapsed && (elapsed as i128) < timeout as i128 - ramp_down as i128
}

pub fn unix_nanos(t: SystemTime) -> i64 {
    match t.duration_since(UNIX_EPOCH) {
        Ok(d) => d.as_nanos() as i64,
        Err(_) => 0,
    }
}

enum Sinks {
    /// Every record goes to one trace file, every tick is reported.
    Single {
        summary: BufWriter<File>,
        trace: BufWriter<File>,
    },
    /// Records go to per replica read and write files, only ticks in the window are reported.
    Multi {
        summary: BufWriter<File>,
        reads: Vec<BufWriter<File>>,
        writes: Vec<BufWriter<File>>,
    },
}

impl Sinks {
    fn summary(&mut self) -> &mut BufWriter<File> {
        match self {
            Sinks::Single { summary, .. } => summary,
            Sinks::Multi { summary, .. } => summary,
        }
    }

    fn trace(&mut self, r: &Response) -> Option<&mut BufWriter<File>> {
        match self {
            Sinks::Single { trace, .. } => Some(trace),
            Sinks::Multi { reads, writes, .. } => {
                if r.is_read {
                    reads.get_mut(r.replica_id)
                } else {
                    writes.get_mut(r.replica_id)
                }
            }
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Sinks::Single { summary, trace } => {
                trace.flush()?;
                summary.flush()
            }
            Sinks::Multi {
                summary,
                reads,
                writes,
            } => {
                for w in reads.iter_mut().chain(writes.iter_mut()) {
                    w.flush()?;
                }
                summary.flush()
            }
        }
    }
}

fn create(dir: &Path, name: String) -> Result<BufWriter<File>, StatsError> {
    let path: PathBuf = dir.join(name);
    let f = File::create(&path).map_err(|e| StatsError::Create(path, e))?;
    Ok(BufWriter::new(f))
}

/// StatsAggregator consumes the responses of all clients and writes a report every tick.
pub struct StatsAggregator {
    conf: StatsConf,
    rx: mpsc::Receiver<Response>,
    capacity: usize,
    tables: Vec<Arc<OutstandingRequests>>,
    sinks: Sinks,

    /// End time of the previous tick, the start of the throughput interval.
    last_end: SystemTime,
    started: Instant,

    logger: Logger,
}

impl StatsAggregator {
    /// open creates all output files. Nothing is consumed before the first tick.
    /// `capacity` is the capacity of the channel behind `rx`, it caps the records drained by
    /// one tick.
    pub fn open(
        conf: &StatsConf,
        n_replicas: usize,
        rx: mpsc::Receiver<Response>,
        capacity: usize,
        tables: Vec<Arc<OutstandingRequests>>,
        logger: Logger,
    ) -> Result<StatsAggregator, StatsError> {
        let dir = conf.output_dir.as_path();
        if !dir.as_os_str().is_empty() && !dir.is_dir() {
            fs::create_dir_all(dir).map_err(|e| StatsError::Create(dir.to_path_buf(), e))?;
        }

        let summary = create(dir, SUMMARY_FILE.to_string())?;

        let sinks = if conf.multi_file {
            let mut reads = Vec::with_capacity(n_replicas);
            let mut writes = Vec::with_capacity(n_replicas);
            for i in 0..n_replicas {
                reads.push(create(dir, format!("latFileRead-{}.txt", i))?);
                writes.push(create(dir, format!("latFileWrite-{}.txt", i))?);
            }
            Sinks::Multi {
                summary,
                reads,
                writes,
            }
        } else {
            Sinks::Single {
                summary,
                trace: create(dir, TRACE_FILE.to_string())?,
            }
        };

        info!(logger, "stats output ready";
            "dir" => %dir.display(),
            "multi_file" => conf.multi_file,
            "replicas" => n_replicas);

        Ok(StatsAggregator {
            conf: conf.clone(),
            rx,
            capacity,
            tables,
            sinks,
            last_end: SystemTime::now(),
            started: Instant::now(),
            logger,
        })
    }

    /// outstanding returns the number of requests in flight of all clients.
    pub fn outstanding(&self) -> usize {
        self.tables.iter().map(|t| t.len()).sum()
    }

    /// tick drains every buffered response and reports them.
    /// `now` is used as the end time if nothing is drained, `elapsed` is the time since the run
    /// started. It returns the summary if it is written.
    pub fn tick(&mut self, now: SystemTime, elapsed: Duration) -> Option<TickSummary> {
        let record = !self.conf.multi_file
            || in_window(
                elapsed.as_secs(),
                self.conf.ramp_up,
                self.conf.ramp_down,
                self.conf.timeout,
            );

        let mut count = 0;
        let mut sum = 0.0;
        let mut commit_sum = 0.0;
        let mut end = now;

        while count < self.capacity {
            let r = match self.rx.try_recv() {
                Ok(r) => r,
                Err(_) => break,
            };
            count += 1;

            if !record {
                continue;
            }

            match self.sinks.trace(&r) {
                Some(w) => {
                    if let Err(e) = writeln!(w, "{}", r.trace_line()) {
                        warn!(self.logger, "failed to write latency trace"; "err" => %e);
                    }
                }
                None => {
                    debug!(self.logger, "response of unknown replica"; "replica" => r.replica_id);
                }
            }

            sum += r.rtt_ms;
            commit_sum += r.commit_latency_ms;
            end = r.received_at;
        }

        let mut summary = TickSummary {
            end_ns: unix_nanos(end),
            avg_rtt_ms: 0.0,
            throughput: 0.0,
            count,
            outstanding: self.outstanding(),
            avg_commit_ms: 0.0,
        };

        if count > 0 {
            summary.avg_rtt_ms = sum / count as f64;
            summary.avg_commit_ms = commit_sum / count as f64;

            let secs = end
                .duration_since(self.last_end)
                .map(|d| d.as_secs_f64())
                .unwrap_or(0.0);
            if secs > 0.0 {
                summary.throughput = count as f64 / secs;
            }
        }

        self.last_end = end;

        if !record {
            debug!(self.logger, "tick out of window";
                "elapsed" => elapsed.as_secs(), "drained" => count);
            return None;
        }

        let res = writeln!(self.sinks.summary(), "{}", summary.line()).and_then(|_| self.sinks.flush());
        if let Err(e) = res {
            warn!(self.logger, "failed to write summary"; "err" => %e);
        }

        debug!(self.logger, "tick";
            "count" => summary.count,
            "avg_ms" => summary.avg_rtt_ms,
            "outstanding" => summary.outstanding);

        Some(summary)
    }

    /// run reports every `tick` of the conf, until `max_ticks` ticks are done or `cancel` is
    /// cancelled. It returns the number of ticks.
    pub async fn run(mut self, max_ticks: Option<u64>, cancel: CancellationToken) -> u64 {
        let period = self.conf.tick;

        self.started = Instant::now();
        self.last_end = SystemTime::now();

        let mut ticker = interval_at(self.started + period, period);
        let mut ticks = 0;

        loop {
            if let Some(max) = max_ticks {
                if ticks >= max {
                    break;
                }
            }

            tokio::select! {
                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }

            let elapsed = self.started.elapsed();
            self.tick(SystemTime::now(), elapsed);
            ticks += 1;
        }

        if let Err(e) = self.sinks.flush() {
            warn!(self.logger, "failed to flush stats output"; "err" => %e);
        }
        info!(self.logger, "stats stopped"; "ticks" => ticks);
        ticks
    }
}
