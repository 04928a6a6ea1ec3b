use std::collections::HashMap;
use std::net::TcpStream;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use slog::Logger;

use kvstate::{Command, Key, Operation, State, Value, NIL};

use crate::conf::ClientOptions;
use crate::discovery::Cluster;
use crate::wire::{Propose, ProposeReply};

use super::errors::ClientError;

/// ConsistencyClient is a blocking client that hides the replication protocol.
/// Every call returns false if the operation failed.
pub trait ConsistencyClient: Send {
    fn read(&mut self, key: Key) -> (bool, Value);

    fn write(&mut self, key: Key, value: Value) -> bool;

    /// rmw increments the value of `key` and returns the new value.
    fn rmw(&mut self, key: Key) -> (bool, Value);
}

/// execute dispatches a generated command to the matching client call.
pub fn execute(client: &mut dyn ConsistencyClient, cmd: &Command) -> bool {
    match cmd.op {
        Operation::Get => client.read(cmd.key).0,
        Operation::Rmw => client.rmw(cmd.key).0,
        _ => client.write(cmd.key, cmd.value),
    }
}

/// Backend is what consistency clients are built against.
#[derive(Clone)]
pub enum Backend {
    Replicas(Cluster),
    /// An in-process state machine. Every call sleeps `delay` first.
    State { state: Arc<State>, delay: Duration },
}

/// create_client builds the client of one simulated client.
pub fn create_client(
    opts: &ClientOptions,
    backend: &Backend,
    logger: Logger,
) -> Result<Box<dyn ConsistencyClient>, ClientError> {
    match backend {
        Backend::Replicas(cluster) => {
            let c = ProposeClient::new(opts.clone(), cluster.clone(), logger)?;
            Ok(Box::new(c))
        }
        Backend::State { state, delay } => Ok(Box::new(StateClient::new(state.clone(), *delay))),
    }
}

/// ProposeClient sends one command at a time as a propose frame and waits for its reply.
///
/// Reads go to the local replica, or to the leader in sequential mode unless `regular` is set.
/// Writes go to the local replica if `proxy_writes`, otherwise to the leader.
/// The local replica is the forced one, or the client id modulo the cluster size.
pub struct ProposeClient {
    opts: ClientOptions,
    cluster: Cluster,
    local: usize,

    conns: HashMap<usize, TcpStream>,
    next_id: i32,

    logger: Logger,
}

impl ProposeClient {
    pub fn new(
        opts: ClientOptions,
        cluster: Cluster,
        logger: Logger,
    ) -> Result<ProposeClient, ClientError> {
        let n = cluster.len();
        if cluster.leader >= n {
            return Err(ClientError::NoReplica(cluster.leader as i32, n));
        }

        let local = if opts.forced_replica >= 0 {
            let i = opts.forced_replica as usize;
            if i >= n {
                return Err(ClientError::NoReplica(opts.forced_replica, n));
            }
            i
        } else {
            (opts.client_id.rem_euclid(n as i32)) as usize
        };

        debug!(logger, "propose client created";
            "client_id" => opts.client_id,
            "local" => local,
            "leader" => cluster.leader,
            "regular" => opts.regular,
            "sequential" => opts.sequential,
            "proxy_writes" => opts.proxy_writes,
            "thrifty" => opts.thrifty,
            "default_replica_order" => opts.default_replica_order,
            "epaxos_mode" => opts.epaxos_mode,
            "blind_writes" => opts.blind_writes,
            "op_timeout_ms" => opts.op_timeout.as_millis() as u64,
            "master" => format!("{}:{}", opts.master_addr, opts.master_port),
            "stats_file" => &opts.stats_file);

        Ok(ProposeClient {
            opts,
            cluster,
            local,
            conns: HashMap::new(),
            next_id: 0,
            logger,
        })
    }

    pub fn read_target(&self) -> usize {
        if !self.opts.regular && self.opts.sequential {
            self.cluster.leader
        } else {
            self.local
        }
    }

    pub fn write_target(&self) -> usize {
        if self.opts.proxy_writes {
            self.local
        } else {
            self.cluster.leader
        }
    }

    fn propose(&mut self, target: usize, cmd: Command) -> Result<ProposeReply, ClientError> {
        let id = self.next_id;
        self.next_id = self.next_id.wrapping_add(1);

        let res = self.round_trip(target, Propose::new(id, cmd));
        if res.is_err() {
            // the stream may be left with half a frame.
            self.conns.remove(&target);
        }

        let reply = res?;
        if reply.command_id != id {
            self.conns.remove(&target);
            return Err(ClientError::UnexpectedReply(id, reply.command_id));
        }
        if !reply.is_ok() {
            return Err(ClientError::Refused(id));
        }
        Ok(reply)
    }

    fn round_trip(&mut self, target: usize, p: Propose) -> Result<ProposeReply, ClientError> {
        let n = self.cluster.len();

        if !self.conns.contains_key(&target) {
            let addr = self
                .cluster
                .replicas
                .get(target)
                .ok_or(ClientError::NoReplica(target as i32, n))?;
            let s = TcpStream::connect(addr.as_str())?;
            s.set_nodelay(true)?;

            let timeout = Some(self.opts.op_timeout).filter(|t| *t > Duration::from_secs(0));
            s.set_read_timeout(timeout)?;
            s.set_write_timeout(timeout)?;
            debug!(self.logger, "connected"; "replica" => target, "addr" => addr.as_str());
            self.conns.insert(target, s);
        }

        let s = self
            .conns
            .get_mut(&target)
            .ok_or(ClientError::NoReplica(target as i32, n))?;

        p.write_to(s)?;
        let reply = ProposeReply::read_from(s)?;
        Ok(reply)
    }

    fn run(&mut self, target: usize, cmd: Command) -> (bool, Value) {
        match self.propose(target, cmd) {
            Ok(reply) => (true, reply.value),
            Err(e) => {
                warn!(self.logger, "propose failed"; "cmd" => %cmd, "replica" => target, "err" => %e);
                (false, NIL)
            }
        }
    }
}

impl ConsistencyClient for ProposeClient {
    fn read(&mut self, key: Key) -> (bool, Value) {
        let target = self.read_target();
        self.run(target, Command::of(Operation::Get, key, NIL))
    }

    fn write(&mut self, key: Key, value: Value) -> bool {
        let target = self.write_target();
        self.run(target, Command::of(Operation::Put, key, value)).0
    }

    fn rmw(&mut self, key: Key) -> (bool, Value) {
        let target = self.write_target();
        self.run(target, Command::of(Operation::Rmw, key, NIL))
    }
}

/// StateClient executes commands on an in-process state machine.
/// It measures the harness itself, without any network or replication cost.
pub struct StateClient {
    state: Arc<State>,
    delay: Duration,
}

impl StateClient {
    pub fn new(state: Arc<State>, delay: Duration) -> StateClient {
        StateClient { state, delay }
    }

    fn exec(&self, cmd: Command) -> Value {
        if self.delay > Duration::from_secs(0) {
            thread::sleep(self.delay);
        }
        self.state.execute(&cmd)
    }
}

impl ConsistencyClient for StateClient {
    fn read(&mut self, key: Key) -> (bool, Value) {
        (true, self.exec(Command::of(Operation::Get, key, NIL)))
    }

    fn write(&mut self, key: Key, value: Value) -> bool {
        self.exec(Command::of(Operation::Put, key, value));
        true
    }

    fn rmw(&mut self, key: Key) -> (bool, Value) {
        (true, self.exec(Command::of(Operation::Rmw, key, NIL)))
    }
}
