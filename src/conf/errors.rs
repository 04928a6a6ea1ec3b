quick_error! {
    #[derive(Debug)]
    pub enum ConfError {
        IOError(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
        }

        BadYaml(e: serde_yaml::Error) {
            from(e: serde_yaml::Error) -> (e)
        }

        BadProtocol(name: String) {
            display("unknown replication protocol:{}", name)
        }

        BadConflicts(pct: i32) {
            display("conflicts percentage must be between 0 and 100 or negative for zipfian, but:{}", pct)
        }

        BadFraction(field: &'static str, v: f64) {
            display("{} must be in [0, 1], but:{}", field, v)
        }

        BadZipf(msg: String) {
            display("invalid zipfian parameters: {}", msg)
        }

        OutOfRange(field: &'static str, v: i64) {
            display("{} is out of range:{}", field, v)
        }

        NoReplica {
            display("no replica configured")
        }

        BadArg(name: String, value: String) {
            display("invalid value of --{}: {}", name, value)
        }

        LeaderOutOfRange(leader: usize, n: usize) {
            display("leader {} is out of range, {} replicas", leader, n)
        }
    }
}

impl PartialEq<ConfError> for ConfError {
    fn eq(&self, other: &ConfError) -> bool {
        match (self, other) {
            (Self::IOError(a), Self::IOError(b)) => a.kind() == b.kind(),
            (Self::BadYaml(_), Self::BadYaml(_)) => true,
            (Self::BadProtocol(a), Self::BadProtocol(b)) => a == b,
            (Self::BadConflicts(a), Self::BadConflicts(b)) => a == b,
            (Self::BadFraction(a, x), Self::BadFraction(b, y)) => a == b && x == y,
            (Self::BadZipf(a), Self::BadZipf(b)) => a == b,
            (Self::OutOfRange(a, x), Self::OutOfRange(b, y)) => a == b && x == y,
            (Self::NoReplica, Self::NoReplica) => true,
            (Self::BadArg(a, x), Self::BadArg(b, y)) => a == b && x == y,
            (Self::LeaderOutOfRange(a, x), Self::LeaderOutOfRange(b, y)) => a == b && x == y,
            _ => false,
        }
    }
}
