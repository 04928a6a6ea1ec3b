quick_error! {
    #[derive(Debug, Clone, Eq, PartialEq)]
    pub enum DiscoveryError {
        Unavailable(msg: String) {
            display("discovery unavailable: {}", msg)
        }

        Exhausted(attempts: u32) {
            display("replicas not discovered after {} attempts", attempts)
        }

        BadLeader(leader: usize, n: usize) {
            display("leader {} is out of range, {} replicas", leader, n)
        }
    }
}
