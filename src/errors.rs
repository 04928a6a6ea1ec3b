use crate::conf::ConfError;
use crate::discovery::DiscoveryError;
use crate::endpoint::{ClientError, EndpointError};
use crate::stats::StatsError;

quick_error! {
    /// BenchError is any error that stops a run.
    #[derive(Debug)]
    pub enum BenchError {
        Conf(e: ConfError) {
            from(e: ConfError) -> (e)
            display("config: {}", e)
        }

        Discovery(e: DiscoveryError) {
            from(e: DiscoveryError) -> (e)
            display("discovery: {}", e)
        }

        Stats(e: StatsError) {
            from(e: StatsError) -> (e)
            display("stats: {}", e)
        }

        Client(e: ClientError) {
            from(e: ClientError) -> (e)
            display("client: {}", e)
        }

        Endpoint(e: EndpointError) {
            from(e: EndpointError) -> (e)
            display("endpoint: {}", e)
        }

        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("io: {}", e)
        }
    }
}
