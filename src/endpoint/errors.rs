use crate::wire::WireError;

quick_error! {
    #[derive(Debug)]
    pub enum ClientError {
        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("client io error: {}", e)
        }

        Wire(e: WireError) {
            from(e: WireError) -> (e)
            display("client wire error: {}", e)
        }

        Refused(command_id: i32) {
            display("replica refused command {}", command_id)
        }

        UnexpectedReply(want: i32, got: i32) {
            display("expect reply of command {} but got {}", want, got)
        }

        NoReplica(index: i32, n: usize) {
            display("replica {} is out of range, {} replicas", index, n)
        }
    }
}

quick_error! {
    #[derive(Debug)]
    pub enum EndpointError {
        Connect(addr: String, e: std::io::Error) {
            display("can not connect to replica {}: {}", addr, e)
        }

        Client(e: ClientError) {
            from(e: ClientError) -> (e)
            display("{}", e)
        }
    }
}
