use kvstate::CommandError;

quick_error! {
    #[derive(Debug)]
    pub enum WireError {
        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("wire io error: {}", e)
        }

        BadOpcode(code: u8) {
            display("unexpected opcode:{}", code)
        }

        Command(e: CommandError) {
            from(e: CommandError) -> (e)
            display("bad command: {}", e)
        }
    }
}
