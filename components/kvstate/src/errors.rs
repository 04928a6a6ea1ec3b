quick_error! {
    /// Errors occur when a command is built from untrusted input, e.g. a wire frame.
    #[derive(Debug, PartialEq, Eq)]
    pub enum CommandError {
        UnknownOp(tag: u8) {
            display("unknown operation tag:{}", tag)
        }
    }
}
