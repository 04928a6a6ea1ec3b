use std::path::PathBuf;

quick_error! {
    #[derive(Debug)]
    pub enum StatsError {
        Create(path: PathBuf, e: std::io::Error) {
            display("can not create output file {}: {}", path.display(), e)
        }

        Io(e: std::io::Error) {
            from(e: std::io::Error) -> (e)
            display("stats io error: {}", e)
        }
    }
}
