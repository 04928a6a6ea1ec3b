mod outstanding;

pub use self::outstanding::*;
