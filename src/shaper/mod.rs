mod shaper;

pub use self::shaper::*;
