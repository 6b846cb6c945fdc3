mod advisor;
mod lot_queue;
mod matcher;

pub use self::advisor::*;
pub use self::lot_queue::*;
pub use self::matcher::*;
