pub mod outfmt;

mod approot;

pub use self::approot::*;
