mod quotes;
mod section_csv;
mod statement;

pub type Error = String;

// Exports
pub use self::quotes::*;
pub use self::section_csv::*;
pub use self::statement::*;
