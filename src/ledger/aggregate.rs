mod cashflow;
mod dividends;
mod fees;
mod interest;

pub use self::cashflow::*;
pub use self::dividends::*;
pub use self::fees::*;
pub use self::interest::*;
