pub mod aggregate;
pub mod bookkeeping;
pub mod io;
pub mod model;
pub mod render;

use thiserror::Error;

pub use self::model::currency::*;
pub use self::model::execution::*;
pub use self::model::income::*;
pub use self::model::security::*;
pub use self::model::year_ledger::*;

// Conditions a caller needs to tell apart: exchange-rate problems are
// fatal to the computation that needed the rate, while a rejected short
// sale only invalidates one security's matching for one year.
#[derive(Error, PartialEq, Eq, Clone, Debug)]
pub enum LedgerError {
    #[error(transparent)]
    Fx(#[from] crate::fx::FxError),
    #[error("{security} was sold in a greater quantity than was bought. \
             Short selling is not supported")]
    ShortSaleRejected { security: String },
}
