use std::fmt::Display;

use rust_decimal::Decimal;
use time::Date;

use crate::util::decimal::{is_negative, is_positive};

use super::currency::Currency;
use super::security::Security;

#[derive(PartialEq, Eq, Clone, Copy, Debug)]
pub enum TradeAction {
    Buy,
    Sell,
}

impl TradeAction {
    fn pretty_str(&self) -> &str {
        match self {
            TradeAction::Buy => "Buy",
            TradeAction::Sell => "Sell",
        }
    }
}

impl Display for TradeAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.pretty_str())
    }
}

// One trade fill, immutable once ingested. Quantity is signed:
// positive is a buy, negative is a sell.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Execution {
    pub security: Security,
    pub date: Date,
    pub price: Decimal,
    pub fee: Decimal,
    pub quantity: Decimal,
    pub currency: Currency,
    pub proceeds: Decimal,

    // The absolute order in which the execution was read from file.
    // Used as a tiebreak in sorting.
    pub read_index: u32,
}

impl Execution {
    pub fn action(&self) -> Option<TradeAction> {
        if is_positive(&self.quantity) {
            Some(TradeAction::Buy)
        } else if is_negative(&self.quantity) {
            Some(TradeAction::Sell)
        } else {
            None
        }
    }
}

impl PartialOrd for Execution {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Execution {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        let date_cmp = self.date.cmp(&other.date);
        match date_cmp {
            std::cmp::Ordering::Less | std::cmp::Ordering::Greater => date_cmp,
            std::cmp::Ordering::Equal => self.read_index.cmp(&other.read_index),
        }
    }
}
