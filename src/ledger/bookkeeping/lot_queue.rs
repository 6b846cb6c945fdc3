use std::collections::{HashMap, VecDeque};

use rust_decimal::Decimal;
use time::Date;

use crate::ledger::{Currency, Security};
use crate::util::decimal::PosDecimal;

// An open, not-yet-sold buy position. Created when a buy execution is
// ingested, shrunk (via split) when partially consumed by a later sell,
// destroyed when fully consumed. Quantity is strictly positive by type.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct Lot {
    pub date: Date,
    pub price: Decimal,
    pub fee: Decimal,
    pub quantity: PosDecimal,
    pub currency: Currency,
    pub proceeds: Decimal,
}

impl Lot {
    // The remainder after consuming `consumed` units: same date, price,
    // fee and currency; only the quantity shrinks. Proceeds are kept
    // consistent with price * quantity. None if nothing remains.
    pub fn split_off(&self, consumed: PosDecimal) -> Option<Lot> {
        let remaining = self.quantity.checked_sub(consumed)?;
        Some(Lot {
            date: self.date,
            price: self.price,
            fee: self.fee,
            quantity: remaining,
            currency: self.currency.clone(),
            proceeds: -self.price * *remaining,
        })
    }
}

// Per-security FIFO queue of open lots, oldest buy first.
// Order is never reshuffled; the only front insertion is the remainder
// of a partially consumed head lot, which preserves its priority.
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct OpenPositionQueue {
    lots: VecDeque<Lot>,
}

impl OpenPositionQueue {
    pub fn new() -> OpenPositionQueue {
        OpenPositionQueue {
            lots: VecDeque::new(),
        }
    }

    pub fn push_opened(&mut self, lot: Lot) {
        self.lots.push_back(lot);
    }

    pub fn pop_oldest(&mut self) -> Option<Lot> {
        self.lots.pop_front()
    }

    pub fn push_front_remainder(&mut self, lot: Lot) {
        self.lots.push_front(lot);
    }

    pub fn is_empty(&self) -> bool {
        self.lots.is_empty()
    }

    pub fn len(&self) -> usize {
        self.lots.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter()
    }

    // Invariant: equals the net held quantity of the security.
    pub fn net_quantity(&self) -> Decimal {
        self.lots.iter().map(|l| *l.quantity).sum()
    }
}

// All open-position queues, keyed by security. Owned and mutated
// exclusively by the lot matcher; everything else reads.
pub struct OpenPositions {
    queues: HashMap<Security, OpenPositionQueue>,
}

impl OpenPositions {
    pub fn new() -> OpenPositions {
        OpenPositions {
            queues: HashMap::new(),
        }
    }

    pub fn queue(&self, security: &str) -> Option<&OpenPositionQueue> {
        self.queues.get(security)
    }

    pub fn queue_mut(&mut self, security: &Security) -> &mut OpenPositionQueue {
        self.queues
            .entry(security.clone())
            .or_insert_with(OpenPositionQueue::new)
    }

    // Securities that still hold lots, in stable (sorted) order.
    pub fn securities_with_open_lots(&self) -> Vec<Security> {
        let mut secs: Vec<Security> = self
            .queues
            .iter()
            .filter(|(_, q)| !q.is_empty())
            .map(|(s, _)| s.clone())
            .collect();
        secs.sort();
        secs
    }
}
