use rust_decimal::Decimal;

use crate::fx::RateResolver;
use crate::ledger::{Currency, Security};
use crate::log::WriteHandle;
use crate::util::date::today_local;
use crate::util::decimal::is_negative;
use crate::write_errln;

// Today's market price for a security, used only by the advisor.
pub trait PriceQuoter {
    fn current_price(&mut self, security: &str) -> Result<Decimal, String>;
}

// "You could sell N units of this security today to realize this loss."
#[derive(PartialEq, Eq, Clone, Debug)]
pub struct LossHarvestSuggestion {
    pub security: Security,
    pub sellable_quantity: Decimal,
    // Negative: the cumulative unrealized loss in the base currency.
    pub unrealized_loss_base: Decimal,
}

// Scans each security's open lots in FIFO order, accumulating the
// per-lot unrealized result, and stops at the first lot that is not at
// a loss: selling any deeper would start realizing gains. Purely
// advisory; the queues are never touched.
//
// Failures (no quote, no rate) only skip the affected security, since
// the whole report does not depend on this output.
pub fn find_harvestable_losses(
    positions: &crate::ledger::bookkeeping::OpenPositions,
    resolver: &RateResolver,
    quoter: &mut dyn PriceQuoter,
    err_stream: &mut WriteHandle,
) -> Vec<LossHarvestSuggestion> {
    let today = today_local();
    let mut suggestions: Vec<LossHarvestSuggestion> = Vec::new();

    for security in positions.securities_with_open_lots() {
        // Cash balances show up as pseudo-securities named after the
        // currency; they have no market price.
        if resolver
            .tracked_currencies()
            .iter()
            .any(|c| c.as_str() == security)
        {
            continue;
        }

        let price_today = match quoter.current_price(&security) {
            Ok(p) => p,
            Err(e) => {
                write_errln!(
                    err_stream,
                    "Could not fetch a market price for {}: {}",
                    security, e
                );
                continue;
            }
        };

        match scan_queue(
            positions.queue(&security).unwrap(),
            &security,
            price_today,
            resolver,
            today,
        ) {
            Ok(Some(s)) => suggestions.push(s),
            Ok(None) => (),
            Err(e) => {
                write_errln!(
                    err_stream,
                    "Could not evaluate unrealized losses for {}: {}",
                    security, e
                );
            }
        }
    }

    suggestions
}

fn scan_queue(
    queue: &crate::ledger::bookkeeping::OpenPositionQueue,
    security: &str,
    price_today: Decimal,
    resolver: &RateResolver,
    today: time::Date,
) -> Result<Option<LossHarvestSuggestion>, crate::fx::FxError> {
    let mut loss = Decimal::ZERO;
    let mut quantity = Decimal::ZERO;

    for lot in queue.iter() {
        let cur: &Currency = &lot.currency;
        let unit_result = -lot.price * resolver.rate(lot.date, cur)?
            + price_today * resolver.rate(today, cur)?;
        if !is_negative(&unit_result) {
            // The first non-loss lot ends the contiguous loss prefix.
            break;
        }
        quantity += *lot.quantity;
        loss += unit_result * *lot.quantity;
    }

    if is_negative(&loss) {
        Ok(Some(LossHarvestSuggestion {
            security: security.to_string(),
            sellable_quantity: quantity,
            unrealized_loss_base: loss,
        }))
    } else {
        Ok(None)
    }
}

// Ideally this would be marked as cfg(test), but integration tests also
// need a quoter that stays off the network.
pub mod pub_testlib {
    use std::collections::HashMap;

    use rust_decimal::Decimal;

    use crate::util::rc::RcRefCell;

    use super::PriceQuoter;

    pub struct MockPriceQuoter {
        pub prices: RcRefCell<HashMap<String, Decimal>>,
    }

    impl PriceQuoter for MockPriceQuoter {
        fn current_price(&mut self, security: &str) -> Result<Decimal, String> {
            match self.prices.borrow().get(security) {
                Some(p) => Ok(p.clone()),
                None => Err(format!("No price set for {}", security)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use rust_decimal::Decimal;
    use rust_decimal_macros::dec;

    use crate::fx::{DailyRate, RateResolver, RateSeries};
    use crate::ledger::bookkeeping::{LotMatcher, OpenPositions};
    use crate::ledger::{Currency, Execution};
    use crate::log::WriteHandle;
    use crate::util::date::pub_testlib::doy_date;
    use crate::util::date::set_todays_date_for_test;
    use crate::util::rc::RcRefCellT;

    use super::pub_testlib::MockPriceQuoter;
    use super::find_harvestable_losses;

    fn flat_resolver(rate: Decimal) -> RateResolver {
        let mut series = HashMap::new();
        series.insert(
            Currency::usd(),
            RateSeries::new(vec![DailyRate::new(doy_date(2015, 0), rate)]),
        );
        RateResolver::new(Currency::rub(), series)
    }

    fn buy(security: &str, doy: i64, price: Decimal, qty: Decimal, idx: u32) -> Execution {
        Execution {
            security: security.to_string(),
            date: doy_date(2021, doy),
            price,
            fee: dec!(-1),
            quantity: qty,
            currency: Currency::usd(),
            proceeds: -price * qty,
            read_index: idx,
        }
    }

    fn positions_of(execs: &[Execution]) -> LotMatcher {
        let mut matcher = LotMatcher::new();
        let mut errs = WriteHandle::empty_write_handle();
        matcher.match_year(execs, &mut errs);
        matcher
    }

    fn quoter_with(prices: Vec<(&str, Decimal)>) -> MockPriceQuoter {
        let map = RcRefCellT::new(
            prices
                .into_iter()
                .map(|(s, p)| (s.to_string(), p))
                .collect::<HashMap<String, Decimal>>(),
        );
        MockPriceQuoter { prices: map }
    }

    #[test]
    fn test_contiguous_loss_prefix() {
        set_todays_date_for_test(doy_date(2021, 300));

        // Lots at 10, 12, then 5; today's price is 8.
        // 10 and 12 are losses; 5 would be a gain and stops the scan.
        let execs = vec![
            buy("FOO", 0, dec!(10), dec!(3), 0),
            buy("FOO", 1, dec!(12), dec!(2), 1),
            buy("FOO", 2, dec!(5), dec!(4), 2),
        ];
        let matcher = positions_of(&execs);

        let resolver = flat_resolver(dec!(2));
        let mut quoter = quoter_with(vec![("FOO", dec!(8))]);
        let mut errs = WriteHandle::empty_write_handle();

        let suggestions = find_harvestable_losses(
            matcher.positions(),
            &resolver,
            &mut quoter,
            &mut errs,
        );
        assert_eq!(suggestions.len(), 1);
        let s = &suggestions[0];
        assert_eq!(s.security, "FOO");
        assert_eq!(s.sellable_quantity, dec!(5));
        // per unit: (-10 + 8) * 2 = -4 over 3 units, (-12 + 8) * 2 = -8
        // over 2 units: -12 - 16 = -28
        assert_eq!(s.unrealized_loss_base, dec!(-28));
    }

    #[test]
    fn test_no_suggestion_when_front_lot_gains() {
        set_todays_date_for_test(doy_date(2021, 300));

        let execs = vec![
            buy("FOO", 0, dec!(5), dec!(3), 0),
            // A later, deeper loss that FIFO order hides.
            buy("FOO", 1, dec!(12), dec!(2), 1),
        ];
        let matcher = positions_of(&execs);

        let resolver = flat_resolver(dec!(2));
        let mut quoter = quoter_with(vec![("FOO", dec!(8))]);
        let mut errs = WriteHandle::empty_write_handle();

        let suggestions = find_harvestable_losses(
            matcher.positions(),
            &resolver,
            &mut quoter,
            &mut errs,
        );
        assert_eq!(suggestions.len(), 0);
    }

    #[test]
    fn test_currency_pseudo_security_skipped() {
        set_todays_date_for_test(doy_date(2021, 300));

        let execs = vec![buy("USD", 0, dec!(1), dec!(100), 0)];
        let matcher = positions_of(&execs);

        let resolver = flat_resolver(dec!(2));
        // No price registered for USD; would error if not skipped.
        let mut quoter = quoter_with(vec![]);
        let (mut errs, err_buff) = WriteHandle::string_buff_write_handle();

        let suggestions = find_harvestable_losses(
            matcher.positions(),
            &resolver,
            &mut quoter,
            &mut errs,
        );
        assert_eq!(suggestions.len(), 0);
        assert_eq!(err_buff.borrow().as_str(), "");
    }

    #[test]
    fn test_quote_failure_skips_security() {
        set_todays_date_for_test(doy_date(2021, 300));

        let execs = vec![
            buy("FOO", 0, dec!(10), dec!(3), 0),
            buy("BAR", 0, dec!(10), dec!(3), 1),
        ];
        let matcher = positions_of(&execs);

        let resolver = flat_resolver(dec!(2));
        // Only BAR has a quote.
        let mut quoter = quoter_with(vec![("BAR", dec!(4))]);
        let (mut errs, err_buff) = WriteHandle::string_buff_write_handle();

        let suggestions = find_harvestable_losses(
            matcher.positions(),
            &resolver,
            &mut quoter,
            &mut errs,
        );
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].security, "BAR");
        assert!(err_buff.borrow().as_str().contains("FOO"));
    }

    #[test]
    fn test_queues_untouched() {
        set_todays_date_for_test(doy_date(2021, 300));

        let execs = vec![buy("FOO", 0, dec!(10), dec!(3), 0)];
        let matcher = positions_of(&execs);
        let positions: &OpenPositions = matcher.positions();

        let before = positions.queue("FOO").unwrap().net_quantity();
        let resolver = flat_resolver(dec!(2));
        let mut quoter = quoter_with(vec![("FOO", dec!(8))]);
        let mut errs = WriteHandle::empty_write_handle();
        let _ = find_harvestable_losses(positions, &resolver, &mut quoter, &mut errs);
        assert_eq!(positions.queue("FOO").unwrap().net_quantity(), before);
    }
}
