use std::str::FromStr;

use json::JsonValue;
use rust_decimal::Decimal;

use crate::ledger::bookkeeping::PriceQuoter;
use crate::verboseln;

fn get_quote_json_url(symbol: &str) -> String {
    format!(
        "https://query1.finance.yahoo.com/v8/finance/chart/{}?interval=1d&range=1d",
        symbol
    )
}

fn json_value_to_decimal(jv: &JsonValue) -> Result<Decimal, String> {
    match jv {
        JsonValue::String(v) => Decimal::from_str(v).map_err(|e| e.to_string()),
        JsonValue::Short(v) => {
            Decimal::from_str(&v.to_string()).map_err(|e| e.to_string())
        }
        JsonValue::Number(v) => {
            Decimal::from_str(&v.to_string()).map_err(|e| e.to_string())
        }
        v => Err(format!("Value (not a number): {}", v)),
    }
}

// Yahoo chart response schema (only the part we care about):
//
// {
//   "chart": {
//     "result": [
//       { "meta": { "regularMarketPrice": <number>, ... }, ... }
//     ],
//     "error": null
//   }
// }
fn parse_quote_json(json_str: &str) -> Result<Decimal, String> {
    let fmt_err =
        |s: &str| -> Result<Decimal, String> { Err(format!("Error parsing quote: {}", s)) };

    let json_obj = match json::parse(json_str) {
        Ok(v) => v,
        Err(e) => return fmt_err(&e.to_string()),
    };

    let price = &json_obj["chart"]["result"][0]["meta"]["regularMarketPrice"];
    if price.is_null() {
        return fmt_err("Did not find chart.result[0].meta.regularMarketPrice");
    }
    let price = json_value_to_decimal(price)?;
    if !crate::util::decimal::is_positive(&price) {
        return fmt_err(&format!("Price is not positive: {}", price));
    }
    Ok(price)
}

pub struct YahooPriceQuoter {}

impl YahooPriceQuoter {
    pub fn new() -> YahooPriceQuoter {
        YahooPriceQuoter {}
    }
}

impl PriceQuoter for YahooPriceQuoter {
    fn current_price(&mut self, security: &str) -> Result<Decimal, String> {
        let url = get_quote_json_url(security);
        verboseln!("Fetching {}", url);
        let out = reqwest::blocking::get(url).map_err(|e| e.to_string())?;
        let out = out
            .error_for_status()
            .map_err(|e| format!("status: {:?}", e.status()))?;
        let text = out.text().map_err(|e| e.to_string())?;
        parse_quote_json(&text)
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use crate::testlib::assert_re;

    use super::{get_quote_json_url, parse_quote_json};

    #[test]
    fn test_url() {
        assert_eq!(
            get_quote_json_url("VT"),
            "https://query1.finance.yahoo.com/v8/finance/chart/VT\
             ?interval=1d&range=1d"
        );
    }

    #[test]
    fn test_parse_ok() {
        let price = parse_quote_json(
            "{\"chart\": {\"result\": [
                {\"meta\": {\"regularMarketPrice\": 101.37}}
             ], \"error\": null}}",
        );
        assert_eq!(price.unwrap(), dec!(101.37));
    }

    #[test]
    fn test_parse_err() {
        // Invalid json
        let res = parse_quote_json("{");
        assert_re("^Error parsing quote:", res.err().unwrap().as_str());

        // Missing price
        let res = parse_quote_json(
            "{\"chart\": {\"result\": [{\"meta\": {}}], \"error\": null}}",
        );
        assert_re("regularMarketPrice", res.err().unwrap().as_str());

        // Non-positive price
        let res = parse_quote_json(
            "{\"chart\": {\"result\": [
                {\"meta\": {\"regularMarketPrice\": 0}}
             ], \"error\": null}}",
        );
        assert_re("not positive", res.err().unwrap().as_str());
    }
}
