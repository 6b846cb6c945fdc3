use std::cell::RefCell;

use chrono::Datelike;
pub use time::Date;
use time::{macros::format_description, Month};

pub type StaticDateFormat<'a> =
    &'static [time::format_description::BorrowedFormatItem<'a>];

pub const STANDARD_DATE_FORMAT: StaticDateFormat =
    format_description!("[year]-[month]-[day]");

// CBR publishes rate dates as eg. 24.01.2023
pub const DOTTED_DATE_FORMAT: StaticDateFormat =
    format_description!("[day].[month].[year]");

pub fn parse_standard_date(date_str: &str) -> Result<Date, time::error::Parse> {
    Date::parse(date_str, STANDARD_DATE_FORMAT)
}

pub fn parse_dotted_date(date_str: &str) -> Result<Date, time::error::Parse> {
    Date::parse(date_str, DOTTED_DATE_FORMAT)
}

// Statement date cells are either "2023-01-24" or "2023-01-24, 09:30:00"
// (the Trades section carries an execution time). The time of day never
// matters for tax purposes, so it is simply cut off.
pub fn parse_statement_date(date_str: &str) -> Result<Date, time::error::Parse> {
    let date_part = match date_str.split_once(',') {
        Some((d, _)) => d,
        None => date_str,
    };
    parse_standard_date(date_part.trim())
}

fn date_naive_to_date(dn: &chrono::NaiveDate) -> Date {
    Date::from_calendar_date(
        dn.year(),
        Month::December.nth_next(dn.month() as u8),
        dn.day() as u8,
    )
    .unwrap()
}

thread_local! {
    static TODAYS_DATE_FOR_TEST_TL: RefCell<Date> = RefCell::new(Date::MIN);
}

pub fn set_todays_date_for_test(d: Date) {
    TODAYS_DATE_FOR_TEST_TL.with_borrow_mut(|d_| *d_ = d);
}

pub fn today_local() -> Date {
    let test_date: Date = TODAYS_DATE_FOR_TEST_TL.with_borrow(|d| d.clone());
    if test_date != Date::MIN {
        return test_date.clone();
    }
    let now = chrono::offset::Local::now();
    date_naive_to_date(&now.date_naive())
}

// Used by both unit and integration tests
pub mod pub_testlib {
    use time::{Date, Duration, Month};

    pub fn doy_date(year: u32, day: i64) -> Date {
        Date::from_calendar_date(year as i32, Month::January, 1)
            .unwrap()
            .saturating_add(Duration::days(day))
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use time::{Date, Month};

    use super::{
        date_naive_to_date, parse_dotted_date, parse_standard_date,
        parse_statement_date,
    };

    #[test]
    fn test_parse() {
        let d = parse_standard_date("2023-01-21");
        assert_eq!(
            d.unwrap(),
            Date::from_calendar_date(2023, Month::January, 21).unwrap()
        );

        let d = parse_standard_date("2023-01-41");
        assert!(d.is_err());
    }

    #[test]
    fn test_parse_dotted() {
        let d = parse_dotted_date("21.01.2023");
        assert_eq!(
            d.unwrap(),
            Date::from_calendar_date(2023, Month::January, 21).unwrap()
        );

        let d = parse_dotted_date("2023-01-21");
        assert!(d.is_err());
    }

    #[test]
    fn test_parse_statement_date() {
        let d = parse_statement_date("2020-06-11, 14:05:43");
        assert_eq!(
            d.unwrap(),
            Date::from_calendar_date(2020, Month::June, 11).unwrap()
        );

        let d = parse_statement_date("2020-06-11");
        assert_eq!(
            d.unwrap(),
            Date::from_calendar_date(2020, Month::June, 11).unwrap()
        );
    }

    #[test]
    fn test_date_naive_to_date() {
        let naive_date = NaiveDate::from_ymd_opt(2024, 4, 13).unwrap();
        let date = date_naive_to_date(&naive_date);
        assert_eq!(
            date,
            Date::from_calendar_date(2024, Month::April, 13).unwrap()
        );
    }
}
