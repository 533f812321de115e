//! Period resolver — decides which reporting date a record belongs to.
//!
//! The site stamps its statistics with "As at <day> <month> <year>". When
//! that stamp is present anywhere in the fetched text it wins; otherwise the
//! period falls back to the last day of the month before the processing
//! date, which keeps reruns within one month idempotent. The resolver never
//! fails, and the chosen rule travels with the record as `PeriodSource`.

use std::sync::LazyLock;

use chrono::{Datelike, NaiveDate};
use regex::Regex;

use medianwatch_common::{PeriodSource, ReportPeriod, SuburbPage};

static AS_AT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"As at (\d{1,2} [A-Za-z]+ \d{4})").unwrap());

/// Resolve the reporting period for a fetched page. `today` is the
/// processing date, passed in so the fallback stays deterministic.
pub fn resolve(page: &SuburbPage, today: NaiveDate) -> (ReportPeriod, PeriodSource) {
    for text in page.texts() {
        if let Some(captures) = AS_AT.captures(text) {
            if let Ok(date) = NaiveDate::parse_from_str(&captures[1], "%d %B %Y") {
                return (ReportPeriod::from_date(date), PeriodSource::PageDate);
            }
        }
    }
    (fallback_period(today), PeriodSource::Fallback)
}

/// Last calendar day of the month preceding `today`. In January this is
/// December 31 of the previous year.
pub fn fallback_period(today: NaiveDate) -> ReportPeriod {
    // Day 1 exists in every month; its predecessor only runs out of dates
    // at the calendar's lower bound.
    let first_of_month = today.with_day(1).unwrap();
    ReportPeriod::from_date(first_of_month.pred_opt().unwrap())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn page(text: &str) -> SuburbPage {
        SuburbPage {
            full_text: text.to_string(),
            ..Default::default()
        }
    }

    #[test]
    fn explicit_page_date_wins() {
        let (period, source) = resolve(
            &page("Median values shown. As at 30 April 2025. Source: valuations."),
            date(2025, 6, 10),
        );
        assert_eq!(period, ReportPeriod::from_date(date(2025, 4, 30)));
        assert_eq!(source, PeriodSource::PageDate);
    }

    #[test]
    fn single_digit_day_parses() {
        let (period, source) = resolve(&page("As at 5 March 2025"), date(2025, 6, 10));
        assert_eq!(period, ReportPeriod::from_date(date(2025, 3, 5)));
        assert_eq!(source, PeriodSource::PageDate);
    }

    #[test]
    fn fallback_is_previous_month_end() {
        assert_eq!(
            fallback_period(date(2025, 6, 10)),
            ReportPeriod::from_date(date(2025, 5, 31))
        );
    }

    #[test]
    fn fallback_in_january_crosses_the_year() {
        assert_eq!(
            fallback_period(date(2025, 1, 15)),
            ReportPeriod::from_date(date(2024, 12, 31))
        );
    }

    #[test]
    fn missing_date_uses_fallback() {
        let (period, source) = resolve(&page("No stamp on this page."), date(2025, 1, 15));
        assert_eq!(period, ReportPeriod::from_date(date(2024, 12, 31)));
        assert_eq!(source, PeriodSource::Fallback);
    }

    #[test]
    fn unparseable_month_name_falls_back() {
        let (_, source) = resolve(&page("As at 12 Aprilish 2025"), date(2025, 6, 10));
        assert_eq!(source, PeriodSource::Fallback);
    }
}
