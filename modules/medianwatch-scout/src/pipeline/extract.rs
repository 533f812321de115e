//! Field extraction engine — turns fetched page text into a draft record.
//!
//! Each field has an ordered list of candidate regex templates mirroring the
//! source site's published phrasing: a strict primary pattern, then looser
//! fallbacks. Templates are tried against each text blob in `SuburbPage`
//! order (stats, value, rent, full page); the first capture wins for that
//! field. Different fields may resolve from different blobs. Adding a new
//! fallback means extending a pattern list, not adding a branch.

use std::sync::LazyLock;

use regex::Regex;

use medianwatch_common::{
    MarketRecord, MedianWatchError, PeriodSource, RentalYield, ReportPeriod, SuburbPage,
};

// --- Change templates ---
// The percentage magnitude parses non-negative unless the source itself
// encodes a sign; the direction keyword carries the sign otherwise.

static HOUSE_CHANGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Houses in [^%]+ ([-\d.]+)% (?:increase|decrease)").unwrap(),
        Regex::new(r"Houses[^%]+ ([-\d.]+)% (?:increase|decrease)").unwrap(),
    ]
});

static UNIT_CHANGE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Units have seen a ([-\d.]+)% (?:increase|decrease)").unwrap(),
        Regex::new(r"Units[^%]+ ([-\d.]+)% (?:increase|decrease)").unwrap(),
    ]
});

// Direction keyword per property type. `[^,]+?` keeps the search inside the
// clause about that type: the first keyword after "Houses"/"Units" belongs
// to it, not to the other type's clause.
static HOUSE_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Houses[^,]+?(increase|decrease)").unwrap());
static UNIT_DIRECTION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Units[^,]+?(increase|decrease)").unwrap());

// --- Value templates ---

static HOUSE_VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Houses in [^\$]+\$([\d,]+)").unwrap(),
        Regex::new(r"Houses[^\$]+\$([\d,]+)").unwrap(),
    ]
});

static UNIT_VALUE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![
        Regex::new(r"Units is \$([\d,]+)").unwrap(),
        Regex::new(r"Units[^\$]+\$([\d,]+)").unwrap(),
    ]
});

// --- Rent templates (optional fields) ---

static HOUSE_RENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(r"Houses have a median rent of \$([\d,]+)").unwrap()]
});

static UNIT_RENT_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    vec![Regex::new(r"Units have a median rent of \$([\d,]+)").unwrap()]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Direction {
    Increase,
    Decrease,
}

/// Numeric fields extracted for one suburb, before the period is resolved.
#[derive(Debug, Clone, PartialEq)]
pub struct DraftStats {
    pub house_value: f64,
    pub unit_value: f64,
    pub house_change: f64,
    pub unit_change: f64,
    pub house_rent: Option<f64>,
    pub unit_rent: Option<f64>,
}

impl DraftStats {
    /// Finish the record once the period is known. Yields derive here so a
    /// record never exists without them.
    pub fn into_record(
        self,
        suburb: String,
        period: ReportPeriod,
        period_source: PeriodSource,
    ) -> MarketRecord {
        MarketRecord {
            house_yield: RentalYield::derive(self.house_rent, self.house_value),
            unit_yield: RentalYield::derive(self.unit_rent, self.unit_value),
            suburb,
            period,
            period_source,
            house_value: self.house_value,
            unit_value: self.unit_value,
            house_change: self.house_change,
            unit_change: self.unit_change,
            house_rent: self.house_rent,
            unit_rent: self.unit_rent,
        }
    }
}

/// Extract the numeric fields for one suburb, or fail naming the first
/// required field no strategy could locate. Rent is optional and never
/// fails extraction.
pub fn extract_stats(page: &SuburbPage) -> Result<DraftStats, MedianWatchError> {
    let house_value = currency_field(&HOUSE_VALUE_PATTERNS, page)
        .ok_or(MedianWatchError::MissingField("house value"))?;
    let unit_value = currency_field(&UNIT_VALUE_PATTERNS, page)
        .ok_or(MedianWatchError::MissingField("unit value"))?;
    let house_change = change_field(&HOUSE_CHANGE_PATTERNS, &HOUSE_DIRECTION, page)
        .ok_or(MedianWatchError::MissingField("house change"))?;
    let unit_change = change_field(&UNIT_CHANGE_PATTERNS, &UNIT_DIRECTION, page)
        .ok_or(MedianWatchError::MissingField("unit change"))?;

    Ok(DraftStats {
        house_value,
        unit_value,
        house_change,
        unit_change,
        house_rent: currency_field(&HOUSE_RENT_PATTERNS, page),
        unit_rent: currency_field(&UNIT_RENT_PATTERNS, page),
    })
}

/// First capture of any pattern, trying each text blob in order and each
/// pattern within a blob in order.
fn first_capture(patterns: &[Regex], page: &SuburbPage) -> Option<String> {
    for text in page.texts() {
        for re in patterns {
            if let Some(captures) = re.captures(text) {
                return Some(captures[1].to_string());
            }
        }
    }
    None
}

fn currency_field(patterns: &[Regex], page: &SuburbPage) -> Option<f64> {
    first_capture(patterns, page).and_then(|raw| parse_currency(&raw))
}

fn change_field(patterns: &[Regex], direction_re: &Regex, page: &SuburbPage) -> Option<f64> {
    let magnitude: f64 = first_capture(patterns, page)?.parse().ok()?;
    Some(signed_change(magnitude, direction(direction_re, page)))
}

/// Strip the currency symbol and thousands separators, then parse.
fn parse_currency(raw: &str) -> Option<f64> {
    raw.trim_start_matches('$').replace(',', "").parse().ok()
}

/// Locate the direction keyword for one property type. When no keyword is
/// found anywhere, the parsed magnitude is kept as-is (`Increase`).
fn direction(re: &Regex, page: &SuburbPage) -> Direction {
    for text in page.texts() {
        if let Some(captures) = re.captures(text) {
            return match &captures[1] {
                "decrease" => Direction::Decrease,
                _ => Direction::Increase,
            };
        }
    }
    Direction::Increase
}

/// Negate the magnitude only when the keyword says "decrease" AND the parse
/// produced a positive number — a source-encoded negative passes through.
fn signed_change(magnitude: f64, direction: Direction) -> f64 {
    if direction == Direction::Decrease && magnitude > 0.0 {
        -magnitude
    } else {
        magnitude
    }
}
