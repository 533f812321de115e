use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// --- Suburb identity ---

/// A tracked suburb, identified by its location slug (e.g. `box-hill-3128`).
/// The display name is derived mechanically from the slug — hyphens to
/// spaces, each word title-cased — and is the form stored in the report, so
/// it must stay stable across runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Suburb {
    pub slug: String,
    pub name: String,
}

impl Suburb {
    pub fn from_slug(slug: &str) -> Self {
        let name = slug
            .split('-')
            .map(|word| {
                let mut chars = word.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" ");
        Self {
            slug: slug.to_string(),
            name,
        }
    }
}

impl std::fmt::Display for Suburb {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

// --- Property kind ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PropertyKind {
    House,
    Unit,
}

impl std::fmt::Display for PropertyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PropertyKind::House => write!(f, "house"),
            PropertyKind::Unit => write!(f, "unit"),
        }
    }
}

// --- Reporting period ---

/// The reporting date an observation applies to. Rendered as `YYYY.MM.DD`
/// in the report, which is also the form the store parses back when
/// rebuilding its key set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReportPeriod(NaiveDate);

impl ReportPeriod {
    pub fn from_date(date: NaiveDate) -> Self {
        Self(date)
    }

    pub fn date(&self) -> NaiveDate {
        self.0
    }

    /// Parse a period cell back from its report form. Returns `None` for
    /// anything that is not a `YYYY.MM.DD` date (header cells included).
    pub fn parse(s: &str) -> Option<Self> {
        NaiveDate::parse_from_str(s.trim(), "%Y.%m.%d")
            .ok()
            .map(Self)
    }
}

impl std::fmt::Display for ReportPeriod {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.format("%Y.%m.%d"))
    }
}

/// Which rule produced a record's period. Kept on the record so a run can be
/// audited after the fact: an explicit page date and the previous-month-end
/// fallback are not equally trustworthy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodSource {
    PageDate,
    Fallback,
}

impl std::fmt::Display for PeriodSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PeriodSource::PageDate => write!(f, "page_date"),
            PeriodSource::Fallback => write!(f, "fallback"),
        }
    }
}

// --- Rental yield ---

/// Annualized rent over value, as a percentage. `Unknown` when the source
/// published no rent — never zero, and never dropped from the record.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RentalYield {
    Known(f64),
    Unknown,
}

impl RentalYield {
    /// `rent × 52 ÷ value × 100` when the weekly rent is known.
    pub fn derive(weekly_rent: Option<f64>, value: f64) -> Self {
        match weekly_rent {
            Some(rent) if value > 0.0 => RentalYield::Known(rent * 52.0 / value * 100.0),
            _ => RentalYield::Unknown,
        }
    }
}

impl std::fmt::Display for RentalYield {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RentalYield::Known(pct) => write!(f, "{pct:.2}%"),
            RentalYield::Unknown => write!(f, "-"),
        }
    }
}

// --- Dedup key ---

/// One logical observation: (period, suburb). Two records sharing a key are
/// the same observation regardless of their numeric fields.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DedupKey {
    pub period: ReportPeriod,
    pub suburb: String,
}

impl std::fmt::Display for DedupKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "({}, {})", self.period, self.suburb)
    }
}

// --- Market record ---

/// The structured result for one suburb at one period. Value fields are
/// non-negative by construction (parsed from unsigned currency text); change
/// fields carry the inferred sign. Immutable once built — it is either
/// appended to the report or discarded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MarketRecord {
    pub suburb: String,
    pub period: ReportPeriod,
    pub period_source: PeriodSource,
    pub house_value: f64,
    pub unit_value: f64,
    pub house_change: f64,
    pub unit_change: f64,
    pub house_rent: Option<f64>,
    pub unit_rent: Option<f64>,
    pub house_yield: RentalYield,
    pub unit_yield: RentalYield,
}

impl MarketRecord {
    pub fn key(&self) -> DedupKey {
        DedupKey {
            period: self.period,
            suburb: self.suburb.clone(),
        }
    }

    pub fn value(&self, kind: PropertyKind) -> f64 {
        match kind {
            PropertyKind::House => self.house_value,
            PropertyKind::Unit => self.unit_value,
        }
    }

    pub fn change(&self, kind: PropertyKind) -> f64 {
        match kind {
            PropertyKind::House => self.house_change,
            PropertyKind::Unit => self.unit_change,
        }
    }

    pub fn rent(&self, kind: PropertyKind) -> Option<f64> {
        match kind {
            PropertyKind::House => self.house_rent,
            PropertyKind::Unit => self.unit_rent,
        }
    }

    pub fn rental_yield(&self, kind: PropertyKind) -> RentalYield {
        match kind {
            PropertyKind::House => self.house_yield,
            PropertyKind::Unit => self.unit_yield,
        }
    }
}

// --- Fetched page text ---

/// The text blobs fetched for one suburb. The fetcher carves the page into
/// progressively wider slices; extraction tries them in declaration order.
/// Ephemeral — lives only for the one extraction pass that consumes it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SuburbPage {
    /// Paragraph mentioning the property count and median value.
    pub stats_text: Option<String>,
    /// Paragraph carrying the median dollar values.
    pub value_text: Option<String>,
    /// Paragraph carrying the median weekly rents.
    pub rent_text: Option<String>,
    /// Whole-page text, the last-resort strategy.
    pub full_text: String,
}

impl SuburbPage {
    /// Candidate texts in extraction order: stats, value, rent, full page.
    pub fn texts(&self) -> impl Iterator<Item = &str> {
        self.stats_text
            .as_deref()
            .into_iter()
            .chain(self.value_text.as_deref())
            .chain(self.rent_text.as_deref())
            .chain(std::iter::once(self.full_text.as_str()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn suburb_name_from_slug() {
        let suburb = Suburb::from_slug("box-hill-3128");
        assert_eq!(suburb.name, "Box Hill 3128");
        assert_eq!(suburb.slug, "box-hill-3128");

        assert_eq!(Suburb::from_slug("glen-waverley-3150").name, "Glen Waverley 3150");
    }

    #[test]
    fn period_display_and_parse_round_trip() {
        let period = ReportPeriod::from_date(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());
        assert_eq!(period.to_string(), "2025.04.30");
        assert_eq!(ReportPeriod::parse("2025.04.30"), Some(period));
        assert_eq!(ReportPeriod::parse(" 2025.04.30 "), Some(period));
        assert_eq!(ReportPeriod::parse("Date"), None);
    }

    #[test]
    fn yield_derived_from_rent_and_value() {
        // 450 * 52 / 600_000 * 100 = 3.9
        match RentalYield::derive(Some(450.0), 600_000.0) {
            RentalYield::Known(pct) => assert!((pct - 3.9).abs() < 1e-9),
            RentalYield::Unknown => panic!("yield should be known"),
        }
        assert_eq!(RentalYield::derive(Some(450.0), 600_000.0).to_string(), "3.90%");
    }

    #[test]
    fn yield_unknown_without_rent_never_zero() {
        let y = RentalYield::derive(None, 600_000.0);
        assert_eq!(y, RentalYield::Unknown);
        assert_eq!(y.to_string(), "-");
    }

    #[test]
    fn page_texts_in_strategy_order() {
        let page = SuburbPage {
            stats_text: Some("stats".to_string()),
            value_text: None,
            rent_text: Some("rent".to_string()),
            full_text: "full".to_string(),
        };
        let texts: Vec<&str> = page.texts().collect();
        assert_eq!(texts, vec!["stats", "rent", "full"]);
    }
}
