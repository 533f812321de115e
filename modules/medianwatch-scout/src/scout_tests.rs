//! Orchestrator tests — mock fetcher in, report rows out.
//!
//! Each test drives a full `Scout::run` over a temp report file and asserts
//! the stats, the fetcher calls, and the persisted rows.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};

use medianwatch_common::{MarketRecord, PeriodSource, RentalYield, ReportPeriod, Suburb, SuburbPage};

use crate::pipeline::{period, report::MarketReport};
use crate::run_log::RunLog;
use crate::scout::Scout;
use crate::testing::{
    market_page, rent_blob, stats_blob, test_config, BrokenSessionFetcher, MockFetcher,
};

fn suburb_list(slugs: &[&str]) -> Vec<Suburb> {
    slugs.iter().map(|slug| Suburb::from_slug(slug)).collect()
}

/// A minimal already-stored observation used to preload the report.
fn placeholder_record(suburb: &str, period: ReportPeriod) -> MarketRecord {
    MarketRecord {
        suburb: suburb.to_string(),
        period,
        period_source: PeriodSource::Fallback,
        house_value: 1_000_000.0,
        unit_value: 500_000.0,
        house_change: 1.0,
        unit_change: 1.0,
        house_rent: None,
        unit_rent: None,
        house_yield: RentalYield::Unknown,
        unit_yield: RentalYield::Unknown,
    }
}

fn glen_waverley_page() -> SuburbPage {
    let stats = stats_blob(
        "Glen Waverley 3150",
        "5.3% decrease",
        "2.1% increase",
        "1,200,000",
        "600,000",
        Some("30 April 2025"),
    );
    market_page(&stats, Some(&rent_blob("550", "450")))
}

#[tokio::test]
async fn existing_expected_key_skips_without_fetching() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.md");
    let today = Utc::now().date_naive();

    let mut report = MarketReport::load(&report_path).unwrap();
    report
        .append(&placeholder_record(
            "Box Hill 3128",
            period::fallback_period(today),
        ))
        .unwrap();

    let fetcher =
        Arc::new(MockFetcher::new().on_page("glen-waverley-3150", glen_waverley_page()));
    let mut scout = Scout::new(
        fetcher.clone(),
        report,
        test_config(&report_path, dir.path()),
        suburb_list(&["box-hill-3128", "glen-waverley-3150"]),
    );
    let mut run_log = RunLog::new("test-run".to_string());

    let stats = scout.run(&mut run_log).await;

    assert_eq!(stats.skipped_existing, 1);
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.failed, 0);
    assert_eq!(stats.pages_fetched, 1);
    assert!(!stats.aborted);
    // Box Hill never reached the fetcher.
    assert_eq!(fetcher.calls(), vec!["glen-waverley-3150".to_string()]);

    let text = std::fs::read_to_string(&report_path).unwrap();
    assert!(text.contains(
        "| 2025.04.30 | Glen Waverley 3150 | house | $1,200,000 | -5.3% | $550 | 2.38% |"
    ));
    assert!(text.contains(
        "| 2025.04.30 | Glen Waverley 3150 | unit | $600,000 | 2.1% | $450 | 3.90% |"
    ));
}

#[tokio::test]
async fn failing_suburb_does_not_stop_the_batch() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.md");

    let box_hill = market_page(
        &stats_blob(
            "Box Hill 3128",
            "3.1% increase",
            "1.4% increase",
            "1,500,000",
            "700,000",
            Some("30 April 2025"),
        ),
        None,
    );
    let kew = market_page(
        &stats_blob(
            "Kew 3101",
            "2.2% increase",
            "0.9% decrease",
            "2,400,000",
            "850,000",
            Some("30 April 2025"),
        ),
        None,
    );
    // Nothing extractable on the middle suburb's page.
    let junk = SuburbPage {
        full_text: "Renovation ideas and local news.".to_string(),
        ..Default::default()
    };

    let fetcher = Arc::new(
        MockFetcher::new()
            .on_page("box-hill-3128", box_hill)
            .on_page("glen-waverley-3150", junk)
            .on_page("kew-3101", kew),
    );
    let mut scout = Scout::new(
        fetcher.clone(),
        MarketReport::load(&report_path).unwrap(),
        test_config(&report_path, dir.path()),
        suburb_list(&["box-hill-3128", "glen-waverley-3150", "kew-3101"]),
    );
    let mut run_log = RunLog::new("test-run".to_string());

    let stats = scout.run(&mut run_log).await;

    assert_eq!(stats.pages_fetched, 3);
    assert_eq!(stats.stored, 2);
    assert_eq!(stats.failed, 1);
    assert!(!stats.aborted);

    let text = std::fs::read_to_string(&report_path).unwrap();
    assert!(text.contains("| Box Hill 3128 | house |"));
    assert!(text.contains("| Kew 3101 | house |"));
    assert!(!text.contains("Glen Waverley"));
}

#[tokio::test]
async fn actual_period_already_recorded_skips_after_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.md");
    let april = ReportPeriod::from_date(NaiveDate::from_ymd_opt(2025, 4, 30).unwrap());

    // The April observation is stored, but the expected key for the current
    // month differs — so the page is fetched, and only the post-fetch check
    // on the page's own "As at" date catches the duplicate.
    let mut report = MarketReport::load(&report_path).unwrap();
    report
        .append(&placeholder_record("Box Hill 3128", april))
        .unwrap();

    let page = market_page(
        &stats_blob(
            "Box Hill 3128",
            "3.1% increase",
            "1.4% increase",
            "1,500,000",
            "700,000",
            Some("30 April 2025"),
        ),
        None,
    );
    let fetcher = Arc::new(MockFetcher::new().on_page("box-hill-3128", page));
    let mut scout = Scout::new(
        fetcher.clone(),
        report,
        test_config(&report_path, dir.path()),
        suburb_list(&["box-hill-3128"]),
    );
    let mut run_log = RunLog::new("test-run".to_string());

    let stats = scout.run(&mut run_log).await;

    assert_eq!(stats.pages_fetched, 1);
    assert_eq!(stats.skipped_existing, 1);
    assert_eq!(stats.stored, 0);
    assert_eq!(stats.failed, 0);
}

#[tokio::test]
async fn unregistered_slug_counts_as_failed_fetch() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.md");

    let fetcher = Arc::new(MockFetcher::new());
    let mut scout = Scout::new(
        fetcher,
        MarketReport::load(&report_path).unwrap(),
        test_config(&report_path, dir.path()),
        suburb_list(&["box-hill-3128"]),
    );
    let mut run_log = RunLog::new("test-run".to_string());

    let stats = scout.run(&mut run_log).await;

    assert_eq!(stats.failed, 1);
    assert_eq!(stats.stored, 0);
    assert!(!stats.aborted);
}

#[tokio::test]
async fn broken_session_retries_then_aborts_with_summary() {
    let dir = tempfile::tempdir().unwrap();
    let report_path = dir.path().join("report.md");

    let fetcher = Arc::new(BrokenSessionFetcher::new());
    let mut scout = Scout::new(
        fetcher.clone(),
        MarketReport::load(&report_path).unwrap(),
        test_config(&report_path, dir.path()),
        suburb_list(&["box-hill-3128", "glen-waverley-3150"]),
    );
    let mut run_log = RunLog::new("test-run".to_string());

    let stats = scout.run(&mut run_log).await;

    assert!(stats.aborted);
    assert_eq!(stats.session_retries, 1);
    assert_eq!(stats.stored, 0);
    // Initial session plus one retry, each dying on the first suburb.
    assert_eq!(fetcher.call_count(), 2);

    // The run still produces a persisted summary.
    let path = run_log.save(&stats, dir.path()).unwrap();
    assert!(path.exists());
}
