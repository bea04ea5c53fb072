use crop_dashboard::dashboard::{compose, ChartKind, ChartOutcome};
use crop_dashboard::engine::{trend_by_year, yield_by_state};
use crop_dashboard::types::YearValue;
use crop_dashboard::{
    load_with, AggregateError, DashboardOptions, FilterError, FilterSelection, LoadOptions,
    Metric,
};
use std::io::Write;
use tempfile::NamedTempFile;

const CROPS_CSV: &str = "\
State_Name,District_Name,Crop_Year,Season,Crop,Area,Production
Punjab,LUDHIANA,2020,Kharif     ,Rice,100,400
Punjab,LUDHIANA,2021,Kharif     ,Rice,100,500
Punjab,AMRITSAR,2020,Rabi       ,Wheat,80,360
Punjab,AMRITSAR,2020,Rabi       ,Wheat,80,360
Kerala,KOLLAM,2020,Whole Year ,Coconut,40,
Kerala,KOLLAM,2021,Whole Year ,Coconut,40,320
Kerala,,2021,Kharif,Rice,10,30
";

fn load_fixture() -> crop_dashboard::CanonicalTable {
    let mut file = NamedTempFile::new().expect("temp file");
    file.write_all(CROPS_CSV.as_bytes()).expect("write fixture");
    let opts = LoadOptions {
        max_year: 2024,
        ..LoadOptions::default()
    };
    let (table, report) = load_with(file.path(), &opts).expect("load fixture");
    assert_eq!(report.total_rows, 7);
    assert_eq!(report.duplicates, 1);
    assert_eq!(report.dropped_incomplete, 1);
    table
}

#[test]
fn rice_trend_from_file() {
    let table = load_fixture();
    let rice = FilterSelection::builder().crop("Rice").build().unwrap();
    let trend = trend_by_year(&table, &rice, Metric::Production).unwrap();
    assert_eq!(
        trend,
        vec![
            YearValue { year: 2020, value: 400.0 },
            YearValue { year: 2021, value: 500.0 },
        ]
    );
}

#[test]
fn unknown_state_shows_no_data() {
    let table = load_fixture();
    let nowhere = FilterSelection::builder().state("Goa").build().unwrap();
    assert_eq!(yield_by_state(&table, &nowhere), Err(AggregateError::EmptyResult));

    let panels = compose(&table, &nowhere, &DashboardOptions::default());
    let yields = panels.iter().find(|p| p.kind == ChartKind::YieldByState).unwrap();
    assert_eq!(yields.outcome, ChartOutcome::NoData);
}

#[test]
fn invalid_filter_never_reaches_the_engine() {
    let err = FilterSelection::builder().year_range(2021, 2020).build().unwrap_err();
    assert_eq!(err, FilterError::InvertedYearRange { min: 2021, max: 2020 });
}

#[test]
fn national_dashboard_renders_every_panel() {
    let table = load_fixture();
    let panels = compose(&table, &FilterSelection::all(), &DashboardOptions::default());
    assert!(panels
        .iter()
        .all(|p| matches!(p.outcome, ChartOutcome::Ready(_))));
    let json = serde_json::to_string(&panels).unwrap();
    assert!(json.contains("\"kind\":\"year_over_year\""));
}
