// Entry point and terminal front-end.
//
// The dataset is loaded once at startup; after that the menu loop lets the
// user change the filter selection and re-render every chart. An invalid
// selection is rejected and the previous one stays in effect.
use anyhow::Context;
use crop_dashboard::config::AppConfig;
use crop_dashboard::dashboard;
use crop_dashboard::output;
use crop_dashboard::util::format_int;
use crop_dashboard::{load_with, CanonicalTable, FilterSelection};
use log::info;
use std::io::{self, Write};

const PREVIEW_ROWS: usize = 10;

struct Session {
    table: CanonicalTable,
    filter: FilterSelection,
    config: AppConfig,
}

/// Print `prompt` and read one trimmed line; `None` once stdin is closed.
fn read_line(prompt: &str) -> Option<String> {
    print!("{}", prompt);
    let _ = io::stdout().flush();
    let mut buf = String::new();
    match io::stdin().read_line(&mut buf) {
        Ok(0) | Err(_) => None,
        Ok(_) => Some(buf.trim().to_string()),
    }
}

fn split_list(s: &str) -> Vec<String> {
    s.split(',')
        .map(|p| p.trim().to_string())
        .filter(|p| !p.is_empty())
        .collect()
}

/// Parse `2000-2010` or a single year; blank means no restriction.
fn parse_year_range(s: &str) -> Result<Option<(i32, i32)>, String> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(None);
    }
    let parse = |p: &str| {
        p.trim()
            .parse::<i32>()
            .map_err(|_| format!("'{}' is not a year", p.trim()))
    };
    match s.split_once('-') {
        Some((a, b)) => Ok(Some((parse(a)?, parse(b)?))),
        None => {
            let y = parse(s)?;
            Ok(Some((y, y)))
        }
    }
}

fn handle_show(session: &Session) {
    println!("\nCrop Production Statistics - {}\n", session.filter.describe());
    let panels = dashboard::compose(&session.table, &session.filter, &session.config.dashboard);
    for panel in &panels {
        output::preview_panel(panel, PREVIEW_ROWS);
    }
}

fn handle_export(session: &Session) {
    let panels = dashboard::compose(&session.table, &session.filter, &session.config.dashboard);
    if let Err(e) = output::write_json(io::stdout().lock(), &panels) {
        eprintln!("Write error: {}", e);
    }
}

fn handle_list(session: &Session) {
    let table = &session.table;
    println!("States: {}", table.states().join(", "));
    println!("Crops: {}", table.crops().join(", "));
    let seasons: Vec<&str> = table.seasons().iter().map(|s| s.label()).collect();
    println!("Seasons: {}", seasons.join(", "));
    if let Some((min, max)) = table.year_bounds() {
        println!("Years: {}-{}", min, max);
    }
    println!();
}

/// Ask for each filter field; keep the last valid selection on any error.
fn handle_filter(session: &mut Session) {
    println!("Leave a field blank to include everything. Separate multiple values with commas.");
    let Some(states) = read_line("States: ") else { return };
    let Some(crops) = read_line("Crops: ") else { return };
    let Some(seasons) = read_line("Seasons: ") else { return };
    let Some(years) = read_line("Year range (e.g. 2000-2010): ") else { return };

    let mut builder = FilterSelection::builder()
        .states(split_list(&states))
        .crops(split_list(&crops))
        .season_labels(split_list(&seasons));
    match parse_year_range(&years) {
        Ok(Some((min, max))) => builder = builder.year_range(min, max),
        Ok(None) => builder = builder.any_year(),
        Err(msg) => {
            println!("Invalid year range: {}. Keeping previous selection.\n", msg);
            return;
        }
    }
    match builder.build() {
        Ok(filter) => {
            println!("Selection: {}\n", filter.describe());
            session.filter = filter;
        }
        Err(e) => println!("{}. Keeping previous selection.\n", e),
    }
}

fn run() -> anyhow::Result<()> {
    let mut config = AppConfig::from_env().context("Invalid configuration")?;
    if let Some(path) = std::env::args().nth(1) {
        config.data_path = path.into();
    }

    println!("Processing dataset {}...", config.data_path.display());
    let (table, report) = load_with(&config.data_path, &config.load)
        .with_context(|| format!("Failed to load {}", config.data_path.display()))?;
    println!(
        "({} rows read, {} kept)",
        format_int(report.total_rows),
        format_int(report.kept_rows)
    );
    println!(
        "Note: {} rows skipped due to parse/validation errors, {} duplicates removed.",
        format_int(report.parse_errors + report.dropped_incomplete),
        format_int(report.duplicates)
    );
    if report.yield_mismatches > 0 {
        println!(
            "Info: {} rows had a yield inconsistent with production/area.",
            format_int(report.yield_mismatches)
        );
    }
    println!();

    let mut session = Session {
        table,
        filter: FilterSelection::all(),
        config,
    };

    loop {
        println!("Crop Production Dashboard ({})", session.filter.describe());
        println!("[1] Show dashboard");
        println!("[2] Change filters");
        println!("[3] Reset filters");
        println!("[4] Export dashboard as JSON");
        println!("[5] List states, crops and years");
        println!("[0] Exit\n");
        let Some(choice) = read_line("Enter choice: ") else { break };
        match choice.as_str() {
            "1" => handle_show(&session),
            "2" => handle_filter(&mut session),
            "3" => {
                session.filter = FilterSelection::all();
                println!("Filters cleared.\n");
            }
            "4" => handle_export(&session),
            "5" => handle_list(&session),
            "0" => break,
            _ => println!("Invalid choice. Please enter 0-5.\n"),
        }
    }
    info!("Exiting");
    println!("Exiting the program.");
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    if let Err(e) = run() {
        eprintln!("Error: {:#}", e);
        std::process::exit(1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn year_range_input() {
        assert_eq!(parse_year_range(""), Ok(None));
        assert_eq!(parse_year_range("2000 - 2010"), Ok(Some((2000, 2010))));
        assert_eq!(parse_year_range("2015"), Ok(Some((2015, 2015))));
        assert!(parse_year_range("twenty").is_err());
    }

    #[test]
    fn list_input_drops_blanks() {
        assert_eq!(split_list(" Punjab, ,Kerala "), vec!["Punjab", "Kerala"]);
        assert!(split_list("").is_empty());
    }
}
