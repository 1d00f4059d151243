use crate::error::UniverseError;
use crate::{SectorAssignment, Universe};
use chrono::NaiveDate;
use configuration::UniverseSettings;
use core_types::{Constituent, ReferenceTable, Sector};
use std::cmp::Ordering;

/// Header names the addition date has been published under.
const DATE_COLUMNS: [&str; 2] = ["date_first_added", "date_added"];

/// Selects the constituents to download from the raw reference table.
pub fn select_universe(
    mut table: ReferenceTable,
    settings: &UniverseSettings,
) -> Result<Universe, UniverseError> {
    if table.is_empty() {
        tracing::warn!("Constituent table has no rows.");
        return Ok(Universe::default());
    }
    table.normalize_columns();

    let symbol_col = required_column(&table, "symbol")?;
    let sector_col = required_column(&table, "gics_sector")?;
    let date_col = DATE_COLUMNS
        .iter()
        .find_map(|name| table.column_index(name))
        .ok_or_else(|| UniverseError::MissingColumn(DATE_COLUMNS[0].to_string()))?;

    let security_col = table.column_index("security");
    let sub_industry_col = table.column_index("gics_sub-industry");
    let headquarters_col = table.column_index("headquarters_location");
    let cik_col = table.column_index("cik");
    let founded_col = table.column_index("founded");

    let optional = |row: usize, col: Option<usize>| -> String {
        col.and_then(|c| table.cell(row, c))
            .unwrap_or_default()
            .to_string()
    };

    let mut constituents = Vec::with_capacity(table.len());
    for row in 0..table.len() {
        let symbol = table
            .cell(row, symbol_col)
            .ok_or_else(|| UniverseError::MissingValue {
                row,
                column: "symbol".to_string(),
            })?
            .trim()
            .to_string();
        if symbol.is_empty() {
            tracing::warn!(row, "Skipping constituent row without a symbol.");
            continue;
        }

        let date_added_raw = table
            .cell(row, date_col)
            .map(str::trim)
            .filter(|raw| !raw.is_empty())
            .map(str::to_string);
        let date_added = date_added_raw.as_deref().and_then(parse_added_date);

        constituents.push(Constituent {
            gics_sector: optional(row, Some(sector_col)).trim().to_string(),
            security: optional(row, security_col),
            sub_industry: optional(row, sub_industry_col),
            headquarters: optional(row, headquarters_col),
            cik: optional(row, cik_col),
            founded: optional(row, founded_col),
            symbol,
            date_added_raw,
            date_added,
        });
    }

    apply_overrides(&mut constituents, settings);

    // Oldest additions first; unknown dates sort last.
    constituents.sort_by(|a, b| compare_dates(a.date_added, b.date_added));

    // Only an empty cell counts as undated; unreadable text is left out.
    let (dated, undated): (Vec<Constituent>, Vec<Constituent>) = constituents
        .into_iter()
        .filter(|c| match (c.date_added, c.date_added_raw.as_deref()) {
            (Some(date), _) => date < settings.added_before,
            (None, None) => true,
            (None, Some(raw)) => {
                tracing::warn!(symbol = %c.symbol, raw, "Unreadable addition date, leaving constituent out.");
                false
            }
        })
        .partition(|c| c.date_added.is_some());

    let undated_count = undated.len();
    let mut selected = dated;
    if settings.include_undated {
        selected.extend(undated);
    }
    selected.sort_by(|a, b| a.gics_sector.cmp(&b.gics_sector));

    let mut assignments: Vec<SectorAssignment> = Vec::with_capacity(selected.len());
    let mut unclassified = Vec::new();
    for constituent in &selected {
        let Some(sector) = Sector::from_name(&constituent.gics_sector) else {
            tracing::warn!(
                symbol = %constituent.symbol,
                sector = %constituent.gics_sector,
                "Unknown GICS sector, leaving symbol out of the download list."
            );
            unclassified.push(constituent.symbol.clone());
            continue;
        };

        // A repeated symbol keeps its first position and takes the latest sector.
        match assignments.iter_mut().find(|a| a.symbol == constituent.symbol) {
            Some(existing) => existing.sector = sector,
            None => assignments.push(SectorAssignment {
                symbol: constituent.symbol.clone(),
                sector,
            }),
        }
    }
    assignments.sort_by_key(|a| a.sector);

    tracing::info!(
        selected = assignments.len(),
        undated = if settings.include_undated { undated_count } else { 0 },
        unclassified = unclassified.len(),
        cutoff = %settings.added_before,
        "Universe selected."
    );

    Ok(Universe {
        constituents: selected,
        assignments,
        unclassified,
    })
}

/// Reads the leading `YYYY-MM-DD` of an addition date cell.
///
/// Cells sometimes carry trailing notes, e.g. `"1983-11-30 (1976?)"`; only
/// the first ten characters are considered.
pub fn parse_added_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d").ok()
}

fn required_column(table: &ReferenceTable, name: &str) -> Result<usize, UniverseError> {
    table
        .column_index(name)
        .ok_or_else(|| UniverseError::MissingColumn(name.to_string()))
}

fn apply_overrides(constituents: &mut [Constituent], settings: &UniverseSettings) {
    for date_override in &settings.date_overrides {
        let mut applied = false;
        for constituent in constituents
            .iter_mut()
            .filter(|c| c.symbol == date_override.symbol)
        {
            constituent.date_added_raw = Some(date_override.date.to_string());
            constituent.date_added = Some(date_override.date);
            applied = true;
        }
        if applied {
            tracing::debug!(symbol = %date_override.symbol, date = %date_override.date, "Addition date overridden.");
        } else {
            tracing::debug!(symbol = %date_override.symbol, "Date override matches no constituent.");
        }
    }
}

fn compare_dates(a: Option<NaiveDate>, b: Option<NaiveDate>) -> Ordering {
    match (a, b) {
        (Some(a), Some(b)) => a.cmp(&b),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use configuration::DateOverride;

    fn row(symbol: &str, sector: &str, date: &str) -> Vec<String> {
        vec![
            symbol.to_string(),
            format!("{} Inc.", symbol),
            sector.to_string(),
            date.to_string(),
        ]
    }

    fn table(rows: Vec<Vec<String>>) -> ReferenceTable {
        ReferenceTable::new(
            vec![
                "Symbol".into(),
                "Security".into(),
                "GICS Sector".into(),
                "Date first added".into(),
            ],
            rows,
        )
    }

    fn settings() -> UniverseSettings {
        UniverseSettings::default()
    }

    #[test]
    fn parses_leading_iso_date() {
        assert_eq!(parse_added_date("1957-03-04"), NaiveDate::from_ymd_opt(1957, 3, 4));
        assert_eq!(
            parse_added_date("1983-11-30 (1976?)"),
            NaiveDate::from_ymd_opt(1983, 11, 30)
        );
        assert_eq!(parse_added_date("unknown"), None);
        assert_eq!(parse_added_date(""), None);
    }

    #[test]
    fn keeps_old_and_undated_constituents() {
        let universe = select_universe(
            table(vec![
                row("NEW", "Industrials", "2015-06-01"),
                row("OLD", "Industrials", "1976-01-01"),
                row("UND", "Industrials", ""),
                row("EDGE", "Industrials", "2000-01-01"),
                row("LATE99", "Industrials", "1999-12-31"),
            ]),
            &settings(),
        )
        .unwrap();

        assert_eq!(universe.symbols(), vec!["OLD", "LATE99", "UND"]);
        assert_eq!(universe.constituent("UND").unwrap().date_added, None);
    }

    #[test]
    fn undated_can_be_excluded() {
        let mut settings = settings();
        settings.include_undated = false;
        let universe = select_universe(
            table(vec![
                row("OLD", "Energy", "1976-01-01"),
                row("UND", "Energy", ""),
            ]),
            &settings,
        )
        .unwrap();
        assert_eq!(universe.symbols(), vec!["OLD"]);
    }

    #[test]
    fn att_override_rescues_annotated_date() {
        let mut settings = settings();
        settings.date_overrides = vec![DateOverride {
            symbol: "T".into(),
            date: NaiveDate::from_ymd_opt(1983, 11, 30).unwrap(),
        }];
        let universe = select_universe(
            table(vec![row("T", "Communication Services", "see notes")]),
            &settings,
        )
        .unwrap();

        let att = universe.constituent("T").unwrap();
        assert_eq!(att.date_added, NaiveDate::from_ymd_opt(1983, 11, 30));
        assert_eq!(att.date_added_raw.as_deref(), Some("1983-11-30"));
        assert_eq!(universe.sector_of("T"), Some(Sector::CommunicationServices));
    }

    #[test]
    fn symbols_are_grouped_by_sector_code() {
        // By full name Communication Services sorts first, but its code TC sorts
        // after every other code except UT.
        let universe = select_universe(
            table(vec![
                row("VZ", "Communication Services", "1983-11-30"),
                row("XOM", "Energy", "1957-03-04"),
                row("DUK", "Utilities", "1976-06-30"),
                row("KO", "Consumer Staples", "1957-03-04"),
                row("CVX", "Energy", "1957-03-04"),
                row("F", "Consumer Discretionary", "1957-03-04"),
            ]),
            &settings(),
        )
        .unwrap();

        assert_eq!(universe.symbols(), vec!["F", "KO", "XOM", "CVX", "VZ", "DUK"]);
        let codes: Vec<&str> = universe.assignments.iter().map(|a| a.sector.code()).collect();
        assert_eq!(codes, vec!["CD", "CS", "EG", "EG", "TC", "UT"]);
    }

    #[test]
    fn within_sector_older_additions_come_first() {
        let universe = select_universe(
            table(vec![
                row("B", "Materials", ""),
                row("C", "Materials", "1990-01-01"),
                row("A", "Materials", "1960-01-01"),
            ]),
            &settings(),
        )
        .unwrap();
        assert_eq!(universe.symbols(), vec!["A", "C", "B"]);
    }

    #[test]
    fn unknown_sector_is_reported_not_fatal() {
        let universe = select_universe(
            table(vec![
                row("AAA", "Telecommunication Services", "1980-01-01"),
                row("BBB", "Financials", "1980-01-01"),
            ]),
            &settings(),
        )
        .unwrap();
        assert_eq!(universe.symbols(), vec!["BBB"]);
        assert_eq!(universe.unclassified, vec!["AAA"]);
        assert_eq!(universe.constituents.len(), 2);
    }

    #[test]
    fn accepts_date_added_header() {
        let table = ReferenceTable::new(
            vec!["Symbol".into(), "GICS Sector".into(), "Date added".into()],
            vec![vec!["MMM".into(), "Industrials".into(), "1957-03-04".into()]],
        );
        let universe = select_universe(table, &settings()).unwrap();
        assert_eq!(universe.symbols(), vec!["MMM"]);
        assert_eq!(universe.constituents[0].security, "");
    }

    #[test]
    fn missing_sector_column_is_an_error() {
        let table = ReferenceTable::new(
            vec!["Symbol".into(), "Date added".into()],
            vec![vec!["MMM".into(), "1957-03-04".into()]],
        );
        let err = select_universe(table, &settings()).unwrap_err();
        assert!(matches!(err, UniverseError::MissingColumn(c) if c == "gics_sector"));
    }

    #[test]
    fn empty_table_gives_empty_universe() {
        let universe = select_universe(table(vec![]), &settings()).unwrap();
        assert!(universe.is_empty());

        let universe = select_universe(ReferenceTable::default(), &settings()).unwrap();
        assert!(universe.is_empty());
        assert!(universe.constituents.is_empty());
    }

    #[test]
    fn unreadable_date_is_not_undated() {
        let universe = select_universe(
            table(vec![
                row("NEWCO", "Energy", "March 2015"),
                row("UND", "Energy", ""),
                row("XOM", "Energy", "1957-03-04"),
            ]),
            &settings(),
        )
        .unwrap();
        assert_eq!(universe.symbols(), vec!["XOM", "UND"]);
        assert!(universe.constituent("NEWCO").is_none());
    }

    #[test]
    fn override_for_absent_symbol_is_ignored() {
        let mut settings = settings();
        settings.date_overrides = vec![DateOverride {
            symbol: "ZZZ".into(),
            date: NaiveDate::from_ymd_opt(1970, 1, 1).unwrap(),
        }];
        let universe = select_universe(
            table(vec![
                row("OLD", "Utilities", "1976-01-01"),
                row("NEW", "Utilities", "2010-01-01"),
            ]),
            &settings,
        )
        .unwrap();
        assert_eq!(universe.symbols(), vec!["OLD"]);
        assert!(universe.constituent("ZZZ").is_none());
        assert_eq!(
            universe.constituent("OLD").unwrap().date_added,
            NaiveDate::from_ymd_opt(1976, 1, 1)
        );
    }
}
