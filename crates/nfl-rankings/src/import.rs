// Roster CSV import.
//
// Admin uploads are loosely formatted spreadsheet exports: the only
// requirement is a header row with columns whose names contain "name",
// "team", and "opponent". Extra columns are ignored.

use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// One accepted roster line, ready to be stored.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RosterRow {
    pub name: String,
    pub team: String,
    pub opponent: String,
}

/// How an upload treats the bucket's existing roster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UploadMode {
    /// Keep existing players; new rows are ordered after them.
    #[default]
    Append,
    /// Delete the bucket's roster before inserting.
    Override,
}

impl UploadMode {
    pub fn from_str_mode(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "append" => Some(UploadMode::Append),
            "override" | "replace" => Some(UploadMode::Override),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ImportError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("CSV file has no header row")]
    MissingHeader,

    #[error("CSV header has no column containing '{0}'")]
    MissingColumn(&'static str),
}

// ---------------------------------------------------------------------------
// Header detection
// ---------------------------------------------------------------------------

#[derive(Debug, PartialEq, Eq)]
struct Columns {
    name: usize,
    team: usize,
    opponent: usize,
}

/// First header containing each keyword wins. A header such as
/// "Team Name" therefore counts for both `name` and `team`.
fn find_columns(headers: &csv::StringRecord) -> Result<Columns, ImportError> {
    let find = |keyword: &'static str| {
        headers
            .iter()
            .position(|h| h.trim().to_lowercase().contains(keyword))
            .ok_or(ImportError::MissingColumn(keyword))
    };
    Ok(Columns {
        name: find("name")?,
        team: find("team")?,
        opponent: find("opponent")?,
    })
}

fn cell(record: &csv::StringRecord, idx: usize) -> &str {
    record.get(idx).map(str::trim).unwrap_or("")
}

// ---------------------------------------------------------------------------
// Loaders
// ---------------------------------------------------------------------------

/// Parse roster rows from any reader. Rows missing a name, team, or
/// opponent are skipped. `limit` caps the number of accepted rows; 0 means
/// no limit.
pub fn parse_roster_csv<R: Read>(rdr: R, limit: usize) -> Result<Vec<RosterRow>, ImportError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(rdr);

    let mut records = reader.records();
    let headers = match records.next() {
        Some(result) => result?,
        None => return Err(ImportError::MissingHeader),
    };
    let cols = find_columns(&headers)?;

    let mut rows = Vec::new();
    for (line, result) in records.enumerate() {
        if limit > 0 && rows.len() >= limit {
            debug!("upload limit of {limit} reached, ignoring remaining rows");
            break;
        }
        let record = match result {
            Ok(record) => record,
            Err(e) => {
                warn!("skipping unreadable roster row {}: {}", line + 2, e);
                continue;
            }
        };

        let name = cell(&record, cols.name);
        let team = cell(&record, cols.team);
        let opponent = cell(&record, cols.opponent);
        if name.is_empty() || team.is_empty() || opponent.is_empty() {
            debug!("skipping incomplete roster row {}", line + 2);
            continue;
        }

        rows.push(RosterRow {
            name: name.to_string(),
            team: team.to_string(),
            opponent: opponent.to_string(),
        });
    }
    Ok(rows)
}

/// Parse a roster CSV file from disk.
pub fn load_roster_csv(path: &Path, limit: usize) -> Result<Vec<RosterRow>, ImportError> {
    let file = std::fs::File::open(path).map_err(|e| ImportError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    parse_roster_csv(file, limit)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(rows: &[RosterRow]) -> Vec<&str> {
        rows.iter().map(|r| r.name.as_str()).collect()
    }

    #[test]
    fn basic_roster() {
        let csv_data = "\
Name,Team,Opponent
Josh Allen,BUF,MIA
Jalen Hurts,PHI,DAL";

        let rows = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(
            rows[0],
            RosterRow {
                name: "Josh Allen".into(),
                team: "BUF".into(),
                opponent: "MIA".into()
            }
        );
        assert_eq!(rows[1].team, "PHI");
    }

    #[test]
    fn headers_matched_by_substring_in_any_order() {
        let csv_data = "\
Rank,Opponent Team,Player Name,NFL Team,Proj
1,@KC,Lamar Jackson,BAL,24.1";

        // "Opponent Team" is the first header containing "team".
        let rows = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(rows[0].name, "Lamar Jackson");
        assert_eq!(rows[0].team, "@KC");
        assert_eq!(rows[0].opponent, "@KC");
    }

    #[test]
    fn header_case_and_whitespace_ignored() {
        let csv_data = "\
  NAME ,team,  OPPONENT
Bijan Robinson,ATL,NO";

        let rows = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(names(&rows), vec!["Bijan Robinson"]);
    }

    #[test]
    fn missing_opponent_column_is_an_error() {
        let csv_data = "\
Name,Team
Josh Allen,BUF";

        assert!(matches!(
            parse_roster_csv(csv_data.as_bytes(), 0),
            Err(ImportError::MissingColumn("opponent"))
        ));
    }

    #[test]
    fn empty_file_has_no_header() {
        assert!(matches!(
            parse_roster_csv("".as_bytes(), 0),
            Err(ImportError::MissingHeader)
        ));
    }

    #[test]
    fn incomplete_and_ragged_rows_skipped() {
        let csv_data = "\
Name,Team,Opponent
Valid One,KC,LV
,KC,LV
No Opp,KC,
Short Row,KC
Valid Two,SF,SEA";

        let rows = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(names(&rows), vec!["Valid One", "Valid Two"]);
    }

    #[test]
    fn cells_are_trimmed() {
        let csv_data = "\
Name,Team,Opponent
  Travis Kelce  , KC , DEN ";

        let rows = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(rows[0].name, "Travis Kelce");
        assert_eq!(rows[0].team, "KC");
        assert_eq!(rows[0].opponent, "DEN");
    }

    #[test]
    fn limit_counts_accepted_rows_only() {
        let csv_data = "\
Name,Team,Opponent
A,T,O
,T,O
B,T,O
C,T,O";

        let rows = parse_roster_csv(csv_data.as_bytes(), 2).unwrap();
        assert_eq!(names(&rows), vec!["A", "B"]);

        let unlimited = parse_roster_csv(csv_data.as_bytes(), 0).unwrap();
        assert_eq!(unlimited.len(), 3);
    }

    #[test]
    fn upload_mode_parsing() {
        assert_eq!(UploadMode::from_str_mode("append"), Some(UploadMode::Append));
        assert_eq!(UploadMode::from_str_mode("Override"), Some(UploadMode::Override));
        assert_eq!(UploadMode::from_str_mode("replace"), Some(UploadMode::Override));
        assert_eq!(UploadMode::from_str_mode("merge"), None);
        assert_eq!(UploadMode::default(), UploadMode::Append);
    }

    #[test]
    fn missing_file_reports_path() {
        let err = load_roster_csv(Path::new("/nonexistent/roster.csv"), 0).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/roster.csv"));
    }
}
