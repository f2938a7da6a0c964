// Player table loading and roster snapshot persistence.
//
// Player CSVs carry identity columns (name, team, position, salary) followed
// by any number of numeric metric columns. Older exports encode the position
// as `position_encoded` (0 = D, 1 = F) instead of a `position` column.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::Deserialize;
use tracing::{debug, warn};

use super::position::Position;
use super::record::{Player, PlayerTable};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum PlayerDataError {
    #[error("failed to read file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("{path} is missing the `{column}` column")]
    Schema { path: String, column: String },

    #[error("validation error: {0}")]
    Validation(String),
}

// ---------------------------------------------------------------------------
// Raw CSV serde struct (private)
// ---------------------------------------------------------------------------

/// Identity columns in a player CSV row. Every other column lands in
/// `metrics` and is kept when it holds a number.
#[derive(Debug, Deserialize)]
struct RawPlayerRow {
    #[serde(alias = "Name")]
    name: String,
    #[serde(default, alias = "Team")]
    team: Option<String>,
    #[serde(default, alias = "Position")]
    position: Option<String>,
    #[serde(default)]
    position_encoded: Option<f64>,
    #[serde(alias = "Salary")]
    salary: f64,
    #[serde(flatten)]
    metrics: HashMap<String, serde_json::Value>,
}

const IDENTITY_COLUMNS: [&str; 4] = ["name", "team", "position", "salary"];

/// Identity columns a player CSV cannot do without, with accepted spellings.
const REQUIRED_COLUMNS: [(&str, &[&str]); 3] = [
    ("name", &["name", "Name"]),
    ("position", &["position", "Position", "position_encoded"]),
    ("salary", &["salary", "Salary"]),
];

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn resolve_position(raw: &RawPlayerRow) -> Option<Position> {
    if let Some(pos) = raw.position.as_deref().filter(|s| !s.trim().is_empty()) {
        return Position::from_str_pos(pos);
    }
    raw.position_encoded
        .filter(|code| code.fract() == 0.0)
        .and_then(|code| Position::from_encoded(code as i64))
}

/// Convert an inferred CSV cell to a metric value. Empty cells and text
/// yield `None`; the caller decides whether that matters.
fn metric_value(value: &serde_json::Value) -> Option<f64> {
    match value {
        serde_json::Value::Number(n) => n.as_f64(),
        serde_json::Value::String(s) => s.trim().parse::<f64>().ok(),
        _ => None,
    }
}

fn row_to_player(raw: RawPlayerRow) -> Option<Player> {
    let name = raw.name.trim().to_string();
    if name.is_empty() {
        warn!("skipping player row with empty name");
        return None;
    }
    let Some(position) = resolve_position(&raw) else {
        warn!("skipping player '{}': unknown position", name);
        return None;
    };
    if !raw.salary.is_finite() || raw.salary < 0.0 {
        warn!("skipping player '{}': invalid salary {}", name, raw.salary);
        return None;
    }

    let team = raw.team.as_deref().unwrap_or("").trim().to_string();
    let mut player = Player::new(&name, &team, position, raw.salary.round() as u64);

    for (column, value) in &raw.metrics {
        match metric_value(value) {
            Some(v) if v.is_finite() => {
                player.stats.insert(column.clone(), v);
            }
            Some(_) => {
                warn!("skipping player '{}': non-finite value in `{}`", name, column);
                return None;
            }
            None => {
                debug!("ignoring non-numeric `{}` for player '{}'", column, name);
            }
        }
    }
    Some(player)
}

// ---------------------------------------------------------------------------
// Reader/writer-based primitives (enable testing without temp files)
// ---------------------------------------------------------------------------

fn read_players<R: Read>(rdr: R, path: &str) -> Result<PlayerTable, PlayerDataError> {
    let csv_err = |source| PlayerDataError::Csv {
        path: path.to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::Headers).from_reader(rdr);

    let headers = reader.headers().map_err(csv_err)?;
    for (column, spellings) in REQUIRED_COLUMNS {
        if !headers.iter().any(|h| spellings.contains(&h)) {
            return Err(PlayerDataError::Schema {
                path: path.to_string(),
                column: column.to_string(),
            });
        }
    }

    let mut players = Vec::new();
    for result in reader.deserialize::<RawPlayerRow>() {
        match result {
            Ok(raw) => {
                if let Some(player) = row_to_player(raw) {
                    players.push(player);
                }
            }
            Err(e) => {
                warn!("skipping malformed player row: {}", e);
            }
        }
    }
    Ok(PlayerTable::from_players(players))
}

/// Parse player rows from any reader. A missing identity column is a
/// `Schema` error; malformed rows are logged and skipped.
pub fn load_players_from_reader<R: Read>(rdr: R) -> Result<PlayerTable, PlayerDataError> {
    read_players(rdr, "<reader>")
}

/// Metric columns across `players`, in first-seen order.
fn metric_columns(players: &[Player]) -> Vec<String> {
    let mut columns: Vec<String> = Vec::new();
    for player in players {
        for metric in player.stats.keys() {
            if !columns.iter().any(|c| c == metric) {
                columns.push(metric.clone());
            }
        }
    }
    columns
}

/// Write players as CSV: identity columns, then every metric column.
/// A metric a player lacks is written as an empty cell.
pub fn write_players_to_writer<W: Write>(wtr: W, players: &[Player]) -> Result<(), csv::Error> {
    let columns = metric_columns(players);
    let mut writer = csv::Writer::from_writer(wtr);

    let header: Vec<&str> = IDENTITY_COLUMNS
        .iter()
        .copied()
        .chain(columns.iter().map(String::as_str))
        .collect();
    writer.write_record(&header)?;

    for player in players {
        let mut record: Vec<String> = vec![
            player.name.clone(),
            player.team.clone(),
            player.position.display_str().to_string(),
            player.salary.to_string(),
        ];
        record.extend(
            columns
                .iter()
                .map(|c| player.stat(c).map(|v| v.to_string()).unwrap_or_default()),
        );
        writer.write_record(&record)?;
    }
    writer.flush()?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Public path-based loaders
// ---------------------------------------------------------------------------

/// Load a player table from a CSV file.
pub fn load_players(path: &Path) -> Result<PlayerTable, PlayerDataError> {
    let file = std::fs::File::open(path).map_err(|e| PlayerDataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    read_players(file, &path.display().to_string())
}

/// Load several CSVs and concatenate them into one reference population.
pub fn load_reference_population(paths: &[&Path]) -> Result<PlayerTable, PlayerDataError> {
    let mut tables = Vec::with_capacity(paths.len());
    for path in paths {
        tables.push(load_players(path)?);
    }
    let refs: Vec<&PlayerTable> = tables.iter().collect();
    let population = PlayerTable::concat(&refs);
    if population.is_empty() {
        return Err(PlayerDataError::Validation(
            "reference population produced zero valid rows".into(),
        ));
    }
    Ok(population)
}

/// Persist a completed roster so the scorer can read it back later.
pub fn write_roster_snapshot(path: &Path, players: &[Player]) -> Result<(), PlayerDataError> {
    let file = std::fs::File::create(path).map_err(|e| PlayerDataError::Io {
        path: path.display().to_string(),
        source: e,
    })?;
    write_players_to_writer(file, players).map_err(|e| PlayerDataError::Csv {
        path: path.display().to_string(),
        source: e,
    })
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
