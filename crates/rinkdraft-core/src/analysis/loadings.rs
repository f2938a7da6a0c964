// Feature loadings: a one-component PCA over standardized (optionally
// pre-weighted) metrics, persisted as a two-column CSV.
//
// The sign of a principal component is arbitrary. A single fit is made
// deterministic (largest-magnitude loading positive), but a fit on a new
// reference population may still come out globally flipped relative to an
// older file. Only relative magnitudes within one file carry meaning.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::analysis::metrics::{MetricSet, MetricWeights};
use crate::analysis::pca::first_principal_component;
use crate::analysis::standardize::Standardizer;
use crate::error::EngineError;
use crate::players::csv_io::PlayerDataError;
use crate::players::record::{Player, PlayerTable};

// ---------------------------------------------------------------------------
// Error type
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum LoadingsError {
    #[error("{path} not found; generate the feature loadings first")]
    NotFound { path: String },

    #[error("failed to access file {path}: {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },

    #[error("CSV error in {path}: {source}")]
    Csv { path: String, source: csv::Error },

    #[error("loadings file {path} needs a `loading` column and a `feature` or `performance_metrics` column")]
    Header { path: String },

    #[error("loadings file {path} has no usable rows")]
    Empty { path: String },

    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error(transparent)]
    Players(#[from] PlayerDataError),
}

// ---------------------------------------------------------------------------
// Public types
// ---------------------------------------------------------------------------

/// Header name used for the metric column of a loadings file.
///
/// Readers accept either; writers emit whichever the consumer expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoadingsColumn {
    #[default]
    Feature,
    PerformanceMetrics,
}

impl LoadingsColumn {
    pub fn header(&self) -> &'static str {
        match self {
            LoadingsColumn::Feature => "feature",
            LoadingsColumn::PerformanceMetrics => "performance_metrics",
        }
    }
}

/// One metric's weight.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricLoading {
    pub metric: String,
    pub loading: f64,
}

/// Metric → weight mapping, kept in generation order for stable output.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Loadings {
    entries: Vec<MetricLoading>,
}

impl Loadings {
    /// Build from (metric, weight) pairs. A repeated metric keeps its last
    /// weight.
    pub fn from_pairs<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        let mut entries: Vec<MetricLoading> = Vec::new();
        for (metric, loading) in pairs {
            let metric = metric.into();
            match entries.iter_mut().find(|e| e.metric == metric) {
                Some(existing) => existing.loading = loading,
                None => entries.push(MetricLoading { metric, loading }),
            }
        }
        Loadings { entries }
    }

    pub fn get(&self, metric: &str) -> Option<f64> {
        self.entries
            .iter()
            .find(|e| e.metric == metric)
            .map(|e| e.loading)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.entries.iter().map(|e| (e.metric.as_str(), e.loading))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn to_map(&self) -> HashMap<String, f64> {
        self.iter().map(|(m, l)| (m.to_string(), l)).collect()
    }

    /// Check that every metric in `metrics` has a weight.
    pub fn ensure_covers(&self, metrics: &MetricSet) -> Result<(), EngineError> {
        match metrics.iter().find(|m| self.get(m).is_none()) {
            Some(missing) => Err(EngineError::Schema {
                column: missing.to_string(),
            }),
            None => Ok(()),
        }
    }
}

// ---------------------------------------------------------------------------
// Generation
// ---------------------------------------------------------------------------

/// Derive loadings from a reference population.
///
/// Steps:
/// 1. Extract raw metric rows and multiply each column by its weight.
/// 2. Standardize every column against the population.
/// 3. Fit a single principal component; its coefficients are the loadings.
pub fn generate_loadings(
    players: &[Player],
    metrics: &MetricSet,
    weights: Option<&MetricWeights>,
) -> Result<Loadings, EngineError> {
    let mut rows = players
        .iter()
        .map(|p| p.stat_vector(metrics))
        .collect::<Result<Vec<_>, _>>()?;

    if let Some(weights) = weights {
        let factors: Vec<f64> = metrics.iter().map(|m| weights.weight(m)).collect();
        for row in &mut rows {
            for (x, w) in row.iter_mut().zip(&factors) {
                *x *= w;
            }
        }
    }

    let standardizer = Standardizer::fit_rows(&rows, metrics)?;
    let scaled: Vec<Vec<f64>> = rows.iter().map(|r| standardizer.transform_row(r)).collect();
    let component = first_principal_component(&scaled)?;

    info!(
        "Generated loadings for {} metrics from {} players",
        metrics.len(),
        players.len()
    );
    Ok(Loadings::from_pairs(
        metrics.iter().zip(component).map(|(m, l)| (m.to_string(), l)),
    ))
}

// ---------------------------------------------------------------------------
// Persistence
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
struct RawLoadingRow {
    #[serde(alias = "performance_metrics")]
    feature: String,
    loading: f64,
}

fn read_loadings<R: Read>(rdr: R, path: &str) -> Result<Loadings, LoadingsError> {
    let csv_err = |source| LoadingsError::Csv {
        path: path.to_string(),
        source,
    };
    let mut reader = csv::ReaderBuilder::new().trim(csv::Trim::All).from_reader(rdr);

    let headers = reader.headers().map_err(csv_err)?;
    let has_metric = headers
        .iter()
        .any(|h| h == "feature" || h == "performance_metrics");
    if !has_metric || !headers.iter().any(|h| h == "loading") {
        return Err(LoadingsError::Header {
            path: path.to_string(),
        });
    }

    let mut pairs = Vec::new();
    for result in reader.deserialize::<RawLoadingRow>() {
        match result {
            Ok(raw) if raw.loading.is_finite() && !raw.feature.is_empty() => {
                pairs.push((raw.feature, raw.loading));
            }
            Ok(raw) => warn!("skipping loading row for '{}': unusable value", raw.feature),
            Err(e) => warn!("skipping malformed loading row: {}", e),
        }
    }
    if pairs.is_empty() {
        return Err(LoadingsError::Empty {
            path: path.to_string(),
        });
    }
    Ok(Loadings::from_pairs(pairs))
}

/// Parse loadings from any reader (either header spelling).
pub fn load_loadings_from_reader<R: Read>(rdr: R) -> Result<Loadings, LoadingsError> {
    read_loadings(rdr, "<reader>")
}

/// Write loadings as `<column>,loading` rows.
pub fn write_loadings_to_writer<W: Write>(
    wtr: W,
    loadings: &Loadings,
    column: LoadingsColumn,
) -> Result<(), csv::Error> {
    let mut writer = csv::Writer::from_writer(wtr);
    writer.write_record([column.header(), "loading"])?;
    for (metric, loading) in loadings.iter() {
        writer.write_record([metric.to_string(), loading.to_string()])?;
    }
    writer.flush()?;
    Ok(())
}

/// Load persisted loadings.
pub fn load_loadings(path: &Path) -> Result<Loadings, LoadingsError> {
    let display = path.display().to_string();
    if !path.exists() {
        return Err(LoadingsError::NotFound { path: display });
    }
    let file = std::fs::File::open(path).map_err(|e| LoadingsError::Io {
        path: display.clone(),
        source: e,
    })?;
    read_loadings(file, &display)
}

/// Persist loadings, replacing any existing file.
pub fn write_loadings(
    path: &Path,
    loadings: &Loadings,
    column: LoadingsColumn,
) -> Result<(), LoadingsError> {
    let display = path.display().to_string();
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent).map_err(|e| LoadingsError::Io {
            path: display.clone(),
            source: e,
        })?;
    }
    let file = std::fs::File::create(path).map_err(|e| LoadingsError::Io {
        path: display.clone(),
        source: e,
    })?;
    write_loadings_to_writer(file, loadings, column).map_err(|e| LoadingsError::Csv {
        path: display,
        source: e,
    })
}

/// Settings for generating a loadings file on demand.
#[derive(Debug, Clone)]
pub struct LoadingsSpec<'a> {
    pub metrics: &'a MetricSet,
    pub weights: Option<&'a MetricWeights>,
    pub column: LoadingsColumn,
}

/// Return the loadings stored at `path`, generating and writing them first
/// if the file does not exist yet.
///
/// `reference` is only invoked on generation, so callers don't pay for
/// loading the reference population when the file is already there.
/// Concurrent writers are not coordinated; the last write wins.
pub fn load_or_generate_loadings<F>(
    path: &Path,
    spec: &LoadingsSpec<'_>,
    reference: F,
) -> Result<Loadings, LoadingsError>
where
    F: FnOnce() -> Result<PlayerTable, PlayerDataError>,
{
    if path.exists() {
        return load_loadings(path);
    }
    info!("No loadings at {}, generating from reference population", path.display());
    let population = reference()?;
    let loadings = generate_loadings(population.players(), spec.metrics, spec.weights)?;
    write_loadings(path, &loadings, spec.column)?;
    Ok(loadings)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use crate::players::position::Position;

    fn approx_eq(a: f64, b: f64, epsilon: f64) -> bool {
        (a - b).abs() < epsilon
    }

    fn population() -> Vec<Player> {
        // goals and assists move together; hits is mostly independent.
        let raw = [
            (10.0, 22.0, 80.0),
            (25.0, 51.0, 30.0),
            (3.0, 7.0, 120.0),
            (41.0, 80.0, 55.0),
            (17.0, 33.0, 90.0),
            (8.0, 18.0, 40.0),
            (30.0, 58.0, 70.0),
        ];
        raw.iter()
            .enumerate()
            .map(|(i, (g, a, h))| {
                Player::new(&format!("P{i}"), "TST", Position::Forward, 1_000_000)
                    .with_stat("goals", *g)
                    .with_stat("assists", *a)
                    .with_stat("hits", *h)
            })
            .collect()
    }

    fn metrics() -> MetricSet {
        MetricSet::new(["goals", "assists", "hits"])
    }

    #[test]
    fn one_loading_per_metric_with_unit_norm() {
        let loadings = generate_loadings(&population(), &metrics(), None).unwrap();
        assert_eq!(loadings.len(), 3);
        loadings.ensure_covers(&metrics()).unwrap();
        let norm: f64 = loadings.iter().map(|(_, l)| l * l).sum();
        assert!(approx_eq(norm, 1.0, 1e-9));
    }

    #[test]
    fn correlated_metrics_dominate_first_component() {
        let loadings = generate_loadings(&population(), &metrics(), None).unwrap();
        let goals = loadings.get("goals").unwrap();
        let assists = loadings.get("assists").unwrap();
        let hits = loadings.get("hits").unwrap();
        assert!(goals.signum() == assists.signum());
        assert!(goals.abs() > hits.abs());
        assert!(assists.abs() > hits.abs());
    }

    #[test]
    fn positive_weights_cancel_under_standardization() {
        // Scaling a column by a positive constant leaves its z-scores
        // unchanged, so the weighted fit matches the unweighted one.
        let plain = generate_loadings(&population(), &metrics(), None).unwrap();
        let weighted =
            generate_loadings(&population(), &metrics(), Some(&MetricWeights::defaults())).unwrap();
        for (metric, loading) in plain.iter() {
            assert!(approx_eq(weighted.get(metric).unwrap(), loading, 1e-9));
        }
    }

    #[test]
    fn missing_metric_fails_generation() {
        let err = generate_loadings(&population(), &MetricSet::new(["goals", "shifts"]), None)
            .unwrap_err();
        assert_eq!(
            err,
            EngineError::Schema {
                column: "shifts".into()
            }
        );
    }

    #[test]
    fn persisted_loadings_roundtrip() {
        let loadings = generate_loadings(&population(), &metrics(), None).unwrap();
        for column in [LoadingsColumn::Feature, LoadingsColumn::PerformanceMetrics] {
            let mut buf = Vec::new();
            write_loadings_to_writer(&mut buf, &loadings, column).unwrap();
            let text = String::from_utf8(buf.clone()).unwrap();
            assert!(text.starts_with(&format!("{},loading", column.header())));

            let reloaded = load_loadings_from_reader(buf.as_slice()).unwrap();
            assert_eq!(reloaded.to_map(), loadings.to_map());
        }
    }

    #[test]
    fn reload_is_order_independent() {
        let csv_data = "\
feature,loading
hits,0.25
goals,0.5";
        let loadings = load_loadings_from_reader(csv_data.as_bytes()).unwrap();
        let expected = Loadings::from_pairs([("goals", 0.5), ("hits", 0.25)]);
        assert_eq!(loadings.to_map(), expected.to_map());
    }

    #[test]
    fn unknown_header_rejected() {
        let csv_data = "\
metric,weight
goals,0.5";
        let err = load_loadings_from_reader(csv_data.as_bytes()).unwrap_err();
        assert!(matches!(err, LoadingsError::Header { .. }));
    }

    #[test]
    fn repeated_metric_keeps_last_value() {
        let csv_data = "\
feature,loading
goals,0.5
goals,0.7";
        let loadings = load_loadings_from_reader(csv_data.as_bytes()).unwrap();
        assert_eq!(loadings.len(), 1);
        assert_eq!(loadings.get("goals"), Some(0.7));
    }

    #[test]
    fn missing_file_is_not_found() {
        let path = std::env::temp_dir().join("rinkdraft_missing_loadings.csv");
        let _ = std::fs::remove_file(&path);
        assert!(matches!(load_loadings(&path), Err(LoadingsError::NotFound { .. })));
    }

    #[test]
    fn load_or_generate_writes_once_then_reads() {
        let dir = std::env::temp_dir().join("rinkdraft_loadings_lazy");
        let _ = std::fs::remove_dir_all(&dir);
        let path = dir.join("feature_loadings.csv");
        let metrics = metrics();
        let spec = LoadingsSpec {
            metrics: &metrics,
            weights: None,
            column: LoadingsColumn::Feature,
        };

        let first = load_or_generate_loadings(&path, &spec, || {
            Ok(PlayerTable::from_players(population()))
        })
        .unwrap();
        assert!(path.exists());

        let second = load_or_generate_loadings(&path, &spec, || {
            panic!("reference population should not be loaded when the file exists")
        })
        .unwrap();
        assert_eq!(first.to_map(), second.to_map());

        let _ = std::fs::remove_dir_all(&dir);
    }
}
