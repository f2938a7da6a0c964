// Configuration loading and parsing (league.toml, strategy.toml).

use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::analysis::loadings::{LoadingsColumn, LoadingsSpec};
use crate::analysis::metrics::{MetricSet, MetricWeights};
use crate::analysis::recommend::{Recommender, DEFAULT_NEIGHBORS};
use crate::draft::drafter::AiDrafter;
use crate::draft::roster::RosterQuota;
use crate::game::{TiePolicy, DEFAULT_SCALING_FACTOR};
use crate::players::position::Position;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: toml::de::Error,
    },

    #[error("validation error for field `{field}`: {message}")]
    ValidationError { field: String, message: String },

    #[error("failed to initialize config from defaults: {message}")]
    DefaultsCopyError { message: String },
}

// ---------------------------------------------------------------------------
// Top-level assembled Config
// ---------------------------------------------------------------------------

#[derive(Debug, Clone)]
pub struct Config {
    pub league: LeagueConfig,
    pub strategy: StrategyConfig,
    pub data_paths: DataPaths,
}

impl Config {
    /// An AI drafter using the configured cap, quota, reserve and
    /// similarity metrics.
    pub fn drafter(&self) -> AiDrafter {
        AiDrafter {
            metrics: self.strategy.similarity.metrics.clone(),
            quota: self.league.roster,
            salary_cap: self.league.salary_cap,
            reserve: self.strategy.draft.reserve,
            reserve_until_picks: self.strategy.draft.reserve_until_picks,
        }
    }

    /// A recommender for `group` using that group's similarity metrics.
    pub fn recommender(&self, group: Position) -> Recommender {
        let similarity = &self.strategy.similarity;
        let recommender = Recommender::new(group, similarity.metrics_for(group).clone());
        match self.strategy.similarity.pca_components {
            Some(k) => recommender.with_pca(k),
            None => recommender,
        }
    }

    pub fn loadings_spec(&self) -> LoadingsSpec<'_> {
        LoadingsSpec {
            metrics: &self.strategy.scoring.metrics,
            weights: self.strategy.scoring.weights.as_ref(),
            column: self.strategy.scoring.loadings_column,
        }
    }
}

// ---------------------------------------------------------------------------
// league.toml structs
// ---------------------------------------------------------------------------

/// Wrapper for the top-level `[league]` table in league.toml.
#[derive(Debug, Clone, Deserialize)]
struct LeagueFile {
    league: LeagueConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LeagueConfig {
    pub name: String,
    pub salary_cap: u64,
    #[serde(default = "default_scaling_factor")]
    pub scaling_factor: f64,
    #[serde(default)]
    pub tie_policy: TiePolicy,
    pub roster: RosterQuota,
}

fn default_scaling_factor() -> f64 {
    DEFAULT_SCALING_FACTOR
}

// ---------------------------------------------------------------------------
// strategy.toml structs
// ---------------------------------------------------------------------------

/// Raw deserialization target for the entire strategy.toml file.
#[derive(Debug, Clone, Deserialize)]
struct StrategyFile {
    draft: DraftConfig,
    scoring: ScoringConfig,
    similarity: SimilarityConfig,
    data_paths: DataPaths,
}

/// The public strategy config assembled from the strategy.toml sections.
#[derive(Debug, Clone)]
pub struct StrategyConfig {
    pub draft: DraftConfig,
    pub scoring: ScoringConfig,
    pub similarity: SimilarityConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct DraftConfig {
    pub reserve: u64,
    pub reserve_until_picks: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoringConfig {
    pub metrics: MetricSet,
    #[serde(default)]
    pub loadings_column: LoadingsColumn,
    /// Pre-standardization multipliers; absent means unweighted.
    #[serde(default)]
    pub weights: Option<MetricWeights>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SimilarityConfig {
    /// Shared metric list, used by the drafter and by any group without
    /// its own table.
    pub metrics: MetricSet,
    #[serde(default = "default_neighbors")]
    pub neighbors: usize,
    #[serde(default)]
    pub pca_components: Option<usize>,
    #[serde(default)]
    pub forward: Option<GroupSimilarity>,
    #[serde(default)]
    pub defense: Option<GroupSimilarity>,
    #[serde(default)]
    pub goalie: Option<GroupSimilarity>,
}

/// A `[similarity.<group>]` override table.
#[derive(Debug, Clone, Deserialize)]
pub struct GroupSimilarity {
    pub metrics: MetricSet,
}

impl SimilarityConfig {
    fn group_override(&self, group: Position) -> Option<&GroupSimilarity> {
        match group {
            Position::Forward => self.forward.as_ref(),
            Position::Defense => self.defense.as_ref(),
            Position::Goalie => self.goalie.as_ref(),
        }
    }

    /// Metrics the recommender for `group` compares on.
    pub fn metrics_for(&self, group: Position) -> &MetricSet {
        self.group_override(group)
            .map(|g| &g.metrics)
            .unwrap_or(&self.metrics)
    }
}

fn default_neighbors() -> usize {
    DEFAULT_NEIGHBORS
}

#[derive(Debug, Clone, Deserialize)]
pub struct DataPaths {
    pub forwards: String,
    pub defense: String,
    #[serde(default)]
    pub goalies: Option<String>,
    pub loadings: String,
}

impl DataPaths {
    /// Player CSVs that make up the loadings reference population.
    pub fn reference_files(&self) -> Vec<PathBuf> {
        vec![PathBuf::from(&self.forwards), PathBuf::from(&self.defense)]
    }

    /// Every configured player CSV, goalies included when set.
    pub fn player_files(&self) -> Vec<PathBuf> {
        let mut files = self.reference_files();
        if let Some(goalies) = &self.goalies {
            files.push(PathBuf::from(goalies));
        }
        files
    }
}

// ---------------------------------------------------------------------------
// Loading logic
// ---------------------------------------------------------------------------

/// Load and validate configuration from `config/league.toml` and
/// `config/strategy.toml`, relative to the given `base_dir`.
///
/// This does not auto-copy defaults. Prefer `load_config()` which handles
/// default initialization automatically.
pub fn load_config_from(base_dir: &Path) -> Result<Config, ConfigError> {
    let config_dir = base_dir.join("config");

    let league_path = config_dir.join("league.toml");
    let league_text = read_file(&league_path)?;
    let league_file: LeagueFile =
        toml::from_str(&league_text).map_err(|e| ConfigError::ParseError {
            path: league_path.clone(),
            source: e,
        })?;

    let strategy_path = config_dir.join("strategy.toml");
    let strategy_text = read_file(&strategy_path)?;
    let strategy_file: StrategyFile =
        toml::from_str(&strategy_text).map_err(|e| ConfigError::ParseError {
            path: strategy_path.clone(),
            source: e,
        })?;

    let config = Config {
        league: league_file.league,
        strategy: StrategyConfig {
            draft: strategy_file.draft,
            scoring: strategy_file.scoring,
            similarity: strategy_file.similarity,
        },
        data_paths: strategy_file.data_paths,
    };

    validate(&config)?;

    Ok(config)
}

/// Ensure all config files exist by copying missing ones from `defaults/`.
/// Returns the list of files that were copied. Existing files are never
/// overwritten.
pub fn ensure_config_files(base_dir: &Path) -> Result<Vec<PathBuf>, ConfigError> {
    let defaults_dir = base_dir.join("defaults");
    let config_dir = base_dir.join("config");

    if !defaults_dir.exists() {
        if !config_dir.exists() {
            return Err(ConfigError::DefaultsCopyError {
                message: format!(
                    "neither defaults/ nor config/ directory found in {}",
                    base_dir.display()
                ),
            });
        }
        return Ok(vec![]);
    }

    std::fs::create_dir_all(&config_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to create config directory: {e}"),
    })?;

    let entries = std::fs::read_dir(&defaults_dir).map_err(|e| ConfigError::DefaultsCopyError {
        message: format!("failed to read defaults directory: {e}"),
    })?;

    let mut copied = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| ConfigError::DefaultsCopyError {
            message: format!("failed to read defaults entry: {e}"),
        })?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let Some(file_name) = path.file_name() else {
            continue;
        };
        let target = config_dir.join(file_name);

        match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&target)
        {
            Ok(mut dest) => {
                let content = std::fs::read(&path).map_err(|e| ConfigError::DefaultsCopyError {
                    message: format!("failed to read {}: {e}", path.display()),
                })?;
                std::io::Write::write_all(&mut dest, &content).map_err(|e| {
                    ConfigError::DefaultsCopyError {
                        message: format!("failed to write {}: {e}", target.display()),
                    }
                })?;
                copied.push(target);
            }
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {}
            Err(e) => {
                return Err(ConfigError::DefaultsCopyError {
                    message: format!("failed to create {}: {e}", target.display()),
                });
            }
        }
    }

    Ok(copied)
}

/// Loads config relative to the current working directory, copying default
/// config files first.
pub fn load_config() -> Result<Config, ConfigError> {
    let cwd = std::env::current_dir().map_err(|_| ConfigError::FileNotFound {
        path: PathBuf::from("."),
    })?;
    ensure_config_files(&cwd)?;
    load_config_from(&cwd)
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
        path: path.to_path_buf(),
    })
}

fn invalid(field: &str, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        field: field.to_string(),
        message: message.into(),
    }
}

fn group_key(group: Position) -> &'static str {
    match group {
        Position::Forward => "forward",
        Position::Defense => "defense",
        Position::Goalie => "goalie",
    }
}

fn validate_metric_set(field: &str, metrics: &MetricSet) -> Result<(), ConfigError> {
    if metrics.is_empty() {
        return Err(invalid(field, "must list at least one metric"));
    }
    if let Some(dup) = metrics.first_duplicate() {
        return Err(invalid(field, format!("metric `{dup}` is listed twice")));
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

fn validate(config: &Config) -> Result<(), ConfigError> {
    let league = &config.league;
    if league.salary_cap == 0 {
        return Err(invalid("league.salary_cap", "must be greater than 0"));
    }
    if !league.scaling_factor.is_finite() || league.scaling_factor <= 0.0 {
        return Err(invalid(
            "league.scaling_factor",
            format!("must be finite and > 0, got {}", league.scaling_factor),
        ));
    }
    if league.roster.total() == 0 {
        return Err(invalid("league.roster", "must require at least one player"));
    }

    let strategy = &config.strategy;
    if strategy.draft.reserve >= league.salary_cap {
        return Err(invalid(
            "draft.reserve",
            format!(
                "must be below the salary cap ({}), got {}",
                league.salary_cap, strategy.draft.reserve
            ),
        ));
    }

    validate_metric_set("scoring.metrics", &strategy.scoring.metrics)?;
    if let Some(weights) = &strategy.scoring.weights {
        for (metric, w) in weights.iter() {
            if !w.is_finite() || w <= 0.0 {
                return Err(invalid(
                    &format!("scoring.weights.{metric}"),
                    format!("must be finite and > 0, got {w}"),
                ));
            }
        }
    }

    let similarity = &strategy.similarity;
    validate_metric_set("similarity.metrics", &similarity.metrics)?;
    for group in Position::ALL {
        if let Some(table) = similarity.group_override(group) {
            let field = format!("similarity.{}.metrics", group_key(group));
            validate_metric_set(&field, &table.metrics)?;
        }
    }
    if similarity.neighbors == 0 {
        return Err(invalid("similarity.neighbors", "must be greater than 0"));
    }
    if let Some(k) = similarity.pca_components {
        let narrowest = Position::ALL
            .iter()
            .map(|&g| similarity.metrics_for(g).len())
            .min()
            .unwrap_or(0);
        if k == 0 || k > narrowest {
            return Err(invalid(
                "similarity.pca_components",
                format!("must be between 1 and {narrowest} (the smallest metric count), got {k}"),
            ));
        }
    }

    Ok(())
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
