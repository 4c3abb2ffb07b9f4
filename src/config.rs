//! Grading configuration.
//!
//! Stored as a JSON document on disk:
//! ```json
//! {
//!   "paths": { "input_csv": "data/input.csv", "output_dir": "reports" },
//!   "grade_weights": { "quiz": 0.25, "midterm": 0.30, "final": 0.30, "attendance": 0.15 },
//!   "thresholds": { "at_risk_grade": 65.0 },
//!   "grading_scale": { "A": 93.0, "B": 83.0, "C": 73.0, "D": 60.0, "F": 0.0 }
//! }
//! ```
//! `paths` and `thresholds` may be omitted.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::ConfigError;

pub const DEFAULT_AT_RISK_GRADE: f64 = 65.0;

/// Label returned when the grading scale defines no grades at all.
pub const FALLBACK_GRADE: &str = "F";

/// A weighted part of the final score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Component {
    Quiz,
    Midterm,
    Final,
    Attendance,
}

impl Component {
    pub fn from_key(key: &str) -> Option<Self> {
        match key.trim() {
            "quiz" => Some(Component::Quiz),
            "midterm" => Some(Component::Midterm),
            "final" => Some(Component::Final),
            "attendance" => Some(Component::Attendance),
            _ => None,
        }
    }

    pub fn key(&self) -> &'static str {
        match self {
            Component::Quiz => "quiz",
            Component::Midterm => "midterm",
            Component::Final => "final",
            Component::Attendance => "attendance",
        }
    }
}

/// Component weights. Expected to sum to 1.0; a mismatch is only logged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct GradeWeights {
    weights: BTreeMap<Component, f64>,
}

impl GradeWeights {
    pub fn new(entries: impl IntoIterator<Item = (Component, f64)>) -> Result<Self, ConfigError> {
        let mut weights = BTreeMap::new();
        for (component, weight) in entries {
            if !weight.is_finite() || weight < 0.0 {
                return Err(ConfigError::Invalid(format!(
                    "weight for `{}` must be a non-negative number, got {weight}",
                    component.key()
                )));
            }
            weights.insert(component, weight);
        }
        Ok(Self { weights })
    }

    /// Iterates `(component, weight)` pairs in a fixed component order.
    pub fn iter(&self) -> impl Iterator<Item = (Component, f64)> + '_ {
        self.weights.iter().map(|(c, w)| (*c, *w))
    }

    pub fn get(&self, component: Component) -> Option<f64> {
        self.weights.get(&component).copied()
    }

    pub fn total(&self) -> f64 {
        self.weights.values().sum()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

impl TryFrom<BTreeMap<String, f64>> for GradeWeights {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        let mut known = Vec::with_capacity(raw.len());
        for (key, weight) in raw {
            match Component::from_key(&key) {
                Some(component) => known.push((component, weight)),
                None => warn!(component = %key, "Ignoring weight for unknown grade component"),
            }
        }
        GradeWeights::new(known)
    }
}

/// One row of the grading scale: the minimum score that earns `label`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeBand {
    pub label: String,
    pub min_score: f64,
}

/// Grade labels sorted by threshold, highest first.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, f64>")]
pub struct GradingScale {
    bands: Vec<GradeBand>,
}

impl GradingScale {
    pub fn new(entries: impl IntoIterator<Item = (String, f64)>) -> Result<Self, ConfigError> {
        let mut bands = Vec::new();
        for (label, min_score) in entries {
            let label = label.trim().to_string();
            if label.is_empty() {
                return Err(ConfigError::Invalid(
                    "grading scale labels cannot be empty".to_string(),
                ));
            }
            if !min_score.is_finite() {
                return Err(ConfigError::Invalid(format!(
                    "threshold for grade `{label}` must be a number, got {min_score}"
                )));
            }
            bands.push(GradeBand { label, min_score });
        }

        bands.sort_by(|a, b| match b.min_score.total_cmp(&a.min_score) {
            Ordering::Equal => a.label.cmp(&b.label),
            other => other,
        });

        Ok(Self { bands })
    }

    pub fn bands(&self) -> &[GradeBand] {
        &self.bands
    }

    /// Label for scores below every threshold: the lowest defined grade.
    pub fn fallback_label(&self) -> &str {
        self.bands
            .last()
            .map(|b| b.label.as_str())
            .unwrap_or(FALLBACK_GRADE)
    }

    pub fn labels(&self) -> impl Iterator<Item = &str> {
        self.bands.iter().map(|b| b.label.as_str())
    }
}

impl TryFrom<BTreeMap<String, f64>> for GradingScale {
    type Error = ConfigError;

    fn try_from(raw: BTreeMap<String, f64>) -> Result<Self, Self::Error> {
        GradingScale::new(raw)
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Thresholds {
    #[serde(default = "default_at_risk_grade")]
    pub at_risk_grade: f64,
}

impl Default for Thresholds {
    fn default() -> Self {
        Self {
            at_risk_grade: DEFAULT_AT_RISK_GRADE,
        }
    }
}

fn default_at_risk_grade() -> f64 {
    DEFAULT_AT_RISK_GRADE
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Paths {
    #[serde(default = "default_input_csv")]
    pub input_csv: PathBuf,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for Paths {
    fn default() -> Self {
        Self {
            input_csv: default_input_csv(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_input_csv() -> PathBuf {
    PathBuf::from("data/input.csv")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("reports")
}

/// The full configuration document.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub paths: Paths,
    pub grade_weights: GradeWeights,
    pub grading_scale: GradingScale,
    #[serde(default)]
    pub thresholds: Thresholds,
}

impl Config {
    /// Loads the config from a JSON file at `path`.
    ///
    /// Relative entries under `paths` are resolved against the directory
    /// holding the config file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let shown = path.display().to_string();

        let content = std::fs::read_to_string(path).map_err(|source| {
            if source.kind() == std::io::ErrorKind::NotFound {
                ConfigError::NotFound {
                    path: shown.clone(),
                }
            } else {
                ConfigError::Io {
                    path: shown.clone(),
                    source,
                }
            }
        })?;

        let mut config = Self::from_json_str(&content).map_err(|err| match err {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: shown.clone(),
                source,
            },
            other => other,
        })?;

        if let Some(base) = path.parent() {
            config.paths.input_csv = resolve(base, &config.paths.input_csv);
            config.paths.output_dir = resolve(base, &config.paths.output_dir);
        }

        info!(path = %shown, "Configuration loaded");
        Ok(config)
    }

    /// Parses and validates a configuration document.
    pub fn from_json_str(content: &str) -> Result<Self, ConfigError> {
        let config: Config =
            serde_json::from_str(content).map_err(|source| ConfigError::Parse {
                path: "<inline>".to_string(),
                source,
            })?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if !self.thresholds.at_risk_grade.is_finite() {
            return Err(ConfigError::Invalid(format!(
                "thresholds.at_risk_grade must be a number, got {}",
                self.thresholds.at_risk_grade
            )));
        }

        if self.grade_weights.is_empty() {
            warn!("No grade weights configured; every final score will be 0");
        }

        let total = self.grade_weights.total();
        if (total - 1.0).abs() > 1e-6 {
            warn!(total, "Grade weights do not sum to 1.0");
        }

        if self.grading_scale.bands().is_empty() {
            warn!(fallback = FALLBACK_GRADE, "Grading scale is empty");
        }

        debug!(
            weights = self.grade_weights.iter().count(),
            grades = self.grading_scale.bands().len(),
            at_risk_grade = self.thresholds.at_risk_grade,
            "Configuration validated"
        );
        Ok(())
    }
}

fn resolve(base: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}
