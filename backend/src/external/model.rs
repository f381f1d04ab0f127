//! Gradient-boosted tree model loaded from an XGBoost JSON artifact
//!
//! Only inference is supported. The artifact is the document written by
//! `XGBRegressor.save_model("*.json")`: an additive ensemble of regression
//! trees stored as parallel arrays, plus a global base score.
//!
//! A node is a leaf when its left child is `-1`; its value is then stored in
//! `split_conditions`. Internal nodes send a sample left when
//! `value < split_condition`, and missing values follow `default_left`.
//! Thresholds, leaves and inputs are compared in single precision, as the
//! library stores them.

use std::path::Path;

use serde::Deserialize;
use shared::{FeatureVector, PredictionError, PredictionModel};
use thiserror::Error;

/// Model artifact could not be loaded
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("model file '{0}' not found")]
    NotFound(String),

    #[error("failed to read model file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid model JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("invalid model: {0}")]
    Invalid(String),

    #[error("unsupported objective '{0}'")]
    UnsupportedObjective(String),
}

// ============================================================================
// Artifact schema
// ============================================================================

#[derive(Debug, Deserialize)]
struct XgbDocument {
    learner: XgbLearner,
}

#[derive(Debug, Deserialize)]
struct XgbLearner {
    #[serde(default)]
    feature_names: Vec<String>,
    gradient_booster: XgbBooster,
    learner_model_param: XgbModelParam,
    #[serde(default)]
    objective: Option<XgbObjective>,
}

#[derive(Debug, Deserialize)]
struct XgbBooster {
    #[serde(default)]
    name: Option<String>,
    model: XgbTreeModel,
}

#[derive(Debug, Deserialize)]
struct XgbTreeModel {
    trees: Vec<XgbTree>,
}

#[derive(Debug, Deserialize)]
struct XgbTree {
    left_children: Vec<i32>,
    right_children: Vec<i32>,
    split_indices: Vec<i64>,
    split_conditions: Vec<f64>,
    #[serde(default)]
    default_left: Vec<Flag>,
}

#[derive(Debug, Deserialize)]
struct XgbModelParam {
    base_score: String,
    #[serde(default)]
    num_feature: Option<String>,
}

#[derive(Debug, Deserialize)]
struct XgbObjective {
    name: String,
}

// Older writers store flags as 0/1, newer ones as booleans.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Flag {
    Bool(bool),
    Int(i64),
}

impl Flag {
    fn is_set(&self) -> bool {
        match self {
            Flag::Bool(b) => *b,
            Flag::Int(i) => *i != 0,
        }
    }
}

// ============================================================================
// Inference structures
// ============================================================================

/// How the summed margin maps to a prediction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Link {
    Identity,
    Log,
}

/// Node in a boosted regression tree
#[derive(Debug, Clone)]
struct TreeNode {
    /// Feature column, `None` for leaves
    feature: Option<usize>,
    /// Split threshold, or the leaf value
    value: f32,
    left: usize,
    right: usize,
    default_left: bool,
}

#[derive(Debug, Clone)]
pub struct RegressionTree {
    nodes: Vec<TreeNode>,
}

impl RegressionTree {
    fn from_artifact(idx: usize, tree: XgbTree) -> Result<Self, ModelError> {
        let n = tree.left_children.len();
        if n == 0 {
            return Err(ModelError::Invalid(format!("tree {} has no nodes", idx)));
        }
        if tree.right_children.len() != n
            || tree.split_indices.len() != n
            || tree.split_conditions.len() != n
            || (!tree.default_left.is_empty() && tree.default_left.len() != n)
        {
            return Err(ModelError::Invalid(format!(
                "tree {} has inconsistent array lengths",
                idx
            )));
        }

        let child = |c: i32| -> Result<usize, ModelError> {
            usize::try_from(c)
                .ok()
                .filter(|&c| c < n)
                .ok_or_else(|| ModelError::Invalid(format!("tree {} references node {}", idx, c)))
        };

        let mut nodes = Vec::with_capacity(n);
        for i in 0..n {
            let node = if tree.left_children[i] == -1 {
                TreeNode {
                    feature: None,
                    value: tree.split_conditions[i] as f32,
                    left: 0,
                    right: 0,
                    default_left: false,
                }
            } else {
                let feature = usize::try_from(tree.split_indices[i]).map_err(|_| {
                    ModelError::Invalid(format!("tree {} has a negative split index", idx))
                })?;
                TreeNode {
                    feature: Some(feature),
                    value: tree.split_conditions[i] as f32,
                    left: child(tree.left_children[i])?,
                    right: child(tree.right_children[i])?,
                    default_left: tree.default_left.get(i).map(Flag::is_set).unwrap_or(true),
                }
            };
            nodes.push(node);
        }

        Ok(Self { nodes })
    }

    /// Leaf value reached by `row`.
    fn predict(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut idx = 0usize;
        // A well-formed tree reaches a leaf in fewer steps than it has nodes.
        for _ in 0..=self.nodes.len() {
            let node = &self.nodes[idx];
            let Some(feature) = node.feature else {
                return Ok(f64::from(node.value));
            };
            let go_left = match row.get(feature).copied() {
                Some(v) if !v.is_nan() => (v as f32) < node.value,
                _ => node.default_left,
            };
            idx = if go_left { node.left } else { node.right };
        }
        Err(PredictionError::Evaluation("tree contains a cycle".to_string()))
    }

    pub fn max_feature_index(&self) -> Option<usize> {
        self.nodes.iter().filter_map(|n| n.feature).max()
    }
}

/// Additive tree ensemble
#[derive(Debug, Clone)]
pub struct XgbModel {
    trees: Vec<RegressionTree>,
    base_margin: f64,
    link: Link,
    feature_names: Vec<String>,
    num_features: usize,
    objective: String,
}

impl XgbModel {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ModelError> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ModelError::NotFound(path.display().to_string()));
        }
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn from_json_str(json: &str) -> Result<Self, ModelError> {
        let doc: XgbDocument = serde_json::from_str(json)?;
        let learner = doc.learner;

        if let Some(name) = learner.gradient_booster.name.as_deref() {
            if name != "gbtree" {
                return Err(ModelError::Invalid(format!("unsupported booster '{}'", name)));
            }
        }

        let objective = learner
            .objective
            .map(|o| o.name)
            .unwrap_or_else(|| "reg:squarederror".to_string());
        let link = match objective.as_str() {
            "reg:squarederror" | "reg:linear" | "reg:absoluteerror" | "reg:pseudohubererror"
            | "reg:quantileerror" => Link::Identity,
            "count:poisson" | "reg:gamma" | "reg:tweedie" => Link::Log,
            other => return Err(ModelError::UnsupportedObjective(other.to_string())),
        };

        let base_score = parse_base_score(&learner.learner_model_param.base_score)?;
        let base_margin = match link {
            Link::Identity => base_score,
            Link::Log if base_score > 0.0 => base_score.ln(),
            Link::Log => {
                return Err(ModelError::Invalid(
                    "log-link base_score must be positive".to_string(),
                ))
            }
        };

        let trees = learner
            .gradient_booster
            .model
            .trees
            .into_iter()
            .enumerate()
            .map(|(i, t)| RegressionTree::from_artifact(i, t))
            .collect::<Result<Vec<_>, _>>()?;
        if trees.is_empty() {
            return Err(ModelError::Invalid("model has no trees".to_string()));
        }

        let used = trees
            .iter()
            .filter_map(RegressionTree::max_feature_index)
            .max()
            .map(|m| m + 1)
            .unwrap_or(0);
        let declared = learner
            .learner_model_param
            .num_feature
            .as_deref()
            .and_then(|n| n.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let num_features = declared.max(used).max(learner.feature_names.len());

        if !learner.feature_names.is_empty() && used > learner.feature_names.len() {
            return Err(ModelError::Invalid(format!(
                "trees split on feature {} but only {} names are declared",
                used - 1,
                learner.feature_names.len()
            )));
        }

        Ok(Self {
            trees,
            base_margin,
            link,
            feature_names: learner.feature_names,
            num_features,
            objective,
        })
    }

    pub fn n_trees(&self) -> usize {
        self.trees.len()
    }

    pub fn num_features(&self) -> usize {
        self.num_features
    }

    pub fn link(&self) -> Link {
        self.link
    }

    /// Lay the vector out in the model's column order.
    ///
    /// Named models are aligned by column name; unnamed models take the
    /// vector's own order and must agree on width.
    fn align(&self, features: &FeatureVector) -> Result<Vec<f64>, PredictionError> {
        if self.feature_names.is_empty() {
            let values = features.values();
            if values.len() != self.num_features {
                return Err(PredictionError::FeatureCount {
                    expected: self.num_features,
                    actual: values.len(),
                });
            }
            return Ok(values);
        }

        self.feature_names
            .iter()
            .map(|name| {
                features
                    .get(name)
                    .ok_or_else(|| PredictionError::MissingFeature(name.clone()))
            })
            .collect()
    }

    /// Raw prediction for an already aligned row.
    pub fn predict_row(&self, row: &[f64]) -> Result<f64, PredictionError> {
        let mut margin = self.base_margin;
        for tree in &self.trees {
            margin += tree.predict(row)?;
        }
        let output = match self.link {
            Link::Identity => margin,
            Link::Log => margin.exp(),
        };
        if output.is_finite() {
            Ok(output)
        } else {
            Err(PredictionError::NonFiniteOutput)
        }
    }
}

impl PredictionModel for XgbModel {
    fn predict(&self, features: &FeatureVector) -> Result<f64, PredictionError> {
        let row = self.align(features)?;
        self.predict_row(&row)
    }

    fn describe(&self) -> String {
        format!(
            "xgboost {} ({} trees, {} features)",
            self.objective,
            self.trees.len(),
            self.num_features
        )
    }
}

/// `base_score` is a decimal string, bracketed in newer writers (`"[2.5E1]"`).
fn parse_base_score(raw: &str) -> Result<f64, ModelError> {
    let trimmed = raw.trim().trim_start_matches('[').trim_end_matches(']');
    let first = trimmed.split(',').next().unwrap_or("").trim();
    first
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| ModelError::Invalid(format!("bad base_score '{}'", raw)))
}
