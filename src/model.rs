use crate::error::AppError;
use crate::types::{FeatureRecord, ModelInfo, FEATURE_COUNT, FEATURE_NAMES};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::{fs, path::Path, sync::Arc};
use tracing::info;

/// Output of a classifier for one feature record.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Classification {
    pub predicted_class: usize,
    pub probabilities: [f64; 2],
}

impl Classification {
    /// Probability mass on the predicted class.
    pub fn confidence(&self) -> Option<f64> {
        self.probabilities.get(self.predicted_class).copied()
    }
}

/// A trained binary classifier, loaded once and shared read-only by every request.
pub trait Classifier: Send + Sync {
    fn classify(&self, record: &FeatureRecord) -> Classification;

    fn info(&self) -> ModelInfo;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelArtifact {
    RandomForest(ForestArtifact),
    Logistic(LogisticArtifact),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForestArtifact {
    #[serde(default)]
    pub version: Option<String>,
    pub feature_order: Vec<String>,
    pub trees: Vec<Tree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Tree {
    pub nodes: Vec<Node>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Node {
    Split {
        feature: usize,
        threshold: f64,
        left: usize,
        right: usize,
    },
    Leaf {
        value: Vec<f64>,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LogisticArtifact {
    #[serde(default)]
    pub version: Option<String>,
    pub feature_order: Vec<String>,
    pub intercept: f64,
    pub weights: Vec<f64>,
}

/// Reads, validates and fingerprints a model artifact. Any failure means the
/// service has nothing to serve with.
pub fn load(path: impl AsRef<Path>) -> Result<Arc<dyn Classifier>, AppError> {
    let path = path.as_ref();
    let bytes = fs::read(path).map_err(|e| {
        AppError::OracleUnavailable(format!("failed to read {}: {}", path.display(), e))
    })?;
    let fingerprint = hex::encode(Sha256::digest(&bytes));

    let artifact: ModelArtifact = serde_json::from_slice(&bytes).map_err(|e| {
        AppError::OracleUnavailable(format!("failed to parse {}: {}", path.display(), e))
    })?;

    let classifier = from_artifact(artifact, fingerprint)?;
    let info = classifier.info();
    info!(
        "Loaded {} model from {} (version {}, sha256 {})",
        info.kind,
        path.display(),
        info.version.as_deref().unwrap_or("unversioned"),
        info.fingerprint
    );
    Ok(classifier)
}

pub fn from_artifact(
    artifact: ModelArtifact,
    fingerprint: String,
) -> Result<Arc<dyn Classifier>, AppError> {
    match artifact {
        ModelArtifact::RandomForest(forest) => {
            Ok(Arc::new(RandomForest::new(forest, fingerprint)?))
        }
        ModelArtifact::Logistic(logistic) => {
            Ok(Arc::new(LogisticModel::new(logistic, fingerprint)?))
        }
    }
}

fn unavailable(msg: String) -> AppError {
    AppError::OracleUnavailable(msg)
}

fn check_feature_order(order: &[String]) -> Result<(), AppError> {
    let matches = order.len() == FEATURE_COUNT
        && order.iter().zip(FEATURE_NAMES.iter()).all(|(a, b)| a == b);
    if !matches {
        return Err(unavailable(format!(
            "feature order {:?} does not match {:?}",
            order, FEATURE_NAMES
        )));
    }
    Ok(())
}

pub struct RandomForest {
    trees: Vec<Tree>,
    version: Option<String>,
    fingerprint: String,
}

impl RandomForest {
    pub fn new(artifact: ForestArtifact, fingerprint: String) -> Result<Self, AppError> {
        check_feature_order(&artifact.feature_order)?;
        if artifact.trees.is_empty() {
            return Err(unavailable("forest has no trees".to_string()));
        }
        for (t, tree) in artifact.trees.iter().enumerate() {
            validate_tree(tree).map_err(|e| unavailable(format!("tree {}: {}", t, e)))?;
        }

        Ok(Self {
            trees: artifact.trees,
            version: artifact.version,
            fingerprint,
        })
    }

    fn leaf_distribution(tree: &Tree, x: &[f64; FEATURE_COUNT]) -> [f64; 2] {
        let mut idx = 0;
        loop {
            match &tree.nodes[idx] {
                Node::Split {
                    feature,
                    threshold,
                    left,
                    right,
                } => {
                    idx = if x[*feature] <= *threshold { *left } else { *right };
                }
                Node::Leaf { value } => {
                    let total = value[0] + value[1];
                    return [value[0] / total, value[1] / total];
                }
            }
        }
    }
}

// Children must point forward so every walk terminates at a leaf.
fn validate_tree(tree: &Tree) -> Result<(), String> {
    if tree.nodes.is_empty() {
        return Err("no nodes".to_string());
    }
    for (i, node) in tree.nodes.iter().enumerate() {
        match node {
            Node::Split {
                feature,
                threshold,
                left,
                right,
            } => {
                if *feature >= FEATURE_COUNT {
                    return Err(format!("node {} splits on unknown feature {}", i, feature));
                }
                if !threshold.is_finite() {
                    return Err(format!("node {} has a non-finite threshold", i));
                }
                for child in [*left, *right] {
                    if child <= i || child >= tree.nodes.len() {
                        return Err(format!("node {} has invalid child {}", i, child));
                    }
                }
            }
            Node::Leaf { value } => {
                let valid = value.len() == 2
                    && value.iter().all(|v| v.is_finite() && *v >= 0.0)
                    && value.iter().sum::<f64>() > 0.0;
                if !valid {
                    return Err(format!("node {} has an invalid leaf {:?}", i, value));
                }
            }
        }
    }
    Ok(())
}

impl Classifier for RandomForest {
    fn classify(&self, record: &FeatureRecord) -> Classification {
        let x = record.to_vector();
        let mut sum = [0.0_f64; 2];
        for tree in &self.trees {
            let dist = Self::leaf_distribution(tree, &x);
            sum[0] += dist[0];
            sum[1] += dist[1];
        }
        let n = self.trees.len() as f64;
        let probabilities = [sum[0] / n, sum[1] / n];

        // Ties go to class 0.
        let predicted_class = usize::from(probabilities[1] > probabilities[0]);
        Classification {
            predicted_class,
            probabilities,
        }
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: "random_forest".to_string(),
            version: self.version.clone(),
            fingerprint: self.fingerprint.clone(),
            trees: Some(self.trees.len()),
        }
    }
}

pub struct LogisticModel {
    intercept: f64,
    weights: [f64; FEATURE_COUNT],
    version: Option<String>,
    fingerprint: String,
}

impl LogisticModel {
    pub fn new(artifact: LogisticArtifact, fingerprint: String) -> Result<Self, AppError> {
        check_feature_order(&artifact.feature_order)?;
        let weights: [f64; FEATURE_COUNT] =
            artifact.weights.as_slice().try_into().map_err(|_| {
                unavailable(format!(
                    "expected {} weights, got {}",
                    FEATURE_COUNT,
                    artifact.weights.len()
                ))
            })?;
        if !artifact.intercept.is_finite() || weights.iter().any(|w| !w.is_finite()) {
            return Err(unavailable("non-finite coefficients".to_string()));
        }

        Ok(Self {
            intercept: artifact.intercept,
            weights,
            version: artifact.version,
            fingerprint,
        })
    }

    fn sigmoid(x: f64) -> f64 {
        1.0 / (1.0 + (-x).exp())
    }
}

impl Classifier for LogisticModel {
    fn classify(&self, record: &FeatureRecord) -> Classification {
        let z = record
            .to_vector()
            .iter()
            .zip(self.weights.iter())
            .fold(self.intercept, |acc, (x, w)| acc + x * w);
        let p1 = Self::sigmoid(z);

        Classification {
            predicted_class: usize::from(z > 0.0),
            probabilities: [1.0 - p1, p1],
        }
    }

    fn info(&self) -> ModelInfo {
        ModelInfo {
            kind: "logistic".to_string(),
            version: self.version.clone(),
            fingerprint: self.fingerprint.clone(),
            trees: None,
        }
    }
}
