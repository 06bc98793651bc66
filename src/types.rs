use serde::{Deserialize, Serialize};

/// Field order of the feature vector handed to the classifier. Model
/// artifacts carry the same list and are rejected at load if it differs.
pub const FEATURE_NAMES: [&str; 12] = [
    "furl_length",
    "hostname_length",
    "has_ip",
    "count_dots",
    "count_hyphen",
    "count_at",
    "count_question",
    "count_slash",
    "count_digits",
    "count_special",
    "https",
    "suspicious_words",
];

pub const FEATURE_COUNT: usize = FEATURE_NAMES.len();

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FeatureRecord {
    pub furl_length: usize,
    pub hostname_length: usize,
    pub has_ip: u8,
    pub count_dots: usize,
    pub count_hyphen: usize,
    pub count_at: usize,
    pub count_question: usize,
    pub count_slash: usize,
    pub count_digits: usize,
    pub count_special: usize,
    pub https: u8,
    pub suspicious_words: usize,
}

impl FeatureRecord {
    /// Values in `FEATURE_NAMES` order.
    pub fn to_vector(&self) -> [f64; FEATURE_COUNT] {
        [
            self.furl_length as f64,
            self.hostname_length as f64,
            self.has_ip as f64,
            self.count_dots as f64,
            self.count_hyphen as f64,
            self.count_at as f64,
            self.count_question as f64,
            self.count_slash as f64,
            self.count_digits as f64,
            self.count_special as f64,
            self.https as f64,
            self.suspicious_words as f64,
        ]
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum Prediction {
    Phishing,
    Legitimate,
}

impl Prediction {
    pub fn from_class(class: usize) -> Option<Self> {
        match class {
            0 => Some(Prediction::Legitimate),
            1 => Some(Prediction::Phishing),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Prediction::Phishing => "Phishing",
            Prediction::Legitimate => "Legitimate",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PredictResponse {
    pub url: String,
    pub prediction: Prediction,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelInfo {
    pub kind: String,
    pub version: Option<String>,
    pub fingerprint: String,
    pub trees: Option<usize>,
}
