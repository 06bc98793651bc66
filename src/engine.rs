use crate::error::{inference_error, AppError};
use crate::features;
use crate::model::Classifier;
use crate::types::{ModelInfo, PredictResponse, Prediction};
use std::borrow::Cow;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, info_span};
use uuid::Uuid;

/// Prepends `http://` unless the URL already starts with `http://` or
/// `https://` (exact, case-sensitive).
pub fn normalize_url(url: &str) -> Cow<'_, str> {
    if url.starts_with("http://") || url.starts_with("https://") {
        Cow::Borrowed(url)
    } else {
        Cow::Owned(format!("http://{}", url))
    }
}

/// Four decimal places, for display only.
pub fn round_confidence(confidence: f64) -> f64 {
    (confidence * 10_000.0).round() / 10_000.0
}

#[derive(Clone)]
pub struct PredictionEngine {
    classifier: Arc<dyn Classifier>,
}

impl PredictionEngine {
    pub fn new(classifier: Arc<dyn Classifier>) -> Self {
        Self { classifier }
    }

    pub fn model_info(&self) -> ModelInfo {
        self.classifier.info()
    }

    pub fn predict(&self, raw_url: Option<&str>) -> Result<PredictResponse, AppError> {
        let raw_url = match raw_url {
            Some(url) if !url.is_empty() => url,
            _ => return Err(AppError::MissingInput),
        };

        let request_id = Uuid::new_v4();
        let span = info_span!("predict", %request_id);
        let _guard = span.enter();
        let start = Instant::now();

        let url = normalize_url(raw_url);
        let record = features::extract(&url);
        debug!("Extracted features: {:?}", record);

        let classification = self.classifier.classify(&record);

        let prediction = Prediction::from_class(classification.predicted_class).ok_or_else(|| {
            inference_error(&format!(
                "classifier returned undefined class {}",
                classification.predicted_class
            ))
        })?;
        let confidence = classification
            .confidence()
            .filter(|p| p.is_finite() && (0.0..=1.0).contains(p))
            .ok_or_else(|| {
                inference_error(&format!(
                    "classifier returned invalid probabilities {:?}",
                    classification.probabilities
                ))
            })?;

        metrics::counter!("predictions_total", "prediction" => prediction.as_str()).increment(1);
        metrics::histogram!("prediction_duration_ms")
            .record(start.elapsed().as_secs_f64() * 1000.0);

        info!(
            "Prediction for {}: {} (confidence {:.4})",
            url,
            prediction.as_str(),
            confidence
        );

        Ok(PredictResponse {
            url: url.into_owned(),
            prediction,
            confidence: round_confidence(confidence),
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::model::Classification;
    use crate::types::FeatureRecord;
    use std::sync::Mutex;

    /// Returns a fixed classification and remembers what it was asked.
    pub(crate) struct StubClassifier {
        pub result: Classification,
        pub seen: Mutex<Vec<FeatureRecord>>,
    }

    impl StubClassifier {
        pub(crate) fn new(predicted_class: usize, probabilities: [f64; 2]) -> Self {
            Self {
                result: Classification {
                    predicted_class,
                    probabilities,
                },
                seen: Mutex::new(Vec::new()),
            }
        }
    }

    impl Classifier for StubClassifier {
        fn classify(&self, record: &FeatureRecord) -> Classification {
            self.seen.lock().unwrap().push(*record);
            self.result
        }

        fn info(&self) -> ModelInfo {
            ModelInfo {
                kind: "stub".to_string(),
                version: None,
                fingerprint: String::new(),
                trees: None,
            }
        }
    }

    #[test]
    fn test_normalize_url() {
        assert_eq!(normalize_url("example.com"), "http://example.com");
        assert_eq!(normalize_url("http://example.com"), "http://example.com");
        assert_eq!(normalize_url("https://example.com"), "https://example.com");
        assert_eq!(normalize_url("HTTPS://example.com"), "http://HTTPS://example.com");
        assert_eq!(normalize_url(" http://x"), "http:// http://x");
        assert_eq!(normalize_url("ftp://x"), "http://ftp://x");
    }

    #[test]
    fn test_normalize_is_idempotent() {
        for url in ["example.com", "http://a.b/c", "https://a.b/c?d=1", ""] {
            let once = normalize_url(url).into_owned();
            assert_eq!(normalize_url(&once), once);
        }
    }

    #[test]
    fn test_round_confidence() {
        assert_eq!(round_confidence(0.87654321), 0.8765);
        assert_eq!(round_confidence(0.99996), 1.0);
        assert_eq!(round_confidence(0.5), 0.5);
    }

    #[test]
    fn test_predict_missing_input() {
        let engine = PredictionEngine::new(Arc::new(StubClassifier::new(0, [1.0, 0.0])));
        assert!(matches!(engine.predict(None), Err(AppError::MissingInput)));
        assert!(matches!(engine.predict(Some("")), Err(AppError::MissingInput)));
    }

    #[test]
    fn test_predict_phishing() {
        let stub = Arc::new(StubClassifier::new(1, [0.123456, 0.876544]));
        let engine = PredictionEngine::new(stub.clone());

        let response = engine.predict(Some("paypal-login.example.com")).unwrap();
        assert_eq!(response.url, "http://paypal-login.example.com");
        assert_eq!(response.prediction, Prediction::Phishing);
        assert_eq!(response.confidence, 0.8765);

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert!(seen[0].suspicious_words >= 2);
        assert_eq!(seen[0].https, 0);
    }

    #[test]
    fn test_predict_legitimate_uses_predicted_class_probability() {
        let stub = Arc::new(StubClassifier::new(0, [0.61, 0.39]));
        let engine = PredictionEngine::new(stub.clone());

        let response = engine.predict(Some("https://192.168.0.1/verify")).unwrap();
        assert_eq!(response.url, "https://192.168.0.1/verify");
        assert_eq!(response.prediction, Prediction::Legitimate);
        assert_eq!(response.confidence, 0.61);

        let seen = stub.seen.lock().unwrap();
        assert_eq!(seen[0].has_ip, 1);
        assert_eq!(seen[0].https, 1);
        assert!(seen[0].suspicious_words >= 1);
    }

    #[test]
    fn test_out_of_contract_classifier_output() {
        let engine = PredictionEngine::new(Arc::new(StubClassifier::new(2, [0.5, 0.5])));
        assert!(matches!(
            engine.predict(Some("example.com")),
            Err(AppError::ModelInference(_))
        ));

        let engine = PredictionEngine::new(Arc::new(StubClassifier::new(1, [0.0, f64::NAN])));
        assert!(matches!(
            engine.predict(Some("example.com")),
            Err(AppError::ModelInference(_))
        ));
    }
}
