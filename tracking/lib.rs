/*!
This crate defines the narrow interface the pipeline uses to talk to an experiment tracker: [`ExperimentTracker::log_metric`](trait.ExperimentTracker.html) and [`ExperimentTracker::log_model`](trait.ExperimentTracker.html). The pipeline does not depend on any tracker storage format, only on these two operations succeeding or failing. [`InMemoryTracker`](struct.InMemoryTracker.html) records everything for a single run in memory, which is all the pipeline itself needs; a tracker backed by a real service implements the same trait.
*/

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TrackingError {
	#[error("failed to serialize the model artifact: {0}")]
	Serialize(#[from] serde_json::Error),
	#[error("failed to record to the experiment tracker: {0}")]
	Storage(String),
}

/// The feature and label columns a trained model was fitted against, recorded alongside the model artifact so a serving process can validate its inputs.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelSignature {
	pub feature_names: Vec<String>,
	pub label_name: String,
}

/// A single named metric value recorded during a run.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct MetricRecord {
	pub key: String,
	pub value: f64,
	pub logged_at: DateTime<Utc>,
}

impl MetricRecord {
	pub fn new(key: impl Into<String>, value: f64) -> Self {
		Self {
			key: key.into(),
			value,
			logged_at: Utc::now(),
		}
	}
}

/// A model artifact recorded during a run, stored as serialized json together with its signature.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArtifactRecord {
	pub key: String,
	pub model: serde_json::Value,
	pub signature: ModelSignature,
	pub logged_at: DateTime<Utc>,
}

pub trait ExperimentTracker {
	fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError>;
	fn log_model(
		&mut self,
		key: &str,
		model: serde_json::Value,
		signature: ModelSignature,
	) -> Result<(), TrackingError>;
}

/// An experiment tracker that keeps the records of one run in memory.
#[derive(Debug, Default)]
pub struct InMemoryTracker {
	run_id: String,
	metrics: Vec<MetricRecord>,
	artifacts: Vec<ArtifactRecord>,
}

impl InMemoryTracker {
	pub fn new(run_id: impl Into<String>) -> Self {
		Self {
			run_id: run_id.into(),
			metrics: Vec::new(),
			artifacts: Vec::new(),
		}
	}

	pub fn run_id(&self) -> &str {
		&self.run_id
	}

	/// Look up the most recently logged value for a metric key.
	pub fn metric(&self, key: &str) -> Option<f64> {
		self.metrics
			.iter()
			.rev()
			.find(|metric| metric.key == key)
			.map(|metric| metric.value)
	}

	pub fn metrics(&self) -> &[MetricRecord] {
		&self.metrics
	}

	pub fn artifact(&self, key: &str) -> Option<&ArtifactRecord> {
		self.artifacts
			.iter()
			.rev()
			.find(|artifact| artifact.key == key)
	}

	pub fn artifacts(&self) -> &[ArtifactRecord] {
		&self.artifacts
	}
}

impl ExperimentTracker for InMemoryTracker {
	fn log_metric(&mut self, key: &str, value: f64) -> Result<(), TrackingError> {
		self.metrics.push(MetricRecord::new(key, value));
		Ok(())
	}

	fn log_model(
		&mut self,
		key: &str,
		model: serde_json::Value,
		signature: ModelSignature,
	) -> Result<(), TrackingError> {
		self.artifacts.push(ArtifactRecord {
			key: key.to_owned(),
			model,
			signature,
			logged_at: Utc::now(),
		});
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_log_and_query_metric() {
		let mut tracker = InMemoryTracker::new("run-1");
		tracker.log_metric("r2", 0.5).unwrap();
		assert_eq!(tracker.metric("r2"), Some(0.5));
		assert_eq!(tracker.metric("mse"), None);
	}

	#[test]
	fn test_latest_metric_wins() {
		let mut tracker = InMemoryTracker::new("run-1");
		tracker.log_metric("r2", 0.5).unwrap();
		tracker.log_metric("r2", 0.7).unwrap();
		assert_eq!(tracker.metric("r2"), Some(0.7));
		assert_eq!(tracker.metrics().len(), 2);
	}

	#[test]
	fn test_log_model() {
		let mut tracker = InMemoryTracker::new("run-1");
		let signature = ModelSignature {
			feature_names: vec!["price".to_owned()],
			label_name: "review_score".to_owned(),
		};
		tracker
			.log_model(
				"linear_regression_model",
				serde_json::json!({"bias": 0.0}),
				signature.clone(),
			)
			.unwrap();
		let artifact = tracker.artifact("linear_regression_model").unwrap();
		assert_eq!(artifact.signature, signature);
		assert_eq!(artifact.model["bias"], 0.0);
	}
}
