use crate::error::PipelineError;
use satisfaction_cleaning::TrainTestSplit;
use satisfaction_linear::{Regressor, TrainOptions};
use satisfaction_tracking::{ExperimentTracker, ModelSignature, TrackingError};
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const LINEAR_REGRESSION: &str = "LinearRegression";

/// The tracker key the fitted model artifact is recorded under.
pub const MODEL_ARTIFACT_KEY: &str = "linear_regression_model";

/// Selects the model family to fit, plus its pass-through hyperparameters. Immutable value object.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
	pub model_name: String,
	pub train_options: TrainOptions,
}

impl Default for ModelConfig {
	fn default() -> Self {
		Self {
			model_name: LINEAR_REGRESSION.to_owned(),
			train_options: TrainOptions::default(),
		}
	}
}

/// The closed set of model families the trainer can fit. Dispatch is by name with no fallback: a name that does not map to a variant fails before any training happens.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ModelVariant {
	LinearRegression,
}

#[derive(Debug, Error)]
#[error("unsupported model name \"{0}\"")]
pub struct UnsupportedModelError(pub String);

impl ModelConfig {
	pub fn variant(&self) -> Result<ModelVariant, UnsupportedModelError> {
		match self.model_name.as_str() {
			LINEAR_REGRESSION => Ok(ModelVariant::LinearRegression),
			_ => Err(UnsupportedModelError(self.model_name.clone())),
		}
	}
}

/// Fit the configured model family on the training partition, then record the hyperparameters and the fitted model with the experiment tracker.
pub fn train_model(
	split: &TrainTestSplit,
	config: &ModelConfig,
	tracker: &mut dyn ExperimentTracker,
) -> Result<Regressor, PipelineError> {
	let variant = config.variant()?;
	let model = match variant {
		ModelVariant::LinearRegression => Regressor::train(
			split.features_train.view(),
			split.labels_train.view(),
			&config.train_options,
		),
	};
	tracing::info!(
		model_name = config.model_name.as_str(),
		n_features = split.n_features(),
		n_examples = split.features_train.nrows(),
		"model trained"
	);
	let options = &config.train_options;
	tracker.log_metric("l2_regularization", f64::from(options.l2_regularization))?;
	tracker.log_metric("learning_rate", f64::from(options.learning_rate))?;
	tracker.log_metric("max_epochs", options.max_epochs as f64)?;
	tracker.log_metric("n_examples_per_batch", options.n_examples_per_batch as f64)?;
	let signature = ModelSignature {
		feature_names: split.feature_names.clone(),
		label_name: split.label_name.clone(),
	};
	let artifact = serde_json::to_value(&model).map_err(TrackingError::from)?;
	tracker.log_model(MODEL_ARTIFACT_KEY, artifact, signature)?;
	Ok(model)
}
