/*!
This module defines the `Config` struct, which is used to configure a pipeline run with a yaml file. Every field is optional and falls back to the defaults of the component it configures.
*/

use crate::model::ModelConfig;
use anyhow::{Context, Result};
use num_traits::ToPrimitive;
use satisfaction_cleaning::SplitOptions;
use std::path::Path;

#[derive(Debug, Default, serde::Deserialize)]
pub struct Config {
	pub model_name: Option<String>,
	pub test_fraction: Option<f32>,
	pub shuffle: Option<Shuffle>,
	pub linear: Option<LinearOptions>,
	pub min_accuracy: Option<f32>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(untagged)]
pub enum Shuffle {
	Enabled(bool),
	Options { seed: u64 },
}

#[derive(Debug, serde::Deserialize)]
pub struct LinearOptions {
	pub l2_regularization: Option<f32>,
	pub learning_rate: Option<f32>,
	pub max_epochs: Option<u64>,
	pub n_examples_per_batch: Option<u64>,
}

impl Config {
	pub fn model_config(&self) -> ModelConfig {
		let mut model_config = ModelConfig::default();
		if let Some(model_name) = &self.model_name {
			model_config.model_name = model_name.clone();
		}
		if let Some(linear) = &self.linear {
			let train_options = &mut model_config.train_options;
			if let Some(l2_regularization) = linear.l2_regularization {
				train_options.l2_regularization = l2_regularization;
			}
			if let Some(learning_rate) = linear.learning_rate {
				train_options.learning_rate = learning_rate;
			}
			if let Some(max_epochs) = linear.max_epochs {
				train_options.max_epochs = max_epochs.to_usize().unwrap();
			}
			if let Some(n_examples_per_batch) = linear.n_examples_per_batch {
				train_options.n_examples_per_batch = n_examples_per_batch.to_usize().unwrap();
			}
		}
		model_config
	}

	pub fn split_options(&self) -> SplitOptions {
		let mut split_options = SplitOptions::default();
		if let Some(test_fraction) = self.test_fraction {
			split_options.test_fraction = test_fraction;
		}
		match &self.shuffle {
			Some(Shuffle::Enabled(enabled)) => split_options.shuffle = *enabled,
			Some(Shuffle::Options { seed }) => split_options.seed = *seed,
			None => {}
		}
		split_options
	}
}

/// Load the config from the config file, if provided.
pub fn load_config(config_path: Option<&Path>) -> Result<Option<Config>> {
	if let Some(config_path) = config_path {
		let config = std::fs::read_to_string(config_path)
			.with_context(|| format!("failed to read config file {}", config_path.display()))?;
		let config = serde_yaml::from_str(&config)
			.with_context(|| format!("failed to parse config file {}", config_path.display()))?;
		Ok(Some(config))
	} else {
		Ok(None)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_defaults() {
		let config = Config::default();
		let model_config = config.model_config();
		assert_eq!(model_config.model_name, "LinearRegression");
		let split_options = config.split_options();
		assert_eq!(split_options.test_fraction, 0.2);
		assert!(split_options.shuffle);
		assert_eq!(split_options.seed, 42);
	}

	#[test]
	fn test_parse_overrides() {
		let config: Config = serde_yaml::from_str(
			r#"
model_name: LinearRegression
test_fraction: 0.25
shuffle:
  seed: 7
linear:
  learning_rate: 0.01
  max_epochs: 10
min_accuracy: 0.8
"#,
		)
		.unwrap();
		let model_config = config.model_config();
		assert_eq!(model_config.train_options.learning_rate, 0.01);
		assert_eq!(model_config.train_options.max_epochs, 10);
		let split_options = config.split_options();
		assert_eq!(split_options.test_fraction, 0.25);
		assert_eq!(split_options.seed, 7);
		assert_eq!(config.min_accuracy, Some(0.8));
	}

	#[test]
	fn test_parse_shuffle_disabled() {
		let config: Config = serde_yaml::from_str("shuffle: false").unwrap();
		assert!(!config.split_options().shuffle);
	}
}
