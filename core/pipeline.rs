/*!
This module orders the pipeline steps into the two flows: [`training_pipeline`](fn.training_pipeline.html) trains and evaluates a model, and [`continuous_deployment_pipeline`](fn.continuous_deployment_pipeline.html) additionally gates on the r2 score and hands the model to the deployer. Both flows are straight line sequences: the first failing step logs its error and aborts the rest of the flow, and nothing is retried or rolled back.
*/

use crate::config::Config;
use crate::error::PipelineError;
use crate::evaluate::evaluate_model;
use crate::model::train_model;
use crate::trigger::deployment_trigger;
use satisfaction_cleaning::{CleanStrategy, SplitOptions, StrategyOutput, TrainTestSplit};
use satisfaction_dataframe::{DataFrame, FromCsvOptions};
use satisfaction_deploy::{Deployment, ModelDeployer, ServiceHandle};
use satisfaction_linear::Regressor;
use satisfaction_metrics::RegressionMetricsOutput;
use satisfaction_tracking::{ExperimentTracker, TrackingError};
use std::path::Path;

pub const PIPELINE_NAME: &str = "continuous_deployment_pipeline";
pub const DEPLOY_STEP_NAME: &str = "deploy_model";
pub const MODEL_NAME: &str = "model";

/// The artifacts produced by a training run.
#[derive(Debug)]
pub struct TrainingOutput {
	pub model: Regressor,
	pub metrics: RegressionMetricsOutput,
}

#[derive(Debug, Clone)]
pub struct DeployOptions {
	/// The minimum r2 score a model must exceed to be deployed.
	pub min_accuracy: f32,
	pub workers: usize,
	/// Seconds the deployer waits for the service to start or stop.
	pub timeout: u64,
}

impl Default for DeployOptions {
	fn default() -> Self {
		Self {
			min_accuracy: 0.5,
			workers: 1,
			timeout: 60,
		}
	}
}

/// The artifacts produced by a continuous deployment run.
#[derive(Debug)]
pub struct DeploymentOutput {
	pub metrics: RegressionMetricsOutput,
	pub decision: bool,
	pub service: Option<ServiceHandle>,
}

/// Read the dataset from the given path.
pub fn ingest_data(data_path: &Path) -> Result<DataFrame, PipelineError> {
	tracing::info!(path = %data_path.display(), "ingesting data");
	let data = DataFrame::from_path(data_path, FromCsvOptions::default())?;
	tracing::info!(
		n_rows = data.nrows(),
		n_columns = data.ncols(),
		"data ingested"
	);
	Ok(data)
}

/// Preprocess the dataset and split it into train and test partitions.
pub fn clean_data(
	data: DataFrame,
	split_options: &SplitOptions,
) -> Result<TrainTestSplit, PipelineError> {
	let data = match CleanStrategy::Preprocess.clean(data)? {
		StrategyOutput::Table(table) => table,
		StrategyOutput::Split(_) => unreachable!(),
	};
	let split = match CleanStrategy::Split(split_options.clone()).clean(data)? {
		StrategyOutput::Split(split) => split,
		StrategyOutput::Table(_) => unreachable!(),
	};
	tracing::info!(
		n_train = split.features_train.nrows(),
		n_test = split.features_test.nrows(),
		n_features = split.n_features(),
		"data cleaned and split"
	);
	Ok(split)
}

fn step<T>(name: &str, result: Result<T, PipelineError>) -> Result<T, PipelineError> {
	// no local recovery anywhere: log the failure and surface the error unchanged
	if let Err(error) = &result {
		tracing::error!(step = name, %error, "pipeline step failed");
	}
	result
}

/// Ingest, clean, train, and evaluate. Returns the fitted model and its metrics.
pub fn training_pipeline(
	data_path: &Path,
	config: Option<&Config>,
	tracker: &mut dyn ExperimentTracker,
) -> Result<TrainingOutput, PipelineError> {
	let model_config = config.map(Config::model_config).unwrap_or_default();
	let split_options = config.map(Config::split_options).unwrap_or_default();
	let data = step("ingest_data", ingest_data(data_path))?;
	let split = step("clean_data", clean_data(data, &split_options))?;
	let model = step("train_model", train_model(&split, &model_config, tracker))?;
	let metrics = step("evaluate_model", evaluate_model(&model, &split, tracker))?;
	Ok(TrainingOutput { model, metrics })
}

/// The training flow, then the deployment gate, then the deployer.
pub fn continuous_deployment_pipeline(
	data_path: &Path,
	options: &DeployOptions,
	config: Option<&Config>,
	tracker: &mut dyn ExperimentTracker,
	deployer: &mut dyn ModelDeployer,
) -> Result<DeploymentOutput, PipelineError> {
	let TrainingOutput { model, metrics } = training_pipeline(data_path, config, tracker)?;
	let decision = deployment_trigger(metrics.r2, options.min_accuracy);
	tracing::info!(
		decision,
		r2 = metrics.r2,
		min_accuracy = options.min_accuracy,
		"deployment trigger decision"
	);
	let deployment = Deployment {
		pipeline_name: PIPELINE_NAME.to_owned(),
		step_name: DEPLOY_STEP_NAME.to_owned(),
		model_name: MODEL_NAME.to_owned(),
		model: serde_json::to_value(&model).map_err(TrackingError::from)?,
		decision,
		workers: options.workers,
		timeout: options.timeout,
	};
	let service = step(
		"deploy_model",
		deployer.deploy(deployment).map_err(PipelineError::from),
	)?;
	if let Some(service) = &service {
		tracing::info!(
			prediction_url = service.prediction_url.as_deref().unwrap_or(""),
			"model deployed"
		);
	}
	Ok(DeploymentOutput {
		metrics,
		decision,
		service,
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use satisfaction_cleaning::preprocess;
	use satisfaction_deploy::LocalDeployer;
	use satisfaction_tracking::InMemoryTracker;
	use std::path::PathBuf;

	const ORDERS_CSV: &str = "\
order_approved_at,product_weight_g,product_length_cm,product_height_cm,product_width_cm,review_comment_message,review_score,customer_zip_code_prefix,order_item_id,price
2018-01-01,500,16,10,14,muito bom,1,13017,1,35.9
2018-01-02,,17,11,15,chegou rapido,2,80610,1,29.9
2018-01-03,700,18,12,16,,3,04571,2,115.0
2018-01-04,250,19,13,17,recomendo,4,31270,1,58.5
2018-01-05,900,20,14,18,produto otimo,5,95110,1,45.0
2018-01-06,1200,21,15,19,nota dez,1.5,06764,3,199.0
2018-01-07,330,22,16,20,ok,2.5,24220,1,12.99
2018-01-08,480,23,17,21,perfeito,3.5,88301,2,74.9
2018-01-09,610,24,18,22,veio quebrado,4.5,60115,1,27.5
2018-01-10,1050,25,19,23,entrega lenta,4.8,74823,1,149.9
";

	fn write_orders_csv(name: &str) -> PathBuf {
		let path = std::env::temp_dir().join(format!(
			"satisfaction_{}_{}.csv",
			name,
			std::process::id()
		));
		std::fs::write(&path, ORDERS_CSV).unwrap();
		path
	}

	#[test]
	fn test_training_pipeline_end_to_end() {
		let path = write_orders_csv("training_pipeline");
		// the preprocessed table has no missing values and no identifier or timestamp columns
		let data = ingest_data(&path).unwrap();
		let cleaned = preprocess(data).unwrap();
		assert!(cleaned.column("order_approved_at").is_none());
		assert!(cleaned.column("customer_zip_code_prefix").is_none());
		assert!(cleaned.column("order_item_id").is_none());
		for column in cleaned.columns.iter() {
			assert_eq!(column.as_number().unwrap().n_missing(), 0);
		}
		// the full flow produces finite metrics
		let mut tracker = InMemoryTracker::new("training_pipeline");
		let output = training_pipeline(&path, None, &mut tracker).unwrap();
		assert!(output.metrics.r2.is_finite());
		assert!(output.metrics.rmse.is_finite());
		assert!((output.metrics.rmse - output.metrics.mse.sqrt()).abs() < 1e-6);
		assert_eq!(tracker.metric("r2"), Some(f64::from(output.metrics.r2)));
		assert!(tracker.artifact("linear_regression_model").is_some());
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_training_pipeline_is_deterministic() {
		let path = write_orders_csv("training_determinism");
		let mut tracker = InMemoryTracker::new("a");
		let output_a = training_pipeline(&path, None, &mut tracker).unwrap();
		let mut tracker = InMemoryTracker::new("b");
		let output_b = training_pipeline(&path, None, &mut tracker).unwrap();
		assert_eq!(output_a.model, output_b.model);
		assert_eq!(output_a.metrics.r2, output_b.metrics.r2);
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_missing_data_path_fails() {
		let mut tracker = InMemoryTracker::new("missing");
		let result = training_pipeline(
			Path::new("/definitely/not/a/real/path.csv"),
			None,
			&mut tracker,
		);
		assert!(matches!(result, Err(PipelineError::Ingest(_))));
	}

	#[test]
	fn test_continuous_deployment_pipeline_deploys_above_threshold() {
		let path = write_orders_csv("cdp_deploys");
		let mut tracker = InMemoryTracker::new("cdp");
		let mut deployer = LocalDeployer::new();
		let options = DeployOptions {
			// any finite r2 passes this gate
			min_accuracy: f32::NEG_INFINITY,
			workers: 3,
			timeout: 60,
		};
		let output =
			continuous_deployment_pipeline(&path, &options, None, &mut tracker, &mut deployer)
				.unwrap();
		assert!(output.decision);
		let service = output.service.unwrap();
		assert!(service.is_running);
		assert!(deployer
			.find_existing_service(PIPELINE_NAME, DEPLOY_STEP_NAME, MODEL_NAME)
			.is_some());
		std::fs::remove_file(&path).unwrap();
	}

	#[test]
	fn test_continuous_deployment_pipeline_honors_the_gate() {
		let path = write_orders_csv("cdp_gated");
		let mut tracker = InMemoryTracker::new("cdp");
		let mut deployer = LocalDeployer::new();
		let options = DeployOptions {
			// no finite r2 passes this gate
			min_accuracy: f32::INFINITY,
			workers: 3,
			timeout: 60,
		};
		let output =
			continuous_deployment_pipeline(&path, &options, None, &mut tracker, &mut deployer)
				.unwrap();
		assert!(!output.decision);
		assert!(output.service.is_none());
		assert!(deployer
			.find_existing_service(PIPELINE_NAME, DEPLOY_STEP_NAME, MODEL_NAME)
			.is_none());
		std::fs::remove_file(&path).unwrap();
	}
}
