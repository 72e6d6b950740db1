//! This module contains the main entrypoint to the satisfaction cli.

use anyhow::{Context, Result};
use clap::Parser;
use colored::Colorize;
use satisfaction_core::{
	continuous_deployment_pipeline, load_config, training_pipeline, DeployOptions,
	DEPLOY_STEP_NAME, MODEL_NAME, PIPELINE_NAME,
};
use satisfaction_deploy::{LocalDeployer, ModelDeployer};
use satisfaction_tracking::InMemoryTracker;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[clap(
	name = "satisfaction",
	about = "Train and deploy a model that predicts order review scores."
)]
enum Options {
	#[clap(name = "train", about = "train a review score model from a csv file")]
	Train(TrainArgs),
	#[clap(
		name = "deploy",
		about = "run the continuous deployment pipeline and inspect the prediction service"
	)]
	Deploy(DeployArgs),
}

#[derive(clap::Args)]
struct TrainArgs {
	/// the path to your .csv file
	#[clap(short, long)]
	file: PathBuf,
	/// the path to a yaml config file
	#[clap(short, long)]
	config: Option<PathBuf>,
	/// the path to write the trained model json to
	#[clap(short, long)]
	output: Option<PathBuf>,
}

#[derive(clap::Args)]
struct DeployArgs {
	/// run the deployment pipeline, inspect the prediction service, or both
	#[clap(long, arg_enum, default_value = "deploy-and-predict")]
	mode: Mode,
	/// the path to your .csv file
	#[clap(short, long)]
	file: PathBuf,
	/// the minimum r2 score required to deploy the model
	#[clap(long)]
	min_accuracy: Option<f32>,
	/// the number of workers for the prediction service
	#[clap(long, default_value = "3")]
	workers: usize,
	/// seconds to wait for the prediction service to start
	#[clap(long, default_value = "60")]
	timeout: u64,
	/// the path to a yaml config file
	#[clap(short, long)]
	config: Option<PathBuf>,
}

#[derive(clap::ArgEnum, Clone, Copy, PartialEq)]
enum Mode {
	Deploy,
	Predict,
	DeployAndPredict,
}

fn main() {
	tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.init();
	let options = Options::parse();
	let result = match options {
		Options::Train(args) => cli_train(args),
		Options::Deploy(args) => cli_deploy(args),
	};
	if let Err(error) = result {
		eprintln!("{}: {}", "error".red().bold(), error);
		std::process::exit(1);
	}
}

fn cli_train(args: TrainArgs) -> Result<()> {
	let config = load_config(args.config.as_deref())?;
	let mut tracker = InMemoryTracker::new("training_pipeline");
	let output = training_pipeline(&args.file, config.as_ref(), &mut tracker)
		.context("the training pipeline failed")?;
	println!("mse: {}", output.metrics.mse);
	println!("rmse: {}", output.metrics.rmse);
	println!("r2: {}", output.metrics.r2);
	if let Some(output_path) = &args.output {
		let json = serde_json::to_string_pretty(&output.model)?;
		std::fs::write(output_path, json)
			.with_context(|| format!("failed to write the model to {}", output_path.display()))?;
		println!("wrote model to {}", output_path.display());
	}
	Ok(())
}

fn cli_deploy(args: DeployArgs) -> Result<()> {
	let config = load_config(args.config.as_deref())?;
	let mut tracker = InMemoryTracker::new(PIPELINE_NAME);
	let mut deployer = LocalDeployer::new();
	let deploy = args.mode == Mode::Deploy || args.mode == Mode::DeployAndPredict;
	let predict = args.mode == Mode::Predict || args.mode == Mode::DeployAndPredict;
	if deploy {
		let min_accuracy = args
			.min_accuracy
			.or_else(|| config.as_ref().and_then(|config| config.min_accuracy))
			.unwrap_or(0.5);
		let options = DeployOptions {
			min_accuracy,
			workers: args.workers,
			timeout: args.timeout,
		};
		let output = continuous_deployment_pipeline(
			&args.file,
			&options,
			config.as_ref(),
			&mut tracker,
			&mut deployer,
		)
		.context("the deployment pipeline failed")?;
		println!("mse: {}", output.metrics.mse);
		println!("rmse: {}", output.metrics.rmse);
		println!("r2: {}", output.metrics.r2);
		if output.decision {
			println!("{}", "the model passed the deployment gate".green());
		} else {
			println!(
				"{}",
				format!(
					"the model's r2 score {} did not exceed the minimum accuracy {}, so it was not deployed",
					output.metrics.r2, min_accuracy,
				)
				.yellow()
			);
		}
	}
	if predict {
		match deployer.find_existing_service(PIPELINE_NAME, DEPLOY_STEP_NAME, MODEL_NAME) {
			Some(service) if service.is_running => {
				println!(
					"The prediction service is running at:\n    {}",
					service
						.prediction_url
						.as_deref()
						.unwrap_or("<unknown>")
						.green(),
				);
			}
			Some(service) if service.is_failed => {
				println!(
					"The prediction service is in a failed state:\n    last error: {}",
					service.last_error.as_deref().unwrap_or("<unknown>").red(),
				);
			}
			Some(_) => {
				println!("The prediction service is registered but not running.");
			}
			None => {
				println!(
					"No prediction service is running. Run the deployment pipeline first with `--mode deploy`."
				);
			}
		}
	}
	Ok(())
}
