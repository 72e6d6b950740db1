/*!
This crate defines the interface the pipeline uses to hand a trained model to a model deployer. The deployer owns the serving process; the pipeline only asks it to [`deploy`](trait.ModelDeployer.html) a model behind a service and to [`find_existing_service`](trait.ModelDeployer.html) from an earlier run. [`LocalDeployer`](struct.LocalDeployer.html) is an in-process registry that stands in for an external serving daemon.
*/

use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum DeployError {
	#[error("a prediction service needs at least one worker")]
	NoWorkers,
	#[error("failed to register the prediction service: {0}")]
	Registration(String),
}

/// A request to serve a trained model, produced by the continuous deployment pipeline.
#[derive(Debug, Clone)]
pub struct Deployment {
	pub pipeline_name: String,
	pub step_name: String,
	pub model_name: String,
	pub model: serde_json::Value,
	/// The deployment gate decision. A deployment with a negative decision deploys nothing.
	pub decision: bool,
	pub workers: usize,
	/// Seconds to wait for the service to start or stop.
	pub timeout: u64,
}

/// The state of a prediction service as reported by the deployer.
#[derive(Debug, Clone, PartialEq)]
pub struct ServiceHandle {
	pub is_running: bool,
	pub is_failed: bool,
	pub prediction_url: Option<String>,
	pub last_error: Option<String>,
}

pub trait ModelDeployer {
	/// Deploy the model if the decision allows it. Returns `None` when the decision was negative.
	fn deploy(&mut self, deployment: Deployment) -> Result<Option<ServiceHandle>, DeployError>;

	/// Look up a service registered by an earlier deployment of the same pipeline step and model.
	fn find_existing_service(
		&self,
		pipeline_name: &str,
		step_name: &str,
		model_name: &str,
	) -> Option<ServiceHandle>;
}

#[derive(Debug)]
struct LocalService {
	model: serde_json::Value,
	workers: usize,
	timeout: u64,
	prediction_url: String,
}

/// A deployer that keeps deployed models in an in-process registry, keyed by pipeline, step, and model name. Redeploying the same key replaces the served model.
#[derive(Debug, Default)]
pub struct LocalDeployer {
	services: HashMap<(String, String, String), LocalService>,
}

impl LocalDeployer {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn n_services(&self) -> usize {
		self.services.len()
	}

	/// The worker count and timeout the service was registered with, if any.
	pub fn service_config(
		&self,
		pipeline_name: &str,
		step_name: &str,
		model_name: &str,
	) -> Option<(usize, u64)> {
		self.services
			.get(&(
				pipeline_name.to_owned(),
				step_name.to_owned(),
				model_name.to_owned(),
			))
			.map(|service| (service.workers, service.timeout))
	}

	/// The model json currently served for the given key, if any.
	pub fn served_model(
		&self,
		pipeline_name: &str,
		step_name: &str,
		model_name: &str,
	) -> Option<&serde_json::Value> {
		self.services
			.get(&(
				pipeline_name.to_owned(),
				step_name.to_owned(),
				model_name.to_owned(),
			))
			.map(|service| &service.model)
	}
}

impl ModelDeployer for LocalDeployer {
	fn deploy(&mut self, deployment: Deployment) -> Result<Option<ServiceHandle>, DeployError> {
		if !deployment.decision {
			return Ok(None);
		}
		if deployment.workers == 0 {
			return Err(DeployError::NoWorkers);
		}
		let prediction_url = format!(
			"http://127.0.0.1:8000/{}/{}/invocations",
			deployment.pipeline_name, deployment.model_name,
		);
		let service = LocalService {
			model: deployment.model,
			workers: deployment.workers,
			timeout: deployment.timeout,
			prediction_url: prediction_url.clone(),
		};
		self.services.insert(
			(
				deployment.pipeline_name,
				deployment.step_name,
				deployment.model_name,
			),
			service,
		);
		Ok(Some(ServiceHandle {
			is_running: true,
			is_failed: false,
			prediction_url: Some(prediction_url),
			last_error: None,
		}))
	}

	fn find_existing_service(
		&self,
		pipeline_name: &str,
		step_name: &str,
		model_name: &str,
	) -> Option<ServiceHandle> {
		self.services
			.get(&(
				pipeline_name.to_owned(),
				step_name.to_owned(),
				model_name.to_owned(),
			))
			.map(|service| ServiceHandle {
				is_running: true,
				is_failed: false,
				prediction_url: Some(service.prediction_url.clone()),
				last_error: None,
			})
	}
}
