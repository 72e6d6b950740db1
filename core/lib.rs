/*!
This crate composes the satisfaction pipeline out of the leaf crates: ingest a csv of orders, clean and split it, fit a review score regressor, evaluate it, and optionally hand the fitted model to a deployer behind a deployment gate. Every step is a plain function from typed inputs to typed outputs, and the experiment tracker and model deployer are passed in as explicit collaborator handles.
*/

pub mod config;
pub mod error;
pub mod evaluate;
pub mod model;
pub mod pipeline;
pub mod trigger;

pub use self::config::{load_config, Config};
pub use self::error::PipelineError;
pub use self::evaluate::{evaluate_model, EvaluationError};
pub use self::model::{train_model, ModelConfig, ModelVariant, UnsupportedModelError};
pub use self::pipeline::{
	continuous_deployment_pipeline, training_pipeline, DeployOptions, DeploymentOutput,
	TrainingOutput, DEPLOY_STEP_NAME, MODEL_NAME, PIPELINE_NAME,
};
pub use self::trigger::deployment_trigger;
