use crate::evaluate::EvaluationError;
use crate::model::UnsupportedModelError;
use satisfaction_cleaning::{CleaningError, SplitError, StrategyError};
use satisfaction_dataframe::IngestError;
use satisfaction_deploy::DeployError;
use satisfaction_tracking::TrackingError;
use thiserror::Error;

/// The error of a pipeline run: whichever step failed first, unchanged. Steps never recover locally, they log and re-raise, and the caller fails the run.
#[derive(Debug, Error)]
pub enum PipelineError {
	#[error(transparent)]
	Ingest(#[from] IngestError),
	#[error(transparent)]
	Cleaning(#[from] CleaningError),
	#[error(transparent)]
	Split(#[from] SplitError),
	#[error(transparent)]
	UnsupportedModel(#[from] UnsupportedModelError),
	#[error(transparent)]
	Evaluation(#[from] EvaluationError),
	#[error(transparent)]
	Tracking(#[from] TrackingError),
	#[error(transparent)]
	Deploy(#[from] DeployError),
}

impl From<StrategyError> for PipelineError {
	fn from(error: StrategyError) -> Self {
		match error {
			StrategyError::Cleaning(error) => PipelineError::Cleaning(error),
			StrategyError::Split(error) => PipelineError::Split(error),
		}
	}
}
