use crate::error::PipelineError;
use ndarray::prelude::*;
use satisfaction_cleaning::TrainTestSplit;
use satisfaction_linear::Regressor;
use satisfaction_metrics::{
	RegressionMetrics, RegressionMetricsInput, RegressionMetricsOutput, StreamingMetric,
};
use satisfaction_tracking::ExperimentTracker;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum EvaluationError {
	#[error("the test set has {n_rows} rows but the test labels have {n_labels}")]
	LabelCountMismatch { n_rows: usize, n_labels: usize },
	#[error("the model was trained on {expected} features but the test set has {found}")]
	FeatureCountMismatch { expected: usize, found: usize },
}

/// Score the trained model on the test partition, record the metrics with the experiment tracker, and return them.
pub fn evaluate_model(
	model: &Regressor,
	split: &TrainTestSplit,
	tracker: &mut dyn ExperimentTracker,
) -> Result<RegressionMetricsOutput, PipelineError> {
	if split.features_test.nrows() != split.labels_test.len() {
		return Err(EvaluationError::LabelCountMismatch {
			n_rows: split.features_test.nrows(),
			n_labels: split.labels_test.len(),
		}
		.into());
	}
	if model.n_features() != split.features_test.ncols() {
		return Err(EvaluationError::FeatureCountMismatch {
			expected: model.n_features(),
			found: split.features_test.ncols(),
		}
		.into());
	}
	let mut predictions = Array1::<f32>::zeros(split.features_test.nrows());
	model.predict(split.features_test.view(), predictions.view_mut());
	let mut metrics = RegressionMetrics::default();
	metrics.update(RegressionMetricsInput {
		predictions: predictions.view(),
		labels: split.labels_test.view(),
	});
	let metrics = metrics.finalize();
	tracing::info!(
		mse = metrics.mse,
		rmse = metrics.rmse,
		r2 = metrics.r2,
		"model evaluated"
	);
	tracker.log_metric("mse", f64::from(metrics.mse))?;
	tracker.log_metric("r2", f64::from(metrics.r2))?;
	tracker.log_metric("rmse", f64::from(metrics.rmse))?;
	Ok(metrics)
}

#[cfg(test)]
mod tests {
	use super::*;
	use satisfaction_tracking::InMemoryTracker;

	fn identity_model() -> Regressor {
		// one feature, weight 1, no normalization offset: predictions equal the feature value
		Regressor {
			bias: 0.0,
			weights: ndarray::arr1(&[1.0]),
			means: ndarray::arr1(&[0.0]),
			variances: ndarray::arr1(&[1.0]),
			losses: vec![],
		}
	}

	fn split(labels_test: Vec<f32>) -> TrainTestSplit {
		let n = labels_test.len();
		TrainTestSplit {
			features_train: Array2::zeros((0, 1)),
			features_test: Array2::from_shape_vec((n, 1), labels_test.clone()).unwrap(),
			labels_train: Array1::zeros(0),
			labels_test: Array1::from(labels_test),
			feature_names: vec!["a".to_owned()],
			label_name: "review_score".to_owned(),
		}
	}

	#[test]
	fn test_perfect_model_scores_r2_one() {
		let mut tracker = InMemoryTracker::new("test");
		let metrics =
			evaluate_model(&identity_model(), &split(vec![1.0, 2.0, 3.0]), &mut tracker).unwrap();
		assert_eq!(metrics.r2, 1.0);
		assert_eq!(metrics.mse, 0.0);
		assert_eq!(tracker.metric("r2"), Some(1.0));
		assert_eq!(tracker.metric("mse"), Some(0.0));
		assert_eq!(tracker.metric("rmse"), Some(0.0));
	}

	#[test]
	fn test_feature_count_mismatch_fails() {
		let mut tracker = InMemoryTracker::new("test");
		let model = Regressor {
			weights: ndarray::arr1(&[1.0, 2.0]),
			means: ndarray::arr1(&[0.0, 0.0]),
			variances: ndarray::arr1(&[1.0, 1.0]),
			bias: 0.0,
			losses: vec![],
		};
		let error = evaluate_model(&model, &split(vec![1.0, 2.0]), &mut tracker).unwrap_err();
		assert!(matches!(
			error,
			PipelineError::Evaluation(EvaluationError::FeatureCountMismatch {
				expected: 2,
				found: 1,
			})
		));
	}

	#[test]
	fn test_label_count_mismatch_fails() {
		let mut tracker = InMemoryTracker::new("test");
		let mut split = split(vec![1.0, 2.0, 3.0]);
		split.labels_test = ndarray::arr1(&[1.0, 2.0]);
		let error = evaluate_model(&identity_model(), &split, &mut tracker).unwrap_err();
		assert!(matches!(
			error,
			PipelineError::Evaluation(EvaluationError::LabelCountMismatch { .. })
		));
	}
}
