/*!
This crate implements an ordinary least squares linear regressor, trained with mini batch gradient descent. Features are transformed to zero mean and unit variance before training, and the normalization statistics are stored on the model so the same transform is applied at prediction time. This keeps gradient descent stable for columns with very different scales, such as product weights in grams next to prices in currency units.
*/

use itertools::izip;
use ndarray::prelude::*;
use satisfaction_metrics::{MeanSquaredError, StreamingMetric};
use serde::{Deserialize, Serialize};

/// These are the options passed to [`Regressor::train`](struct.Regressor.html#method.train).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrainOptions {
	/// This is the L2 regularization value to use when updating the model parameters.
	pub l2_regularization: f32,
	/// This is the learning rate to use when updating the model parameters.
	pub learning_rate: f32,
	/// This is the maximum number of epochs to train.
	pub max_epochs: usize,
	/// This is the number of examples to use for each batch of training.
	pub n_examples_per_batch: usize,
}

impl Default for TrainOptions {
	fn default() -> Self {
		Self {
			l2_regularization: 0.0,
			learning_rate: 0.1,
			max_epochs: 100,
			n_examples_per_batch: 128,
		}
	}
}

/// This struct describes a linear regressor model. You can train one by calling `Regressor::train`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Regressor {
	pub bias: f32,
	pub weights: Array1<f32>,
	/// These are the mean values of each feature in the training set, used to normalize features before applying the weights.
	pub means: Array1<f32>,
	/// These are the variances of each feature in the training set.
	pub variances: Array1<f32>,
	/// These are the training loss values for each epoch.
	pub losses: Vec<f32>,
}

impl Regressor {
	/// Train a linear regressor.
	pub fn train(
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &TrainOptions,
	) -> Self {
		let n_features = features.ncols();
		let means: Array1<f32> = features
			.axis_iter(Axis(1))
			.map(|column| column.mean().unwrap_or(0.0))
			.collect();
		let variances: Array1<f32> = izip!(features.axis_iter(Axis(1)), means.iter())
			.map(|(column, mean)| {
				column.iter().map(|value| (value - mean).powi(2)).sum::<f32>()
					/ column.len() as f32
			})
			.collect();
		let features = normalize(features, means.view(), variances.view());
		let mut model = Self {
			bias: 0.0,
			weights: Array1::<f32>::zeros(n_features),
			means,
			variances,
			losses: Vec::with_capacity(options.max_epochs),
		};
		for _ in 0..options.max_epochs {
			izip!(
				features.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
				labels.axis_chunks_iter(Axis(0), options.n_examples_per_batch),
			)
			.for_each(|(features, labels)| {
				model.train_batch(features, labels, options);
			});
			model
				.losses
				.push(model.compute_loss(features.view(), labels));
		}
		model
	}

	fn train_batch(
		&mut self,
		features: ArrayView2<f32>,
		labels: ArrayView1<f32>,
		options: &TrainOptions,
	) {
		let learning_rate = options.learning_rate;
		let predictions = features.dot(&self.weights) + self.bias;
		let py = (predictions - labels).insert_axis(Axis(1));
		let weight_gradients = (&features * &py).mean_axis(Axis(0)).unwrap();
		let bias_gradient: f32 = py.mean_axis(Axis(0)).unwrap()[0];
		for (weight, weight_gradient) in izip!(self.weights.iter_mut(), weight_gradients.iter()) {
			*weight += -learning_rate * (weight_gradient + options.l2_regularization * *weight);
		}
		self.bias += -learning_rate * bias_gradient;
	}

	/// Compute the mean squared error over already normalized features.
	fn compute_loss(&self, features: ArrayView2<f32>, labels: ArrayView1<f32>) -> f32 {
		let mut predictions = Array1::<f32>::zeros(features.nrows());
		self.predict_normalized(features, predictions.view_mut());
		let mut metric = MeanSquaredError::default();
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			metric.update((*prediction, *label));
		}
		metric.finalize().unwrap_or(f32::NAN)
	}

	/// Write predictions into `predictions` for the input `features`.
	pub fn predict(&self, features: ArrayView2<f32>, predictions: ArrayViewMut1<f32>) {
		let features = normalize(features, self.means.view(), self.variances.view());
		self.predict_normalized(features.view(), predictions);
	}

	fn predict_normalized(&self, features: ArrayView2<f32>, mut predictions: ArrayViewMut1<f32>) {
		predictions.fill(self.bias);
		ndarray::linalg::general_mat_vec_mul(1.0, &features, &self.weights, 1.0, &mut predictions);
	}

	pub fn n_features(&self) -> usize {
		self.weights.len()
	}
}

/// Transform each feature column to zero mean and unit variance. A column with zero variance maps to all zeros.
fn normalize(
	features: ArrayView2<f32>,
	means: ArrayView1<f32>,
	variances: ArrayView1<f32>,
) -> Array2<f32> {
	let mut normalized = features.to_owned();
	for (mut column, mean, variance) in izip!(
		normalized.gencolumns_mut(),
		means.iter(),
		variances.iter()
	) {
		let std = if *variance > 0.0 { variance.sqrt() } else { 1.0 };
		for value in column.iter_mut() {
			*value = (*value - mean) / std;
		}
	}
	normalized
}

#[cfg(test)]
mod tests {
	use super::*;

	fn train_on_line() -> (Regressor, Array2<f32>, Array1<f32>) {
		// y = 2x + 1
		let features = Array2::from_shape_vec(
			(10, 1),
			(0..10).map(|x| x as f32).collect(),
		)
		.unwrap();
		let labels: Array1<f32> = (0..10).map(|x| 2.0 * x as f32 + 1.0).collect();
		let model = Regressor::train(features.view(), labels.view(), &TrainOptions::default());
		(model, features, labels)
	}

	#[test]
	fn test_train_fits_a_line() {
		let (model, features, labels) = train_on_line();
		let mut predictions = Array1::<f32>::zeros(features.nrows());
		model.predict(features.view(), predictions.view_mut());
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			assert!((prediction - label).abs() < 0.1);
		}
	}

	#[test]
	fn test_losses_decrease() {
		let (model, _, _) = train_on_line();
		assert_eq!(model.losses.len(), TrainOptions::default().max_epochs);
		assert!(model.losses.last().unwrap() < model.losses.first().unwrap());
	}

	#[test]
	fn test_training_is_deterministic() {
		let (model_a, _, _) = train_on_line();
		let (model_b, _, _) = train_on_line();
		assert_eq!(model_a, model_b);
	}

	#[test]
	fn test_constant_feature_does_not_produce_nan() {
		let features = Array2::from_elem((5, 1), 3.0);
		let labels = Array1::from_elem(5, 1.0);
		let model = Regressor::train(features.view(), labels.view(), &TrainOptions::default());
		let mut predictions = Array1::<f32>::zeros(5);
		model.predict(features.view(), predictions.view_mut());
		for prediction in predictions.iter() {
			assert!(prediction.is_finite());
		}
	}

	#[test]
	fn test_model_round_trips_through_json() {
		let (model, _, _) = train_on_line();
		let json = serde_json::to_string(&model).unwrap();
		let deserialized: Regressor = serde_json::from_str(&json).unwrap();
		assert_eq!(model, deserialized);
	}
}
