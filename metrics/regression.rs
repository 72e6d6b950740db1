use super::{mean_variance::merge_mean_m2, StreamingMetric};
use ndarray::prelude::*;
use num_traits::ToPrimitive;

/// Streaming regression metrics: the mean squared error, its square root, and the coefficient of determination.
pub struct RegressionMetrics {
	mean_variance: Option<MeanVariance>,
	squared_error: f64,
}

#[derive(Debug)]
struct MeanVariance {
	pub n: u64,
	pub m2: f64,
	pub mean: f64,
}

pub struct RegressionMetricsInput<'a> {
	pub predictions: ArrayView1<'a, f32>,
	pub labels: ArrayView1<'a, f32>,
}

#[derive(Clone, Copy, Debug)]
pub struct RegressionMetricsOutput {
	pub mse: f32,
	pub rmse: f32,
	pub r2: f32,
}

impl Default for RegressionMetrics {
	fn default() -> Self {
		Self {
			mean_variance: None,
			squared_error: 0.0,
		}
	}
}

impl<'a> StreamingMetric<'a> for RegressionMetrics {
	type Input = RegressionMetricsInput<'a>;
	type Output = RegressionMetricsOutput;

	fn update(&mut self, input: RegressionMetricsInput) {
		let RegressionMetricsInput {
			predictions,
			labels,
		} = input;
		for (prediction, label) in predictions.iter().zip(labels.iter()) {
			match &mut self.mean_variance {
				Some(mean_variance) => {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						1,
						f64::from(*label),
						0.0,
					);
					mean_variance.n += 1;
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
				}
				None => {
					self.mean_variance = Some(MeanVariance {
						n: 1,
						mean: f64::from(*label),
						m2: 0.0,
					})
				}
			}
			let error = f64::from(prediction - label);
			self.squared_error += error * error;
		}
	}

	fn merge(&mut self, other: Self) {
		match &mut self.mean_variance {
			Some(mean_variance) => {
				if let Some(other) = other.mean_variance {
					let (mean, m2) = merge_mean_m2(
						mean_variance.n,
						mean_variance.mean,
						mean_variance.m2,
						other.n,
						other.mean,
						other.m2,
					);
					mean_variance.mean = mean;
					mean_variance.m2 = m2;
					mean_variance.n += other.n;
				}
			}
			None => {
				self.mean_variance = other.mean_variance;
			}
		}
		self.squared_error += other.squared_error;
	}

	fn finalize(self) -> Self::Output {
		let (n, variance) = match self.mean_variance {
			Some(m) => (m.n.to_f64().unwrap(), m.m2 / m.n.to_f64().unwrap()),
			None => (0.0, f64::NAN),
		};
		let mse = self.squared_error / n;
		let rmse = mse.sqrt();
		// SS_tot is the variance times n, so this is 1 - SS_res / SS_tot.
		let r2 = 1.0 - self.squared_error / (variance * n);
		RegressionMetricsOutput {
			mse: mse as f32,
			rmse: rmse as f32,
			r2: r2 as f32,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn compute(predictions: &[f32], labels: &[f32]) -> RegressionMetricsOutput {
		let mut metrics = RegressionMetrics::default();
		metrics.update(RegressionMetricsInput {
			predictions: ArrayView1::from(predictions),
			labels: ArrayView1::from(labels),
		});
		metrics.finalize()
	}

	#[test]
	fn test_perfect_predictions_have_r2_one() {
		let labels = [1.0, 2.0, 3.0, 4.0, 5.0];
		let metrics = compute(&labels, &labels);
		assert_eq!(metrics.mse, 0.0);
		assert_eq!(metrics.rmse, 0.0);
		assert_eq!(metrics.r2, 1.0);
	}

	#[test]
	fn test_rmse_is_sqrt_of_mse() {
		let metrics = compute(&[2.5, 0.0, 2.0, 8.0], &[3.0, -0.5, 2.0, 7.0]);
		assert!((metrics.rmse - metrics.mse.sqrt()).abs() < 1e-6);
	}

	#[test]
	fn test_known_values() {
		// sklearn: mean_squared_error = 0.375, r2_score = 0.9486...
		let metrics = compute(&[2.5, 0.0, 2.0, 8.0], &[3.0, -0.5, 2.0, 7.0]);
		assert!((metrics.mse - 0.375).abs() < 1e-6);
		assert!((metrics.r2 - 0.948_608_1).abs() < 1e-4);
	}

	#[test]
	fn test_merge_matches_single_pass() {
		let predictions = [2.5, 0.0, 2.0, 8.0];
		let labels = [3.0, -0.5, 2.0, 7.0];
		let single = compute(&predictions, &labels);
		let mut a = RegressionMetrics::default();
		a.update(RegressionMetricsInput {
			predictions: ArrayView1::from(&predictions[..2]),
			labels: ArrayView1::from(&labels[..2]),
		});
		let mut b = RegressionMetrics::default();
		b.update(RegressionMetricsInput {
			predictions: ArrayView1::from(&predictions[2..]),
			labels: ArrayView1::from(&labels[2..]),
		});
		a.merge(b);
		let merged = a.finalize();
		assert!((merged.mse - single.mse).abs() < 1e-6);
		assert!((merged.r2 - single.r2).abs() < 1e-6);
	}

	#[test]
	fn test_negative_labels_are_tolerated() {
		let metrics = compute(&[-1.0, -2.0, -3.0], &[-1.5, -2.5, -2.5]);
		assert!(metrics.mse.is_finite());
		assert!(metrics.rmse.is_finite());
		assert!(metrics.r2.is_finite());
	}
}
