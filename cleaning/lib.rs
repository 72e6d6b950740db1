/*!
This crate implements the data cleaning strategies that prepare a raw orders dataset for training. There are two strategies behind one capability: [`CleanStrategy::Preprocess`](enum.CleanStrategy.html) drops timestamp and identifier columns and imputes missing values, and [`CleanStrategy::Split`](enum.CleanStrategy.html) separates the label column and partitions the rows into deterministic train and test sets. New cleaning policies are added as new variants, so the pipeline composer never changes.
*/

use ndarray::prelude::*;
use num_traits::ToPrimitive;
use satisfaction_dataframe::{Column, DataFrame, TextColumn, DEFAULT_INVALID_VALUES};
use thiserror::Error;

/// The order timestamp columns dropped during preprocessing. A dataset that never had one of these is accepted as is.
pub const TIMESTAMP_COLUMNS: &[&str] = &[
	"order_approved_at",
	"order_delivered_carrier_date",
	"order_delivered_customer_date",
	"order_estimated_delivery_date",
	"order_purchase_timestamp",
];

/// The product measurement columns whose missing values are filled with the column median.
pub const MEDIAN_FILLED_COLUMNS: &[&str] = &[
	"product_weight_g",
	"product_length_cm",
	"product_height_cm",
	"product_width_cm",
];

pub const REVIEW_COMMENT_COLUMN: &str = "review_comment_message";
pub const REVIEW_COMMENT_FILL: &str = "No review";

/// The identifier columns dropped after restricting the dataset to number columns.
pub const ID_COLUMNS: &[&str] = &["customer_zip_code_prefix", "order_item_id"];

pub const LABEL_COLUMN: &str = "review_score";

#[derive(Debug, Error)]
pub enum CleaningError {
	#[error("column \"{0}\" is missing from the dataset")]
	MissingColumn(String),
	#[error("column \"{0}\" is not a number column")]
	NotNumber(String),
	#[error("column \"{0}\" is not a text column")]
	NotText(String),
}

#[derive(Debug, Error)]
pub enum SplitError {
	#[error("label column \"{0}\" is missing from the dataset")]
	MissingLabelColumn(String),
	#[error("label column \"{0}\" is not a number column")]
	InvalidLabelColumn(String),
	#[error("the dataset contains non-number feature columns")]
	NonNumericFeatures,
}

#[derive(Debug, Error)]
pub enum StrategyError {
	#[error(transparent)]
	Cleaning(#[from] CleaningError),
	#[error(transparent)]
	Split(#[from] SplitError),
}

/// The closed set of cleaning strategies.
#[derive(Debug, Clone)]
pub enum CleanStrategy {
	Preprocess,
	Split(SplitOptions),
}

/// The output of applying a [`CleanStrategy`](enum.CleanStrategy.html).
#[derive(Debug)]
pub enum StrategyOutput {
	Table(DataFrame),
	Split(TrainTestSplit),
}

impl CleanStrategy {
	pub fn clean(&self, data: DataFrame) -> Result<StrategyOutput, StrategyError> {
		match self {
			CleanStrategy::Preprocess => Ok(StrategyOutput::Table(preprocess(data)?)),
			CleanStrategy::Split(options) => Ok(StrategyOutput::Split(split(data, options)?)),
		}
	}
}

#[derive(Debug, Clone)]
pub struct SplitOptions {
	pub label_column: String,
	pub test_fraction: f32,
	/// Whether to shuffle the rows before partitioning. Disabling this partitions the rows in file order.
	pub shuffle: bool,
	pub seed: u64,
}

impl Default for SplitOptions {
	fn default() -> Self {
		Self {
			label_column: LABEL_COLUMN.to_owned(),
			test_fraction: 0.2,
			shuffle: true,
			seed: 42,
		}
	}
}

/// The features and labels partitioned into train and test sets. Rows of the feature matrices and label arrays correspond, because every column is permuted with the same seeded shuffle before the partition.
#[derive(Debug, Clone)]
pub struct TrainTestSplit {
	pub features_train: Array2<f32>,
	pub features_test: Array2<f32>,
	pub labels_train: Array1<f32>,
	pub labels_test: Array1<f32>,
	pub feature_names: Vec<String>,
	pub label_name: String,
}

impl TrainTestSplit {
	pub fn n_features(&self) -> usize {
		self.features_train.ncols()
	}
}

/// Drop the timestamp columns, impute missing values, keep only number columns, and drop the identifier columns.
pub fn preprocess(mut data: DataFrame) -> Result<DataFrame, CleaningError> {
	for name in TIMESTAMP_COLUMNS {
		data.remove_column(name);
	}
	for name in MEDIAN_FILLED_COLUMNS {
		let column = data
			.column_mut(name)
			.ok_or_else(|| CleaningError::MissingColumn(name.to_string()))?;
		let column = column
			.as_number_mut()
			.ok_or_else(|| CleaningError::NotNumber(name.to_string()))?;
		if let Some(median) = column.median() {
			column.fill_missing(median);
		}
	}
	fill_review_comments(&mut data)?;
	data.retain_number_columns();
	for name in ID_COLUMNS {
		data.remove_column(name)
			.ok_or_else(|| CleaningError::MissingColumn(name.to_string()))?;
	}
	Ok(data)
}

fn fill_review_comments(data: &mut DataFrame) -> Result<(), CleaningError> {
	let index = data
		.columns
		.iter()
		.position(|column| column.name() == REVIEW_COMMENT_COLUMN)
		.ok_or_else(|| CleaningError::MissingColumn(REVIEW_COMMENT_COLUMN.to_owned()))?;
	let slot = &mut data.columns[index];
	match slot {
		Column::Text(column) => {
			for value in column.data.iter_mut() {
				if DEFAULT_INVALID_VALUES.contains(&value.as_str()) {
					*value = REVIEW_COMMENT_FILL.to_owned();
				}
			}
		}
		// A review column where every value was missing loads as unknown, so it becomes all fill values.
		Column::Unknown(column) => {
			let name = column.name.clone();
			let len = column.len;
			*slot = Column::Text(TextColumn {
				name,
				data: vec![REVIEW_COMMENT_FILL.to_owned(); len],
			});
		}
		Column::Number(_) => {
			return Err(CleaningError::NotText(REVIEW_COMMENT_COLUMN.to_owned()))
		}
	}
	Ok(())
}

/// Shuffle the rows with the seeded rng, separate the label column, and partition the remaining feature columns into train and test sets.
pub fn split(mut data: DataFrame, options: &SplitOptions) -> Result<TrainTestSplit, SplitError> {
	if options.shuffle {
		data.shuffle(options.seed);
	}
	let labels = data
		.remove_column(&options.label_column)
		.ok_or_else(|| SplitError::MissingLabelColumn(options.label_column.clone()))?;
	let labels = match labels {
		Column::Number(column) => Array1::from(column.data),
		_ => return Err(SplitError::InvalidLabelColumn(options.label_column.clone())),
	};
	let feature_names: Vec<String> = data.column_names().map(ToOwned::to_owned).collect();
	let features = data.to_rows_f32().ok_or(SplitError::NonNumericFeatures)?;
	let split_index = ((1.0 - options.test_fraction) * features.nrows().to_f32().unwrap())
		.to_usize()
		.unwrap();
	let (features_train, features_test) = features.view().split_at(Axis(0), split_index);
	let (labels_train, labels_test) = labels.view().split_at(Axis(0), split_index);
	Ok(TrainTestSplit {
		features_train: features_train.to_owned(),
		features_test: features_test.to_owned(),
		labels_train: labels_train.to_owned(),
		labels_test: labels_test.to_owned(),
		feature_names,
		label_name: options.label_column.clone(),
	})
}
