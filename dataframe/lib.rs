/*!
This crate provides a basic implementation of dataframes, which are two dimensional arrays of data where each column can have a different data type, like a spreadsheet. It is intentionally limited, because it only implements the features needed to support the satisfaction pipeline: loading a csv, imputing missing values, selecting columns, shuffling, and converting to an `ndarray` feature matrix.

Missing values are represented as `NaN` in number columns. Text columns store the raw csv values, so a value from the invalid value list (see [`load`](load/index.html)) marks a missing entry.
*/

use itertools::izip;
use ndarray::prelude::*;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;

pub mod load;

pub use self::load::*;

#[derive(Debug, Clone, PartialEq)]
pub struct DataFrame {
	pub columns: Vec<Column>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Column {
	Unknown(UnknownColumn),
	Number(NumberColumn),
	Text(TextColumn),
}

/// A column whose every value was invalid, so no type could be inferred for it.
#[derive(Debug, Clone, PartialEq)]
pub struct UnknownColumn {
	pub name: String,
	pub len: usize,
}

/// A column of `f32`s, where `NaN` marks a missing value.
#[derive(Debug, Clone, PartialEq)]
pub struct NumberColumn {
	pub name: String,
	pub data: Vec<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TextColumn {
	pub name: String,
	pub data: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ColumnType {
	Unknown,
	Number,
	Text,
}

impl DataFrame {
	pub fn new(column_names: Vec<String>, column_types: Vec<ColumnType>) -> Self {
		let columns = column_names
			.into_iter()
			.zip(column_types.into_iter())
			.map(|(column_name, column_type)| match column_type {
				ColumnType::Unknown => Column::Unknown(UnknownColumn::new(column_name)),
				ColumnType::Number => Column::Number(NumberColumn::new(column_name)),
				ColumnType::Text => Column::Text(TextColumn::new(column_name)),
			})
			.collect();
		Self { columns }
	}

	pub fn ncols(&self) -> usize {
		self.columns.len()
	}

	pub fn nrows(&self) -> usize {
		self.columns.first().map(|column| column.len()).unwrap_or(0)
	}

	pub fn column_names(&self) -> impl Iterator<Item = &str> {
		self.columns.iter().map(|column| column.name())
	}

	pub fn column(&self, name: &str) -> Option<&Column> {
		self.columns.iter().find(|column| column.name() == name)
	}

	pub fn column_mut(&mut self, name: &str) -> Option<&mut Column> {
		self.columns.iter_mut().find(|column| column.name() == name)
	}

	/// Remove the column with the given name and return it, or `None` if there is no such column.
	pub fn remove_column(&mut self, name: &str) -> Option<Column> {
		let index = self.columns.iter().position(|column| column.name() == name)?;
		Some(self.columns.remove(index))
	}

	/// Drop every column that is not a number column.
	pub fn retain_number_columns(&mut self) {
		self.columns
			.retain(|column| matches!(column, Column::Number(_)));
	}

	/// Permute the rows of every column identically using a deterministic rng with the given seed.
	pub fn shuffle(&mut self, seed: u64) {
		for column in self.columns.iter_mut() {
			// Seeding a fresh rng per column applies the same permutation to each one, which keeps the rows aligned.
			let mut rng = Xoshiro256Plus::seed_from_u64(seed);
			match column {
				Column::Unknown(_) => {}
				Column::Number(column) => column.data.shuffle(&mut rng),
				Column::Text(column) => column.data.shuffle(&mut rng),
			}
		}
	}

	/// Convert the dataframe into an `nrows` x `ncols` array of `f32`s. Returns `None` if any column is not a number column.
	pub fn to_rows_f32(&self) -> Option<Array2<f32>> {
		let mut rows = Array::zeros((self.nrows(), self.ncols()));
		for (mut ndarray_column, dataframe_column) in
			izip!(rows.gencolumns_mut(), self.columns.iter())
		{
			match dataframe_column {
				Column::Number(column) => {
					for (a, b) in izip!(ndarray_column.iter_mut(), column.data.iter()) {
						*a = *b;
					}
				}
				_ => return None,
			}
		}
		Some(rows)
	}
}

impl Column {
	pub fn len(&self) -> usize {
		match self {
			Self::Unknown(s) => s.len,
			Self::Number(s) => s.data.len(),
			Self::Text(s) => s.data.len(),
		}
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}

	pub fn name(&self) -> &str {
		match self {
			Self::Unknown(s) => s.name.as_str(),
			Self::Number(s) => s.name.as_str(),
			Self::Text(s) => s.name.as_str(),
		}
	}

	pub fn as_number(&self) -> Option<&NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_number_mut(&mut self) -> Option<&mut NumberColumn> {
		match self {
			Self::Number(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text(&self) -> Option<&TextColumn> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_text_mut(&mut self) -> Option<&mut TextColumn> {
		match self {
			Self::Text(s) => Some(s),
			_ => None,
		}
	}
}

impl UnknownColumn {
	pub fn new(name: String) -> Self {
		Self { name, len: 0 }
	}
}

impl NumberColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}

	/// Count the missing values in this column.
	pub fn n_missing(&self) -> usize {
		self.data.iter().filter(|value| value.is_nan()).count()
	}

	/// Compute the median over the non-missing values in this column, or `None` if every value is missing. The median of an even number of values is the mean of the two middle values.
	pub fn median(&self) -> Option<f32> {
		let mut values: Vec<f32> = self
			.data
			.iter()
			.cloned()
			.filter(|value| !value.is_nan())
			.collect();
		if values.is_empty() {
			return None;
		}
		values.sort_by(|a, b| a.partial_cmp(b).unwrap());
		let middle = values.len() / 2;
		if values.len() % 2 == 0 {
			Some((values[middle - 1] + values[middle]) / 2.0)
		} else {
			Some(values[middle])
		}
	}

	/// Replace every missing value in this column with `value`.
	pub fn fill_missing(&mut self, value: f32) {
		for entry in self.data.iter_mut() {
			if entry.is_nan() {
				*entry = value;
			}
		}
	}
}

impl TextColumn {
	pub fn new(name: String) -> Self {
		Self {
			name,
			data: Vec::new(),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn number_column(name: &str, data: Vec<f32>) -> Column {
		Column::Number(NumberColumn {
			name: name.to_owned(),
			data,
		})
	}

	#[test]
	fn test_median_odd() {
		let column = NumberColumn {
			name: "a".to_owned(),
			data: vec![3.0, 1.0, 2.0],
		};
		assert_eq!(column.median(), Some(2.0));
	}

	#[test]
	fn test_median_even() {
		let column = NumberColumn {
			name: "a".to_owned(),
			data: vec![4.0, 1.0, 2.0, 3.0],
		};
		assert_eq!(column.median(), Some(2.5));
	}

	#[test]
	fn test_median_skips_missing() {
		let column = NumberColumn {
			name: "a".to_owned(),
			data: vec![1.0, f32::NAN, 3.0],
		};
		assert_eq!(column.median(), Some(2.0));
	}

	#[test]
	fn test_median_all_missing() {
		let column = NumberColumn {
			name: "a".to_owned(),
			data: vec![f32::NAN, f32::NAN],
		};
		assert_eq!(column.median(), None);
	}

	#[test]
	fn test_fill_missing() {
		let mut column = NumberColumn {
			name: "a".to_owned(),
			data: vec![1.0, f32::NAN, 3.0],
		};
		column.fill_missing(2.0);
		assert_eq!(column.data, vec![1.0, 2.0, 3.0]);
		assert_eq!(column.n_missing(), 0);
	}

	#[test]
	fn test_shuffle_is_deterministic_and_keeps_rows_aligned() {
		let mut df_a = DataFrame {
			columns: vec![
				number_column("x", vec![0.0, 1.0, 2.0, 3.0, 4.0]),
				Column::Text(TextColumn {
					name: "t".to_owned(),
					data: vec!["0", "1", "2", "3", "4"]
						.into_iter()
						.map(String::from)
						.collect(),
				}),
			],
		};
		let mut df_b = df_a.clone();
		df_a.shuffle(42);
		df_b.shuffle(42);
		assert_eq!(df_a, df_b);
		// every row should still pair the number with its original text value
		let numbers = &df_a.columns[0].as_number().unwrap().data;
		let texts = &df_a.columns[1].as_text().unwrap().data;
		for (number, text) in numbers.iter().zip(texts.iter()) {
			assert_eq!(*number as usize, text.parse::<usize>().unwrap());
		}
	}

	#[test]
	fn test_to_rows_f32() {
		let df = DataFrame {
			columns: vec![
				number_column("a", vec![1.0, 2.0]),
				number_column("b", vec![3.0, 4.0]),
			],
		};
		let rows = df.to_rows_f32().unwrap();
		assert_eq!(rows, ndarray::arr2(&[[1.0, 3.0], [2.0, 4.0]]));
	}

	#[test]
	fn test_to_rows_f32_rejects_text_columns() {
		let df = DataFrame {
			columns: vec![
				number_column("a", vec![1.0]),
				Column::Text(TextColumn {
					name: "t".to_owned(),
					data: vec!["x".to_owned()],
				}),
			],
		};
		assert!(df.to_rows_f32().is_none());
	}
}
