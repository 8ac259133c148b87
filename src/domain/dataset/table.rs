//! Tabular data handed to the service by the transports

use ndarray::{Array2, ArrayView1, ShapeError};

use crate::domain::DomainError;

use super::label::Label;

/// Raw table of string cells with a header row
#[derive(Debug, Clone, PartialEq)]
pub struct DataTable {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl DataTable {
    /// Build a table, rejecting rows whose width differs from the header
    pub fn new(headers: Vec<String>, rows: Vec<Vec<String>>) -> Result<Self, DomainError> {
        if headers.is_empty() {
            return Err(DomainError::invalid_params("Table has no columns"));
        }

        for (index, row) in rows.iter().enumerate() {
            if row.len() != headers.len() {
                return Err(DomainError::invalid_params(format!(
                    "Row {} has {} values, expected {}",
                    index + 1,
                    row.len(),
                    headers.len()
                )));
            }
        }

        Ok(Self { headers, rows })
    }

    pub fn headers(&self) -> &[String] {
        &self.headers
    }

    pub fn n_rows(&self) -> usize {
        self.rows.len()
    }

    pub fn n_columns(&self) -> usize {
        self.headers.len()
    }

    /// Split into numeric features (all columns but the last) and labels (last column)
    pub fn into_training_set(self) -> Result<TrainingSet, DomainError> {
        if self.headers.len() < 2 {
            return Err(DomainError::invalid_params(
                "Training data needs at least one feature column and a label column",
            ));
        }

        if self.rows.is_empty() {
            return Err(DomainError::invalid_params("Training data has no rows"));
        }

        let n_rows = self.rows.len();
        let n_features = self.headers.len() - 1;
        let mut columns = self.headers;
        columns.truncate(n_features);

        let mut values = Vec::with_capacity(n_rows * n_features);
        let mut labels = Vec::with_capacity(n_rows);

        for (row_index, row) in self.rows.into_iter().enumerate() {
            values.extend(parse_numeric_row(&row[..n_features], row_index, &columns)?);
            labels.push(Label::parse(&row[n_features]));
        }

        let values = Array2::from_shape_vec((n_rows, n_features), values).map_err(shape_error)?;
        TrainingSet::new(FeatureMatrix::new(columns, values)?, labels)
    }

    /// Treat every column as a numeric feature
    pub fn into_feature_matrix(self) -> Result<FeatureMatrix, DomainError> {
        if self.rows.is_empty() {
            return Err(DomainError::invalid_params("Inference data has no rows"));
        }

        let mut values = Vec::with_capacity(self.rows.len() * self.headers.len());
        for (row_index, row) in self.rows.iter().enumerate() {
            values.extend(parse_numeric_row(row, row_index, &self.headers)?);
        }

        let values = Array2::from_shape_vec((self.rows.len(), self.headers.len()), values)
            .map_err(shape_error)?;
        FeatureMatrix::new(self.headers, values)
    }
}

fn shape_error(err: ShapeError) -> DomainError {
    DomainError::invalid_params(format!("Malformed feature matrix: {}", err))
}

fn parse_numeric_row(
    cells: &[String],
    row_index: usize,
    columns: &[String],
) -> Result<Vec<f64>, DomainError> {
    cells
        .iter()
        .zip(columns)
        .map(|(cell, column)| {
            let value = cell.trim().parse::<f64>().map_err(|_| {
                DomainError::invalid_params(format!(
                    "Row {}, column '{}': '{}' is not a number",
                    row_index + 1,
                    column,
                    cell
                ))
            })?;

            if !value.is_finite() {
                return Err(DomainError::invalid_params(format!(
                    "Row {}, column '{}': value must be finite",
                    row_index + 1,
                    column
                )));
            }

            Ok(value)
        })
        .collect()
}

/// Dense row-major matrix of numeric features
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureMatrix {
    columns: Vec<String>,
    values: Array2<f64>,
}

impl FeatureMatrix {
    pub fn new(columns: Vec<String>, values: Array2<f64>) -> Result<Self, DomainError> {
        if values.ncols() != columns.len() {
            return Err(DomainError::invalid_params(format!(
                "Matrix has {} feature columns, expected {}",
                values.ncols(),
                columns.len()
            )));
        }

        Ok(Self { columns, values })
    }

    /// Build a matrix with generated column names
    pub fn from_rows(rows: Vec<Vec<f64>>) -> Result<Self, DomainError> {
        let width = rows.first().map(Vec::len).unwrap_or(0);
        if let Some(index) = rows.iter().position(|row| row.len() != width) {
            return Err(DomainError::invalid_params(format!(
                "Row {} has {} features, expected {}",
                index + 1,
                rows[index].len(),
                width
            )));
        }

        let n_rows = rows.len();
        let values = Array2::from_shape_vec((n_rows, width), rows.into_iter().flatten().collect())
            .map_err(shape_error)?;
        let columns = (0..width).map(|i| format!("x{}", i)).collect();
        Self::new(columns, values)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn values(&self) -> &Array2<f64> {
        &self.values
    }

    pub fn row(&self, index: usize) -> ArrayView1<'_, f64> {
        self.values.row(index)
    }

    pub fn n_rows(&self) -> usize {
        self.values.nrows()
    }

    pub fn n_features(&self) -> usize {
        self.columns.len()
    }
}

/// Features paired with one label per row
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    features: FeatureMatrix,
    labels: Vec<Label>,
}

impl TrainingSet {
    pub fn new(features: FeatureMatrix, labels: Vec<Label>) -> Result<Self, DomainError> {
        if features.n_rows() != labels.len() {
            return Err(DomainError::invalid_params(format!(
                "{} feature rows but {} labels",
                features.n_rows(),
                labels.len()
            )));
        }

        Ok(Self { features, labels })
    }

    pub fn features(&self) -> &FeatureMatrix {
        &self.features
    }

    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    pub fn n_rows(&self) -> usize {
        self.labels.len()
    }
}
