use crate::domain::errors::EstimatorError;

/// Row-major table of named `f64` features, one row per forecast period.
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureTable {
    columns: Vec<String>,
    n_rows: usize,
    values: Vec<f64>,
}

impl FeatureTable {
    /// Builds a table where every row holds the same `row` values.
    ///
    /// `row` must have one entry per column.
    pub fn repeated(columns: Vec<String>, row: &[f64], n_rows: usize) -> Self {
        debug_assert_eq!(columns.len(), row.len());
        let mut values = Vec::with_capacity(row.len() * n_rows);
        for _ in 0..n_rows {
            values.extend_from_slice(row);
        }
        Self {
            columns,
            n_rows,
            values,
        }
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn n_rows(&self) -> usize {
        self.n_rows
    }

    pub fn n_cols(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.n_rows == 0
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn row(&self, index: usize) -> Option<&[f64]> {
        if index >= self.n_rows {
            return None;
        }
        let width = self.n_cols();
        Some(&self.values[index * width..(index + 1) * width])
    }

    pub fn column(&self, name: &str) -> Option<Vec<f64>> {
        let idx = self.column_index(name)?;
        Some(self.rows().map(|r| r[idx]).collect())
    }

    pub fn rows(&self) -> impl Iterator<Item = &[f64]> {
        // chunks_exact(0) panics, a zero-column table yields empty rows instead
        let width = self.n_cols().max(1);
        let take = if self.n_cols() == 0 { 0 } else { self.n_rows };
        self.values.chunks_exact(width).take(take)
    }

    /// Row-major values, e.g. for building a `[rows, cols]` tensor.
    pub fn as_slice(&self) -> &[f64] {
        &self.values
    }

    pub fn to_rows(&self) -> Vec<Vec<f64>> {
        self.rows().map(|r| r.to_vec()).collect()
    }

    /// Rows reordered to match a model's input layout.
    ///
    /// With `names`, columns are picked by name; without, the table must
    /// already be `width` columns wide and is taken positionally.
    pub fn aligned_rows(
        &self,
        names: Option<&[String]>,
        width: usize,
    ) -> Result<Vec<Vec<f64>>, EstimatorError> {
        match names {
            Some(names) => {
                let indices = names
                    .iter()
                    .map(|name| {
                        self.column_index(name)
                            .ok_or_else(|| EstimatorError::MissingFeature { name: name.clone() })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(self
                    .rows()
                    .map(|row| indices.iter().map(|&i| row[i]).collect())
                    .collect())
            }
            None if self.n_cols() == width => Ok(self.to_rows()),
            None => Err(EstimatorError::ShapeMismatch {
                expected: width,
                actual: self.n_cols(),
            }),
        }
    }
}
