use core_types::WideTable;
use rust_decimal::prelude::ToPrimitive;
use serde::Serialize;

/// A square, symmetric matrix of Pearson coefficients between table columns.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CorrelationMatrix {
    /// Column labels, in table order. Labels may repeat.
    pub labels: Vec<String>,
    /// `values[i][j]` is the coefficient between columns `i` and `j`, or `None`
    /// when it is undefined (fewer than two shared rows, or zero variance).
    pub values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn get(&self, i: usize, j: usize) -> Option<f64> {
        self.values.get(i)?.get(j).copied().flatten()
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// Computes the Pearson correlation between every pair of columns.
///
/// Each pair uses only the rows where both columns have a value.
pub fn correlation_matrix(table: &WideTable) -> CorrelationMatrix {
    let columns: Vec<Vec<Option<f64>>> = table
        .values
        .iter()
        .map(|column| column.iter().map(|v| v.and_then(|d| d.to_f64())).collect())
        .collect();

    let n = columns.len();
    let mut values = vec![vec![None; n]; n];

    for i in 0..n {
        for j in i..n {
            let corr = if i == j {
                // A column with variance correlates perfectly with itself.
                pearson(&columns[i], &columns[i]).map(|_| 1.0)
            } else {
                pearson(&columns[i], &columns[j])
            };
            values[i][j] = corr;
            values[j][i] = corr;
        }
    }

    tracing::debug!(columns = n, rows = table.height(), "Correlation matrix computed.");

    CorrelationMatrix {
        labels: table.columns.clone(),
        values,
    }
}

/// Pearson correlation over the positions where both series have a value.
pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .collect();

    if pairs.len() < 2 {
        return None;
    }

    let len = pairs.len() as f64;
    let mean_a = pairs.iter().map(|(x, _)| x).sum::<f64>() / len;
    let mean_b = pairs.iter().map(|(_, y)| y).sum::<f64>() / len;

    let mut numer = 0.0;
    let mut denom_a = 0.0;
    let mut denom_b = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_a;
        let dy = y - mean_b;
        numer += dx * dy;
        denom_a += dx * dx;
        denom_b += dy * dy;
    }

    if denom_a == 0.0 || denom_b == 0.0 {
        return None;
    }

    Some(numer / (denom_a.sqrt() * denom_b.sqrt()))
}
