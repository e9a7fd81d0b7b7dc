//! Tabular view over faro results.

use faro_eval::AlignedReturns;
use faro_traits::{FactorData, ForwardReturns};

/// A single table cell.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    /// Free text, left aligned.
    Text(String),
    /// Integer, right aligned.
    Int(i64),
    /// Float, right aligned and formatted with the current float format.
    Float(f64),
}

/// Row-and-column access to a result table.
pub trait TableView {
    /// Names of the row label columns, e.g. `["date", "asset"]`.
    fn index_names(&self) -> Vec<String>;

    /// Names of the data columns.
    fn column_names(&self) -> Vec<String>;

    /// Number of rows.
    fn n_rows(&self) -> usize;

    /// Row labels of `row`, one per index column.
    fn row_labels(&self, row: usize) -> Vec<String>;

    /// Data cell at `row` and `column`.
    fn cell(&self, row: usize, column: usize) -> Cell;
}

impl TableView for ForwardReturns {
    fn index_names(&self) -> Vec<String> {
        vec!["date".to_string(), "asset".to_string()]
    }

    fn column_names(&self) -> Vec<String> {
        Self::column_names(self)
    }

    fn n_rows(&self) -> usize {
        self.len()
    }

    fn row_labels(&self, row: usize) -> Vec<String> {
        vec![self.dates()[row].to_string(), self.assets()[row].clone()]
    }

    fn cell(&self, row: usize, column: usize) -> Cell {
        Cell::Float(self.values()[[row, column]])
    }
}

impl TableView for FactorData {
    fn index_names(&self) -> Vec<String> {
        self.returns().index_names()
    }

    fn column_names(&self) -> Vec<String> {
        Self::column_names(self)
    }

    fn n_rows(&self) -> usize {
        self.len()
    }

    fn row_labels(&self, row: usize) -> Vec<String> {
        self.returns().row_labels(row)
    }

    fn cell(&self, row: usize, column: usize) -> Cell {
        let n_periods = self.periods().len();
        match (column.checked_sub(n_periods), self.group()) {
            (None, _) => Cell::Float(self.returns().values()[[row, column]]),
            (Some(0), _) => Cell::Float(self.factor()[row]),
            (Some(1), Some(group)) => Cell::Text(group[row].clone()),
            _ => Cell::Int(i64::from(self.factor_quantile()[row])),
        }
    }
}

impl TableView for AlignedReturns {
    fn index_names(&self) -> Vec<String> {
        vec!["offset".to_string()]
    }

    fn column_names(&self) -> Vec<String> {
        self.columns().iter().map(|c| c.label()).collect()
    }

    fn n_rows(&self) -> usize {
        self.len()
    }

    fn row_labels(&self, row: usize) -> Vec<String> {
        vec![self.offsets()[row].to_string()]
    }

    fn cell(&self, row: usize, column: usize) -> Cell {
        Cell::Float(self.columns()[column].values[row])
    }
}
