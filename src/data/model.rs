use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::error::{Result, TlError};

// ---------------------------------------------------------------------------
// Value – a single cell of the dataset
// ---------------------------------------------------------------------------

/// A dynamically-typed cell value mirroring common spreadsheet dtypes.
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    String(String),
    Integer(i64),
    Float(f64),
    Bool(bool),
    Null,
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(s) => write!(f, "{s}"),
            Value::Integer(i) => write!(f, "{i}"),
            Value::Float(v) => write!(f, "{v}"),
            Value::Bool(b) => write!(f, "{b}"),
            Value::Null => write!(f, "<null>"),
        }
    }
}

impl Value {
    /// Parse a text cell, guessing the narrowest type.
    ///
    /// Empty text and the usual missing-value spellings become [`Value::Null`].
    pub fn parse(s: &str) -> Value {
        let s = s.trim();
        if is_missing_token(s) {
            return Value::Null;
        }
        if let Ok(i) = s.parse::<i64>() {
            return Value::Integer(i);
        }
        if let Ok(f) = s.parse::<f64>() {
            return Value::Float(f);
        }
        match s {
            "true" | "True" | "TRUE" => Value::Bool(true),
            "false" | "False" | "FALSE" => Value::Bool(false),
            _ => Value::String(s.to_string()),
        }
    }

    /// Whether the cell counts as missing data (null or NaN).
    pub fn is_missing(&self) -> bool {
        match self {
            Value::Null => true,
            Value::Float(v) => v.is_nan(),
            _ => false,
        }
    }

    /// Try to interpret the value as an `f64`. Booleans count as 0/1.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) if !v.is_nan() => Some(*v),
            Value::Integer(i) => Some(*i as f64),
            Value::Bool(b) => Some(if *b { 1.0 } else { 0.0 }),
            _ => None,
        }
    }
}

fn is_missing_token(s: &str) -> bool {
    matches!(s, "" | "NA" | "N/A" | "NaN" | "nan" | "null" | "NULL" | "None")
}

// ---------------------------------------------------------------------------
// Observation – one row of the table
// ---------------------------------------------------------------------------

/// A single observation (one row of the source table).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Observation {
    /// Column name → cell value. Absent keys read as missing.
    pub values: BTreeMap<String, Value>,
}

impl Observation {
    pub fn new(values: BTreeMap<String, Value>) -> Self {
        Self { values }
    }

    /// Cell for `column`, [`Value::Null`] when the row has no such key.
    pub fn get(&self, column: &str) -> &Value {
        self.values.get(column).unwrap_or(&Value::Null)
    }
}

// ---------------------------------------------------------------------------
// Dataset – the complete loaded table
// ---------------------------------------------------------------------------

/// An in-memory table. Filtering never mutates it; derived views are new
/// datasets sharing the column list.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Dataset {
    /// All observations (rows).
    pub observations: Vec<Observation>,
    /// Ordered column names, as they appeared in the source file.
    pub column_names: Vec<String>,
}

impl Dataset {
    pub fn new(column_names: Vec<String>, observations: Vec<Observation>) -> Self {
        Self {
            observations,
            column_names,
        }
    }

    /// Build a dataset whose columns are the union of all row keys (sorted).
    pub fn from_observations(observations: Vec<Observation>) -> Self {
        let columns: BTreeSet<&String> = observations
            .iter()
            .flat_map(|obs| obs.values.keys())
            .collect();
        let column_names = columns.into_iter().cloned().collect();
        Self::new(column_names, observations)
    }

    /// Build a dataset from named numeric columns of equal length.
    /// NaN entries become missing cells.
    pub fn from_columns(columns: &[(&str, &[f64])]) -> Self {
        let n_rows = columns.iter().map(|(_, v)| v.len()).max().unwrap_or(0);
        let observations = (0..n_rows)
            .map(|row| {
                let values = columns
                    .iter()
                    .map(|(name, data)| {
                        let value = match data.get(row) {
                            Some(v) if !v.is_nan() => Value::Float(*v),
                            _ => Value::Null,
                        };
                        (name.to_string(), value)
                    })
                    .collect();
                Observation::new(values)
            })
            .collect();
        let column_names = columns.iter().map(|(name, _)| name.to_string()).collect();
        Self::new(column_names, observations)
    }

    /// Number of observations.
    pub fn len(&self) -> usize {
        self.observations.len()
    }

    /// Whether the dataset is empty.
    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn has_column(&self, column: &str) -> bool {
        self.column_names.iter().any(|c| c == column)
    }

    /// Derived view keeping only the rows that satisfy `keep`.
    pub fn filter_rows<F>(&self, mut keep: F) -> Dataset
    where
        F: FnMut(&Observation) -> bool,
    {
        let observations = self
            .observations
            .iter()
            .filter(|obs| keep(obs))
            .cloned()
            .collect();
        Dataset::new(self.column_names.clone(), observations)
    }

    /// Derived view without rows missing a value in any of `columns`.
    pub fn drop_missing(&self, columns: &[&str]) -> Dataset {
        self.filter_rows(|obs| columns.iter().all(|col| !obs.get(col).is_missing()))
    }

    /// Paired numeric values of two columns, skipping rows where either is
    /// missing. A present but non-numeric cell is an error.
    pub fn numeric_pairs(&self, first: &str, second: &str) -> Result<Vec<(f64, f64)>> {
        let mut pairs = Vec::with_capacity(self.len());
        for (row, obs) in self.observations.iter().enumerate() {
            let a = numeric_cell(obs, first, row)?;
            let b = numeric_cell(obs, second, row)?;
            if let (Some(a), Some(b)) = (a, b) {
                pairs.push((a, b));
            }
        }
        Ok(pairs)
    }
}

fn numeric_cell(obs: &Observation, column: &str, row: usize) -> Result<Option<f64>> {
    let value = obs.get(column);
    if value.is_missing() {
        return Ok(None);
    }
    value
        .as_f64()
        .map(Some)
        .ok_or_else(|| TlError::NonNumericValue {
            column: column.to_string(),
            row,
            value: value.to_string(),
        })
}
