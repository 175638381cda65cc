use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, TlError};

use super::model::{Dataset, Value};

/// Maximum number of filters a single graph may carry.
pub const MAX_FILTERS: usize = 4;

// ---------------------------------------------------------------------------
// Comparison operator
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

impl CompareOp {
    pub fn symbol(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
        }
    }

    /// Evaluate `cell <op> criterion`.
    ///
    /// Numbers compare numerically, strings lexicographically. A missing cell
    /// or a string/number mismatch only satisfies `!=`.
    pub fn holds(self, cell: &Value, criterion: &Value) -> bool {
        if cell.is_missing() || criterion.is_missing() {
            return self == CompareOp::Ne;
        }
        let ordering = match (cell.as_f64(), criterion.as_f64()) {
            (Some(a), Some(b)) => a.partial_cmp(&b),
            _ => match (cell, criterion) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => None,
            },
        };
        match ordering {
            Some(ord) => self.accepts(ord),
            None => self == CompareOp::Ne,
        }
    }

    fn accepts(self, ord: Ordering) -> bool {
        match self {
            CompareOp::Eq => ord == Ordering::Equal,
            CompareOp::Ne => ord != Ordering::Equal,
            CompareOp::Gt => ord == Ordering::Greater,
            CompareOp::Ge => ord != Ordering::Less,
            CompareOp::Lt => ord == Ordering::Less,
            CompareOp::Le => ord != Ordering::Greater,
        }
    }
}

impl FromStr for CompareOp {
    type Err = TlError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim() {
            "==" | "=" => Ok(CompareOp::Eq),
            "!=" | "<>" => Ok(CompareOp::Ne),
            ">" => Ok(CompareOp::Gt),
            ">=" => Ok(CompareOp::Ge),
            "<" => Ok(CompareOp::Lt),
            "<=" => Ok(CompareOp::Le),
            other => Err(TlError::InvalidOperator(other.to_string())),
        }
    }
}

impl fmt::Display for CompareOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

// ---------------------------------------------------------------------------
// Filter predicate: `variable op criterion`
// ---------------------------------------------------------------------------

/// One `(variable, operator, criterion)` row filter.
/// A filter without a variable is inactive and keeps every row.
#[derive(Debug, Clone, PartialEq)]
pub struct FilterSpec {
    pub variable: Option<String>,
    pub op: CompareOp,
    pub criterion: Value,
}

impl FilterSpec {
    pub fn new(variable: &str, op: CompareOp, criterion: Value) -> Self {
        Self {
            variable: Some(variable.to_string()),
            op,
            criterion,
        }
    }

    /// An inactive filter.
    pub fn unset() -> Self {
        Self {
            variable: None,
            op: CompareOp::Eq,
            criterion: Value::Null,
        }
    }

    /// Build a filter from parameter-file text. A blank or `NA` variable
    /// yields an inactive filter and the other fields are not inspected.
    pub fn from_parts(
        variable: Option<&str>,
        op: Option<&str>,
        criterion: Option<&str>,
    ) -> Result<Self> {
        let variable = match variable.map(str::trim) {
            None | Some("") | Some("NA") | Some("nan") => return Ok(Self::unset()),
            Some(v) => v,
        };
        let op: CompareOp = op.unwrap_or("").parse()?;
        let criterion = criterion
            .map(parse_criterion)
            .filter(|c| !c.is_missing())
            .ok_or_else(|| {
                TlError::InvalidParameter(format!("filter on '{variable}' has no criterion"))
            })?;
        Ok(Self::new(variable, op, criterion))
    }

    pub fn is_active(&self) -> bool {
        self.variable.is_some()
    }
}

impl fmt::Display for FilterSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.variable {
            Some(var) => write!(f, "{var} {} {}", self.op, self.criterion),
            None => write!(f, "<unset>"),
        }
    }
}

/// Parse a criterion literal. Quoted text is always a string.
pub fn parse_criterion(s: &str) -> Value {
    let s = s.trim();
    for quote in ['"', '\''] {
        if s.len() >= 2 && s.starts_with(quote) && s.ends_with(quote) {
            return Value::String(s[1..s.len() - 1].to_string());
        }
    }
    Value::parse(s)
}

// ---------------------------------------------------------------------------
// Filter chain
// ---------------------------------------------------------------------------

/// Outcome of [`apply_filters`].
#[derive(Debug, Clone)]
pub struct FilterResult {
    /// Rows satisfying every active filter.
    pub dataset: Dataset,
    /// Filters skipped because their variable is not a column.
    pub skipped: Vec<String>,
}

/// Keep only rows satisfying all active filters (conjunction).
///
/// Filters whose variable is not a column of `dataset` are logged and skipped.
/// The result does not depend on filter order.
pub fn apply_filters(dataset: &Dataset, filters: &[FilterSpec]) -> FilterResult {
    let mut skipped = Vec::new();
    let mut active: Vec<(&str, CompareOp, &Value)> = Vec::new();

    for filter in filters {
        let Some(variable) = filter.variable.as_deref() else {
            continue;
        };
        if !dataset.has_column(variable) {
            log::warn!("The filter variable '{variable}' is not in the dataset; skipping it");
            skipped.push(variable.to_string());
            continue;
        }
        active.push((variable, filter.op, &filter.criterion));
    }

    let filtered = dataset.filter_rows(|obs| {
        active
            .iter()
            .all(|(variable, op, criterion)| op.holds(obs.get(variable), criterion))
    });

    FilterResult {
        dataset: filtered,
        skipped,
    }
}
