//! Graph requests: what to sweep, how to filter, how to label the chart.
//!
//! Requests usually come from a parameter file with one row per graph, in
//! the column layout of the TL graph input spreadsheet:
//!
//! ```text
//! excel_file,outcome,oname,oLL,oUL,variable,vname,filter1,f1op,f1criteria,...,plot_type,min_n,graphtype
//! cohort.csv,died,died,0,1,age,Age (years),sex,==,1,...,3,10,p
//! ```

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize};

use crate::data::filter::{FilterSpec, MAX_FILTERS};
use crate::error::{Result, TlError};
use crate::stats::StatisticKind;

// ---------------------------------------------------------------------------
// Plot side and axis bounds
// ---------------------------------------------------------------------------

/// Which threshold curves a graph shows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlotSide {
    AboveOnly,
    BelowOnly,
    Both,
}

impl PlotSide {
    /// Plot type number used in parameter files and figure names.
    pub fn number(self) -> u8 {
        match self {
            PlotSide::AboveOnly => 1,
            PlotSide::BelowOnly => 2,
            PlotSide::Both => 3,
        }
    }

    pub fn shows_above(self) -> bool {
        matches!(self, PlotSide::AboveOnly | PlotSide::Both)
    }

    pub fn shows_below(self) -> bool {
        matches!(self, PlotSide::BelowOnly | PlotSide::Both)
    }
}

impl FromStr for PlotSide {
    type Err = TlError;

    fn from_str(s: &str) -> Result<Self> {
        match parse_whole_number(s) {
            Some(1) => Ok(PlotSide::AboveOnly),
            Some(2) => Ok(PlotSide::BelowOnly),
            Some(3) => Ok(PlotSide::Both),
            _ => Err(TlError::InvalidPlotSide(s.trim().to_string())),
        }
    }
}

/// Y-axis limits.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AxisBounds {
    pub lower: f64,
    pub upper: f64,
}

impl AxisBounds {
    pub const UNIT: AxisBounds = AxisBounds {
        lower: 0.0,
        upper: 1.0,
    };

    pub fn new(lower: f64, upper: f64) -> Result<Self> {
        if lower.is_finite() && upper.is_finite() && lower < upper {
            Ok(Self { lower, upper })
        } else {
            Err(TlError::InvalidParameter(format!(
                "y-axis bounds must satisfy lower < upper, got {lower}..{upper}"
            )))
        }
    }
}

// ---------------------------------------------------------------------------
// GraphSpec
// ---------------------------------------------------------------------------

/// Everything needed to compute and label one TL graph.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphSpec {
    pub outcome: String,
    /// Display name of the outcome (y-axis).
    pub outcome_label: String,
    pub predictor: String,
    /// Display name of the predictor (x-axis).
    pub predictor_label: String,
    pub filters: Vec<FilterSpec>,
    pub plot_side: PlotSide,
    pub min_n: usize,
    pub kind: StatisticKind,
    /// Configured y-axis limits; ignored for proportions.
    pub y_bounds: Option<AxisBounds>,
}

impl GraphSpec {
    /// A spec with no filters, both curves, `min_n = 1` and labels equal to
    /// the column names.
    pub fn new(outcome: &str, predictor: &str, kind: StatisticKind) -> Self {
        Self {
            outcome: outcome.to_string(),
            outcome_label: outcome.to_string(),
            predictor: predictor.to_string(),
            predictor_label: predictor.to_string(),
            filters: Vec::new(),
            plot_side: PlotSide::Both,
            min_n: 1,
            kind,
            y_bounds: None,
        }
    }

    pub fn with_labels(mut self, outcome_label: &str, predictor_label: &str) -> Self {
        self.outcome_label = outcome_label.to_string();
        self.predictor_label = predictor_label.to_string();
        self
    }

    pub fn with_filter(mut self, filter: FilterSpec) -> Self {
        self.filters.push(filter);
        self
    }

    pub fn with_plot_side(mut self, side: PlotSide) -> Self {
        self.plot_side = side;
        self
    }

    pub fn with_min_n(mut self, min_n: usize) -> Self {
        self.min_n = min_n;
        self
    }

    pub fn with_y_bounds(mut self, bounds: AxisBounds) -> Self {
        self.y_bounds = Some(bounds);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.outcome.is_empty() || self.predictor.is_empty() {
            return Err(TlError::InvalidParameter(
                "outcome and predictor variables are required".into(),
            ));
        }
        if self.filters.len() > MAX_FILTERS {
            return Err(TlError::InvalidParameter(format!(
                "{} filters given, at most {MAX_FILTERS} are supported",
                self.filters.len()
            )));
        }
        Ok(())
    }

    pub fn title(&self) -> String {
        format!("{} by {} Threshold", self.outcome_label, self.predictor_label)
    }

    pub fn y_label(&self) -> String {
        format!("{} {}", self.kind.label(), self.outcome_label)
    }

    pub fn x_label(&self) -> String {
        format!("Threshold level of {}", self.predictor_label)
    }

    /// Effective y-axis limits: always `0..1` for proportions.
    pub fn effective_y_bounds(&self) -> Option<AxisBounds> {
        match self.kind {
            StatisticKind::Proportion => Some(AxisBounds::UNIT),
            _ => self.y_bounds,
        }
    }

    /// Conventional image name, `<predictor>_<code>_<outcome>_plot<side>.png`.
    pub fn figure_name(&self) -> String {
        format!(
            "{}_{}_{}_plot{}.png",
            self.predictor,
            self.kind.code(),
            self.outcome,
            self.plot_side.number()
        )
    }
}

/// A graph spec bound to the dataset file it reads.
#[derive(Debug, Clone, PartialEq)]
pub struct GraphRequest {
    pub data_file: PathBuf,
    pub spec: GraphSpec,
}

// ---------------------------------------------------------------------------
// Parameter file rows
// ---------------------------------------------------------------------------

/// One raw row of a graph parameter file. Every cell is kept as text and
/// only interpreted by [`GraphParams::to_request`], so a bad cell costs one
/// graph rather than the whole file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GraphParams {
    #[serde(alias = "excel_file", default, deserialize_with = "text")]
    pub data_file: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub outcome: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub oname: Option<String>,
    #[serde(rename = "oLL", default, deserialize_with = "text")]
    pub o_ll: Option<String>,
    #[serde(rename = "oUL", default, deserialize_with = "text")]
    pub o_ul: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub variable: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub vname: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub filter1: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f1op: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f1criteria: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub filter2: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f2op: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f2criteria: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub filter3: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f3op: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f3criteria: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub filter4: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f4op: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub f4criteria: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub plot_type: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub min_n: Option<String>,
    #[serde(default, deserialize_with = "text")]
    pub graphtype: Option<String>,
}

impl GraphParams {
    /// Interpret this row. Relative dataset paths resolve against `base_dir`.
    pub fn to_request(&self, base_dir: &Path) -> Result<GraphRequest> {
        let data_file = required(&self.data_file, "excel_file")?;
        let outcome = required(&self.outcome, "outcome")?;
        let predictor = required(&self.variable, "variable")?;

        let kind: StatisticKind = required(&self.graphtype, "graphtype")?.parse()?;
        let plot_side: PlotSide = required(&self.plot_type, "plot_type")?.parse()?;
        let min_n_text = required(&self.min_n, "min_n")?;
        let min_n = parse_whole_number(min_n_text)
            .and_then(|n| usize::try_from(n).ok())
            .ok_or_else(|| {
                TlError::InvalidParameter(format!("min_n '{min_n_text}' is not a count"))
            })?;

        let filters = [
            (&self.filter1, &self.f1op, &self.f1criteria),
            (&self.filter2, &self.f2op, &self.f2criteria),
            (&self.filter3, &self.f3op, &self.f3criteria),
            (&self.filter4, &self.f4op, &self.f4criteria),
        ]
        .into_iter()
        .map(|(var, op, crit)| {
            FilterSpec::from_parts(var.as_deref(), op.as_deref(), crit.as_deref())
        })
        .collect::<Result<Vec<_>>>()?;

        let y_bounds = self.y_bounds(outcome);

        let spec = GraphSpec {
            outcome: outcome.to_string(),
            outcome_label: self.oname.clone().unwrap_or_else(|| outcome.to_string()),
            predictor: predictor.to_string(),
            predictor_label: self.vname.clone().unwrap_or_else(|| predictor.to_string()),
            filters,
            plot_side,
            min_n,
            kind,
            y_bounds,
        };
        spec.validate()?;

        Ok(GraphRequest {
            data_file: base_dir.join(data_file),
            spec,
        })
    }

    /// Configured y-axis limits; a bad or partial pair is logged and dropped.
    fn y_bounds(&self, outcome: &str) -> Option<AxisBounds> {
        let bounds = match (number(&self.o_ll, "oLL"), number(&self.o_ul, "oUL")) {
            (Ok(None), Ok(None)) => return None,
            (Ok(Some(lower)), Ok(Some(upper))) => AxisBounds::new(lower, upper),
            (Ok(_), Ok(_)) => Err(TlError::InvalidParameter(
                "oLL and oUL must be set together".into(),
            )),
            (Err(e), _) | (_, Err(e)) => Err(e),
        };
        bounds
            .map_err(|e| log::warn!("Ignoring y-axis limits for '{outcome}': {e}"))
            .ok()
    }
}

fn required<'a>(field: &'a Option<String>, name: &str) -> Result<&'a str> {
    field
        .as_deref()
        .ok_or_else(|| TlError::InvalidParameter(format!("column '{name}' is empty")))
}

fn number(field: &Option<String>, name: &str) -> Result<Option<f64>> {
    field
        .as_deref()
        .filter(|s| *s != "NA")
        .map(|s| {
            s.parse::<f64>().map_err(|_| {
                TlError::InvalidParameter(format!("column '{name}' holds '{s}', not a number"))
            })
        })
        .transpose()
}

/// Parse `3` or `3.0` as an integer; spreadsheets store both.
fn parse_whole_number(s: &str) -> Option<i64> {
    let s = s.trim();
    s.parse::<i64>().ok().or_else(|| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.fract() == 0.0 && v.abs() < 1e15)
            .map(|v| v as i64)
    })
}

/// Accept strings, numbers and booleans as cell text; blank cells are `None`.
fn text<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    struct TextVisitor;

    impl<'de> Visitor<'de> for TextVisitor {
        type Value = Option<String>;

        fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
            f.write_str("a text, numeric or empty cell")
        }

        fn visit_str<E: de::Error>(self, v: &str) -> std::result::Result<Self::Value, E> {
            let v = v.trim();
            Ok((!v.is_empty()).then(|| v.to_string()))
        }

        fn visit_string<E: de::Error>(self, v: String) -> std::result::Result<Self::Value, E> {
            self.visit_str(&v)
        }

        fn visit_bool<E: de::Error>(self, v: bool) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_i64<E: de::Error>(self, v: i64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_u64<E: de::Error>(self, v: u64) -> std::result::Result<Self::Value, E> {
            Ok(Some(v.to_string()))
        }

        fn visit_f64<E: de::Error>(self, v: f64) -> std::result::Result<Self::Value, E> {
            Ok((!v.is_nan()).then(|| v.to_string()))
        }

        fn visit_none<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_unit<E: de::Error>(self) -> std::result::Result<Self::Value, E> {
            Ok(None)
        }

        fn visit_some<D2: Deserializer<'de>>(
            self,
            d: D2,
        ) -> std::result::Result<Self::Value, D2::Error> {
            d.deserialize_any(TextVisitor)
        }
    }

    deserializer.deserialize_any(TextVisitor)
}

/// A parsed parameter file.
#[derive(Debug, Clone, Default)]
pub struct ParamsFile {
    /// Directory relative dataset paths resolve against.
    pub base_dir: PathBuf,
    pub rows: Vec<GraphParams>,
}

impl ParamsFile {
    /// Interpret every row; failures stay per row.
    pub fn requests(&self) -> Vec<Result<GraphRequest>> {
        self.rows
            .iter()
            .map(|row| row.to_request(&self.base_dir))
            .collect()
    }
}

/// Read a graph parameter file (`.csv` or `.json` array of row objects).
pub fn load_graph_params(path: &Path) -> Result<ParamsFile> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let rows = match ext.as_str() {
        "csv" => {
            let mut reader = csv::Reader::from_path(path)?;
            reader
                .deserialize::<GraphParams>()
                .collect::<std::result::Result<Vec<_>, _>>()?
        }
        "json" => {
            let text = std::fs::read_to_string(path)?;
            serde_json::from_str::<Vec<GraphParams>>(&text)?
        }
        other => {
            return Err(TlError::InvalidParameter(format!(
                "unsupported parameter file extension: .{other}"
            )))
        }
    };

    log::info!("Read {} graph definitions from {}", rows.len(), path.display());

    Ok(ParamsFile {
        base_dir: path.parent().map(Path::to_path_buf).unwrap_or_default(),
        rows,
    })
}
