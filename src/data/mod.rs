//! Data layer: core types, loading, and filtering.
//!
//! Architecture:
//! ```text
//!  .csv / .json / .parquet
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  loader   │  parse file → Dataset
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │ Dataset   │  Vec<Observation>, ordered column names
//!   └──────────┘
//!        │
//!        ▼
//!   ┌──────────┐
//!   │  filter   │  apply (variable, op, criterion) predicates → derived Dataset
//!   └──────────┘
//! ```
pub mod filter;
pub mod loader;
pub mod model;

pub use filter::{apply_filters, CompareOp, FilterResult, FilterSpec, MAX_FILTERS};
pub use model::{Dataset, Observation, Value};
