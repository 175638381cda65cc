//! Statistic functions and confidence-interval estimation.

pub mod interval;
pub mod kind;
pub mod summary;

pub use interval::{
    bootstrap_interval, wilson_interval, BootstrapConfig, BootstrapStatistic, ConfidenceInterval,
    IntervalMethod,
};
pub use kind::StatisticKind;
