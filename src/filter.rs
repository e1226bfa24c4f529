//! Row filter stages.
//!
//! Every stage shares one contract: given a table, produce a mask, keep the
//! selected rows and report [`Stats`]. Stages know nothing about each other,
//! so a [`Pipeline`] can chain any of them.

pub mod beams;
pub mod expr_stage;
pub mod pipeline;
pub mod stage;

pub use beams::{source_stem, strong_beams, StrongBeamFilter};
pub use expr_stage::{filter_rows, filter_rows_compiled, ExprFilter};
pub use pipeline::{Pipeline, PipelineReport, StageReport};
pub use stage::FilterStage;

use std::fmt;

use serde::Serialize;
use thiserror::Error;

use crate::expression::ExprError;
use crate::table::{DataType, Mask, TableError};

/// Summary of one filter application
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Stats {
    #[serde(rename = "N_total")]
    pub n_total: usize,
    #[serde(rename = "N_pass")]
    pub n_pass: usize,
    /// `n_pass / n_total`, 0.0 for an empty table
    pub pass_rate: f64,
}

impl Stats {
    pub fn new(n_total: usize, n_pass: usize) -> Self {
        let pass_rate = if n_total == 0 {
            0.0
        } else {
            n_pass as f64 / n_total as f64
        };
        Self {
            n_total,
            n_pass,
            pass_rate,
        }
    }

    pub fn from_mask(mask: &Mask) -> Self {
        Self::new(mask.len(), mask.count_selected())
    }
}

impl fmt::Display for Stats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N_total={} N_pass={} pass_rate={:.3}",
            self.n_total, self.n_pass, self.pass_rate
        )
    }
}

/// Errors raised by filter stages
#[derive(Error, Debug)]
pub enum FilterError {
    #[error("Expression failed")]
    Expression(#[from] ExprError),

    #[error("Table error")]
    Table(#[from] TableError),

    #[error("Stage '{stage}' produced {actual} mask entries for {expected} rows")]
    MaskLength {
        stage: String,
        expected: usize,
        actual: usize,
    },

    #[error("Stage '{stage}' requires columns: {columns:?}")]
    MissingColumns { stage: String, columns: Vec<String> },

    #[error("Stage '{stage}' requires column '{column}' to be text, got {data_type}")]
    ColumnType {
        stage: String,
        column: String,
        data_type: DataType,
    },
}

/// Result type for filter stages
pub type FilterResult<T> = Result<T, FilterError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stats() {
        let stats = Stats::from_mask(&Mask::new(vec![true, false, true, true]));
        assert_eq!(stats.n_total, 4);
        assert_eq!(stats.n_pass, 3);
        assert_eq!(stats.pass_rate, 0.75);
        assert_eq!(stats.to_string(), "N_total=4 N_pass=3 pass_rate=0.750");
    }

    #[test]
    fn test_stats_empty() {
        let stats = Stats::from_mask(&Mask::default());
        assert_eq!(stats, Stats::new(0, 0));
        assert_eq!(stats.pass_rate, 0.0);
        assert_eq!(stats.to_string(), "N_total=0 N_pass=0 pass_rate=0.000");
    }

    #[test]
    fn test_expression_error_is_source() {
        use std::error::Error;

        let err = FilterError::from(ExprError::UnknownColumn {
            columns: vec!["foo".to_string()],
        });
        let source = err.source().and_then(|s| s.downcast_ref::<ExprError>());
        assert!(matches!(source, Some(ExprError::UnknownColumn { .. })));
    }

    #[test]
    fn test_error_chain_reports_cause_once() {
        let err = anyhow::Error::from(FilterError::from(ExprError::UnknownColumn {
            columns: vec!["foo".to_string()],
        }));
        assert_eq!(
            format!("{:#}", err),
            "Expression failed: Expression references missing columns: [\"foo\"]"
        );

        let err = anyhow::Error::from(FilterError::from(TableError::MaskLength {
            expected: 2,
            actual: 1,
        }));
        assert_eq!(
            format!("{:#}", err),
            "Table error: Mask has 1 entries but the table has 2 rows"
        );
    }
}
