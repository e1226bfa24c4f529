//! Expression filter stage.

use crate::expression::{compile, CompiledExpression, ExprResult};
use crate::filter::{FilterResult, FilterStage, Stats};
use crate::table::{Mask, Table};

/// Keeps the rows for which a compiled expression is true
#[derive(Debug, Clone)]
pub struct ExprFilter {
    compiled: CompiledExpression,
}

impl ExprFilter {
    /// Compile `text` with the default function registry
    pub fn new(text: &str) -> ExprResult<Self> {
        Ok(Self::from_compiled(compile(text)?))
    }

    pub fn from_compiled(compiled: CompiledExpression) -> Self {
        Self { compiled }
    }

    pub fn expression(&self) -> &CompiledExpression {
        &self.compiled
    }
}

impl FilterStage for ExprFilter {
    fn name(&self) -> &str {
        self.compiled.name()
    }

    fn mask(&self, table: &Table) -> FilterResult<Mask> {
        self.compiled.mask(table)
    }
}

impl FilterStage for CompiledExpression {
    fn name(&self) -> &str {
        "expr"
    }

    fn mask(&self, table: &Table) -> FilterResult<Mask> {
        Ok(self.evaluate(table)?)
    }
}

/// Compile `expr` and keep the matching rows of `table`
pub fn filter_rows(table: &Table, expr: &str) -> FilterResult<(Table, Stats)> {
    ExprFilter::new(expr)?.apply(table)
}

/// Same as [`filter_rows`] with an already compiled expression
pub fn filter_rows_compiled(
    table: &Table,
    compiled: &CompiledExpression,
) -> FilterResult<(Table, Stats)> {
    compiled.apply(table)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::expression::ExprError;
    use crate::filter::{FilterError, Pipeline};
    use crate::table::{Column, ColumnData};

    fn segments() -> Table {
        Table::new(vec![
            Column::float("dem_h", vec![100.0, 100.0, 100.0, 100.0]),
            Column::float("h_te_best_fit", vec![98.0, 50.0, 101.5, 99.0]),
            Column::int("cloud_flag_atm", vec![0, 0, 4, 1]),
            Column::text(
                "beam",
                vec!["gt1l".into(), "gt1l".into(), "gt2l".into(), "gt3l".into()],
            ),
        ])
        .unwrap()
    }

    #[test]
    fn test_filter_rows() {
        let (out, stats) = filter_rows(
            &segments(),
            "abs(dem_h - h_te_best_fit) <= 3 and cloud_flag_atm < 3",
        )
        .unwrap();

        assert_eq!(stats, Stats::new(4, 2));
        assert_eq!(stats.pass_rate, 0.5);
        assert_eq!(out.num_columns(), 4);
        assert_eq!(
            out.column("beam").unwrap().data,
            ColumnData::Text(vec!["gt1l".into(), "gt3l".into()])
        );
    }

    #[test]
    fn test_zero_rows() {
        let empty = Table::new(vec![
            Column::float("dem_h", vec![]),
            Column::float("h_te_best_fit", vec![]),
        ])
        .unwrap();

        let (out, stats) = filter_rows(&empty, "abs(dem_h - h_te_best_fit) <= 3").unwrap();
        assert_eq!(out.num_rows(), 0);
        assert_eq!(stats, Stats::new(0, 0));
        assert_eq!(stats.pass_rate, 0.0);
    }

    #[test]
    fn test_errors_are_atomic() {
        let table = segments();

        let err = filter_rows(&table, "foo > 1").unwrap_err();
        assert!(matches!(
            err,
            FilterError::Expression(ExprError::UnknownColumn { ref columns }) if columns == &["foo"]
        ));

        let err = filter_rows(&table, "dem_h - h_te_best_fit").unwrap_err();
        assert!(matches!(
            err,
            FilterError::Expression(ExprError::NonBooleanResult { .. })
        ));

        let err = filter_rows(&table, "open('x')").unwrap_err();
        assert!(matches!(
            err,
            FilterError::Expression(ExprError::UnsupportedSyntax { .. })
        ));
    }

    #[test]
    fn test_precompiled() {
        let compiled = compile("cloud_flag_atm == 0").unwrap();
        let (out, stats) = filter_rows_compiled(&segments(), &compiled).unwrap();
        assert_eq!(out.num_rows(), 2);
        assert_eq!(stats.n_pass, 2);

        let (direct, direct_stats) = compiled.apply(&segments()).unwrap();
        assert_eq!(direct, out);
        assert_eq!(direct_stats, stats);

        let stage = ExprFilter::from_compiled(compiled.clone());
        assert_eq!(stage.name(), "expr");
        assert_eq!(stage.expression().source(), "cloud_flag_atm == 0");

        let pipeline = Pipeline::new().with_stage(compiled);
        let (_, report) = pipeline.run(&segments()).unwrap();
        assert_eq!(report.stage("expr"), Some(&stats));
    }
}
