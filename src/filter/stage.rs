//! The shared filter stage contract.

use crate::filter::{FilterError, FilterResult, Stats};
use crate::table::{Mask, Table};

/// A row-selection step: `table -> (filtered table, stats)`
pub trait FilterStage: Send + Sync {
    /// Short name used in reports and logs
    fn name(&self) -> &str;

    /// Compute one flag per row of `table`
    fn mask(&self, table: &Table) -> FilterResult<Mask>;

    /// Keep the rows selected by [`FilterStage::mask`].
    ///
    /// The input table is never modified.
    fn apply(&self, table: &Table) -> FilterResult<(Table, Stats)> {
        let mask = self.mask(table)?;
        if mask.len() != table.num_rows() {
            return Err(FilterError::MaskLength {
                stage: self.name().to_string(),
                expected: table.num_rows(),
                actual: mask.len(),
            });
        }

        let stats = Stats::from_mask(&mask);
        let filtered = table.filter(&mask)?;
        log::debug!("stage '{}': {}", self.name(), stats);

        Ok((filtered, stats))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::Column;

    struct EveryOther;

    impl FilterStage for EveryOther {
        fn name(&self) -> &str {
            "every_other"
        }

        fn mask(&self, table: &Table) -> FilterResult<Mask> {
            Ok((0..table.num_rows()).map(|i| i % 2 == 0).collect())
        }
    }

    struct Broken;

    impl FilterStage for Broken {
        fn name(&self) -> &str {
            "broken"
        }

        fn mask(&self, _table: &Table) -> FilterResult<Mask> {
            Ok(Mask::filled(1, true))
        }
    }

    fn table() -> Table {
        Table::new(vec![Column::int("id", vec![1, 2, 3, 4, 5])]).unwrap()
    }

    #[test]
    fn test_default_apply() {
        let input = table();
        let (out, stats) = EveryOther.apply(&input).unwrap();

        assert_eq!(out.num_rows(), 3);
        assert_eq!(stats, Stats::new(5, 3));
        assert_eq!(input.num_rows(), 5);
    }

    #[test]
    fn test_mask_length_checked() {
        let err = Broken.apply(&table()).unwrap_err();
        assert!(matches!(
            err,
            FilterError::MaskLength {
                expected: 5,
                actual: 1,
                ..
            }
        ));
    }
}
