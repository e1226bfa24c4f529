//! Ordered chains of filter stages.

use std::fmt;

use crate::filter::{FilterResult, FilterStage, Stats};
use crate::table::Table;

/// Stats of one stage within a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct StageReport {
    pub stage: String,
    pub stats: Stats,
}

/// Outcome of a pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineReport {
    pub n_in: usize,
    pub n_out: usize,
    pub stages: Vec<StageReport>,
}

impl PipelineReport {
    /// Overall fraction of rows kept, 0.0 for an empty input
    pub fn pass_rate(&self) -> f64 {
        Stats::new(self.n_in, self.n_out).pass_rate
    }

    /// Stats of the first stage called `name`
    pub fn stage(&self, name: &str) -> Option<&Stats> {
        self.stages
            .iter()
            .find(|report| report.stage == name)
            .map(|report| &report.stats)
    }
}

impl fmt::Display for PipelineReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "N_in={} N_out={} pass_rate={:.3}",
            self.n_in,
            self.n_out,
            self.pass_rate()
        )?;
        for report in &self.stages {
            write!(f, " {}_pass_rate={:.3}", report.stage, report.stats.pass_rate)?;
        }
        Ok(())
    }
}

/// Runs stages in order; each stage sees the output of the previous one
#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn FilterStage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl FilterStage + 'static) -> Self {
        self.push(Box::new(stage));
        self
    }

    pub fn push(&mut self, stage: Box<dyn FilterStage>) {
        self.stages.push(stage);
    }

    pub fn len(&self) -> usize {
        self.stages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Apply every stage. The first failure aborts the run.
    pub fn run(&self, table: &Table) -> FilterResult<(Table, PipelineReport)> {
        let mut current: Option<Table> = None;
        let mut stages = Vec::with_capacity(self.stages.len());

        for stage in &self.stages {
            let input = current.as_ref().unwrap_or(table);
            let (output, stats) = stage.apply(input)?;
            stages.push(StageReport {
                stage: stage.name().to_string(),
                stats,
            });
            current = Some(output);
        }

        let output = current.unwrap_or_else(|| table.clone());
        let report = PipelineReport {
            n_in: table.num_rows(),
            n_out: output.num_rows(),
            stages,
        };
        log::debug!("pipeline: {}", report);

        Ok((output, report))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::{ExprFilter, FilterError, StrongBeamFilter};
    use crate::table::{Column, ColumnData};

    const GRANULE: &str = "ATL08_20190101000000_00010201_006_01";

    fn table() -> Table {
        Table::new(vec![
            Column::text(
                "beam",
                vec!["gt1l".into(), "gt1r".into(), "gt2l".into(), "gt3l".into()],
            ),
            Column::text("source_file", vec![format!("{}.csv", GRANULE); 4]),
            Column::float("dem_h", vec![100.0, 100.0, 100.0, 100.0]),
            Column::float("h_te_best_fit", vec![99.0, 99.0, 80.0, 98.5]),
        ])
        .unwrap()
    }

    #[test]
    fn test_run() {
        let pipeline = Pipeline::new()
            .with_stage(StrongBeamFilter::from_orientations([(GRANULE, 0)]))
            .with_stage(ExprFilter::new("abs(dem_h - h_te_best_fit) <= 3").unwrap());
        assert_eq!(pipeline.len(), 2);

        let (out, report) = pipeline.run(&table()).unwrap();

        assert_eq!(report.n_in, 4);
        assert_eq!(report.n_out, 2);
        assert_eq!(report.pass_rate(), 0.5);
        assert_eq!(report.stage("beams"), Some(&Stats::new(4, 3)));
        assert_eq!(report.stage("expr"), Some(&Stats::new(3, 2)));
        assert_eq!(
            out.column("beam").unwrap().data,
            ColumnData::Text(vec!["gt1l".into(), "gt3l".into()])
        );
        assert_eq!(
            report.to_string(),
            "N_in=4 N_out=2 pass_rate=0.500 beams_pass_rate=0.750 expr_pass_rate=0.667"
        );
    }

    #[test]
    fn test_empty_pipeline() {
        let pipeline = Pipeline::new();
        assert!(pipeline.is_empty());

        let (out, report) = pipeline.run(&table()).unwrap();
        assert_eq!(out, table());
        assert_eq!(report.n_out, 4);
        assert!(report.stages.is_empty());
    }

    #[test]
    fn test_stage_failure_aborts() {
        let pipeline = Pipeline::new()
            .with_stage(ExprFilter::new("dem_h > 0").unwrap())
            .with_stage(ExprFilter::new("missing > 0").unwrap());

        assert!(matches!(
            pipeline.run(&table()),
            Err(FilterError::Expression(_))
        ));
    }
}
