//! Strong-beam filter stage.
//!
//! ICESat-2 fires three strong and three weak beams; which side is strong
//! depends on the spacecraft orientation of each granule. The stage keeps the
//! rows whose `(source_file, beam)` pair names a strong beam. Building the
//! granule -> orientation map from instrument files happens elsewhere.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;

use crate::filter::{FilterError, FilterResult, FilterStage};
use crate::table::{ColumnData, Mask, Table};

/// Strong beam ids for a spacecraft orientation (0: left, 1: right)
pub fn strong_beams(sc_orient: i64) -> &'static [&'static str] {
    match sc_orient {
        0 => &["gt1l", "gt2l", "gt3l"],
        1 => &["gt1r", "gt2r", "gt3r"],
        _ => &[],
    }
}

fn granule_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)ATL08_\d{14}_\d+_\d+_\d+").ok())
        .as_ref()
}

/// Granule key for a `source_file` value.
///
/// Uses the embedded `ATL08_<timestamp>_<track>_<release>_<version>` id when
/// present, otherwise the file stem.
pub fn source_stem(source: &str) -> String {
    if let Some(m) = granule_pattern().and_then(|re| re.find(source)) {
        return m.as_str().to_string();
    }
    Path::new(source)
        .file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or(source)
        .to_string()
}

#[derive(Debug, Clone)]
pub struct StrongBeamFilter {
    strong: HashMap<String, Vec<String>>,
    beam_column: String,
    source_column: String,
}

impl StrongBeamFilter {
    /// Build from a granule -> strong beam ids map
    pub fn new(strong: HashMap<String, Vec<String>>) -> Self {
        Self {
            strong,
            beam_column: "beam".to_string(),
            source_column: "source_file".to_string(),
        }
    }

    /// Build from granule -> spacecraft orientation pairs
    pub fn from_orientations<I, S>(orientations: I) -> Self
    where
        I: IntoIterator<Item = (S, i64)>,
        S: Into<String>,
    {
        let strong = orientations
            .into_iter()
            .map(|(granule, sc_orient)| {
                let beams = strong_beams(sc_orient).iter().map(|b| b.to_string()).collect();
                (granule.into(), beams)
            })
            .collect();
        Self::new(strong)
    }

    pub fn with_columns(mut self, beam: impl Into<String>, source: impl Into<String>) -> Self {
        self.beam_column = beam.into();
        self.source_column = source.into();
        self
    }

    fn text_column<'t>(&self, table: &'t Table, name: &str) -> FilterResult<&'t [String]> {
        let column = table
            .column(name)
            .ok_or_else(|| FilterError::MissingColumns {
                stage: self.name().to_string(),
                columns: vec![name.to_string()],
            })?;

        match &column.data {
            ColumnData::Text(values) => Ok(values.as_slice()),
            other => Err(FilterError::ColumnType {
                stage: self.name().to_string(),
                column: name.to_string(),
                data_type: other.data_type(),
            }),
        }
    }
}

impl FilterStage for StrongBeamFilter {
    fn name(&self) -> &str {
        "beams"
    }

    fn mask(&self, table: &Table) -> FilterResult<Mask> {
        let mut missing: Vec<String> = [&self.beam_column, &self.source_column]
            .into_iter()
            .filter(|name| !table.contains_column(name))
            .cloned()
            .collect();
        if !missing.is_empty() {
            missing.sort();
            return Err(FilterError::MissingColumns {
                stage: self.name().to_string(),
                columns: missing,
            });
        }

        // header-only files read every column as float
        if table.num_rows() == 0 {
            return Ok(Mask::default());
        }

        let beams = self.text_column(table, &self.beam_column)?;
        let sources = self.text_column(table, &self.source_column)?;

        Ok(beams
            .iter()
            .zip(sources)
            .map(|(beam, source)| {
                self.strong
                    .get(&source_stem(source))
                    .map_or(false, |strong| strong.iter().any(|b| b == beam))
            })
            .collect())
    }
}
