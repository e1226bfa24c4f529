//! CSV reading and writing.
//!
//! Column types are inferred from the cells of each column:
//! * every cell an integer -> `Int`
//! * every cell a float or empty -> `Float` (empty cells read as NaN)
//! * every cell `true`/`false` in any case -> `Boolean`
//! * anything else -> `Text`
//!
//! Columns of a file without data rows read as `Float`.

use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

use super::{Column, ColumnData, Table, TableError, TableResult};

/// Read a table from a `.csv` file
pub fn read_table(path: &Path) -> TableResult<Table> {
    if !path.exists() {
        return Err(TableError::NotFound(path.to_path_buf()));
    }
    check_extension(path)?;

    let table = read_csv(File::open(path)?)?;
    log::debug!(
        "read {} rows x {} columns from {}",
        table.num_rows(),
        table.num_columns(),
        path.display()
    );
    Ok(table)
}

/// Write a table to a `.csv` file, creating parent directories as needed
pub fn write_table(table: &Table, path: &Path) -> TableResult<()> {
    check_extension(path)?;
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }

    write_csv(table, File::create(path)?)?;
    log::debug!("wrote {} rows to {}", table.num_rows(), path.display());
    Ok(())
}

fn check_extension(path: &Path) -> TableResult<()> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    match ext.as_str() {
        "csv" => Ok(()),
        other => Err(TableError::UnsupportedFormat(format!(".{}", other))),
    }
}

/// Read CSV with a header row
pub fn read_csv<R: Read>(reader: R) -> TableResult<Table> {
    let mut reader = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut cells: Vec<Vec<String>> = vec![Vec::new(); headers.len()];

    for record in reader.records() {
        let record = record?;
        for (column, value) in cells.iter_mut().zip(record.iter()) {
            column.push(value.to_string());
        }
    }

    let columns = headers
        .into_iter()
        .zip(cells)
        .map(|(name, values)| Column::new(name, infer_column(values)))
        .collect();

    Table::new(columns)
}

fn infer_column(values: Vec<String>) -> ColumnData {
    if values.is_empty() {
        return ColumnData::Float(Vec::new());
    }

    if let Some(ints) = values
        .iter()
        .map(|v| v.trim().parse::<i64>().ok())
        .collect::<Option<Vec<_>>>()
    {
        return ColumnData::Int(ints);
    }

    if let Some(floats) = values
        .iter()
        .map(|v| parse_float(v))
        .collect::<Option<Vec<_>>>()
    {
        return ColumnData::Float(floats);
    }

    if let Some(bools) = values
        .iter()
        .map(|v| parse_bool(v))
        .collect::<Option<Vec<_>>>()
    {
        return ColumnData::Boolean(bools);
    }

    ColumnData::Text(values)
}

fn parse_float(value: &str) -> Option<f64> {
    let value = value.trim();
    if value.is_empty() {
        Some(f64::NAN)
    } else {
        value.parse::<f64>().ok()
    }
}

fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" => Some(true),
        "false" => Some(false),
        _ => None,
    }
}

/// Write CSV with a header row
pub fn write_csv<W: Write>(table: &Table, writer: W) -> TableResult<()> {
    let mut writer = csv::Writer::from_writer(writer);

    writer.write_record(table.column_names())?;

    for row in 0..table.num_rows() {
        let record: Vec<String> = table
            .columns()
            .iter()
            .map(|column| format_cell(&column.data, row))
            .collect();
        writer.write_record(&record)?;
    }

    writer.flush()?;
    Ok(())
}

fn format_cell(data: &ColumnData, row: usize) -> String {
    match data {
        ColumnData::Int(v) => v[row].to_string(),
        ColumnData::Float(v) if v[row].is_nan() => String::new(),
        ColumnData::Float(v) => format!("{:?}", v[row]),
        ColumnData::Boolean(v) => (if v[row] { "True" } else { "False" }).to_string(),
        ColumnData::Text(v) => v[row].clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::{DataType, Mask};
    use tempfile::tempdir;

    const SAMPLE: &str = "\
dem_h,h_te_best_fit,terrain_flg,cloud_flag_atm,beam,strong
100.0,98.0,0,0,gt1l,True
100.0,97.5,1,0,gt2l,false
100.0,,0,5,gt3l,TRUE
";

    #[test]
    fn test_read_csv_infers_types() {
        let table = read_csv(SAMPLE.as_bytes()).unwrap();
        assert_eq!(table.num_rows(), 3);

        let types: Vec<DataType> = table.columns().iter().map(|c| c.data_type()).collect();
        assert_eq!(
            types,
            vec![
                DataType::Float,
                DataType::Float,
                DataType::Int,
                DataType::Int,
                DataType::Text,
                DataType::Boolean,
            ]
        );

        match &table.column("h_te_best_fit").unwrap().data {
            ColumnData::Float(v) => {
                assert_eq!(v[1], 97.5);
                assert!(v[2].is_nan());
            }
            other => panic!("unexpected column {:?}", other),
        }
        assert_eq!(
            table.column("strong").unwrap().data,
            ColumnData::Boolean(vec![true, false, true])
        );
    }

    #[test]
    fn test_read_csv_header_only() {
        let table = read_csv("a,b\n".as_bytes()).unwrap();
        assert_eq!(table.num_rows(), 0);
        assert_eq!(table.num_columns(), 2);
        assert_eq!(table.column("a").unwrap().data_type(), DataType::Float);
    }

    #[test]
    fn test_read_csv_rejects_ragged_rows() {
        let result = read_csv("a,b\n1,2\n3\n".as_bytes());
        assert!(matches!(result, Err(TableError::Csv(_))));
    }

    #[test]
    fn test_write_csv() {
        let table = read_csv(SAMPLE.as_bytes()).unwrap();
        let filtered = table.filter(&Mask::new(vec![false, true, true])).unwrap();

        let mut out = Vec::new();
        write_csv(&filtered, &mut out).unwrap();
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "\
dem_h,h_te_best_fit,terrain_flg,cloud_flag_atm,beam,strong
100.0,97.5,1,0,gt2l,False
100.0,,0,5,gt3l,True
"
        );
    }

    #[test]
    fn test_table_files() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("nested").join("out.csv");

        let table = read_csv(SAMPLE.as_bytes()).unwrap();
        write_table(&table, &path).unwrap();

        let back = read_table(&path).unwrap();
        assert_eq!(back.num_rows(), 3);
        assert_eq!(back.column("beam").unwrap().data, table.column("beam").unwrap().data);

        assert!(matches!(
            read_table(&dir.path().join("missing.csv")),
            Err(TableError::NotFound(_))
        ));
        assert!(matches!(
            write_table(&table, &dir.path().join("out.parquet")),
            Err(TableError::UnsupportedFormat(ext)) if ext == ".parquet"
        ));
    }
}
