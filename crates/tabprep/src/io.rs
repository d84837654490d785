//! Loading and writing delimited tables.

use crate::error::{PreprocessingError, Result, ResultExt};
use polars::io::csv::read::CsvReadOptions;
use polars::prelude::*;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Cell contents read as missing, in addition to empty cells.
const MISSING_TOKENS: [&str; 18] = [
    "#N/A", "#N/A N/A", "#NA", "-1.#IND", "-1.#QNAN", "-NaN", "-nan", "1.#IND", "1.#QNAN",
    "<NA>", "N/A", "NA", "NULL", "NaN", "None", "n/a", "nan", "null",
];

/// Load a comma-delimited file with a header row.
///
/// Column types are inferred from every row. Empty cells and the usual
/// missing markers (`NA`, `NaN`, `N/A`, `null`, ...) load as nulls.
///
/// Fails with [`PreprocessingError::NotFound`] when the path is not an
/// existing file.
pub fn load_csv(path: impl AsRef<Path>) -> Result<DataFrame> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(PreprocessingError::NotFound(path.to_path_buf()));
    }

    debug!("Reading CSV from {}", path.display());
    let df = CsvReadOptions::default()
        .with_infer_schema_length(None)
        .with_has_header(true)
        .with_parse_options(
            CsvParseOptions::default()
                .with_quote_char(Some(b'"'))
                .with_null_values(Some(NullValues::AllColumns(
                    MISSING_TOKENS.iter().map(|token| (*token).into()).collect(),
                ))),
        )
        .try_into_reader_with_file_path(Some(path.to_path_buf()))
        .and_then(|reader| reader.finish())
        .context(format!("Failed to read '{}'", path.display()))?;

    info!("Loaded {} rows x {} columns from {}", df.height(), df.width(), path.display());
    Ok(df)
}

/// Write a table as comma-delimited text with a header row.
///
/// Missing parent directories are created. Nulls and float `NaN`s are both
/// written as empty cells. The table is written to a temporary sibling file
/// and renamed into place, so a failed write never leaves a partial file at
/// `path`.
pub fn write_csv(df: &mut DataFrame, path: impl AsRef<Path>) -> Result<PathBuf> {
    let path = path.as_ref();
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)
            .context(format!("Failed to create directory '{}'", parent.display()))?;
    }

    let tmp_path = temporary_path(path);
    let written = write_to(df, &tmp_path).and_then(|_| {
        fs::rename(&tmp_path, path).context(format!("Failed to move output to '{}'", path.display()))
    });
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp_path);
        return Err(e);
    }

    info!("Dataset saved: {}", path.display());
    Ok(path.to_path_buf())
}

fn write_to(df: &DataFrame, path: &Path) -> Result<()> {
    let mut prepared = nan_as_missing(df)?;
    let mut file =
        File::create(path).context(format!("Failed to create '{}'", path.display()))?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .with_quote_char(b'"')
        .with_null_value(String::new())
        .finish(&mut prepared)
        .context(format!("Failed to write '{}'", path.display()))?;
    Ok(())
}

/// Copy of `df` with `NaN` float cells turned into nulls.
fn nan_as_missing(df: &DataFrame) -> Result<DataFrame> {
    let mut prepared = df.clone();
    for column in df.get_columns() {
        let name = column.name().clone();
        let cleaned = match column.dtype() {
            DataType::Float64 => column
                .f64()?
                .iter()
                .map(|v| v.filter(|v| !v.is_nan()))
                .collect::<Float64Chunked>()
                .with_name(name.clone())
                .into_series(),
            DataType::Float32 => column
                .f32()?
                .iter()
                .map(|v| v.filter(|v| !v.is_nan()))
                .collect::<Float32Chunked>()
                .with_name(name.clone())
                .into_series(),
            _ => continue,
        };
        prepared.replace(name.as_str(), cleaned)?;
    }
    Ok(prepared)
}

fn temporary_path(path: &Path) -> PathBuf {
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "output.csv".to_string());
    path.with_file_name(format!(".{}.tmp", file_name))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_load_csv_missing_file() {
        let err = load_csv("no/such/file.csv").unwrap_err();
        assert!(matches!(err, PreprocessingError::NotFound(_)));
    }

    #[test]
    fn test_load_csv_directory_is_not_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_csv(dir.path()).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn test_load_csv_reads_header_and_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(&path, "name,score\na,1.5\nb,\nc,3.0\n").unwrap();

        let df = load_csv(&path).unwrap();

        assert_eq!(df.shape(), (3, 2));
        assert_eq!(df.column("score").unwrap().null_count(), 1);
        assert_eq!(df.column("score").unwrap().dtype(), &DataType::Float64);
    }

    #[test]
    fn test_load_csv_missing_markers_are_nulls() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("in.csv");
        fs::write(
            &path,
            "Name,PhD,Grad.Rate\na,70.5,60\nb,NA,n/a\nc,80.0,null\nd,NaN,55\n",
        )
        .unwrap();

        let df = load_csv(&path).unwrap();

        let phd = df.column("PhD").unwrap();
        assert_eq!(phd.dtype(), &DataType::Float64);
        assert_eq!(phd.null_count(), 2);
        let grad = df.column("Grad.Rate").unwrap();
        assert_eq!(grad.dtype(), &DataType::Int64);
        assert_eq!(grad.null_count(), 2);
    }

    #[test]
    fn test_load_csv_infers_types_from_every_row() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("long.csv");
        let mut content = String::from("a,b\n");
        for i in 0..1200 {
            let b = if i == 1099 { "2.5".to_string() } else { i.to_string() };
            content.push_str(&format!("{},{}\n", i, b));
        }
        fs::write(&path, content).unwrap();

        let df = load_csv(&path).unwrap();

        assert_eq!(df.height(), 1200);
        assert_eq!(df.column("a").unwrap().dtype(), &DataType::Int64);
        assert_eq!(df.column("b").unwrap().dtype(), &DataType::Float64);
        let b = df.column("b").unwrap().f64().unwrap();
        assert_eq!(b.get(1099), Some(2.5));
    }

    #[test]
    fn test_write_csv_nan_and_null_as_empty_cells() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = df![
            "id" => [1i64, 2, 3],
            "Accept_Rate" => [Some(50.0), Some(f64::NAN), None],
        ]
        .unwrap();

        write_csv(&mut df, &path).unwrap();

        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "id,Accept_Rate\n1,50.0\n2,\n3,\n");
        // The in-memory table keeps its NaN
        let rate = df.column("Accept_Rate").unwrap().f64().unwrap();
        assert!(rate.get(1).unwrap().is_nan());
    }

    #[test]
    fn test_write_csv_creates_parent_dirs() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deeper/out.csv");
        let mut df = df!["a" => [1i64, 2], "b" => ["x", "y"]].unwrap();

        let written = write_csv(&mut df, &path).unwrap();

        assert_eq!(written, path);
        let content = fs::read_to_string(&path).unwrap();
        assert_eq!(content, "a,b\n1,x\n2,y\n");
        assert!(!temporary_path(&path).exists());
    }

    #[test]
    fn test_write_then_load_preserves_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.csv");
        let mut df = df![
            "x" => [1.0, 2.5, 3.0],
            "flag" => [1i32, 0, 1],
        ]
        .unwrap();

        write_csv(&mut df, &path).unwrap();
        let loaded = load_csv(&path).unwrap();

        assert_eq!(loaded.shape(), (3, 2));
        assert_eq!(loaded.get_column_names(), df.get_column_names());
    }

    #[test]
    fn test_write_csv_fails_when_parent_is_a_file() {
        let dir = tempfile::tempdir().unwrap();
        let blocker = dir.path().join("blocker");
        fs::write(&blocker, "not a directory").unwrap();
        let mut df = df!["a" => [1i64]].unwrap();

        let err = write_csv(&mut df, blocker.join("out.csv")).unwrap_err();

        assert_eq!(err.error_code(), "IO_ERROR");
        assert!(!blocker.join("out.csv").exists());
    }
}
