use std::collections::{BTreeMap, BTreeSet};
use std::path::Path;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use arrow::array::{
    Array, AsArray, Float32Array, Float64Array, Int32Array, Int64Array, StringArray,
};
use arrow::datatypes::DataType;
use csv::StringRecord;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;

use super::model::{Cell, MotionSummary, QcRecord, SubjectRecord};
use crate::error::PipelineError;
use crate::subject_key::strip_separator;

pub const SUBJECT_COLUMN: &str = "sub";
pub const MEAN_FD_COLUMN: &str = "remaining_frame_mean_FD";
pub const SECONDS_COLUMN: &str = "remaining_seconds";

pub const QC_KEY_COLUMN: &str = "subjectkey";
pub const QC_T1_OK: &str = "iqc_t1_ok_ser";
pub const QC_T1_GOOD: &str = "iqc_t1_good_ser";
pub const QC_RSFMRI_OK: &str = "iqc_rsfmri_ok_ser";
pub const QC_RSFMRI_GOOD: &str = "iqc_rsfmri_good_ser";

// ---------------------------------------------------------------------------
// Motion vectors
// ---------------------------------------------------------------------------

/// Load a whitespace-delimited numeric file (one mean FD per subject).
/// Text after `#` is a comment. Every other token must be a number.
pub fn load_motion_vector(path: &Path) -> Result<Vec<f64>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading {}", path.display()))?;

    let mut values = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let content = line.split('#').next().unwrap_or("");
        for tok in content.split_whitespace() {
            let v = tok.parse::<f64>().with_context(|| {
                format!("{} line {}: '{tok}' is not a number", path.display(), line_no + 1)
            })?;
            values.push(v);
        }
    }

    if values.is_empty() {
        return Err(PipelineError::EmptyVector {
            path: path.to_path_buf(),
        }
        .into());
    }
    Ok(values)
}

// ---------------------------------------------------------------------------
// Motion summary
// ---------------------------------------------------------------------------

/// Load the per-subject motion summary.  Dispatch by extension.
///
/// Supported formats:
/// * `.csv`          – comma-separated with a header row (the pipeline input)
/// * `.tsv` / `.txt` – tab-separated with a header row
/// * `.parquet`      – one column per field, string / integer / float typed
///
/// Every `sub` must appear once.
pub fn load_motion_summary(path: &Path) -> Result<MotionSummary> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase();

    let summary = match ext.as_str() {
        "csv" => load_delimited_summary(path, b',')?,
        "tsv" | "txt" => load_delimited_summary(path, b'\t')?,
        "parquet" | "pq" => load_parquet_summary(path)?,
        other => bail!("Unsupported file extension: .{other}"),
    };
    ensure_unique_subjects(&summary, path)?;
    Ok(summary)
}

fn load_delimited_summary(path: &Path, delimiter: u8) -> Result<MotionSummary> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(delimiter)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = header_names(&mut reader, path)?;

    let sub_idx = column_index(&headers, SUBJECT_COLUMN, path)?;
    let fd_idx = column_index(&headers, MEAN_FD_COLUMN, path)?;
    let sec_idx = column_index(&headers, SECONDS_COLUMN, path)?;

    let mut records = Vec::new();
    for (row_no, result) in reader.records().enumerate() {
        let record = result.with_context(|| format!("{} row {row_no}", path.display()))?;

        let mut metadata = BTreeMap::new();
        for (col_idx, value) in record.iter().enumerate() {
            if col_idx == sub_idx || col_idx == fd_idx || col_idx == sec_idx {
                continue;
            }
            if let Some(name) = headers.get(col_idx) {
                metadata.insert(name.clone(), Cell::parse(value));
            }
        }

        records.push(SubjectRecord {
            sub: field(&record, sub_idx).trim().to_string(),
            remaining_frame_mean_fd: Cell::parse(field(&record, fd_idx)),
            remaining_seconds: Cell::parse(field(&record, sec_idx)),
            metadata,
        });
    }

    Ok(MotionSummary::from_records(records))
}

/// Load a Parquet motion summary, as written by `df.to_parquet()`.
fn load_parquet_summary(path: &Path) -> Result<MotionSummary> {
    let file = std::fs::File::open(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let builder = ParquetRecordBatchReaderBuilder::try_new(file)
        .context("reading parquet metadata")?;
    let reader = builder.build().context("building parquet reader")?;

    let mut records = Vec::new();

    for batch_result in reader {
        let batch = batch_result.context("reading parquet record batch")?;
        let schema = batch.schema();

        let index_of = |name: &str| {
            schema.index_of(name).map_err(|_| PipelineError::MissingColumn {
                path: path.to_path_buf(),
                column: name.to_string(),
            })
        };
        let sub_idx = index_of(SUBJECT_COLUMN)?;
        let fd_idx = index_of(MEAN_FD_COLUMN)?;
        let sec_idx = index_of(SECONDS_COLUMN)?;

        let meta_cols: Vec<(usize, String)> = schema
            .fields()
            .iter()
            .enumerate()
            .filter(|(i, _)| ![sub_idx, fd_idx, sec_idx].contains(i))
            .map(|(i, f)| (i, f.name().clone()))
            .collect();

        for row in 0..batch.num_rows() {
            let sub = match extract_cell(batch.column(sub_idx), row) {
                Cell::Null => bail!("{} row {row}: missing '{SUBJECT_COLUMN}'", path.display()),
                other => other.to_string(),
            };

            let mut metadata = BTreeMap::new();
            for (col_idx, col_name) in &meta_cols {
                metadata.insert(col_name.clone(), extract_cell(batch.column(*col_idx), row));
            }

            records.push(SubjectRecord {
                sub,
                remaining_frame_mean_fd: extract_cell(batch.column(fd_idx), row),
                remaining_seconds: extract_cell(batch.column(sec_idx), row),
                metadata,
            });
        }
    }

    Ok(MotionSummary::from_records(records))
}

/// Extract a single cell from an Arrow column at a given row.
fn extract_cell(col: &Arc<dyn Array>, row: usize) -> Cell {
    if col.is_null(row) {
        return Cell::Null;
    }
    let any = col.as_any();
    match col.data_type() {
        DataType::Utf8 => any
            .downcast_ref::<StringArray>()
            .map(|s| Cell::parse(s.value(row)))
            .unwrap_or(Cell::Null),
        DataType::LargeUtf8 => Cell::parse(col.as_string::<i64>().value(row)),
        DataType::Int32 => any
            .downcast_ref::<Int32Array>()
            .map(|a| Cell::Integer(a.value(row) as i64))
            .unwrap_or(Cell::Null),
        DataType::Int64 => any
            .downcast_ref::<Int64Array>()
            .map(|a| Cell::Integer(a.value(row)))
            .unwrap_or(Cell::Null),
        DataType::Float32 => any
            .downcast_ref::<Float32Array>()
            .map(|a| Cell::Float(a.value(row) as f64))
            .unwrap_or(Cell::Null),
        DataType::Float64 => any
            .downcast_ref::<Float64Array>()
            .map(|a| Cell::Float(a.value(row)))
            .unwrap_or(Cell::Null),
        other => Cell::String(format!("{other:?}")),
    }
}

// ---------------------------------------------------------------------------
// QC release table
// ---------------------------------------------------------------------------

/// Load the tab-separated imaging QC table.
///
/// NDA release files repeat the column descriptions as the first data row;
/// that row is always dropped. Keys are normalised to the joined form used by
/// the motion summary (`NDAR_INV...` → `NDARINV...`).
pub fn load_qc_table(path: &Path) -> Result<Vec<QcRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .delimiter(b'\t')
        .flexible(true)
        .from_path(path)
        .with_context(|| format!("opening {}", path.display()))?;
    let headers = header_names(&mut reader, path)?;

    let key_idx = column_index(&headers, QC_KEY_COLUMN, path)?;
    let t1_ok_idx = column_index(&headers, QC_T1_OK, path)?;
    let t1_good_idx = column_index(&headers, QC_T1_GOOD, path)?;
    let rs_ok_idx = column_index(&headers, QC_RSFMRI_OK, path)?;
    let rs_good_idx = column_index(&headers, QC_RSFMRI_GOOD, path)?;

    let mut rows = Vec::new();
    for (row_no, result) in reader.records().enumerate().skip(1) {
        let record = result.with_context(|| format!("{} row {row_no}", path.display()))?;
        rows.push(QcRecord {
            subjectkey: strip_separator(field(&record, key_idx).trim()),
            t1_ok: Cell::parse(field(&record, t1_ok_idx)),
            t1_good: Cell::parse(field(&record, t1_good_idx)),
            rsfmri_ok: Cell::parse(field(&record, rs_ok_idx)),
            rsfmri_good: Cell::parse(field(&record, rs_good_idx)),
        });
    }
    Ok(rows)
}

// -- helpers --

fn header_names<R: std::io::Read>(reader: &mut csv::Reader<R>, path: &Path) -> Result<Vec<String>> {
    Ok(reader
        .headers()
        .with_context(|| format!("reading headers of {}", path.display()))?
        .iter()
        .map(|h| h.trim().to_string())
        .collect())
}

fn column_index(headers: &[String], name: &str, path: &Path) -> Result<usize> {
    headers.iter().position(|h| h == name).ok_or_else(|| {
        PipelineError::MissingColumn {
            path: path.to_path_buf(),
            column: name.to_string(),
        }
        .into()
    })
}

fn ensure_unique_subjects(summary: &MotionSummary, path: &Path) -> Result<()> {
    let mut seen = BTreeSet::new();
    for record in &summary.records {
        if !seen.insert(record.sub.as_str()) {
            return Err(PipelineError::DuplicateSubject {
                path: path.to_path_buf(),
                sub: record.sub.clone(),
            }
            .into());
        }
    }
    Ok(())
}

fn field(record: &StringRecord, idx: usize) -> &str {
    record.get(idx).unwrap_or("")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, body: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(body.as_bytes()).unwrap();
        path
    }

    #[test]
    fn motion_vector_skips_comments_and_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(&dir, "fd.txt", "# header\n0.12\n\n0.2 0.3\n0.4 # trailing\n");
        assert_eq!(load_motion_vector(&p).unwrap(), vec![0.12, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn motion_vector_rejects_bad_token() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(&dir, "fd.txt", "0.1\nabc\n");
        let err = load_motion_vector(&p).unwrap_err();
        assert!(format!("{err:#}").contains("line 2"));
    }

    #[test]
    fn motion_vector_rejects_empty_file() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(&dir, "fd.txt", "\n# nothing\n");
        let err = load_motion_vector(&p).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<PipelineError>(),
            Some(PipelineError::EmptyVector { .. })
        ));
    }

    #[test]
    fn csv_summary_keeps_extra_columns_as_metadata() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(
            &dir,
            "msd.csv",
            "sub,remaining_frame_mean_FD,remaining_seconds,site\n\
             NDARINVA,0.15,720,site01\n\
             NDARINVB,,640,site02\n",
        );
        let msd = load_motion_summary(&p).unwrap();
        assert_eq!(msd.len(), 2);
        assert_eq!(msd.records[0].metadata["site"], Cell::String("site01".into()));
        assert_eq!(msd.records[0].mean_fd(), Some(0.15));
        assert_eq!(msd.records[1].remaining_frame_mean_fd, Cell::Null);
        assert_eq!(msd.records[1].whole_seconds(), Some(640));
    }

    #[test]
    fn csv_summary_requires_core_columns() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(&dir, "msd.csv", "sub,remaining_seconds\nNDARINVA,700\n");
        let err = load_motion_summary(&p).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::MissingColumn { column, .. }) => {
                assert_eq!(column, MEAN_FD_COLUMN)
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn csv_summary_rejects_repeated_subject() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(
            &dir,
            "msd.csv",
            "sub,remaining_frame_mean_FD,remaining_seconds\n\
             NDARINVA,0.15,720\n\
             NDARINVB,0.18,700\n\
             NDARINVA,0.21,650\n",
        );
        let err = load_motion_summary(&p).unwrap_err();
        match err.downcast_ref::<PipelineError>() {
            Some(PipelineError::DuplicateSubject { sub, .. }) => assert_eq!(sub, "NDARINVA"),
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn qc_table_drops_description_row_and_normalises_keys() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(
            &dir,
            "mriqc.txt",
            "\"subjectkey\"\t\"iqc_t1_ok_ser\"\t\"iqc_t1_good_ser\"\t\"iqc_rsfmri_ok_ser\"\t\"iqc_rsfmri_good_ser\"\n\
             \"The NDAR Global Unique Identifier (GUID)\"\t\"T1 ok\"\t\"T1 good\"\t\"rs ok\"\t\"rs good\"\n\
             \"NDAR_INVA\"\t\"1\"\t\"1\"\t\"3\"\t\"2\"\n\
             \"NDAR_INVB\"\t\"\"\t\"0\"\t\"2\"\t\"2\"\n",
        );
        let qc = load_qc_table(&p).unwrap();
        assert_eq!(qc.len(), 2);
        assert_eq!(qc[0].subjectkey, "NDARINVA");
        assert_eq!(qc[0].rsfmri_good, Cell::Integer(2));
        assert_eq!(qc[1].t1_ok, Cell::Null);
    }

    #[test]
    fn parquet_summary_reads_typed_columns() {
        use arrow::array::{Float64Array, Int64Array, StringArray};
        use arrow::datatypes::{Field, Schema};
        use arrow::record_batch::RecordBatch;
        use parquet::arrow::ArrowWriter;

        let schema = Arc::new(Schema::new(vec![
            Field::new(SUBJECT_COLUMN, DataType::Utf8, false),
            Field::new(MEAN_FD_COLUMN, DataType::Float64, true),
            Field::new(SECONDS_COLUMN, DataType::Int64, false),
            Field::new("site", DataType::Utf8, false),
        ]));
        let batch = RecordBatch::try_new(
            schema.clone(),
            vec![
                Arc::new(StringArray::from(vec!["NDARINVA", "NDARINVB"])),
                Arc::new(Float64Array::from(vec![Some(0.2), None])),
                Arc::new(Int64Array::from(vec![700, 500])),
                Arc::new(StringArray::from(vec!["site01", "site02"])),
            ],
        )
        .unwrap();

        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("msd.parquet");
        let file = std::fs::File::create(&path).unwrap();
        let mut writer = ArrowWriter::try_new(file, schema, None).unwrap();
        writer.write(&batch).unwrap();
        writer.close().unwrap();

        let msd = load_motion_summary(&path).unwrap();
        assert_eq!(msd.len(), 2);
        assert_eq!(msd.records[0].sub, "NDARINVA");
        assert_eq!(msd.records[0].mean_fd(), Some(0.2));
        assert_eq!(msd.records[1].remaining_frame_mean_fd, Cell::Null);
        assert_eq!(msd.records[1].whole_seconds(), Some(500));
        assert_eq!(msd.records[1].metadata["site"], Cell::String("site02".into()));
    }

    #[test]
    fn unsupported_extension_fails() {
        let dir = tempfile::tempdir().unwrap();
        let p = write_file(&dir, "msd.xlsx", "");
        assert!(load_motion_summary(&p).is_err());
    }
}
