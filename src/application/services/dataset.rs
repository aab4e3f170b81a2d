//! Statement dataset service
//!
//! Reads bank statement CSV files into enriched tables and writes them back out,
//! optionally with a prediction column.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, info, instrument};

use crate::application::services::Prediction;
use crate::application::{ApplicationError, ApplicationResult, CsvResultExt, IoResultExt};
use crate::domain::{enrich, RawTable, TransactionTable};
use crate::infrastructure::traits::FileSystem;

/// One row of the attribute catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
    pub name: String,
    /// `text`, `number`, `integer`, `date` or `-` when the table is empty
    pub kind: String,
    pub example: String,
}

/// Service for loading and exporting statement tables.
pub struct DatasetService {
    fs: Arc<dyn FileSystem>,
    date_formats: Vec<String>,
}

impl DatasetService {
    pub fn new(fs: Arc<dyn FileSystem>, date_formats: Vec<String>) -> Self {
        Self { fs, date_formats }
    }

    /// Read a CSV file without interpreting any cell.
    #[instrument(level = "debug", skip(self))]
    pub fn read_raw(&self, path: &Path) -> ApplicationResult<RawTable> {
        if !self.fs.exists(path) {
            return Err(ApplicationError::OperationFailed {
                context: format!("file not found: {}", path.display()),
                source: Box::new(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    "file does not exist",
                )),
            });
        }
        let content = self
            .fs
            .read_to_string(path)
            .with_path_context("read statement", path)?;
        parse_csv(&content).with_csv_context("parse statement", path)
    }

    /// Read and enrich a statement file.
    #[instrument(level = "debug", skip(self))]
    pub fn load(&self, path: &Path) -> ApplicationResult<TransactionTable> {
        let raw = self.read_raw(path)?;
        let table = enrich(&raw, &self.date_formats)?;
        info!("loaded {} transactions from {}", table.len(), path.display());
        Ok(table)
    }

    /// Write the enriched table, with `results_column` appended when predictions are given.
    #[instrument(level = "debug", skip(self, table, predictions))]
    pub fn export(
        &self,
        path: &Path,
        table: &TransactionTable,
        predictions: Option<&[Prediction]>,
        results_column: &str,
    ) -> ApplicationResult<()> {
        let content = render_csv(table, predictions, results_column)?;
        self.fs
            .ensure_parent(path)
            .with_path_context("create output directory", path)?;
        self.fs
            .write(path, &content)
            .with_path_context("write export", path)?;
        info!("exported {} rows to {}", table.len(), path.display());
        Ok(())
    }

    /// Name, kind and first value of every attribute a split may use.
    pub fn attributes(table: &TransactionTable) -> Vec<AttributeInfo> {
        table
            .attribute_names()
            .into_iter()
            .map(|name| {
                let value = table.records.first().and_then(|r| r.field(&name));
                AttributeInfo {
                    kind: value.as_ref().map_or("-", |v| v.kind()).to_string(),
                    example: value.map(|v| v.to_string()).unwrap_or_default(),
                    name,
                }
            })
            .collect()
    }
}

/// Parse CSV text into headers and rows; a leading byte order mark is ignored.
pub fn parse_csv(content: &str) -> csv::Result<RawTable> {
    let content = content.strip_prefix('\u{feff}').unwrap_or(content);
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::Headers)
        .from_reader(content.as_bytes());

    let headers: Vec<String> = reader.headers()?.iter().map(str::to_string).collect();
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        // blank trailing lines show up as a single empty field
        if record.len() == 1 && record.get(0).is_some_and(|c| c.trim().is_empty()) {
            continue;
        }
        rows.push(record.iter().map(str::to_string).collect());
    }
    debug!("parsed {} columns, {} rows", headers.len(), rows.len());
    Ok(RawTable::new(headers, rows))
}

/// Render the table as CSV text, in table order.
pub fn render_csv(
    table: &TransactionTable,
    predictions: Option<&[Prediction]>,
    results_column: &str,
) -> ApplicationResult<String> {
    if let Some(predictions) = predictions {
        check_alignment(table, predictions)?;
    }

    let mut writer = csv::Writer::from_writer(Vec::new());
    let mut headers = table.attribute_names();
    if predictions.is_some() {
        headers.push(results_column.to_string());
    }
    writer.write_record(&headers).map_err(csv_err)?;

    let columns = table.attribute_names();
    for (pos, record) in table.records.iter().enumerate() {
        let mut row: Vec<String> = columns.iter().map(|c| record.export_cell(c)).collect();
        if let Some(predictions) = predictions {
            row.push(predictions[pos].label.clone());
        }
        writer.write_record(&row).map_err(csv_err)?;
    }

    let bytes = writer.into_inner().map_err(|e| ApplicationError::OperationFailed {
        context: "flush csv".to_string(),
        source: Box::new(e.into_error()),
    })?;
    String::from_utf8(bytes).map_err(|e| ApplicationError::OperationFailed {
        context: "encode csv".to_string(),
        source: Box::new(e),
    })
}

fn check_alignment(table: &TransactionTable, predictions: &[Prediction]) -> ApplicationResult<()> {
    if predictions.len() != table.len() {
        return Err(ApplicationError::Precondition(format!(
            "{} predictions for {} rows",
            predictions.len(),
            table.len()
        )));
    }
    let misaligned = table
        .records
        .iter()
        .zip(predictions)
        .position(|(r, p)| r.index != p.index);
    if let Some(pos) = misaligned {
        return Err(ApplicationError::Precondition(format!(
            "prediction at position {} belongs to row {}, not row {}",
            pos, predictions[pos].index, table.records[pos].index
        )));
    }
    Ok(())
}

fn csv_err(e: csv::Error) -> ApplicationError {
    ApplicationError::Csv {
        context: "render csv".to_string(),
        source: e,
    }
}
