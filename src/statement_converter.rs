use calamine::{open_workbook_auto, DataType, Reader};
use log::debug;
use std::io::Write;
use std::path::{Path, PathBuf};

use crate::bank_statements::*;
use crate::errors::*;

const OUTPUT_SUFFIX: &str = "_processed.csv";

#[derive(Debug)]
pub struct ConversionReport {
    pub output_file: PathBuf,
    pub written: usize,
    pub skipped: Vec<SkippedRow>,
}

/// A statement row that could not be mapped. `row_number` is 1-based, as a spreadsheet shows it.
#[derive(Debug, Eq, PartialEq)]
pub struct SkippedRow {
    pub row_number: usize,
    pub reason: String,
}

pub struct StatementConverter;

impl StatementConverter {
    /// Converts a bank export into `<input stem>_processed.csv` next to the input file.
    pub fn convert(bank: Bank, input_file: &Path) -> Result<ConversionReport> {
        println!("Reading {} statement {}...", bank, input_file.display());
        let rows = if bank.is_spreadsheet() {
            read_spreadsheet_rows(input_file)?
        } else {
            read_csv_rows(input_file)?
        };
        let (import_rows, skipped) = map_rows(bank, rows);
        for row in &skipped {
            println!("  Skipping row {}: {}", row.row_number, row.reason);
        }
        let output_file = output_path(input_file);
        let writer = csv_writer(bank)
            .from_path(&output_file)
            .chain_err(|| format!("Failed to create output file {}", output_file.display()))?;
        write_import_rows(writer, &import_rows)
            .chain_err(|| format!("Failed to write output file {}", output_file.display()))?;
        println!("Processed data saved in '{}'.", output_file.display());
        Ok(ConversionReport {
            output_file,
            written: import_rows.len(),
            skipped,
        })
    }
}

pub fn output_path(input_file: &Path) -> PathBuf {
    let mut name = input_file.with_extension("").into_os_string();
    name.push(OUTPUT_SUFFIX);
    PathBuf::from(name)
}

/// Maps every row from the bank's first data row on. Blank rows are dropped without a report.
fn map_rows(
    bank: Bank,
    rows: Vec<(usize, Vec<StatementCell>)>,
) -> (Vec<ImportRow>, Vec<SkippedRow>) {
    let mut import_rows = Vec::new();
    let mut skipped = Vec::new();
    for (index, cells) in rows {
        if index < bank.data_start_row() || cells.iter().all(StatementCell::is_empty) {
            continue;
        }
        match bank.map_row(&cells) {
            Ok(row) => {
                debug!("Row {}: {:?}", index + 1, row);
                import_rows.push(row);
            }
            Err(err) => skipped.push(SkippedRow {
                row_number: index + 1,
                reason: err.to_string(),
            }),
        }
    }
    (import_rows, skipped)
}

fn csv_writer(bank: Bank) -> csv::WriterBuilder {
    let mut builder = csv::WriterBuilder::new();
    // Payees in spreadsheet exports have already lost their separators; write them bare.
    if bank.is_spreadsheet() {
        builder.quote_style(csv::QuoteStyle::Never);
    }
    builder
}

fn write_import_rows<W: Write>(mut writer: csv::Writer<W>, rows: &[ImportRow]) -> Result<()> {
    writer
        .write_record(&IMPORT_HEADER)
        .chain_err(|| "Failed to write header")?;
    for row in rows {
        writer
            .write_record(&row.to_record())
            .chain_err(|| "Failed to write row")?;
    }
    writer.flush().chain_err(|| "Failed to flush output")
}

fn read_csv_rows(input_file: &Path) -> Result<Vec<(usize, Vec<StatementCell>)>> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_path(input_file)
        .chain_err(|| format!("Failed to open CSV file {}", input_file.display()))?;
    let mut rows = Vec::new();
    for (index, record) in reader.records().enumerate() {
        let record = record.chain_err(|| format!("Failed to read CSV record {}", index + 1))?;
        rows.push((
            index,
            record
                .iter()
                .map(|field| StatementCell::Text(field.to_string()))
                .collect(),
        ));
    }
    Ok(rows)
}

fn read_spreadsheet_rows(input_file: &Path) -> Result<Vec<(usize, Vec<StatementCell>)>> {
    let mut workbook = open_workbook_auto(input_file)
        .chain_err(|| format!("Failed to open spreadsheet {}", input_file.display()))?;
    let range = workbook
        .worksheet_range_at(0)
        .chain_err(|| format!("Spreadsheet {} has no sheets", input_file.display()))?
        .chain_err(|| format!("Failed to read spreadsheet {}", input_file.display()))?;
    // The range starts at the first non-empty cell; re-anchor rows and columns at A1.
    let (first_row, first_column) = range.start().unwrap_or((0, 0));
    Ok(range
        .rows()
        .enumerate()
        .map(|(offset, cells)| {
            let mut row = vec![StatementCell::Empty; first_column as usize];
            row.extend(cells.iter().map(statement_cell));
            (first_row as usize + offset, row)
        })
        .collect())
}

fn statement_cell(value: &DataType) -> StatementCell {
    match value {
        DataType::String(text) => StatementCell::Text(text.clone()),
        DataType::Float(number) => StatementCell::Number(*number),
        DataType::Int(number) => StatementCell::Number(*number as f64),
        DataType::DateTime(serial) => {
            excel_serial_to_date(*serial).map_or(StatementCell::Empty, StatementCell::Date)
        }
        DataType::Bool(flag) => StatementCell::Text(flag.to_string()),
        _ => StatementCell::Empty,
    }
}
