use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::fmt;

use crate::errors::*;

/// Banks whose statement exports can be turned into an Actual import file.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Bank {
    Revolut,
    Bankinter,
    IngDirect,
}

pub const BANK_NAMES: [&str; 3] = ["revolut", "bankinter", "ingdirect"];

/// Spreadsheet and CSV values, reduced to what the row mappers care about.
#[derive(Clone, Debug, PartialEq)]
pub enum StatementCell {
    Empty,
    Text(String),
    Number(f64),
    Date(NaiveDate),
}

/// One transaction in the layout Actual's CSV importer expects.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct ImportRow {
    pub date: NaiveDate,
    pub payee: String,
    pub notes: String,
    pub amount: String,
}

pub const IMPORT_HEADER: [&str; 4] = ["Date", "Payee", "Notes", "Amount"];
const IMPORT_DATE_FORMAT: &str = "%d/%m/%Y";

// Bankinter and ING exports carry three banner rows and a header row above the data.
const SPREADSHEET_DATA_START_ROW: usize = 4;

impl Bank {
    pub fn from_name(name: &str) -> Result<Bank> {
        match name {
            "revolut" => Ok(Bank::Revolut),
            "bankinter" => Ok(Bank::Bankinter),
            "ingdirect" => Ok(Bank::IngDirect),
            _ => bail!("Unknown bank: {}", name),
        }
    }

    pub fn is_spreadsheet(self) -> bool {
        self != Bank::Revolut
    }

    /// Zero-based index of the first transaction row in the export.
    pub fn data_start_row(self) -> usize {
        match self {
            Bank::Revolut => 1,
            Bank::Bankinter | Bank::IngDirect => SPREADSHEET_DATA_START_ROW,
        }
    }

    pub fn map_row(self, cells: &[StatementCell]) -> Result<ImportRow> {
        match self {
            Bank::Revolut => map_revolut_row(cells),
            Bank::Bankinter => map_bankinter_row(cells),
            Bank::IngDirect => map_ingdirect_row(cells),
        }
    }
}

impl fmt::Display for Bank {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Bank::Revolut => "revolut",
            Bank::Bankinter => "bankinter",
            Bank::IngDirect => "ingdirect",
        };
        write!(f, "{}", name)
    }
}

impl ImportRow {
    pub fn to_record(&self) -> [String; 4] {
        [
            self.date.format(IMPORT_DATE_FORMAT).to_string(),
            self.payee.clone(),
            self.notes.clone(),
            self.amount.clone(),
        ]
    }
}

impl StatementCell {
    pub fn is_empty(&self) -> bool {
        match self {
            StatementCell::Empty => true,
            StatementCell::Text(text) => text.trim().is_empty(),
            _ => false,
        }
    }

    fn text(&self) -> String {
        match self {
            StatementCell::Empty => String::new(),
            StatementCell::Text(text) => text.clone(),
            StatementCell::Number(number) => number.to_string(),
            StatementCell::Date(date) => date.format(IMPORT_DATE_FORMAT).to_string(),
        }
    }
}

/// Converts an Excel serial day number (1900 date system) to a date.
pub fn excel_serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !serial.is_finite() || serial < 0.0 {
        return None;
    }
    NaiveDate::from_ymd_opt(1899, 12, 30)?.checked_add_signed(Duration::days(serial.trunc() as i64))
}

// Revolut CSV: started date in column 3, description in column 5, amount in column 6.
fn map_revolut_row(cells: &[StatementCell]) -> Result<ImportRow> {
    let started = cell(cells, 2);
    let started_text = started.text();
    let date = NaiveDateTime::parse_from_str(started_text.trim(), "%Y-%m-%d %H:%M:%S")
        .map(|datetime| datetime.date())
        .chain_err(|| format!("Invalid date: '{}'", started_text))?;
    let amount = cell(cells, 5).text();
    ensure!(!amount.trim().is_empty(), "Missing amount");
    Ok(ImportRow {
        date,
        payee: cell(cells, 4).text(),
        notes: String::new(),
        amount: trim_zero_cents(amount.trim()),
    })
}

// Bankinter XLS: date in column 1 (day first), payee in column 3, amount in column 4.
fn map_bankinter_row(cells: &[StatementCell]) -> Result<ImportRow> {
    let date = match cell(cells, 0) {
        StatementCell::Date(date) => *date,
        StatementCell::Number(serial) => excel_serial_to_date(*serial)
            .chain_err(|| format!("Invalid date: '{}'", serial))?,
        other => {
            let text = other.text();
            let text = text.trim();
            ensure!(!text.is_empty(), "Missing date");
            parse_day_first_date(text).chain_err(|| format!("Invalid date: '{}'", text))?
        }
    };
    let amount = match cell(cells, 3) {
        StatementCell::Number(number) => format_amount(*number),
        other if other.is_empty() => bail!("Missing amount"),
        other => trim_zero_cents(&other.text().trim().replace(',', ".")),
    };
    Ok(ImportRow {
        date,
        payee: clean_payee(&cell(cells, 2).text()),
        notes: String::new(),
        amount,
    })
}

// ING XLS: Fecha, Categoría, Subcategoría, Descripción, Comentario, Imagen, Importe, Saldo.
fn map_ingdirect_row(cells: &[StatementCell]) -> Result<ImportRow> {
    let date = match cell(cells, 0) {
        StatementCell::Date(date) => *date,
        other if other.is_empty() => bail!("Missing date"),
        other => {
            let text = other.text();
            NaiveDate::parse_from_str(text.trim(), IMPORT_DATE_FORMAT)
                .chain_err(|| format!("Invalid date: '{}'", text))?
        }
    };
    let amount = match cell(cells, 6) {
        StatementCell::Number(number) => *number,
        other if other.is_empty() => bail!("Missing amount"),
        other => {
            let text = other.text().replace(',', ".");
            text.trim()
                .parse::<f64>()
                .chain_err(|| format!("Unparsable amount: '{}'", text.trim()))?
        }
    };
    Ok(ImportRow {
        date,
        payee: clean_payee(&cell(cells, 3).text()),
        notes: String::new(),
        amount: format_amount(amount),
    })
}

static EMPTY_CELL: StatementCell = StatementCell::Empty;

fn cell(cells: &[StatementCell], index: usize) -> &StatementCell {
    cells.get(index).unwrap_or(&EMPTY_CELL)
}

fn parse_day_first_date(text: &str) -> Option<NaiveDate> {
    const DATE_FORMATS: [&str; 4] = ["%d/%m/%Y", "%d-%m-%Y", "%d.%m.%Y", "%Y-%m-%d"];
    const DATETIME_FORMATS: [&str; 2] = ["%d/%m/%Y %H:%M:%S", "%Y-%m-%d %H:%M:%S"];
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .or_else(|| {
            DATETIME_FORMATS
                .iter()
                .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
                .map(|datetime| datetime.date())
        })
}

/// Removes characters that upset Actual's importer from a payee name.
pub fn clean_payee(payee: &str) -> String {
    payee
        .chars()
        .filter(|c| !matches!(c, '/' | '\\' | ','))
        .collect::<String>()
        .trim()
        .to_string()
}

fn format_amount(amount: f64) -> String {
    trim_zero_cents(&format!("{:.2}", amount))
}

fn trim_zero_cents(amount: &str) -> String {
    amount.strip_suffix(".00").unwrap_or(amount).to_string()
}
