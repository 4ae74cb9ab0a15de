// 📂 Record Loader - delimited files → typed company / transaction records
//
// Columns are looked up by header name. Rows that fail the required-field
// checks are dropped (logged at debug level, never reported to the caller).

use crate::classifier::LifecycleStage;
use crate::coercion::{parse_amount, parse_date, DateValue};
use crate::config::DataPaths;
use crate::error::{InsightsError, Result};
use csv::{ReaderBuilder, StringRecord};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

// ============================================================================
// RECORDS
// ============================================================================

/// One row of the companies dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompanyRecord {
    /// Identifier (trimmed, never empty)
    pub id: String,

    pub revenue: Option<f64>,

    pub balance: Option<f64>,

    pub opened_on: Option<DateValue>,

    /// Economic activity (CNAE) description
    pub sector: Option<String>,

    pub reference_date: Option<DateValue>,

    /// Filled in by the classifier; None on freshly loaded records
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lifecycle: Option<LifecycleStage>,
}

impl CompanyRecord {
    /// A bare record with only an identifier, mostly useful for tests.
    pub fn new(id: impl Into<String>) -> Self {
        CompanyRecord {
            id: id.into(),
            revenue: None,
            balance: None,
            opened_on: None,
            sector: None,
            reference_date: None,
            lifecycle: None,
        }
    }

    pub fn with_revenue(mut self, revenue: f64) -> Self {
        self.revenue = Some(revenue);
        self
    }

    pub fn with_balance(mut self, balance: f64) -> Self {
        self.balance = Some(balance);
        self
    }

    pub fn with_sector(mut self, sector: impl Into<String>) -> Self {
        self.sector = Some(sector.into());
        self
    }
}

/// One row of the transactions dataset.
///
/// A positive amount is a transfer from `payer` to `payee`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub payer: String,
    pub payee: String,
    pub amount: f64,
    /// Transaction type (DS_TRAN), e.g. "PIX" or "TED"
    pub kind: Option<String>,
    pub date: DateValue,
}

impl TransactionRecord {
    /// True when `entity` is payer or payee.
    pub fn touches(&self, entity: &str) -> bool {
        self.payer == entity || self.payee == entity
    }
}

/// Both datasets, loaded together.
#[derive(Debug, Clone, Default)]
pub struct Datasets {
    pub companies: Vec<CompanyRecord>,
    pub transactions: Vec<TransactionRecord>,
}

// ============================================================================
// COLUMN NAMES
// ============================================================================

pub mod columns {
    pub const COMPANY_ID: &str = "ID";
    pub const COMPANY_REVENUE: &str = "VL_FATU";
    pub const COMPANY_BALANCE: &str = "VL_SLDO";
    pub const COMPANY_OPENED: &str = "DT_ABRT";
    pub const COMPANY_SECTOR: &str = "DS_CNAE";
    pub const COMPANY_REFERENCE: &str = "DT_REFE";

    pub const TX_PAYER: &str = "ID_PGTO";
    pub const TX_PAYEE: &str = "ID_RCBE";
    pub const TX_AMOUNT: &str = "VL";
    pub const TX_KIND: &str = "DS_TRAN";
    pub const TX_DATE: &str = "DT_REFE";
}

// ============================================================================
// LOAD OPTIONS
// ============================================================================

#[derive(Debug, Clone, Default)]
pub struct LoadOptions {
    /// Field delimiter. None = sniff from the header line.
    pub delimiter: Option<char>,
}

impl LoadOptions {
    pub fn with_delimiter(delimiter: Option<char>) -> Self {
        LoadOptions { delimiter }
    }
}

const SNIFF_CANDIDATES: [u8; 4] = [b',', b';', b'\t', b'|'];

/// Pick the most frequent candidate delimiter in the header line.
/// Falls back to ',' on ties or when none appears.
pub fn sniff_delimiter(content: &[u8]) -> u8 {
    let header = content
        .split(|b| *b == b'\n')
        .next()
        .unwrap_or(&[]);

    let mut best = (b',', 0usize);
    for candidate in SNIFF_CANDIDATES {
        let count = header.iter().filter(|b| **b == candidate).count();
        if count > best.1 {
            best = (candidate, count);
        }
    }
    best.0
}

// ============================================================================
// PUBLIC LOADERS
// ============================================================================

pub fn load_companies(path: &Path) -> Result<Vec<CompanyRecord>> {
    load_companies_with(path, &LoadOptions::default())
}

pub fn load_transactions(path: &Path) -> Result<Vec<TransactionRecord>> {
    load_transactions_with(path, &LoadOptions::default())
}

pub fn load_companies_with(path: &Path, options: &LoadOptions) -> Result<Vec<CompanyRecord>> {
    let file = open(path)?;
    let companies = companies_from_reader(file, options)
        .map_err(|e| e.with_path(path))?;
    log::info!("Loaded {} companies from {}", companies.len(), path.display());
    Ok(companies)
}

pub fn load_transactions_with(
    path: &Path,
    options: &LoadOptions,
) -> Result<Vec<TransactionRecord>> {
    let file = open(path)?;
    let transactions = transactions_from_reader(file, options)
        .map_err(|e| e.with_path(path))?;
    log::info!(
        "Loaded {} transactions from {}",
        transactions.len(),
        path.display()
    );
    Ok(transactions)
}

/// Read both datasets concurrently and join before returning.
///
/// Both reads are started before either is awaited; if either fails the
/// whole load fails.
pub fn load_datasets(paths: &DataPaths, options: &LoadOptions) -> Result<Datasets> {
    std::thread::scope(|scope| {
        let companies = scope.spawn(|| load_companies_with(&paths.companies, options));
        let transactions = scope.spawn(|| load_transactions_with(&paths.transactions, options));

        let companies = companies.join().map_err(|_| {
            InsightsError::LoaderPanicked(paths.companies.display().to_string())
        })??;
        let transactions = transactions.join().map_err(|_| {
            InsightsError::LoaderPanicked(paths.transactions.display().to_string())
        })??;

        Ok(Datasets {
            companies,
            transactions,
        })
    })
}

/// Parse companies from any reader. Rows with an empty identifier are dropped.
pub fn companies_from_reader<R: Read>(
    reader: R,
    options: &LoadOptions,
) -> Result<Vec<CompanyRecord>> {
    use columns::*;

    let table = Table::read(reader, options)?;
    let mut companies = Vec::new();

    for (line, record) in table.rows() {
        let id = table.get(record, COMPANY_ID).unwrap_or("").trim();
        if id.is_empty() {
            log::debug!("Dropping company row at line {}: empty {}", line, COMPANY_ID);
            continue;
        }

        companies.push(CompanyRecord {
            id: id.to_string(),
            revenue: parse_amount(table.get(record, COMPANY_REVENUE)),
            balance: parse_amount(table.get(record, COMPANY_BALANCE)),
            opened_on: parse_date(table.get(record, COMPANY_OPENED)),
            sector: table.get(record, COMPANY_SECTOR).map(str::to_string),
            reference_date: parse_date(table.get(record, COMPANY_REFERENCE)),
            lifecycle: None,
        });
    }

    Ok(companies)
}

/// Parse transactions from any reader. Rows missing payer, payee, amount or
/// date are dropped.
pub fn transactions_from_reader<R: Read>(
    reader: R,
    options: &LoadOptions,
) -> Result<Vec<TransactionRecord>> {
    use columns::*;

    let table = Table::read(reader, options)?;
    let mut transactions = Vec::new();

    for (line, record) in table.rows() {
        let payer = table.get(record, TX_PAYER).unwrap_or("").trim();
        let payee = table.get(record, TX_PAYEE).unwrap_or("").trim();
        let amount = parse_amount(table.get(record, TX_AMOUNT));
        let date = parse_date(table.get(record, TX_DATE));

        let (amount, date) = match (amount, date) {
            (Some(amount), Some(date)) if !payer.is_empty() && !payee.is_empty() => (amount, date),
            _ => {
                log::debug!("Dropping transaction row at line {}: missing required field", line);
                continue;
            }
        };

        transactions.push(TransactionRecord {
            payer: payer.to_string(),
            payee: payee.to_string(),
            amount,
            kind: table.get(record, TX_KIND).map(str::to_string),
            date,
        });
    }

    Ok(transactions)
}

// ============================================================================
// INTERNALS
// ============================================================================

fn open(path: &Path) -> Result<File> {
    File::open(path).map_err(|source| InsightsError::SourceUnavailable {
        path: path.to_path_buf(),
        source,
    })
}

/// Parsed header map plus every data record of one file.
struct Table {
    columns: HashMap<String, usize>,
    records: Vec<StringRecord>,
}

impl Table {
    fn read<R: Read>(mut reader: R, options: &LoadOptions) -> Result<Self> {
        let mut content = Vec::new();
        reader
            .read_to_end(&mut content)
            .map_err(|source| InsightsError::SourceUnavailable {
                path: "<reader>".into(),
                source,
            })?;

        if content.starts_with(b"\xEF\xBB\xBF") {
            content.drain(..3);
        }

        let delimiter = match options.delimiter {
            Some(c) => c as u8,
            None => sniff_delimiter(&content),
        };

        let mut rdr = ReaderBuilder::new()
            .has_headers(true)
            .delimiter(delimiter)
            .flexible(true)
            .from_reader(content.as_slice());

        let columns = rdr
            .headers()
            .map_err(|e| InsightsError::from_csv("<reader>", e))?
            .iter()
            .enumerate()
            .map(|(i, name)| (name.trim().to_string(), i))
            .collect();

        let records = rdr
            .records()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| InsightsError::from_csv("<reader>", e))?;

        Ok(Table { columns, records })
    }

    /// Data rows with their 1-based line numbers.
    fn rows(&self) -> impl Iterator<Item = (u64, &StringRecord)> + '_ {
        self.records.iter().map(|record| {
            let line = record.position().map(|p| p.line()).unwrap_or(0);
            (line, record)
        })
    }

    /// Field by column name. Missing columns, short rows and empty fields are None.
    fn get<'r>(&self, record: &'r StringRecord, column: &str) -> Option<&'r str> {
        let index = *self.columns.get(column)?;
        record.get(index).filter(|value| !value.is_empty())
    }
}

// ============================================================================
// TESTS
// ============================================================================
