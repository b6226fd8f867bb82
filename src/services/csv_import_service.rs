use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use anyhow::{Context, Result};
use bigdecimal::BigDecimal;
use chrono::{Datelike, NaiveDate};
use csv::{ReaderBuilder, Trim};
use serde::Deserialize;
use sqlx::PgPool;
use tracing::{info, warn};

use crate::db::{price_queries, stock_queries};
use crate::models::{
    fits_numeric_column, normalize_ticker, NewStock, PriceFields, MAX_COMPANY_NAME_LEN, MAX_INDUSTRY_LEN,
    MAX_SERIES_LEN, MAX_TICKER_LEN,
};

pub const METADATA_FILE: &str = "stock_metadata.csv";
const DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Deserialize)]
struct MetadataRow {
    #[serde(rename = "Symbol", default)]
    symbol: String,
    #[serde(rename = "Company Name", default)]
    company_name: String,
    #[serde(rename = "Series", default)]
    series: String,
    #[serde(rename = "Industry", default)]
    industry: String,
}

#[derive(Debug, Deserialize)]
struct PriceRow {
    #[serde(rename = "Date", default)]
    date: String,
    #[serde(rename = "Symbol", default)]
    symbol: String,
    #[serde(rename = "Prev Close", default)]
    prev_close: String,
    #[serde(rename = "Open", default)]
    open: String,
    #[serde(rename = "High", default)]
    high: String,
    #[serde(rename = "Low", default)]
    low: String,
    #[serde(rename = "Last", default)]
    last: String,
    #[serde(rename = "Close", default)]
    close: String,
    #[serde(rename = "VWAP", default)]
    vwap: String,
    #[serde(rename = "Volume", default)]
    volume: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ParsedPriceRow {
    pub ticker: String,
    pub date: NaiveDate,
    pub fields: PriceFields,
}

#[derive(Debug, Default)]
pub struct ParsedPriceFile {
    pub rows: Vec<ParsedPriceRow>,
    pub skipped: usize,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ImportSummary {
    pub stocks_upserted: usize,
    pub files_processed: usize,
    pub files_failed: usize,
    pub records_upserted: usize,
    pub rows_skipped: usize,
}

/// Parses `stock_metadata.csv`. Rows without a usable ticker or series are dropped with a
/// warning; over-long company names and industries are cut to their column width.
pub fn parse_metadata<R: Read>(reader: R) -> Result<Vec<NewStock>> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut stocks = Vec::new();
    for (line_num, result) in reader.deserialize::<MetadataRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("Metadata line {}: failed to parse row: {}", line_num + 2, e);
                continue;
            }
        };

        let line = line_num + 2;
        let mut stock = NewStock::normalized(&row.symbol, &row.company_name, &row.series, &row.industry);
        if stock.ticker.is_empty() || stock.ticker.chars().count() > MAX_TICKER_LEN {
            warn!("Metadata line {}: unusable ticker '{}'", line, row.symbol);
            continue;
        }
        if stock.series.chars().count() > MAX_SERIES_LEN {
            warn!("Metadata line {}: unusable series '{}' for {}", line, stock.series, stock.ticker);
            continue;
        }
        stock.company_name = truncate_or_warn(stock.company_name, MAX_COMPANY_NAME_LEN, "Company Name", line);
        stock.industry = stock
            .industry
            .map(|industry| truncate_or_warn(industry, MAX_INDUSTRY_LEN, "Industry", line));
        stocks.push(stock);
    }
    Ok(stocks)
}

fn truncate_or_warn(value: String, max_chars: usize, column: &str, line: usize) -> String {
    if value.chars().count() <= max_chars {
        return value;
    }
    warn!("Metadata line {}: {} longer than {} characters, truncated", line, column, max_chars);
    value.chars().take(max_chars).collect()
}

/// Parses one price file. Rows are attributed to their `Symbol`, or to
/// `fallback_ticker` when that cell is blank. Only rows dated on or after
/// January 1 of the year before the file's latest date are kept.
pub fn parse_price_file<R: Read>(reader: R, fallback_ticker: &str, source: &str) -> Result<ParsedPriceFile> {
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(reader);

    let mut dated: Vec<(NaiveDate, PriceRow)> = Vec::new();
    let mut skipped = 0;

    for (line_num, result) in reader.deserialize::<PriceRow>().enumerate() {
        let row = match result {
            Ok(row) => row,
            Err(e) => {
                warn!("{} line {}: failed to parse row: {}", source, line_num + 2, e);
                skipped += 1;
                continue;
            }
        };
        match NaiveDate::parse_from_str(&row.date, DATE_FORMAT) {
            Ok(date) => dated.push((date, row)),
            Err(_) => {
                warn!("{} line {}: skipping row with invalid date '{}'", source, line_num + 2, row.date);
                skipped += 1;
            }
        }
    }

    let threshold = dated
        .iter()
        .map(|(date, _)| *date)
        .max()
        .and_then(|latest| NaiveDate::from_ymd_opt(latest.year() - 1, 1, 1));

    let mut rows = Vec::with_capacity(dated.len());
    for (date, row) in dated {
        if threshold.map_or(false, |t| date < t) {
            continue;
        }

        let ticker = match normalize_ticker(&row.symbol) {
            t if t.is_empty() => normalize_ticker(fallback_ticker),
            t => t,
        };

        let context = format!("{} on {}", source, date);
        let fields = PriceFields {
            prev_close_price: decimal_or_warn(&row.prev_close, "Prev Close", &context),
            open_price: decimal_or_warn(&row.open, "Open", &context),
            high_price: decimal_or_warn(&row.high, "High", &context),
            low_price: decimal_or_warn(&row.low, "Low", &context),
            last_price: decimal_or_warn(&row.last, "Last", &context),
            close_price: decimal_or_warn(&row.close, "Close", &context),
            vwap: decimal_or_warn(&row.vwap, "VWAP", &context),
            volume: volume_or_warn(&row.volume, &context),
        };

        rows.push(ParsedPriceRow { ticker, date, fields });
    }

    Ok(ParsedPriceFile { rows, skipped })
}

/// `Ok(None)` for a blank cell, `Err` for text that is not a number or does not fit
/// a price column. Thousands separators are ignored.
pub fn parse_decimal_cell(raw: &str) -> std::result::Result<Option<BigDecimal>, String> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(None);
    }
    let value = BigDecimal::from_str(&cleaned).map_err(|e| format!("invalid decimal '{}': {}", raw, e))?;
    if !fits_numeric_column(&value) {
        return Err(format!("decimal '{}' out of range", raw));
    }
    Ok(Some(value))
}

pub fn parse_volume_cell(raw: &str) -> std::result::Result<Option<i64>, String> {
    let cleaned = raw.trim().replace(',', "");
    if cleaned.is_empty() {
        return Ok(None);
    }
    if let Ok(volume) = cleaned.parse::<i64>() {
        return Ok(Some(volume));
    }
    // Some exports write integral volumes as "12345.0"
    match cleaned.parse::<f64>() {
        Ok(v) if v.is_finite() && v.fract() == 0.0 && v.abs() < i64::MAX as f64 => Ok(Some(v as i64)),
        _ => Err(format!("invalid volume '{}'", raw)),
    }
}

fn decimal_or_warn(raw: &str, column: &str, context: &str) -> Option<BigDecimal> {
    parse_decimal_cell(raw).unwrap_or_else(|e| {
        warn!("{}: {} column: {}", context, column, e);
        None
    })
}

fn volume_or_warn(raw: &str, context: &str) -> Option<i64> {
    parse_volume_cell(raw).unwrap_or_else(|e| {
        warn!("{}: Volume column: {}", context, e);
        None
    })
}

/// Price files in a dataset directory: every `*.csv` except the metadata file, sorted by name.
pub fn price_files(dataset_path: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for entry in std::fs::read_dir(dataset_path)
        .with_context(|| format!("Failed to read dataset directory {:?}", dataset_path))?
    {
        let path = entry?.path();
        let is_csv = path
            .extension()
            .and_then(|e| e.to_str())
            .map_or(false, |e| e.eq_ignore_ascii_case("csv"));
        let is_metadata = path
            .file_name()
            .and_then(|n| n.to_str())
            .map_or(false, |n| n.eq_ignore_ascii_case(METADATA_FILE));
        if path.is_file() && is_csv && !is_metadata {
            files.push(path);
        }
    }
    files.sort();
    Ok(files)
}

/// Imports a dataset directory. Re-running on the same files leaves the store unchanged.
pub async fn import_dataset(pool: &PgPool, dataset_path: &Path) -> Result<ImportSummary> {
    if !dataset_path.is_dir() {
        anyhow::bail!("Directory {:?} does not exist or is not a directory", dataset_path);
    }

    let mut summary = ImportSummary::default();

    let metadata_path = dataset_path.join(METADATA_FILE);
    if metadata_path.is_file() {
        summary.stocks_upserted = import_metadata(pool, &metadata_path).await?;
    } else {
        warn!("Metadata file {:?} not found. Skipping metadata import.", metadata_path);
    }

    let files = price_files(dataset_path)?;
    if files.is_empty() {
        warn!("No price files found in {:?}", dataset_path);
        return Ok(summary);
    }

    let mut stock_ids: HashMap<String, Option<i64>> = HashMap::new();
    for file in &files {
        info!("Processing file: {:?}", file);
        match import_price_file(pool, file, &mut stock_ids).await {
            Ok((upserted, skipped)) => {
                summary.files_processed += 1;
                summary.records_upserted += upserted;
                summary.rows_skipped += skipped;
            }
            Err(e) => {
                warn!("Error processing file {:?}: {:#}", file, e);
                summary.files_failed += 1;
            }
        }
    }

    info!(
        "Import finished: {} stocks, {} files ({} failed), {} records, {} rows skipped",
        summary.stocks_upserted,
        summary.files_processed,
        summary.files_failed,
        summary.records_upserted,
        summary.rows_skipped
    );
    Ok(summary)
}

async fn import_metadata(pool: &PgPool, path: &Path) -> Result<usize> {
    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let stocks = parse_metadata(file)?;

    let mut tx = pool.begin().await?;
    for stock in &stocks {
        stock_queries::upsert(&mut *tx, stock)
            .await
            .with_context(|| format!("Failed to upsert stock {}", stock.ticker))?;
    }
    tx.commit().await?;

    info!("Upserted {} stocks from {:?}", stocks.len(), path);
    Ok(stocks.len())
}

async fn import_price_file(
    pool: &PgPool,
    path: &Path,
    stock_ids: &mut HashMap<String, Option<i64>>,
) -> Result<(usize, usize)> {
    let fallback_ticker = path
        .file_stem()
        .and_then(|s| s.to_str())
        .context("Invalid filename")?
        .to_uppercase();
    let source = path.display().to_string();

    let file = std::fs::File::open(path).with_context(|| format!("Failed to open {:?}", path))?;
    let parsed = parse_price_file(file, &fallback_ticker, &source)?;

    let mut skipped = parsed.skipped;
    let mut upserted = 0;

    let mut tx = pool.begin().await?;
    for row in &parsed.rows {
        let stock_id = match stock_ids.get(&row.ticker) {
            Some(id) => *id,
            None => {
                let id = stock_queries::fetch_by_ticker(&mut *tx, &row.ticker)
                    .await?
                    .map(|s| s.id);
                stock_ids.insert(row.ticker.clone(), id);
                id
            }
        };

        let Some(stock_id) = stock_id else {
            warn!("{}: unknown ticker {} on {}, row skipped", source, row.ticker, row.date);
            skipped += 1;
            continue;
        };

        price_queries::upsert(&mut *tx, stock_id, row.date, &row.fields)
            .await
            .with_context(|| format!("Failed to upsert {} on {}", row.ticker, row.date))?;
        upserted += 1;
    }
    tx.commit().await?;

    Ok((upserted, skipped))
}

#[cfg(test)]
mod tests {
    use super::*;

    const PRICE_HEADER: &str = "Date,Symbol,Series,Prev Close,Open,High,Low,Last,Close,VWAP,Volume\n";

    fn dec(s: &str) -> BigDecimal {
        BigDecimal::from_str(s).unwrap()
    }

    #[test]
    fn test_metadata_defaults_and_normalization() {
        let csv = "Company Name,Industry,Symbol,Series,ISIN Code\n\
                   Adani Ports,SERVICES,adaniports,,INE742F01042\n\
                   Asian Paints,,ASIANPAINT,EQ,INE021A01026\n\
                   Nameless,,,EQ,X\n";
        let stocks = parse_metadata(csv.as_bytes()).unwrap();
        assert_eq!(stocks.len(), 2);
        assert_eq!(stocks[0].ticker, "ADANIPORTS");
        assert_eq!(stocks[0].series, "EQ");
        assert_eq!(stocks[0].industry.as_deref(), Some("SERVICES"));
        assert!(stocks[1].industry.is_none());
    }

    #[test]
    fn test_decimal_cells() {
        assert_eq!(parse_decimal_cell("1,234.50").unwrap(), Some(dec("1234.50")));
        assert_eq!(parse_decimal_cell("  ").unwrap(), None);
        assert!(parse_decimal_cell("n/a").is_err());
    }

    #[test]
    fn test_out_of_range_decimal_cells() {
        assert!(parse_decimal_cell("123456789012.5").is_err());
        assert!(parse_decimal_cell("1e20").is_err());
        assert!(parse_decimal_cell("99,999,999,999.99995").is_err());
        assert_eq!(parse_decimal_cell("99999999999.9999").unwrap(), Some(dec("99999999999.9999")));
    }

    #[test]
    fn test_out_of_range_price_becomes_none_and_row_is_kept() {
        let csv = format!(
            "{}2021-04-29,TCS,EQ,1,1,1,1,1,3100,1,10\n2021-04-30,TCS,EQ,1,1,1,1,1,123456789012.5,1,10\n",
            PRICE_HEADER
        );
        let parsed = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        assert_eq!(parsed.rows.len(), 2);
        assert_eq!(parsed.rows[0].fields.close_price, Some(dec("3100")));
        assert_eq!(parsed.rows[1].fields.close_price, None);
        assert_eq!(parsed.rows[1].fields.open_price, Some(dec("1")));
    }

    #[test]
    fn test_overlong_metadata_is_truncated_or_dropped() {
        let long_name = "N".repeat(150);
        let long_industry = "I".repeat(120);
        let csv = format!(
            "Company Name,Industry,Symbol,Series,ISIN Code\n\
             {},{},LONG,EQ,X1\n\
             Odd Series,IT,ODD,NOTASERIES1,X2\n\
             Fine,IT,FINE,BE,X3\n",
            long_name, long_industry
        );
        let stocks = parse_metadata(csv.as_bytes()).unwrap();
        let tickers: Vec<&str> = stocks.iter().map(|s| s.ticker.as_str()).collect();
        assert_eq!(tickers, vec!["LONG", "FINE"]);
        assert_eq!(stocks[0].company_name.chars().count(), MAX_COMPANY_NAME_LEN);
        assert_eq!(stocks[0].industry.as_ref().map(|i| i.chars().count()), Some(MAX_INDUSTRY_LEN));
        assert_eq!(stocks[1].series, "BE");
    }

    #[test]
    fn test_volume_cells() {
        assert_eq!(parse_volume_cell("1,000").unwrap(), Some(1000));
        assert_eq!(parse_volume_cell("2500.0").unwrap(), Some(2500));
        assert_eq!(parse_volume_cell("").unwrap(), None);
        assert!(parse_volume_cell("12.5").is_err());
        assert!(parse_volume_cell("lots").is_err());
    }

    #[test]
    fn test_malformed_values_become_none_not_zero() {
        let csv = format!("{}2021-04-30,TCS,EQ,3100,abc,3150,,3120,3125.5,3122.1,oops\n", PRICE_HEADER);
        let parsed = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        assert_eq!(parsed.rows.len(), 1);
        let fields = &parsed.rows[0].fields;
        assert_eq!(fields.prev_close_price, Some(dec("3100")));
        assert_eq!(fields.open_price, None);
        assert_eq!(fields.low_price, None);
        assert_eq!(fields.close_price, Some(dec("3125.5")));
        assert_eq!(fields.volume, None);
    }

    #[test]
    fn test_invalid_dates_are_skipped() {
        let csv = format!(
            "{}2021-04-30,TCS,EQ,1,1,1,1,1,1,1,10\n30/04/2021,TCS,EQ,1,1,1,1,1,1,1,10\n",
            PRICE_HEADER
        );
        let parsed = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        assert_eq!(parsed.rows.len(), 1);
        assert_eq!(parsed.skipped, 1);
    }

    #[test]
    fn test_rows_before_window_are_dropped() {
        let csv = format!(
            "{}2021-04-30,TCS,EQ,1,1,1,1,1,1,1,10\n\
             2020-01-01,TCS,EQ,1,1,1,1,1,1,1,10\n\
             2019-12-31,TCS,EQ,1,1,1,1,1,1,1,10\n",
            PRICE_HEADER
        );
        let parsed = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        let dates: Vec<String> = parsed.rows.iter().map(|r| r.date.to_string()).collect();
        assert_eq!(dates, vec!["2021-04-30", "2020-01-01"]);
        assert_eq!(parsed.skipped, 0);
    }

    #[test]
    fn test_blank_symbol_falls_back_to_file_name() {
        let csv = format!("{}2021-04-30,,EQ,1,1,1,1,1,1,1,10\n", PRICE_HEADER);
        let parsed = parse_price_file(csv.as_bytes(), "infy", "infy.csv").unwrap();
        assert_eq!(parsed.rows[0].ticker, "INFY");
    }

    #[test]
    fn test_reparsing_same_input_is_identical() {
        let csv = format!("{}2021-04-30,TCS,EQ,1,2,3,4,5,6,7,8\n", PRICE_HEADER);
        let first = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        let second = parse_price_file(csv.as_bytes(), "TCS", "TCS.csv").unwrap();
        assert_eq!(first.rows, second.rows);
    }
}
