//! CSV record feed for sales exports.
//!
//! ## Column contract (exact header names, order-independent)
//!
//! | Column           | Maps to               | Example        |
//! |------------------|-----------------------|----------------|
//! | `Order Date`     | `SalesLine.order_date`| `2017-12-04`   |
//! | `Order ID`       | `SalesLine.order_id`  | `CA-2017-1520` |
//! | `Category`       | `SalesLine.category`  | `Furniture`    |
//! | `Product Name`   | `SalesLine.sku`       | `Desk Lamp`    |
//! | `Quantity`       | `SalesLine.qty`       | `3`            |
//! | `Order Priority` | `SalesLine.priority`  | `High`         |
//!
//! Any other column (`Customer ID`, `Sales`, ...) is ignored. Rows keep file
//! order. Quoted fields are handled by the `csv` crate.

use std::collections::HashMap;
use std::fs::File;
use std::io::Read;
use std::path::Path;

use chrono::NaiveDate;
use pks_schemas::SalesLine;

use crate::{FeedError, RecordFeed};

const COL_ORDER_DATE: &str = "Order Date";
const COL_ORDER_ID: &str = "Order ID";
const COL_CATEGORY: &str = "Category";
const COL_PRODUCT: &str = "Product Name";
const COL_QUANTITY: &str = "Quantity";
const COL_PRIORITY: &str = "Order Priority";

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%m/%d/%Y", "%d-%m-%Y", "%Y/%m/%d"];

/// Reads a sales export from a local file path.
#[derive(Debug, Clone, Default)]
pub struct CsvRecordFeed;

impl CsvRecordFeed {
    pub fn new() -> Self {
        Self
    }
}

impl RecordFeed for CsvRecordFeed {
    fn source_name(&self) -> &'static str {
        "csv"
    }

    fn load(&self, source: &str) -> Result<Vec<SalesLine>, FeedError> {
        parse_sales_csv_file(Path::new(source))
    }
}

/// Parse a sales CSV file at `path`.
pub fn parse_sales_csv_file(path: &Path) -> Result<Vec<SalesLine>, FeedError> {
    let file = File::open(path)
        .map_err(|e| FeedError::Io(format!("open '{}': {e}", path.display())))?;
    parse_sales_csv_reader(file)
}

/// Parse sales CSV from a string slice (tests, inline fixtures).
pub fn parse_sales_csv_str(src: &str) -> Result<Vec<SalesLine>, FeedError> {
    parse_sales_csv_reader(src.as_bytes())
}

fn parse_sales_csv_reader<R: Read>(reader: R) -> Result<Vec<SalesLine>, FeedError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let headers = rdr
        .headers()
        .map_err(|e| FeedError::Io(format!("read header: {e}")))?
        .clone();
    let cols = ColumnIndex::from_headers(&headers)?;

    let mut out = Vec::new();
    for (i, rec) in rdr.records().enumerate() {
        // 1-based, header is row 1.
        let row = i + 2;
        let rec = rec.map_err(|e| FeedError::Io(format!("row {row}: {e}")))?;

        let get = |idx: usize, field: &'static str| -> Result<&str, FeedError> {
            rec.get(idx).ok_or_else(|| FeedError::ParseField {
                row,
                field,
                raw: String::new(),
            })
        };

        let raw_date = get(cols.order_date, COL_ORDER_DATE)?;
        let order_date = parse_order_date(raw_date).ok_or_else(|| FeedError::ParseField {
            row,
            field: COL_ORDER_DATE,
            raw: raw_date.to_string(),
        })?;

        let raw_qty = get(cols.quantity, COL_QUANTITY)?;
        let qty: i64 = raw_qty.parse().map_err(|_| FeedError::ParseField {
            row,
            field: COL_QUANTITY,
            raw: raw_qty.to_string(),
        })?;

        out.push(SalesLine {
            order_id: get(cols.order_id, COL_ORDER_ID)?.to_string(),
            sku: get(cols.product, COL_PRODUCT)?.to_string(),
            category: get(cols.category, COL_CATEGORY)?.to_string(),
            qty,
            order_date,
            priority: get(cols.priority, COL_PRIORITY)?.to_string(),
        });
    }

    Ok(out)
}

/// Parse an order date, ignoring any trailing time-of-day component.
///
/// Accepted: `YYYY-MM-DD`, `MM/DD/YYYY`, `DD-MM-YYYY`, `YYYY/MM/DD`.
pub fn parse_order_date(raw: &str) -> Option<NaiveDate> {
    let date_part = raw.trim().split([' ', 'T']).next()?;
    DATE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(date_part, fmt).ok())
}

struct ColumnIndex {
    order_date: usize,
    order_id: usize,
    category: usize,
    product: usize,
    quantity: usize,
    priority: usize,
}

impl ColumnIndex {
    fn from_headers(headers: &csv::StringRecord) -> Result<Self, FeedError> {
        let idx: HashMap<&str, usize> = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (h.trim().trim_start_matches('\u{feff}'), i))
            .collect();

        let find = |name: &str| -> Result<usize, FeedError> {
            idx.get(name)
                .copied()
                .ok_or_else(|| FeedError::MissingHeader(name.to_string()))
        };

        Ok(Self {
            order_date: find(COL_ORDER_DATE)?,
            order_id: find(COL_ORDER_ID)?,
            category: find(COL_CATEGORY)?,
            product: find(COL_PRODUCT)?,
            quantity: find(COL_QUANTITY)?,
            priority: find(COL_PRIORITY)?,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
