//! Table loading from CSV and JSON files.
//!
//! Tables are located by file extension: `.json` files hold a JSON array of
//! records, anything else is read as comma-separated text with a header row.
//! Columns are matched by header name, so extra columns and any column order
//! are accepted.

use serde::de::DeserializeOwned;
use splitlab_core::{Assignment, LineItem, OrderRecord, OrderSource, SourceError, Variant};
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

/// Order source backed by files on disk
#[derive(Debug, Clone)]
pub struct FileSource {
    pub orders_path: PathBuf,
    /// Missing line-item table means every order has volume 0
    pub line_items_path: Option<PathBuf>,
    pub assignments_path: Option<PathBuf>,
}

impl FileSource {
    /// Source reading only an orders table
    pub fn new(orders_path: impl Into<PathBuf>) -> Self {
        Self {
            orders_path: orders_path.into(),
            line_items_path: None,
            assignments_path: None,
        }
    }

    /// Attach a line-item table
    pub fn with_line_items(mut self, path: impl Into<PathBuf>) -> Self {
        self.line_items_path = Some(path.into());
        self
    }

    /// Attach a table of previously recorded assignments
    pub fn with_assignments(mut self, path: impl Into<PathBuf>) -> Self {
        self.assignments_path = Some(path.into());
        self
    }
}

impl OrderSource for FileSource {
    fn orders(&self) -> Result<Vec<OrderRecord>, SourceError> {
        if is_json(&self.orders_path) {
            return load_json(&self.orders_path, "orders");
        }
        load_orders_csv(&self.orders_path)
    }

    fn line_items(&self) -> Result<Vec<LineItem>, SourceError> {
        match &self.line_items_path {
            Some(path) if is_json(path) => load_json(path, "line_items"),
            Some(path) => load_line_items_csv(path),
            None => Ok(Vec::new()),
        }
    }

    fn assignment_history(&self) -> Result<Vec<Assignment>, SourceError> {
        match &self.assignments_path {
            Some(path) if is_json(path) => load_json(path, "assignments"),
            Some(path) => load_assignments_csv(path),
            None => Ok(Vec::new()),
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

fn load_json<T: DeserializeOwned>(path: &Path, table: &str) -> Result<Vec<T>, SourceError> {
    let reader = BufReader::new(File::open(path)?);
    serde_json::from_reader(reader).map_err(|e| SourceError::Parse {
        table: table.to_string(),
        line: e.line(),
        message: e.to_string(),
    })
}

/// Load an orders table.
///
/// Required columns: `user_id`, `order_id`, `order_number`,
/// `days_since_prior_order`. An empty or `NaN` delta is read as missing.
pub fn load_orders_csv(path: &Path) -> Result<Vec<OrderRecord>, SourceError> {
    let table = CsvTable::open(path, "orders")?;
    let user_id = table.column("user_id")?;
    let order_id = table.column("order_id")?;
    let order_number = table.column("order_number")?;
    let delta = table.column("days_since_prior_order")?;

    table.rows(|row| {
        Ok(OrderRecord {
            user_id: row.parse(user_id)?,
            order_id: row.parse(order_id)?,
            order_number: row.parse(order_number)?,
            days_since_prior_order: row.optional_f64(delta)?,
        })
    })
}

/// Load a line-item table.
///
/// Required column: `order_id`. With an `item_count` column each row carries
/// its count; without one every row is a single item.
pub fn load_line_items_csv(path: &Path) -> Result<Vec<LineItem>, SourceError> {
    let table = CsvTable::open(path, "line_items")?;
    let order_id = table.column("order_id")?;
    let item_count = table.find_column("item_count");

    table.rows(|row| {
        Ok(LineItem {
            order_id: row.parse(order_id)?,
            item_count: match item_count {
                Some(idx) => row.parse(idx)?,
                None => 1,
            },
        })
    })
}

/// Load recorded assignments: `user_id`, `variant`, `assigned_at` (`YYYY-MM-DD`)
pub fn load_assignments_csv(path: &Path) -> Result<Vec<Assignment>, SourceError> {
    let table = CsvTable::open(path, "assignments")?;
    let user_id = table.column("user_id")?;
    let variant = table.column("variant")?;
    let assigned_at = table.column("assigned_at")?;

    table.rows(|row| {
        Ok(Assignment {
            user_id: row.parse(user_id)?,
            variant: row.parse::<Variant>(variant)?,
            assigned_at: row.parse(assigned_at)?,
        })
    })
}

/// Header plus raw lines of one CSV file
struct CsvTable {
    name: String,
    header: Vec<String>,
    /// (1-based line number, line)
    lines: Vec<(usize, String)>,
}

impl CsvTable {
    fn open(path: &Path, name: &str) -> Result<Self, SourceError> {
        let reader = BufReader::new(File::open(path)?);
        let mut header = None;
        let mut lines = Vec::new();

        for (line_num, line_result) in reader.lines().enumerate() {
            let line = line_result?;
            let trimmed = line.trim();

            // Skip empty lines and comments
            if trimmed.is_empty() || trimmed.starts_with('#') {
                continue;
            }

            if header.is_none() {
                header = Some(
                    trimmed
                        .split(',')
                        .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
                        .collect(),
                );
            } else {
                lines.push((line_num + 1, trimmed.to_string()));
            }
        }

        Ok(Self {
            name: name.to_string(),
            header: header.unwrap_or_default(),
            lines,
        })
    }

    fn find_column(&self, column: &str) -> Option<usize> {
        self.header.iter().position(|h| h == column)
    }

    fn column(&self, column: &str) -> Result<usize, SourceError> {
        self.find_column(column)
            .ok_or_else(|| SourceError::MissingColumn {
                table: self.name.clone(),
                column: column.to_string(),
            })
    }

    fn rows<T, F>(&self, mut parse_row: F) -> Result<Vec<T>, SourceError>
    where
        F: FnMut(&CsvRow<'_>) -> Result<T, SourceError>,
    {
        self.lines
            .iter()
            .map(|(line, text)| {
                let row = CsvRow {
                    table: &self.name,
                    line: *line,
                    cells: text.split(',').map(str::trim).collect(),
                };
                parse_row(&row)
            })
            .collect()
    }
}

struct CsvRow<'a> {
    table: &'a str,
    line: usize,
    cells: Vec<&'a str>,
}

impl CsvRow<'_> {
    fn cell(&self, idx: usize) -> Result<&str, SourceError> {
        self.cells.get(idx).copied().ok_or_else(|| SourceError::Parse {
            table: self.table.to_string(),
            line: self.line,
            message: format!("Expected at least {} columns, got {}", idx + 1, self.cells.len()),
        })
    }

    fn parse<T>(&self, idx: usize) -> Result<T, SourceError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        let value = self.cell(idx)?;
        value.parse().map_err(|e: T::Err| SourceError::Parse {
            table: self.table.to_string(),
            line: self.line,
            message: format!("invalid value '{}': {}", value, e),
        })
    }

    fn optional_f64(&self, idx: usize) -> Result<Option<f64>, SourceError> {
        let value = self.cell(idx)?;
        if value.is_empty() || value.eq_ignore_ascii_case("nan") {
            return Ok(None);
        }
        self.parse::<f64>(idx).map(Some)
    }
}
