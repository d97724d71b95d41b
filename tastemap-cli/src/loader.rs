//! Catalog loader
//!
//! Fetches the two catalog tables, parses them as CSV and merges them by
//! product code into an immutable [`Catalog`]:
//! - coordinates table: `JAN`, `BodyAxis`, `SweetAxis`, `Type`, optional name
//! - metadata table: `JAN`, optional `商品名` (name), optional `希望小売価格` (price)
//!
//! A table that cannot be fetched or parsed, or lacks a required column, makes
//! the whole load fail with `DataUnavailable`. A single record without numeric
//! coordinates is excluded and reported as `SchemaMismatch`.

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::path::PathBuf;
use tastemap_common::{Catalog, Error, Item, Result, WineType};
use tracing::{debug, info, warn};

const KEY_COLUMNS: &[&str] = &["jan", "code", "id"];
const BODY_COLUMNS: &[&str] = &["bodyaxis", "body"];
const SWEETNESS_COLUMNS: &[&str] = &["sweetaxis", "sweetness", "sweet"];
const TYPE_COLUMNS: &[&str] = &["type", "category"];
const NAME_COLUMNS: &[&str] = &["商品名", "name"];
const PRICE_COLUMNS: &[&str] = &["希望小売価格", "price"];

/// Where a catalog table comes from
#[async_trait]
pub trait CatalogSource: Send + Sync {
    /// Human-readable location for logs and errors
    fn location(&self) -> String;

    /// Raw table text
    ///
    /// # Errors
    /// `DataUnavailable` if the table cannot be retrieved
    async fn fetch(&self) -> Result<String>;
}

/// Table on the local filesystem
pub struct FileSource {
    path: PathBuf,
}

impl FileSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl CatalogSource for FileSource {
    fn location(&self) -> String {
        self.path.display().to_string()
    }

    async fn fetch(&self) -> Result<String> {
        tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|e| Error::DataUnavailable(format!("{}: {}", self.location(), e)))
    }
}

/// Table served over HTTP(S)
pub struct HttpSource {
    url: String,
    client: reqwest::Client,
}

impl HttpSource {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            client: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl CatalogSource for HttpSource {
    fn location(&self) -> String {
        self.url.clone()
    }

    async fn fetch(&self) -> Result<String> {
        let response = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{}: {}", self.url, e)))?;

        let status = response.status();
        if !status.is_success() {
            return Err(Error::DataUnavailable(format!("{}: HTTP {}", self.url, status)));
        }

        response
            .text()
            .await
            .map_err(|e| Error::DataUnavailable(format!("{}: {}", self.url, e)))
    }
}

/// Pick a source for a configured location
pub fn source_for(location: &str) -> Box<dyn CatalogSource> {
    let trimmed = location.trim();
    let lower = trimmed.to_ascii_lowercase();
    if lower.starts_with("http://") || lower.starts_with("https://") {
        Box::new(HttpSource::new(trimmed))
    } else {
        Box::new(FileSource::new(trimmed))
    }
}

/// Loaded snapshot plus the records left out of it
#[derive(Debug)]
pub struct LoadReport {
    pub catalog: Catalog,
    /// `SchemaMismatch` per excluded coordinate record
    pub skipped: Vec<Error>,
}

/// Fetch both tables concurrently, then parse and merge
pub async fn load_catalog(
    coordinates: &dyn CatalogSource,
    metadata: &dyn CatalogSource,
) -> Result<LoadReport> {
    info!(
        coordinates = %coordinates.location(),
        metadata = %metadata.location(),
        "Loading catalog"
    );
    let (coordinates_text, metadata_text) = tokio::try_join!(coordinates.fetch(), metadata.fetch())?;
    let report = build_catalog(&coordinates_text, &metadata_text)?;
    info!(
        items = report.catalog.len(),
        skipped = report.skipped.len(),
        "Catalog loaded"
    );
    Ok(report)
}

/// Parse and merge already-fetched table text
pub fn build_catalog(coordinates_text: &str, metadata_text: &str) -> Result<LoadReport> {
    let (rows, mut skipped) = parse_coordinates(coordinates_text)?;
    let metadata = parse_metadata(metadata_text)?;

    let mut seen = HashSet::with_capacity(rows.len());
    let mut items = Vec::with_capacity(rows.len());
    for row in rows {
        if !seen.insert(row.item.id.clone()) {
            skipped.push(Error::SchemaMismatch {
                row: row.line,
                reason: format!("duplicate product code {}", row.item.id),
            });
            continue;
        }

        let mut item = row.item;
        match metadata.get(&item.id) {
            Some(meta) => {
                if !meta.name.is_empty() {
                    item.name = meta.name.clone();
                }
                item.price = meta.price;
            }
            None => debug!(id = %item.id, "No metadata for item"),
        }
        items.push(item);
    }

    for err in &skipped {
        warn!(error = %err, "Catalog record excluded");
    }

    Ok(LoadReport {
        catalog: Catalog::new(items),
        skipped,
    })
}

struct CoordinateRow {
    /// 1-based data row
    line: usize,
    item: Item,
}

#[derive(Debug, Clone, Default)]
struct Metadata {
    name: String,
    price: Option<f64>,
}

struct Columns {
    headers: Vec<String>,
}

impl Columns {
    fn new(headers: &csv::StringRecord) -> Self {
        Self {
            headers: headers
                .iter()
                .map(|h| h.trim().trim_start_matches('\u{feff}').to_lowercase())
                .collect(),
        }
    }

    fn find(&self, aliases: &[&str]) -> Option<usize> {
        self.headers.iter().position(|h| aliases.contains(&h.as_str()))
    }

    fn require(&self, aliases: &[&str], table: &str) -> Result<usize> {
        self.find(aliases).ok_or_else(|| {
            Error::DataUnavailable(format!("{} table has no '{}' column", table, aliases[0]))
        })
    }
}

fn reader(text: &str) -> csv::Reader<&[u8]> {
    csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(text.as_bytes())
}

fn field<'r>(record: &'r csv::StringRecord, index: Option<usize>) -> &'r str {
    index.and_then(|i| record.get(i)).unwrap_or("")
}

fn parse_coordinate(raw: &str, column: &str) -> std::result::Result<f64, String> {
    let value: f64 = raw
        .parse()
        .map_err(|_| format!("{} is not numeric: '{}'", column, raw))?;
    if !value.is_finite() {
        return Err(format!("{} is not finite: '{}'", column, raw));
    }
    Ok(value)
}

/// Empty, non-numeric or negative prices are "not set"
fn parse_price(raw: &str) -> Option<f64> {
    let cleaned: String = raw.chars().filter(|c| *c != ',').collect();
    let value: f64 = cleaned.trim().parse().ok()?;
    (value.is_finite() && value >= 0.0).then_some(value)
}

fn parse_coordinates(text: &str) -> Result<(Vec<CoordinateRow>, Vec<Error>)> {
    let mut rdr = reader(text);
    let headers = rdr
        .headers()
        .map_err(|e| Error::DataUnavailable(format!("coordinates table: {}", e)))?;
    let columns = Columns::new(headers);

    let key = columns.require(KEY_COLUMNS, "coordinates")?;
    let body = columns.require(BODY_COLUMNS, "coordinates")?;
    let sweetness = columns.require(SWEETNESS_COLUMNS, "coordinates")?;
    let wine_type = columns.find(TYPE_COLUMNS);
    let name = columns.find(NAME_COLUMNS);

    let mut rows = Vec::new();
    let mut skipped = Vec::new();
    for (index, record) in rdr.records().enumerate() {
        let line = index + 1;
        let record =
            record.map_err(|e| Error::DataUnavailable(format!("coordinates table row {}: {}", line, e)))?;

        let id = field(&record, Some(key));
        if id.is_empty() {
            skipped.push(Error::SchemaMismatch {
                row: line,
                reason: "missing product code".to_string(),
            });
            continue;
        }

        let position = parse_coordinate(field(&record, Some(body)), "BodyAxis").and_then(|x| {
            parse_coordinate(field(&record, Some(sweetness)), "SweetAxis").map(|y| (x, y))
        });
        let (x, y) = match position {
            Ok(position) => position,
            Err(reason) => {
                skipped.push(Error::SchemaMismatch { row: line, reason });
                continue;
            }
        };

        let item = Item::new(id, x, y, WineType::parse(field(&record, wine_type)))
            .with_name(field(&record, name));
        rows.push(CoordinateRow { line, item });
    }

    Ok((rows, skipped))
}

/// Later rows for the same code replace earlier ones
fn parse_metadata(text: &str) -> Result<HashMap<String, Metadata>> {
    let mut rdr = reader(text);
    let headers = rdr
        .headers()
        .map_err(|e| Error::DataUnavailable(format!("metadata table: {}", e)))?;
    let columns = Columns::new(headers);

    let key = columns.require(KEY_COLUMNS, "metadata")?;
    let name = columns.find(NAME_COLUMNS);
    let price = columns.find(PRICE_COLUMNS);

    let mut metadata = HashMap::new();
    for (index, record) in rdr.records().enumerate() {
        let record = record
            .map_err(|e| Error::DataUnavailable(format!("metadata table row {}: {}", index + 1, e)))?;
        let id = field(&record, Some(key));
        if id.is_empty() {
            continue;
        }
        metadata.insert(
            id.to_string(),
            Metadata {
                name: field(&record, name).to_string(),
                price: parse_price(field(&record, price)),
            },
        );
    }
    Ok(metadata)
}
