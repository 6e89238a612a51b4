use std::collections::HashSet;

use blake3::Hasher;
use csv::ReaderBuilder;
use polars::prelude::{Column, DataFrame, NamedFrom, Series};
use sales_star_bucket::{BucketError, BucketStore};
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{EtlError, Result};
use crate::tables::{sales_columns, BatchPayloads, InputFile, SourceTables};

#[derive(Debug, Clone, Serialize)]
pub struct InputFingerprint {
    pub file: InputFile,
    pub blake3: String,
    pub bytes: usize,
}

/// Fetches all five extracts in fixed order, failing on the first one that is absent.
pub async fn fetch_payloads(store: &dyn BucketStore) -> Result<BatchPayloads> {
    let mut payloads = BatchPayloads::default();

    for file in InputFile::ALL {
        let name = file.file_name();
        if !store.exists(name).await? {
            return Err(missing(file, store.location()));
        }

        let bytes = match store.get_object(name).await {
            Ok(bytes) => bytes,
            Err(BucketError::NotFound(_)) => return Err(missing(file, store.location())),
            Err(err) => return Err(err.into()),
        };

        debug!(file = name, bytes = bytes.len(), "fetched input");
        payloads.insert(file, bytes);
    }

    info!(location = %store.location(), "fetched all batch inputs");
    Ok(payloads)
}

/// Parses every payload; nothing is parsed unless all five are present.
pub fn load_source_tables(mut payloads: BatchPayloads) -> Result<SourceTables> {
    if let Some(absent) = InputFile::ALL
        .into_iter()
        .find(|file| payloads.get(*file).is_none())
    {
        return Err(missing(absent, "batch payloads".to_string()));
    }

    let mut parse = |file: InputFile| -> Result<DataFrame> {
        let bytes = payloads
            .take(file)
            .ok_or_else(|| missing(file, "batch payloads".to_string()))?;
        let df = parse_table(file, &bytes)?;
        debug!(file = file.file_name(), rows = df.height(), columns = df.width(), "parsed input");
        Ok(df)
    };

    let tables = SourceTables {
        customer: parse(InputFile::Customer)?,
        product: parse(InputFile::Product)?,
        sales: parse(InputFile::Sales)?,
        campaign: parse(InputFile::MarketCampaign)?,
        delivery: parse(InputFile::Delivery)?,
    };

    validate_sales_schema(&tables.sales)?;
    Ok(tables)
}

/// Parses header-led CSV into a DataFrame of text columns. Empty cells become nulls.
pub fn parse_table(file: InputFile, bytes: &[u8]) -> Result<DataFrame> {
    let parse_error = |message: String| EtlError::Parse {
        file: file.file_name(),
        message,
    };

    let text = std::str::from_utf8(bytes)
        .map_err(|err| parse_error(format!("payload is not valid UTF-8: {err}")))?;
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);

    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .from_reader(text.as_bytes());

    let headers = reader
        .headers()
        .map_err(|err| parse_error(err.to_string()))?
        .clone();

    if headers.is_empty() {
        return Err(parse_error("missing header row".into()));
    }

    let mut seen = HashSet::with_capacity(headers.len());
    for (idx, name) in headers.iter().enumerate() {
        if name.trim().is_empty() {
            return Err(parse_error(format!("header column {} is empty", idx + 1)));
        }
        if !seen.insert(name) {
            return Err(parse_error(format!("duplicate header '{name}'")));
        }
    }

    let mut values: Vec<Vec<Option<String>>> = vec![Vec::new(); headers.len()];
    for record in reader.records() {
        let record = record.map_err(|err| parse_error(err.to_string()))?;
        for (column, field) in values.iter_mut().zip(record.iter()) {
            column.push((!field.is_empty()).then(|| field.to_string()));
        }
    }

    let columns: Vec<Column> = headers
        .iter()
        .zip(values)
        .map(|(name, column)| Series::new(name.into(), column).into())
        .collect();

    Ok(DataFrame::new(columns)?)
}

/// The sales extract is the only table the core reasons about, so it is the only one checked.
pub fn validate_sales_schema(sales: &DataFrame) -> Result<()> {
    require_columns(InputFile::Sales, sales, &sales_columns::REQUIRED)
}

pub(crate) fn require_columns(
    file: InputFile,
    df: &DataFrame,
    columns: &[&'static str],
) -> Result<()> {
    match columns.iter().copied().find(|column| df.column(column).is_err()) {
        Some(column) => Err(EtlError::MissingColumn {
            table: file.file_name(),
            column,
        }),
        None => Ok(()),
    }
}

pub fn fingerprint(payloads: &BatchPayloads) -> Vec<InputFingerprint> {
    InputFile::ALL
        .into_iter()
        .filter_map(|file| {
            payloads.get(file).map(|bytes| InputFingerprint {
                file,
                blake3: compute_hash(bytes),
                bytes: bytes.len(),
            })
        })
        .collect()
}

fn compute_hash(contents: &[u8]) -> String {
    let mut hasher = Hasher::new();
    hasher.update(contents);
    hasher.finalize().to_hex().to_string()
}

fn missing(file: InputFile, location: String) -> EtlError {
    EtlError::MissingInput {
        file: file.file_name(),
        location,
    }
}
