use std::collections::HashMap;

use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series};
use tracing::debug;

use crate::error::{EtlError, Result};
use crate::loader::require_columns;
use crate::tables::{fact_columns, sales_columns, InputFile};

#[derive(Debug, Default, Clone, Copy)]
struct SaleTotals {
    sale_amount: f64,
    discount_sum: f64,
    discount_count: usize,
    delivery_fee: f64,
}

impl SaleTotals {
    fn add(&mut self, sale_amount: Option<f64>, discount: Option<f64>, delivery_fee: Option<f64>) {
        self.sale_amount += sale_amount.unwrap_or(0.0);
        self.delivery_fee += delivery_fee.unwrap_or(0.0);
        if let Some(discount) = discount {
            self.discount_sum += discount;
            self.discount_count += 1;
        }
    }

    /// Discount is rate-like, so it is averaged over the line items that carry one.
    fn mean_discount(&self) -> Option<f64> {
        (self.discount_count > 0).then(|| self.discount_sum / self.discount_count as f64)
    }
}

/// Aggregates line items per `SalesID` and broadcasts the totals back onto every line item.
///
/// Output has one row per input row, in input order, with the natural keys followed by
/// `TotalSaleAmount` (sum), `TotalDiscountApplied` (mean) and `TotalDeliveryFee` (sum).
/// Ids are compared after trimming. Rows without a `SalesID` belong to no group and get
/// null totals.
pub fn build_sales_fact(sales: &DataFrame) -> Result<DataFrame> {
    require_columns(InputFile::Sales, sales, &fact_columns::KEYS)?;

    let len = sales.height();
    let sale_amounts = measure_values(sales, sales_columns::SALE_AMOUNT)?;
    let discounts = measure_values(sales, sales_columns::DISCOUNT_APPLIED)?;
    let delivery_fees = measure_values(sales, sales_columns::DELIVERY_FEE)?;

    let id_column = sales
        .column(sales_columns::SALES_ID)?
        .cast(&DataType::String)?;
    let sales_ids = id_column.str()?;

    let group_keys: Vec<Option<&str>> = sales_ids.into_iter().map(group_key).collect();

    let mut totals_by_sale: HashMap<&str, SaleTotals> = HashMap::new();
    for idx in 0..len {
        if let Some(sales_id) = group_keys[idx] {
            totals_by_sale.entry(sales_id).or_default().add(
                sale_amounts[idx],
                discounts[idx],
                delivery_fees[idx],
            );
        }
    }

    let mut total_sale_amount = Vec::with_capacity(len);
    let mut total_discount = Vec::with_capacity(len);
    let mut total_delivery_fee = Vec::with_capacity(len);

    for idx in 0..len {
        let totals = group_keys[idx].and_then(|sales_id| totals_by_sale.get(sales_id));
        total_sale_amount.push(totals.map(|t| t.sale_amount));
        total_discount.push(totals.and_then(SaleTotals::mean_discount));
        total_delivery_fee.push(totals.map(|t| t.delivery_fee));
    }

    debug!(rows = len, sales = totals_by_sale.len(), "aggregated sales fact");

    let mut columns: Vec<Column> = Vec::with_capacity(fact_columns::ALL.len());
    for key in fact_columns::KEYS {
        columns.push(sales.column(key)?.clone());
    }
    columns.push(Series::new(fact_columns::TOTAL_SALE_AMOUNT.into(), total_sale_amount).into());
    columns.push(Series::new(fact_columns::TOTAL_DISCOUNT_APPLIED.into(), total_discount).into());
    columns.push(Series::new(fact_columns::TOTAL_DELIVERY_FEE.into(), total_delivery_fee).into());

    Ok(DataFrame::new(columns)?)
}

/// Surrounding whitespace does not distinguish sales; a blank id belongs to no sale.
fn group_key(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|key| !key.is_empty())
}

/// Reads a measure column as optional floats. Empty and `NaN` cells are absent.
fn measure_values(sales: &DataFrame, column: &'static str) -> Result<Vec<Option<f64>>> {
    let text = sales.column(column)?.cast(&DataType::String)?;
    text.str()?
        .into_iter()
        .enumerate()
        .map(|(idx, value)| parse_measure(column, idx + 1, value))
        .collect()
}

fn parse_measure(column: &'static str, row: usize, value: Option<&str>) -> Result<Option<f64>> {
    let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
        return Ok(None);
    };

    match raw.parse::<f64>() {
        Ok(parsed) if parsed.is_nan() => Ok(None),
        Ok(parsed) => Ok(Some(parsed)),
        Err(_) => Err(EtlError::InvalidMeasure {
            column,
            row,
            value: raw.to_string(),
        }),
    }
}
