use polars::prelude::DataFrame;
use serde::Serialize;
use tracing::info;

use crate::config::TimeDimensionOptions;
use crate::error::Result;
use crate::fact::build_sales_fact;
use crate::tables::{OutputTable, SourceTables};
use crate::time_dimension::build_time_dimension;

/// The six tables of one batch's star schema, ready for serialization.
#[derive(Debug, Clone)]
pub struct StarSchema {
    pub customer: DataFrame,
    pub product: DataFrame,
    pub sales_fact: DataFrame,
    pub time: DataFrame,
    pub campaign: DataFrame,
    pub delivery: DataFrame,
}

#[derive(Debug, Clone, Serialize)]
pub struct TableSummary {
    pub table: OutputTable,
    pub file_name: String,
    pub rows: usize,
    pub columns: usize,
}

impl StarSchema {
    pub fn table(&self, table: OutputTable) -> &DataFrame {
        match table {
            OutputTable::CustomerDimension => &self.customer,
            OutputTable::ProductDimension => &self.product,
            OutputTable::SalesFact => &self.sales_fact,
            OutputTable::TimeDimension => &self.time,
            OutputTable::CampaignDimension => &self.campaign,
            OutputTable::DeliveryDimension => &self.delivery,
        }
    }

    /// Tables in archive order.
    pub fn tables(&self) -> impl Iterator<Item = (OutputTable, &DataFrame)> + '_ {
        OutputTable::ALL
            .into_iter()
            .map(move |table| (table, self.table(table)))
    }

    pub fn summaries(&self) -> Vec<TableSummary> {
        self.tables()
            .map(|(table, df)| TableSummary {
                table,
                file_name: table.file_name(),
                rows: df.height(),
                columns: df.width(),
            })
            .collect()
    }
}

/// Dimensions pass through untouched; the fact and time tables are derived from sales.
pub fn assemble(sources: SourceTables, options: &TimeDimensionOptions) -> Result<StarSchema> {
    let sales_fact = build_sales_fact(&sources.sales)?;
    let time = build_time_dimension(&sources.sales, options)?;

    info!(
        fact_rows = sales_fact.height(),
        time_rows = time.height(),
        "assembled star schema"
    );

    Ok(StarSchema {
        customer: sources.customer,
        product: sources.product,
        sales_fact,
        time,
        campaign: sources.campaign,
        delivery: sources.delivery,
    })
}
