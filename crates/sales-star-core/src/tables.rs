//! Fixed table slots for one batch: the five extracts in, the six star-schema tables out.

use std::fmt;

use bytes::Bytes;
use polars::prelude::DataFrame;
use serde::Serialize;

pub mod sales_columns {
    pub const SALES_ID: &str = "SalesID";
    pub const PRODUCT_ID: &str = "ProductID";
    pub const CUSTOMER_ID: &str = "CustomerID";
    pub const CAMPAIGN_ID: &str = "CampaignID";
    pub const DELIVERY_ID: &str = "DeliveryID";
    pub const ORDER_DATE: &str = "OrderDate";
    pub const DELIVERY_DATE: &str = "DeliveryDate";
    pub const SALE_AMOUNT: &str = "SaleAmount";
    pub const DISCOUNT_APPLIED: &str = "DiscountApplied";
    pub const DELIVERY_FEE: &str = "DeliveryFee";

    pub const REQUIRED: [&str; 10] = [
        SALES_ID,
        PRODUCT_ID,
        CUSTOMER_ID,
        CAMPAIGN_ID,
        DELIVERY_ID,
        ORDER_DATE,
        DELIVERY_DATE,
        SALE_AMOUNT,
        DISCOUNT_APPLIED,
        DELIVERY_FEE,
    ];
}

pub mod fact_columns {
    pub const TOTAL_SALE_AMOUNT: &str = "TotalSaleAmount";
    pub const TOTAL_DISCOUNT_APPLIED: &str = "TotalDiscountApplied";
    pub const TOTAL_DELIVERY_FEE: &str = "TotalDeliveryFee";

    /// Natural keys copied verbatim from each sales row, in output order.
    pub const KEYS: [&str; 6] = [
        super::sales_columns::SALES_ID,
        super::sales_columns::PRODUCT_ID,
        super::sales_columns::CUSTOMER_ID,
        super::sales_columns::CAMPAIGN_ID,
        super::sales_columns::DELIVERY_ID,
        super::sales_columns::ORDER_DATE,
    ];

    pub const ALL: [&str; 9] = [
        KEYS[0],
        KEYS[1],
        KEYS[2],
        KEYS[3],
        KEYS[4],
        KEYS[5],
        TOTAL_SALE_AMOUNT,
        TOTAL_DISCOUNT_APPLIED,
        TOTAL_DELIVERY_FEE,
    ];
}

pub mod time_columns {
    pub const TIME_ID: &str = "TimeID";
    pub const DATE: &str = "Date";
    pub const YEAR: &str = "Year";
    pub const MONTH: &str = "Month";
    pub const DAY: &str = "Day";
    pub const WEEKDAY: &str = "WeekDay";

    pub const ALL: [&str; 6] = [TIME_ID, DATE, YEAR, MONTH, DAY, WEEKDAY];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum InputFile {
    Customer,
    Product,
    Sales,
    MarketCampaign,
    Delivery,
}

impl InputFile {
    pub const ALL: [InputFile; 5] = [
        InputFile::Customer,
        InputFile::Product,
        InputFile::Sales,
        InputFile::MarketCampaign,
        InputFile::Delivery,
    ];

    pub fn file_name(&self) -> &'static str {
        match self {
            InputFile::Customer => "Customer.csv",
            InputFile::Product => "Product.csv",
            InputFile::Sales => "Sales.csv",
            InputFile::MarketCampaign => "MarketCampaign.csv",
            InputFile::Delivery => "Delivery.csv",
        }
    }
}

impl fmt::Display for InputFile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.file_name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum OutputTable {
    CustomerDimension,
    ProductDimension,
    SalesFact,
    TimeDimension,
    CampaignDimension,
    DeliveryDimension,
}

impl OutputTable {
    /// Archive order.
    pub const ALL: [OutputTable; 6] = [
        OutputTable::CustomerDimension,
        OutputTable::ProductDimension,
        OutputTable::SalesFact,
        OutputTable::TimeDimension,
        OutputTable::CampaignDimension,
        OutputTable::DeliveryDimension,
    ];

    pub fn table_name(&self) -> &'static str {
        match self {
            OutputTable::CustomerDimension => "Customer_Dimension",
            OutputTable::ProductDimension => "Product_Dimension",
            OutputTable::SalesFact => "Sales_Fact",
            OutputTable::TimeDimension => "Time_Dimension",
            OutputTable::CampaignDimension => "Campaign_Dimension",
            OutputTable::DeliveryDimension => "Delivery_Dimension",
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}.csv", self.table_name())
    }
}

impl fmt::Display for OutputTable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.table_name())
    }
}

/// Raw bytes for each required extract, as fetched from the blob source.
#[derive(Debug, Clone, Default)]
pub struct BatchPayloads {
    customer: Option<Bytes>,
    product: Option<Bytes>,
    sales: Option<Bytes>,
    campaign: Option<Bytes>,
    delivery: Option<Bytes>,
}

impl BatchPayloads {
    fn slot_mut(&mut self, file: InputFile) -> &mut Option<Bytes> {
        match file {
            InputFile::Customer => &mut self.customer,
            InputFile::Product => &mut self.product,
            InputFile::Sales => &mut self.sales,
            InputFile::MarketCampaign => &mut self.campaign,
            InputFile::Delivery => &mut self.delivery,
        }
    }

    pub fn insert(&mut self, file: InputFile, bytes: impl Into<Bytes>) {
        *self.slot_mut(file) = Some(bytes.into());
    }

    pub fn get(&self, file: InputFile) -> Option<&Bytes> {
        match file {
            InputFile::Customer => self.customer.as_ref(),
            InputFile::Product => self.product.as_ref(),
            InputFile::Sales => self.sales.as_ref(),
            InputFile::MarketCampaign => self.campaign.as_ref(),
            InputFile::Delivery => self.delivery.as_ref(),
        }
    }

    pub fn take(&mut self, file: InputFile) -> Option<Bytes> {
        self.slot_mut(file).take()
    }
}

/// The five parsed extracts. Every cell is text; nulls mark empty cells.
#[derive(Debug, Clone)]
pub struct SourceTables {
    pub customer: DataFrame,
    pub product: DataFrame,
    pub sales: DataFrame,
    pub campaign: DataFrame,
    pub delivery: DataFrame,
}
