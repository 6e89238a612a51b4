use std::collections::BTreeSet;

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use polars::prelude::{Column, DataFrame, DataType, NamedFrom, Series};
use tracing::debug;

use crate::config::{TimeDimensionOptions, WeekdayStyle};
use crate::error::{EtlError, Result};
use crate::loader::require_columns;
use crate::tables::{sales_columns, time_columns, InputFile};

const DATE_COLUMNS: [&str; 2] = [sales_columns::ORDER_DATE, sales_columns::DELIVERY_DATE];

/// Builds one row per distinct calendar date seen in `OrderDate` or `DeliveryDate`, ascending.
///
/// Empty cells are skipped: an undelivered order has no delivery date.
pub fn build_time_dimension(
    sales: &DataFrame,
    options: &TimeDimensionOptions,
) -> Result<DataFrame> {
    require_columns(InputFile::Sales, sales, &DATE_COLUMNS)?;

    let mut dates = BTreeSet::new();
    for column in DATE_COLUMNS {
        let text = sales.column(column)?.cast(&DataType::String)?;
        for (idx, value) in text.str()?.into_iter().enumerate() {
            let Some(raw) = value.map(str::trim).filter(|raw| !raw.is_empty()) else {
                continue;
            };
            let date = parse_calendar_date(raw, &options.date_formats).ok_or_else(|| {
                EtlError::DateParse {
                    column,
                    row: idx + 1,
                    value: raw.to_string(),
                }
            })?;
            dates.insert(date);
        }
    }

    debug!(dates = dates.len(), "derived time dimension");
    Ok(time_dimension_frame(&dates, options.weekday_style)?)
}

/// Tries each configured format as a date, then as a datetime, then RFC 3339.
pub fn parse_calendar_date<S: AsRef<str>>(raw: &str, formats: &[S]) -> Option<NaiveDate> {
    for format in formats {
        let format = format.as_ref();
        if let Ok(date) = NaiveDate::parse_from_str(raw, format) {
            return Some(date);
        }
        if let Ok(datetime) = NaiveDateTime::parse_from_str(raw, format) {
            return Some(datetime.date());
        }
    }
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|datetime| datetime.date_naive())
}

pub fn time_id(date: NaiveDate) -> String {
    date.format("%Y%m%d").to_string()
}

pub fn weekday_name(date: NaiveDate, style: WeekdayStyle) -> String {
    let format = match style {
        WeekdayStyle::Long => "%A",
        WeekdayStyle::Short => "%a",
    };
    date.format(format).to_string()
}

fn time_dimension_frame(
    dates: &BTreeSet<NaiveDate>,
    style: WeekdayStyle,
) -> std::result::Result<DataFrame, polars::error::PolarsError> {
    let len = dates.len();
    let mut ids = Vec::with_capacity(len);
    let mut labels = Vec::with_capacity(len);
    let mut years = Vec::with_capacity(len);
    let mut months = Vec::with_capacity(len);
    let mut days = Vec::with_capacity(len);
    let mut weekdays = Vec::with_capacity(len);

    for date in dates {
        ids.push(time_id(*date));
        labels.push(date.format("%Y-%m-%d").to_string());
        years.push(date.year());
        months.push(date.month() as i32);
        days.push(date.day() as i32);
        weekdays.push(weekday_name(*date, style));
    }

    let columns: Vec<Column> = vec![
        Series::new(time_columns::TIME_ID.into(), ids).into(),
        Series::new(time_columns::DATE.into(), labels).into(),
        Series::new(time_columns::YEAR.into(), years).into(),
        Series::new(time_columns::MONTH.into(), months).into(),
        Series::new(time_columns::DAY.into(), days).into(),
        Series::new(time_columns::WEEKDAY.into(), weekdays).into(),
    ];

    DataFrame::new(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn datetime_values_contribute_their_date() {
        let formats = TimeDimensionOptions::default().date_formats;
        let expected = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();

        assert_eq!(parse_calendar_date("2024-03-09", &formats), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09 17:45:00", &formats), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09 17:45", &formats), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09T17:45", &formats), Some(expected));
        assert_eq!(parse_calendar_date("2024-03-09 17:45:00.250", &formats), Some(expected));
        assert_eq!(parse_calendar_date("03/09/2024", &formats), Some(expected));
        assert_eq!(
            parse_calendar_date("2024-03-09T23:10:00+00:00", &formats),
            Some(expected)
        );
        assert_eq!(parse_calendar_date("next tuesday", &formats), None);
    }

    #[test]
    fn time_id_is_zero_padded() {
        let date = NaiveDate::from_ymd_opt(987, 1, 5).unwrap();
        assert_eq!(time_id(date), "09870105");
    }

    #[test]
    fn weekday_names_follow_style() {
        let monday = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let sunday = NaiveDate::from_ymd_opt(2024, 1, 7).unwrap();
        assert_eq!(weekday_name(monday, WeekdayStyle::Long), "Monday");
        assert_eq!(weekday_name(sunday, WeekdayStyle::Short), "Sun");
    }
}
