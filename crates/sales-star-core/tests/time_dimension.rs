use std::collections::HashSet;

use anyhow::Result;
use chrono::NaiveDate;
use polars::prelude::DataFrame;
use sales_star_core::config::{TimeDimensionOptions, WeekdayStyle};
use sales_star_core::error::EtlError;
use sales_star_core::loader::parse_table;
use sales_star_core::tables::{time_columns, InputFile};
use sales_star_core::time_dimension::build_time_dimension;

fn dates_frame(rows: &[(&str, &str)]) -> DataFrame {
    let mut csv = String::from("SalesID,OrderDate,DeliveryDate\n");
    for (idx, (order, delivery)) in rows.iter().enumerate() {
        csv.push_str(&format!("{},{order},{delivery}\n", idx + 1));
    }
    parse_table(InputFile::Sales, csv.as_bytes()).expect("date fixture parses")
}

fn strings(df: &DataFrame, name: &str) -> Result<Vec<String>> {
    Ok(df
        .column(name)?
        .str()?
        .into_iter()
        .map(|value| value.unwrap_or_default().to_string())
        .collect())
}

fn ints(df: &DataFrame, name: &str) -> Result<Vec<i32>> {
    Ok(df
        .column(name)?
        .i32()?
        .into_iter()
        .map(|value| value.unwrap_or_default())
        .collect())
}

#[test]
fn union_of_order_and_delivery_dates_sorted_without_blanks() -> Result<()> {
    let sales = dates_frame(&[("2024-01-02", "2024-01-01"), ("2024-01-01", "")]);

    let time = build_time_dimension(&sales, &TimeDimensionOptions::default())?;

    let names: Vec<&str> = time
        .get_column_names()
        .into_iter()
        .map(|name| name.as_str())
        .collect();
    assert_eq!(names, time_columns::ALL);
    assert_eq!(strings(&time, "Date")?, vec!["2024-01-01", "2024-01-02"]);
    assert_eq!(strings(&time, "TimeID")?, vec!["20240101", "20240102"]);
    assert_eq!(ints(&time, "Year")?, vec![2024, 2024]);
    assert_eq!(ints(&time, "Month")?, vec![1, 1]);
    assert_eq!(ints(&time, "Day")?, vec![1, 2]);
    assert_eq!(strings(&time, "WeekDay")?, vec!["Monday", "Tuesday"]);
    Ok(())
}

#[test]
fn time_ids_are_unique_sorted_and_round_trip() -> Result<()> {
    let sales = dates_frame(&[
        ("2023-12-31", "2024-02-29"),
        ("2024-02-29 08:15:00", "2023-12-31"),
        ("2024-03-01T00:00:00", ""),
        ("2023-12-31", "2024-03-01"),
    ]);

    let time = build_time_dimension(&sales, &TimeDimensionOptions::default())?;
    assert_eq!(time.height(), 3);

    let ids = strings(&time, "TimeID")?;
    let dates = strings(&time, "Date")?;

    let unique: HashSet<&String> = ids.iter().collect();
    assert_eq!(unique.len(), ids.len());

    let mut sorted = dates.clone();
    sorted.sort();
    assert_eq!(sorted, dates);

    for (id, date) in ids.iter().zip(&dates) {
        let from_id = NaiveDate::parse_from_str(id, "%Y%m%d")?;
        let from_date = NaiveDate::parse_from_str(date, "%Y-%m-%d")?;
        assert_eq!(from_id, from_date);
    }
    Ok(())
}

#[test]
fn short_weekday_style_is_honoured() -> Result<()> {
    let sales = dates_frame(&[("2024-06-15", "2024-06-16")]);
    let options = TimeDimensionOptions {
        weekday_style: WeekdayStyle::Short,
        ..TimeDimensionOptions::default()
    };

    let time = build_time_dimension(&sales, &options)?;
    assert_eq!(strings(&time, "WeekDay")?, vec!["Sat", "Sun"]);
    Ok(())
}

#[test]
fn unparseable_non_empty_date_is_an_error() {
    let sales = dates_frame(&[("2024-01-01", "2024-01-02"), ("2024-01-01", "soon")]);

    let err = build_time_dimension(&sales, &TimeDimensionOptions::default()).unwrap_err();
    match err {
        EtlError::DateParse { column, row, value } => {
            assert_eq!(column, "DeliveryDate");
            assert_eq!(row, 2);
            assert_eq!(value, "soon");
        }
        other => panic!("expected DateParse, got {other}"),
    }
}

#[test]
fn custom_formats_replace_the_defaults() -> Result<()> {
    let sales = dates_frame(&[("02.01.2024", "")]);
    let options = TimeDimensionOptions {
        date_formats: vec!["%d.%m.%Y".to_string()],
        ..TimeDimensionOptions::default()
    };

    let time = build_time_dimension(&sales, &options)?;
    assert_eq!(strings(&time, "TimeID")?, vec!["20240102"]);

    let err = build_time_dimension(&dates_frame(&[("2024-01-02", "")]), &options).unwrap_err();
    assert!(matches!(err, EtlError::DateParse { .. }));
    Ok(())
}

#[test]
fn missing_delivery_date_column_is_reported() {
    let sales = parse_table(InputFile::Sales, b"SalesID,OrderDate\n1,2024-01-01\n")
        .expect("fixture parses");

    let err = build_time_dimension(&sales, &TimeDimensionOptions::default()).unwrap_err();
    assert!(matches!(
        err,
        EtlError::MissingColumn {
            column: "DeliveryDate",
            ..
        }
    ));
}

#[test]
fn minute_and_fractional_timestamps_use_their_calendar_date() -> Result<()> {
    let sales = dates_frame(&[
        ("2024-01-02 10:30", "2024-01-03T08:15"),
        ("2024-01-02 23:59:59.125", ""),
    ]);

    let time = build_time_dimension(&sales, &TimeDimensionOptions::default())?;

    assert_eq!(strings(&time, "TimeID")?, vec!["20240102", "20240103"]);
    assert_eq!(strings(&time, "WeekDay")?, vec!["Tuesday", "Wednesday"]);
    Ok(())
}
