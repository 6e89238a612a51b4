use std::io::{Cursor, Read};

use anyhow::Result;
use bytes::Bytes;
use sales_star_bucket::{BucketStore, LocalDirStore, MemoryBucketStore};
use sales_star_core::config::EtlConfig;
use sales_star_core::error::ErrorKind;
use sales_star_core::packager::WorkingStorage;
use sales_star_core::runner::{run_batch, run_batch_with, CleanupStatus};
use sales_star_core::tables::{InputFile, OutputTable};
use zip::ZipArchive;

fn fixture(name: &str) -> Vec<u8> {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests/data")
        .join(name);
    std::fs::read(path).expect("read fixture")
}

fn seeded_store() -> MemoryBucketStore {
    let store = MemoryBucketStore::new("incoming");
    for file in InputFile::ALL {
        store.insert(file.file_name(), fixture(file.file_name()));
    }
    store
}

fn config_with_root(root: &std::path::Path) -> EtlConfig {
    EtlConfig {
        working_root: Some(root.to_path_buf()),
        ..EtlConfig::default()
    }
}

fn staging_is_empty(root: &std::path::Path) -> bool {
    std::fs::read_dir(root)
        .map(|mut entries| entries.next().is_none())
        .unwrap_or(true)
}

fn read_entries(archive: Bytes) -> Result<Vec<(String, String)>> {
    let mut archive = ZipArchive::new(Cursor::new(archive.to_vec()))?;
    let mut entries = Vec::with_capacity(archive.len());
    for idx in 0..archive.len() {
        let mut file = archive.by_index(idx)?;
        let mut contents = String::new();
        file.read_to_string(&mut contents)?;
        entries.push((file.name().to_string(), contents));
    }
    Ok(entries)
}

#[tokio::test]
async fn delivers_archive_with_six_tables() -> Result<()> {
    let staging_root = tempfile::tempdir()?;
    let source = seeded_store();
    let sink = MemoryBucketStore::new("outgoing");

    let report = run_batch(&source, &sink, &config_with_root(staging_root.path())).await?;

    assert_eq!(report.artifact_name, "etl_output.zip");
    assert_eq!(report.cleanup, CleanupStatus::Removed);
    assert_eq!(report.inputs.len(), 5);
    assert!(staging_is_empty(staging_root.path()));

    let rows: Vec<(OutputTable, usize)> = report
        .tables
        .iter()
        .map(|summary| (summary.table, summary.rows))
        .collect();
    assert_eq!(
        rows,
        vec![
            (OutputTable::CustomerDimension, 3),
            (OutputTable::ProductDimension, 3),
            (OutputTable::SalesFact, 4),
            (OutputTable::TimeDimension, 5),
            (OutputTable::CampaignDimension, 2),
            (OutputTable::DeliveryDimension, 3),
        ]
    );

    let archive = sink.get_object("etl_output.zip").await?;
    assert_eq!(archive.len(), report.artifact_bytes);

    let entries = read_entries(archive)?;
    let names: Vec<&str> = entries.iter().map(|(name, _)| name.as_str()).collect();
    assert_eq!(
        names,
        vec![
            "Customer_Dimension.csv",
            "Product_Dimension.csv",
            "Sales_Fact.csv",
            "Time_Dimension.csv",
            "Campaign_Dimension.csv",
            "Delivery_Dimension.csv",
        ]
    );

    let fact = &entries[2].1;
    assert_eq!(
        fact.lines().next(),
        Some("SalesID,ProductID,CustomerID,CampaignID,DeliveryID,OrderDate,TotalSaleAmount,TotalDiscountApplied,TotalDeliveryFee")
    );
    assert_eq!(fact.lines().count(), 5);

    let time = &entries[3].1;
    let time_lines: Vec<&str> = time.lines().collect();
    assert_eq!(time_lines[0], "TimeID,Date,Year,Month,Day,WeekDay");
    assert_eq!(time_lines[1], "20240101,2024-01-01,2024,1,1,Monday");
    assert_eq!(time_lines.len(), 6);

    let customer = &entries[0].1;
    assert_eq!(customer.as_bytes(), fixture("Customer.csv").as_slice());
    Ok(())
}

#[tokio::test]
async fn missing_input_produces_no_artifact() -> Result<()> {
    let staging_root = tempfile::tempdir()?;
    let source = MemoryBucketStore::new("incoming");
    for file in InputFile::ALL
        .into_iter()
        .filter(|file| *file != InputFile::Product)
    {
        source.insert(file.file_name(), fixture(file.file_name()));
    }
    let sink = MemoryBucketStore::new("outgoing");

    let err = run_batch(&source, &sink, &config_with_root(staging_root.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingInput);
    assert!(err.to_string().contains("Product.csv"));
    assert!(!sink.exists("etl_output.zip").await?);
    assert!(staging_is_empty(staging_root.path()));
    Ok(())
}

#[tokio::test]
async fn transform_failure_aborts_before_delivery() -> Result<()> {
    let staging_root = tempfile::tempdir()?;
    let source = seeded_store();
    source.insert(
        "Sales.csv",
        "SalesID,ProductID,CustomerID,CampaignID,DeliveryID,OrderDate,DeliveryDate,SaleAmount,DiscountApplied,DeliveryFee\n1,P1,C1,M1,D1,2024-01-01,,lots,0.1,5\n",
    );
    let sink = MemoryBucketStore::new("outgoing");

    let err = run_batch(&source, &sink, &config_with_root(staging_root.path()))
        .await
        .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::InvalidMeasure);
    assert!(!sink.exists("etl_output.zip").await?);
    assert!(staging_is_empty(staging_root.path()));
    Ok(())
}

#[tokio::test]
async fn runs_against_local_directories() -> Result<()> {
    let input = tempfile::tempdir()?;
    let output = tempfile::tempdir()?;
    for file in InputFile::ALL {
        std::fs::write(input.path().join(file.file_name()), fixture(file.file_name()))?;
    }

    let config = EtlConfig {
        output_name: "star_schema.zip".into(),
        ..EtlConfig::default()
    };
    let source = LocalDirStore::new(input.path());
    let sink = LocalDirStore::new(output.path());

    let report = run_batch(&source, &sink, &config).await?;

    assert_eq!(report.artifact_name, "star_schema.zip");
    let written = std::fs::read(output.path().join("star_schema.zip"))?;
    assert_eq!(written.len(), report.artifact_bytes);
    assert_eq!(read_entries(Bytes::from(written))?.len(), 6);
    Ok(())
}

fn failing_close(staging: WorkingStorage) -> std::io::Result<()> {
    drop(staging);
    Err(std::io::Error::other("disk busy"))
}

#[tokio::test]
async fn cleanup_failure_is_reported_on_success() -> Result<()> {
    let staging_root = tempfile::tempdir()?;
    let source = seeded_store();
    let sink = MemoryBucketStore::new("outgoing");

    let report = run_batch_with(
        &source,
        &sink,
        &config_with_root(staging_root.path()),
        failing_close,
    )
    .await?;

    assert_eq!(report.cleanup, CleanupStatus::Failed("disk busy".to_string()));
    assert!(sink.exists("etl_output.zip").await?);
    Ok(())
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_run_error() -> Result<()> {
    let staging_root = tempfile::tempdir()?;
    let source = MemoryBucketStore::new("incoming");
    let sink = MemoryBucketStore::new("outgoing");

    let err = run_batch_with(
        &source,
        &sink,
        &config_with_root(staging_root.path()),
        failing_close,
    )
    .await
    .unwrap_err();

    assert_eq!(err.kind(), ErrorKind::MissingInput);
    assert!(err.to_string().contains("Customer.csv"));
    assert!(!sink.exists("etl_output.zip").await?);
    Ok(())
}
