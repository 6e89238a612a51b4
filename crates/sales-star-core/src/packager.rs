use std::fs::File;
use std::io;
use std::path::{Path, PathBuf};

use bytes::Bytes;
use polars::prelude::{CsvWriter, DataFrame, SerWriter};
use sales_star_bucket::BucketStore;
use tempfile::TempDir;
use tracing::{debug, info};
use zip::write::FileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::config::DEFAULT_OUTPUT_NAME;
use crate::error::Result;
use crate::schema::StarSchema;
use crate::tables::OutputTable;

const STAGING_PREFIX: &str = "etl_output";

/// Per-run staging directory. Call `close` to remove it and observe failures;
/// dropping it removes it silently.
#[derive(Debug)]
pub struct WorkingStorage {
    dir: TempDir,
}

impl WorkingStorage {
    pub fn create(root: Option<&Path>) -> Result<Self> {
        let mut builder = tempfile::Builder::new();
        builder.prefix(STAGING_PREFIX);

        let dir = match root {
            Some(root) => {
                std::fs::create_dir_all(root)?;
                builder.tempdir_in(root)?
            }
            None => builder.tempdir()?,
        };

        Ok(Self { dir })
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn close(self) -> io::Result<()> {
        self.dir.close()
    }
}

/// Writes one table as UTF-8 CSV with a header row; nulls become empty cells.
pub fn write_table(staging: &WorkingStorage, table: OutputTable, df: &DataFrame) -> Result<PathBuf> {
    let path = staging.path().join(table.file_name());
    let mut file = File::create(&path)?;
    let mut df = df.clone();
    CsvWriter::new(&mut file)
        .include_header(true)
        .finish(&mut df)?;
    debug!(table = %table, rows = df.height(), path = %path.display(), "staged table");
    Ok(path)
}

/// Stages all six tables and zips them, in archive order, into a single deflated archive.
pub fn build_archive(staging: &WorkingStorage, schema: &StarSchema) -> Result<Vec<u8>> {
    let mut staged = Vec::with_capacity(OutputTable::ALL.len());
    for (table, df) in schema.tables() {
        staged.push((table, write_table(staging, table, df)?));
    }

    let archive_path = staging.path().join(DEFAULT_OUTPUT_NAME);
    {
        let mut zip = ZipWriter::new(File::create(&archive_path)?);
        let options = FileOptions::default().compression_method(CompressionMethod::Deflated);

        for (table, path) in &staged {
            zip.start_file(table.file_name(), options)?;
            let mut source = File::open(path)?;
            io::copy(&mut source, &mut zip)?;
        }

        zip.finish()?;
    }

    let archive = std::fs::read(&archive_path)?;
    info!(entries = staged.len(), bytes = archive.len(), "built output archive");
    Ok(archive)
}

pub async fn deliver(sink: &dyn BucketStore, name: &str, archive: Vec<u8>) -> Result<()> {
    sink.put_object(name, Bytes::from(archive), "application/zip")
        .await?;
    info!(location = %sink.location(), name, "delivered output archive");
    Ok(())
}
