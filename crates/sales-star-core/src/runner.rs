use sales_star_bucket::BucketStore;
use serde::Serialize;
use tracing::{error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::config::{EtlConfig, TimeDimensionOptions};
use crate::error::Result;
use crate::loader::{self, InputFingerprint};
use crate::packager::{self, WorkingStorage};
use crate::schema::{self, StarSchema, TableSummary};
use crate::tables::BatchPayloads;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "message", rename_all = "snake_case")]
pub enum CleanupStatus {
    Removed,
    Failed(String),
}

/// What a successful run produced.
#[derive(Debug, Clone, Serialize)]
pub struct RunReport {
    pub run_id: Uuid,
    pub source: String,
    pub sink: String,
    pub artifact_name: String,
    pub artifact_bytes: usize,
    pub inputs: Vec<InputFingerprint>,
    pub tables: Vec<TableSummary>,
    pub cleanup: CleanupStatus,
}

/// Pure transform: parse the five payloads and assemble the star schema.
pub fn transform(payloads: BatchPayloads, options: &TimeDimensionOptions) -> Result<StarSchema> {
    let sources = loader::load_source_tables(payloads)?;
    schema::assemble(sources, options)
}

/// Runs one batch end to end: fetch, transform, package, deliver.
///
/// Staging is removed on every exit path. A cleanup failure is logged and recorded in the
/// report but never replaces the error that ended the run.
pub async fn run_batch(
    source: &dyn BucketStore,
    sink: &dyn BucketStore,
    config: &EtlConfig,
) -> Result<RunReport> {
    run_batch_with(source, sink, config, WorkingStorage::close).await
}

/// [`run_batch`] with the staging removal supplied by the caller.
pub async fn run_batch_with<F>(
    source: &dyn BucketStore,
    sink: &dyn BucketStore,
    config: &EtlConfig,
    close: F,
) -> Result<RunReport>
where
    F: FnOnce(WorkingStorage) -> std::io::Result<()> + Send,
{
    let run_id = Uuid::new_v4();
    let span = info_span!("etl_run", %run_id, source = %source.location());

    async move {
        config.validate()?;

        let staging = WorkingStorage::create(config.working_root.as_deref())?;
        info!(path = %staging.path().display(), "created staging directory");

        let outcome = execute(run_id, &staging, source, sink, config).await;

        let cleanup = match close(staging) {
            Ok(()) => {
                info!("removed staging directory");
                CleanupStatus::Removed
            }
            Err(err) => {
                warn!(error = %err, "failed to remove staging directory");
                CleanupStatus::Failed(err.to_string())
            }
        };

        match outcome {
            Ok(mut report) => {
                report.cleanup = cleanup;
                info!(artifact = %report.artifact_name, bytes = report.artifact_bytes, "etl run finished");
                Ok(report)
            }
            Err(err) => {
                error!(error = %err, kind = ?err.kind(), "etl run failed");
                Err(err)
            }
        }
    }
    .instrument(span)
    .await
}

async fn execute(
    run_id: Uuid,
    staging: &WorkingStorage,
    source: &dyn BucketStore,
    sink: &dyn BucketStore,
    config: &EtlConfig,
) -> Result<RunReport> {
    let payloads = loader::fetch_payloads(source).await?;
    let inputs = loader::fingerprint(&payloads);

    let schema = transform(payloads, &config.time_dimension)?;
    let tables = schema.summaries();

    let archive = packager::build_archive(staging, &schema)?;
    let artifact_bytes = archive.len();
    packager::deliver(sink, &config.output_name, archive).await?;

    Ok(RunReport {
        run_id,
        source: source.location(),
        sink: sink.location(),
        artifact_name: config.output_name.clone(),
        artifact_bytes,
        inputs,
        tables,
        cleanup: CleanupStatus::Removed,
    })
}
