//! Snapshot command handlers. They run against any [`SnapshotStore`] and
//! return the rendered output for `main` to print.

use brandrec_core::{chronological, compute_delta, SnapshotId, SnapshotStore};
use clap::Subcommand;

use crate::render::{self, OutputFormat};

/// Sub-commands available under `snapshots`.
#[derive(Debug, Subcommand)]
pub enum SnapshotCommands {
    /// List saved snapshots, newest first
    List {
        /// Only snapshots whose source A matches (requires --source-b)
        #[arg(long, requires = "source_b")]
        source_a: Option<String>,
        /// Only snapshots whose source B matches (requires --source-a)
        #[arg(long, requires = "source_a")]
        source_b: Option<String>,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Print a saved comparison
    Show {
        id: SnapshotId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
    /// Delete a saved comparison
    Delete { id: SnapshotId },
    /// Brand-level changes between two snapshots of the same source pair
    Diff {
        first: SnapshotId,
        second: SnapshotId,
        #[arg(long, value_enum, default_value_t = OutputFormat::Table)]
        format: OutputFormat,
    },
}

/// Run one `snapshots` sub-command.
///
/// # Errors
///
/// Returns an error if the store fails, an id is unknown, or `diff` is asked
/// to compare snapshots of different source pairs.
pub(crate) async fn run_snapshots(
    store: &dyn SnapshotStore,
    command: SnapshotCommands,
) -> anyhow::Result<String> {
    match command {
        SnapshotCommands::List {
            source_a,
            source_b,
            format,
        } => {
            let metas = match (source_a.as_deref(), source_b.as_deref()) {
                (Some(a), Some(b)) => store.list_by_source_pair(a, b).await?,
                _ => store.list().await?,
            };
            render::snapshot_list(&metas, format)
        }
        SnapshotCommands::Show { id, format } => {
            let record = store
                .load(id)
                .await?
                .ok_or_else(|| anyhow::anyhow!("snapshot {id} not found"))?;
            render::comparison(&record, format)
        }
        SnapshotCommands::Delete { id } => {
            if !store.delete(id).await? {
                anyhow::bail!("snapshot {id} not found");
            }
            Ok(format!("deleted snapshot {id}\n"))
        }
        SnapshotCommands::Diff {
            first,
            second,
            format,
        } => {
            let first_record = store
                .load(first)
                .await?
                .ok_or_else(|| anyhow::anyhow!("snapshot {first} not found"))?;
            let second_record = store
                .load(second)
                .await?
                .ok_or_else(|| anyhow::anyhow!("snapshot {second} not found"))?;

            if !first_record.same_source_pair(&second_record) {
                anyhow::bail!(
                    "snapshots {first} and {second} compare different sources \
                     ({} vs {} / {} vs {})",
                    first_record.source_a_identifier,
                    first_record.source_b_identifier,
                    second_record.source_a_identifier,
                    second_record.source_b_identifier
                );
            }

            let (earlier, later) = chronological(&first_record, &second_record);
            render::delta(&compute_delta(earlier, later), format)
        }
    }
}
