//! Loader trait for loading data to destinations

use eyre::Result;

/// Loader trait for loading data to a destination
///
/// Implementors define how to load items to destinations:
/// - Store collections (bulk ingest)
/// - NDJSON files
///
/// Each loader picks its own report type: a file writer reports how many
/// lines it wrote, a bulk loader reports per-record outcomes.
///
/// # Example
/// ```no_run
/// use finops_backoffice::etl::Loader;
/// use eyre::Result;
/// use std::path::PathBuf;
///
/// struct FileLoader {
///     output_dir: PathBuf,
/// }
///
/// impl Loader for FileLoader {
///     type Item = String;
///     type Report = usize;
///
///     async fn load(&self, items: Vec<Self::Item>) -> Result<usize> {
///         // Write items to files
///         Ok(items.len())
///     }
/// }
/// ```
pub trait Loader: Send + Sync {
    /// The type of items to load
    type Item: Send;

    /// What a completed load reports back
    type Report: Send;

    /// Load items to the destination
    ///
    /// # Errors
    /// Returns an error if loading fails as a whole (network, I/O, validation, etc.)
    fn load(
        &self,
        items: Vec<Self::Item>,
    ) -> impl std::future::Future<Output = Result<Self::Report>> + Send;
}
