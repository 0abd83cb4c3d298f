//! Source side of a pipeline

use eyre::Result;

/// Produces the items a pipeline works on
///
/// Imports read records from a file ([`RecordFileReader`]); exports page
/// through a store table ([`CollectionExtractor`]).
///
/// [`RecordFileReader`]: crate::storage::RecordFileReader
/// [`CollectionExtractor`]: crate::collections::CollectionExtractor
///
/// # Example
/// ```no_run
/// use finops_backoffice::etl::Extractor;
/// use finops_backoffice::storage::RecordFileReader;
///
/// # async fn run() -> eyre::Result<()> {
/// let records = RecordFileReader::new("sales.json").extract().await?;
/// println!("{} record(s)", records.len());
/// # Ok(())
/// # }
/// ```
pub trait Extractor: Send + Sync {
    type Item: Send;

    /// Read every item from the source
    ///
    /// # Errors
    /// I/O, parse and store errors, with the source named in the context.
    fn extract(&self) -> impl std::future::Future<Output = Result<Vec<Self::Item>>> + Send;
}
