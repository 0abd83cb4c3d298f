use super::{Filter, PageQuery, Record, Store, StoreError};

/// Row cap of the hosted PostgREST deployment
pub const DEFAULT_PAGE_SIZE: usize = 1000;

/// Read every row of `collection`, one page at a time
///
/// The hosted store silently truncates a select at its row cap, so a plain
/// select cannot return more than one page. Pages are requested in `id`
/// order until one comes back empty. A short page is not the end: the cap
/// may be lower than `page_size`, so the next offset follows the rows
/// actually returned.
pub async fn fetch_all<S>(
    store: &S,
    collection: &str,
    filter: Option<Filter>,
    page_size: usize,
) -> Result<Vec<Record>, StoreError>
where
    S: Store + ?Sized,
{
    let page_size = page_size.max(1);
    let mut rows = Vec::new();
    let mut offset = 0;

    loop {
        let query = PageQuery::new(offset, page_size)
            .with_filter(filter.clone())
            .with_order("id");
        let page = store.select_page(collection, &query).await?;
        let fetched = page.len();
        rows.extend(page);

        log::trace!("Fetched {} row(s) from {} at offset {}", fetched, collection, offset);

        if fetched == 0 {
            break;
        }
        offset += fetched;
    }

    Ok(rows)
}
