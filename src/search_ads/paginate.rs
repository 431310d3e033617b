use crate::search_ads::client::{ApiClient, ApiResponse};
use crate::search_ads::selector::Selector;
use crate::search_ads::types::AsaError;
use serde::de::DeserializeOwned;
use std::future::Future;
use std::pin::Pin;

/// Something that can answer one `find` request
///
/// Implemented by [`ApiClient`] (POST `<path>` with the selector as body);
/// tests implement it over an in-memory store.
pub trait PageSource<T>: Send + Sync {
    fn find_page<'a>(
        &'a self,
        path: &'a str,
        selector: &'a Selector,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse<Vec<T>>, AsaError>> + Send + 'a>>;
}

impl<T> PageSource<T> for ApiClient
where
    T: DeserializeOwned + Send + 'static,
{
    fn find_page<'a>(
        &'a self,
        path: &'a str,
        selector: &'a Selector,
    ) -> Pin<Box<dyn Future<Output = Result<ApiResponse<Vec<T>>, AsaError>> + Send + 'a>> {
        Box::pin(self.post::<Selector, Vec<T>>(path, selector))
    }
}

/// Fetch every record matching `selector` from a find endpoint
///
/// Requests are issued with the same conditions and ordering, the offset
/// advancing by the page limit each time. The loop stops at the first of:
///
/// - an empty page
/// - a page shorter than the limit
/// - the offset reaching the reported `totalResults`
pub async fn fetch_all<T, S>(source: &S, path: &str, selector: &Selector) -> Result<Vec<T>, AsaError>
where
    S: PageSource<T> + ?Sized,
{
    let limit = selector.pagination.limit;
    if limit == 0 {
        return Err(AsaError::Config(
            "pagination limit must be greater than zero".to_string(),
        ));
    }

    let mut offset = selector.pagination.offset;
    let mut records = Vec::new();

    loop {
        let page_selector = selector.at_offset(offset);
        let page = source.find_page(path, &page_selector).await?;

        let count = page.data.len();
        records.extend(page.data);
        tracing::debug!(
            "Fetched page at offset {} from {}: {} records ({} total so far)",
            offset,
            path,
            count,
            records.len()
        );

        if count == 0 || count < limit as usize {
            break;
        }

        let next_offset = u64::from(offset) + u64::from(limit);
        if let Some(pagination) = &page.pagination {
            if next_offset >= pagination.total_results {
                break;
            }
        }

        offset = match u32::try_from(next_offset) {
            Ok(next) => next,
            Err(_) => break,
        };
    }

    Ok(records)
}
