//! Reader-facing helpers that sit beside the list view.
use crate::api::{ApiError, CollectionClient, PageQuery};
use crate::models::Article;

/// How many other articles the detail screen suggests.
pub const RECOMMENDATION_COUNT: usize = 3;

/// The first page of articles, minus the one being read.
///
/// Only one small page is requested, so when the current article is on it
/// fewer than [`RECOMMENDATION_COUNT`] come back.
pub async fn recommendations<C: CollectionClient>(
    client: &C,
    current_id: &str,
) -> Result<Vec<Article>, ApiError> {
    let query = PageQuery {
        page: None,
        limit: RECOMMENDATION_COUNT,
        sort: None,
    };
    let page = client.list_page::<Article>(&query).await?;
    Ok(page
        .items
        .into_iter()
        .filter(|a| a.id != current_id)
        .take(RECOMMENDATION_COUNT)
        .collect())
}
