use super::cache::LocalCollection;
use super::filter::{category_options, derive, FilterState, SortKey};
use super::paginate::{total_pages, Page, Paginator, PagingStrategy, ZeroPageSize};
use crate::api::{ApiError, CollectionClient, PageQuery, ServerPage};
use crate::models::Entity;

/// Tag handed out when a fetch starts. A response is applied only if its
/// ticket is still the newest and the view is still mounted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchTicket(u64);

/// One list screen: cached collection plus filter, sort and page state.
///
/// Everything shown is recomputed from that state on demand, so a change to
/// any input is reflected on the next [`ListView::current_page`].
#[derive(Debug)]
pub struct ListView<E> {
    cache: LocalCollection<E>,
    filter: FilterState,
    sort: SortKey,
    pager: Paginator,
    strategy: PagingStrategy,
    generation: u64,
    mounted: bool,
    loading: bool,
    last_error: Option<String>,
}

impl<E: Entity> ListView<E> {
    pub fn new(page_size: usize, strategy: PagingStrategy) -> Result<Self, ZeroPageSize> {
        Ok(Self {
            cache: LocalCollection::new(),
            filter: FilterState::default(),
            sort: SortKey::default(),
            pager: Paginator::new(page_size)?,
            strategy,
            generation: 0,
            mounted: false,
            loading: false,
            last_error: None,
        })
    }

    // ========================================================================
    // Lifecycle
    // ========================================================================

    /// Mark the view live and start its initial fetch.
    pub fn mount(&mut self) -> FetchTicket {
        self.mounted = true;
        self.begin_fetch()
    }

    /// Drop the cache. Fetches still in flight will be discarded.
    pub fn unmount(&mut self) {
        self.mounted = false;
        self.loading = false;
        self.generation += 1;
        self.cache.clear();
    }

    pub fn is_mounted(&self) -> bool {
        self.mounted
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.generation += 1;
        self.loading = true;
        FetchTicket(self.generation)
    }

    fn accepts(&self, ticket: FetchTicket) -> bool {
        let current = self.mounted && ticket.0 == self.generation;
        if !current {
            tracing::debug!(
                ticket = ticket.0,
                generation = self.generation,
                mounted = self.mounted,
                "Discarding stale fetch result"
            );
        }
        current
    }

    /// Apply a full-collection response. Returns false if it was stale.
    pub fn apply_fetch(&mut self, ticket: FetchTicket, items: Vec<E>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.cache.replace(items);
        self.loading = false;
        self.last_error = None;
        let visible = self.visible_len();
        self.pager.clamp(visible);
        true
    }

    /// Apply a server page response. Returns false if it was stale.
    pub fn apply_page(&mut self, ticket: FetchTicket, page: ServerPage<E>) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.cache.replace_page(page.items, page.total);
        self.loading = false;
        self.last_error = None;
        self.pager.go_to(page.page, page.total);
        true
    }

    /// Record a failed fetch. The previous cache is kept.
    pub fn fail_fetch(&mut self, ticket: FetchTicket, error: &ApiError) -> bool {
        if !self.accepts(ticket) {
            return false;
        }
        self.loading = false;
        self.last_error = Some(error.to_string());
        true
    }

    /// Fetch according to the paging strategy and apply the result.
    pub async fn load<C: CollectionClient>(&mut self, client: &C) -> Result<(), ApiError> {
        let ticket = if self.mounted {
            self.begin_fetch()
        } else {
            self.mount()
        };

        match self.strategy {
            PagingStrategy::ClientSide => match client.list::<E>().await {
                Ok(items) => {
                    tracing::debug!(kind = %E::KIND, count = items.len(), "Fetched collection");
                    self.apply_fetch(ticket, items);
                    Ok(())
                }
                Err(e) => {
                    self.fail_fetch(ticket, &e);
                    Err(e)
                }
            },
            PagingStrategy::ServerSide => {
                let mut query = PageQuery {
                    page: Some(self.pager.page()),
                    limit: self.pager.page_size(),
                    sort: Some(self.sort.as_param()),
                };
                let mut result = client.list_page::<E>(&query).await;
                // Past the end: ask again for the last page that exists.
                if let Ok(page) = &result {
                    let last = total_pages(page.total, query.limit);
                    if page.total > 0 && self.pager.page() > last {
                        tracing::debug!(kind = %E::KIND, requested = self.pager.page(), last, "Page out of range, fetching last page");
                        query.page = Some(last);
                        result = client.list_page::<E>(&query).await;
                    }
                }
                match result {
                    Ok(page) => {
                        tracing::debug!(kind = %E::KIND, page = page.page, total = page.total, "Fetched page");
                        self.apply_page(ticket, page);
                        Ok(())
                    }
                    Err(e) => {
                        self.fail_fetch(ticket, &e);
                        Err(e)
                    }
                }
            }
        }
    }

    // ========================================================================
    // Inputs
    // ========================================================================

    pub fn strategy(&self) -> PagingStrategy {
        self.strategy
    }

    /// True when changing page needs a new fetch.
    pub fn is_server_paged(&self) -> bool {
        self.strategy == PagingStrategy::ServerSide
    }

    pub fn filter(&self) -> &FilterState {
        &self.filter
    }

    pub fn sort(&self) -> SortKey {
        self.sort
    }

    /// Changing the query always returns to page 1.
    pub fn set_query(&mut self, query: impl Into<String>) {
        self.filter.query = query.into();
        self.pager.reset();
    }

    pub fn set_category(&mut self, category: Option<String>) {
        self.filter.category = category;
        self.pager.reset();
    }

    pub fn set_sort(&mut self, sort: SortKey) {
        if self.sort != sort {
            self.sort = sort;
            self.pager.reset();
        }
    }

    fn visible_len(&self) -> usize {
        match self.strategy {
            PagingStrategy::ClientSide => self
                .cache
                .items()
                .iter()
                .filter(|e| self.filter.matches(*e))
                .count(),
            PagingStrategy::ServerSide => self.cache.total(),
        }
    }

    /// Ask for `page` ahead of the next [`ListView::load`]. Out-of-range
    /// requests are clamped once the collection size is known.
    pub fn request_page(&mut self, page: usize) {
        self.pager.request(page);
    }

    pub fn go_to_page(&mut self, page: usize) -> bool {
        let before = self.pager.page();
        self.pager.go_to(page, self.visible_len());
        self.pager.page() != before
    }

    pub fn next_page(&mut self) -> bool {
        let total = self.visible_len();
        self.pager.clamp(total);
        self.pager.next(total)
    }

    pub fn previous_page(&mut self) -> bool {
        self.pager.clamp(self.visible_len());
        self.pager.previous()
    }

    // ========================================================================
    // Outputs
    // ========================================================================

    pub fn cache(&self) -> &LocalCollection<E> {
        &self.cache
    }

    /// For the mutation coordinator to reconcile into.
    pub fn cache_mut(&mut self) -> &mut LocalCollection<E> {
        &mut self.cache
    }

    /// The page to display.
    ///
    /// Client-side, the whole cache is filtered and sorted before slicing.
    /// Server-side, the cache already holds one page, so filter and sort only
    /// narrow that page and the counts are the server's.
    pub fn current_page(&self) -> Page<&E> {
        let visible = derive(self.cache.items(), &self.filter, self.sort);
        match self.strategy {
            PagingStrategy::ClientSide => {
                let mut pager = self.pager;
                pager.clamp(visible.len());
                pager.page_of(&visible)
            }
            PagingStrategy::ServerSide => Page {
                items: visible,
                number: self.pager.page(),
                page_size: self.pager.page_size(),
                total_items: self.cache.total(),
                total_pages: total_pages(self.cache.total(), self.pager.page_size()),
            },
        }
    }

    /// Distinct category names present in the cache.
    pub fn category_options(&self) -> Vec<String> {
        category_options(self.cache.items())
    }
}
