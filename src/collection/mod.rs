//! The list/filter/paginate/mutate pattern shared by every list screen.
//!
//! - [`cache`] - the fetched collection, mutated in place after saves
//! - [`filter`] - pure filter and stable sort over the cache
//! - [`paginate`] - page slicing, the page cursor, and the paging strategy
//! - [`mutation`] - validated create/update and two-step delete
//! - [`view`] - binds the above into one screen with stale-fetch discard

pub mod cache;
pub mod filter;
pub mod mutation;
pub mod paginate;
pub mod view;

pub use cache::{LocalCollection, MissingEntity};
pub use filter::{category_options, derive, FilterState, SortKey};
pub use mutation::{MutationCoordinator, MutationError, MutationState, Reconcile, Target};
pub use paginate::{paginate, total_pages, Page, Paginator, PagingStrategy, ZeroPageSize};
pub use view::{FetchTicket, ListView};
