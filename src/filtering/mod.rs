//! # Filtering, Search, Sorting & Pagination
//!
//! Turns a [`QueryConfiguration`](crate::models::QueryConfiguration) into safe,
//! parameterized query pieces. Every step is a plain function that takes the current
//! [`JoinPlan`] by value and returns the next one, so a query build owns all of its state.
//!
//! ## Pipeline
//!
//! 1. **[`path::resolve`]**: validate a dotted path (`user.profile.name`) against entity
//!    metadata. Nothing reaches SQL text without passing through here.
//! 2. **[`JoinPlan::plan`]**: add the `LEFT JOIN`s a path needs, deduplicated by alias.
//! 3. **[`build_filter_predicate`]**: equality conditions, AND-ed, one bound parameter each
//!    (`profile.country = :filter_profile_country`).
//! 4. **[`build_search_predicate`]**: `LOWER(col) LIKE LOWER(:search)` per searchable field, OR-ed.
//! 5. **[`build_sort`]**: a single `ORDER BY`, reusing joins planned by the earlier steps.
//! 6. **[`ResultPage`]**: page arithmetic (`offset`, `page_count`, `has_next`).
//!
//! ## Example
//!
//! ```rust
//! use tablecrate::filtering::{JoinPlan, SearchOptions, build_search_predicate};
//! use tablecrate::metadata::{EntityMetadata, MetadataProvider, Schema};
//!
//! let schema = Schema::new().register(
//!     EntityMetadata::new("User", "users").with_fields(["id", "firstName", "lastName"]),
//! );
//! let user = schema.metadata("User").unwrap();
//! let fields = vec!["firstName".to_string(), "lastName".to_string()];
//!
//! let (plan, search) = build_search_predicate(
//!     Some("smith"),
//!     &fields,
//!     user,
//!     &schema,
//!     JoinPlan::new(),
//!     SearchOptions::default(),
//! );
//! assert!(plan.is_empty());
//! assert_eq!(
//!     search.predicate.unwrap().to_string(),
//!     "(LOWER(root.firstName) LIKE LOWER(:search) OR LOWER(root.lastName) LIKE LOWER(:search))"
//! );
//! ```
//!
//! ## Invalid paths
//!
//! Filters, search fields and sort fields that do not resolve are skipped with a
//! `tracing` warning and reported in the builder's `skipped` output. The engine turns
//! them into errors when running with [`Strictness::Strict`](crate::Strictness).

pub mod conditions;
pub mod joined;
pub mod pagination;
pub mod path;
pub mod search;
pub mod sort;

// Re-export commonly used items
pub use conditions::{Parameters, Predicate, PredicateSet, build_filter_predicate};
pub use joined::{ColumnRef, Join, JoinPlan, ROOT_ALIAS};
pub use pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE, ResultPage, content_range_headers, page_offset};
pub use path::{FieldPath, RelationHop, resolve};
pub use search::{SEARCH_PARAM, SearchOptions, build_search_predicate};
pub use sort::{OrderBy, SortClause, SortDirection, build_sort};
