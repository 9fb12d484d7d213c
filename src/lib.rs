//! # tablecrate
//!
//! A relation-aware query engine for admin tables and list endpoints. Callers describe
//! what they want (filters keyed by field path, a search term, one sort column, a page)
//! and the engine produces a parameterized Sea-Query statement with the `LEFT JOIN`s
//! those paths need, a matching count query, and a [`ResultPage`] of rows.
//!
//! Field paths like `profile.address.city` are validated against registered
//! [`EntityMetadata`](metadata::EntityMetadata) before anything is emitted, and every
//! user value is bound as a parameter.
//!
//! ```rust,no_run
//! use tablecrate::{QueryConfiguration, QueryEngine};
//! use tablecrate::metadata::{EntityMetadata, Schema};
//!
//! # async fn run(db: sea_orm::DatabaseConnection) -> Result<(), tablecrate::QueryError> {
//! let schema = Schema::new()
//!     .register(
//!         EntityMetadata::new("User", "users")
//!             .with_fields(["id", "first_name", "last_name"])
//!             .with_relation("profile", "Profile", "profile_id", "id"),
//!     )
//!     .register(EntityMetadata::new("Profile", "profiles").with_fields(["id", "country"]));
//!
//! let config = QueryConfiguration::builder("User")
//!     .filter("profile.country", "FR")
//!     .search("smith")
//!     .searchable_fields(["first_name", "last_name"])
//!     .page_size(25)
//!     .build()?;
//!
//! let page = QueryEngine::new(schema).execute(&db, &config).await?;
//! println!("{} of {}", page.items.len(), page.total);
//! # Ok(())
//! # }
//! ```

pub mod core;
pub mod errors;
pub mod filtering;
pub mod metadata;
pub mod models;

pub use core::{BuiltQuery, EngineOptions, QueryBackend, QueryDescription, QueryEngine, Strictness};
pub use errors::{ConfigError, InvalidFieldPath, PathErrorKind, QueryError};
pub use filtering::{ResultPage, SortDirection, content_range_headers};
pub use metadata::{EntityMetadata, MetadataProvider, Schema};
pub use models::{QueryConfiguration, QueryConfigurationBuilder, TableQuery};
pub use serde_with;
