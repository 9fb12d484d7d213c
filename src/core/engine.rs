use sea_orm::JsonValue;
use serde::{Deserialize, Serialize};

use super::backend::{QueryBackend, QueryDescription};
use crate::errors::{InvalidFieldPath, QueryError};
use crate::filtering::conditions::{Predicate, build_filter_predicate};
use crate::filtering::joined::JoinPlan;
use crate::filtering::pagination::{ResultPage, page_offset};
use crate::filtering::search::{MAX_SEARCH_QUERY_LENGTH, SearchOptions, build_search_predicate};
use crate::filtering::sort::build_sort;
use crate::metadata::MetadataProvider;
use crate::models::QueryConfiguration;

/// How the engine treats filter, search and sort paths that do not resolve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strictness {
    /// Skip the path, log a warning and report it in [`ResultPage::warnings`]
    #[default]
    Lenient,
    /// Reject the whole query with [`QueryError::InvalidFieldPath`]
    Strict,
}

/// Engine-wide settings. Deserializable so it can sit inside an application's config file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineOptions {
    pub strictness: Strictness,
    pub max_search_length: usize,
    pub escape_wildcards: bool,
}

impl Default for EngineOptions {
    fn default() -> Self {
        Self {
            strictness: Strictness::Lenient,
            max_search_length: MAX_SEARCH_QUERY_LENGTH,
            escape_wildcards: false,
        }
    }
}

impl EngineOptions {
    fn search_options(self) -> SearchOptions {
        SearchOptions {
            max_length: self.max_search_length,
            escape_wildcards: self.escape_wildcards,
        }
    }
}

/// A fully planned query plus the paths that were dropped while planning it.
#[derive(Debug, Clone, PartialEq)]
pub struct BuiltQuery {
    pub query: QueryDescription,
    pub skipped: Vec<InvalidFieldPath>,
}

impl BuiltQuery {
    /// Human-readable notes about dropped paths
    pub fn warnings(&self) -> Vec<String> {
        self.skipped.iter().map(ToString::to_string).collect()
    }
}

/// Plans and runs table queries against entities known to a [`MetadataProvider`].
///
/// The engine holds no per-query state: every [`build`](Self::build) threads its own
/// [`JoinPlan`] through the filter, search and sort steps, so one engine can serve any
/// number of concurrent requests.
#[derive(Debug, Clone)]
pub struct QueryEngine<P> {
    provider: P,
    options: EngineOptions,
}

impl<P: MetadataProvider> QueryEngine<P> {
    pub fn new(provider: P) -> Self {
        Self::with_options(provider, EngineOptions::default())
    }

    pub fn with_options(provider: P, options: EngineOptions) -> Self {
        Self { provider, options }
    }

    pub fn options(&self) -> EngineOptions {
        self.options
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Plan `config` without touching the database.
    ///
    /// # Errors
    ///
    /// [`QueryError::UnknownEntity`] when the root entity has no metadata, and
    /// [`QueryError::InvalidFieldPath`] for the first unresolvable path in strict mode.
    pub fn build(&self, config: &QueryConfiguration) -> Result<BuiltQuery, QueryError> {
        let root = self
            .provider
            .metadata(config.entity())
            .ok_or_else(|| QueryError::UnknownEntity {
                entity: config.entity().to_string(),
            })?;

        let plan = JoinPlan::new();
        let (plan, filters) = build_filter_predicate(config.filters(), root, &self.provider, plan);
        let (plan, search) = build_search_predicate(
            config.search(),
            config.searchable_fields(),
            root,
            &self.provider,
            plan,
            self.options.search_options(),
        );
        // Joins needed by the predicate; the count query stops here
        let count_joins = plan.joins().to_vec();
        let (plan, sort) = build_sort(
            config.sort_field(),
            config.sort_direction(),
            root,
            &self.provider,
            plan,
        );

        let mut skipped = filters.skipped;
        skipped.extend(search.skipped);
        skipped.extend(sort.skipped);
        if self.options.strictness == Strictness::Strict {
            if let Some(first) = skipped.into_iter().next() {
                return Err(QueryError::InvalidFieldPath(first));
            }
            skipped = Vec::new();
        }

        let predicate = Predicate::all(filters.predicate.into_iter().chain(search.predicate));
        let mut parameters = filters.parameters;
        parameters.extend(search.parameters);

        let query = QueryDescription {
            entity: root.name().to_string(),
            table: root.table().to_string(),
            primary_key: root.primary_key().to_string(),
            columns: root.fields().to_vec(),
            joins: plan.joins().to_vec(),
            count_joins,
            predicate,
            parameters,
            order: sort.order,
            offset: page_offset(config.page(), config.page_size()),
            limit: config.page_size(),
        };
        Ok(BuiltQuery { query, skipped })
    }

    /// Plan and run `config`, returning one page of rows with its total.
    ///
    /// The count runs first. If it fails the page is still returned, with `total = 0`
    /// and `count_failed` set. A failing data query is returned as
    /// [`QueryError::Execution`].
    ///
    /// # Errors
    ///
    /// Planning errors from [`build`](Self::build) and data query failures.
    pub async fn execute<B>(
        &self,
        backend: &B,
        config: &QueryConfiguration,
    ) -> Result<ResultPage<JsonValue>, QueryError>
    where
        B: QueryBackend + ?Sized,
    {
        let built = self.build(config)?;
        let query = &built.query;
        tracing::debug!(
            entity = %query.entity,
            joins = query.joins.len(),
            parameters = query.parameters.len(),
            offset = query.offset,
            limit = query.limit,
            "Executing table query"
        );

        let (total, count_failed) = match backend.count(query).await {
            Ok(total) => (total, false),
            Err(err) => {
                tracing::warn!(entity = %query.entity, error = %err, "Count query failed, reporting total as 0");
                (0, true)
            }
        };

        let items = backend.fetch(query).await?;
        tracing::debug!(entity = %query.entity, rows = items.len(), total, "Table query finished");

        let mut page = ResultPage::new(items, total, config.page(), config.page_size());
        page.count_failed = count_failed;
        page.warnings = built.warnings();
        Ok(page)
    }
}
