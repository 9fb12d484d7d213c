use serde::Deserialize;
use serde_json::Value as JsonValue;
use serde_with::{NoneAsEmptyString, serde_as};
use std::collections::BTreeMap;
use utoipa::{IntoParams, ToSchema};

use crate::errors::ConfigError;
use crate::filtering::pagination::{DEFAULT_PAGE_SIZE, MAX_PAGE_SIZE};
use crate::filtering::sort::SortDirection;

const MAX_ENTITY_NAME_LENGTH: usize = 100;

fn is_valid_entity_name(entity: &str) -> bool {
    !entity.is_empty()
        && entity.len() <= MAX_ENTITY_NAME_LENGTH
        && entity.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Everything one table request asks of the engine. Immutable once built.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfiguration {
    entity: String,
    filters: BTreeMap<String, JsonValue>,
    search: Option<String>,
    searchable_fields: Vec<String>,
    sort_field: Option<String>,
    sort_direction: SortDirection,
    page: u64,
    page_size: u64,
}

impl QueryConfiguration {
    pub fn builder(entity: impl Into<String>) -> QueryConfigurationBuilder {
        QueryConfigurationBuilder::new(entity)
    }

    pub fn entity(&self) -> &str {
        &self.entity
    }

    /// Filter values keyed by field path, in path order
    pub fn filters(&self) -> &BTreeMap<String, JsonValue> {
        &self.filters
    }

    pub fn search(&self) -> Option<&str> {
        self.search.as_deref()
    }

    pub fn searchable_fields(&self) -> &[String] {
        &self.searchable_fields
    }

    pub fn sort_field(&self) -> Option<&str> {
        self.sort_field.as_deref()
    }

    pub fn sort_direction(&self) -> SortDirection {
        self.sort_direction
    }

    pub fn page(&self) -> u64 {
        self.page
    }

    pub fn page_size(&self) -> u64 {
        self.page_size
    }
}

/// Builder for [`QueryConfiguration`]. Validation happens in [`build`](Self::build).
#[derive(Debug, Clone)]
pub struct QueryConfigurationBuilder {
    entity: String,
    filters: BTreeMap<String, JsonValue>,
    search: Option<String>,
    searchable_fields: Vec<String>,
    sort_field: Option<String>,
    sort_direction: SortDirection,
    raw_sort_direction: Option<String>,
    page: u64,
    page_size: u64,
    max_page_size: u64,
}

impl QueryConfigurationBuilder {
    pub fn new(entity: impl Into<String>) -> Self {
        Self {
            entity: entity.into(),
            filters: BTreeMap::new(),
            search: None,
            searchable_fields: Vec::new(),
            sort_field: None,
            sort_direction: SortDirection::Asc,
            raw_sort_direction: None,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
            max_page_size: MAX_PAGE_SIZE,
        }
    }

    #[must_use]
    pub fn filter(mut self, field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        self.filters.insert(field.into(), value.into());
        self
    }

    #[must_use]
    pub fn filters(mut self, filters: impl IntoIterator<Item = (String, JsonValue)>) -> Self {
        self.filters.extend(filters);
        self
    }

    #[must_use]
    pub fn search(mut self, term: impl Into<String>) -> Self {
        self.search = Some(term.into());
        self
    }

    #[must_use]
    pub fn searchable_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.searchable_fields = fields.into_iter().map(Into::into).collect();
        self
    }

    #[must_use]
    pub fn sort(mut self, field: impl Into<String>, direction: SortDirection) -> Self {
        self.sort_field = Some(field.into());
        self.sort_direction = direction;
        self.raw_sort_direction = None;
        self
    }

    /// Set the direction from text; anything but `asc`/`desc` fails in `build`.
    #[must_use]
    pub fn sort_direction_str(mut self, direction: impl Into<String>) -> Self {
        self.raw_sort_direction = Some(direction.into());
        self
    }

    #[must_use]
    pub fn page(mut self, page: u64) -> Self {
        self.page = page;
        self
    }

    #[must_use]
    pub fn page_size(mut self, page_size: u64) -> Self {
        self.page_size = page_size;
        self
    }

    #[must_use]
    pub fn max_page_size(mut self, max_page_size: u64) -> Self {
        self.max_page_size = max_page_size;
        self
    }

    /// # Errors
    ///
    /// Returns a [`ConfigError`] for an invalid entity name, a page below 1, a page size
    /// outside `1..=max_page_size`, or an unknown textual sort direction.
    pub fn build(self) -> Result<QueryConfiguration, ConfigError> {
        if !is_valid_entity_name(&self.entity) {
            return Err(ConfigError::InvalidEntity {
                entity: self.entity,
            });
        }
        if self.page < 1 {
            return Err(ConfigError::InvalidPage { page: self.page });
        }
        if self.page_size < 1 || self.page_size > self.max_page_size {
            return Err(ConfigError::InvalidPageSize {
                page_size: self.page_size,
                max: self.max_page_size,
            });
        }
        let sort_direction = match &self.raw_sort_direction {
            Some(raw) => raw.parse()?,
            None => self.sort_direction,
        };

        Ok(QueryConfiguration {
            entity: self.entity,
            filters: self.filters,
            search: self.search,
            searchable_fields: self.searchable_fields,
            sort_field: self.sort_field,
            sort_direction,
            page: self.page,
            page_size: self.page_size,
        })
    }
}

/// Query parameters a data table sends for filtering, search, sorting and pagination.
///
/// # Filtering
/// `filter` is a JSON object keyed by field path:
/// ```json
/// {"status": "active", "profile.country": "FR"}
/// ```
/// Empty strings and `null` mean "no filter".
///
/// # Search
/// `q` is matched case-insensitively against the table's searchable fields.
///
/// # Sorting
/// Either `sort=lastName&order=DESC` or the JSON array form `sort=["lastName","DESC"]`.
/// Unknown directions sort ascending.
///
/// # Pagination
/// `page` (1-based) and `per_page`.
#[serde_as]
#[derive(Debug, Deserialize, IntoParams, ToSchema, Default)]
#[into_params(parameter_in = Query)]
pub struct TableQuery {
    /// JSON-encoded filter object
    #[param(example = r#"{"profile.country": "FR"}"#)]
    pub filter: Option<String>,
    /// Free-text search term
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[param(example = "smith")]
    pub q: Option<String>,
    /// Sort field, or `["field", "ASC|DESC"]`
    #[serde(default)]
    #[serde_as(as = "NoneAsEmptyString")]
    #[param(example = "lastName")]
    pub sort: Option<String>,
    /// Sort order (ASC or DESC)
    #[param(example = "ASC")]
    pub order: Option<String>,
    /// Page number (1-based)
    #[param(example = 1)]
    pub page: Option<u64>,
    /// Number of rows per page
    #[param(example = 10)]
    pub per_page: Option<u64>,
}

fn parse_filter_json(filter: Option<&str>) -> BTreeMap<String, JsonValue> {
    filter.map_or_else(BTreeMap::new, |filter| match serde_json::from_str(filter) {
        Ok(parsed) => parsed,
        Err(e) => {
            tracing::warn!(error = %e, "Ignoring invalid JSON in filter string");
            BTreeMap::new()
        }
    })
}

/// Parse `["column", "order"]`; `None` when not a JSON array with a column.
fn parse_json_sort(json: &str) -> Option<(String, Option<String>)> {
    let sort_vec: Vec<String> = serde_json::from_str(json).ok()?;
    let mut parts = sort_vec.into_iter();
    let column = parts.next()?;
    Some((column, parts.next()))
}

impl TableQuery {
    /// Sort field and normalized direction requested by this query
    fn sorting(&self) -> (Option<String>, SortDirection) {
        let (field, order) = match self.sort.as_deref() {
            Some(sort) if sort.starts_with('[') => match parse_json_sort(sort) {
                Some((field, order)) => (Some(field), order),
                None => (None, None),
            },
            Some(sort) => (Some(sort.to_string()), self.order.clone()),
            None => (None, self.order.clone()),
        };
        let direction = order
            .as_deref()
            .map_or(SortDirection::Asc, SortDirection::normalize);
        (field, direction)
    }

    /// Turn request parameters into a configuration for `entity`, searching `searchable_fields`.
    ///
    /// # Errors
    ///
    /// Returns a [`ConfigError`] when the entity name, page or page size is invalid.
    pub fn into_configuration<I, S>(
        self,
        entity: &str,
        searchable_fields: I,
    ) -> Result<QueryConfiguration, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let (sort_field, direction) = self.sorting();
        let mut builder = QueryConfiguration::builder(entity)
            .filters(parse_filter_json(self.filter.as_deref()))
            .searchable_fields(searchable_fields)
            .page(self.page.unwrap_or(1))
            .page_size(self.per_page.unwrap_or(DEFAULT_PAGE_SIZE));
        if let Some(term) = self.q {
            builder = builder.search(term);
        }
        if let Some(field) = sort_field {
            builder = builder.sort(field, direction);
        }
        builder.build()
    }
}
