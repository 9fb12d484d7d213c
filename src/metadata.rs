//! Entity metadata consumed by the path resolver.
//!
//! The engine never introspects a database. It asks a [`MetadataProvider`] whether a
//! name is a scalar field or a relation of an entity, and where a relation leads. Every
//! identifier that ends up in query text has been checked against this metadata first.

use sea_orm::{EntityTrait, IdenStatic, Iterable, PrimaryKeyToColumn};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

const DEFAULT_PRIMARY_KEY: &str = "id";

/// A to-one traversal from one entity to another.
///
/// Joined as `<parent>.<local_column> = <target>.<remote_column>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationMetadata {
    /// Entity name of the target, as registered with the provider
    pub target: String,
    /// Column on the owning entity's table
    pub local_column: String,
    /// Column on the target entity's table
    pub remote_column: String,
    /// One owning row may match many target rows
    pub to_many: bool,
}

/// Read-only description of one entity: its table, primary key, scalar fields and relations.
#[derive(Debug, Clone)]
pub struct EntityMetadata {
    name: String,
    table: String,
    primary_key: String,
    fields: Vec<String>,
    relations: BTreeMap<String, RelationMetadata>,
}

impl EntityMetadata {
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: DEFAULT_PRIMARY_KEY.to_string(),
            fields: Vec::new(),
            relations: BTreeMap::new(),
        }
    }

    /// Build metadata from a Sea-ORM entity: table name, every column as a scalar field,
    /// and the first primary key column. Relations must still be added with
    /// [`with_relation`](Self::with_relation).
    #[must_use]
    pub fn from_entity<E: EntityTrait>(name: impl Into<String>) -> Self {
        let entity = E::default();
        let mut metadata = Self::new(name, entity.table_name());
        if let Some(pk) = E::PrimaryKey::iter().next() {
            metadata.primary_key = pk.into_column().as_str().to_string();
        }
        metadata.fields = E::Column::iter()
            .map(|column| column.as_str().to_string())
            .collect();
        metadata
    }

    #[must_use]
    pub fn with_primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    #[must_use]
    pub fn with_field(mut self, name: impl Into<String>) -> Self {
        let name = name.into();
        if !self.fields.contains(&name) {
            self.fields.push(name);
        }
        self
    }

    #[must_use]
    pub fn with_fields<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names.into_iter().fold(self, |metadata, name| metadata.with_field(name))
    }

    /// Register a to-one relation named `name` leading to the entity `target`.
    #[must_use]
    pub fn with_relation(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        self.insert_relation(name.into(), target.into(), local_column.into(), remote_column.into(), false)
    }

    /// Register a one-to-many relation, e.g. `("posts", "Post", "id", "user_id")`.
    ///
    /// Filters and searches through it match a root row once no matter how many related
    /// rows match. Sorting through it is rejected.
    #[must_use]
    pub fn with_many_relation(
        self,
        name: impl Into<String>,
        target: impl Into<String>,
        local_column: impl Into<String>,
        remote_column: impl Into<String>,
    ) -> Self {
        self.insert_relation(name.into(), target.into(), local_column.into(), remote_column.into(), true)
    }

    fn insert_relation(
        mut self,
        name: String,
        target: String,
        local_column: String,
        remote_column: String,
        to_many: bool,
    ) -> Self {
        self.relations.insert(
            name,
            RelationMetadata {
                target,
                local_column,
                remote_column,
                to_many,
            },
        );
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn table(&self) -> &str {
        &self.table
    }

    pub fn primary_key(&self) -> &str {
        &self.primary_key
    }

    /// Scalar fields in declaration order
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.iter().any(|field| field == name)
    }

    pub fn has_relation(&self, name: &str) -> bool {
        self.relations.contains_key(name)
    }

    pub fn relation(&self, name: &str) -> Option<&RelationMetadata> {
        self.relations.get(name)
    }
}

/// Source of entity metadata. Implementations must be consistent and side-effect free.
pub trait MetadataProvider: Send + Sync {
    fn metadata(&self, entity: &str) -> Option<&EntityMetadata>;

    /// Metadata of the entity that `relation` on `entity` points to.
    fn target_metadata_of(&self, entity: &EntityMetadata, relation: &str) -> Option<&EntityMetadata> {
        entity
            .relation(relation)
            .and_then(|rel| self.metadata(&rel.target))
    }
}

impl<P: MetadataProvider + ?Sized> MetadataProvider for Arc<P> {
    fn metadata(&self, entity: &str) -> Option<&EntityMetadata> {
        (**self).metadata(entity)
    }
}

/// In-memory registry of entity metadata keyed by entity name.
#[derive(Debug, Clone, Default)]
pub struct Schema {
    entities: HashMap<String, EntityMetadata>,
}

impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn register(mut self, metadata: EntityMetadata) -> Self {
        self.insert(metadata);
        self
    }

    pub fn insert(&mut self, metadata: EntityMetadata) {
        self.entities.insert(metadata.name.clone(), metadata);
    }
}

impl MetadataProvider for Schema {
    fn metadata(&self, entity: &str) -> Option<&EntityMetadata> {
        self.entities.get(entity)
    }
}
