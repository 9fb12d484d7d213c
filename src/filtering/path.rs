//! Dotted field path resolution.
//!
//! `profile.country` on `User` resolves to one relation hop (`profile`) and the scalar
//! field `country` on `Profile`. Every non-final segment must be a relation and the final
//! segment must be a scalar field; anything else is rejected, never coerced.

use crate::errors::{InvalidFieldPath, PathErrorKind};
use crate::metadata::{EntityMetadata, MetadataProvider};

pub const PATH_SEPARATOR: char = '.';

/// One relation traversed by a field path, with everything the join planner needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationHop {
    /// Path segments up to and including this relation
    prefix: Vec<String>,
    /// Table of the entity this relation leads to
    pub table: String,
    pub local_column: String,
    pub remote_column: String,
    /// This relation may match several rows per parent row
    pub to_many: bool,
}

impl RelationHop {
    pub fn segments(&self) -> &[String] {
        &self.prefix
    }

    /// Canonical join key: the dotted prefix (e.g. `user.profile`)
    pub fn key(&self) -> String {
        self.prefix.join(".")
    }

    /// Join alias: the first relation keeps its own name, deeper ones are the
    /// underscore-joined prefix (`user`, `user_profile`, `user_profile_address`).
    pub fn alias(&self) -> String {
        self.prefix.join("_")
    }
}

/// A field path validated against entity metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldPath {
    raw: String,
    hops: Vec<RelationHop>,
    field: String,
}

impl FieldPath {
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn hops(&self) -> &[RelationHop] {
        &self.hops
    }

    /// Terminal scalar field
    pub fn field(&self) -> &str {
        &self.field
    }

    /// True when the field lives on the root entity
    pub fn is_direct(&self) -> bool {
        self.hops.is_empty()
    }

    /// First one-to-many relation on the way to the field, if any
    pub fn to_many_hop(&self) -> Option<&RelationHop> {
        self.hops.iter().find(|hop| hop.to_many)
    }

    /// Path segments with the separator replaced by `_`, used to name bound parameters.
    pub fn underscored(&self) -> String {
        self.raw.replace(PATH_SEPARATOR, "_")
    }
}

/// Resolve `path` starting at `root`.
///
/// # Errors
///
/// Returns [`InvalidFieldPath`] when a segment is empty or unknown, a non-final segment is
/// not a relation, the final segment is a relation, or a relation targets an entity the
/// provider does not know.
pub fn resolve<'a, P>(
    path: &str,
    root: &'a EntityMetadata,
    provider: &'a P,
) -> Result<FieldPath, InvalidFieldPath>
where
    P: MetadataProvider + ?Sized,
{
    if path.is_empty() {
        return Err(InvalidFieldPath::new(path, PathErrorKind::Empty));
    }

    let segments: Vec<&str> = path.split(PATH_SEPARATOR).collect();
    if segments.iter().any(|segment| segment.is_empty()) {
        return Err(InvalidFieldPath::new(path, PathErrorKind::Empty));
    }
    let Some((field, relations)) = segments.split_last() else {
        return Err(InvalidFieldPath::new(path, PathErrorKind::Empty));
    };

    let mut current = root;
    let mut hops = Vec::with_capacity(relations.len());

    for (index, segment) in relations.iter().copied().enumerate() {
        let Some(relation) = current.relation(segment) else {
            let kind = if current.has_field(segment) {
                PathErrorKind::NotARelation {
                    segment: segment.to_string(),
                    entity: current.name().to_string(),
                }
            } else {
                PathErrorKind::UnknownSegment {
                    segment: segment.to_string(),
                    entity: current.name().to_string(),
                }
            };
            return Err(InvalidFieldPath::new(path, kind));
        };

        let target = provider.metadata(&relation.target).ok_or_else(|| {
            InvalidFieldPath::new(
                path,
                PathErrorKind::UnknownTarget {
                    relation: segment.to_string(),
                    target: relation.target.clone(),
                },
            )
        })?;

        hops.push(RelationHop {
            prefix: relations[..=index].iter().map(|s| (*s).to_string()).collect(),
            table: target.table().to_string(),
            local_column: relation.local_column.clone(),
            remote_column: relation.remote_column.clone(),
            to_many: relation.to_many,
        });
        current = target;
    }

    if current.has_field(field) {
        return Ok(FieldPath {
            raw: path.to_string(),
            hops,
            field: (*field).to_string(),
        });
    }

    let kind = if current.has_relation(field) {
        PathErrorKind::EndsOnRelation {
            segment: (*field).to_string(),
            entity: current.name().to_string(),
        }
    } else {
        PathErrorKind::UnknownSegment {
            segment: (*field).to_string(),
            entity: current.name().to_string(),
        }
    };
    Err(InvalidFieldPath::new(path, kind))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::Schema;

    fn schema() -> Schema {
        Schema::new()
            .register(
                EntityMetadata::new("Post", "posts")
                    .with_fields(["id", "title", "user_id"])
                    .with_relation("user", "User", "user_id", "id"),
            )
            .register(
                EntityMetadata::new("User", "users")
                    .with_fields(["id", "firstName", "lastName", "profile_id"])
                    .with_relation("profile", "Profile", "profile_id", "id")
                    .with_relation("team", "Team", "team_id", "id")
                    .with_many_relation("posts", "Post", "id", "user_id"),
            )
            .register(
                EntityMetadata::new("Profile", "profiles").with_fields(["id", "name", "bio", "country"]),
            )
    }

    fn resolve_on(entity: &str, path: &str) -> Result<FieldPath, InvalidFieldPath> {
        let schema = schema();
        let root = schema.metadata(entity).unwrap().clone();
        resolve(path, &root, &schema)
    }

    #[test]
    fn test_direct_field() {
        let path = resolve_on("User", "firstName").unwrap();
        assert!(path.is_direct());
        assert_eq!(path.field(), "firstName");
        assert_eq!(path.as_str(), "firstName");
    }

    #[test]
    fn test_multi_level_path_accumulates_prefixes() {
        let path = resolve_on("Post", "user.profile.name").unwrap();
        let hops = path.hops();
        assert_eq!(hops.len(), 2);
        assert_eq!(hops[0].key(), "user");
        assert_eq!(hops[0].alias(), "user");
        assert_eq!(hops[0].table, "users");
        assert_eq!(hops[1].key(), "user.profile");
        assert_eq!(hops[1].alias(), "user_profile");
        assert_eq!(hops[1].table, "profiles");
        assert_eq!(hops[1].local_column, "profile_id");
        assert_eq!(path.field(), "name");
        assert_eq!(path.underscored(), "user_profile_name");
    }

    #[test]
    fn test_to_many_hop_is_tracked() {
        let path = resolve_on("User", "posts.title").unwrap();
        assert_eq!(path.to_many_hop().map(RelationHop::key), Some("posts".to_string()));
        assert!(resolve_on("Post", "user.profile.name").unwrap().to_many_hop().is_none());
    }

    #[test]
    fn test_path_ending_on_relation_is_rejected() {
        let err = resolve_on("User", "profile").unwrap_err();
        assert!(matches!(err.kind, PathErrorKind::EndsOnRelation { .. }));
    }

    #[test]
    fn test_traversing_a_scalar_is_rejected() {
        let err = resolve_on("User", "firstName.length").unwrap_err();
        assert!(matches!(err.kind, PathErrorKind::NotARelation { .. }));
    }

    #[test]
    fn test_unknown_segment_is_rejected() {
        let err = resolve_on("User", "profile.shoeSize").unwrap_err();
        assert_eq!(
            err.kind,
            PathErrorKind::UnknownSegment {
                segment: "shoeSize".into(),
                entity: "Profile".into()
            }
        );
    }

    #[test]
    fn test_unknown_target_entity_is_rejected() {
        let err = resolve_on("User", "team.name").unwrap_err();
        assert!(matches!(err.kind, PathErrorKind::UnknownTarget { .. }));
    }

    #[test]
    fn test_empty_segments_are_rejected() {
        for path in ["", ".", "profile.", ".firstName", "profile..country"] {
            let err = resolve_on("User", path).unwrap_err();
            assert_eq!(err.kind, PathErrorKind::Empty, "path {path:?}");
        }
    }

    #[test]
    fn test_injection_attempt_never_resolves() {
        let err = resolve_on("User", "firstName; DROP TABLE users").unwrap_err();
        assert!(matches!(err.kind, PathErrorKind::UnknownSegment { .. }));
    }
}
