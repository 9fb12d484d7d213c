use sea_orm::sea_query::Order;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use utoipa::ToSchema;

use super::joined::{ColumnRef, JoinPlan};
use super::path::resolve;
use crate::errors::{ConfigError, InvalidFieldPath, PathErrorKind};
use crate::metadata::{EntityMetadata, MetadataProvider};

/// Sort direction of the single order-by clause.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

impl SortDirection {
    /// Lenient parse used on request input: `desc` in any case is descending,
    /// anything else (including garbage) is ascending.
    pub fn normalize(direction: &str) -> Self {
        if direction.trim().eq_ignore_ascii_case("desc") {
            Self::Desc
        } else {
            Self::Asc
        }
    }

    pub fn as_sql(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Strict parse used when a direction is handed straight to the configuration.
impl FromStr for SortDirection {
    type Err = ConfigError;

    fn from_str(direction: &str) -> Result<Self, Self::Err> {
        match direction.trim().to_ascii_lowercase().as_str() {
            "asc" => Ok(Self::Asc),
            "desc" => Ok(Self::Desc),
            _ => Err(ConfigError::InvalidSortDirection {
                direction: direction.to_string(),
            }),
        }
    }
}

impl From<SortDirection> for Order {
    fn from(direction: SortDirection) -> Self {
        match direction {
            SortDirection::Asc => Order::Asc,
            SortDirection::Desc => Order::Desc,
        }
    }
}

/// A resolved `ORDER BY <alias>.<column> <direction>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: ColumnRef,
    pub direction: SortDirection,
}

impl fmt::Display for OrderBy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.column, self.direction.as_sql())
    }
}

/// Outcome of [`build_sort`]: the clause, or the reason it was dropped.
#[derive(Debug, Clone, Default)]
pub struct SortClause {
    pub order: Option<OrderBy>,
    pub skipped: Option<InvalidFieldPath>,
}

/// Build the order-by clause for `field`.
///
/// An empty or missing field means no ordering. A field that does not resolve is dropped
/// with a warning and reported in [`SortClause::skipped`]; the query still runs unsorted.
/// Relation paths reuse joins already in `plan`. Paths through a one-to-many relation
/// are dropped the same way, since the related rows give no single value to order by.
pub fn build_sort<P>(
    field: Option<&str>,
    direction: SortDirection,
    root: &EntityMetadata,
    provider: &P,
    plan: JoinPlan,
) -> (JoinPlan, SortClause)
where
    P: MetadataProvider + ?Sized,
{
    let Some(field) = field.map(str::trim).filter(|field| !field.is_empty()) else {
        return (plan, SortClause::default());
    };

    let resolved = resolve(field, root, provider).and_then(|path| {
        match path.to_many_hop().map(|hop| hop.key()) {
            Some(relation) => Err(InvalidFieldPath::new(
                path.as_str(),
                PathErrorKind::SortThroughToMany { relation },
            )),
            None => Ok(path),
        }
    });
    let path = match resolved {
        Ok(path) => path,
        Err(err) => return drop_sort(plan, field, err),
    };

    match plan.column_for(&path) {
        (plan, Ok(column)) => {
            let clause = SortClause {
                order: Some(OrderBy { column, direction }),
                skipped: None,
            };
            (plan, clause)
        }
        (plan, Err(err)) => drop_sort(plan, field, err),
    }
}

fn drop_sort(plan: JoinPlan, field: &str, err: InvalidFieldPath) -> (JoinPlan, SortClause) {
    tracing::warn!(field = %field, reason = %err, "Dropping sort on invalid field path");
    let clause = SortClause {
        order: None,
        skipped: Some(err),
    };
    (plan, clause)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filtering::search::{SearchOptions, build_search_predicate};
    use crate::metadata::Schema;

    fn schema() -> Schema {
        Schema::new()
            .register(
                EntityMetadata::new("User", "users")
                    .with_fields(["id", "lastName"])
                    .with_relation("profile", "Profile", "profile_id", "id")
                    .with_many_relation("posts", "Post", "id", "user_id"),
            )
            .register(EntityMetadata::new("Profile", "profiles").with_fields(["id", "name"]))
            .register(EntityMetadata::new("Post", "posts").with_fields(["id", "title"]))
    }

    fn sort(field: Option<&str>, direction: SortDirection) -> (JoinPlan, SortClause) {
        let schema = schema();
        let root = schema.metadata("User").unwrap().clone();
        build_sort(field, direction, &root, &schema, JoinPlan::new())
    }

    #[test]
    fn test_normalize_direction() {
        assert_eq!(SortDirection::normalize("DESC"), SortDirection::Desc);
        assert_eq!(SortDirection::normalize("desc"), SortDirection::Desc);
        assert_eq!(SortDirection::normalize(" Desc "), SortDirection::Desc);
        assert_eq!(SortDirection::normalize("asc"), SortDirection::Asc);
        // Anything else coerces to ASC
        assert_eq!(SortDirection::normalize("sideways"), SortDirection::Asc);
        assert_eq!(SortDirection::normalize(""), SortDirection::Asc);
    }

    #[test]
    fn test_strict_parse_rejects_unknown_direction() {
        assert_eq!("ASC".parse::<SortDirection>(), Ok(SortDirection::Asc));
        assert_eq!("Desc".parse::<SortDirection>(), Ok(SortDirection::Desc));
        assert!(matches!(
            "up".parse::<SortDirection>(),
            Err(ConfigError::InvalidSortDirection { .. })
        ));
    }

    #[test]
    fn test_empty_field_means_no_ordering() {
        for field in [None, Some(""), Some("  ")] {
            let (plan, clause) = sort(field, SortDirection::Desc);
            assert!(clause.order.is_none());
            assert!(clause.skipped.is_none());
            assert!(plan.is_empty());
        }
    }

    #[test]
    fn test_direct_sort() {
        let (_, clause) = sort(Some("lastName"), SortDirection::Desc);
        assert_eq!(clause.order.unwrap().to_string(), "root.lastName DESC");
    }

    #[test]
    fn test_unresolvable_sort_is_dropped_without_error() {
        let (plan, clause) = sort(Some("profile.shoeSize"), SortDirection::Asc);
        assert!(clause.order.is_none());
        assert_eq!(clause.skipped.unwrap().path, "profile.shoeSize");
        assert!(plan.is_empty());
    }

    #[test]
    fn test_sort_reuses_search_join() {
        let schema = schema();
        let root = schema.metadata("User").unwrap().clone();
        let (plan, _) = build_search_predicate(
            Some("ann"),
            &["profile.name".to_string()],
            &root,
            &schema,
            JoinPlan::new(),
            SearchOptions::default(),
        );
        let (plan, clause) = build_sort(Some("profile.name"), SortDirection::Asc, &root, &schema, plan);
        assert_eq!(plan.len(), 1);
        assert_eq!(clause.order.unwrap().to_string(), "profile.name ASC");
    }

    #[test]
    fn test_sort_through_one_to_many_is_dropped() {
        let (plan, clause) = sort(Some("posts.title"), SortDirection::Asc);
        assert!(clause.order.is_none());
        let skipped = clause.skipped.unwrap();
        assert_eq!(skipped.path, "posts.title");
        assert_eq!(
            skipped.kind,
            PathErrorKind::SortThroughToMany {
                relation: "posts".to_string()
            }
        );
        assert!(plan.is_empty());
    }

    #[test]
    fn test_order_conversion() {
        assert_eq!(Order::from(SortDirection::Asc), Order::Asc);
        assert_eq!(Order::from(SortDirection::Desc), Order::Desc);
    }
}
