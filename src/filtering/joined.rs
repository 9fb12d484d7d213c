//! Join planning for relation paths.
//!
//! A [`JoinPlan`] is a value: planning a path consumes the plan and hands back a new one
//! together with the alias the path's field is read from. Nothing is shared between query
//! builds, so two requests can never see each other's aliases.
//!
//! Aliases follow a fixed shape so that generated SQL is reproducible:
//!
//! | path                  | joins added                    | field read from |
//! |-----------------------|--------------------------------|-----------------|
//! | `title`               | none                           | `root`          |
//! | `user.email`          | `user`                         | `user`          |
//! | `user.profile.name`   | `user`, `user_profile`         | `user_profile`  |
//! | `user.profile.bio`    | none (both already planned)    | `user_profile`  |
//!
//! Joins are identified by their dotted key. Because the alias flattens dots to
//! underscores, two different keys can map to the same alias (`user.profile` and a
//! relation named `user_profile`); the path planned second is rejected, as is any path
//! whose alias would be `root`.

use std::fmt;

use super::path::FieldPath;
use crate::errors::{InvalidFieldPath, PathErrorKind};

/// Alias of the queried entity's table
pub const ROOT_ALIAS: &str = "root";

/// A single `LEFT JOIN <table> AS <alias> ON <parent_alias>.<local_column> = <alias>.<remote_column>`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Join {
    /// Dotted relation prefix this join represents (e.g. `user.profile`)
    pub key: String,
    pub alias: String,
    pub parent_alias: String,
    pub table: String,
    pub local_column: String,
    pub remote_column: String,
    /// This join, or one it hangs off, is one-to-many and can repeat root rows
    pub fans_out: bool,
}

impl fmt::Display for Join {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LEFT JOIN {} AS {} ON {}.{} = {}.{}",
            self.table, self.alias, self.parent_alias, self.local_column, self.alias, self.remote_column
        )
    }
}

/// A column qualified by the alias of the table it lives on.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ColumnRef {
    pub alias: String,
    pub column: String,
}

impl ColumnRef {
    pub fn new(alias: impl Into<String>, column: impl Into<String>) -> Self {
        Self {
            alias: alias.into(),
            column: column.into(),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.alias, self.column)
    }
}

/// Ordered, deduplicated set of joins needed by one query build.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct JoinPlan {
    joins: Vec<Join>,
}

impl JoinPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the joins `path` needs and return the alias its field is read from.
    ///
    /// A join is only added when its key is not planned yet, so paths sharing a
    /// relation prefix share the join. On an alias conflict the plan is returned
    /// unchanged together with the error.
    #[must_use]
    pub fn plan(mut self, path: &FieldPath) -> (Self, Result<String, InvalidFieldPath>) {
        if let Err(err) = self.check_aliases(path) {
            return (self, Err(err));
        }

        let mut parent = ROOT_ALIAS.to_string();
        let mut fans_out = false;
        for hop in path.hops() {
            let key = hop.key();
            let alias = hop.alias();
            fans_out |= hop.to_many;
            if !self.contains_key(&key) {
                self.joins.push(Join {
                    key,
                    alias: alias.clone(),
                    parent_alias: parent,
                    table: hop.table.clone(),
                    local_column: hop.local_column.clone(),
                    remote_column: hop.remote_column.clone(),
                    fans_out,
                });
            }
            parent = alias;
        }
        (self, Ok(parent))
    }

    /// Same as [`plan`](Self::plan) but returns the fully qualified column.
    #[must_use]
    pub fn column_for(self, path: &FieldPath) -> (Self, Result<ColumnRef, InvalidFieldPath>) {
        let (plan, alias) = self.plan(path);
        (plan, alias.map(|alias| ColumnRef::new(alias, path.field())))
    }

    fn check_aliases(&self, path: &FieldPath) -> Result<(), InvalidFieldPath> {
        for hop in path.hops() {
            let alias = hop.alias();
            if alias == ROOT_ALIAS {
                return Err(InvalidFieldPath::new(
                    path.as_str(),
                    PathErrorKind::ReservedAlias { alias },
                ));
            }
            let key = hop.key();
            if let Some(other) = self.joins.iter().find(|join| join.alias == alias && join.key != key) {
                return Err(InvalidFieldPath::new(
                    path.as_str(),
                    PathErrorKind::AliasCollision {
                        alias,
                        claimed_by: other.key.clone(),
                    },
                ));
            }
        }
        Ok(())
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.joins.iter().any(|join| join.key == key)
    }

    pub fn joins(&self) -> &[Join] {
        &self.joins
    }

    /// True when any planned join is one-to-many
    pub fn fans_out(&self) -> bool {
        self.joins.iter().any(|join| join.fans_out)
    }

    pub fn aliases(&self) -> impl Iterator<Item = &str> {
        self.joins.iter().map(|join| join.alias.as_str())
    }

    pub fn len(&self) -> usize {
        self.joins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.joins.is_empty()
    }
}
