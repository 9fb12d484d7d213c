use async_trait::async_trait;
use sea_orm::{
    ConnectionTrait, DatabaseBackend, DatabaseConnection, DbErr, FromQueryResult, JsonValue,
    Statement,
    sea_query::{Alias, Expr, Func, JoinType, Query, SelectStatement},
};

use crate::filtering::conditions::{Parameters, Predicate};
use crate::filtering::joined::{Join, ROOT_ALIAS};
use crate::filtering::sort::OrderBy;

/// Column alias of the count query's single value
const COUNT_ALIAS: &str = "num_items";

/// Structured, parameterized description of one table query.
///
/// Everything an execution backend needs: root table, joins, predicate tree with its
/// bound values, ordering and the page window. `count_joins` holds only the joins the
/// predicate needs, so counting never pays for a sort-only join.
///
/// When a predicate join is one-to-many, matching is moved into a
/// `root.<pk> IN (SELECT ...)` subquery so each root row is returned once.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryDescription {
    pub entity: String,
    pub table: String,
    pub primary_key: String,
    /// Root columns selected by the data query
    pub columns: Vec<String>,
    pub joins: Vec<Join>,
    pub count_joins: Vec<Join>,
    pub predicate: Option<Predicate>,
    pub parameters: Parameters,
    pub order: Option<OrderBy>,
    pub offset: u64,
    pub limit: u64,
}

impl QueryDescription {
    fn joined_select(&self, joins: &[&Join]) -> SelectStatement {
        let mut select = Query::select();
        select.from_as(Alias::new(self.table.as_str()), Alias::new(ROOT_ALIAS));
        for join in joins {
            select.join_as(
                JoinType::LeftJoin,
                Alias::new(join.table.as_str()),
                Alias::new(join.alias.as_str()),
                Expr::col((
                    Alias::new(join.parent_alias.as_str()),
                    Alias::new(join.local_column.as_str()),
                ))
                .equals((
                    Alias::new(join.alias.as_str()),
                    Alias::new(join.remote_column.as_str()),
                )),
            );
        }
        select
    }

    fn base_select(&self, joins: &[Join]) -> SelectStatement {
        let mut select = self.joined_select(&joins.iter().collect::<Vec<_>>());
        if let Some(predicate) = &self.predicate {
            select.cond_where(predicate.to_condition(&self.parameters));
        }
        select
    }

    fn root_key(&self) -> Expr {
        Expr::col((Alias::new(ROOT_ALIAS), Alias::new(self.primary_key.as_str())))
    }

    /// True when a predicate join can repeat root rows
    pub fn fans_out(&self) -> bool {
        self.count_joins.iter().any(|join| join.fans_out)
    }

    /// `SELECT root.<columns> ... WHERE ... ORDER BY ... LIMIT ... OFFSET ...`
    pub fn to_select(&self) -> SelectStatement {
        let mut select = if self.fans_out() {
            let mut matching = self.base_select(&self.count_joins);
            matching.expr(self.root_key());
            let single: Vec<_> = self.joins.iter().filter(|join| !join.fans_out).collect();
            let mut select = self.joined_select(&single);
            select.and_where(self.root_key().in_subquery(matching));
            select
        } else {
            self.base_select(&self.joins)
        };
        for column in &self.columns {
            select.column((Alias::new(ROOT_ALIAS), Alias::new(column.as_str())));
        }
        if let Some(order) = &self.order {
            select.order_by(
                (
                    Alias::new(order.column.alias.as_str()),
                    Alias::new(order.column.column.as_str()),
                ),
                order.direction.into(),
            );
        }
        select.limit(self.limit).offset(self.offset);
        select
    }

    /// `SELECT COUNT(DISTINCT root.<pk>) ...` with predicate joins only and no ordering
    pub fn to_count_select(&self) -> SelectStatement {
        let mut select = self.base_select(&self.count_joins);
        select.expr_as(
            Func::count_distinct(self.root_key()),
            Alias::new(COUNT_ALIAS),
        );
        select
    }

    pub fn statement(&self, backend: DatabaseBackend) -> Statement {
        backend.build(&self.to_select())
    }

    pub fn count_statement(&self, backend: DatabaseBackend) -> Statement {
        backend.build(&self.to_count_select())
    }
}

/// Executes query descriptions. Implemented for Sea-ORM's `DatabaseConnection`; tests and
/// callers with other stores can provide their own.
#[async_trait]
pub trait QueryBackend: Send + Sync {
    /// Rows of the requested page
    async fn fetch(&self, query: &QueryDescription) -> Result<Vec<JsonValue>, DbErr>;

    /// Distinct root rows matching the predicate, ignoring the page window
    async fn count(&self, query: &QueryDescription) -> Result<u64, DbErr>;
}

#[async_trait]
impl QueryBackend for DatabaseConnection {
    async fn fetch(&self, query: &QueryDescription) -> Result<Vec<JsonValue>, DbErr> {
        let statement = query.statement(self.get_database_backend());
        JsonValue::find_by_statement(statement).all(self).await
    }

    async fn count(&self, query: &QueryDescription) -> Result<u64, DbErr> {
        let statement = query.count_statement(self.get_database_backend());
        let Some(row) = self.query_one(statement).await? else {
            return Ok(0);
        };
        let count: i64 = row.try_get("", COUNT_ALIAS)?;
        Ok(u64::try_from(count).unwrap_or(0))
    }
}
