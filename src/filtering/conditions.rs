use sea_orm::{
    Condition, Value,
    sea_query::{Alias, BinOper, Expr, Func, SimpleExpr},
};
use serde_json::Value as JsonValue;
use std::collections::BTreeMap;
use std::fmt;
use uuid::Uuid;

use super::joined::{ColumnRef, JoinPlan};
use super::path::resolve;
use crate::errors::InvalidFieldPath;
use crate::metadata::{EntityMetadata, MetadataProvider};

// Basic safety limits
const MAX_FIELD_VALUE_LENGTH: usize = 10_000;

/// Prefix of every parameter bound by a filter
pub const FILTER_PARAM_PREFIX: &str = "filter_";

/// Bound values keyed by parameter name, ordered for reproducible output
pub type Parameters = BTreeMap<String, Value>;

/// Boolean condition tree over qualified columns and named parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    /// `column = :param`
    Eq { column: ColumnRef, param: String },
    /// `LOWER(column) LIKE LOWER(:param)`, both sides folded by the database
    Contains {
        column: ColumnRef,
        param: String,
        escape: Option<char>,
    },
    All(Vec<Predicate>),
    Any(Vec<Predicate>),
}

impl Predicate {
    /// AND of `predicates`; `None` when empty, the predicate itself when alone.
    pub fn all(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        Self::group(predicates.into_iter().collect(), Self::All)
    }

    /// OR of `predicates`; `None` when empty, the predicate itself when alone.
    pub fn any(predicates: impl IntoIterator<Item = Predicate>) -> Option<Self> {
        Self::group(predicates.into_iter().collect(), Self::Any)
    }

    fn group(mut predicates: Vec<Predicate>, wrap: fn(Vec<Predicate>) -> Self) -> Option<Self> {
        match predicates.len() {
            0 => None,
            1 => predicates.pop(),
            _ => Some(wrap(predicates)),
        }
    }

    /// Lower to a Sea-Query condition, binding values from `parameters`.
    pub fn to_condition(&self, parameters: &Parameters) -> Condition {
        match self {
            Self::All(items) => items
                .iter()
                .fold(Condition::all(), |cond, item| cond.add(item.to_condition(parameters))),
            Self::Any(items) => items
                .iter()
                .fold(Condition::any(), |cond, item| cond.add(item.to_condition(parameters))),
            Self::Eq { column, param } => {
                Condition::all().add(column_expr(column).eq(bound(parameters, param)))
            }
            Self::Contains {
                column,
                param,
                escape,
            } => Condition::all().add(contains_expr(column, param, *escape, parameters)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Eq { column, param } => write!(f, "{column} = :{param}"),
            Self::Contains { column, param, .. } => write!(f, "LOWER({column}) LIKE LOWER(:{param})"),
            Self::All(items) => write_group(f, items, " AND "),
            Self::Any(items) => write_group(f, items, " OR "),
        }
    }
}

fn write_group(f: &mut fmt::Formatter<'_>, items: &[Predicate], separator: &str) -> fmt::Result {
    f.write_str("(")?;
    for (index, item) in items.iter().enumerate() {
        if index > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{item}")?;
    }
    f.write_str(")")
}

fn column_expr(column: &ColumnRef) -> Expr {
    Expr::col((
        Alias::new(column.alias.as_str()),
        Alias::new(column.column.as_str()),
    ))
}

fn contains_expr(
    column: &ColumnRef,
    param: &str,
    escape: Option<char>,
    parameters: &Parameters,
) -> SimpleExpr {
    let pattern: SimpleExpr = Func::lower(SimpleExpr::Value(bound(parameters, param))).into();
    let pattern = match escape {
        Some(escape) => SimpleExpr::Binary(
            Box::new(pattern),
            BinOper::Escape,
            Box::new(SimpleExpr::Constant(escape.into())),
        ),
        None => pattern,
    };
    SimpleExpr::Binary(
        Box::new(Func::lower(column_expr(column)).into()),
        BinOper::Like,
        Box::new(pattern),
    )
}

fn bound(parameters: &Parameters, name: &str) -> Value {
    parameters
        .get(name)
        .cloned()
        .unwrap_or(Value::String(None))
}

/// Conditions produced by one builder step, plus the paths it had to skip.
#[derive(Debug, Clone, Default)]
pub struct PredicateSet {
    pub predicate: Option<Predicate>,
    pub parameters: Parameters,
    pub skipped: Vec<InvalidFieldPath>,
}

impl PredicateSet {
    pub fn is_noop(&self) -> bool {
        self.predicate.is_none()
    }
}

/// Parameter name for a filter on `path`, suffixed when another path already claimed it
/// (`user.name` and `user_name` both underscore to `user_name`).
fn filter_param_name(underscored: &str, parameters: &Parameters) -> String {
    let base = format!("{FILTER_PARAM_PREFIX}{underscored}");
    if !parameters.contains_key(&base) {
        return base;
    }
    let mut suffix = 2;
    loop {
        let candidate = format!("{base}_{suffix}");
        if !parameters.contains_key(&candidate) {
            return candidate;
        }
        suffix += 1;
    }
}

/// Convert a JSON filter value into a bound value.
///
/// `Ok(None)` means "no filter" (null, empty or whitespace-only string). Arrays, objects
/// and oversized strings cannot be compared for equality and are reported as errors.
fn filter_value(value: &JsonValue) -> Result<Option<Value>, &'static str> {
    match value {
        JsonValue::Null => Ok(None),
        JsonValue::String(string_value) => {
            if string_value.len() > MAX_FIELD_VALUE_LENGTH {
                return Err("value exceeds maximum length");
            }
            let trimmed = string_value.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            if let Ok(uuid_value) = Uuid::parse_str(trimmed) {
                return Ok(Some(Value::from(uuid_value)));
            }
            Ok(Some(Value::from(trimmed.to_string())))
        }
        JsonValue::Bool(bool_value) => Ok(Some(Value::from(*bool_value))),
        JsonValue::Number(number) => {
            if let Some(int_value) = number.as_i64() {
                Ok(Some(Value::from(int_value)))
            } else if let Some(uint_value) = number.as_u64() {
                Ok(Some(Value::from(uint_value)))
            } else if let Some(float_value) = number.as_f64() {
                Ok(Some(Value::from(float_value)))
            } else {
                Err("unsupported number")
            }
        }
        JsonValue::Array(_) | JsonValue::Object(_) => Err("only scalar values can be filtered on"),
    }
}

/// Build the AND group of equality conditions for `filters`.
///
/// Empty values are skipped without a diagnostic. Paths that do not resolve and values
/// that are not scalars are skipped with a warning; invalid paths are also returned in
/// [`PredicateSet::skipped`].
pub fn build_filter_predicate<P>(
    filters: &BTreeMap<String, JsonValue>,
    root: &EntityMetadata,
    provider: &P,
    mut plan: JoinPlan,
) -> (JoinPlan, PredicateSet)
where
    P: MetadataProvider + ?Sized,
{
    let mut set = PredicateSet::default();
    let mut conditions = Vec::new();

    for (field, raw_value) in filters {
        let value = match filter_value(raw_value) {
            Ok(Some(value)) => value,
            Ok(None) => continue,
            Err(reason) => {
                tracing::warn!(field = %field, reason, "Skipping filter");
                continue;
            }
        };

        let path = match resolve(field, root, provider) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(field = %field, reason = %err, "Skipping filter on invalid field path");
                set.skipped.push(err);
                continue;
            }
        };

        let (next, column) = plan.column_for(&path);
        plan = next;
        let column = match column {
            Ok(column) => column,
            Err(err) => {
                tracing::warn!(field = %field, reason = %err, "Skipping filter on conflicting join alias");
                set.skipped.push(err);
                continue;
            }
        };
        let param = filter_param_name(&path.underscored(), &set.parameters);
        set.parameters.insert(param.clone(), value);
        conditions.push(Predicate::Eq { column, param });
    }

    set.predicate = Predicate::all(conditions);
    (plan, set)
}
