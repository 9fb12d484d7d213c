use super::conditions::{Predicate, PredicateSet};
use super::joined::JoinPlan;
use super::path::resolve;
use crate::metadata::{EntityMetadata, MetadataProvider};
use sea_orm::Value;

// Basic safety limits
pub const MAX_SEARCH_QUERY_LENGTH: usize = 10_000;

/// Name of the parameter holding the search pattern
pub const SEARCH_PARAM: &str = "search";

const LIKE_ESCAPE: char = '\\';

/// Tuning for [`build_search_predicate`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchOptions {
    /// Longer terms are truncated to this many characters
    pub max_length: usize,
    /// Escape `%` and `_` in the term so they match literally. Off by default: a raw `%`
    /// in the search box acts as a wildcard.
    pub escape_wildcards: bool,
}

impl Default for SearchOptions {
    fn default() -> Self {
        Self {
            max_length: MAX_SEARCH_QUERY_LENGTH,
            escape_wildcards: false,
        }
    }
}

/// Escape LIKE wildcards
/// Escapes: % (match any) and _ (match single char)
fn escape_like_wildcards(input: &str) -> String {
    input.replace('\\', "\\\\")  // Escape backslash first
        .replace('%', "\\%")
        .replace('_', "\\_")
}

fn truncate_chars(term: &str, max: usize) -> &str {
    term.char_indices()
        .nth(max)
        .map_or(term, |(byte_index, _)| &term[..byte_index])
}

/// Build the case-insensitive "contains" OR group for `term` over `fields`.
///
/// The term is bound as typed; case folding happens on both sides in the database so
/// the term and the column are folded by the same rules.
///
/// A missing, empty or whitespace-only term, or an empty field list, is a no-op. Fields
/// that do not resolve are skipped with a warning; if none resolve the search is a no-op.
pub fn build_search_predicate<P>(
    term: Option<&str>,
    fields: &[String],
    root: &EntityMetadata,
    provider: &P,
    mut plan: JoinPlan,
    options: SearchOptions,
) -> (JoinPlan, PredicateSet)
where
    P: MetadataProvider + ?Sized,
{
    let mut set = PredicateSet::default();
    let term = truncate_chars(term.unwrap_or_default().trim(), options.max_length).trim_end();
    if term.is_empty() || fields.is_empty() {
        return (plan, set);
    }

    let escape = options.escape_wildcards.then_some(LIKE_ESCAPE);
    let mut conditions = Vec::with_capacity(fields.len());
    for field in fields {
        let path = match resolve(field, root, provider) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(field = %field, reason = %err, "Skipping search on invalid field path");
                set.skipped.push(err);
                continue;
            }
        };
        let (next, column) = plan.column_for(&path);
        plan = next;
        let column = match column {
            Ok(column) => column,
            Err(err) => {
                tracing::warn!(field = %field, reason = %err, "Skipping search on conflicting join alias");
                set.skipped.push(err);
                continue;
            }
        };
        conditions.push(Predicate::Contains {
            column,
            param: SEARCH_PARAM.to_string(),
            escape,
        });
    }

    set.predicate = Predicate::any(conditions);
    if set.predicate.is_some() {
        let needle = if options.escape_wildcards {
            escape_like_wildcards(term)
        } else {
            term.to_string()
        };
        set.parameters.insert(
            SEARCH_PARAM.to_string(),
            Value::from(format!("%{needle}%")),
        );
    }
    (plan, set)
}
