//! Schema-driven statement generation.
//!
//! Maps query words onto a table, selects the columns the role may see, and
//! adds aggregation for complex queries. A table the query names but the
//! role cannot see is still emitted so the access validator refuses it with
//! a reason naming that table.

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use tracing::debug;

use querygate_core::{
    CollaboratorError, QueryComplexity, Role, SchemaContext, StatementGenerator, TableSchema,
};

const NAME: &str = "statement generator";

/// Row limit applied to every generated statement.
pub const DEFAULT_LIMIT: usize = 100;

/// Query words that name a table without matching its name.
const TABLE_SYNONYMS: &[(&str, &str)] = &[
    ("user", "users"),
    ("customer", "users"),
    ("customers", "users"),
    ("people", "users"),
    ("order", "orders"),
    ("purchase", "orders"),
    ("purchases", "orders"),
    ("product", "products"),
    ("item", "products"),
    ("items", "products"),
    ("category", "categories"),
    ("sale", "sales"),
    ("revenue", "sales"),
    ("metric", "analytics"),
    ("metrics", "analytics"),
];

static CITY_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(?:in|from)\s+([A-Z][a-zA-Z]+(?:\s+[A-Z][a-zA-Z]+)*)")
        .expect("Invalid city regex")
});

static GROUP_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(?:by|per|each)\s+([a-z_]+)").expect("Invalid grouping regex")
});

static TOP_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)\btop\s+(\d+)").expect("Invalid top-n regex"));

static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(how\s+many|count|number\s+of)\b").expect("Invalid count regex")
});

static AVG_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(average|avg|mean)\b").expect("Invalid average regex")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    Count,
    Avg,
    Sum,
}

/// Builds read statements from the role's schema context without a model.
#[derive(Debug, Default, Clone, Copy)]
pub struct SchemaStatementGenerator;

impl SchemaStatementGenerator {
    /// Generate synchronously. `None` when no table can be identified.
    pub fn build(
        &self,
        query: &str,
        schema: &SchemaContext,
        complexity: QueryComplexity,
    ) -> Option<String> {
        let table_name = identify_table(query, schema)?;
        let Some(table) = schema.table(&table_name) else {
            return Some(format!("SELECT * FROM {} LIMIT {}", table_name, DEFAULT_LIMIT));
        };

        let filter = city_filter(query, table);
        let statement = match complexity {
            QueryComplexity::Simple => select_columns(table, &filter, None, DEFAULT_LIMIT),
            QueryComplexity::Complex => aggregate(query, table, &filter),
        };
        Some(statement)
    }
}

fn words(query: &str) -> Vec<String> {
    query
        .split(|c: char| !c.is_ascii_alphanumeric() && c != '_')
        .filter(|w| !w.is_empty())
        .map(|w| w.to_ascii_lowercase())
        .collect()
}

/// First query word that names a table, either directly, as a singular, or
/// through a synonym.
fn identify_table(query: &str, schema: &SchemaContext) -> Option<String> {
    for word in words(query) {
        if let Some(table) = schema.table(&word) {
            return Some(table.name.clone());
        }
        if let Some(table) = schema
            .tables
            .iter()
            .find(|t| t.name.strip_suffix('s') == Some(word.as_str()))
        {
            return Some(table.name.clone());
        }
        if let Some((_, table)) = TABLE_SYNONYMS.iter().find(|(w, _)| *w == word) {
            return Some(table.to_string());
        }
        if ["users", "orders", "products", "categories", "sales", "analytics"]
            .contains(&word.as_str())
        {
            return Some(word);
        }
    }
    None
}

fn has_column(table: &TableSchema, name: &str) -> bool {
    table.column_names().any(|c| c.eq_ignore_ascii_case(name))
}

fn is_numeric_type(data_type: &str) -> bool {
    let upper = data_type.to_ascii_uppercase();
    ["INT", "REAL", "NUM", "DEC", "FLOAT", "DOUBLE"]
        .iter()
        .any(|t| upper.contains(t))
}

/// Measure column for aggregation: a numeric column named in the query, else
/// the first numeric column that is not a key.
fn metric_column<'a>(query_words: &[String], table: &'a TableSchema) -> Option<&'a str> {
    let candidates: Vec<&str> = table
        .columns
        .iter()
        .filter(|c| is_numeric_type(&c.data_type))
        .map(|c| c.name.as_str())
        .filter(|name| *name != "id" && !name.ends_with("_id"))
        .collect();
    candidates
        .iter()
        .copied()
        .find(|name| {
            query_words
                .iter()
                .any(|w| w.as_str() == *name || singular(w) == *name)
        })
        .or_else(|| candidates.first().copied())
}

fn city_filter(query: &str, table: &TableSchema) -> Option<String> {
    if !has_column(table, "city") {
        return None;
    }
    let caps = CITY_RE.captures(query)?;
    let city = caps.get(1)?.as_str();
    Some(format!("city = '{}'", city.replace('\'', "''")))
}

fn where_clause(filter: &Option<String>) -> String {
    filter
        .as_ref()
        .map(|f| format!(" WHERE {}", f))
        .unwrap_or_default()
}

fn select_columns(
    table: &TableSchema,
    filter: &Option<String>,
    order: Option<&str>,
    limit: usize,
) -> String {
    let columns: Vec<&str> = table.column_names().collect();
    let mut statement = format!(
        "SELECT {} FROM {}{}",
        columns.join(", "),
        table.name,
        where_clause(filter)
    );
    if let Some(order) = order {
        statement.push_str(&format!(" ORDER BY {} DESC", order));
    }
    statement.push_str(&format!(" LIMIT {}", limit));
    statement
}

fn singular(word: &str) -> &str {
    word.strip_suffix('s').unwrap_or(word)
}

/// Grouping expression and its output name. A `by <word>` that names no
/// usable column falls back to any other column the query mentions, so
/// "top regions by sales" groups by region.
fn grouping(
    query: &str,
    query_words: &[String],
    table: &TableSchema,
    metric: Option<&str>,
) -> Option<(String, String)> {
    let usable = |name: &str| {
        has_column(table, name) && Some(name) != metric && name != "id" && !name.ends_with("_id")
    };
    let requested = GROUP_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_ascii_lowercase());

    if let Some(req) = &requested {
        for candidate in [req.as_str(), singular(req)] {
            if usable(candidate) {
                return Some((candidate.to_string(), candidate.to_string()));
            }
        }
    }

    let wants_month = query_words.iter().any(|w| w == "monthly")
        || requested.as_deref().map(singular) == Some("month");
    if wants_month {
        if usable("month") {
            return Some(("month".to_string(), "month".to_string()));
        }
        if has_column(table, "date") {
            return Some(("strftime('%Y-%m', date)".to_string(), "month".to_string()));
        }
    }

    if requested.is_some() {
        for word in query_words {
            for candidate in [word.as_str(), singular(word)] {
                if usable(candidate) {
                    return Some((candidate.to_string(), candidate.to_string()));
                }
            }
        }
    }
    None
}

fn aggregate(query: &str, table: &TableSchema, filter: &Option<String>) -> String {
    let query_words = words(query);
    let metric = metric_column(&query_words, table);
    let top_n = TOP_RE
        .captures(query)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse::<usize>().ok())
        .filter(|n| *n > 0);

    let op = if COUNT_RE.is_match(query) || metric.is_none() {
        Aggregate::Count
    } else if AVG_RE.is_match(query) {
        Aggregate::Avg
    } else {
        Aggregate::Sum
    };
    let (agg_expr, agg_name) = match (op, metric) {
        (Aggregate::Avg, Some(m)) => (format!("AVG({})", m), format!("avg_{}", m)),
        (Aggregate::Sum, Some(m)) => (format!("SUM({})", m), format!("total_{}", m)),
        _ => ("COUNT(*)".to_string(), "row_count".to_string()),
    };

    match grouping(query, &query_words, table, metric) {
        Some((expr, name)) => {
            let select = if expr == name {
                name.clone()
            } else {
                format!("{} AS {}", expr, name)
            };
            let order = if top_n.is_some() {
                format!("{} DESC", agg_name)
            } else {
                name.clone()
            };
            format!(
                "SELECT {}, {} AS {} FROM {}{} GROUP BY {} ORDER BY {} LIMIT {}",
                select,
                agg_expr,
                agg_name,
                table.name,
                where_clause(filter),
                expr,
                order,
                top_n.unwrap_or(DEFAULT_LIMIT)
            )
        }
        None => match (top_n, metric) {
            (Some(n), Some(m)) => select_columns(table, filter, Some(m), n),
            _ => format!(
                "SELECT {} AS {} FROM {}{}",
                agg_expr,
                agg_name,
                table.name,
                where_clause(filter)
            ),
        },
    }
}

#[async_trait]
impl StatementGenerator for SchemaStatementGenerator {
    async fn generate(
        &self,
        query: &str,
        role: Role,
        schema: &SchemaContext,
        complexity: QueryComplexity,
    ) -> Result<String, CollaboratorError> {
        let statement = self
            .build(query, schema, complexity)
            .ok_or(CollaboratorError::Empty(NAME))?;
        debug!(role = %role, ?complexity, "Statement generated");
        Ok(statement)
    }
}
