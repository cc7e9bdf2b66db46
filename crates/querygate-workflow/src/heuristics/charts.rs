//! Chart specification heuristics.

use async_trait::async_trait;
use serde_json::Value;

use querygate_core::{ChartSpec, ChartSpecGenerator, ChartType, CollaboratorError, TableResult};

/// Words below this length never make it into a chart label.
const MIN_LABEL_WORD: usize = 4;

const LABEL_STOPWORDS: &[&str] = &[
    "show", "chart", "graph", "plot", "with", "from", "that", "this", "what", "give", "display",
    "please", "visualize", "visualise",
];

/// Picks a chart type from explicit query words, then from the shape of the
/// data: time-like first column gives a line, small results a bar.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeuristicChartGenerator;

impl HeuristicChartGenerator {
    pub fn chart_type(table: &TableResult, query: &str) -> ChartType {
        let q = query.to_ascii_lowercase();
        if q.contains("pie") {
            return ChartType::Pie;
        }
        if q.contains("line") || q.contains("trend") || q.contains("over time") {
            return ChartType::Line;
        }
        if q.contains("scatter") {
            return ChartType::Scatter;
        }
        if q.contains("bar") {
            return ChartType::Bar;
        }

        let time_like = table.headers.first().is_some_and(|h| {
            let h = h.to_ascii_lowercase();
            ["date", "month", "time", "year", "period"]
                .iter()
                .any(|t| h.contains(t))
        });
        if time_like {
            ChartType::Line
        } else if table.row_count <= 10 {
            ChartType::Bar
        } else if table.row_count > 20 {
            ChartType::Line
        } else {
            ChartType::Bar
        }
    }

    /// Build a chart, or `None` when the table has no numeric series.
    pub fn build(table: &TableResult, query: &str) -> Option<ChartSpec> {
        if table.is_empty() || table.headers.len() < 2 {
            return None;
        }
        let y_index = (1..table.headers.len()).find(|&i| table.is_numeric_column(i))?;
        let x = table.column(0);
        let y: Vec<f64> = table
            .column(y_index)
            .iter()
            .map(|v| v.as_f64().unwrap_or(0.0))
            .collect();

        let x_label = table.headers[0].clone();
        let y_label = table.headers[y_index].clone();
        Some(ChartSpec {
            chart_type: Self::chart_type(table, query),
            label: label_from_query(query).unwrap_or_else(|| format!("{} by {}", y_label, x_label)),
            x: x.into_iter().map(stringify_missing).collect(),
            y,
            x_label: Some(x_label),
            y_label: Some(y_label),
        })
    }
}

fn stringify_missing(value: Value) -> Value {
    match value {
        Value::Null => Value::String(String::new()),
        other => other,
    }
}

fn label_from_query(query: &str) -> Option<String> {
    let words: Vec<&str> = query
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.len() >= MIN_LABEL_WORD)
        .filter(|w| !LABEL_STOPWORDS.contains(&w.to_ascii_lowercase().as_str()))
        .collect();
    if words.is_empty() {
        return None;
    }
    let mut label = words.join(" ");
    if let Some(first) = label.get(..1) {
        label = first.to_ascii_uppercase() + &label[1..];
    }
    Some(label)
}

#[async_trait]
impl ChartSpecGenerator for HeuristicChartGenerator {
    async fn generate(
        &self,
        table: &TableResult,
        query: &str,
    ) -> Result<Option<ChartSpec>, CollaboratorError> {
        Ok(Self::build(table, query))
    }
}
