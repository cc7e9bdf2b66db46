//! Keyword topic groups used when summarizing consolidated history.

/// Topic groups in match-priority order.
const TOPIC_GROUPS: &[(&str, &[&str])] = &[
    ("database queries", &["user", "customer", "order", "product"]),
    ("data visualization", &["chart", "graph", "visual", "plot"]),
    ("personal interaction", &["name", "hello", "how are you"]),
    ("financial analysis", &["revenue", "sales", "total", "amount"]),
    ("geographic data", &["city", "cities", "location", "address"]),
];

const INTERACTION_GROUPS: &[(&str, &[&str])] = &[
    ("data retrieval", &["show", "list", "get", "find", "display", "what are"]),
    ("visualization", &["chart", "graph", "plot", "visualize"]),
    ("aggregation", &["count", "total", "average", "sum", "how many"]),
    ("chit-chat", &["hello", "hi", "hey", "thanks", "thank you", "how are you"]),
];

/// Lowercased words of `text`, space-padded so phrase keywords can be
/// matched on word starts.
fn normalize(text: &str) -> String {
    let words: Vec<String> = text
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .map(|w| w.to_lowercase())
        .collect();
    format!(" {} ", words.join(" "))
}

fn mentions(normalized: &str, keyword: &str) -> bool {
    normalized.contains(&format!(" {}", keyword))
}

fn collect<'a, I>(queries: I, groups: &[(&'static str, &[&str])], cap: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    let mut found: Vec<String> = Vec::new();
    for query in queries {
        let normalized = normalize(query);
        for (label, keywords) in groups {
            if found.len() >= cap {
                return found;
            }
            if found.iter().any(|f| f.as_str() == *label) {
                continue;
            }
            if keywords.iter().any(|kw| mentions(&normalized, kw)) {
                found.push((*label).to_string());
            }
        }
    }
    found
}

/// Distinct topics in order of first match, capped at `max_topics`.
pub fn extract_topics<'a, I>(queries: I, max_topics: usize) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    collect(queries, TOPIC_GROUPS, max_topics)
}

/// Distinct interaction categories in order of first match.
pub fn categorize_interactions<'a, I>(queries: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str>,
{
    collect(queries, INTERACTION_GROUPS, INTERACTION_GROUPS.len())
}

/// Append `extra` to `base`, skipping duplicates, until `cap` is reached.
pub fn merge_distinct(base: &[String], extra: &[String], cap: usize) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(cap.min(base.len() + extra.len()));
    for item in base.iter().chain(extra) {
        if out.len() >= cap {
            break;
        }
        if !out.contains(item) {
            out.push(item.clone());
        }
    }
    out
}
