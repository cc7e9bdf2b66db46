//! Lexical scan of a read statement.
//!
//! Not a parser. The scanner tokenizes the statement (dropping comments and
//! string literals), then walks the tokens to find referenced tables, their
//! aliases, column references, wildcards, and denylisted keywords.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;

static TOKEN_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"(?s)--[^\n]*|/\*.*?(?:\*/|$)|'(?:[^']|'')*'?|"(?:[^"]|"")*"?|`[^`]*`?|\[[^\]]*\]?|[A-Za-z_][A-Za-z0-9_$]*|\d+(?:\.\d+)?(?:[eE][+-]?\d+)?|\S"#,
    )
    .expect("Invalid token regex")
});

/// Keywords that may not appear in statements from non-elevated roles.
pub const DENYLIST: &[&str] = &[
    "DROP",
    "DELETE",
    "INSERT",
    "UPDATE",
    "ALTER",
    "CREATE",
    "TRUNCATE",
    "EXEC",
    "EXECUTE",
    "UNION",
    "INFORMATION_SCHEMA",
    "PRAGMA",
    "ATTACH",
    "DETACH",
    "REPLACE",
    "GRANT",
    "REVOKE",
    "VACUUM",
    "SQLITE_MASTER",
    "SQLITE_SCHEMA",
];

/// Words that introduce a table reference.
const TABLE_INTRODUCERS: &[&str] = &["from", "join", "into", "update", "table"];

/// Keywords that end an ORDER BY clause at the same nesting depth.
const CLAUSE_STARTERS: &[&str] = &[
    "select", "from", "where", "group", "having", "limit", "offset", "union", "except",
    "intersect", "window",
];

/// Reserved words never treated as column references or aliases.
const RESERVED: &[&str] = &[
    "all", "and", "any", "as", "asc", "between", "by", "case", "cast", "collate", "create",
    "cross", "current", "current_date", "current_time", "current_timestamp", "delete", "desc",
    "distinct", "drop", "else", "end", "escape", "except", "exists", "false", "filter", "first",
    "following", "from", "full", "glob", "group", "having", "if", "in", "inner", "insert",
    "intersect", "into", "is", "isnull", "join", "last", "left", "like", "limit", "match", "natural",
    "not", "notnull", "null", "nulls", "offset", "on", "or", "order", "outer", "over",
    "partition", "preceding", "range", "recursive", "regexp", "right", "row", "rows", "select",
    "set", "some", "table", "then", "true", "unbounded", "union", "update", "using", "values",
    "when", "where", "window", "with",
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    /// Identifier or keyword, split on `.` and lowercased. Quoted identifiers
    /// are unwrapped and flagged so they never match keywords.
    Name { parts: Vec<String>, quoted: bool },
    /// `qualifier.*`
    QualifiedWildcard(String),
    Literal,
    Number,
    Symbol(char),
}

impl Token {
    fn keyword(&self) -> Option<&str> {
        match self {
            Token::Name { parts, quoted: false } if parts.len() == 1 => Some(parts[0].as_str()),
            _ => None,
        }
    }

    fn is_keyword(&self, kw: &str) -> bool {
        self.keyword() == Some(kw)
    }

    fn is_symbol(&self, c: char) -> bool {
        matches!(self, Token::Symbol(s) if *s == c)
    }
}

fn is_reserved(word: &str) -> bool {
    RESERVED.contains(&word)
}

fn unquote(raw: &str) -> Option<String> {
    let (open, close) = match raw.chars().next()? {
        '"' => ('"', '"'),
        '`' => ('`', '`'),
        '[' => ('[', ']'),
        _ => return None,
    };
    let inner = raw.strip_prefix(open)?;
    let inner = inner.strip_suffix(close).unwrap_or(inner);
    Some(inner.replace("\"\"", "\"").to_ascii_lowercase())
}

/// Split a statement into tokens, dropping comments and whitespace.
pub fn tokenize(statement: &str) -> Vec<Token> {
    // First pass: raw lexemes, each either a single name segment or a symbol.
    let mut raw: Vec<Token> = Vec::new();
    for m in TOKEN_RE.find_iter(statement) {
        let text = m.as_str();
        let first = text.chars().next().unwrap_or(' ');
        if text.starts_with("--") || text.starts_with("/*") {
            continue;
        }
        let token = if first == '\'' {
            Token::Literal
        } else if let Some(name) = unquote(text) {
            Token::Name {
                parts: vec![name],
                quoted: true,
            }
        } else if first.is_ascii_alphabetic() || first == '_' {
            Token::Name {
                parts: vec![text.to_ascii_lowercase()],
                quoted: false,
            }
        } else if first.is_ascii_digit() {
            Token::Number
        } else {
            Token::Symbol(first)
        };
        raw.push(token);
    }

    // Second pass: join `a . b . c` into one dotted name, `a . *` into a
    // qualified wildcard.
    let mut out: Vec<Token> = Vec::with_capacity(raw.len());
    let mut iter = raw.into_iter().peekable();
    while let Some(token) = iter.next() {
        let Token::Name {
            mut parts,
            mut quoted,
        } = token
        else {
            out.push(token);
            continue;
        };
        let mut wildcard = false;
        loop {
            if iter.peek() != Some(&Token::Symbol('.')) {
                break;
            }
            iter.next();
            match iter.next() {
                Some(Token::Name {
                    parts: more,
                    quoted: q,
                }) => {
                    parts.extend(more);
                    quoted |= q;
                }
                Some(Token::Symbol('*')) => {
                    wildcard = true;
                    break;
                }
                Some(other) => {
                    out.push(Token::Name {
                        parts: std::mem::take(&mut parts),
                        quoted,
                    });
                    out.push(Token::Symbol('.'));
                    out.push(other);
                    break;
                }
                None => break,
            }
        }
        if wildcard {
            out.push(Token::QualifiedWildcard(parts.join(".")));
        } else if !parts.is_empty() {
            out.push(Token::Name { parts, quoted });
        }
    }
    out
}

/// A table referenced by the statement, with its alias if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableRef {
    pub name: String,
    pub alias: Option<String>,
}

/// A column reference. `qualifier` is the table name or alias before the dot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnRef {
    pub qualifier: Option<String>,
    pub column: String,
}

/// Everything the access validator needs to know about a statement.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatementShape {
    pub tables: Vec<TableRef>,
    pub is_read: bool,
    pub multiple_statements: bool,
    /// Denylisted keywords found outside literals, uppercased, in order.
    pub denylisted: Vec<String>,
    pub columns: Vec<ColumnRef>,
    /// Wildcards in select position. `None` is a bare `*`.
    pub wildcards: Vec<Option<String>>,
}

impl StatementShape {
    /// Resolve a qualifier (alias or table name) to the table it names.
    pub fn resolve(&self, qualifier: &str) -> Option<&str> {
        self.tables
            .iter()
            .find(|t| t.alias.as_deref() == Some(qualifier) || t.name == qualifier)
            .or_else(|| {
                // `main.users` style qualifiers resolve by their last segment.
                self.tables
                    .iter()
                    .find(|t| t.name.rsplit('.').next() == Some(qualifier))
            })
            .map(|t| t.name.as_str())
    }
}

/// Scan a statement into its [`StatementShape`].
pub fn analyze(statement: &str) -> StatementShape {
    let tokens = tokenize(statement);
    let mut shape = StatementShape::default();

    shape.is_read = tokens
        .iter()
        .find(|t| !t.is_symbol('('))
        .map(|t| t.is_keyword("select") || t.is_keyword("with"))
        .unwrap_or(false);

    shape.multiple_statements = tokens
        .iter()
        .position(|t| t.is_symbol(';'))
        .map(|pos| tokens[pos..].iter().any(|t| !t.is_symbol(';')))
        .unwrap_or(false);

    for token in &tokens {
        if let Token::Name {
            parts,
            quoted: false,
        } = token
        {
            for part in parts {
                let upper = part.to_ascii_uppercase();
                if DENYLIST.contains(&upper.as_str()) && !shape.denylisted.contains(&upper) {
                    shape.denylisted.push(upper);
                }
            }
        }
    }

    // Token indices consumed as table names or aliases.
    let mut consumed: HashSet<usize> = HashSet::new();
    let mut i = 0;
    while i < tokens.len() {
        let Some(kw) = tokens[i].keyword() else {
            i += 1;
            continue;
        };
        if !TABLE_INTRODUCERS.contains(&kw) {
            i += 1;
            continue;
        }
        let list = kw == "from";
        let mut j = i + 1;
        if kw == "table" {
            while tokens
                .get(j)
                .map(|t| t.is_keyword("if") || t.is_keyword("not") || t.is_keyword("exists"))
                .unwrap_or(false)
            {
                j += 1;
            }
        }
        loop {
            let Some(Token::Name { parts, quoted }) = tokens.get(j) else {
                break;
            };
            if !quoted && parts.len() == 1 && is_reserved(&parts[0]) {
                break;
            }
            consumed.insert(j);
            let name = parts.join(".");
            j += 1;

            let mut alias = None;
            if tokens.get(j).map(|t| t.is_keyword("as")).unwrap_or(false) {
                j += 1;
            }
            if let Some(Token::Name { parts, quoted }) = tokens.get(j) {
                if parts.len() == 1 && (*quoted || !is_reserved(&parts[0])) {
                    consumed.insert(j);
                    alias = Some(parts[0].clone());
                    j += 1;
                }
            }
            shape.tables.push(TableRef { name, alias });

            if list && tokens.get(j).map(|t| t.is_symbol(',')).unwrap_or(false) {
                j += 1;
                continue;
            }
            break;
        }
        i = j.max(i + 1);
    }

    // Output aliases (`expr AS name`) are consumed where they are defined.
    // Later bare uses of the name are still column references, except in
    // ORDER BY, which SQLite resolves against output aliases first.
    let mut output_aliases: HashSet<String> = HashSet::new();
    for (idx, token) in tokens.iter().enumerate() {
        if !token.is_keyword("as") || consumed.contains(&(idx + 1)) {
            continue;
        }
        if let Some(Token::Name { parts, .. }) = tokens.get(idx + 1) {
            if parts.len() == 1 {
                output_aliases.insert(parts[0].clone());
                consumed.insert(idx + 1);
            }
        }
    }

    let mut depth = 0usize;
    // Paren depth of the ORDER BY clause currently being scanned.
    let mut order_by: Option<usize> = None;

    for (idx, token) in tokens.iter().enumerate() {
        match token {
            Token::Symbol('(') => depth += 1,
            Token::Symbol(')') => {
                depth = depth.saturating_sub(1);
                if order_by.is_some_and(|d| depth < d) {
                    order_by = None;
                }
            }
            Token::Name { parts, quoted } => {
                if let Some(kw) = token.keyword() {
                    if kw == "by" && idx > 0 && tokens[idx - 1].is_keyword("order") {
                        order_by = Some(depth);
                        continue;
                    }
                    if CLAUSE_STARTERS.contains(&kw) && order_by == Some(depth) {
                        order_by = None;
                    }
                }
                if consumed.contains(&idx) {
                    continue;
                }
                if tokens.get(idx + 1).map(|t| t.is_symbol('(')).unwrap_or(false) {
                    continue;
                }
                if parts.len() == 1 {
                    let word = &parts[0];
                    if !quoted && is_reserved(word) {
                        continue;
                    }
                    if order_by.is_some() && output_aliases.contains(word) {
                        continue;
                    }
                    shape.columns.push(ColumnRef {
                        qualifier: None,
                        column: word.clone(),
                    });
                } else {
                    let (column, qualifier) = match parts.split_last() {
                        Some((last, rest)) => (last.clone(), rest.join(".")),
                        None => continue,
                    };
                    shape.columns.push(ColumnRef {
                        qualifier: Some(qualifier),
                        column,
                    });
                }
            }
            Token::QualifiedWildcard(qualifier) => {
                shape.wildcards.push(Some(qualifier.clone()));
            }
            Token::Symbol('*') => {
                let prev = idx.checked_sub(1).and_then(|p| tokens.get(p));
                let select_position = match prev {
                    Some(t) => {
                        t.is_keyword("select")
                            || t.is_keyword("distinct")
                            || t.is_keyword("all")
                            || t.is_symbol(',')
                    }
                    None => false,
                };
                if select_position {
                    shape.wildcards.push(None);
                }
            }
            _ => {}
        }
    }

    shape
}
