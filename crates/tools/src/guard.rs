//! Query guards: statement validation before anything reaches the store.
//!
//! A guard inspects the SQL text and either allows it or denies it with a
//! reason. Denials surface to the decision model as tool error text, the same
//! way store errors do.

use std::collections::HashSet;

/// Result of checking a statement against a guard.
#[derive(Debug, Clone, PartialEq)]
pub enum GuardCheck {
    Allowed,
    Denied { guard: String, reason: String },
}

impl GuardCheck {
    fn denied(guard: &str, reason: impl Into<String>) -> Self {
        Self::Denied {
            guard: guard.to_string(),
            reason: reason.into(),
        }
    }
}

pub trait QueryGuard: Send + Sync {
    fn name(&self) -> &str;

    fn check(&self, sql: &str) -> GuardCheck;
}

/// Every table reference must be qualified with the configured schema.
///
/// Table positions are the identifiers after `FROM`, `JOIN`, `INTO` and
/// `UPDATE` (plus comma-separated `FROM` lists). `FROM` inside a function
/// call such as `EXTRACT(YEAR FROM d)` is not a table position, and names
/// defined by `WITH name AS (...)` are allowed unqualified.
pub struct SchemaPrefixGuard {
    schema: String,
}

impl SchemaPrefixGuard {
    pub fn new(schema: impl Into<String>) -> Self {
        Self {
            schema: schema.into(),
        }
    }

    fn is_qualified(&self, table: &str) -> bool {
        let prefix = format!("{}.", self.schema.to_lowercase());
        table.to_lowercase().starts_with(&prefix)
    }
}

impl QueryGuard for SchemaPrefixGuard {
    fn name(&self) -> &str {
        "schema_prefix"
    }

    fn check(&self, sql: &str) -> GuardCheck {
        let tokens = tokenize(sql);
        let ctes = cte_names(&tokens);

        for table in table_references(&tokens) {
            if ctes.contains(&table.to_lowercase()) {
                continue;
            }
            if !self.is_qualified(&table) {
                return GuardCheck::denied(
                    self.name(),
                    format!(
                        "table '{table}' must be referenced as '{}.{table}'",
                        self.schema
                    ),
                );
            }
        }
        GuardCheck::Allowed
    }
}

/// Only statements that read data are allowed.
pub struct ReadOnlyGuard;

const READ_STARTS: &[&str] = &["select", "with", "explain", "show", "describe", "values"];
const WRITE_KEYWORDS: &[&str] = &[
    "insert", "update", "delete", "drop", "alter", "create", "truncate", "grant", "revoke",
    "merge", "attach", "detach", "vacuum", "pragma",
];

impl QueryGuard for ReadOnlyGuard {
    fn name(&self) -> &str {
        "read_only"
    }

    fn check(&self, sql: &str) -> GuardCheck {
        let tokens = tokenize(sql);

        let first = tokens.iter().find_map(|t| match t {
            Token::Word(w) => Some(w.to_lowercase()),
            Token::Punct(_) => None,
        });
        let Some(first) = first else {
            return GuardCheck::denied(self.name(), "empty statement");
        };
        if !READ_STARTS.contains(&first.as_str()) {
            return GuardCheck::denied(self.name(), format!("'{}' statements are not allowed", first.to_uppercase()));
        }

        // A second statement after ';' could write
        if let Some(pos) = tokens.iter().position(|t| *t == Token::Punct(';')) {
            if tokens[pos + 1..].iter().any(|t| *t != Token::Punct(';')) {
                return GuardCheck::denied(self.name(), "multiple statements are not allowed");
            }
        }

        for token in &tokens {
            if let Token::Word(w) = token {
                let lower = w.to_lowercase();
                if WRITE_KEYWORDS.contains(&lower.as_str()) {
                    return GuardCheck::denied(
                        self.name(),
                        format!("'{}' is not allowed in read-only mode", lower.to_uppercase()),
                    );
                }
            }
        }
        GuardCheck::Allowed
    }
}

/// Runs guards in order; the first denial wins.
#[derive(Default)]
pub struct GuardChain {
    guards: Vec<Box<dyn QueryGuard>>,
}

impl GuardChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, guard: Box<dyn QueryGuard>) -> Self {
        self.guards.push(guard);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.guards.is_empty()
    }

    pub fn len(&self) -> usize {
        self.guards.len()
    }
}

impl QueryGuard for GuardChain {
    fn name(&self) -> &str {
        "chain"
    }

    fn check(&self, sql: &str) -> GuardCheck {
        for guard in &self.guards {
            let check = guard.check(sql);
            if check != GuardCheck::Allowed {
                return check;
            }
        }
        GuardCheck::Allowed
    }
}

// --- SQL scanning ---

#[derive(Debug, Clone, PartialEq)]
enum Token {
    /// Identifier or keyword, quotes stripped, dots kept
    Word(String),
    Punct(char),
}

/// Split SQL into words and punctuation, dropping string literals and comments.
fn tokenize(sql: &str) -> Vec<Token> {
    let chars: Vec<char> = sql.chars().collect();
    let mut tokens = Vec::new();
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        if c.is_whitespace() {
            i += 1;
        } else if c == '-' && chars.get(i + 1) == Some(&'-') {
            while i < chars.len() && chars[i] != '\n' {
                i += 1;
            }
        } else if c == '/' && chars.get(i + 1) == Some(&'*') {
            i += 2;
            while i < chars.len() && !(chars[i] == '*' && chars.get(i + 1) == Some(&'/')) {
                i += 1;
            }
            i += 2;
        } else if c == '\'' {
            i += 1;
            while i < chars.len() {
                if chars[i] == '\'' {
                    if chars.get(i + 1) == Some(&'\'') {
                        i += 2;
                        continue;
                    }
                    break;
                }
                i += 1;
            }
            i += 1;
        } else if is_word_char(c) {
            let mut word = String::new();
            while i < chars.len() && is_word_char(chars[i]) {
                if chars[i] == '"' || chars[i] == '`' {
                    let quote = chars[i];
                    i += 1;
                    while i < chars.len() && chars[i] != quote {
                        word.push(chars[i]);
                        i += 1;
                    }
                    i += 1;
                } else {
                    word.push(chars[i]);
                    i += 1;
                }
            }
            tokens.push(Token::Word(word));
        } else {
            tokens.push(Token::Punct(c));
            i += 1;
        }
    }
    tokens
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '.' | '"' | '`' | '$')
}

const TABLE_KEYWORDS: &[&str] = &["from", "join", "into", "update"];

/// Keywords that may directly precede `(` without it being a function call.
const NON_CALL_KEYWORDS: &[&str] = &[
    "from", "join", "in", "exists", "as", "on", "where", "and", "or", "not", "select", "any",
    "all", "union", "values", "using", "lateral",
];

/// Keywords that end a comma-separated `FROM` list.
const CLAUSE_KEYWORDS: &[&str] = &[
    "where", "group", "order", "limit", "having", "union", "on", "using", "set", "values",
    "select", "returning", "offset", "window",
];

fn is_keyword(word: &str, set: &[&str]) -> bool {
    set.contains(&word.to_lowercase().as_str())
}

/// Identifiers in table positions, outside function-call parentheses.
fn table_references(tokens: &[Token]) -> Vec<String> {
    let mut tables = Vec::new();
    // One entry per open paren: true when it opened a function call
    let mut parens: Vec<bool> = Vec::new();
    let mut expect_table = false;
    let mut in_from_list = false;

    for (idx, token) in tokens.iter().enumerate() {
        let in_call = parens.iter().any(|&call| call);
        match token {
            Token::Punct('(') => {
                let is_call = matches!(
                    idx.checked_sub(1).and_then(|p| tokens.get(p)),
                    Some(Token::Word(prev)) if !is_keyword(prev, NON_CALL_KEYWORDS)
                );
                parens.push(is_call);
                expect_table = false;
                in_from_list = false;
            }
            Token::Punct(')') => {
                parens.pop();
                in_from_list = false;
            }
            Token::Punct(',') if in_from_list && !in_call => {
                expect_table = true;
            }
            Token::Punct(_) => {
                expect_table = false;
            }
            Token::Word(_) if in_call => {}
            Token::Word(word) if is_keyword(word, TABLE_KEYWORDS) => {
                expect_table = true;
                in_from_list = word.eq_ignore_ascii_case("from");
            }
            Token::Word(word) if expect_table => {
                tables.push(word.clone());
                expect_table = false;
            }
            Token::Word(word) => {
                // Any clause keyword ends a FROM list; aliases do not
                if is_keyword(word, CLAUSE_KEYWORDS) {
                    in_from_list = false;
                }
            }
        }
    }
    tables
}

/// Names introduced by `name AS (`.
fn cte_names(tokens: &[Token]) -> HashSet<String> {
    tokens
        .windows(3)
        .filter_map(|w| match w {
            [Token::Word(name), Token::Word(kw), Token::Punct('(')] if kw.eq_ignore_ascii_case("as") => {
                Some(name.to_lowercase())
            }
            _ => None,
        })
        .collect()
}
