//! Script splitting and best-effort statement execution.
//!
//! [`split`] is a plain lexical split on `;`. It does not know about string
//! literals, quoted identifiers, function bodies or `--` comments, so a
//! terminator inside any of those breaks the statement in two. A `;` in a
//! comment line leaves the comment's tail glued to the next statement:
//! `-- a; b\nSELECT 1;` yields `b\nSELECT 1`. [`split_quoted`] tracks quote
//! and comment state and is the one to use for scripts with such content.

use crate::classify::{classify, excerpt, Operation};
use crate::errors::AppError;
use crate::models::{ExecutionOutcome, RunSummary};
use crate::rest_client::RestClient;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SplitMode {
    #[default]
    Lexical,
    QuoteAware,
}

pub fn split_with(mode: SplitMode, script: &str) -> Vec<String> {
    match mode {
        SplitMode::Lexical => split(script),
        SplitMode::QuoteAware => split_quoted(script),
    }
}

/// Splits on `;`, drops whole-line `--` comments and empty fragments.
pub fn split(script: &str) -> Vec<String> {
    script.split(';').filter_map(clean_fragment).collect()
}

fn clean_fragment(fragment: &str) -> Option<String> {
    let kept: Vec<&str> = fragment
        .lines()
        .filter(|line| !line.trim_start().starts_with("--"))
        .collect();
    let statement = kept.join("\n");
    let statement = statement.trim();
    if statement.is_empty() {
        None
    } else {
        Some(statement.to_string())
    }
}

enum State {
    Normal,
    SingleQuote,
    DoubleQuote,
    LineComment,
    BlockComment(usize),
    Dollar(String),
}

/// Splits on `;` outside quotes, dollar-quoted bodies and comments.
///
/// Comments are removed from the emitted statements.
pub fn split_quoted(script: &str) -> Vec<String> {
    let chars: Vec<char> = script.chars().collect();
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut state = State::Normal;
    let mut i = 0;

    while i < chars.len() {
        let c = chars[i];
        let next = chars.get(i + 1).copied();

        match &mut state {
            State::Normal => match c {
                ';' => {
                    push_statement(&mut statements, &current);
                    current.clear();
                }
                '\'' => {
                    current.push(c);
                    state = State::SingleQuote;
                }
                '"' => {
                    current.push(c);
                    state = State::DoubleQuote;
                }
                '-' if next == Some('-') => {
                    state = State::LineComment;
                    i += 1;
                }
                '/' if next == Some('*') => {
                    state = State::BlockComment(1);
                    i += 1;
                }
                '$' => match dollar_tag(&chars, i) {
                    Some(tag) => {
                        current.push_str(&tag);
                        i += tag.chars().count() - 1;
                        state = State::Dollar(tag);
                    }
                    None => current.push(c),
                },
                _ => current.push(c),
            },
            State::SingleQuote => {
                if quoted_char(c, next, '\'', &mut current, &mut i) {
                    state = State::Normal;
                }
            }
            State::DoubleQuote => {
                if quoted_char(c, next, '"', &mut current, &mut i) {
                    state = State::Normal;
                }
            }
            State::LineComment => {
                if c == '\n' {
                    current.push('\n');
                    state = State::Normal;
                }
            }
            State::BlockComment(depth) => {
                if c == '*' && next == Some('/') {
                    *depth -= 1;
                    i += 1;
                    if *depth == 0 {
                        current.push(' ');
                        state = State::Normal;
                    }
                } else if c == '/' && next == Some('*') {
                    *depth += 1;
                    i += 1;
                }
            }
            State::Dollar(tag) => {
                if c == '$' && starts_with_at(&chars, i, tag) {
                    current.push_str(tag);
                    i += tag.chars().count() - 1;
                    state = State::Normal;
                } else {
                    current.push(c);
                }
            }
        }
        i += 1;
    }

    push_statement(&mut statements, &current);
    statements
}

/// Consumes one character inside a quoted run. Returns true when the run closes.
///
/// A doubled quote is an escaped quote and keeps the run open.
fn quoted_char(
    c: char,
    next: Option<char>,
    quote: char,
    current: &mut String,
    i: &mut usize,
) -> bool {
    current.push(c);
    if c != quote {
        return false;
    }
    if next == Some(quote) {
        current.push(quote);
        *i += 1;
        return false;
    }
    true
}

fn push_statement(statements: &mut Vec<String>, raw: &str) {
    if let Some(statement) = clean_fragment(raw) {
        statements.push(statement);
    }
}

/// Reads `$$` or `$tag$` starting at `start`.
fn dollar_tag(chars: &[char], start: usize) -> Option<String> {
    let mut tag = String::from('$');
    let mut j = start + 1;
    while let Some(&c) = chars.get(j) {
        if c == '$' {
            tag.push('$');
            return Some(tag);
        }
        let valid = if j == start + 1 {
            c.is_alphabetic() || c == '_'
        } else {
            c.is_alphanumeric() || c == '_'
        };
        if !valid {
            return None;
        }
        tag.push(c);
        j += 1;
    }
    None
}

fn starts_with_at(chars: &[char], start: usize, needle: &str) -> bool {
    let mut j = start;
    for n in needle.chars() {
        if chars.get(j) != Some(&n) {
            return false;
        }
        j += 1;
    }
    true
}

/// Replays statements one by one through the execution RPC.
pub struct BatchExecutor<'a> {
    client: &'a RestClient,
    mode: SplitMode,
}

impl<'a> BatchExecutor<'a> {
    pub fn new(client: &'a RestClient) -> Self {
        Self {
            client,
            mode: SplitMode::default(),
        }
    }

    pub fn with_mode(mut self, mode: SplitMode) -> Self {
        self.mode = mode;
        self
    }

    /// Sends `SELECT 1;` to confirm the execution RPC exists and accepts SQL.
    ///
    /// Any non-2xx answer (typically 404 with `PGRST202` when the function was
    /// never created) or transport failure is reported as unavailable.
    pub async fn preflight(&self) -> Result<(), AppError> {
        let function = self.client.exec_function();
        let detail = match self.client.rpc_exec("SELECT 1;").await {
            Ok(response) => match classify(Operation::Execute, response.status, &response.body) {
                Ok(()) => {
                    tracing::info!("Exec RPC {} is available", function);
                    return Ok(());
                }
                Err(_) => format!("HTTP {}: {}", response.status, excerpt(&response.body)),
            },
            Err(e) => e.to_string(),
        };
        tracing::error!("exec RPC unavailable: {} ({})", function, detail);
        Err(AppError::NotFound(format!(
            "exec RPC {} unavailable ({})",
            function, detail
        )))
    }

    /// Executes a single statement. Non-2xx is failure; there is no retry.
    pub async fn execute(&self, statement_index: usize, statement: &str) -> ExecutionOutcome {
        match self.client.rpc_exec(statement).await {
            Ok(response) => {
                let verdict = classify(Operation::Execute, response.status, &response.body);
                if let Err(kind) = verdict {
                    tracing::warn!(
                        "Statement {} failed ({}, HTTP {}): {}",
                        statement_index + 1,
                        kind,
                        response.status,
                        excerpt(&response.body)
                    );
                }
                ExecutionOutcome {
                    statement_index,
                    status_code: Some(response.status),
                    succeeded: verdict.is_ok(),
                }
            }
            Err(e) => {
                tracing::error!("Statement {} not delivered: {}", statement_index + 1, e);
                ExecutionOutcome {
                    statement_index,
                    status_code: None,
                    succeeded: false,
                }
            }
        }
    }

    /// Executes every statement of `script` in order, continuing past failures.
    pub async fn run(&self, script: &str) -> RunSummary {
        let statements = split_with(self.mode, script);
        let total = statements.len();
        tracing::info!("Executing {} statements", total);

        let mut summary = RunSummary::default();
        for (index, statement) in statements.iter().enumerate() {
            tracing::info!(
                "Executing ({}/{}): {}",
                index + 1,
                total,
                excerpt(&statement.chars().take(100).collect::<String>())
            );
            let outcome = self.execute(index, statement).await;
            summary.record(&outcome);
        }

        tracing::info!(
            "Batch finished: {} succeeded, {} failed",
            summary.success_count,
            summary.error_count
        );
        summary
    }
}
