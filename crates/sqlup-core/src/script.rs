//! Staged script format: one SQL statement per line, executed in file order.

use std::io;
use std::path::Path;

/// One statement of a script with its 1-indexed line number.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    pub line: usize,
    pub sql: String,
}

/// Split script text into statements. Blank lines carry no statement and are
/// skipped; everything else is passed to the database verbatim.
pub fn parse_script(text: &str) -> Vec<Statement> {
    let text = text.strip_prefix('\u{feff}').unwrap_or(text);
    text.lines()
        .enumerate()
        .filter(|(_, l)| !l.trim().is_empty())
        .map(|(i, l)| Statement {
            line: i + 1,
            sql: l.to_string(),
        })
        .collect()
}

/// Read and split a staged script.
pub async fn read_script(path: &Path) -> io::Result<Vec<Statement>> {
    let text = tokio::fs::read_to_string(path).await?;
    Ok(parse_script(&text))
}
