use std::path::{Path, PathBuf};

use common::AppVersion;
use sea_orm::DbBackend;
use thiserror::Error;

use crate::entity::TABLE_PREFIX;

#[derive(Debug, Error)]
#[error("Cannot read SQL file {path}: {source}")]
pub struct SqlFileError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Column type fragments that differ between backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SqlDialect {
    Sqlite,
    Postgres,
    MySql,
}

impl SqlDialect {
    fn primary_key(&self) -> &'static str {
        match self {
            Self::Sqlite => "INTEGER PRIMARY KEY AUTOINCREMENT",
            Self::Postgres => "SERIAL PRIMARY KEY",
            Self::MySql => "INT AUTO_INCREMENT PRIMARY KEY",
        }
    }

    fn timestamp(&self) -> &'static str {
        match self {
            Self::Sqlite => "TIMESTAMP",
            Self::Postgres => "TIMESTAMPTZ",
            Self::MySql => "DATETIME",
        }
    }
}

impl From<DbBackend> for SqlDialect {
    fn from(backend: DbBackend) -> Self {
        match backend {
            DbBackend::Postgres => Self::Postgres,
            DbBackend::MySql => Self::MySql,
            _ => Self::Sqlite,
        }
    }
}

/// Loads `<dir>/<version>.sql`, fills in the `{{prefix}}`, `{{pk}}` and
/// `{{timestamp}}` placeholders and splits the file into statements.
#[derive(Debug, Clone)]
pub struct SqlLoader {
    dir: PathBuf,
    dialect: SqlDialect,
}

impl SqlLoader {
    pub fn new(dir: impl Into<PathBuf>, dialect: SqlDialect) -> Self {
        Self {
            dir: dir.into(),
            dialect,
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, version: &AppVersion) -> PathBuf {
        self.dir.join(format!("{version}.sql"))
    }

    pub async fn load(&self, version: &AppVersion) -> Result<Vec<String>, SqlFileError> {
        let path = self.path(version);
        let text = tokio::fs::read_to_string(&path)
            .await
            .map_err(|source| SqlFileError { path, source })?;
        Ok(split_statements(&self.render(&text)))
    }

    pub fn render(&self, sql: &str) -> String {
        sql.replace("{{prefix}}", TABLE_PREFIX)
            .replace("{{pk}}", self.dialect.primary_key())
            .replace("{{timestamp}}", self.dialect.timestamp())
    }
}

/// Split a script on `;`, ignoring semicolons inside quotes and comments.
/// Comments are dropped; empty statements are skipped.
pub fn split_statements(sql: &str) -> Vec<String> {
    let mut statements = Vec::new();
    let mut current = String::new();
    let mut chars = sql.chars().peekable();
    let mut quote: Option<char> = None;

    while let Some(c) = chars.next() {
        if let Some(q) = quote {
            current.push(c);
            if c == q {
                // A doubled quote is an escaped quote.
                if chars.peek() == Some(&q) {
                    current.extend(chars.next());
                } else {
                    quote = None;
                }
            }
            continue;
        }

        match c {
            '\'' | '"' | '`' => {
                quote = Some(c);
                current.push(c);
            }
            '-' if chars.peek() == Some(&'-') => {
                for c in chars.by_ref() {
                    if c == '\n' {
                        current.push('\n');
                        break;
                    }
                }
            }
            '/' if chars.peek() == Some(&'*') => {
                chars.next();
                let mut prev = '\0';
                for c in chars.by_ref() {
                    if prev == '*' && c == '/' {
                        break;
                    }
                    prev = c;
                }
                current.push(' ');
            }
            ';' => push_statement(&mut statements, &mut current),
            _ => current.push(c),
        }
    }
    push_statement(&mut statements, &mut current);

    statements
}

fn push_statement(statements: &mut Vec<String>, current: &mut String) {
    let statement = current.trim();
    if !statement.is_empty() {
        statements.push(statement.to_string());
    }
    current.clear();
}
