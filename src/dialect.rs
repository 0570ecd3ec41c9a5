use std::fmt;
use std::str::FromStr;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SqlTemplateError;
use crate::types::BindMode;

/// Placeholder syntax profile of a database family.
///
/// The four built-in profiles cover PostgreSQL, MySQL, Oracle and SQL Server. Other databases
/// can be described with [`Dialect::ordinal`] or [`Dialect::plain`]:
/// ```rust
/// use sql_template::prelude::*;
///
/// const SQLITE: Dialect = Dialect::ordinal("sqlite", "?", ":", &['%', '_']);
/// assert_eq!(SQLITE.placeholder_for(BindMode::Positional, "id", 2), "?2");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Dialect {
    name: &'static str,
    ordinal_prefix: Option<&'static str>,
    placeholder: &'static str,
    named_prefix: &'static str,
    wildcards: &'static [char],
}

impl Dialect {
    /// PostgreSQL: `$1`, `:name`.
    pub const POSTGRES: Dialect = Dialect::ordinal("postgres", "$", ":", &['%', '_']);
    /// MySQL: `?`, `:name`.
    pub const MYSQL: Dialect = Dialect::plain("mysql", "?", ":", &['%', '_']);
    /// Oracle: `:1`, `:name`. Full-width wildcards are honored by `LIKE` too.
    pub const ORACLE: Dialect =
        Dialect::ordinal("oracle", ":", ":", &['%', '_', '\u{FF05}', '\u{FF3F}']);
    /// SQL Server: `@p1`, `@name`.
    pub const SQL_SERVER: Dialect = Dialect::ordinal("sqlserver", "@p", "@", &['%', '_', '[']);

    /// Dialect with indexed placeholders (`prefix` followed by the 1-based argument index).
    #[must_use]
    pub const fn ordinal(
        name: &'static str,
        ordinal_prefix: &'static str,
        named_prefix: &'static str,
        wildcards: &'static [char],
    ) -> Self {
        Self {
            name,
            ordinal_prefix: Some(ordinal_prefix),
            placeholder: "",
            named_prefix,
            wildcards,
        }
    }

    /// Dialect with a single non-indexed placeholder token such as `?`.
    #[must_use]
    pub const fn plain(
        name: &'static str,
        placeholder: &'static str,
        named_prefix: &'static str,
        wildcards: &'static [char],
    ) -> Self {
        Self {
            name,
            ordinal_prefix: None,
            placeholder,
            named_prefix,
            wildcards,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.name
    }

    #[must_use]
    pub fn supports_ordinal(&self) -> bool {
        self.ordinal_prefix.is_some()
    }

    #[must_use]
    pub fn ordinal_prefix(&self) -> &'static str {
        self.ordinal_prefix.unwrap_or("")
    }

    /// Plain placeholder token, empty for ordinal dialects.
    #[must_use]
    pub fn placeholder(&self) -> &'static str {
        self.placeholder
    }

    #[must_use]
    pub fn named_prefix(&self) -> &'static str {
        self.named_prefix
    }

    /// Runes that carry wildcard meaning inside `LIKE` patterns.
    #[must_use]
    pub fn wildcard_runes(&self) -> &'static [char] {
        self.wildcards
    }

    #[must_use]
    pub fn is_wildcard(&self, c: char) -> bool {
        self.wildcards.contains(&c)
    }

    /// Whether repeated references can point back at an earlier argument.
    #[must_use]
    pub fn reuses_arguments(&self, mode: BindMode) -> bool {
        mode == BindMode::Named || self.supports_ordinal()
    }

    /// Render the placeholder for argument `name` bound at 1-based `index`.
    #[must_use]
    pub fn placeholder_for(&self, mode: BindMode, name: &str, index: usize) -> String {
        match (mode, self.ordinal_prefix) {
            (BindMode::Named, _) => format!("{}{name}", self.named_prefix),
            (BindMode::Positional, Some(prefix)) => format!("{prefix}{index}"),
            (BindMode::Positional, None) => self.placeholder.to_string(),
        }
    }
}

impl Default for Dialect {
    fn default() -> Self {
        Dialect::POSTGRES
    }
}

impl fmt::Display for Dialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name)
    }
}

/// The built-in dialects, selectable from command-line flags or config files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DialectKind {
    /// `PostgreSQL`
    Postgres,
    /// `MySQL` / `MariaDB`
    Mysql,
    /// Oracle
    Oracle,
    /// SQL Server
    Sqlserver,
}

impl DialectKind {
    #[must_use]
    pub fn dialect(self) -> Dialect {
        match self {
            DialectKind::Postgres => Dialect::POSTGRES,
            DialectKind::Mysql => Dialect::MYSQL,
            DialectKind::Oracle => Dialect::ORACLE,
            DialectKind::Sqlserver => Dialect::SQL_SERVER,
        }
    }
}

impl From<DialectKind> for Dialect {
    fn from(kind: DialectKind) -> Self {
        kind.dialect()
    }
}

impl fmt::Display for DialectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.dialect().name())
    }
}

impl FromStr for DialectKind {
    type Err = SqlTemplateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        <DialectKind as ValueEnum>::from_str(s, true)
            .map_err(|_| SqlTemplateError::ParameterError(format!("unknown dialect: {s}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn positional_placeholders() {
        assert_eq!(Dialect::POSTGRES.placeholder_for(BindMode::Positional, "id", 1), "$1");
        assert_eq!(Dialect::MYSQL.placeholder_for(BindMode::Positional, "id", 3), "?");
        assert_eq!(Dialect::ORACLE.placeholder_for(BindMode::Positional, "id", 2), ":2");
        assert_eq!(Dialect::SQL_SERVER.placeholder_for(BindMode::Positional, "id", 4), "@p4");
    }

    #[test]
    fn named_placeholders() {
        assert_eq!(Dialect::POSTGRES.placeholder_for(BindMode::Named, "id", 1), ":id");
        assert_eq!(Dialect::MYSQL.placeholder_for(BindMode::Named, "id", 1), ":id");
        assert_eq!(Dialect::ORACLE.placeholder_for(BindMode::Named, "id", 1), ":id");
        assert_eq!(Dialect::SQL_SERVER.placeholder_for(BindMode::Named, "id", 1), "@id");
    }

    #[test]
    fn argument_reuse() {
        assert!(Dialect::POSTGRES.reuses_arguments(BindMode::Positional));
        assert!(!Dialect::MYSQL.reuses_arguments(BindMode::Positional));
        assert!(Dialect::MYSQL.reuses_arguments(BindMode::Named));
    }

    #[test]
    fn wildcards() {
        assert!(Dialect::ORACLE.is_wildcard('％'));
        assert!(!Dialect::POSTGRES.is_wildcard('％'));
        assert!(Dialect::SQL_SERVER.is_wildcard('['));
        assert!(!Dialect::MYSQL.is_wildcard('['));
    }

    #[test]
    fn kind_parsing() {
        assert_eq!("Postgres".parse::<DialectKind>().unwrap(), DialectKind::Postgres);
        assert_eq!("sqlserver".parse::<DialectKind>().unwrap(), DialectKind::Sqlserver);
        assert!("db2".parse::<DialectKind>().is_err());
        assert_eq!(Dialect::from(DialectKind::Mysql), Dialect::MYSQL);
        assert_eq!(DialectKind::Oracle.to_string(), "oracle");
    }
}
