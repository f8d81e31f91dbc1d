//! SQL text for PostgreSQL provisioning
//!
//! DDL statements cannot take bind parameters, so identifiers and literals
//! are escaped here before being formatted into statements.

use chrono::{DateTime, Utc};

/// Prefix of databases renamed by a production delete
pub const DELETED_PREFIX: &str = "DELETED";

/// Replace characters PostgreSQL identifiers cannot carry unquoted.
///
/// Resource names may contain `-` and `.`; both become `_`. This is lossy:
/// `my-db` and `my_db` map to the same database.
pub fn sanitize_identifier(name: &str) -> String {
    name.replace(['-', '.'], "_")
}

/// Quote a SQL identifier (database name, role name)
///
/// - `my_table` -> `"my_table"`
/// - `table"name` -> `"table""name"`
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

/// Escape a SQL string literal by doubling single quotes
pub fn escape_sql_string(s: &str) -> String {
    s.replace('\'', "''")
}

pub(crate) const ROLE_EXISTS: &str = "SELECT 1 FROM pg_roles WHERE rolname = $1";

pub(crate) const DATABASE_EXISTS: &str = "SELECT 1 FROM pg_database WHERE datname = $1";

pub fn create_role(role: &str, password: &str) -> String {
    format!(
        "CREATE ROLE {} LOGIN PASSWORD '{}'",
        quote_identifier(role),
        escape_sql_string(password)
    )
}

pub fn create_database(database: &str) -> String {
    format!("CREATE DATABASE {}", quote_identifier(database))
}

pub fn grant_all(database: &str, role: &str) -> String {
    format!(
        "GRANT ALL ON DATABASE {} TO {}",
        quote_identifier(database),
        quote_identifier(role)
    )
}

pub fn drop_database(database: &str) -> String {
    format!("DROP DATABASE IF EXISTS {}", quote_identifier(database))
}

pub fn rename_database(from: &str, to: &str) -> String {
    format!(
        "ALTER DATABASE {} RENAME TO {}",
        quote_identifier(from),
        quote_identifier(to)
    )
}

/// Name a production delete renames `database` to, e.g.
/// `DELETED_20240131T235959_orders`
pub fn deleted_database_name(database: &str, at: DateTime<Utc>) -> String {
    format!(
        "{}_{}_{}",
        DELETED_PREFIX,
        at.format("%Y%m%dT%H%M%S"),
        database
    )
}
