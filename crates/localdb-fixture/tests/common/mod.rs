//! In-memory SQL Server stand-in for deployment tests.
//!
//! Understands just enough T-SQL to exercise the deployment protocol:
//! `CREATE DATABASE`, `USE`, `CREATE TABLE` (including `REFERENCES`),
//! `SELECT * FROM`, `DELETE FROM` and `ALTER TABLE ... [NO]CHECK CONSTRAINT`.
//! Rows are only counted. Everything else succeeds silently.
//!
//! A `DELETE` from a referenced table fails with error 547 while a
//! referencing table still has rows and its constraints are enabled.

#![allow(dead_code, clippy::unwrap_used)]

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use localdb_fixture::error::{
    CANNOT_OPEN_DATABASE, OBJECT_ALREADY_EXISTS, OBJECT_NOT_FOUND,
};
use localdb_fixture::{Connection, Connector, Endpoint, Error, Result};
use once_cell::sync::Lazy;
use parking_lot::Mutex;
use regex::Regex;

static CREATE_DATABASE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*CREATE\s+DATABASE\s+\[?([^\]\s;]+)\]?").unwrap());
static USE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)^\s*USE\s+\[?([^\]\s;]+)\]?").unwrap());
static CREATE_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*CREATE\s+TABLE\s+([^\s(]+)").unwrap());
static SELECT_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*SELECT\s+\*\s+FROM\s+([^\s;]+)").unwrap());
static DELETE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*DELETE\s+FROM\s+([^\s;]+)").unwrap());
static ALTER_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^\s*ALTER\s+TABLE\s+([^\s;]+)\s").unwrap());
static REFERENCES_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\bREFERENCES\s+([^\s(]+)").unwrap());

/// SQL Server error 547: statement conflicted with a constraint.
pub const CONSTRAINT_CONFLICT: i32 = 547;

/// SQL Server error 18456: login failed.
pub const LOGIN_FAILED: i32 = 18456;

/// A statement the fake server received.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Executed {
    /// Database the connection was in when the batch arrived.
    pub database: String,
    /// Batch text.
    pub sql: String,
}

#[derive(Debug, Default)]
struct State {
    databases: HashSet<String>,
    tables: HashMap<String, Vec<String>>,
    executed: Vec<Executed>,
    connects: Vec<String>,
    refuse_connects: HashMap<String, u32>,
    unreachable: HashSet<String>,
    rejected_logins: HashSet<String>,
    failing: Vec<(String, i32)>,
    /// (database, referencing table, referenced table).
    references: Vec<(String, String, String)>,
    /// (database, table) pairs whose constraints are disabled.
    nocheck: HashSet<(String, String)>,
    rows: HashMap<(String, String), u32>,
}

impl State {
    fn delete_conflict(&self, database: &str, table: &str) -> Option<String> {
        if self.row_count(database, table) == 0 {
            return None;
        }
        self.references
            .iter()
            .filter(|(db, _, parent)| db == database && parent == table)
            .map(|(_, child, _)| child)
            .find(|child| {
                self.row_count(database, child) > 0
                    && !self
                        .nocheck
                        .contains(&(database.to_string(), (*child).clone()))
            })
            .cloned()
    }

    fn row_count(&self, database: &str, table: &str) -> u32 {
        self.rows
            .get(&(database.to_string(), table.to_string()))
            .copied()
            .unwrap_or(0)
    }
}

/// Shared fake server; clones observe the same state.
#[derive(Debug, Clone)]
pub struct FakeServer {
    state: Arc<Mutex<State>>,
}

impl Default for FakeServer {
    fn default() -> Self {
        let mut state = State::default();
        state.databases.insert("master".to_string());
        Self {
            state: Arc::new(Mutex::new(state)),
        }
    }
}

impl FakeServer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a database up front.
    pub fn with_database(self, name: &str) -> Self {
        self.state.lock().databases.insert(name.to_string());
        self
    }

    /// Refuse the next `times` connections to `database` with a connection error.
    pub fn refuse_connections(self, database: &str, times: u32) -> Self {
        self.state
            .lock()
            .refuse_connects
            .insert(database.to_string(), times);
        self
    }

    /// Refuse every connection to `database`.
    pub fn unreachable(self, database: &str) -> Self {
        self.state.lock().unreachable.insert(database.to_string());
        self
    }

    /// Fail every login to `database` with error 18456.
    pub fn reject_logins(self, database: &str) -> Self {
        self.state.lock().rejected_logins.insert(database.to_string());
        self
    }

    /// Put `count` rows into `table`.
    pub fn insert_rows(&self, database: &str, table: &str, count: u32) {
        *self
            .state
            .lock()
            .rows
            .entry((database.to_string(), table.to_string()))
            .or_default() += count;
    }

    pub fn row_count(&self, database: &str, table: &str) -> u32 {
        self.state.lock().row_count(database, table)
    }

    /// Whether `table` has its constraints disabled.
    pub fn constraints_disabled(&self, database: &str, table: &str) -> bool {
        self.state
            .lock()
            .nocheck
            .contains(&(database.to_string(), table.to_string()))
    }

    /// Fail any batch containing `needle` with server error `number`.
    pub fn fail_statements_containing(self, needle: &str, number: i32) -> Self {
        self.state.lock().failing.push((needle.to_string(), number));
        self
    }

    pub fn executed(&self) -> Vec<Executed> {
        self.state.lock().executed.clone()
    }

    pub fn executed_count(&self, needle: &str) -> usize {
        self.state
            .lock()
            .executed
            .iter()
            .filter(|e| e.sql.contains(needle))
            .count()
    }

    pub fn connects(&self) -> Vec<String> {
        self.state.lock().connects.clone()
    }

    pub fn has_database(&self, name: &str) -> bool {
        self.state.lock().databases.contains(name)
    }

    pub fn tables(&self, database: &str) -> Vec<String> {
        self.state
            .lock()
            .tables
            .get(database)
            .cloned()
            .unwrap_or_default()
    }
}

fn server_error(number: i32, message: impl Into<String>) -> Error {
    Error::Server {
        number,
        class: 16,
        message: message.into(),
    }
}

#[async_trait]
impl Connector for FakeServer {
    async fn connect(&self, endpoint: &Endpoint) -> Result<Box<dyn Connection>> {
        let mut state = self.state.lock();
        state.connects.push(endpoint.database.clone());

        if state.unreachable.contains(&endpoint.database) {
            return Err(Error::Connection("connection refused".into()));
        }
        if state.rejected_logins.contains(&endpoint.database) {
            return Err(server_error(LOGIN_FAILED, "Login failed for user 'sa'."));
        }
        if let Some(remaining) = state.refuse_connects.get_mut(&endpoint.database) {
            if *remaining > 0 {
                *remaining -= 1;
                return Err(Error::Connection("connection refused".into()));
            }
        }
        if !state.databases.contains(&endpoint.database) {
            return Err(server_error(
                CANNOT_OPEN_DATABASE,
                format!("Cannot open database \"{}\" requested by the login.", endpoint.database),
            ));
        }

        Ok(Box::new(FakeConnection {
            state: Arc::clone(&self.state),
            database: endpoint.database.clone(),
        }))
    }
}

struct FakeConnection {
    state: Arc<Mutex<State>>,
    database: String,
}

#[async_trait]
impl Connection for FakeConnection {
    async fn execute(&mut self, sql: &str) -> Result<()> {
        let mut state = self.state.lock();
        state.executed.push(Executed {
            database: self.database.clone(),
            sql: sql.to_string(),
        });

        if let Some((_, number)) = state.failing.iter().find(|(needle, _)| sql.contains(needle.as_str())) {
            return Err(server_error(*number, "statement failed"));
        }

        let mut created_table: Option<String> = None;
        for line in sql.lines() {
            if let Some(caps) = CREATE_DATABASE_RE.captures(line) {
                let name = caps[1].to_string();
                if !state.databases.insert(name.clone()) {
                    return Err(server_error(1801, format!("Database '{name}' already exists.")));
                }
            } else if let Some(caps) = USE_RE.captures(line) {
                let name = caps[1].to_string();
                if !state.databases.contains(&name) {
                    return Err(server_error(911, format!("Database '{name}' does not exist.")));
                }
                self.database = name;
            } else if let Some(caps) = CREATE_TABLE_RE.captures(line) {
                let table = caps[1].to_string();
                let tables = state.tables.entry(self.database.clone()).or_default();
                if tables.contains(&table) {
                    return Err(server_error(
                        OBJECT_ALREADY_EXISTS,
                        format!("There is already an object named '{table}' in the database."),
                    ));
                }
                tables.push(table.clone());
                created_table = Some(table);
            } else if let Some(caps) = SELECT_RE
                .captures(line)
                .or_else(|| DELETE_RE.captures(line))
                .or_else(|| ALTER_RE.captures(line))
            {
                let table = caps[1].to_string();
                let exists = state
                    .tables
                    .get(&self.database)
                    .is_some_and(|tables| tables.contains(&table));
                if !exists {
                    return Err(server_error(
                        OBJECT_NOT_FOUND,
                        format!("Invalid object name '{table}'."),
                    ));
                }

                let key = (self.database.clone(), table.clone());
                let upper = line.to_ascii_uppercase();
                if upper.contains("NOCHECK CONSTRAINT") {
                    state.nocheck.insert(key);
                } else if upper.contains("CHECK CONSTRAINT") {
                    state.nocheck.remove(&key);
                } else if DELETE_RE.is_match(line) {
                    if let Some(child) = state.delete_conflict(&self.database, &table) {
                        return Err(server_error(
                            CONSTRAINT_CONFLICT,
                            format!(
                                "The DELETE statement conflicted with the REFERENCE constraint \
                                 on table '{child}'."
                            ),
                        ));
                    }
                    state.rows.remove(&key);
                }
            }

            if let (Some(child), Some(caps)) = (&created_table, REFERENCES_RE.captures(line)) {
                let parent = caps[1].to_string();
                state
                    .references
                    .push((self.database.clone(), child.clone(), parent));
            }
        }

        Ok(())
    }
}
