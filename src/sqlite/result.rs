use std::sync::Arc;

use rusqlite::{Connection, Statement};
use tracing::debug;

use crate::driver::Driver;
use crate::error::{ErrorKind, SqlError, SqlTxError};
use crate::record::SqlRecord;
use crate::result::{BoundValue, ResultState, SqlResult};
use crate::types::{NativeHandle, NumericalPrecisionPolicy, RowValues};

use super::connection::{SqliteDriver, sql_error};
use super::params::{bind_all, sqlite_extract_value};

/// What one statement run produced.
enum Outcome {
    Rows {
        columns: Vec<String>,
        rows: Vec<Vec<RowValues>>,
    },
    Changed {
        rows_affected: usize,
        last_insert_id: i64,
    },
}

/// Bind, step and materialize a prepared statement.
fn run_statement(
    conn: &Connection,
    stmt: &mut Statement<'_>,
    bound: &Bindings,
    policy: NumericalPrecisionPolicy,
) -> rusqlite::Result<Outcome> {
    bind_all(stmt, &bound.positional, &bound.named)?;
    let column_count = stmt.column_count();
    if column_count == 0 {
        let rows_affected = stmt.raw_execute()?;
        return Ok(Outcome::Changed {
            rows_affected,
            last_insert_id: conn.last_insert_rowid(),
        });
    }

    let columns: Vec<String> = stmt.column_names().iter().map(|c| (*c).to_string()).collect();
    let mut rows = Vec::new();
    let mut cursor = stmt.raw_query();
    while let Some(row) = cursor.next()? {
        let mut values = Vec::with_capacity(column_count);
        for idx in 0..column_count {
            values.push(sqlite_extract_value(row, idx, policy)?);
        }
        rows.push(values);
    }
    Ok(Outcome::Rows { columns, rows })
}

/// Positional and named values for one statement run.
struct Bindings {
    positional: Vec<BoundValue>,
    named: Vec<BoundValue>,
}

impl Bindings {
    fn of(state: &ResultState) -> Self {
        Self {
            positional: state.bound_values().to_vec(),
            named: state.named_bound_values().to_vec(),
        }
    }

    fn iter(&self) -> impl Iterator<Item = &BoundValue> {
        self.positional.iter().chain(&self.named)
    }

    /// Row `i` of every list binding. Scalars repeat.
    fn row(&self, i: usize) -> Self {
        let pick = |b: &BoundValue| match b.value().as_list() {
            Some(list) => b.with_value(list[i].clone()),
            None => b.clone(),
        };
        Self {
            positional: self.positional.iter().map(pick).collect(),
            named: self.named.iter().map(pick).collect(),
        }
    }
}

/// Expand list bindings into one binding set per batch row.
fn batch_rows(bound: &Bindings) -> Result<Vec<Bindings>, SqlError> {
    let mut len: Option<usize> = None;
    for b in bound.iter() {
        if let Some(list) = b.value().as_list() {
            match len {
                Some(n) if n != list.len() => {
                    return Err(SqlError::new(
                        "Parameter lists for batch execution differ in length",
                        "",
                        ErrorKind::StatementError,
                    ));
                }
                _ => len = Some(list.len()),
            }
        }
    }
    let Some(len) = len else {
        return Err(SqlError::new(
            "Batch execution needs at least one list binding",
            "",
            ErrorKind::StatementError,
        ));
    };
    Ok((0..len).map(|i| bound.row(i)).collect())
}

/// Native `SQLite` cursor. Select results are read fully into memory when the
/// statement runs, so every row is addressable afterwards.
pub struct SqliteResult<'a> {
    driver: &'a SqliteDriver,
    state: ResultState,
    columns: Arc<Vec<String>>,
    rows: Vec<Vec<RowValues>>,
    rows_affected: i64,
    last_insert_id: i64,
}

impl<'a> SqliteResult<'a> {
    #[must_use]
    pub fn new(driver: &'a SqliteDriver) -> Self {
        Self {
            driver,
            state: ResultState::new(),
            columns: Arc::new(Vec::new()),
            rows: Vec::new(),
            rows_affected: -1,
            last_insert_id: 0,
        }
    }

    fn clear_results(&mut self) {
        self.columns = Arc::new(Vec::new());
        self.rows.clear();
        self.rows_affected = -1;
        self.last_insert_id = 0;
    }

    fn fail(&mut self, error: SqlError) -> Result<bool, SqlTxError> {
        debug!(query = self.state.query(), error = %error, "sqlite statement failed");
        self.state.set_last_error(error);
        self.state.set_active(false);
        Ok(false)
    }

    fn apply(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Rows { columns, rows } => {
                self.columns = Arc::new(columns);
                self.rows = rows;
                self.state.set_select(true);
            }
            Outcome::Changed {
                rows_affected,
                last_insert_id,
            } => {
                self.rows_affected = i64::try_from(rows_affected).unwrap_or(i64::MAX);
                self.last_insert_id = last_insert_id;
                self.state.set_select(false);
            }
        }
        self.state.set_active(true);
    }

    /// Run the current query text with the current bindings.
    fn execute_current(&mut self) -> Result<bool, SqlTxError> {
        self.clear_results();
        let sql = self.state.query().to_owned();
        let bound = Bindings::of(&self.state);
        let policy = self.state.numerical_precision_policy();

        let outcome = {
            let driver = self.driver;
            let guard = driver.conn.borrow();
            let Some(conn) = guard.as_ref() else {
                return self.fail(SqliteDriver::not_open());
            };
            conn.prepare(&sql)
                .and_then(|mut stmt| run_statement(conn, &mut stmt, &bound, policy))
        };

        match outcome {
            Ok(outcome) => {
                self.apply(outcome);
                Ok(true)
            }
            Err(err) => self.fail(sql_error(
                &err,
                "Unable to execute statement",
                ErrorKind::StatementError,
            )),
        }
    }

    fn row_count(&self) -> i64 {
        i64::try_from(self.rows.len()).unwrap_or(i64::MAX)
    }

    fn current_row(&self) -> Option<&Vec<RowValues>> {
        usize::try_from(self.state.at())
            .ok()
            .and_then(|at| self.rows.get(at))
    }
}

impl SqlResult for SqliteResult<'_> {
    fn state(&self) -> &ResultState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ResultState {
        &mut self.state
    }

    fn detach_from_result_set(&mut self) {
        self.rows.clear();
    }

    fn data(&self, index: usize) -> RowValues {
        self.current_row()
            .and_then(|row| row.get(index))
            .cloned()
            .unwrap_or_default()
    }

    fn is_null(&self, index: usize) -> bool {
        self.current_row()
            .and_then(|row| row.get(index))
            .is_none_or(RowValues::is_null)
    }

    fn size(&self) -> i64 {
        if self.state.is_select() {
            self.row_count()
        } else {
            -1
        }
    }

    fn num_rows_affected(&self) -> i64 {
        self.rows_affected
    }

    fn record(&self) -> SqlRecord {
        let values = self.current_row().map_or(&[][..], Vec::as_slice);
        SqlRecord::from_row(&self.columns, values)
    }

    fn last_insert_id(&self) -> RowValues {
        if self.state.is_active() && self.last_insert_id != 0 {
            RowValues::Int(self.last_insert_id)
        } else {
            RowValues::Null
        }
    }

    fn handle(&self) -> NativeHandle {
        if self.state.is_active() {
            NativeHandle::of("sqlite3_stmt", &self.rows)
        } else {
            NativeHandle::none()
        }
    }

    fn reset(&mut self, query: &str) -> Result<bool, SqlTxError> {
        self.state.set_query(query);
        self.execute_current()
    }

    fn fetch(&mut self, index: i64) -> Result<bool, SqlTxError> {
        if !self.state.is_active() || !self.state.is_select() {
            return Ok(false);
        }
        // Closing the connection invalidates its statements.
        if !self.driver.is_open() {
            self.state.set_last_error(SqliteDriver::not_open());
            return Ok(false);
        }
        if self.state.is_forward_only() && index < self.state.at() {
            self.state.set_last_error(SqlError::new(
                "Cannot fetch backwards on a forward-only result",
                "",
                ErrorKind::StatementError,
            ));
            return Ok(false);
        }
        if index < 0 || index >= self.row_count() {
            return Ok(false);
        }
        self.state.set_at(index);
        Ok(true)
    }

    fn fetch_first(&mut self) -> Result<bool, SqlTxError> {
        self.fetch(0)
    }

    fn fetch_last(&mut self) -> Result<bool, SqlTxError> {
        let last = self.row_count() - 1;
        self.fetch(last)
    }

    fn prepare(&mut self, query: &str) -> Result<bool, SqlTxError> {
        self.clear_results();
        self.state.set_query(query);
        let checked = {
            let driver = self.driver;
            let guard = driver.conn.borrow();
            match guard.as_ref() {
                Some(conn) => conn.prepare(query).map(|stmt| stmt.column_count() > 0),
                None => {
                    return self.fail(SqliteDriver::not_open());
                }
            }
        };
        match checked {
            Ok(select) => {
                self.state.set_select(select);
                Ok(true)
            }
            Err(err) => self.fail(sql_error(
                &err,
                "Unable to prepare statement",
                ErrorKind::StatementError,
            )),
        }
    }

    fn exec(&mut self) -> Result<bool, SqlTxError> {
        self.execute_current()
    }

    fn exec_batch(&mut self, array_bind: bool) -> Result<bool, SqlTxError> {
        let _ = array_bind;
        self.clear_results();
        let batches = match batch_rows(&Bindings::of(&self.state)) {
            Ok(batches) => batches,
            Err(error) => return self.fail(error),
        };
        let sql = self.state.query().to_owned();
        let policy = self.state.numerical_precision_policy();

        let outcome = {
            let driver = self.driver;
            let guard = driver.conn.borrow();
            let Some(conn) = guard.as_ref() else {
                return self.fail(SqliteDriver::not_open());
            };
            conn.prepare(&sql).and_then(|mut stmt| {
                let mut total = 0usize;
                let mut last_insert_id = 0;
                for bound in &batches {
                    stmt.clear_bindings();
                    if let Outcome::Changed {
                        rows_affected,
                        last_insert_id: id,
                    } = run_statement(conn, &mut stmt, bound, policy)?
                    {
                        total += rows_affected;
                        last_insert_id = id;
                    }
                }
                Ok(Outcome::Changed {
                    rows_affected: total,
                    last_insert_id,
                })
            })
        };

        match outcome {
            Ok(outcome) => {
                self.apply(outcome);
                Ok(true)
            }
            Err(err) => self.fail(sql_error(
                &err,
                "Unable to execute batch statement",
                ErrorKind::StatementError,
            )),
        }
    }
}
