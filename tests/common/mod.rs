#![allow(dead_code)]

use std::cell::{Cell, RefCell};

use sql_tx_scope::prelude::*;
use sql_tx_scope::{ConnectOptions, NativeHandle, ResultState, SqlField, SqlIndex};

/// Counters shared by a mock driver and every cursor it creates.
#[derive(Debug, Default)]
pub struct MockLog {
    pub begins: Cell<usize>,
    pub commits: Cell<usize>,
    pub rollbacks: Cell<usize>,
    pub next_result_calls: Cell<usize>,
    pub statements: RefCell<Vec<String>>,
}

fn bump(counter: &Cell<usize>) {
    counter.set(counter.get() + 1);
}

/// How a mock cursor fails row fetches.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchFault {
    #[default]
    None,
    /// Refuse the fetch without recording an error.
    Silent,
    /// Refuse the fetch with an I/O error, as an engine losing its file would.
    Engine,
}

pub const IO_ERROR: &str = "disk I/O error";

/// Knobs for how the mock driver behaves.
#[derive(Debug, Clone)]
pub struct MockBehavior {
    pub supports_transactions: bool,
    pub begin_ok: bool,
    pub commit_ok: bool,
    pub rollback_ok: bool,
    pub fail_statements: bool,
    pub fetch_fault: FetchFault,
}

impl Default for MockBehavior {
    fn default() -> Self {
        Self {
            supports_transactions: true,
            begin_ok: true,
            commit_ok: true,
            rollback_ok: true,
            fail_statements: false,
            fetch_fault: FetchFault::None,
        }
    }
}

pub struct MockDriver {
    pub log: MockLog,
    pub behavior: RefCell<MockBehavior>,
    last_error: RefCell<SqlError>,
}

impl MockDriver {
    fn transition(&self, ok: bool, counter: &Cell<usize>, text: &str) -> bool {
        bump(counter);
        if ok {
            *self.last_error.borrow_mut() = SqlError::none();
        } else {
            *self.last_error.borrow_mut() =
                SqlError::new(text, "database is locked", ErrorKind::TransactionError)
                    .with_native_code("5");
        }
        ok
    }
}

impl Driver for MockDriver {
    fn create_result(&self) -> Box<dyn SqlResult + '_> {
        let behavior = self.behavior.borrow();
        let result = MockResult::new(&self.log, behavior.fail_statements);
        Box::new(result.with_fetch_fault(behavior.fetch_fault))
    }

    fn has_feature(&self, feature: DriverFeature) -> bool {
        match feature {
            DriverFeature::Transactions => self.behavior.borrow().supports_transactions,
            DriverFeature::EventNotifications => false,
            _ => true,
        }
    }

    fn open(&self, _options: &ConnectOptions) -> Result<bool, SqlTxError> {
        Ok(true)
    }

    fn close(&self) -> Result<(), SqlTxError> {
        Ok(())
    }

    fn is_open(&self) -> bool {
        true
    }

    fn last_error(&self) -> SqlError {
        self.last_error.borrow().clone()
    }

    fn begin_transaction(&self) -> bool {
        let ok = self.behavior.borrow().begin_ok;
        self.transition(ok, &self.log.begins, "Unable to begin transaction")
    }

    fn commit_transaction(&self) -> bool {
        let ok = self.behavior.borrow().commit_ok;
        self.transition(ok, &self.log.commits, "Unable to commit transaction")
    }

    fn rollback_transaction(&self) -> bool {
        let ok = self.behavior.borrow().rollback_ok;
        self.transition(ok, &self.log.rollbacks, "Unable to rollback transaction")
    }

    fn tables(&self, _table_type: TableType) -> Vec<String> {
        vec!["t".to_owned()]
    }

    fn primary_index(&self, table_name: &str) -> SqlIndex {
        let mut index = SqlIndex::new(table_name, "pk");
        index.append(SqlField::new("id"), false);
        index
    }

    fn record(&self, _table_name: &str) -> SqlRecord {
        SqlRecord::from_fields(vec![SqlField::new("id"), SqlField::new("name")])
    }

    fn handle(&self) -> NativeHandle {
        NativeHandle::new("mock_db", 0x1000)
    }

    fn escape_identifier(&self, identifier: &str, _kind: sql_tx_scope::IdentifierType) -> String {
        format!("[{identifier}]")
    }
}

pub struct MockDatabase {
    pub driver: MockDriver,
}

impl MockDatabase {
    pub fn new() -> Self {
        Self::with_behavior(MockBehavior::default())
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            driver: MockDriver {
                log: MockLog::default(),
                behavior: RefCell::new(behavior),
                last_error: RefCell::new(SqlError::none()),
            },
        }
    }

    pub fn log(&self) -> &MockLog {
        &self.driver.log
    }

    pub fn set_commit_ok(&self, ok: bool) {
        self.driver.behavior.borrow_mut().commit_ok = ok;
    }
}

impl Database for MockDatabase {
    fn driver(&self) -> &dyn Driver {
        &self.driver
    }
}

pub const SYNTAX_ERROR: &str = "near \"SELEKT\": syntax error";

/// Cursor serving two fixed rows for any statement that starts with SELECT.
pub struct MockResult<'a> {
    log: &'a MockLog,
    state: ResultState,
    fail_statements: bool,
    fetch_fault: FetchFault,
    rows: Vec<Vec<RowValues>>,
}

impl<'a> MockResult<'a> {
    pub fn new(log: &'a MockLog, fail_statements: bool) -> Self {
        Self {
            log,
            state: ResultState::new(),
            fail_statements,
            fetch_fault: FetchFault::None,
            rows: Vec::new(),
        }
    }

    pub fn with_fetch_fault(mut self, fault: FetchFault) -> Self {
        self.fetch_fault = fault;
        self
    }

    fn current(&self) -> Option<&Vec<RowValues>> {
        usize::try_from(self.state.at())
            .ok()
            .and_then(|at| self.rows.get(at))
    }

    fn statement_error(&mut self) -> Result<bool, SqlTxError> {
        self.state.set_last_error(
            SqlError::new(
                "Unable to execute statement",
                SYNTAX_ERROR,
                ErrorKind::StatementError,
            )
            .with_native_code("1"),
        );
        self.state.set_active(false);
        Ok(false)
    }

    fn row_count(&self) -> i64 {
        i64::try_from(self.rows.len()).unwrap_or(i64::MAX)
    }
}

impl SqlResult for MockResult<'_> {
    fn state(&self) -> &ResultState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ResultState {
        &mut self.state
    }

    fn data(&self, index: usize) -> RowValues {
        self.current()
            .and_then(|row| row.get(index))
            .cloned()
            .unwrap_or_default()
    }

    fn is_null(&self, index: usize) -> bool {
        self.data(index).is_null()
    }

    fn size(&self) -> i64 {
        if self.state.is_select() {
            self.row_count()
        } else {
            -1
        }
    }

    fn num_rows_affected(&self) -> i64 {
        if self.state.is_active() && !self.state.is_select() {
            1
        } else {
            -1
        }
    }

    fn record(&self) -> SqlRecord {
        let names = vec!["id".to_owned(), "name".to_owned()];
        SqlRecord::from_row(&names, self.current().map_or(&[][..], Vec::as_slice))
    }

    fn last_insert_id(&self) -> RowValues {
        RowValues::Int(42)
    }

    fn handle(&self) -> NativeHandle {
        NativeHandle::new("mock_stmt", 7)
    }

    fn reset(&mut self, query: &str) -> Result<bool, SqlTxError> {
        self.log.statements.borrow_mut().push(query.to_owned());
        self.state.set_query(query);
        if self.fail_statements || query.starts_with("SELEKT") {
            return self.statement_error();
        }
        let select = query.to_ascii_uppercase().starts_with("SELECT");
        self.rows = if select {
            vec![
                vec![RowValues::Int(1), RowValues::Text("alpha".into())],
                vec![RowValues::Int(2), RowValues::Null],
            ]
        } else {
            Vec::new()
        };
        self.state.set_select(select);
        self.state.set_active(true);
        Ok(true)
    }

    fn fetch(&mut self, index: i64) -> Result<bool, SqlTxError> {
        if !self.state.is_active() || index < 0 || index >= self.row_count() {
            return Ok(false);
        }
        match self.fetch_fault {
            FetchFault::None => {}
            FetchFault::Silent => return Ok(false),
            FetchFault::Engine => {
                self.state.set_last_error(
                    SqlError::new("Unable to fetch row", IO_ERROR, ErrorKind::StatementError)
                        .with_native_code("10"),
                );
                return Ok(false);
            }
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

    fn exec(&mut self) -> Result<bool, SqlTxError> {
        let query = self.state.query().to_owned();
        self.reset(&query)
    }

    fn next_result(&mut self) -> Result<bool, SqlTxError> {
        bump(&self.log.next_result_calls);
        Ok(false)
    }
}
