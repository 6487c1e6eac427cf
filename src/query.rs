use tracing::warn;

use crate::error::{ErrorKind, SqlError, SqlTxError, StatementFailure};
use crate::record::SqlRecord;
use crate::result::{BoundValue, SqlResult};
use crate::types::{
    AFTER_LAST_ROW, BEFORE_FIRST_ROW, BatchExecutionMode, NumericalPrecisionPolicy, ParamType,
    RowValues,
};

/// A statement handle driving one result cursor.
///
/// Obtained from [`TransactionScope::query`](crate::TransactionScope::query),
/// where the cursor is a [`ResultProxy`](crate::ResultProxy) and every failure
/// comes back as `Err`. Navigation returns `Ok(false)` without touching the
/// cursor when its known size rules the row out; a fetch the cursor itself
/// refuses is an error.
pub struct Query<'s> {
    result: Box<dyn SqlResult + 's>,
}

impl<'s> Query<'s> {
    #[must_use]
    pub fn new(result: Box<dyn SqlResult + 's>) -> Self {
        Self { result }
    }

    /// The cursor behind this handle.
    #[must_use]
    pub fn result(&self) -> &(dyn SqlResult + 's) {
        self.result.as_ref()
    }

    fn clear_for_statement(&mut self) {
        self.result.set_active(false);
        self.result.set_last_error(SqlError::none());
        self.result.set_at(BEFORE_FIRST_ROW);
        let policy = self.result.numerical_precision_policy();
        self.result.set_numerical_precision_policy(policy);
    }

    /// Execute `sql` directly.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if `sql` is empty or the cursor fails to run it.
    pub fn exec(&mut self, sql: &str) -> Result<bool, SqlTxError> {
        self.clear_for_statement();
        let sql = sql.trim();
        self.result.set_query(sql);
        if sql.is_empty() {
            let error =
                SqlError::new("Unable to execute empty query", "", ErrorKind::StatementError);
            self.result.set_last_error(error.clone());
            return Err(SqlTxError::QueryError(StatementFailure::new(error, sql)));
        }
        self.result.reset(sql)
    }

    /// Prepare `sql` for execution with bound values. Previous bindings are dropped.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if the statement cannot be prepared.
    pub fn prepare(&mut self, sql: &str) -> Result<bool, SqlTxError> {
        self.clear_for_statement();
        self.result.clear_bound_values();
        self.result.save_prepare(sql)
    }

    /// Execute the prepared statement with the current bindings.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if execution fails.
    pub fn exec_prepared(&mut self) -> Result<bool, SqlTxError> {
        self.result.reset_bind_count();
        if self.result.last_error().is_valid() {
            self.result.set_last_error(SqlError::none());
        }
        self.result.exec()
    }

    /// Execute the prepared statement once per element of the bound lists.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if any batch row fails.
    pub fn exec_batch(&mut self, mode: BatchExecutionMode) -> Result<bool, SqlTxError> {
        self.result.reset_bind_count();
        self.result.exec_batch(mode == BatchExecutionMode::ValuesAsColumns)
    }

    pub fn bind_value(&mut self, pos: usize, value: impl Into<RowValues>) {
        self.result.bind_value(pos, value.into(), ParamType::In);
    }

    pub fn bind_value_named(&mut self, placeholder: &str, value: impl Into<RowValues>) {
        self.result.bind_value_named(placeholder, value.into(), ParamType::In);
    }

    /// Bind to the next positional placeholder.
    pub fn add_bind_value(&mut self, value: impl Into<RowValues>) {
        self.result.add_bind_value(value.into(), ParamType::In);
    }

    #[must_use]
    pub fn bound_value(&self, pos: usize) -> Option<&RowValues> {
        self.result.bound_values().get(pos).map(BoundValue::value)
    }

    #[must_use]
    pub fn bound_value_named(&self, placeholder: &str) -> Option<&RowValues> {
        self.result
            .named_bound_values()
            .iter()
            .find(|b| b.placeholder() == Some(placeholder))
            .map(BoundValue::value)
    }

    /// Positional bindings only; see [`named_bound_values`](Self::named_bound_values).
    #[must_use]
    pub fn bound_values(&self) -> &[BoundValue] {
        self.result.bound_values()
    }

    #[must_use]
    pub fn named_bound_values(&self) -> &[BoundValue] {
        self.result.named_bound_values()
    }

    fn navigable(&self) -> bool {
        self.result.is_select() && self.result.is_active()
    }

    /// `false` when the cursor knows its size and row `target` lies outside it.
    fn row_exists(&self, target: i64) -> bool {
        let size = self.result.size();
        target >= 0 && (size < 0 || target < size)
    }

    /// Index of the last row, if the cursor knows its size.
    fn last_index(&self) -> Option<i64> {
        let size = self.result.size();
        (size >= 0).then(|| size - 1)
    }

    /// Fetch row `target`, or park at `park` without fetching when no such row
    /// can exist. `None` means the cursor alone can tell.
    fn fetch_with(
        &mut self,
        target: Option<i64>,
        park: i64,
        fetch: impl FnOnce(&mut (dyn SqlResult + 's)) -> Result<bool, SqlTxError>,
    ) -> Result<bool, SqlTxError> {
        if target.is_some_and(|t| !self.row_exists(t)) {
            self.result.set_at(park);
            return Ok(false);
        }
        let found = fetch(self.result.as_mut())?;
        if !found {
            self.result.set_at(park);
        }
        Ok(found)
    }

    /// Advance to the next row.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor fails the fetch.
    #[allow(clippy::should_implement_trait)]
    pub fn next(&mut self) -> Result<bool, SqlTxError> {
        if !self.navigable() {
            return Ok(false);
        }
        match self.result.at() {
            BEFORE_FIRST_ROW => self.fetch_with(Some(0), AFTER_LAST_ROW, |r| r.fetch_first()),
            AFTER_LAST_ROW => Ok(false),
            at => {
                let target = Some(at.saturating_add(1));
                self.fetch_with(target, AFTER_LAST_ROW, |r| r.fetch_next())
            }
        }
    }

    /// Step back one row. Not available on forward-only cursors.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor fails the fetch.
    pub fn previous(&mut self) -> Result<bool, SqlTxError> {
        if !self.navigable() {
            return Ok(false);
        }
        if self.result.is_forward_only() {
            warn!("previous() called on a forward-only query");
            return Ok(false);
        }
        match self.result.at() {
            BEFORE_FIRST_ROW => Ok(false),
            AFTER_LAST_ROW => {
                let target = self.last_index();
                self.fetch_with(target, BEFORE_FIRST_ROW, |r| r.fetch_last())
            }
            at => self.fetch_with(Some(at - 1), BEFORE_FIRST_ROW, |r| r.fetch_previous()),
        }
    }

    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor fails the fetch.
    pub fn first(&mut self) -> Result<bool, SqlTxError> {
        if !self.navigable() {
            return Ok(false);
        }
        if self.result.is_forward_only() && self.result.at() > 0 {
            warn!("first() called on a forward-only query past its first row");
            return Ok(false);
        }
        self.fetch_with(Some(0), BEFORE_FIRST_ROW, |r| r.fetch_first())
    }

    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor fails the fetch.
    pub fn last(&mut self) -> Result<bool, SqlTxError> {
        if !self.navigable() {
            return Ok(false);
        }
        let target = self.last_index();
        self.fetch_with(target, AFTER_LAST_ROW, |r| r.fetch_last())
    }

    /// Position on row `index`, absolute or relative to the current row.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor fails the fetch.
    pub fn seek(&mut self, index: i64, relative: bool) -> Result<bool, SqlTxError> {
        if !self.navigable() {
            return Ok(false);
        }
        let target = if relative {
            match self.result.at() {
                BEFORE_FIRST_ROW if index > 0 => index - 1,
                BEFORE_FIRST_ROW | AFTER_LAST_ROW => return Ok(false),
                at => {
                    let Some(target) = at.checked_add(index) else {
                        self.result.set_at(AFTER_LAST_ROW);
                        return Ok(false);
                    };
                    target
                }
            }
        } else {
            index
        };
        if target < 0 {
            self.result.set_at(BEFORE_FIRST_ROW);
            return Ok(false);
        }
        if self.result.is_forward_only() && target < self.result.at() {
            warn!(target, "seek() backwards on a forward-only query");
            return Ok(false);
        }
        self.fetch_with(Some(target), AFTER_LAST_ROW, |r| r.fetch(target))
    }

    /// Value of column `index` in the current row; NULL when not on a row.
    #[must_use]
    pub fn value(&self, index: usize) -> RowValues {
        if self.result.is_active() && self.result.is_valid() {
            return self.result.data(index);
        }
        warn!(index, "value() called while not positioned on a valid row");
        RowValues::Null
    }

    /// Value of the column named `name` in the current row.
    #[must_use]
    pub fn value_by_name(&self, name: &str) -> RowValues {
        match self.result.record().index_of(name) {
            Some(index) => self.value(index),
            None => {
                warn!(name, "value_by_name() called with an unknown column");
                RowValues::Null
            }
        }
    }

    #[must_use]
    pub fn is_null(&self, index: usize) -> bool {
        !(self.result.is_active() && self.result.is_valid()) || self.result.is_null(index)
    }

    #[must_use]
    pub fn record(&self) -> SqlRecord {
        self.result.record()
    }

    #[must_use]
    pub fn size(&self) -> i64 {
        if self.result.is_active() {
            self.result.size()
        } else {
            -1
        }
    }

    #[must_use]
    pub fn num_rows_affected(&self) -> i64 {
        if self.result.is_active() {
            self.result.num_rows_affected()
        } else {
            -1
        }
    }

    #[must_use]
    pub fn last_insert_id(&self) -> RowValues {
        self.result.last_insert_id()
    }

    #[must_use]
    pub fn last_error(&self) -> SqlError {
        self.result.last_error()
    }

    #[must_use]
    pub fn last_query(&self) -> &str {
        self.result.last_query()
    }

    #[must_use]
    pub fn at(&self) -> i64 {
        self.result.at()
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.result.is_active()
    }

    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.result.is_valid()
    }

    #[must_use]
    pub fn is_select(&self) -> bool {
        self.result.is_select()
    }

    #[must_use]
    pub fn is_forward_only(&self) -> bool {
        self.result.is_forward_only()
    }

    /// Only takes effect before the next statement runs.
    pub fn set_forward_only(&mut self, forward_only: bool) {
        if self.result.is_active() {
            warn!("set_forward_only() ignored on an active query");
            return;
        }
        self.result.set_forward_only(forward_only);
    }

    pub fn set_numerical_precision_policy(&mut self, policy: NumericalPrecisionPolicy) {
        self.result.set_numerical_precision_policy(policy);
    }

    /// Release the result set; the handle can run another statement afterwards.
    pub fn finish(&mut self) {
        if self.result.is_active() {
            self.result.set_last_error(SqlError::none());
            self.result.set_at(BEFORE_FIRST_ROW);
            self.result.detach_from_result_set();
            self.result.set_active(false);
        }
    }

    /// Move to the next result set of a multi-result statement.
    ///
    /// # Errors
    /// Returns `SqlTxError::QueryError` if the cursor has no further result
    /// set or fails to move to it.
    pub fn next_result(&mut self) -> Result<bool, SqlTxError> {
        if !self.result.is_active() {
            return Ok(false);
        }
        self.result.next_result()
    }
}
