use tracing::debug;

use crate::error::{SqlError, SqlTxError, StatementFailure};
use crate::record::SqlRecord;
use crate::result::{ResultState, SqlResult, base_next_result};
use crate::types::{NativeHandle, NumericalPrecisionPolicy, ParamType, RowValues};

/// Cursor wrapper that turns every `Ok(false)` from the wrapped cursor into a
/// [`SqlTxError::QueryError`].
///
/// State mutators are applied to the wrapped cursor and to the proxy's own
/// [`ResultState`], so both report the same position, query text and bindings.
/// Data accessors are plain pass-through.
pub struct ResultProxy<'a> {
    wrapped: Box<dyn SqlResult + 'a>,
    state: ResultState,
}

impl<'a> ResultProxy<'a> {
    /// Wrap a native cursor. The proxy starts from a copy of the cursor's state.
    #[must_use]
    pub fn new(wrapped: Box<dyn SqlResult + 'a>) -> Self {
        let state = wrapped.state().clone();
        Self { wrapped, state }
    }

    /// The wrapped native cursor.
    #[must_use]
    pub fn wrapped(&self) -> &(dyn SqlResult + 'a) {
        self.wrapped.as_ref()
    }

    #[must_use]
    pub fn into_inner(self) -> Box<dyn SqlResult + 'a> {
        self.wrapped
    }

    /// Native operations move the wrapped cursor on their own; pull its
    /// position and flags back so both sides agree.
    fn sync_from_wrapped(&mut self) {
        let inner = self.wrapped.state();
        self.state.set_at(inner.at());
        self.state.set_active(inner.is_active());
        self.state.set_select(inner.is_select());
        if !inner.query().is_empty() && inner.query() != self.state.query() {
            self.state.set_query(inner.query());
        }
    }

    fn return_or_raise(&mut self, succeeded: bool) -> Result<bool, SqlTxError> {
        self.sync_from_wrapped();
        let error = self.wrapped.last_error();
        self.set_last_error(error);
        if succeeded {
            return Ok(true);
        }
        let failure = StatementFailure::new(self.state.last_error().clone(), self.state.query());
        debug!(
            statement = failure.statement_text(),
            error = %failure.error(),
            "cursor reported failure"
        );
        Err(SqlTxError::QueryError(failure))
    }
}

impl SqlResult for ResultProxy<'_> {
    fn state(&self) -> &ResultState {
        &self.state
    }

    fn state_mut(&mut self) -> &mut ResultState {
        &mut self.state
    }

    fn set_at(&mut self, at: i64) {
        self.wrapped.set_at(at);
        self.state.set_at(at);
    }

    fn set_active(&mut self, active: bool) {
        self.wrapped.set_active(active);
        self.state.set_active(active);
    }

    fn set_last_error(&mut self, error: SqlError) {
        self.wrapped.set_last_error(error.clone());
        self.state.set_last_error(error);
    }

    fn set_query(&mut self, query: &str) {
        self.wrapped.set_query(query);
        self.state.set_query(query);
    }

    fn set_select(&mut self, select: bool) {
        self.wrapped.set_select(select);
        self.state.set_select(select);
    }

    fn set_forward_only(&mut self, forward_only: bool) {
        self.wrapped.set_forward_only(forward_only);
        self.state.set_forward_only(forward_only);
    }

    fn bind_value(&mut self, pos: usize, value: RowValues, param_type: ParamType) {
        self.wrapped.bind_value(pos, value.clone(), param_type);
        self.state.bind(pos, value, param_type);
    }

    fn bind_value_named(&mut self, placeholder: &str, value: RowValues, param_type: ParamType) {
        self.wrapped.bind_value_named(placeholder, value.clone(), param_type);
        self.state.bind_named(placeholder, value, param_type);
    }

    fn clear_bound_values(&mut self) {
        self.wrapped.clear_bound_values();
        self.state.clear_bound_values();
    }

    fn set_numerical_precision_policy(&mut self, policy: NumericalPrecisionPolicy) {
        self.wrapped.set_numerical_precision_policy(policy);
        self.state.set_numerical_precision_policy(policy);
    }

    fn detach_from_result_set(&mut self) {
        self.wrapped.detach_from_result_set();
    }

    fn data(&self, index: usize) -> RowValues {
        self.wrapped.data(index)
    }

    fn is_null(&self, index: usize) -> bool {
        self.wrapped.is_null(index)
    }

    fn size(&self) -> i64 {
        self.wrapped.size()
    }

    fn num_rows_affected(&self) -> i64 {
        self.wrapped.num_rows_affected()
    }

    fn record(&self) -> SqlRecord {
        self.wrapped.record()
    }

    fn last_insert_id(&self) -> RowValues {
        self.wrapped.last_insert_id()
    }

    fn handle(&self) -> NativeHandle {
        self.wrapped.handle()
    }

    fn reset(&mut self, query: &str) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.reset(query)?;
        self.return_or_raise(ok)
    }

    fn fetch(&mut self, index: i64) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.fetch(index)?;
        self.return_or_raise(ok)
    }

    fn fetch_first(&mut self) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.fetch_first()?;
        self.return_or_raise(ok)
    }

    fn fetch_last(&mut self) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.fetch_last()?;
        self.return_or_raise(ok)
    }

    fn fetch_next(&mut self) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.fetch_next()?;
        self.return_or_raise(ok)
    }

    fn fetch_previous(&mut self) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.fetch_previous()?;
        self.return_or_raise(ok)
    }

    fn prepare(&mut self, query: &str) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.prepare(query)?;
        self.return_or_raise(ok)
    }

    fn save_prepare(&mut self, query: &str) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.save_prepare(query)?;
        self.return_or_raise(ok)
    }

    fn exec(&mut self) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.exec()?;
        self.return_or_raise(ok)
    }

    fn exec_batch(&mut self, array_bind: bool) -> Result<bool, SqlTxError> {
        let ok = self.wrapped.exec_batch(array_bind)?;
        self.return_or_raise(ok)
    }

    fn next_result(&mut self) -> Result<bool, SqlTxError> {
        // Inherited no-op runs before the wrapped cursor's own implementation.
        let _ = base_next_result(&self.state);
        let ok = self.wrapped.next_result()?;
        self.return_or_raise(ok)
    }
}
