//! The result-cursor capability surface.
//!
//! A native cursor reports failure of its execution and fetch operations with
//! `Ok(false)` and leaves the details in [`SqlResult::last_error`]. Wrapping it in
//! a [`ResultProxy`](crate::ResultProxy) turns those into `Err` values.

use tracing::trace;

use crate::error::{ErrorKind, SqlError, SqlTxError};
use crate::record::SqlRecord;
use crate::types::{BEFORE_FIRST_ROW, NativeHandle, NumericalPrecisionPolicy, ParamType, RowValues};

/// A value bound to a statement parameter, positional or named.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct BoundValue {
    placeholder: Option<String>,
    value: RowValues,
    param_type: ParamType,
}

impl BoundValue {
    #[must_use]
    pub fn placeholder(&self) -> Option<&str> {
        self.placeholder.as_deref()
    }

    #[must_use]
    pub fn value(&self) -> &RowValues {
        &self.value
    }

    #[must_use]
    pub fn param_type(&self) -> ParamType {
        self.param_type
    }

    /// Same binding target, different value. Used to unpack batch lists.
    #[must_use]
    pub fn with_value(&self, value: RowValues) -> Self {
        Self {
            placeholder: self.placeholder.clone(),
            value,
            param_type: self.param_type,
        }
    }
}

/// Inspectable bookkeeping shared by every cursor implementation.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultState {
    at: i64,
    active: bool,
    last_error: SqlError,
    query: String,
    select: bool,
    forward_only: bool,
    bound_values: Vec<BoundValue>,
    named_values: Vec<BoundValue>,
    bind_count: usize,
    precision_policy: NumericalPrecisionPolicy,
}

impl Default for ResultState {
    fn default() -> Self {
        Self {
            at: BEFORE_FIRST_ROW,
            active: false,
            last_error: SqlError::none(),
            query: String::new(),
            select: false,
            forward_only: false,
            bound_values: Vec::new(),
            named_values: Vec::new(),
            bind_count: 0,
            precision_policy: NumericalPrecisionPolicy::default(),
        }
    }
}

impl ResultState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn at(&self) -> i64 {
        self.at
    }

    pub fn set_at(&mut self, at: i64) {
        self.at = at;
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        self.active
    }

    pub fn set_active(&mut self, active: bool) {
        self.active = active;
    }

    #[must_use]
    pub fn last_error(&self) -> &SqlError {
        &self.last_error
    }

    pub fn set_last_error(&mut self, error: SqlError) {
        self.last_error = error;
    }

    #[must_use]
    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn set_query(&mut self, query: &str) {
        query.clone_into(&mut self.query);
    }

    #[must_use]
    pub fn is_select(&self) -> bool {
        self.select
    }

    pub fn set_select(&mut self, select: bool) {
        self.select = select;
    }

    #[must_use]
    pub fn is_forward_only(&self) -> bool {
        self.forward_only
    }

    pub fn set_forward_only(&mut self, forward_only: bool) {
        self.forward_only = forward_only;
    }

    /// Positional bindings, in parameter order.
    #[must_use]
    pub fn bound_values(&self) -> &[BoundValue] {
        &self.bound_values
    }

    #[must_use]
    pub fn named_bound_values(&self) -> &[BoundValue] {
        &self.named_values
    }

    /// Binds `value` at position `pos`, padding any gap with NULLs.
    /// Named bindings are kept apart and never overwritten here.
    pub fn bind(&mut self, pos: usize, value: RowValues, param_type: ParamType) {
        if self.bound_values.len() <= pos {
            self.bound_values.resize_with(pos + 1, BoundValue::default);
        }
        let slot = &mut self.bound_values[pos];
        slot.value = value;
        slot.param_type = param_type;
    }

    /// Binds `value` to a named placeholder, replacing an earlier binding of the same name.
    pub fn bind_named(&mut self, placeholder: &str, value: RowValues, param_type: ParamType) {
        let bound = BoundValue {
            placeholder: Some(placeholder.to_owned()),
            value,
            param_type,
        };
        match self
            .named_values
            .iter_mut()
            .find(|b| b.placeholder.as_deref() == Some(placeholder))
        {
            Some(slot) => *slot = bound,
            None => self.named_values.push(bound),
        }
    }

    pub fn clear_bound_values(&mut self) {
        self.bound_values.clear();
        self.named_values.clear();
        self.bind_count = 0;
    }

    #[must_use]
    pub fn bind_count(&self) -> usize {
        self.bind_count
    }

    /// Returns the next positional slot for `add_bind_value` and advances the counter.
    pub fn next_bind_slot(&mut self) -> usize {
        let slot = self.bind_count;
        self.bind_count += 1;
        slot
    }

    pub fn reset_bind_count(&mut self) {
        self.bind_count = 0;
    }

    #[must_use]
    pub fn numerical_precision_policy(&self) -> NumericalPrecisionPolicy {
        self.precision_policy
    }

    pub fn set_numerical_precision_policy(&mut self, policy: NumericalPrecisionPolicy) {
        self.precision_policy = policy;
    }
}

/// What a cursor does when asked for another result set and has no native
/// notion of one: nothing. Reports "no further result set".
#[must_use]
pub fn base_next_result(state: &ResultState) -> bool {
    trace!(query = state.query(), "base next_result: no further result set");
    false
}

/// Error a cursor records when asked for an operation it does not implement.
#[must_use]
pub fn unsupported(operation: &str) -> SqlError {
    SqlError::new(
        format!("{operation} is not supported by this driver"),
        "",
        ErrorKind::StatementError,
    )
}

/// A cursor over the result of a single statement.
///
/// State mutators have default implementations that only touch
/// [`ResultState`]; wrappers override them to keep a wrapped cursor in step.
/// Execution and fetch operations return `Ok(true)` on success and `Ok(false)`
/// on failure for native cursors; a proxy turns the latter into `Err`.
pub trait SqlResult {
    fn state(&self) -> &ResultState;
    fn state_mut(&mut self) -> &mut ResultState;

    fn at(&self) -> i64 {
        self.state().at()
    }

    fn is_active(&self) -> bool {
        self.state().is_active()
    }

    /// `true` when positioned on a row.
    fn is_valid(&self) -> bool {
        self.state().at() >= 0
    }

    fn last_error(&self) -> SqlError {
        self.state().last_error().clone()
    }

    fn last_query(&self) -> &str {
        self.state().query()
    }

    fn is_select(&self) -> bool {
        self.state().is_select()
    }

    fn is_forward_only(&self) -> bool {
        self.state().is_forward_only()
    }

    fn numerical_precision_policy(&self) -> NumericalPrecisionPolicy {
        self.state().numerical_precision_policy()
    }

    fn bound_values(&self) -> &[BoundValue] {
        self.state().bound_values()
    }

    fn named_bound_values(&self) -> &[BoundValue] {
        self.state().named_bound_values()
    }

    fn set_at(&mut self, at: i64) {
        self.state_mut().set_at(at);
    }

    fn set_active(&mut self, active: bool) {
        self.state_mut().set_active(active);
    }

    fn set_last_error(&mut self, error: SqlError) {
        self.state_mut().set_last_error(error);
    }

    fn set_query(&mut self, query: &str) {
        self.state_mut().set_query(query);
    }

    fn set_select(&mut self, select: bool) {
        self.state_mut().set_select(select);
    }

    fn set_forward_only(&mut self, forward_only: bool) {
        self.state_mut().set_forward_only(forward_only);
    }

    fn bind_value(&mut self, pos: usize, value: RowValues, param_type: ParamType) {
        self.state_mut().bind(pos, value, param_type);
    }

    fn bind_value_named(&mut self, placeholder: &str, value: RowValues, param_type: ParamType) {
        self.state_mut().bind_named(placeholder, value, param_type);
    }

    fn clear_bound_values(&mut self) {
        self.state_mut().clear_bound_values();
    }

    fn set_numerical_precision_policy(&mut self, policy: NumericalPrecisionPolicy) {
        self.state_mut().set_numerical_precision_policy(policy);
    }

    /// Release the native result set while keeping the cursor reusable.
    fn detach_from_result_set(&mut self) {}

    /// Bind to the next positional slot. Implemented on top of `bind_value`.
    fn add_bind_value(&mut self, value: RowValues, param_type: ParamType) {
        let pos = self.state_mut().next_bind_slot();
        self.bind_value(pos, value, param_type);
    }

    fn reset_bind_count(&mut self) {
        self.state_mut().reset_bind_count();
    }

    fn data(&self, index: usize) -> RowValues;
    fn is_null(&self, index: usize) -> bool;
    /// Number of rows in a select result, or -1 when unknown.
    fn size(&self) -> i64;
    /// Rows touched by the last DML statement, or -1 when unknown.
    fn num_rows_affected(&self) -> i64;
    fn record(&self) -> SqlRecord;
    fn last_insert_id(&self) -> RowValues;
    fn handle(&self) -> NativeHandle;

    /// Execute `query` directly.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn reset(&mut self, query: &str) -> Result<bool, SqlTxError>;

    /// Position the cursor on row `index`.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn fetch(&mut self, index: i64) -> Result<bool, SqlTxError>;

    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn fetch_first(&mut self) -> Result<bool, SqlTxError>;

    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn fetch_last(&mut self) -> Result<bool, SqlTxError>;

    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn fetch_next(&mut self) -> Result<bool, SqlTxError> {
        let at = self.at();
        self.fetch(at + 1)
    }

    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn fetch_previous(&mut self) -> Result<bool, SqlTxError> {
        let at = self.at();
        self.fetch(at - 1)
    }

    /// Prepare `query` for later `exec`.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn prepare(&mut self, query: &str) -> Result<bool, SqlTxError> {
        self.set_query(query);
        Ok(true)
    }

    /// Record `query` as the current statement, then `prepare` it.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn save_prepare(&mut self, query: &str) -> Result<bool, SqlTxError> {
        self.set_query(query);
        self.prepare(query)
    }

    /// Execute the prepared statement with the bound values.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn exec(&mut self) -> Result<bool, SqlTxError> {
        self.set_last_error(unsupported("exec"));
        Ok(false)
    }

    /// Execute the prepared statement once per element of the bound lists.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn exec_batch(&mut self, array_bind: bool) -> Result<bool, SqlTxError> {
        let _ = array_bind;
        self.set_last_error(unsupported("exec_batch"));
        Ok(false)
    }

    /// Advance to the next result set of a multi-result statement.
    ///
    /// # Errors
    /// Native cursors report failure as `Ok(false)`; wrappers may return `Err`.
    fn next_result(&mut self) -> Result<bool, SqlTxError> {
        Ok(base_next_result(self.state()))
    }
}
