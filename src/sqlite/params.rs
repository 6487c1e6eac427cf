use std::fmt::Write;

use rusqlite::types::Value;

use crate::result::BoundValue;
use crate::types::{NumericalPrecisionPolicy, RowValues};

// Thread-local buffer for timestamp formatting
thread_local! {
    static TIMESTAMP_BUF: std::cell::RefCell<String> =
        std::cell::RefCell::new(String::with_capacity(32));
}

/// Convert a single `RowValues` to a rusqlite `Value`.
///
/// # Errors
/// Returns `rusqlite::Error::ToSqlConversionFailure` for list values, which only
/// make sense as batch bindings.
pub fn row_value_to_sqlite_value(value: &RowValues) -> rusqlite::Result<Value> {
    Ok(match value {
        RowValues::Int(i) => Value::Integer(*i),
        RowValues::Float(f) => Value::Real(*f),
        RowValues::Text(s) => Value::Text(s.clone()),
        RowValues::Bool(b) => Value::Integer(i64::from(*b)),
        RowValues::Timestamp(dt) => TIMESTAMP_BUF.with(|buf| {
            let mut borrow = buf.borrow_mut();
            borrow.clear();
            let _ = write!(borrow, "{}", dt.format("%F %T%.f"));
            Value::Text(borrow.clone())
        }),
        RowValues::Null => Value::Null,
        RowValues::Blob(bytes) => Value::Blob(bytes.clone()),
        RowValues::List(_) => {
            return Err(rusqlite::Error::ToSqlConversionFailure(
                "list values can only be bound for exec_batch".into(),
            ));
        }
    })
}

/// Extract a `RowValues` from a `SQLite` row.
///
/// # Errors
/// Returns `rusqlite::Error` if the column cannot be read.
pub fn sqlite_extract_value(
    row: &rusqlite::Row,
    idx: usize,
    policy: NumericalPrecisionPolicy,
) -> rusqlite::Result<RowValues> {
    let value: Value = row.get(idx)?;
    Ok(match value {
        Value::Null => RowValues::Null,
        Value::Integer(i) => RowValues::Int(i),
        Value::Real(f) => apply_precision(f, policy),
        Value::Text(s) => RowValues::Text(s),
        Value::Blob(b) => RowValues::Blob(b),
    })
}

#[allow(clippy::cast_possible_truncation)]
fn apply_precision(value: f64, policy: NumericalPrecisionPolicy) -> RowValues {
    match policy {
        NumericalPrecisionPolicy::LowPrecisionInt32 => RowValues::Int(i64::from(value as i32)),
        NumericalPrecisionPolicy::LowPrecisionInt64 => RowValues::Int(value as i64),
        NumericalPrecisionPolicy::LowPrecisionDouble | NumericalPrecisionPolicy::HighPrecision => {
            RowValues::Float(value)
        }
    }
}

/// Named placeholders may be given with or without their sigil; `SQLite` wants it.
fn placeholder_key(name: &str) -> String {
    if name.starts_with([':', '@', '$', '?']) {
        name.to_owned()
    } else {
        format!(":{name}")
    }
}

/// Parameter indexes that positional values fill, in order.
///
/// Without named bindings every parameter is positional. Once a name is bound,
/// positional values go to the anonymous (`?` / `?NNN`) parameters only.
fn positional_slots(stmt: &rusqlite::Statement<'_>, has_named: bool) -> Vec<usize> {
    (1..=stmt.parameter_count())
        .filter(|&idx| !has_named || stmt.parameter_name(idx).is_none_or(|n| n.starts_with('?')))
        .collect()
}

/// Bind named values by placeholder and positional values by slot.
///
/// # Errors
/// Returns `rusqlite::Error` for unknown placeholders, too many values or
/// unconvertible values.
pub fn bind_all(
    stmt: &mut rusqlite::Statement<'_>,
    positional: &[BoundValue],
    named: &[BoundValue],
) -> rusqlite::Result<()> {
    for b in named {
        let key = placeholder_key(b.placeholder().unwrap_or_default());
        let index = stmt
            .parameter_index(&key)?
            .ok_or_else(|| rusqlite::Error::InvalidParameterName(key.clone()))?;
        stmt.raw_bind_parameter(index, row_value_to_sqlite_value(b.value())?)?;
    }
    let slots = positional_slots(stmt, !named.is_empty());
    if positional.len() > slots.len() {
        return Err(rusqlite::Error::InvalidParameterCount(positional.len(), slots.len()));
    }
    for (b, &index) in positional.iter().zip(&slots) {
        stmt.raw_bind_parameter(index, row_value_to_sqlite_value(b.value())?)?;
    }
    Ok(())
}
