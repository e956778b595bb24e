use rusqlite::hooks::{
    Action, PreUpdateCase, PreUpdateNewValueAccessor, PreUpdateOldValueAccessor,
};
use rusqlite::types::ValueRef;
use tandem_core::{Change, Operation, Result, TandemError, Value};

/// Internal tables (`sqlite_sequence`, `sqlite_stat1`, ...) are never captured.
pub fn is_internal_table(table: &str) -> bool {
    table
        .get(..7)
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case("sqlite_"))
}

/// Build a row change from a pre-mutation notification.
///
/// Column names and types are not known here; they are attached afterwards
/// from the table metadata.
pub fn change_from_preupdate(
    action: Action,
    database: &str,
    table: &str,
    case: &PreUpdateCase,
) -> Result<Change> {
    let change = match case {
        PreUpdateCase::Insert(new) => {
            let mut change = Change::row(Operation::Insert, database, table);
            change.new_row_id = new.get_new_row_id();
            change.new_values = new_values(new)?;
            change
        }
        PreUpdateCase::Delete(old) => {
            let mut change = Change::row(Operation::Delete, database, table);
            change.old_row_id = old.get_old_row_id();
            change.old_values = old_values(old)?;
            change
        }
        PreUpdateCase::Update {
            old_value_accessor,
            new_value_accessor,
        } => {
            let mut change = Change::row(Operation::Update, database, table);
            change.old_row_id = old_value_accessor.get_old_row_id();
            change.new_row_id = new_value_accessor.get_new_row_id();
            change.old_values = old_values(old_value_accessor)?;
            change.new_values = new_values(new_value_accessor)?;
            change
        }
        PreUpdateCase::Unknown => {
            Change::row(Operation::Unknown(action_code(action)), database, table)
        }
    };
    Ok(change)
}

fn action_code(action: Action) -> i32 {
    match action {
        Action::SQLITE_DELETE => rusqlite::ffi::SQLITE_DELETE,
        Action::SQLITE_INSERT => rusqlite::ffi::SQLITE_INSERT,
        Action::SQLITE_UPDATE => rusqlite::ffi::SQLITE_UPDATE,
        _ => -1,
    }
}

fn old_values(accessor: &PreUpdateOldValueAccessor) -> Result<Vec<Value>> {
    (0..accessor.get_column_count())
        .map(|i| {
            accessor
                .get_old_column_value(i)
                .map(to_value)
                .map_err(|e| TandemError::Engine(e.to_string()))
        })
        .collect()
}

fn new_values(accessor: &PreUpdateNewValueAccessor) -> Result<Vec<Value>> {
    (0..accessor.get_column_count())
        .map(|i| {
            accessor
                .get_new_column_value(i)
                .map(to_value)
                .map_err(|e| TandemError::Engine(e.to_string()))
        })
        .collect()
}

/// Copy an engine value out of the notification.
///
/// Text that is not valid UTF-8 is kept as bytes.
pub fn to_value(value: ValueRef<'_>) -> Value {
    match value {
        ValueRef::Null => Value::Null,
        ValueRef::Integer(i) => Value::Integer(i),
        ValueRef::Real(f) => Value::Real(f),
        ValueRef::Text(bytes) => match std::str::from_utf8(bytes) {
            Ok(text) => Value::Text(text.to_owned()),
            Err(_) => Value::Blob(bytes.to_vec()),
        },
        ValueRef::Blob(bytes) => Value::Blob(bytes.to_vec()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_internal_tables() {
        assert!(is_internal_table("sqlite_sequence"));
        assert!(is_internal_table("SQLITE_STAT1"));
        assert!(!is_internal_table("users"));
        assert!(!is_internal_table("sqlite"));
    }

    #[test]
    fn test_value_conversion() {
        assert_eq!(to_value(ValueRef::Null), Value::Null);
        assert_eq!(to_value(ValueRef::Integer(3)), Value::Integer(3));
        assert_eq!(to_value(ValueRef::Text(b"HA user")), Value::Text("HA user".into()));
        assert_eq!(
            to_value(ValueRef::Text(&[0xff, 0xfe])),
            Value::Blob(vec![0xff, 0xfe])
        );
        assert_eq!(to_value(ValueRef::Blob(b"abc")), Value::Blob(b"abc".to_vec()));
    }
}
