//! Value normalisation for captured rows.
//!
//! The engine may hand back text stored in a non-BLOB column as raw bytes.
//! Before a change leaves the process those bytes are decoded to text so
//! peers see the same value the application wrote. Columns declared `BLOB`
//! keep their bytes untouched.

use crate::types::Value;

/// Declared type name of binary columns.
pub const BLOB_TYPE: &str = "BLOB";

/// Canonicalise one value given its column's declared type.
///
/// Bytes in a non-BLOB column become text when they are valid UTF-8. Anything
/// else, including undecodable bytes, passes through unchanged.
pub fn normalize(value: Value, declared_type: &str) -> Value {
    match value {
        Value::Blob(bytes) if !declared_type.eq_ignore_ascii_case(BLOB_TYPE) => {
            match String::from_utf8(bytes) {
                Ok(text) => Value::Text(text),
                Err(err) => Value::Blob(err.into_bytes()),
            }
        }
        other => other,
    }
}

/// Normalise `values` in place against the declared `types` at the same positions.
///
/// Positions without a declared type are left alone.
pub fn normalize_row(values: &mut [Value], types: &[String]) {
    for (value, declared) in values.iter_mut().zip(types) {
        if value.is_null() {
            continue;
        }
        let raw = std::mem::replace(value, Value::Null);
        *value = normalize(raw, declared);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bytes_in_text_column_become_text() {
        let v = normalize(Value::Blob(b"HA user".to_vec()), "TEXT");
        assert_eq!(v, Value::Text("HA user".into()));
    }

    #[test]
    fn test_blob_column_keeps_bytes() {
        let v = normalize(Value::Blob(vec![1, 2, 3]), "BLOB");
        assert_eq!(v, Value::Blob(vec![1, 2, 3]));

        let v = normalize(Value::Blob(b"abc".to_vec()), "blob");
        assert_eq!(v, Value::Blob(b"abc".to_vec()));
    }

    #[test]
    fn test_invalid_utf8_passes_through() {
        let raw = vec![0xff, 0xfe, 0x00];
        let v = normalize(Value::Blob(raw.clone()), "TEXT");
        assert_eq!(v, Value::Blob(raw));
    }

    #[test]
    fn test_non_bytes_untouched() {
        assert_eq!(normalize(Value::Integer(5), "TEXT"), Value::Integer(5));
        assert_eq!(normalize(Value::Real(0.5), ""), Value::Real(0.5));
    }

    #[test]
    fn test_row_with_fewer_types_than_values() {
        let mut values = vec![Value::Blob(b"a".to_vec()), Value::Blob(b"b".to_vec())];
        normalize_row(&mut values, &["TEXT".to_string()]);
        assert_eq!(values[0], Value::Text("a".into()));
        assert_eq!(values[1], Value::Blob(b"b".to_vec()));
    }
}
