use rusqlite::{params, Connection};
use tandem_core::{ColumnInfo, Result, TandemError};

const TABLE_COLUMNS_SQL: &str = "SELECT name, type FROM pragma_table_info(?1, ?2)";

/// Column names and declared types of `database.table`, in table order.
///
/// Safe to call from inside an engine callback on the same connection: the
/// query only reads the schema.
pub fn table_columns(conn: &Connection, database: &str, table: &str) -> Result<Vec<ColumnInfo>> {
    let mut stmt = conn
        .prepare_cached(TABLE_COLUMNS_SQL)
        .map_err(|e| TandemError::Metadata(e.to_string()))?;

    let columns = stmt
        .query_map(params![table, database], |row| {
            Ok(ColumnInfo::new(
                row.get::<_, String>(0)?,
                row.get::<_, String>(1)?,
            ))
        })
        .map_err(|e| TandemError::Metadata(e.to_string()))?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(|e| TandemError::Metadata(e.to_string()))?;

    if columns.is_empty() {
        return Err(TandemError::Metadata(format!(
            "no columns found for {database}.{table}"
        )));
    }
    Ok(columns)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_columns_in_order() {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("CREATE TABLE users(id INTEGER PRIMARY KEY, name TEXT, avatar BLOB, note)")
            .unwrap();

        let columns = table_columns(&conn, "main", "users").unwrap();
        let names: Vec<_> = columns.iter().map(|c| c.name.as_str()).collect();
        let types: Vec<_> = columns.iter().map(|c| c.declared_type.as_str()).collect();
        assert_eq!(names, ["id", "name", "avatar", "note"]);
        assert_eq!(types, ["INTEGER", "TEXT", "BLOB", ""]);
    }

    #[test]
    fn test_unknown_table() {
        let conn = Connection::open_in_memory().unwrap();
        let err = table_columns(&conn, "main", "missing").unwrap_err();
        assert!(matches!(err, TandemError::Metadata(_)));
    }
}
