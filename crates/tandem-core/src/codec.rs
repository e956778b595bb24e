//! Changeset wire encodings
//!
//! Publishers that ship changesets over a byte-oriented transport pick a
//! codec here. The codec name travels with the bytes so a receiver can pick
//! the matching decoder.
//!
//! # Example
//!
//! ```
//! use tandem_core::codec::{ChangeSetCodec, JsonCodec};
//! use tandem_core::types::{Change, ChangeSet};
//!
//! # fn main() -> tandem_core::Result<()> {
//! let mut cs = ChangeSet::new("node1", "app.db");
//! cs.add_change(Change::sql("CREATE TABLE IF NOT EXISTS t(x)", vec![]));
//!
//! let bytes = JsonCodec.encode(&cs)?;
//! let decoded = JsonCodec.decode(&bytes)?;
//! assert_eq!(decoded, cs);
//! # Ok(())
//! # }
//! ```

use crate::error::{Result, TandemError};
use crate::types::ChangeSet;

pub trait ChangeSetCodec: Send + Sync {
    fn encode(&self, changeset: &ChangeSet) -> Result<Vec<u8>>;

    fn decode(&self, bytes: &[u8]) -> Result<ChangeSet>;

    /// Codec name (e.g. for a message header)
    fn name(&self) -> &str;
}

/// JSON codec (human-readable, larger size)
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl ChangeSetCodec for JsonCodec {
    fn encode(&self, changeset: &ChangeSet) -> Result<Vec<u8>> {
        serde_json::to_vec(changeset).map_err(|e| TandemError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ChangeSet> {
        serde_json::from_slice(bytes).map_err(|e| TandemError::Serialization(e.to_string()))
    }

    fn name(&self) -> &str {
        "json"
    }
}

/// MessagePack codec (binary, compact)
///
/// Structs are written as maps so optional fields may be omitted.
#[derive(Debug, Default, Clone, Copy)]
pub struct MsgPackCodec;

impl ChangeSetCodec for MsgPackCodec {
    fn encode(&self, changeset: &ChangeSet) -> Result<Vec<u8>> {
        rmp_serde::to_vec_named(changeset).map_err(|e| TandemError::Serialization(e.to_string()))
    }

    fn decode(&self, bytes: &[u8]) -> Result<ChangeSet> {
        rmp_serde::from_slice(bytes).map_err(|e| TandemError::Serialization(e.to_string()))
    }

    fn name(&self) -> &str {
        "msgpack"
    }
}

/// Look up a codec by the name it reports.
pub fn codec_by_name(name: &str) -> Option<Box<dyn ChangeSetCodec>> {
    match name {
        "json" => Some(Box::new(JsonCodec)),
        "msgpack" => Some(Box::new(MsgPackCodec)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Change, Operation, Value};

    fn sample() -> ChangeSet {
        let mut cs = ChangeSet::new("node1", "app.db");
        cs.add_change(Change::sql(
            "CREATE TABLE IF NOT EXISTS users(name TEXT, avatar BLOB)",
            vec![],
        ));
        let mut insert = Change::row(Operation::Insert, "main", "users");
        insert.new_row_id = 1;
        insert.columns = vec!["name".into(), "avatar".into()];
        insert.types = vec!["TEXT".into(), "BLOB".into()];
        insert.new_values = vec![Value::Text("HA user".into()), Value::Blob(vec![0, 1, 2])];
        cs.add_change(insert);
        cs
    }

    #[test]
    fn test_msgpack_preserves_sparse_changes() {
        let cs = sample();
        let bytes = MsgPackCodec.encode(&cs).unwrap();
        let decoded = MsgPackCodec.decode(&bytes).unwrap();
        assert_eq!(decoded, cs);
    }

    #[test]
    fn test_json_wire_shape() {
        let bytes = JsonCodec.encode(&sample()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&bytes).unwrap();

        assert_eq!(json["node"], "node1");
        assert_eq!(json["changes"][0]["operation"], "SQL");
        assert_eq!(json["changes"][1]["operation"], "INSERT");
        assert_eq!(json["changes"][1]["new_values"][0], "HA user");
    }

    #[test]
    fn test_codec_lookup() {
        assert_eq!(codec_by_name("json").unwrap().name(), "json");
        assert_eq!(codec_by_name("msgpack").unwrap().name(), "msgpack");
        assert!(codec_by_name("xml").is_none());
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(matches!(
            JsonCodec.decode(b"{not json"),
            Err(TandemError::Serialization(_))
        ));
    }
}
