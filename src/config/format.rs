//! Format adapters turning raw bytes into a document tree.

use super::value::{table_from_toml, Table, Value};
use super::ConfigError;

/// Parses raw document bytes into a [`Table`].
///
/// Implementations are looked up by name through the
/// [`Registry`](crate::Registry) and shared between instances.
pub trait Format: Send + Sync + std::fmt::Debug {
    /// Name reported in parse errors and logs.
    fn name(&self) -> &str;

    fn parse(&self, bytes: &[u8]) -> Result<Table, ConfigError>;
}

/// HJSON, a comment-tolerant superset of JSON. Plain JSON parses as well.
#[derive(Debug, Clone, Copy, Default)]
pub struct HjsonFormat;

impl Format for HjsonFormat {
    fn name(&self) -> &str {
        "hjson"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Table, ConfigError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::parse(self.name(), e))?;
        let value: serde_json::Value =
            deser_hjson::from_str(text).map_err(|e| ConfigError::parse(self.name(), e))?;

        match Value::from(value) {
            Value::Table(table) => Ok(std::sync::Arc::unwrap_or_clone(table)),
            other => Err(ConfigError::parse(
                self.name(),
                format!("top-level document must be an object, found {}", other.type_name()),
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct TomlFormat;

impl Format for TomlFormat {
    fn name(&self) -> &str {
        "toml"
    }

    fn parse(&self, bytes: &[u8]) -> Result<Table, ConfigError> {
        let text = std::str::from_utf8(bytes).map_err(|e| ConfigError::parse(self.name(), e))?;
        let table: toml::Table =
            toml::from_str(text).map_err(|e| ConfigError::parse(self.name(), e))?;
        Ok(table_from_toml(table))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hjson_parses_plain_json() {
        let table = HjsonFormat.parse(br#"{"test field": "test text"}"#).unwrap();
        assert_eq!(table["test field"].as_str(), Some("test text"));
    }

    #[test]
    fn test_hjson_tolerates_comments_and_bare_keys() {
        let table = HjsonFormat
            .parse(
                br#"{
                    # service section
                    server: {
                        host: localhost
                        debug: true
                    }
                }"#,
            )
            .unwrap();
        let server = table["server"].as_table().unwrap();
        assert_eq!(server["host"].as_str(), Some("localhost"));
        assert_eq!(server["debug"].as_bool(), Some(true));
    }

    #[test]
    fn test_hjson_broken_document() {
        let result = HjsonFormat.parse(br#"{"test field":"test text""#);
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_hjson_rejects_non_object_root() {
        let result = HjsonFormat.parse(b"[1, 2, 3]");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }

    #[test]
    fn test_invalid_utf8_is_a_parse_error() {
        let result = HjsonFormat.parse(&[0xff, 0xfe, 0x00]);
        assert!(matches!(result, Err(ConfigError::Parse { ref format, .. }) if format == "hjson"));
    }

    #[test]
    fn test_toml_parses_tables() {
        let table = TomlFormat
            .parse(b"[database]\nhost = \"db\"\nport = 5432\n")
            .unwrap();
        let database = table["database"].as_table().unwrap();
        assert_eq!(database["port"], Value::Integer(5432));
    }

    #[test]
    fn test_toml_broken_document() {
        let result = TomlFormat.parse(b"key = ");
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
    }
}
