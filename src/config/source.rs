use std::path::{Path, PathBuf};

use super::value::Table;
use super::ConfigError;

/// Where a [`Config`](super::Config) takes its document from.
///
/// Only `File` records a source path, so only file-backed instances can be
/// checked or reloaded later.
#[derive(Debug, Clone)]
pub enum ConfigSource {
    File(PathBuf),
    Bytes(Vec<u8>),
    Table(Table),
}

impl ConfigSource {
    pub fn file(path: impl AsRef<Path>) -> Self {
        Self::File(path.as_ref().to_path_buf())
    }

    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }
}

impl From<Table> for ConfigSource {
    fn from(table: Table) -> Self {
        Self::Table(table)
    }
}

/// Reads a config file into memory.
pub(crate) fn read_file(path: &Path) -> Result<Vec<u8>, ConfigError> {
    if path.as_os_str().is_empty() {
        return Err(ConfigError::NotConfigured(
            "cannot load config file with no filename".to_string(),
        ));
    }

    std::fs::read(path).map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            ConfigError::FileNotFound(path.to_path_buf())
        } else {
            ConfigError::Read {
                path: path.to_path_buf(),
                source: e,
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn test_read_file_loads_contents() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{{\"key\": \"value\"}}").unwrap();

        let contents = read_file(file.path()).unwrap();
        assert_eq!(contents, b"{\"key\": \"value\"}");
    }

    #[test]
    fn test_read_file_empty_path() {
        let result = read_file(Path::new(""));
        assert!(matches!(result, Err(ConfigError::NotConfigured(_))));
    }

    #[test]
    fn test_read_file_missing() {
        let result = read_file(Path::new("/nonexistent/path/config.hjson"));
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_read_file_directory() {
        let dir = tempfile::tempdir().unwrap();
        let result = read_file(dir.path());
        assert!(matches!(result, Err(ConfigError::Read { .. })));
    }
}
