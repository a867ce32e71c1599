use std::path::{Path, PathBuf};
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use serde::de::DeserializeOwned;
use tracing::{debug, info, warn};

use super::format::Format;
use super::source::{read_file, ConfigSource};
use super::value::{Table, Value};
use super::ConfigError;

/// A loaded document and the file it came from, if any.
#[derive(Debug)]
struct Document {
    source: Option<PathBuf>,
    root: Arc<Table>,
}

/// A configuration instance: one document tree plus typed access by path.
///
/// The tree is published through an atomic pointer. [`reload`](Self::reload)
/// and [`set_source`](Self::set_source) build the new tree completely before
/// swapping it in, so readers on other threads see either the old document or
/// the new one, never a mix.
///
/// ## Example
///
/// ```
/// use std::sync::Arc;
/// use dragon_conf::{Config, ConfigSource, HjsonFormat};
///
/// let config = Config::load(
///     Arc::new(HjsonFormat),
///     ConfigSource::bytes(r#"{"a": {"b": "x", "c": 7}}"#),
/// )?;
///
/// assert_eq!(config.get_string(&["a", "b"])?, "x");
/// assert_eq!(config.get_int(&["a", "c"])?, 7);
///
/// let a = config.subconfig(&["a"])?;
/// assert_eq!(a.get_string(&["b"])?, "x");
/// # Ok::<(), dragon_conf::ConfigError>(())
/// ```
pub struct Config {
    format: Arc<dyn Format>,
    state: ArcSwapOption<Document>,
}

impl Config {
    /// Creates an instance with no document yet.
    ///
    /// Lookups fail with [`ConfigError::Usage`] until
    /// [`set_source`](Self::set_source) succeeds.
    pub fn new(format: Arc<dyn Format>) -> Self {
        Self {
            format,
            state: ArcSwapOption::empty(),
        }
    }

    /// Creates an instance and loads its document from `source`.
    pub fn load(format: Arc<dyn Format>, source: ConfigSource) -> Result<Self, ConfigError> {
        let config = Self::new(format);
        config.set_source(source)?;
        Ok(config)
    }

    /// Loads the document from `source`, replacing the current one on success.
    ///
    /// A file source is remembered for [`check_external`](Self::check_external)
    /// and [`reload`](Self::reload); bytes and tables clear it. On failure the
    /// instance keeps whatever it held before.
    pub fn set_source(&self, source: ConfigSource) -> Result<(), ConfigError> {
        let document = match source {
            ConfigSource::File(path) => {
                let root = self.parse_file(&path)?;
                Document {
                    source: Some(path),
                    root: Arc::new(root),
                }
            }
            ConfigSource::Bytes(bytes) => Document {
                source: None,
                root: Arc::new(self.format.parse(&bytes)?),
            },
            ConfigSource::Table(table) => Document {
                source: None,
                root: Arc::new(table),
            },
        };

        debug!(
            format = self.format.name(),
            source = ?document.source,
            "config document loaded"
        );
        self.state.store(Some(Arc::new(document)));
        Ok(())
    }

    /// Verifies that the recorded source file still parses.
    ///
    /// The live document is not touched. Useful before committing to a reload.
    pub fn check_external(&self) -> Result<(), ConfigError> {
        let path = self.require_source()?;
        self.parse_file(&path).map(|_| ())
    }

    /// Re-reads the recorded source file and swaps in the new document.
    ///
    /// Any read or parse failure leaves the current document in place.
    pub fn reload(&self) -> Result<(), ConfigError> {
        let path = self.require_source()?;
        let root = match self.parse_file(&path) {
            Ok(root) => root,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "config reload failed, keeping current document");
                return Err(e);
            }
        };

        self.state.store(Some(Arc::new(Document {
            source: Some(path.clone()),
            root: Arc::new(root),
        })));
        info!(path = %path.display(), "config reloaded");
        Ok(())
    }

    /// The file this instance was loaded from, if it was loaded from one.
    pub fn source(&self) -> Option<PathBuf> {
        self.state.load_full().and_then(|doc| doc.source.clone())
    }

    pub fn is_loaded(&self) -> bool {
        self.state.load().is_some()
    }

    pub fn format(&self) -> &dyn Format {
        self.format.as_ref()
    }

    /// The current root table.
    pub fn root(&self) -> Result<Arc<Table>, ConfigError> {
        self.state
            .load_full()
            .map(|doc| Arc::clone(&doc.root))
            .ok_or_else(|| ConfigError::Usage("no config was initialized yet".to_string()))
    }

    /// Resolves `path` from the root and returns the value found there.
    ///
    /// Tables are descended while keys remain; a table at the last key is
    /// returned as is. Reaching a non-table value with keys still left is
    /// [`ConfigError::ItemNotFound`]: trailing keys are never ignored.
    pub fn get_value<S: AsRef<str>>(&self, path: &[S]) -> Result<Value, ConfigError> {
        let root = self.root()?;
        let (last, parents) = path.split_last().ok_or_else(|| {
            ConfigError::Usage("a path of at least one key is required".to_string())
        })?;

        let mut current: &Table = &root;
        for (depth, key) in parents.iter().enumerate() {
            current = match current.get(key.as_ref()) {
                Some(Value::Table(table)) => &**table,
                // Nothing to descend into, so the next key cannot exist.
                Some(_) => return Err(not_found(&path[..depth + 2])),
                None => return Err(not_found(&path[..=depth])),
            };
        }

        current
            .get(last.as_ref())
            .cloned()
            .ok_or_else(|| not_found(path))
    }

    /// Integer at `path`.
    ///
    /// Whole floats are accepted, since some formats parse every number as a
    /// float. Floats with a fractional part are a type mismatch, not truncated.
    pub fn get_int<S: AsRef<str>>(&self, path: &[S]) -> Result<i64, ConfigError> {
        let value = self.get_value(path)?;
        value
            .as_integer()
            .ok_or_else(|| mismatch(path, "integer", &value))
    }

    /// Float at `path`. Integers widen to `f64`.
    pub fn get_float<S: AsRef<str>>(&self, path: &[S]) -> Result<f64, ConfigError> {
        let value = self.get_value(path)?;
        value.as_float().ok_or_else(|| mismatch(path, "float", &value))
    }

    pub fn get_string<S: AsRef<str>>(&self, path: &[S]) -> Result<String, ConfigError> {
        match self.get_value(path)? {
            Value::String(s) => Ok(s),
            other => Err(mismatch(path, "string", &other)),
        }
    }

    pub fn get_bool<S: AsRef<str>>(&self, path: &[S]) -> Result<bool, ConfigError> {
        let value = self.get_value(path)?;
        value.as_bool().ok_or_else(|| mismatch(path, "boolean", &value))
    }

    /// Deserializes the value at `path` into `T`.
    pub fn get<T, S>(&self, path: &[S]) -> Result<T, ConfigError>
    where
        T: DeserializeOwned,
        S: AsRef<str>,
    {
        let value = self.get_value(path)?;
        Ok(serde_json::from_value(serde_json::Value::from(&value))?)
    }

    /// Deserializes the whole document into `T`.
    pub fn deserialize<T: DeserializeOwned>(&self) -> Result<T, ConfigError> {
        let root = Value::Table(self.root()?);
        Ok(serde_json::from_value(serde_json::Value::from(&root))?)
    }

    /// Wraps the table at `path` as a config of its own.
    ///
    /// The sub-config shares the table with this instance and has no source
    /// file, so it cannot be checked or reloaded by itself.
    pub fn subconfig<S: AsRef<str>>(&self, path: &[S]) -> Result<Config, ConfigError> {
        match self.get_value(path)? {
            Value::Table(root) => Ok(Config {
                format: Arc::clone(&self.format),
                state: ArcSwapOption::new(Some(Arc::new(Document { source: None, root }))),
            }),
            other => Err(mismatch(path, "table", &other)),
        }
    }

    fn parse_file(&self, path: &Path) -> Result<Table, ConfigError> {
        let bytes = read_file(path)?;
        self.format.parse(&bytes)
    }

    fn require_source(&self) -> Result<PathBuf, ConfigError> {
        self.source().ok_or_else(|| {
            ConfigError::NotConfigured(
                "config has no source file to check or reload".to_string(),
            )
        })
    }
}

impl std::fmt::Debug for Config {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Config")
            .field("format", &self.format.name())
            .field("source", &self.source())
            .field("loaded", &self.is_loaded())
            .finish()
    }
}

fn join_path<S: AsRef<str>>(path: &[S]) -> String {
    path.iter()
        .map(|key| key.as_ref())
        .collect::<Vec<_>>()
        .join(".")
}

fn not_found<S: AsRef<str>>(path: &[S]) -> ConfigError {
    ConfigError::ItemNotFound {
        path: join_path(path),
    }
}

fn mismatch<S: AsRef<str>>(path: &[S], expected: &'static str, found: &Value) -> ConfigError {
    ConfigError::TypeMismatch {
        path: join_path(path),
        expected,
        found: found.type_name(),
    }
}
