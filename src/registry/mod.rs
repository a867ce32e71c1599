//! Tagged registry handing out shared configuration instances.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::debug;

use crate::config::{Config, ConfigError, ConfigSource, Format, HjsonFormat, TomlFormat};

/// Names the HJSON adapter answers to. JSON documents are valid HJSON.
const HJSON_ALIASES: [&str; 4] = ["HJSON", "hjson", "JSON", "json"];
const TOML_ALIASES: [&str; 2] = ["TOML", "toml"];

/// Hands out shared [`Config`] instances by tag.
///
/// The first instance successfully built under a tag is kept for the life of
/// the registry and returned for every later request with that tag. Untagged
/// requests always build a fresh instance that is never cached.
///
/// Create one registry at start-up and pass it (or an `Arc` of it) to the
/// code that needs configuration.
///
/// ## Example
///
/// ```no_run
/// use dragon_conf::{ConfigSource, Registry};
///
/// let registry = Registry::new();
///
/// // First call loads and parses the file.
/// let main = registry.get_or_create(Some("main"), "HJSON", ConfigSource::file("/etc/app.hjson"))?;
///
/// // Later calls only need the tag.
/// let again = registry.instance("main")?;
/// assert!(std::sync::Arc::ptr_eq(&main, &again));
/// # Ok::<(), dragon_conf::ConfigError>(())
/// ```
#[derive(Debug)]
pub struct Registry {
    formats: RwLock<HashMap<String, Arc<dyn Format>>>,
    instances: RwLock<HashMap<String, Arc<Config>>>,
}

impl Registry {
    /// Creates a registry knowing the built-in formats.
    ///
    /// `HJSON`, `hjson`, `JSON` and `json` route to [`HjsonFormat`];
    /// `TOML` and `toml` route to [`TomlFormat`]. Names are case-sensitive.
    pub fn new() -> Self {
        let mut formats: HashMap<String, Arc<dyn Format>> = HashMap::new();
        let hjson: Arc<dyn Format> = Arc::new(HjsonFormat);
        for alias in HJSON_ALIASES {
            formats.insert(alias.to_string(), Arc::clone(&hjson));
        }
        let toml: Arc<dyn Format> = Arc::new(TomlFormat);
        for alias in TOML_ALIASES {
            formats.insert(alias.to_string(), Arc::clone(&toml));
        }

        Self {
            formats: RwLock::new(formats),
            instances: RwLock::new(HashMap::new()),
        }
    }

    /// Registers `format` under `name`, replacing any adapter already there.
    pub fn register_format(&self, name: impl Into<String>, format: Arc<dyn Format>) {
        let name = name.into();
        debug!(name = %name, format = format.name(), "config format registered");
        self.formats.write().insert(name, format);
    }

    /// Looks up the adapter registered under `name`.
    pub fn format(&self, name: &str) -> Result<Arc<dyn Format>, ConfigError> {
        self.formats
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| ConfigError::Usage(format!("unknown configuration format: {name}")))
    }

    /// Returns the instance cached under `tag`.
    ///
    /// Fails with [`ConfigError::Usage`] if nothing was built under `tag` yet:
    /// the first request for a tag has to go through
    /// [`get_or_create`](Self::get_or_create) with a format and a source.
    pub fn instance(&self, tag: &str) -> Result<Arc<Config>, ConfigError> {
        check_tag(tag)?;
        self.cached(tag).ok_or_else(|| {
            ConfigError::Usage(format!(
                "no config cached under tag '{tag}', a format is required on first use"
            ))
        })
    }

    /// Returns the instance cached under `tag`, or builds one.
    ///
    /// On a cache hit `format` and `source` are ignored. Otherwise the format
    /// is resolved, the document loaded, and the new instance stored under
    /// `tag`. If another caller stored an instance for the same tag while this
    /// one was loading, that instance wins and is returned instead.
    ///
    /// With `tag` set to `None` a new, unshared instance is built every time.
    pub fn get_or_create(
        &self,
        tag: Option<&str>,
        format: &str,
        source: ConfigSource,
    ) -> Result<Arc<Config>, ConfigError> {
        if let Some(tag) = tag {
            check_tag(tag)?;
            if let Some(config) = self.cached(tag) {
                debug!(tag, "config cache hit");
                return Ok(config);
            }
        }

        let format = self.format(format)?;
        // Loading happens outside the lock so slow files do not stall other tags.
        let config = Arc::new(Config::load(format, source)?);

        let Some(tag) = tag else {
            return Ok(config);
        };

        let mut instances = self.instances.write();
        let stored = instances
            .entry(tag.to_string())
            .or_insert_with(|| {
                debug!(tag, "config cached");
                config
            });
        Ok(Arc::clone(stored))
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.instances.read().contains_key(tag)
    }

    /// Tags with a cached instance, in no particular order.
    pub fn tags(&self) -> Vec<String> {
        self.instances.read().keys().cloned().collect()
    }

    pub fn len(&self) -> usize {
        self.instances.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.read().is_empty()
    }

    fn cached(&self, tag: &str) -> Option<Arc<Config>> {
        self.instances.read().get(tag).cloned()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

fn check_tag(tag: &str) -> Result<(), ConfigError> {
    if tag.is_empty() {
        return Err(ConfigError::Usage("tag must not be empty".to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Table, Value};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn table(key: &str, value: impl Into<Value>) -> ConfigSource {
        let mut table = Table::new();
        table.insert(key.to_string(), value.into());
        ConfigSource::Table(table)
    }

    #[test]
    fn test_untagged_with_table() {
        let registry = Registry::new();
        let config = registry
            .get_or_create(None, "HJSON", table("test", "test"))
            .unwrap();

        assert_eq!(config.get_string(&["test"]).unwrap(), "test");
        assert!(registry.is_empty());
    }

    #[test]
    fn test_untagged_never_cached() {
        let registry = Registry::new();
        let first = registry.get_or_create(None, "json", table("k", 1i64)).unwrap();
        let second = registry.get_or_create(None, "json", table("k", 1i64)).unwrap();

        assert!(!Arc::ptr_eq(&first, &second));
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn test_tag_returns_cached_instance() {
        let registry = Registry::new();
        let first = registry
            .get_or_create(Some("testtag"), "HJSON", table("test", "test"))
            .unwrap();
        let by_tag = registry.instance("testtag").unwrap();

        assert!(Arc::ptr_eq(&first, &by_tag));
        assert!(registry.contains("testtag"));
        assert_eq!(registry.tags(), vec!["testtag".to_string()]);
    }

    #[test]
    fn test_cache_hit_ignores_other_arguments() {
        let registry = Registry::new();
        let first = registry
            .get_or_create(Some("main"), "hjson", table("k", "first"))
            .unwrap();
        // Unknown format and a broken document would both fail on a miss.
        let second = registry
            .get_or_create(Some("main"), "no_such_format", ConfigSource::bytes("{broken"))
            .unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.get_string(&["k"]).unwrap(), "first");
    }

    #[test]
    fn test_tags_are_independent() {
        let registry = Registry::new();
        let a = registry.get_or_create(Some("a"), "json", table("k", "a")).unwrap();
        let b = registry.get_or_create(Some("b"), "json", table("k", "b")).unwrap();

        assert!(!Arc::ptr_eq(&a, &b));
        assert_eq!(registry.instance("b").unwrap().get_string(&["k"]).unwrap(), "b");
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_unknown_format() {
        let registry = Registry::new();
        let result = registry.get_or_create(None, "non_existing_format", table("k", 1i64));
        assert!(matches!(result, Err(ConfigError::Usage(ref msg)) if msg.contains("non_existing_format")));
    }

    #[test]
    fn test_format_names_are_case_sensitive() {
        let registry = Registry::new();
        for name in ["HJSON", "hjson", "JSON", "json", "TOML", "toml"] {
            assert!(registry.format(name).is_ok(), "{name} should be known");
        }
        assert!(matches!(registry.format("Json"), Err(ConfigError::Usage(_))));
        assert!(matches!(registry.format("HJson"), Err(ConfigError::Usage(_))));
    }

    #[test]
    fn test_instance_without_cached_tag() {
        let registry = Registry::new();
        assert!(matches!(registry.instance("missing"), Err(ConfigError::Usage(_))));
    }

    #[test]
    fn test_empty_tag() {
        let registry = Registry::new();
        assert!(matches!(
            registry.get_or_create(Some(""), "json", table("k", 1i64)),
            Err(ConfigError::Usage(_))
        ));
        assert!(matches!(registry.instance(""), Err(ConfigError::Usage(_))));
    }

    #[test]
    fn test_failed_construction_is_not_cached() {
        let registry = Registry::new();
        let result = registry.get_or_create(Some("main"), "json", ConfigSource::bytes("{\"k\": "));
        assert!(matches!(result, Err(ConfigError::Parse { .. })));
        assert!(!registry.contains("main"));

        let config = registry
            .get_or_create(Some("main"), "json", ConfigSource::bytes("{\"k\": \"ok\"}"))
            .unwrap();
        assert_eq!(config.get_string(&["k"]).unwrap(), "ok");
    }

    #[test]
    fn test_load_file_through_registry() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "{{\"section\": {{\"value\": \"from file\"}}}}").unwrap();

        let registry = Registry::new();
        let config = registry
            .get_or_create(Some("file"), "HJSON", ConfigSource::file(file.path()))
            .unwrap();

        assert_eq!(config.get_string(&["section", "value"]).unwrap(), "from file");
        assert_eq!(config.source().as_deref(), Some(file.path()));
        config.check_external().unwrap();
    }

    #[test]
    fn test_missing_file_through_registry() {
        let registry = Registry::new();
        let result = registry.get_or_create(
            Some("main"),
            "HJSON",
            ConfigSource::file("/hjson_not_existing_awful_filename"),
        );
        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_toml_format() {
        let registry = Registry::new();
        let config = registry
            .get_or_create(None, "toml", ConfigSource::bytes("[server]\nport = 8080\n"))
            .unwrap();
        assert_eq!(config.get_int(&["server", "port"]).unwrap(), 8080);
    }

    #[test]
    fn test_register_custom_format() {
        #[derive(Debug)]
        struct Fixed;

        impl Format for Fixed {
            fn name(&self) -> &str {
                "fixed"
            }

            fn parse(&self, _bytes: &[u8]) -> Result<Table, ConfigError> {
                let mut table = Table::new();
                table.insert("fixed".into(), Value::Boolean(true));
                Ok(table)
            }
        }

        let registry = Registry::new();
        assert!(registry.format("fixed").is_err());
        registry.register_format("fixed", Arc::new(Fixed));

        let config = registry
            .get_or_create(None, "fixed", ConfigSource::bytes("anything"))
            .unwrap();
        assert!(config.get_bool(&["fixed"]).unwrap());
        assert_eq!(config.format().name(), "fixed");
    }

    #[test]
    fn test_concurrent_first_writer_wins() {
        let registry = Registry::new();

        let configs: Vec<Arc<Config>> = std::thread::scope(|s| {
            let handles: Vec<_> = (0..8)
                .map(|i| {
                    let registry = &registry;
                    s.spawn(move || {
                        registry
                            .get_or_create(Some("shared"), "json", table("writer", i as i64))
                            .unwrap()
                    })
                })
                .collect();
            handles.into_iter().map(|h| h.join().unwrap()).collect()
        });

        let cached = registry.instance("shared").unwrap();
        for config in &configs {
            assert!(Arc::ptr_eq(config, &cached));
        }
        assert_eq!(registry.len(), 1);
    }
}
