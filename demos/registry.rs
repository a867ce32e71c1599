use dragon_conf::{ConfigSource, Registry};
use serde::Deserialize;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Deserialize)]
#[allow(dead_code)]
struct DatabaseSection {
    host: String,
    port: u16,
    name: String,
}

fn main() -> Result<(), dragon_conf::ConfigError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    // Built once at start-up and passed around by reference.
    let registry = Registry::new();

    let config = registry.get_or_create(
        Some("main"),
        "HJSON",
        ConfigSource::file("demos/app.hjson"),
    )?;
    println!(
        "App: {} (debug={})",
        config.get_string(&["app", "name"])?,
        config.get_bool(&["app", "debug"])?
    );

    // Elsewhere in the program, the tag alone is enough.
    let database = registry.instance("main")?.subconfig(&["database"])?;
    let section: DatabaseSection = database.deserialize()?;
    println!("Database: {}:{}", section.host, database.get_int(&["port"])?);

    match config.get_value(&["app", "missing"]) {
        Ok(value) => println!("unexpected value: {value:?}"),
        Err(e) => println!("lookup failed as expected: {e}"),
    }

    config.check_external()?;
    config.reload()?;

    Ok(())
}
