//! Config command implementation.
//!
//! View and manage configuration settings.
//! Config file is located at ~/.config/nq/config.toml.

use std::env;
use std::fs;
use std::path::PathBuf;

use directories::BaseDirs;
use notes_query_rs::EngineConfig;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{CommandContext, CommandError, DateFormat, Result};

/// Current config file version. Increment when making breaking changes to schema.
const CONFIG_VERSION: u32 = 1;

/// Environment variable overriding the config file location.
pub const CONFIG_ENV: &str = "NQ_CONFIG";

/// Configuration file structure.
#[derive(Debug, Serialize, Deserialize)]
pub struct Config {
    /// Config schema version for migrations.
    /// Defaults to current version when not present in file.
    #[serde(default = "default_version")]
    pub version: u32,

    /// Query engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Output settings.
    #[serde(default)]
    pub output: OutputConfig,
}

/// Returns the current config version (used by serde default).
fn default_version() -> u32 {
    CONFIG_VERSION
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            engine: EngineConfig::default(),
            output: OutputConfig::default(),
        }
    }
}

/// Output configuration.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct OutputConfig {
    /// Enable colors.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub color: Option<bool>,

    /// Date format: "relative", "iso" or "short".
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date_format: Option<String>,
}

/// Gets the config file path.
///
/// `NQ_CONFIG` wins, then `$XDG_CONFIG_HOME/nq/config.toml`, then
/// `~/.config/nq/config.toml` on all platforms.
pub fn get_config_path() -> Result<PathBuf> {
    if let Ok(path) = env::var(CONFIG_ENV) {
        return Ok(PathBuf::from(path));
    }

    if let Ok(xdg_config) = env::var("XDG_CONFIG_HOME") {
        return Ok(PathBuf::from(xdg_config).join("nq").join("config.toml"));
    }

    BaseDirs::new()
        .map(|dirs| dirs.home_dir().join(".config").join("nq").join("config.toml"))
        .ok_or_else(|| CommandError::Config("Could not determine config directory".to_string()))
}

/// Wraps a failure in `action` as a [`CommandError::Config`].
fn config_failure<E: std::fmt::Display>(action: &'static str) -> impl FnOnce(E) -> CommandError {
    move |e| CommandError::Config(format!("could not {action} {e}"))
}

/// Loads the configuration from disk, or the defaults when no file exists.
pub fn load_config() -> Result<Config> {
    let path = get_config_path()?;
    if !path.is_file() {
        debug!(path = %path.display(), "No config file, using defaults");
        return Ok(Config::default());
    }

    let text = fs::read_to_string(&path).map_err(config_failure("read config:"))?;
    let parsed = toml::from_str::<Config>(&text).map_err(config_failure("parse config:"))?;
    migrate_config(parsed)
}

/// Brings a loaded config up to [`CONFIG_VERSION`].
///
/// Version 1 is the initial schema, so there is nothing to rewrite yet.
fn migrate_config(mut config: Config) -> Result<Config> {
    if config.version > CONFIG_VERSION {
        debug!(
            found = config.version,
            current = CONFIG_VERSION,
            "Config written by a newer nq"
        );
    }
    config.version = CONFIG_VERSION;
    Ok(config)
}

/// Writes `config` to its path, creating parent directories as needed.
fn save_config(config: &Config) -> Result<PathBuf> {
    let path = get_config_path()?;
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir).map_err(config_failure("create config directory:"))?;
    }

    let text = toml::to_string_pretty(config).map_err(config_failure("serialize config:"))?;
    fs::write(&path, text).map_err(config_failure("write config:"))?;
    Ok(path)
}

/// The location report shared by `config show` and `config path`.
fn location_json(path: &std::path::Path) -> serde_json::Value {
    serde_json::json!({
        "path": path.display().to_string(),
        "exists": path.exists(),
    })
}

/// Executes the config show command.
pub fn execute_show(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;
    let config = load_config()?;

    if ctx.json_output {
        let mut report = location_json(&path);
        report["config"] = serde_json::to_value(&config)?;
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }
    if ctx.quiet {
        return Ok(());
    }

    use owo_colors::OwoColorize;

    let title = format!("nq configuration ({})", path.display());
    if ctx.use_colors {
        println!("{}", title.green().bold());
    } else {
        println!("{title}");
    }
    if !path.exists() {
        println!("(file not written yet; showing defaults)");
    }

    let engine = &config.engine;
    println!("\n[engine]");
    println!("  enable_cache = {}", engine.enable_cache);
    println!("  cache_ttl_ms = {}", engine.cache_ttl_ms);
    println!("  max_cache_size = {}", engine.max_cache_size);
    println!("  enable_optimization = {}", engine.enable_optimization);
    println!("  index_threshold = {}", engine.index_threshold);
    println!("  max_execution_time_ms = {}", engine.max_execution_time_ms);

    println!("\n[output]");
    let color = config.output.color.map_or("auto".to_string(), |c| c.to_string());
    println!("  color = {color}");
    println!(
        "  date_format = {}",
        config.output.date_format.as_deref().unwrap_or("relative")
    );

    Ok(())
}

/// Options for the config set command.
pub struct ConfigSetOptions {
    /// Configuration key.
    pub key: String,
    /// Configuration value.
    pub value: String,
}

/// Keys accepted by `config set`.
const VALID_KEYS: &str = "engine.enable_cache, engine.cache_ttl_ms, engine.max_cache_size, \
engine.enable_optimization, engine.index_threshold, engine.max_execution_time_ms, \
output.color, output.date_format";

/// Applies one `section.field = value` assignment to `config`.
fn apply_setting(config: &mut Config, key: &str, value: &str) -> Result<()> {
    let (section, field) = key.split_once('.').unwrap_or(("", key));
    let engine = &mut config.engine;

    match (section, field) {
        ("engine", "enable_cache") => engine.enable_cache = parse_bool(value)?,
        ("engine", "cache_ttl_ms") => engine.cache_ttl_ms = parse_number(key, value)?,
        ("engine", "max_cache_size") => engine.max_cache_size = parse_number(key, value)?,
        ("engine", "enable_optimization") => engine.enable_optimization = parse_bool(value)?,
        ("engine", "index_threshold") => engine.index_threshold = parse_number(key, value)?,
        ("engine", "max_execution_time_ms") => {
            engine.max_execution_time_ms = parse_number(key, value)?
        }
        ("output", "color") => config.output.color = Some(parse_bool(value)?),
        ("output", "date_format") => {
            if DateFormat::parse(value).is_none() {
                return Err(CommandError::Config(format!(
                    "Invalid date_format value '{}'. Valid values: {}",
                    value,
                    DateFormat::NAMES.join(", ")
                )));
            }
            config.output.date_format = Some(value.to_string());
        }
        _ => {
            return Err(CommandError::Config(format!(
                "Unknown config key '{}'. Valid keys: {}",
                key, VALID_KEYS
            )));
        }
    }

    Ok(())
}

/// Executes the config set command.
pub fn execute_set(ctx: &CommandContext, opts: &ConfigSetOptions) -> Result<()> {
    let mut config = load_config()?;
    apply_setting(&mut config, &opts.key, &opts.value)?;
    let path = save_config(&config)?;

    if ctx.json_output {
        let mut report = location_json(&path);
        report["key"] = opts.key.clone().into();
        report["value"] = opts.value.clone().into();
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if !ctx.quiet {
        println!("{} = {}", opts.key, opts.value);
    }

    Ok(())
}

/// Executes the config path command.
pub fn execute_path(ctx: &CommandContext) -> Result<()> {
    let path = get_config_path()?;

    if ctx.json_output {
        println!("{}", serde_json::to_string_pretty(&location_json(&path))?);
    } else {
        println!("{}", path.display());
    }

    Ok(())
}

/// Accepts true/false, yes/no, on/off and 1/0 in any case.
fn parse_bool(raw: &str) -> Result<bool> {
    const TRUE: [&str; 4] = ["true", "yes", "on", "1"];
    const FALSE: [&str; 4] = ["false", "no", "off", "0"];

    let lowered = raw.trim().to_ascii_lowercase();
    if TRUE.contains(&lowered.as_str()) {
        Ok(true)
    } else if FALSE.contains(&lowered.as_str()) {
        Ok(false)
    } else {
        Err(CommandError::Config(format!(
            "'{raw}' is not a boolean (expected one of {} or {})",
            TRUE.join("/"),
            FALSE.join("/")
        )))
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, s: &str) -> Result<T> {
    s.trim().parse().map_err(|_| {
        CommandError::Config(format!(
            "Invalid value '{}' for {}. Expected a non-negative integer",
            s, key
        ))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use tempfile::TempDir;

    /// Points `NQ_CONFIG` at a file inside a fresh temp dir for one test.
    struct ConfigEnv {
        dir: TempDir,
        previous: Option<String>,
    }

    impl ConfigEnv {
        fn new() -> Self {
            let dir = TempDir::new().unwrap();
            let previous = env::var(CONFIG_ENV).ok();
            env::set_var(CONFIG_ENV, dir.path().join("nested").join("config.toml"));
            Self { dir, previous }
        }

        fn path(&self) -> PathBuf {
            self.dir.path().join("nested").join("config.toml")
        }
    }

    impl Drop for ConfigEnv {
        fn drop(&mut self) {
            match &self.previous {
                Some(value) => env::set_var(CONFIG_ENV, value),
                None => env::remove_var(CONFIG_ENV),
            }
        }
    }

    fn quiet_ctx() -> CommandContext {
        CommandContext {
            json_output: false,
            use_colors: false,
            quiet: true,
            verbose: false,
            date_format: DateFormat::default(),
        }
    }

    #[test]
    fn test_parse_bool_values() {
        for value in ["true", "True", "yes", "1", "on"] {
            assert!(parse_bool(value).unwrap(), "{}", value);
        }
        for value in ["false", "FALSE", "no", "0", "off"] {
            assert!(!parse_bool(value).unwrap(), "{}", value);
        }
        assert!(parse_bool("maybe").is_err());
        assert!(parse_bool("").is_err());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.engine, EngineConfig::default());
        assert!(config.output.color.is_none());
    }

    #[test]
    fn test_config_deserialization() {
        let toml_str = r#"
version = 1

[engine]
enable_cache = false
max_cache_size = 10

[output]
color = false
date_format = "iso"
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(!config.engine.enable_cache);
        assert_eq!(config.engine.max_cache_size, 10);
        assert_eq!(config.engine.cache_ttl_ms, EngineConfig::default().cache_ttl_ms);
        assert_eq!(config.output.color, Some(false));
        assert_eq!(config.output.date_format.as_deref(), Some("iso"));
    }

    #[test]
    fn test_config_deserialization_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert_eq!(config.version, CONFIG_VERSION);
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    fn test_config_serialization_has_sections() {
        let toml_str = toml::to_string_pretty(&Config::default()).unwrap();
        assert!(toml_str.contains("version = 1"));
        assert!(toml_str.contains("[engine]"));
        assert!(toml_str.contains("max_cache_size = 100"));
    }

    #[test]
    fn test_migrate_config_stamps_current_version() {
        let config = Config {
            version: 999,
            ..Config::default()
        };
        assert_eq!(migrate_config(config).unwrap().version, CONFIG_VERSION);
    }

    #[test]
    fn test_apply_setting() {
        let mut config = Config::default();
        apply_setting(&mut config, "engine.enable_cache", "off").unwrap();
        apply_setting(&mut config, "engine.max_cache_size", "25").unwrap();
        apply_setting(&mut config, "engine.cache_ttl_ms", "1000").unwrap();
        apply_setting(&mut config, "output.date_format", "short").unwrap();

        assert!(!config.engine.enable_cache);
        assert_eq!(config.engine.max_cache_size, 25);
        assert_eq!(config.engine.cache_ttl_ms, 1000);
        assert_eq!(config.output.date_format.as_deref(), Some("short"));
    }

    #[test]
    fn test_apply_setting_rejects_bad_input() {
        let mut config = Config::default();
        assert!(apply_setting(&mut config, "engine.max_cache_size", "-1").is_err());
        assert!(apply_setting(&mut config, "output.date_format", "fancy").is_err());
        assert!(apply_setting(&mut config, "engine.nope", "1").is_err());
        assert!(apply_setting(&mut config, "color", "true").is_err());
    }

    #[test]
    #[serial]
    fn test_config_path_honors_env_override() {
        let env = ConfigEnv::new();
        assert_eq!(get_config_path().unwrap(), env.path());
    }

    #[test]
    #[serial]
    fn test_load_missing_config_gives_defaults() {
        let _env = ConfigEnv::new();
        let config = load_config().unwrap();
        assert_eq!(config.engine, EngineConfig::default());
    }

    #[test]
    #[serial]
    fn test_set_then_load() {
        let env = ConfigEnv::new();
        let opts = ConfigSetOptions {
            key: "engine.index_threshold".to_string(),
            value: "7".to_string(),
        };
        execute_set(&quiet_ctx(), &opts).unwrap();

        assert!(env.path().exists());
        let config = load_config().unwrap();
        assert_eq!(config.engine.index_threshold, 7);
        assert!(config.engine.enable_cache);
    }

    #[test]
    #[serial]
    fn test_load_invalid_toml_is_config_error() {
        let env = ConfigEnv::new();
        fs::create_dir_all(env.path().parent().unwrap()).unwrap();
        fs::write(env.path(), "[engine\n").unwrap();

        assert!(matches!(load_config(), Err(CommandError::Config(_))));
    }
}
