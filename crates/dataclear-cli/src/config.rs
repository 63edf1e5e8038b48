use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

/// Config file looked up in the working directory when `--config` is absent.
pub const DEFAULT_CONFIG_FILE: &str = "dataclear.toml";
const DEFAULT_RUN_DIR: &str = "runs";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("config file {} not found", .0.display())]
    NotFound(PathBuf),
    #[error("could not read {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("could not parse {}: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
    #[error(
        "connection string is required (pass --conn, set `connection` in {DEFAULT_CONFIG_FILE}, or export DATABASE_URL)"
    )]
    MissingConnection,
}

/// Contents of `dataclear.toml`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FileConfig {
    pub connection: Option<String>,
    pub keep: Vec<String>,
    pub schemas: Vec<String>,
    pub include_system_schemas: bool,
    pub run_dir: Option<PathBuf>,
}

/// Values given on the command line; `None`/empty means "not given".
#[derive(Debug, Clone, Default)]
pub struct CliOverrides {
    pub conn: Option<String>,
    pub conn_pos: Option<String>,
    pub keep: Vec<String>,
    pub schemas: Vec<String>,
    pub include_system_schemas: bool,
    pub run_dir: Option<PathBuf>,
}

/// Effective settings for one invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub connection: String,
    pub keep: Vec<String>,
    pub schemas: Vec<String>,
    pub include_system_schemas: bool,
    pub run_dir: PathBuf,
}

/// Load the explicit config file, or the default one when it exists.
pub fn load_config(explicit: Option<&Path>) -> Result<FileConfig, ConfigError> {
    let path = match explicit {
        Some(path) if !path.exists() => return Err(ConfigError::NotFound(path.to_path_buf())),
        Some(path) => path.to_path_buf(),
        None => {
            let path = PathBuf::from(DEFAULT_CONFIG_FILE);
            if !path.exists() {
                return Ok(FileConfig::default());
            }
            path
        }
    };

    let content = std::fs::read_to_string(&path).map_err(|source| ConfigError::Read {
        path: path.clone(),
        source,
    })?;
    parse_config(&content).map_err(|source| ConfigError::Parse { path, source })
}

pub fn parse_config(content: &str) -> Result<FileConfig, toml::de::Error> {
    toml::from_str(content)
}

/// Merge command line, config file and environment.
///
/// The connection string comes from the first non-blank of: `--conn`, the
/// positional argument, the config file, `env_url`. List options extend the
/// file's lists.
pub fn resolve_settings(
    cli: CliOverrides,
    file: FileConfig,
    env_url: Option<String>,
) -> Result<Settings, ConfigError> {
    let connection = non_blank(cli.conn)
        .or_else(|| non_blank(cli.conn_pos))
        .or_else(|| non_blank(file.connection))
        .or_else(|| non_blank(env_url))
        .ok_or(ConfigError::MissingConnection)?;

    let mut keep = file.keep;
    keep.extend(cli.keep);
    let mut schemas = file.schemas;
    for schema in cli.schemas {
        if !schemas.contains(&schema) {
            schemas.push(schema);
        }
    }

    Ok(Settings {
        connection,
        keep,
        schemas,
        include_system_schemas: cli.include_system_schemas || file.include_system_schemas,
        run_dir: cli
            .run_dir
            .or(file.run_dir)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_RUN_DIR)),
    })
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|value| !value.trim().is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
connection = "postgres://app@localhost/shop"
keep = ["users", "audit.events"]
schemas = ["public"]
run_dir = "var/runs"
"#;

    #[test]
    fn parses_config_file() {
        let config = parse_config(SAMPLE).unwrap();
        assert_eq!(
            config.connection.as_deref(),
            Some("postgres://app@localhost/shop")
        );
        assert_eq!(config.keep, vec!["users", "audit.events"]);
        assert_eq!(config.schemas, vec!["public"]);
        assert!(!config.include_system_schemas);
        assert_eq!(config.run_dir, Some(PathBuf::from("var/runs")));
    }

    #[test]
    fn rejects_unknown_keys() {
        assert!(parse_config("keep = []\ncascade = true\n").is_err());
    }

    #[test]
    fn flag_beats_positional_file_and_env() {
        let cli = CliOverrides {
            conn: Some("postgres://flag/db".to_string()),
            conn_pos: Some("postgres://positional/db".to_string()),
            ..CliOverrides::default()
        };
        let settings = resolve_settings(
            cli,
            parse_config(SAMPLE).unwrap(),
            Some("postgres://env/db".to_string()),
        )
        .unwrap();
        assert_eq!(settings.connection, "postgres://flag/db");
    }

    #[test]
    fn falls_back_to_file_then_env() {
        let settings = resolve_settings(
            CliOverrides::default(),
            parse_config(SAMPLE).unwrap(),
            Some("postgres://env/db".to_string()),
        )
        .unwrap();
        assert_eq!(settings.connection, "postgres://app@localhost/shop");
        assert_eq!(settings.run_dir, PathBuf::from("var/runs"));

        let settings = resolve_settings(
            CliOverrides::default(),
            FileConfig::default(),
            Some("postgres://env/db".to_string()),
        )
        .unwrap();
        assert_eq!(settings.connection, "postgres://env/db");
        assert_eq!(settings.run_dir, PathBuf::from("runs"));
    }

    #[test]
    fn blank_connections_fall_through_to_env() {
        let cli = CliOverrides {
            conn: Some(String::new()),
            ..CliOverrides::default()
        };
        let file = parse_config("connection = \"  \"\n").unwrap();
        let settings =
            resolve_settings(cli, file, Some("postgres://env/db".to_string())).unwrap();
        assert_eq!(settings.connection, "postgres://env/db");

        let err = resolve_settings(
            CliOverrides::default(),
            FileConfig::default(),
            Some(" ".to_string()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingConnection));
    }

    #[test]
    fn missing_connection_is_an_error() {
        let err = resolve_settings(CliOverrides::default(), FileConfig::default(), None)
            .unwrap_err();
        assert!(matches!(err, ConfigError::MissingConnection));
    }

    #[test]
    fn command_line_lists_extend_file_lists() {
        let cli = CliOverrides {
            keep: vec!["sessions".to_string()],
            schemas: vec!["public".to_string(), "billing".to_string()],
            include_system_schemas: true,
            ..CliOverrides::default()
        };
        let settings = resolve_settings(cli, parse_config(SAMPLE).unwrap(), None).unwrap();
        assert_eq!(settings.keep, vec!["users", "audit.events", "sessions"]);
        assert_eq!(settings.schemas, vec!["public", "billing"]);
        assert!(settings.include_system_schemas);
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        let err = load_config(Some(Path::new("/nonexistent/dataclear.toml"))).unwrap_err();
        assert!(matches!(err, ConfigError::NotFound(_)));
    }
}
