//! Multi-server configuration.
//!
//! A config file holds a `default` section and a list of `servers`. Each
//! server entry is laid over the default key by key; nested values such as
//! `aliases` are replaced whole, never merged.
//!
//! ```yaml
//! default:
//!   email: me@example.org
//!   project: home
//!   columns: [gender, age]
//!   aliases:
//!     specimen_id/donor_sex: gender
//!   custom_columns: {}
//! servers:
//!   - host: http://lab-a.example.org/labkey/
//!     custom_columns: {site: a}
//! ```

use std::{collections::BTreeMap, env, fs, path::PathBuf, str::FromStr, sync::OnceLock};

use log::info;
use regex::{Captures, Regex};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::{alias::Aliases, connection::Connection, Error, Result};

static ENV_VAR: OnceLock<Regex> = OnceLock::new();

/// Settings for one server. Every key is optional until merged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
    pub project: Option<String>,
    pub schema: Option<String>,
    pub query_name: Option<String>,
    pub columns: Option<Vec<String>>,
    pub aliases: Option<BTreeMap<String, String>>,
    pub custom_columns: Option<Map<String, Value>>,
}

impl ServerConfig {
    /// `overrides` wins for every key it sets.
    pub fn merge(&self, overrides: &ServerConfig) -> ServerConfig {
        let overrides = overrides.clone();
        let defaults = self.clone();
        ServerConfig {
            host: overrides.host.or(defaults.host),
            email: overrides.email.or(defaults.email),
            password: overrides.password.or(defaults.password),
            project: overrides.project.or(defaults.project),
            schema: overrides.schema.or(defaults.schema),
            query_name: overrides.query_name.or(defaults.query_name),
            columns: overrides.columns.or(defaults.columns),
            aliases: overrides.aliases.or(defaults.aliases),
            custom_columns: overrides.custom_columns.or(defaults.custom_columns),
        }
    }

    pub fn into_connection(self) -> Result<Connection> {
        let columns = self.columns.ok_or_else(|| missing("columns"))?;
        let aliases = self.aliases.ok_or_else(|| missing("aliases"))?;
        let custom_columns = self.custom_columns.ok_or_else(|| missing("custom_columns"))?;

        Connection::builder()
            .host(&self.host.ok_or_else(|| missing("host"))?)
            .email(&self.email.ok_or_else(|| missing("email"))?)
            .password(&self.password.ok_or_else(|| missing("password"))?)
            .project(&self.project.ok_or_else(|| missing("project"))?)
            .schema(&self.schema.ok_or_else(|| missing("schema"))?)
            .query_name(&self.query_name.ok_or_else(|| missing("query_name"))?)
            .columns(columns)
            .aliases(Aliases::from(aliases))
            .custom_columns(custom_columns)
            .build()
    }
}

fn missing(key: &str) -> Error {
    Error::Config(format!("missing required key `{}`", key))
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigFile {
    #[serde(default)]
    pub default: ServerConfig,
    pub servers: Vec<ServerConfig>,
}

impl ConfigFile {
    pub fn load(path: &str) -> Result<Self> {
        let path = PathBuf::from(expand_env_vars(path));
        let yaml = fs::read_to_string(&path).map_err(|source| Error::ConfigRead {
            path: path.clone(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        yaml.parse()
    }

    /// Each server merged over the default section.
    pub fn merged(&self) -> Vec<ServerConfig> {
        self.servers
            .iter()
            .map(|server| self.default.merge(server))
            .collect()
    }

    pub fn connections(&self) -> Result<Vec<Connection>> {
        self.merged()
            .into_iter()
            .enumerate()
            .map(|(i, server)| {
                server.into_connection().map_err(|e| match e {
                    Error::Config(msg) => Error::Config(format!("servers[{}]: {}", i, msg)),
                    other => other,
                })
            })
            .collect()
    }
}

impl FromStr for ConfigFile {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Ok(serde_yaml::from_str(s)?)
    }
}

/// Reads a config file and builds one connection per server.
pub fn load_connections(path: &str) -> Result<Vec<Connection>> {
    ConfigFile::load(path)?.connections()
}

/// Replaces `$NAME` and `${NAME}` with the environment value. Unset
/// variables are left as written.
pub fn expand_env_vars(input: &str) -> String {
    let pattern = ENV_VAR.get_or_init(|| {
        Regex::new(r"\$(?:\{([^}]+)\}|(\w+))").expect("environment variable pattern is valid")
    });

    pattern
        .replace_all(input, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            env::var(name).unwrap_or_else(|_| caps[0].to_owned())
        })
        .into_owned()
}
