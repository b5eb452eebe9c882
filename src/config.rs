//! Configuration management
//!
//! The inventory document is one YAML file with four sections: `root_key`,
//! `people`, `groups`, and `servers`, plus an optional `output` section.
//! People and servers render in the order the document declares them, so the
//! mappings are kept as ordered entry lists (see [`ordered_map`]) instead of
//! hash maps.

use std::{env, fs, path::Path};

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::access::AccessSpec;
use crate::keys::{KeyRef, KeySpec};
use crate::{Error, Result};

/// Main configuration: the parsed inventory document
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Deployment identity appended to every authorized_keys file
    pub root_key: RootKeyConfig,
    /// People, in declaration order
    #[serde(with = "ordered_map")]
    pub people: Vec<(String, Person)>,
    /// Named groups of server identifiers, in declaration order
    #[serde(with = "ordered_map")]
    pub groups: Vec<(String, Vec<String>)>,
    /// Servers, in declaration order
    #[serde(with = "ordered_map")]
    pub servers: Vec<(String, Server)>,
    /// Output configuration
    pub output: OutputConfig,
}

/// Deployment identity configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct RootKeyConfig {
    /// Key reference: literal key material or a path to a key file
    pub public: String,
}

/// A person in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Person {
    /// Key references: literal key material or paths, scalar or list
    pub keys: KeySpec,
    /// Whether this person's keys are deployed at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Servers and groups this person may reach
    #[serde(default)]
    pub access: AccessSpec,
}

/// A server in the inventory
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Server {
    /// Address for the generated `HostName` line
    pub hostname: String,
    /// Login user for the generated `User` line
    pub user: String,
    /// Optional SSH port; omitted from output when unset
    #[serde(default)]
    pub port: Option<u16>,
    /// Whether this server is generated at all
    #[serde(default = "default_true")]
    pub enabled: bool,
    /// Service the downstream pipeline restarts after deployment
    #[serde(default)]
    pub restart_service: Option<String>,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    /// Directory the generated files are written to
    pub directory: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: "generated".to_string(),
        }
    }
}

fn default_true() -> bool {
    true
}

impl Config {
    /// Load the inventory document from a YAML file.
    ///
    /// Expands `~` and `${VAR}` / `${VAR:-default}` in path-like values and
    /// eagerly validates the root key, so a run fails here rather than
    /// halfway through generation.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if the file is missing or unparsable or the
    /// deployment identity is absent, and [`Error::RootKey`] if the identity
    /// points to a missing file or resolves to empty key material.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::Config(format!(
                "Config file not found: {}",
                path.display()
            )));
        }

        let raw = fs::read_to_string(path)?;
        let mut config: Self =
            serde_yaml::from_str(&raw).map_err(|e| Error::Config(e.to_string()))?;

        config.expand_refs();
        config.validate_root_key()?;

        Ok(config)
    }

    /// Expand `~` and `${VAR}` patterns in every path-like value.
    ///
    /// Literal key material (an `ssh-` prefixed reference) is left untouched.
    fn expand_refs(&mut self) {
        // Pattern: ${VAR} or ${VAR:-default}
        let re = Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)(?::-([^}]*))?\}").unwrap();

        let expand = |raw: &str| -> String {
            if matches!(KeyRef::classify(raw), KeyRef::Literal(_)) {
                raw.to_string()
            } else {
                expand_tilde(&Self::expand_string(&re, raw))
            }
        };

        self.root_key.public = expand(&self.root_key.public);
        for (_, person) in &mut self.people {
            person.keys.rewrite_refs(&expand);
        }
        self.output.directory = expand_tilde(&Self::expand_string(&re, &self.output.directory));
    }

    /// Expand environment variables in a string
    fn expand_string(re: &Regex, value: &str) -> String {
        re.replace_all(value, |caps: &regex::Captures| {
            let var_name = &caps[1];
            let default = caps.get(2).map_or("", |m| m.as_str());
            env::var(var_name).unwrap_or_else(|_| default.to_string())
        })
        .into_owned()
    }

    /// Validate the deployment identity before any generation proceeds.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] when `root_key.public` is missing, and
    /// [`Error::RootKey`] when it names a nonexistent file or resolves to
    /// empty key material after trimming.
    pub fn validate_root_key(&self) -> Result<()> {
        if self.root_key.public.trim().is_empty() {
            return Err(Error::Config(
                "root_key.public is required in the config".to_string(),
            ));
        }

        match KeyRef::classify(&self.root_key.public) {
            KeyRef::Path(path) if !path.exists() => Err(Error::RootKey(format!(
                "root key file not found: {}",
                path.display()
            ))),
            keyref => {
                let material = keyref.resolve().map_err(|e| Error::RootKey(e.to_string()))?;
                if material.is_empty() {
                    Err(Error::RootKey(format!(
                        "root key is empty: {}",
                        self.root_key.public
                    )))
                } else {
                    debug!("root key validated");
                    Ok(())
                }
            }
        }
    }

    /// Enabled servers only, in declaration order
    pub fn enabled_servers(&self) -> impl Iterator<Item = (&String, &Server)> {
        self.servers.iter().filter(|(_, s)| s.enabled).map(|(n, s)| (n, s))
    }
}

/// Expand a leading `~` to the user's home directory
fn expand_tilde(value: &str) -> String {
    if value.starts_with('~') {
        if let Some(home) = dirs::home_dir() {
            return value.replacen('~', &home.display().to_string(), 1);
        }
    }
    value.to_string()
}

/// Serde adapter keeping YAML mappings in document order.
///
/// serde's default map handling goes through `HashMap`/`BTreeMap`, which
/// drops the declared iteration order the renderers depend on. This module
/// collects entries into a `Vec<(String, V)>` exactly as the parser streams
/// them.
pub mod ordered_map {
    use std::fmt;
    use std::marker::PhantomData;

    use serde::de::{Deserialize, Deserializer, MapAccess, Visitor};
    use serde::ser::{Serialize, SerializeMap, Serializer};

    /// Serialize the entry list back to a mapping, preserving order.
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the serializer fails.
    pub fn serialize<S, V>(entries: &[(String, V)], serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
        V: Serialize,
    {
        let mut map = serializer.serialize_map(Some(entries.len()))?;
        for (key, value) in entries {
            map.serialize_entry(key, value)?;
        }
        map.end()
    }

    /// Deserialize a mapping into an entry list in document order.
    ///
    /// # Errors
    ///
    /// Returns a deserialization error if the input is not a mapping.
    pub fn deserialize<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
    where
        D: Deserializer<'de>,
        V: Deserialize<'de>,
    {
        struct OrderedVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for OrderedVisitor<V> {
            type Value = Vec<(String, V)>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a mapping")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut access: A) -> Result<Self::Value, A::Error> {
                let mut entries = Vec::with_capacity(access.size_hint().unwrap_or(0));
                while let Some((key, value)) = access.next_entry()? {
                    entries.push((key, value));
                }
                Ok(entries)
            }
        }

        deserializer.deserialize_map(OrderedVisitor(PhantomData))
    }
}
