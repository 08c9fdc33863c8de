//! Typed key-value bag of backend options.
//!
//! Every option is declared as a [`ConfigKey`]: a name plus documentation,
//! a default, and a parse/print codec. A [`Config`] stores raw string
//! values; typed access goes through the key, so an unset key yields its
//! default and a malformed value is a typed error rather than a silent
//! fallback.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::TypeError;

/// Declaration of one configuration option.
pub struct ConfigKey<T> {
    /// Unique option name.
    pub name: &'static str,
    /// Human-readable description.
    pub doc: &'static str,
    /// The value used when the option is unset.
    pub default: fn() -> T,
    /// Parse a raw string into the typed value.
    pub parse: fn(&str) -> Result<T, String>,
    /// Print the typed value back to its raw form.
    pub print: fn(&T) -> String,
}

/// A bag of raw option values, addressed through [`ConfigKey`]s.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    values: BTreeMap<String, String>,
}

impl Config {
    /// An empty config; every key reads as its default.
    pub fn new() -> Self {
        Self::default()
    }

    /// Read a key, falling back to its default when unset.
    pub fn get<T>(&self, key: &ConfigKey<T>) -> Result<T, TypeError> {
        match self.values.get(key.name) {
            Some(raw) => (key.parse)(raw).map_err(|reason| TypeError::InvalidConfigValue {
                key: key.name.to_string(),
                reason,
            }),
            None => Ok((key.default)()),
        }
    }

    /// Set a key to a typed value.
    pub fn set<T>(&mut self, key: &ConfigKey<T>, value: &T) {
        self.values.insert(key.name.to_string(), (key.print)(value));
    }

    /// Returns `true` if the key has an explicit value.
    pub fn is_set<T>(&self, key: &ConfigKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    /// Remove an explicit value, restoring the default.
    pub fn unset<T>(&mut self, key: &ConfigKey<T>) {
        self.values.remove(key.name);
    }
}

fn parse_string(raw: &str) -> Result<String, String> {
    Ok(raw.to_string())
}

fn print_string(value: &String) -> String {
    value.clone()
}

fn parse_u64(raw: &str) -> Result<u64, String> {
    raw.parse::<u64>().map_err(|e| e.to_string())
}

fn print_u64(value: &u64) -> String {
    value.to_string()
}

/// Backend root location (a directory for on-disk backends; unused by the
/// in-memory ones).
pub const ROOT: ConfigKey<String> = ConfigKey {
    name: "root",
    doc: "location of the repository state",
    default: || String::from("."),
    parse: parse_string,
    print: print_string,
};

/// Name of the branch a repository opens on.
pub const DEFAULT_BRANCH: ConfigKey<String> = ConfigKey {
    name: "default-branch",
    doc: "branch selected when none is named",
    default: || String::from("master"),
    parse: parse_string,
    print: print_string,
};

/// Exploration depth cap for LCA search; `0` means unbounded.
pub const LCA_MAX_DEPTH: ConfigKey<u64> = ConfigKey {
    name: "lca-max-depth",
    doc: "depth bound for lowest-common-ancestor search (0 = unbounded)",
    default: || 0,
    parse: parse_u64,
    print: print_u64,
};

/// Cap on the number of lowest common ancestors; `0` means unbounded.
pub const LCA_MAX_COUNT: ConfigKey<u64> = ConfigKey {
    name: "lca-max-count",
    doc: "bound on the number of lowest common ancestors (0 = unbounded)",
    default: || 0,
    parse: parse_u64,
    print: print_u64,
};
