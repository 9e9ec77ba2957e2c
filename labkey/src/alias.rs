//! Column aliases: server-native names mapped to user-facing names.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Forward alias map, server-native name -> user-facing name.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Aliases(BTreeMap<String, String>);

impl Aliases {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, native: impl Into<String>, alias: impl Into<String>) -> &mut Self {
        self.0.insert(native.into(), alias.into());
        self
    }

    pub fn get(&self, native: &str) -> Option<&str> {
        self.0.get(native).map(String::as_str)
    }

    /// User-facing name for a server column, or the column itself.
    pub fn to_user<'a>(&'a self, native: &'a str) -> &'a str {
        self.get(native).unwrap_or(native)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> std::collections::btree_map::Iter<'_, String, String> {
        self.0.iter()
    }

    /// Entries of `overrides` replace ours for the same native name.
    pub fn overlay(&self, overrides: &Aliases) -> Aliases {
        let mut merged = self.clone();
        merged
            .0
            .extend(overrides.iter().map(|(k, v)| (k.clone(), v.clone())));
        merged
    }

    pub fn reverse(&self) -> ReverseAliases {
        let mut map: HashMap<String, String> = HashMap::new();
        let mut ambiguous: BTreeMap<String, Vec<String>> = BTreeMap::new();

        for (native, alias) in self.iter() {
            if let Some(previous) = map.get(alias) {
                ambiguous
                    .entry(alias.clone())
                    .or_insert_with(|| vec![previous.clone()])
                    .push(native.clone());
            } else {
                map.insert(alias.clone(), native.clone());
            }
        }

        ReverseAliases { map, ambiguous }
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for Aliases {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Aliases(
            iter.into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        )
    }
}

impl From<BTreeMap<String, String>> for Aliases {
    fn from(map: BTreeMap<String, String>) -> Self {
        Aliases(map)
    }
}

/// User-facing name -> server-native name.
///
/// A user-facing name produced by more than one native column cannot be
/// translated back; it is only an error once something actually uses it.
#[derive(Debug, Clone, Default)]
pub struct ReverseAliases {
    map: HashMap<String, String>,
    ambiguous: BTreeMap<String, Vec<String>>,
}

impl ReverseAliases {
    pub fn to_native<'a>(&'a self, alias: &'a str) -> Result<&'a str> {
        if let Some(natives) = self.ambiguous.get(alias) {
            return Err(Error::Config(format!(
                "alias `{}` is shared by columns {}",
                alias,
                natives.join(", ")
            )));
        }

        Ok(self.map.get(alias).map(String::as_str).unwrap_or(alias))
    }

    /// Translates `alias` and records which server column it landed on.
    pub fn resolve(&self, alias: &str, claims: &mut NativeClaims) -> Result<String> {
        let native = self.to_native(alias)?;
        claims.claim(alias, native)?;
        Ok(native.to_owned())
    }

    pub fn columns<S: AsRef<str>>(
        &self,
        columns: &[S],
        claims: &mut NativeClaims,
    ) -> Result<Vec<String>> {
        columns
            .iter()
            .map(|c| self.resolve(c.as_ref(), claims))
            .collect()
    }
}

/// Server columns already used in a request, with the user-facing name that
/// reached each one first. Two different names may not share a column.
#[derive(Debug, Clone, Default)]
pub struct NativeClaims(HashMap<String, String>);

impl NativeClaims {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(&mut self, alias: &str, native: &str) -> Result<()> {
        match self.0.get(native) {
            Some(first) if first != alias => Err(Error::Config(format!(
                "`{}` and `{}` both refer to column `{}`",
                first, alias, native
            ))),
            Some(_) => Ok(()),
            None => {
                self.0.insert(native.to_owned(), alias.to_owned());
                Ok(())
            }
        }
    }
}
