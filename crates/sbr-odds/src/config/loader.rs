//! Config Loader
//!
//! Reference tables are YAML documents addressed by name (`nfl`, `football`,
//! `arguments`, ...). They come either from the copies compiled into the
//! crate or from a directory of `<name>.yaml` files holding refreshed tables.

use std::borrow::Cow;
use std::collections::HashMap;
use std::path::PathBuf;

use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::{Result, SbrError};

/// Tables compiled into the crate
const BUNDLED: &[(&str, &str)] = &[
    ("arguments", include_str!("../../resources/arguments.yaml")),
    ("fields", include_str!("../../resources/fields.yaml")),
    ("search_dictionary", include_str!("../../resources/search_dictionary.yaml")),
    ("sportsbooks", include_str!("../../resources/sportsbooks.yaml")),
    ("football", include_str!("../../resources/football.yaml")),
    ("basketball", include_str!("../../resources/basketball.yaml")),
    ("baseball", include_str!("../../resources/baseball.yaml")),
    ("hockey", include_str!("../../resources/hockey.yaml")),
    ("soccer", include_str!("../../resources/soccer.yaml")),
    ("tennis", include_str!("../../resources/tennis.yaml")),
    ("fighting", include_str!("../../resources/fighting.yaml")),
    ("nfl", include_str!("../../resources/nfl.yaml")),
    ("ncaaf", include_str!("../../resources/ncaaf.yaml")),
    ("nba", include_str!("../../resources/nba.yaml")),
    ("ncaab", include_str!("../../resources/ncaab.yaml")),
    ("mlb", include_str!("../../resources/mlb.yaml")),
    ("nhl", include_str!("../../resources/nhl.yaml")),
    ("epl", include_str!("../../resources/epl.yaml")),
    ("laliga", include_str!("../../resources/laliga.yaml")),
    ("bundesliga", include_str!("../../resources/bundesliga.yaml")),
    ("ucl", include_str!("../../resources/ucl.yaml")),
    ("uefanationsleague", include_str!("../../resources/uefanationsleague.yaml")),
    ("atp", include_str!("../../resources/atp.yaml")),
    ("ufc", include_str!("../../resources/ufc.yaml")),
];

/// Where reference tables are read from
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub enum ResourceLoader {
    /// Tables shipped inside the crate
    #[default]
    Bundled,
    /// `<dir>/<name>.yaml`
    Directory(PathBuf),
}

impl ResourceLoader {
    pub fn from_dir(dir: impl Into<PathBuf>) -> Self {
        ResourceLoader::Directory(dir.into())
    }

    pub fn is_bundled(&self) -> bool {
        matches!(self, ResourceLoader::Bundled)
    }

    /// Raw YAML text of a named table
    pub fn text(&self, name: &str) -> Result<Cow<'static, str>> {
        match self {
            ResourceLoader::Bundled => BUNDLED
                .iter()
                .find(|(n, _)| *n == name)
                .map(|(_, text)| Cow::Borrowed(*text))
                .ok_or_else(|| SbrError::ConfigNotFound { name: name.to_string() }),
            ResourceLoader::Directory(dir) => {
                let path = dir.join(format!("{}.yaml", name));
                debug!("Loading reference table {}", path.display());
                std::fs::read_to_string(&path)
                    .map(Cow::Owned)
                    .map_err(|_| SbrError::ConfigNotFound { name: name.to_string() })
            }
        }
    }

    /// Parse a named table into a typed structure
    pub fn load<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        let text = self.text(name)?;
        serde_yaml::from_str(&text).map_err(|source| SbrError::ConfigParse { name: name.to_string(), source })
    }

    /// Parse a named table as an untyped mapping
    pub fn load_value(&self, name: &str) -> Result<serde_yaml::Value> {
        self.load(name)
    }

    /// Argument template `key` from the `arguments` table
    pub fn argument_template(&self, key: &str) -> Result<String> {
        self.template("arguments", key)
    }

    /// Field-selection template `key` from the `fields` table
    pub fn field_template(&self, key: &str) -> Result<String> {
        self.template("fields", key)
    }

    fn template(&self, table: &str, key: &str) -> Result<String> {
        let mut templates: HashMap<String, String> = self.load(table)?;
        templates
            .remove(key)
            .ok_or_else(|| SbrError::ConfigNotFound { name: format!("{}.{}", table, key) })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_every_bundled_table_parses() {
        let loader = ResourceLoader::Bundled;
        for (name, _) in BUNDLED {
            loader.load_value(name).unwrap_or_else(|e| panic!("{}: {}", name, e));
        }
    }

    #[test]
    fn test_missing_table() {
        let err = ResourceLoader::Bundled.text("cricket").unwrap_err();
        assert!(matches!(err, SbrError::ConfigNotFound { ref name } if name == "cricket"));
    }

    #[test]
    fn test_templates() {
        let loader = ResourceLoader::Bundled;
        assert!(loader.argument_template("date").unwrap().contains("$timestamp"));
        assert!(loader.field_template("event").unwrap().contains("events"));
        assert!(matches!(
            loader.field_template("foo"),
            Err(SbrError::ConfigNotFound { ref name }) if name == "fields.foo"
        ));
    }

    #[test]
    fn test_directory_loader() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("arguments.yaml"), "date: \"lid: $lids\"\n").unwrap();
        std::fs::write(dir.path().join("broken.yaml"), "a: [1, 2\n").unwrap();

        let loader = ResourceLoader::from_dir(dir.path());
        assert!(!loader.is_bundled());
        assert_eq!(loader.argument_template("date").unwrap(), "lid: $lids");
        assert!(matches!(loader.text("nfl"), Err(SbrError::ConfigNotFound { .. })));
        assert!(matches!(loader.load_value("broken"), Err(SbrError::ConfigParse { .. })));
    }
}
