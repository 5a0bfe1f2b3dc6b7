//! Sportsbook table
//!
//! The bundled table is parsed once per process and shared; tables read from
//! a directory are parsed on every request.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};

use super::loader::ResourceLoader;
use crate::error::{Result, SbrError};

static BUNDLED_SPORTSBOOKS: OnceLock<Arc<Sportsbooks>> = OnceLock::new();

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Sportsbook {
    #[serde(rename = "sportsbook id")]
    pub sportsbook_id: i64,
    pub name: String,
    #[serde(default)]
    pub alias: Option<String>,
}

/// Sportsbook id <-> display name
#[derive(Clone, Debug)]
pub struct Sportsbooks {
    names: HashMap<i64, String>,
    ids: HashMap<String, i64>,
}

impl Sportsbooks {
    pub fn from_entries(entries: Vec<Sportsbook>) -> Self {
        let mut names = HashMap::new();
        let mut ids = HashMap::new();
        for book in entries {
            ids.insert(book.name.to_lowercase(), book.sportsbook_id);
            if let Some(alias) = &book.alias {
                ids.insert(alias.to_lowercase(), book.sportsbook_id);
            }
            names.insert(book.sportsbook_id, book.name);
        }
        Self { names, ids }
    }

    /// Load through `loader`, reusing the process-wide copy for bundled data
    pub fn load(loader: &ResourceLoader) -> Result<Arc<Self>> {
        if loader.is_bundled() {
            if let Some(cached) = BUNDLED_SPORTSBOOKS.get() {
                return Ok(Arc::clone(cached));
            }
        }

        let entries: Vec<Sportsbook> = loader.load("sportsbooks")?;
        let books = Arc::new(Self::from_entries(entries));

        if loader.is_bundled() {
            return Ok(Arc::clone(BUNDLED_SPORTSBOOKS.get_or_init(|| books)));
        }
        Ok(books)
    }

    pub fn name(&self, sportsbook_id: i64) -> Option<&str> {
        self.names.get(&sportsbook_id).map(String::as_str)
    }

    pub fn names(&self) -> &HashMap<i64, String> {
        &self.names
    }

    /// Resolve sportsbook names or aliases, case-insensitive
    pub fn ids<S: AsRef<str>>(&self, terms: &[S]) -> Result<Vec<i64>> {
        terms
            .iter()
            .map(|t| {
                let t = t.as_ref();
                self.ids
                    .get(&t.to_lowercase())
                    .copied()
                    .ok_or_else(|| SbrError::SportsbookNotFound(t.to_string()))
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bundled_is_cached() {
        let a = Sportsbooks::load(&ResourceLoader::Bundled).unwrap();
        let b = Sportsbooks::load(&ResourceLoader::Bundled).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_names_and_ids() {
        let books = Sportsbooks::from_entries(vec![
            Sportsbook { sportsbook_id: 20, name: "Pinnacle".into(), alias: Some("pin".into()) },
            Sportsbook { sportsbook_id: 9, name: "Bovada".into(), alias: None },
        ]);
        assert_eq!(books.name(20), Some("Pinnacle"));
        assert_eq!(books.name(1), None);
        assert_eq!(books.ids(&["PIN", "bovada"]).unwrap(), vec![20, 9]);
        assert!(matches!(books.ids(&["nowhere"]), Err(SbrError::SportsbookNotFound(ref s)) if s == "nowhere"));
    }
}
