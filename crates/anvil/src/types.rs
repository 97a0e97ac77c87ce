use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::path::PathBuf;

use crate::error::{AnvilError, Result};

pub type Metadata = serde_json::Map<String, Value>;

pub type FileSet = BTreeMap<String, FileRecord>;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileRecord {
    // Path at collection time; identifies the record after permalinks move it.
    pub source: String,
    #[serde(skip)]
    pub contents: Vec<u8>,
    pub metadata: Metadata,
}

impl FileRecord {
    pub fn new(source: impl Into<String>, contents: impl Into<Vec<u8>>) -> Self {
        Self {
            source: source.into(),
            contents: contents.into(),
            metadata: Metadata::new(),
        }
    }

    pub fn with_metadata(mut self, metadata: Metadata) -> Self {
        self.metadata = metadata;
        self
    }

    pub fn get_string(&self, key: &str) -> Option<String> {
        self.metadata
            .get(key)
            .and_then(|v| v.as_str().map(String::from))
    }

    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.metadata.get(key).and_then(|v| v.as_bool())
    }

    pub fn get_array(&self, key: &str) -> Option<Vec<String>> {
        self.metadata.get(key).and_then(|v| {
            v.as_array().map(|arr| {
                arr.iter()
                    .filter_map(|item| item.as_str().map(String::from))
                    .collect()
            })
        })
    }

    pub fn contents_str(&self, path: &str) -> Result<&str> {
        std::str::from_utf8(&self.contents).map_err(|_| AnvilError::InvalidUtf8 {
            path: PathBuf::from(path),
        })
    }
}

#[derive(Debug, Clone, Default)]
pub struct BuildContext {
    pub site: Metadata,
    pub collections: BTreeMap<String, Vec<String>>,
}

impl BuildContext {
    pub fn new(site: Metadata) -> Self {
        Self {
            site,
            collections: BTreeMap::new(),
        }
    }
}

pub fn extension(path: &str) -> Option<&str> {
    let file_name = path.rsplit('/').next().unwrap_or(path);
    file_name
        .rfind('.')
        .filter(|index| *index > 0)
        .map(|index| &file_name[index + 1..])
}

pub fn is_html(path: &str) -> bool {
    matches!(extension(path), Some("html" | "htm"))
}

pub fn file_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
