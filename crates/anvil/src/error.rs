use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum AnvilError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("IO error {operation} {path}: {source}")]
    IoAt {
        operation: &'static str,
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("TOML parse error in {path}: {message}")]
    TomlParse { path: PathBuf, message: String },

    #[error("YAML parse error in {path}: {message}")]
    YamlParse { path: PathBuf, message: String },

    #[error("Template error: {0}")]
    Template(#[from] tera::Error),

    #[error("Invalid frontmatter in file: {path}")]
    InvalidFrontmatter { path: PathBuf },

    #[error("File is not valid UTF-8: {path}")]
    InvalidUtf8 { path: PathBuf },

    #[error("Config file not found: {path}")]
    ConfigNotFound { path: PathBuf },

    #[error("Invalid glob pattern '{pattern}': {message}")]
    InvalidPattern { pattern: String, message: String },

    #[error("Layout '{name}' not found (requested by {path})")]
    LayoutNotFound { name: String, path: String },

    #[error("Permalink placeholder ':{placeholder}' missing from metadata of {path}")]
    MissingPlaceholder { placeholder: String, path: String },

    #[error("Permalink '{target}' for {path} collides with {existing}")]
    PermalinkCollision {
        target: String,
        path: String,
        existing: String,
    },

    #[error("Invalid path: {path}")]
    InvalidPath { path: PathBuf },

    #[error("Directory walk error in {path}: {message}")]
    WalkDir { path: PathBuf, message: String },
}

pub type Result<T> = std::result::Result<T, AnvilError>;

pub trait IoContext<T> {
    fn io_context(self, operation: &'static str, path: &Path) -> Result<T>;
}

impl<T> IoContext<T> for std::io::Result<T> {
    fn io_context(self, operation: &'static str, path: &Path) -> Result<T> {
        self.map_err(|source| AnvilError::IoAt {
            operation,
            path: path.to_path_buf(),
            source,
        })
    }
}
