use crate::error::{AnvilError, IoContext, Result};
use crate::glob::Glob;
use crate::parsing::{extract_frontmatter, has_frontmatter};
use crate::types::{FileRecord, FileSet};
use std::fs;
use std::path::Path;
use walkdir::WalkDir;

pub fn collect_files(source_dir: &Path, ignore: &[String]) -> Result<FileSet> {
    if !source_dir.is_dir() {
        return Err(AnvilError::IoAt {
            operation: "reading source directory",
            path: source_dir.to_path_buf(),
            source: std::io::Error::new(std::io::ErrorKind::NotFound, "not a directory"),
        });
    }

    let ignore = ignore
        .iter()
        .map(|pattern| Glob::new(pattern))
        .collect::<Result<Vec<_>>>()?;

    let mut files = FileSet::new();

    for entry in WalkDir::new(source_dir)
        .min_depth(1)
        .sort_by_file_name()
        .into_iter()
    {
        let entry = entry.map_err(|error| AnvilError::WalkDir {
            path: source_dir.to_path_buf(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(source_dir)
            .map_err(|_| AnvilError::InvalidPath {
                path: path.to_path_buf(),
            })?
            .to_string_lossy()
            .replace('\\', "/");

        if ignore.iter().any(|glob| glob.is_match(&relative)) {
            log::debug!("ignoring {relative}");
            continue;
        }

        let record = load_file(path, &relative)?;
        files.insert(relative, record);
    }

    log::debug!("collected {} files from {}", files.len(), source_dir.display());

    Ok(files)
}

fn load_file(path: &Path, relative: &str) -> Result<FileRecord> {
    let bytes = fs::read(path).io_context("reading source file", path)?;

    match String::from_utf8(bytes) {
        Ok(text) if has_frontmatter(&text) => {
            let (metadata, body) = extract_frontmatter(&text, path)?;
            Ok(FileRecord::new(relative, body).with_metadata(metadata))
        }
        Ok(text) => Ok(FileRecord::new(relative, text)),
        Err(error) => Ok(FileRecord::new(relative, error.into_bytes())),
    }
}
