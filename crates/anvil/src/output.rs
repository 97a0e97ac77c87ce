use crate::config::AssetConfig;
use crate::error::{AnvilError, IoContext, Result};
use crate::types::FileSet;
use std::fs;
use std::path::{Component, Path, PathBuf};
use walkdir::WalkDir;

pub fn clean_output_dir(output_dir: &Path) -> Result<()> {
    if output_dir.exists() {
        log::debug!("removing {}", output_dir.display());
        fs::remove_dir_all(output_dir).io_context("cleaning", output_dir)?;
    }
    Ok(())
}

fn output_path(output_dir: &Path, relative: impl AsRef<Path>) -> Result<PathBuf> {
    let path = relative.as_ref();
    let escapes = path
        .components()
        .any(|component| !matches!(component, Component::Normal(_) | Component::CurDir));

    if path.as_os_str().is_empty() || escapes {
        return Err(AnvilError::InvalidPath {
            path: path.to_path_buf(),
        });
    }

    Ok(output_dir.join(path))
}

pub fn write_files(files: &FileSet, output_dir: &Path) -> Result<usize> {
    fs::create_dir_all(output_dir).io_context("creating", output_dir)?;

    for (relative, record) in files {
        let dest = output_path(output_dir, relative)?;
        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).io_context("creating", parent)?;
        }
        fs::write(&dest, &record.contents).io_context("writing", &dest)?;
    }

    Ok(files.len())
}

pub fn copy_assets(config: &AssetConfig, output_dir: &Path) -> Result<usize> {
    if !config.source.is_dir() {
        log::warn!(
            "assets directory {} not found, skipping",
            config.source.display()
        );
        return Ok(0);
    }

    let target = output_path(output_dir, &config.destination)?;
    let mut copied = 0;

    for entry in WalkDir::new(&config.source).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|error| AnvilError::WalkDir {
            path: config.source.clone(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(&config.source)
            .map_err(|_| AnvilError::InvalidPath {
                path: path.to_path_buf(),
            })?;
        let dest = target.join(relative);

        if let Some(parent) = dest.parent() {
            fs::create_dir_all(parent).io_context("creating", parent)?;
        }
        fs::copy(path, &dest).io_context("copying", path)?;
        copied += 1;
    }

    log::debug!("copied {copied} assets to {}", target.display());
    Ok(copied)
}
