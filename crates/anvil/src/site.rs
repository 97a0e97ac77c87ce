use crate::collect::collect_files;
use crate::config::BuildConfig;
use crate::error::Result;
use crate::output::{clean_output_dir, copy_assets, write_files};
use crate::pipeline::Pipeline;
use crate::types::BuildContext;
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

#[derive(Debug, Clone, PartialEq)]
pub struct BuildReport {
    pub files: usize,
    pub assets: usize,
    pub collections: BTreeMap<String, usize>,
    pub elapsed: Duration,
}

pub fn build_site(config: &BuildConfig) -> Result<BuildReport> {
    let start = Instant::now();

    log::info!(
        "{} build, version {}",
        config.mode,
        config.site.version.as_deref().unwrap_or("unversioned")
    );

    let pipeline = Pipeline::from_config(config)?;
    log::debug!("stages: {}", pipeline.stage_names().join(" -> "));

    let files = collect_files(&config.source, &config.ignore)?;
    log::debug!(
        "collected {} files from {}",
        files.len(),
        config.source.display()
    );

    let mut context = BuildContext::new(config.site.to_metadata());
    let files = pipeline.run(files, &mut context)?;

    if config.clean {
        clean_output_dir(&config.destination)?;
    }

    let written = write_files(&files, &config.destination)?;
    let assets = match &config.assets {
        Some(assets) => copy_assets(assets, &config.destination)?,
        None => 0,
    };

    let report = BuildReport {
        files: written,
        assets,
        collections: context
            .collections
            .iter()
            .map(|(name, members)| (name.clone(), members.len()))
            .collect(),
        elapsed: start.elapsed(),
    };

    log::info!(
        "wrote {} files and {} assets to {} in {:.2?}",
        report.files,
        report.assets,
        config.destination.display(),
        report.elapsed
    );

    Ok(report)
}
