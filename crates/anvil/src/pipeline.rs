use crate::config::BuildConfig;
use crate::error::Result;
use crate::stages::{
    Collections, DebugDump, InPlace, Layouts, Markdown, MetadataMerger, Minify, Permalinks,
};
use crate::templates::TemplateEngine;
use crate::types::{BuildContext, FileSet};
use std::sync::Arc;

pub trait Stage {
    fn name(&self) -> &'static str;

    fn run(&self, files: FileSet, context: &mut BuildContext) -> Result<FileSet>;
}

#[derive(Default)]
pub struct Pipeline {
    stages: Vec<Box<dyn Stage>>,
}

impl Pipeline {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stage(mut self, stage: impl Stage + 'static) -> Self {
        self.stages.push(Box::new(stage));
        self
    }

    pub fn from_config(config: &BuildConfig) -> Result<Self> {
        let engine = Arc::new(TemplateEngine::load(&config.templates)?);

        let mut stages: Vec<Box<dyn Stage>> = vec![
            Box::new(Collections::new(&config.collections)?),
            Box::new(MetadataMerger),
            Box::new(Markdown::new()),
        ];

        if let Some(permalinks) = &config.permalinks {
            stages.push(Box::new(Permalinks::new(permalinks)?));
        }

        stages.push(Box::new(InPlace::new(engine.clone())));
        stages.push(Box::new(Layouts::new(
            engine,
            config.templates.default_layout.clone(),
        )));

        let optional: Vec<(bool, Box<dyn Stage>)> = vec![
            (config.minify, Box::new(Minify::new())),
            (config.debug, Box::new(DebugDump)),
        ];
        stages.extend(
            optional
                .into_iter()
                .filter_map(|(enabled, stage)| enabled.then_some(stage)),
        );

        Ok(Self { stages })
    }

    pub fn stage_names(&self) -> Vec<&'static str> {
        self.stages.iter().map(|stage| stage.name()).collect()
    }

    pub fn run(&self, mut files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        for stage in &self.stages {
            log::info!("{} ({} files)", stage.name(), files.len());
            files = stage.run(files, context)?;
        }
        Ok(files)
    }
}
