use crate::error::{AnvilError, Result};
use crate::pipeline::Stage;
use crate::templates::{RenderScope, TemplateEngine};
use crate::types::{BuildContext, FileSet, Metadata, is_html};
use serde_json::Value;
use std::sync::Arc;

pub struct InPlace {
    engine: Arc<TemplateEngine>,
}

impl InPlace {
    pub fn new(engine: Arc<TemplateEngine>) -> Self {
        Self { engine }
    }
}

impl Stage for InPlace {
    fn name(&self) -> &'static str {
        "in-place"
    }

    fn run(&self, mut files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        let rendered = {
            let scope = RenderScope::new(&files, context);
            let mut tera = self.engine.inline_renderer();
            let mut rendered = Vec::new();

            for (path, record) in files.iter().filter(|(path, _)| is_html(path)) {
                let source = record.contents_str(path)?;
                let tera_context = scope.context_for(path, record)?;
                let output = tera.render_str(source, &tera_context)?;
                rendered.push((path.clone(), output));
            }

            rendered
        };

        for (path, output) in rendered {
            if let Some(record) = files.get_mut(&path) {
                record.contents = output.into_bytes();
            }
        }

        Ok(files)
    }
}

pub struct Layouts {
    engine: Arc<TemplateEngine>,
    default_layout: String,
}

impl Layouts {
    pub fn new(engine: Arc<TemplateEngine>, default_layout: impl Into<String>) -> Self {
        Self {
            engine,
            default_layout: default_layout.into(),
        }
    }

    fn layout_for<'a>(&'a self, metadata: &'a Metadata) -> Option<&'a str> {
        match metadata.get("layout") {
            Some(Value::Bool(false)) => None,
            Some(Value::String(name)) if !name.is_empty() => Some(name.as_str()),
            _ => Some(self.default_layout.as_str()),
        }
    }
}

impl Stage for Layouts {
    fn name(&self) -> &'static str {
        "layouts"
    }

    fn run(&self, mut files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        let rendered = {
            let scope = RenderScope::new(&files, context);
            let mut rendered = Vec::new();

            for (path, record) in files.iter().filter(|(path, _)| is_html(path)) {
                let Some(layout) = self.layout_for(&record.metadata) else {
                    continue;
                };

                if !self.engine.has_template(layout) {
                    return Err(AnvilError::LayoutNotFound {
                        name: layout.to_string(),
                        path: record.source.clone(),
                    });
                }

                let mut tera_context = scope.context_for(path, record)?;
                tera_context.insert("contents", record.contents_str(path)?);

                let output = self.engine.render(layout, &tera_context)?;
                log::debug!("applied layout {layout} to {path}");
                rendered.push((path.clone(), output));
            }

            rendered
        };

        for (path, output) in rendered {
            if let Some(record) = files.get_mut(&path) {
                record.contents = output.into_bytes();
            }
        }

        Ok(files)
    }
}
