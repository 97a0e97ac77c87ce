use crate::config::TemplateConfig;
use crate::error::{AnvilError, IoContext, Result};
use crate::types::{BuildContext, FileRecord, FileSet, Metadata};
use serde_json::Value;
use std::collections::HashMap;
use std::fs;
use std::path::Path;
use tera::{Context, Tera};
use walkdir::WalkDir;

pub const PARTIALS_PREFIX: &str = "partials/";

#[derive(Debug, Clone)]
pub struct TemplateEngine {
    tera: Tera,
}

impl TemplateEngine {
    pub fn load(config: &TemplateConfig) -> Result<Self> {
        let mut templates = Vec::new();
        read_templates(&config.directory, "", &mut templates)?;
        read_templates(&config.partials, PARTIALS_PREFIX, &mut templates)?;

        log::debug!("loaded {} templates", templates.len());

        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;

        Ok(Self { tera })
    }

    pub fn from_raw<I, N, C>(templates: I) -> Result<Self>
    where
        I: IntoIterator<Item = (N, C)>,
        N: AsRef<str>,
        C: AsRef<str>,
    {
        let mut tera = Tera::default();
        tera.add_raw_templates(templates)?;
        Ok(Self { tera })
    }

    pub fn has_template(&self, name: &str) -> bool {
        self.tera.get_template_names().any(|n| n == name)
    }

    pub fn render(&self, name: &str, context: &Context) -> Result<String> {
        Ok(self.tera.render(name, context)?)
    }

    pub fn inline_renderer(&self) -> Tera {
        self.tera.clone()
    }
}

fn read_templates(dir: &Path, prefix: &str, templates: &mut Vec<(String, String)>) -> Result<()> {
    if !dir.is_dir() {
        log::debug!("template directory {} not found, skipping", dir.display());
        return Ok(());
    }

    for entry in WalkDir::new(dir).min_depth(1).sort_by_file_name() {
        let entry = entry.map_err(|error| AnvilError::WalkDir {
            path: dir.to_path_buf(),
            message: error.to_string(),
        })?;

        if !entry.file_type().is_file() {
            continue;
        }

        let path = entry.path();
        let relative = path
            .strip_prefix(dir)
            .map_err(|_| AnvilError::InvalidPath {
                path: path.to_path_buf(),
            })?
            .to_string_lossy()
            .replace('\\', "/");

        let content = fs::read_to_string(path).io_context("reading template", path)?;
        templates.push((format!("{prefix}{relative}"), content));
    }

    Ok(())
}

pub fn page_url(rootpath: &str, path: &str) -> String {
    let root = if rootpath.ends_with('/') {
        rootpath.to_string()
    } else {
        format!("{rootpath}/")
    };

    if path == "index.html" {
        root
    } else if let Some(dir) = path.strip_suffix("/index.html") {
        format!("{root}{dir}/")
    } else {
        format!("{root}{path}")
    }
}

pub struct RenderScope<'a> {
    context: &'a BuildContext,
    rootpath: String,
    summaries: HashMap<&'a str, Value>,
    collections: Value,
}

impl<'a> RenderScope<'a> {
    pub fn new(files: &'a FileSet, context: &'a BuildContext) -> Self {
        let rootpath = context
            .site
            .get("rootpath")
            .and_then(Value::as_str)
            .unwrap_or("/")
            .to_string();

        let summaries: HashMap<&str, Value> = files
            .iter()
            .map(|(path, record)| (record.source.as_str(), summary(&rootpath, path, record)))
            .collect();

        let collections = Value::Object(
            context
                .collections
                .iter()
                .map(|(name, members)| {
                    let items = members
                        .iter()
                        .filter_map(|source| summaries.get(source.as_str()).cloned())
                        .collect();
                    (name.clone(), Value::Array(items))
                })
                .collect(),
        );

        Self {
            context,
            rootpath,
            summaries,
            collections,
        }
    }

    pub fn context_for(&self, path: &str, record: &FileRecord) -> Result<Context> {
        let mut values = self.context.site.clone();
        values.insert("site".to_string(), Value::Object(self.context.site.clone()));
        values.extend(record.metadata.clone());

        values.insert("output_path".to_string(), Value::String(path.to_string()));
        values.insert(
            "url".to_string(),
            Value::String(page_url(&self.rootpath, path)),
        );
        values.insert("collections".to_string(), self.collections.clone());

        for key in ["previous", "next"] {
            let linked = record
                .get_string(key)
                .and_then(|source| self.summaries.get(source.as_str()).cloned());
            match linked {
                Some(summary) => values.insert(key.to_string(), summary),
                None => values.remove(key),
            };
        }

        Ok(Context::from_value(Value::Object(values))?)
    }
}

fn summary(rootpath: &str, path: &str, record: &FileRecord) -> Value {
    let mut values: Metadata = record.metadata.clone();
    // Navigation links stay as source ids here; nesting them would recurse.
    values.remove("previous");
    values.remove("next");
    values.insert("output_path".to_string(), Value::String(path.to_string()));
    values.insert("url".to_string(), Value::String(page_url(rootpath, path)));
    Value::Object(values)
}
