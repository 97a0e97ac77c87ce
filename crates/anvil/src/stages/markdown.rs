use crate::error::Result;
use crate::parsing::MarkdownRenderer;
use crate::pipeline::Stage;
use crate::types::{BuildContext, FileRecord, FileSet, extension};
use rayon::prelude::*;

const MARKDOWN_EXTENSIONS: &[&str] = &["md", "markdown"];

#[derive(Default)]
pub struct Markdown {
    renderer: MarkdownRenderer,
}

impl Markdown {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn is_markdown(path: &str) -> bool {
    extension(path).is_some_and(|ext| MARKDOWN_EXTENSIONS.contains(&ext))
}

fn html_path(path: &str) -> String {
    match path.rfind('.') {
        Some(index) => format!("{}.html", &path[..index]),
        None => format!("{path}.html"),
    }
}

impl Stage for Markdown {
    fn name(&self) -> &'static str {
        "markdown"
    }

    fn run(&self, files: FileSet, _context: &mut BuildContext) -> Result<FileSet> {
        let rendered: Vec<(String, FileRecord)> = files
            .into_par_iter()
            .map(|(path, mut record)| -> Result<(String, FileRecord)> {
                if !is_markdown(&path) {
                    return Ok((path, record));
                }

                let html = self.renderer.render(record.contents_str(&path)?);
                record.contents = html.into_bytes();
                log::debug!("rendered markdown {path}");
                Ok((html_path(&path), record))
            })
            .collect::<Result<_>>()?;

        let mut output = FileSet::new();
        for (path, record) in rendered {
            if let Some(existing) = output.get(&path) {
                log::warn!(
                    "{path}: {} overwrites {}",
                    record.source,
                    existing.source
                );
            }
            output.insert(path, record);
        }

        Ok(output)
    }
}
