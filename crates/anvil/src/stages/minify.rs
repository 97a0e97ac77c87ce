use crate::error::Result;
use crate::pipeline::Stage;
use crate::types::{BuildContext, FileSet, is_html};
use rayon::prelude::*;

pub struct Minify {
    cfg: minify_html::Cfg,
}

impl Default for Minify {
    fn default() -> Self {
        Self::new()
    }
}

impl Minify {
    pub fn new() -> Self {
        let mut cfg = minify_html::Cfg::new();
        cfg.minify_css = true;
        cfg.minify_js = true;
        cfg.keep_closing_tags = true;
        cfg.keep_html_and_head_opening_tags = true;
        Self { cfg }
    }
}

impl Stage for Minify {
    fn name(&self) -> &'static str {
        "minify"
    }

    fn run(&self, mut files: FileSet, _context: &mut BuildContext) -> Result<FileSet> {
        files
            .par_iter_mut()
            .filter(|(path, _)| is_html(path))
            .for_each(|(_, record)| {
                record.contents = minify_html::minify(&record.contents, &self.cfg);
            });

        Ok(files)
    }
}
