use crate::error::Result;
use crate::pipeline::Stage;
use crate::types::{BuildContext, FileSet};

pub struct MetadataMerger;

impl Stage for MetadataMerger {
    fn name(&self) -> &'static str {
        "metadata"
    }

    fn run(&self, mut files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        for record in files.values_mut() {
            for (key, value) in &context.site {
                record
                    .metadata
                    .entry(key.clone())
                    .or_insert_with(|| value.clone());
            }
        }

        Ok(files)
    }
}
