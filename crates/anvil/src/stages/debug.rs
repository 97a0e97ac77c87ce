use crate::error::Result;
use crate::pipeline::Stage;
use crate::types::{BuildContext, FileSet};
use serde_json::Value;

pub struct DebugDump;

impl Stage for DebugDump {
    fn name(&self) -> &'static str {
        "debug"
    }

    fn run(&self, files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        log::info!(
            "site metadata: {}",
            Value::Object(context.site.clone())
        );

        for (name, members) in &context.collections {
            log::info!("collection {name}: {members:?}");
        }

        for (path, record) in &files {
            log::info!(
                "{path} ({} bytes, from {}): {}",
                record.contents.len(),
                record.source,
                Value::Object(record.metadata.clone())
            );
        }

        Ok(files)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;

    #[test]
    fn test_debug_dump_passes_files_through() {
        let files = FileSet::from([("a.html".to_string(), FileRecord::new("a.md", "body"))]);
        let output = DebugDump
            .run(files.clone(), &mut BuildContext::default())
            .unwrap();
        assert_eq!(output, files);
    }
}
