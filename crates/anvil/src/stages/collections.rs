use crate::config::CollectionConfig;
use crate::error::Result;
use crate::glob::Glob;
use crate::pipeline::Stage;
use crate::types::{BuildContext, FileSet, Metadata};
use serde_json::Value;
use std::cmp::Ordering;

pub const COLLECTION_KEY: &str = "collection";
pub const MAIN_COLLECTION_KEY: &str = "mainCollection";

struct Definition {
    config: CollectionConfig,
    glob: Glob,
}

pub struct Collections {
    definitions: Vec<Definition>,
}

impl Collections {
    pub fn new(configs: &[CollectionConfig]) -> Result<Self> {
        let definitions = configs
            .iter()
            .map(|config| {
                Ok(Definition {
                    glob: Glob::new(&config.pattern)?,
                    config: config.clone(),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self { definitions })
    }

    fn members(&self, definition: &Definition, files: &FileSet) -> Vec<String> {
        let config = &definition.config;

        let mut members: Vec<String> = files
            .keys()
            .filter(|path| definition.glob.is_match(path))
            .cloned()
            .collect();

        match &config.sort_by {
            // `sort_by` is stable, so equal keys keep file-set order.
            Some(key) => members.sort_by(|a, b| {
                compare_sort_keys(
                    files[a].metadata.get(key),
                    files[b].metadata.get(key),
                    config.reverse,
                )
            }),
            None if config.reverse => members.reverse(),
            None => {}
        }

        if let Some(limit) = config.limit {
            members.truncate(limit);
        }

        members
    }
}

impl Stage for Collections {
    fn name(&self) -> &'static str {
        "collections"
    }

    fn run(&self, mut files: FileSet, context: &mut BuildContext) -> Result<FileSet> {
        context.collections.clear();

        for definition in &self.definitions {
            let config = &definition.config;
            let members = self.members(definition, &files);

            let sources: Vec<String> = members
                .iter()
                .map(|path| files[path].source.clone())
                .collect();

            for (index, path) in members.iter().enumerate() {
                let Some(record) = files.get_mut(path) else {
                    continue;
                };
                let metadata = &mut record.metadata;

                add_membership(metadata, &config.name);

                if let Some(defaults) = &config.metadata {
                    for (key, value) in defaults {
                        metadata
                            .entry(key.clone())
                            .or_insert_with(|| value.clone());
                    }
                }

                if config.refer {
                    if index > 0 {
                        metadata.insert(
                            "previous".to_string(),
                            Value::String(sources[index - 1].clone()),
                        );
                    }
                    if let Some(next) = sources.get(index + 1) {
                        metadata.insert("next".to_string(), Value::String(next.clone()));
                    }
                    metadata
                        .entry(MAIN_COLLECTION_KEY.to_string())
                        .or_insert_with(|| Value::String(config.name.clone()));
                }
            }

            log::debug!("collection '{}': {} files", config.name, sources.len());
            context.collections.insert(config.name.clone(), sources);
        }

        Ok(files)
    }
}

fn add_membership(metadata: &mut Metadata, name: &str) {
    let entry = metadata
        .entry(COLLECTION_KEY.to_string())
        .or_insert_with(|| Value::Array(Vec::new()));

    // A single name in front matter becomes a list.
    if let Value::String(existing) = entry {
        let existing = std::mem::take(existing);
        *entry = Value::Array(vec![Value::String(existing)]);
    }

    if let Value::Array(names) = entry
        && !names.iter().any(|existing| existing.as_str() == Some(name))
    {
        names.push(Value::String(name.to_string()));
    }
}

// Missing or null keys sort last in both directions.
fn compare_sort_keys(a: Option<&Value>, b: Option<&Value>, reverse: bool) -> Ordering {
    let a = a.filter(|value| !value.is_null());
    let b = b.filter(|value| !value.is_null());

    match (a, b) {
        (Some(a), Some(b)) => {
            let ordering = compare_values(a, b);
            if reverse { ordering.reverse() } else { ordering }
        }
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

fn compare_values(a: &Value, b: &Value) -> Ordering {
    match (a, b) {
        (Value::Number(a), Value::Number(b)) => {
            let a = a.as_f64().unwrap_or(0.0);
            let b = b.as_f64().unwrap_or(0.0);
            a.partial_cmp(&b).unwrap_or(Ordering::Equal)
        }
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
        _ => type_rank(a).cmp(&type_rank(b)),
    }
}

fn type_rank(value: &Value) -> u8 {
    match value {
        Value::Number(_) => 0,
        Value::String(_) => 1,
        Value::Bool(_) => 2,
        _ => 3,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::FileRecord;
    use serde_json::json;

    fn file(path: &str, metadata: Value) -> (String, FileRecord) {
        let metadata: Metadata = match metadata {
            Value::Object(map) => map,
            _ => Metadata::new(),
        };
        (
            path.to_string(),
            FileRecord::new(path, "").with_metadata(metadata),
        )
    }

    fn collection(name: &str, pattern: &str) -> CollectionConfig {
        CollectionConfig {
            name: name.to_string(),
            pattern: pattern.to_string(),
            sort_by: None,
            reverse: false,
            limit: None,
            refer: true,
            metadata: None,
        }
    }

    fn stories() -> FileSet {
        FileSet::from([
            file("index.md", json!({ "title": "Home", "priority": 1 })),
            file("about/index.md", json!({ "title": "About", "priority": 5 })),
            file("stories/a.md", json!({ "title": "Charlie" })),
            file("stories/b.md", json!({ "title": "Alpha" })),
            file("stories/c.md", json!({ "title": "Bravo" })),
            file("stories/d.md", json!({})),
        ])
    }

    fn run(configs: &[CollectionConfig], files: FileSet) -> (FileSet, BuildContext) {
        let mut context = BuildContext::default();
        let files = Collections::new(configs)
            .unwrap()
            .run(files, &mut context)
            .unwrap();
        (files, context)
    }

    #[test]
    fn test_sorted_ascending_with_missing_last() {
        let mut config = collection("stories", "stories/**/*");
        config.sort_by = Some("title".to_string());

        let (_, context) = run(&[config], stories());

        assert_eq!(
            context.collections["stories"],
            vec!["stories/b.md", "stories/c.md", "stories/a.md", "stories/d.md"]
        );
    }

    #[test]
    fn test_sorted_by_toml_dates() {
        let parse = |content: &str| {
            crate::parsing::extract_frontmatter(content, std::path::Path::new("x.md"))
                .unwrap()
                .0
        };
        let files = FileSet::from([
            (
                "stories/a.md".to_string(),
                FileRecord::new("stories/a.md", "")
                    .with_metadata(parse("+++\ndate = 2016-07-04\n+++\n")),
            ),
            (
                "stories/b.md".to_string(),
                FileRecord::new("stories/b.md", "")
                    .with_metadata(parse("+++\ndate = 2015-01-20\n+++\n")),
            ),
            (
                "stories/c.md".to_string(),
                FileRecord::new("stories/c.md", "")
                    .with_metadata(parse("+++\ndate = 2016-02-11\n+++\n")),
            ),
        ]);

        let mut config = collection("stories", "stories/*");
        config.sort_by = Some("date".to_string());

        let (_, context) = run(&[config], files);

        assert_eq!(
            context.collections["stories"],
            vec!["stories/b.md", "stories/c.md", "stories/a.md"]
        );
    }

    #[test]
    fn test_reverse_keeps_missing_last() {
        let mut config = collection("stories", "stories/**/*");
        config.sort_by = Some("title".to_string());
        config.reverse = true;

        let (_, context) = run(&[config], stories());

        assert_eq!(
            context.collections["stories"],
            vec!["stories/a.md", "stories/c.md", "stories/b.md", "stories/d.md"]
        );
    }

    #[test]
    fn test_numeric_sort_descending() {
        let mut config = collection("page", "**/index.*");
        config.sort_by = Some("priority".to_string());
        config.reverse = true;
        config.refer = false;

        let (files, context) = run(&[config], stories());

        assert_eq!(context.collections["page"], vec!["about/index.md", "index.md"]);
        assert!(files["index.md"].metadata.get("next").is_none());
        assert!(files["index.md"].metadata.get(MAIN_COLLECTION_KEY).is_none());
        assert_eq!(files["index.md"].metadata[COLLECTION_KEY], json!(["page"]));
    }

    #[test]
    fn test_ties_are_stable_in_both_directions() {
        let files = FileSet::from([
            file("stories/a.md", json!({ "title": "Same Title" })),
            file("stories/b.md", json!({ "title": "Same Title" })),
            file("stories/c.md", json!({ "title": "Other" })),
        ]);

        let mut ascending = collection("stories", "stories/*");
        ascending.sort_by = Some("title".to_string());
        let (_, context) = run(&[ascending.clone()], files.clone());
        assert_eq!(
            context.collections["stories"],
            vec!["stories/c.md", "stories/a.md", "stories/b.md"]
        );

        let mut descending = ascending;
        descending.reverse = true;
        let (_, context) = run(&[descending], files);
        assert_eq!(
            context.collections["stories"],
            vec!["stories/a.md", "stories/b.md", "stories/c.md"]
        );
    }

    #[test]
    fn test_limit_truncates_and_only_annotates_members() {
        let mut config = collection("stories", "stories/*");
        config.sort_by = Some("title".to_string());
        config.limit = Some(2);

        let (files, context) = run(&[config], stories());

        assert_eq!(
            context.collections["stories"],
            vec!["stories/b.md", "stories/c.md"]
        );
        assert!(files["stories/a.md"].metadata.get(COLLECTION_KEY).is_none());
        assert_eq!(files["stories/b.md"].metadata[COLLECTION_KEY], json!(["stories"]));
    }

    #[test]
    fn test_refer_sets_navigation_and_main_collection() {
        let mut config = collection("stories", "stories/*");
        config.sort_by = Some("title".to_string());

        let (files, _) = run(&[config], stories());

        let first = &files["stories/b.md"].metadata;
        assert!(first.get("previous").is_none());
        assert_eq!(first["next"], json!("stories/c.md"));
        assert_eq!(first[MAIN_COLLECTION_KEY], json!("stories"));

        let middle = &files["stories/c.md"].metadata;
        assert_eq!(middle["previous"], json!("stories/b.md"));
        assert_eq!(middle["next"], json!("stories/a.md"));

        let last = &files["stories/d.md"].metadata;
        assert_eq!(last["previous"], json!("stories/a.md"));
        assert!(last.get("next").is_none());
    }

    #[test]
    fn test_first_referring_collection_is_main() {
        let featured = collection("featured", "stories/a.md");
        let all = collection("stories", "stories/*");

        let (files, _) = run(&[featured, all], stories());

        let metadata = &files["stories/a.md"].metadata;
        assert_eq!(metadata[MAIN_COLLECTION_KEY], json!("featured"));
        assert_eq!(metadata[COLLECTION_KEY], json!(["featured", "stories"]));
        assert_eq!(
            files["stories/b.md"].metadata[MAIN_COLLECTION_KEY],
            json!("stories")
        );
    }

    #[test]
    fn test_metadata_defaults_do_not_override_front_matter() {
        let mut files = stories();
        files
            .get_mut("stories/a.md")
            .unwrap()
            .metadata
            .insert("layout".to_string(), json!("special.html"));

        let mut config = collection("stories", "stories/*");
        let mut defaults = Metadata::new();
        defaults.insert("layout".to_string(), json!("story.html"));
        config.metadata = Some(defaults);

        let (files, _) = run(&[config], files);

        assert_eq!(files["stories/a.md"].metadata["layout"], json!("special.html"));
        assert_eq!(files["stories/b.md"].metadata["layout"], json!("story.html"));
        assert!(files["index.md"].metadata.get("layout").is_none());
    }

    #[test]
    fn test_collections_recomputed_each_run() {
        let stage = Collections::new(&[collection("stories", "stories/*")]).unwrap();
        let mut context = BuildContext::default();
        context
            .collections
            .insert("stale".to_string(), vec!["gone.md".to_string()]);

        stage.run(stories(), &mut context).unwrap();

        assert!(!context.collections.contains_key("stale"));
        assert_eq!(context.collections["stories"].len(), 4);
    }

    #[test]
    fn test_string_collection_in_front_matter_becomes_list() {
        let files = FileSet::from([file("stories/a.md", json!({ "collection": "featured" }))]);
        let (files, _) = run(&[collection("stories", "stories/*")], files);
        assert_eq!(
            files["stories/a.md"].metadata[COLLECTION_KEY],
            json!(["featured", "stories"])
        );
    }

    #[test]
    fn test_no_files_added_or_removed() {
        let (files, _) = run(&[collection("stories", "stories/*")], stories());
        assert_eq!(files.len(), 6);
    }
}
