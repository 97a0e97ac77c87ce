use crate::config::{CollisionPolicy, PermalinkConfig};
use crate::error::{AnvilError, Result};
use crate::parsing::slugify;
use crate::pipeline::Stage;
use crate::stages::collections::COLLECTION_KEY;
use crate::types::{BuildContext, FileRecord, FileSet, file_name, is_html};
use chrono::format::{Item, StrftimeItems};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use serde_json::Value;
use std::fmt::Write;

#[derive(Debug, Clone, PartialEq)]
enum Part {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq)]
struct Pattern {
    source: String,
    parts: Vec<Part>,
}

impl Pattern {
    fn parse(pattern: &str) -> Self {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = pattern.chars().peekable();

        while let Some(ch) = chars.next() {
            if ch != ':' {
                literal.push(ch);
                continue;
            }

            let mut name = String::new();
            while let Some(&next) = chars.peek() {
                if next.is_alphanumeric() || next == '_' {
                    name.push(next);
                    chars.next();
                } else {
                    break;
                }
            }

            if name.is_empty() {
                literal.push(':');
            } else {
                if !literal.is_empty() {
                    parts.push(Part::Literal(std::mem::take(&mut literal)));
                }
                parts.push(Part::Placeholder(name));
            }
        }

        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        Self {
            source: pattern.to_string(),
            parts,
        }
    }
}

pub struct Permalinks {
    default: Pattern,
    linksets: Vec<(String, Pattern)>,
    date_format: String,
    on_collision: CollisionPolicy,
}

impl Permalinks {
    pub fn new(config: &PermalinkConfig) -> Result<Self> {
        if StrftimeItems::new(&config.date_format).any(|item| matches!(item, Item::Error)) {
            return Err(AnvilError::InvalidPattern {
                pattern: config.date_format.clone(),
                message: "invalid date format".to_string(),
            });
        }

        Ok(Self {
            default: Pattern::parse(&config.pattern),
            linksets: config
                .linksets
                .iter()
                .map(|linkset| (linkset.collection.clone(), Pattern::parse(&linkset.pattern)))
                .collect(),
            date_format: config.date_format.clone(),
            on_collision: config.on_collision,
        })
    }

    fn applies(path: &str, record: &FileRecord) -> bool {
        is_html(path) && file_name(path) != "index.html" && record.get_bool("permalink") != Some(false)
    }

    fn pattern_for(&self, record: &FileRecord) -> &Pattern {
        let memberships = record.get_array(COLLECTION_KEY).unwrap_or_default();
        self.linksets
            .iter()
            .find(|(collection, _)| memberships.contains(collection))
            .map(|(_, pattern)| pattern)
            .unwrap_or(&self.default)
    }

    fn resolve(&self, path: &str, record: &FileRecord) -> Result<String> {
        let pattern = self.pattern_for(record);
        let mut resolved = String::new();

        for part in &pattern.parts {
            match part {
                Part::Literal(text) => resolved.push_str(text),
                Part::Placeholder(name) => {
                    let value = record
                        .metadata
                        .get(name)
                        .and_then(|value| self.placeholder_value(name, value))
                        .filter(|value| !value.is_empty())
                        .ok_or_else(|| AnvilError::MissingPlaceholder {
                            placeholder: name.clone(),
                            path: path.to_string(),
                        })?;
                    resolved.push_str(&value);
                }
            }
        }

        let normalized: Vec<&str> = resolved
            .split('/')
            .filter(|segment| !segment.is_empty() && *segment != ".")
            .collect();

        if normalized.is_empty() || normalized.contains(&"..") {
            return Err(AnvilError::InvalidPath {
                path: resolved.into(),
            });
        }

        Ok(normalized.join("/"))
    }

    fn placeholder_value(&self, name: &str, value: &Value) -> Option<String> {
        match value {
            Value::String(text) if name == "date" => {
                Some(self.format_date(text).unwrap_or_else(|| slugify(text)))
            }
            Value::String(text) => Some(slugify(text)),
            Value::Number(number) => Some(number.to_string()),
            Value::Bool(flag) => Some(flag.to_string()),
            Value::Array(items) => {
                let slugs: Vec<String> = items
                    .iter()
                    .filter_map(Value::as_str)
                    .map(slugify)
                    .filter(|slug| !slug.is_empty())
                    .collect();
                Some(slugs.join("-"))
            }
            Value::Null | Value::Object(_) => None,
        }
    }

    fn format_date(&self, text: &str) -> Option<String> {
        let naive = DateTime::parse_from_rfc3339(text)
            .map(|date| date.naive_utc())
            .or_else(|_| NaiveDateTime::parse_from_str(text, "%Y-%m-%dT%H:%M:%S"))
            .or_else(|_| {
                NaiveDate::parse_from_str(text, "%Y-%m-%d").map(|date| date.and_time(Default::default()))
            })
            .ok()?;

        let mut formatted = String::new();
        write!(formatted, "{}", naive.format(&self.date_format)).ok()?;
        Some(formatted)
    }
}

impl Stage for Permalinks {
    fn name(&self) -> &'static str {
        "permalinks"
    }

    fn run(&self, files: FileSet, _context: &mut BuildContext) -> Result<FileSet> {
        let mut output = FileSet::new();

        for (path, mut record) in files {
            let target = if Self::applies(&path, &record) {
                let directory = self.resolve(&path, &record)?;
                record
                    .metadata
                    .insert("path".to_string(), Value::String(directory.clone()));
                format!("{directory}/index.html")
            } else {
                path.clone()
            };

            if let Some(existing) = output.get(&target) {
                match self.on_collision {
                    CollisionPolicy::Overwrite => log::warn!(
                        "permalink {target}: {} overwrites {}",
                        record.source,
                        existing.source
                    ),
                    CollisionPolicy::Error => {
                        return Err(AnvilError::PermalinkCollision {
                            target,
                            path: record.source,
                            existing: existing.source.clone(),
                        });
                    }
                }
            }

            if target != path {
                log::debug!("permalink {path} -> {target}");
            }
            output.insert(target, record);
        }

        log::debug!("permalinks resolved with pattern '{}'", self.default.source);

        Ok(output)
    }
}
