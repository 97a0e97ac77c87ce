use crate::error::{AnvilError, Result};
use crate::types::Metadata;
use pulldown_cmark::{CodeBlockKind, CowStr, Event, Options, Parser, Tag, TagEnd};
use serde_json::Value;
use std::path::Path;
use syntect::highlighting::ThemeSet;
use syntect::html::highlighted_html_for_string;
use syntect::parsing::SyntaxSet;

const HIGHLIGHT_THEME: &str = "base16-ocean.dark";

pub struct MarkdownRenderer {
    syntax_set: SyntaxSet,
    theme_set: ThemeSet,
}

impl Default for MarkdownRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl MarkdownRenderer {
    pub fn new() -> Self {
        Self {
            syntax_set: SyntaxSet::load_defaults_newlines(),
            theme_set: ThemeSet::load_defaults(),
        }
    }

    pub fn render(&self, content: &str) -> String {
        let mut options = Options::empty();
        options.insert(Options::ENABLE_TABLES);
        options.insert(Options::ENABLE_FOOTNOTES);
        options.insert(Options::ENABLE_STRIKETHROUGH);
        options.insert(Options::ENABLE_TASKLISTS);
        options.insert(Options::ENABLE_HEADING_ATTRIBUTES);

        let parser = Parser::new_ext(content, options);
        let mut events = Vec::new();
        let mut in_code_block = false;
        let mut code_block_lang: Option<String> = None;
        let mut code_block_content = String::new();

        for event in parser {
            match event {
                Event::Start(Tag::CodeBlock(kind)) => {
                    in_code_block = true;
                    code_block_lang = match kind {
                        CodeBlockKind::Fenced(lang) if !lang.is_empty() => Some(lang.to_string()),
                        _ => None,
                    };
                    code_block_content.clear();
                }
                Event::End(TagEnd::CodeBlock) => {
                    let block = self.highlight(code_block_lang.as_deref(), &code_block_content);
                    events.push(Event::Html(CowStr::from(block)));
                    in_code_block = false;
                    code_block_lang = None;
                }
                Event::Text(text) if in_code_block => {
                    code_block_content.push_str(&text);
                }
                other => events.push(other),
            }
        }

        let mut html_output = String::with_capacity(content.len() * 3 / 2);
        pulldown_cmark::html::push_html(&mut html_output, events.into_iter());
        html_output
    }

    fn highlight(&self, lang: Option<&str>, code: &str) -> String {
        let Some(lang) = lang else {
            return format!("<pre><code>{}</code></pre>", escape_html(code));
        };

        let theme = &self.theme_set.themes[HIGHLIGHT_THEME];

        self.syntax_set
            .find_syntax_by_token(lang)
            .and_then(|syntax| {
                highlighted_html_for_string(code, &self.syntax_set, syntax, theme).ok()
            })
            .unwrap_or_else(|| {
                format!(
                    "<pre><code class=\"language-{}\">{}</code></pre>",
                    escape_html(lang),
                    escape_html(code)
                )
            })
    }
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

pub fn has_frontmatter(content: &str) -> bool {
    let content = content.trim_start();
    content.starts_with("---") || content.starts_with("+++")
}

pub fn extract_frontmatter(content: &str, path: &Path) -> Result<(Metadata, String)> {
    if !has_frontmatter(content) {
        return Ok((Metadata::new(), content.to_string()));
    }

    let content = content.replace("\r\n", "\n");
    let content = content.trim_start();

    if content.starts_with("+++") {
        parse_toml_frontmatter(content, path)
    } else {
        parse_yaml_frontmatter(content, path)
    }
}

fn parse_toml_frontmatter(content: &str, path: &Path) -> Result<(Metadata, String)> {
    let (header, body) = split_block(content, "+++", path)?;

    let table: toml::Table = toml::from_str(header).map_err(|error| AnvilError::TomlParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;

    let metadata = table
        .into_iter()
        .map(|(key, value)| (key, toml_to_json(value)))
        .collect();

    Ok((metadata, body))
}

// Datetimes become their TOML string form so they sort and format like
// YAML dates do.
fn toml_to_json(value: toml::Value) -> Value {
    match value {
        toml::Value::String(text) => Value::String(text),
        toml::Value::Integer(number) => Value::from(number),
        toml::Value::Float(number) => serde_json::Number::from_f64(number)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        toml::Value::Boolean(flag) => Value::Bool(flag),
        toml::Value::Datetime(datetime) => Value::String(datetime.to_string()),
        toml::Value::Array(items) => Value::Array(items.into_iter().map(toml_to_json).collect()),
        toml::Value::Table(table) => Value::Object(
            table
                .into_iter()
                .map(|(key, value)| (key, toml_to_json(value)))
                .collect(),
        ),
    }
}

fn parse_yaml_frontmatter(content: &str, path: &Path) -> Result<(Metadata, String)> {
    let (header, body) = split_block(content, "---", path)?;

    if header.trim().is_empty() {
        return Ok((Metadata::new(), body));
    }

    let value: Value = serde_yml::from_str(header).map_err(|error| AnvilError::YamlParse {
        path: path.to_path_buf(),
        message: error.to_string(),
    })?;

    let metadata = match value {
        Value::Null => Metadata::new(),
        Value::Object(map) => map,
        _ => {
            return Err(AnvilError::InvalidFrontmatter {
                path: path.to_path_buf(),
            });
        }
    };

    Ok((metadata, body))
}

fn split_block<'a>(content: &'a str, delimiter: &str, path: &Path) -> Result<(&'a str, String)> {
    let rest = &content[delimiter.len()..];

    let end_index =
        find_closing_delimiter(rest, delimiter).ok_or_else(|| AnvilError::InvalidFrontmatter {
            path: path.to_path_buf(),
        })?;

    let header = &rest[..end_index];
    let body = &rest[end_index + delimiter.len()..];

    Ok((header, body.trim().to_string()))
}

fn find_closing_delimiter(content: &str, delimiter: &str) -> Option<usize> {
    let mut position = 0;

    for (index, line) in content.lines().enumerate() {
        // The opening delimiter's own line is skipped.
        if index > 0 && line.trim() == delimiter {
            return Some(position);
        }
        position += line.len() + 1;
    }

    None
}

pub fn slugify(text: &str) -> String {
    let mut slug = String::with_capacity(text.len());
    let mut prev_hyphen = true;
    for ch in text.chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
            prev_hyphen = false;
        } else if !prev_hyphen {
            slug.push('-');
            prev_hyphen = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}
