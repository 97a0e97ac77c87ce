use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use crate::error::{AnvilError, IoContext, Result};
use crate::types::Metadata;

pub const DEFAULT_CONFIG_FILE: &str = "anvil.toml";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuildMode {
    Development,
    #[default]
    Production,
}

impl BuildMode {
    pub fn is_production(self) -> bool {
        self == BuildMode::Production
    }
}

impl fmt::Display for BuildMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BuildMode::Development => write!(f, "Development"),
            BuildMode::Production => write!(f, "Production"),
        }
    }
}

impl FromStr for BuildMode {
    type Err = String;

    fn from_str(value: &str) -> std::result::Result<Self, Self::Err> {
        match value.to_ascii_lowercase().as_str() {
            "development" | "dev" => Ok(BuildMode::Development),
            "production" | "prod" => Ok(BuildMode::Production),
            other => Err(format!(
                "unknown build mode '{other}' (expected development or production)"
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CollisionPolicy {
    #[default]
    Overwrite,
    Error,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionConfig {
    pub name: String,
    pub pattern: String,
    #[serde(default)]
    pub sort_by: Option<String>,
    #[serde(default)]
    pub reverse: bool,
    #[serde(default)]
    pub limit: Option<usize>,
    #[serde(default = "default_true")]
    pub refer: bool,
    #[serde(default)]
    pub metadata: Option<Metadata>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Linkset {
    pub collection: String,
    pub pattern: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermalinkConfig {
    pub pattern: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub on_collision: CollisionPolicy,
    #[serde(default)]
    pub linksets: Vec<Linkset>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TemplateConfig {
    pub directory: PathBuf,
    pub partials: PathBuf,
    pub default_layout: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AssetConfig {
    pub source: PathBuf,
    pub destination: PathBuf,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ServeConfig {
    pub port: u16,
    pub open: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SiteMetadata {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub author: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    pub rootpath: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    pub dev_build: bool,
    #[serde(flatten)]
    pub extra: BTreeMap<String, Value>,
}

impl SiteMetadata {
    pub fn to_metadata(&self) -> Metadata {
        match serde_json::to_value(self) {
            Ok(Value::Object(map)) => map,
            _ => Metadata::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BuildConfig {
    pub config_path: PathBuf,
    pub mode: BuildMode,
    pub site: SiteMetadata,
    pub source: PathBuf,
    pub destination: PathBuf,
    pub ignore: Vec<String>,
    pub clean: bool,
    pub minify: bool,
    pub debug: bool,
    pub templates: TemplateConfig,
    pub collections: Vec<CollectionConfig>,
    pub permalinks: Option<PermalinkConfig>,
    pub assets: Option<AssetConfig>,
    pub serve: Option<ServeConfig>,
}

impl BuildConfig {
    pub fn load(path: &Path, mode_override: Option<BuildMode>) -> Result<Self> {
        if !path.exists() {
            return Err(AnvilError::ConfigNotFound {
                path: path.to_path_buf(),
            });
        }

        let content = fs::read_to_string(path).io_context("reading config", path)?;
        Self::parse(&content, path, mode_override)
    }

    pub fn parse(content: &str, path: &Path, mode_override: Option<BuildMode>) -> Result<Self> {
        let file: ConfigFile = toml::from_str(content).map_err(|error| AnvilError::TomlParse {
            path: path.to_path_buf(),
            message: error.to_string(),
        })?;

        let root = path
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        Ok(file.resolve(path, &root, mode_override))
    }
}

#[derive(Debug, Deserialize)]
struct ConfigFile {
    site: SiteSection,
    #[serde(default)]
    build: BuildSection,
    #[serde(default)]
    templates: TemplatesSection,
    #[serde(default)]
    collections: Vec<CollectionConfig>,
    #[serde(default)]
    permalinks: Option<PermalinkConfig>,
    #[serde(default)]
    assets: Option<AssetsSection>,
    #[serde(default)]
    serve: ServeSection,
}

#[derive(Debug, Deserialize)]
struct SiteSection {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    contact: Option<String>,
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    rootpath: Option<String>,
    #[serde(default)]
    version: Option<String>,
    #[serde(default)]
    development: Option<SiteOverrides>,
    #[serde(default)]
    production: Option<SiteOverrides>,
    #[serde(default)]
    extra: BTreeMap<String, Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SiteOverrides {
    #[serde(default)]
    domain: Option<String>,
    #[serde(default)]
    rootpath: Option<String>,
}

#[derive(Debug, Deserialize)]
struct BuildSection {
    #[serde(default)]
    mode: BuildMode,
    #[serde(default = "default_source")]
    source: PathBuf,
    #[serde(default = "default_destination")]
    destination: PathBuf,
    #[serde(default)]
    ignore: Vec<String>,
    #[serde(default)]
    clean: Option<bool>,
    #[serde(default)]
    minify: Option<bool>,
    #[serde(default)]
    debug: bool,
}

impl Default for BuildSection {
    fn default() -> Self {
        Self {
            mode: BuildMode::default(),
            source: default_source(),
            destination: default_destination(),
            ignore: Vec::new(),
            clean: None,
            minify: None,
            debug: false,
        }
    }
}

#[derive(Debug, Deserialize)]
struct TemplatesSection {
    #[serde(default = "default_template_dir")]
    directory: PathBuf,
    #[serde(default = "default_partials_dir")]
    partials: PathBuf,
    #[serde(default = "default_layout", rename = "default")]
    default_layout: String,
}

impl Default for TemplatesSection {
    fn default() -> Self {
        Self {
            directory: default_template_dir(),
            partials: default_partials_dir(),
            default_layout: default_layout(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct AssetsSection {
    source: PathBuf,
    #[serde(default = "default_asset_destination")]
    destination: PathBuf,
}

#[derive(Debug, Deserialize)]
struct ServeSection {
    #[serde(default = "default_true")]
    enabled: bool,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default)]
    open: bool,
}

impl Default for ServeSection {
    fn default() -> Self {
        Self {
            enabled: true,
            port: default_port(),
            open: false,
        }
    }
}

impl ConfigFile {
    fn resolve(self, path: &Path, root: &Path, mode_override: Option<BuildMode>) -> BuildConfig {
        let mode = mode_override.unwrap_or(self.build.mode);
        let production = mode.is_production();

        let overrides = if production {
            self.site.production
        } else {
            self.site.development
        }
        .unwrap_or_default();

        let site = SiteMetadata {
            name: self.site.name,
            description: self.site.description,
            author: self.site.author,
            contact: self.site.contact,
            domain: overrides.domain.or(self.site.domain),
            rootpath: overrides
                .rootpath
                .or(self.site.rootpath)
                .unwrap_or_else(|| "/".to_string()),
            version: self.site.version,
            dev_build: !production,
            extra: self.site.extra,
        };

        let serve = (!production && self.serve.enabled).then_some(ServeConfig {
            port: self.serve.port,
            open: self.serve.open,
        });

        BuildConfig {
            config_path: path.to_path_buf(),
            mode,
            site,
            source: root.join(self.build.source),
            destination: root.join(self.build.destination),
            ignore: self.build.ignore,
            clean: self.build.clean.unwrap_or(production),
            minify: self.build.minify.unwrap_or(production),
            debug: self.build.debug,
            templates: TemplateConfig {
                directory: root.join(self.templates.directory),
                partials: root.join(self.templates.partials),
                default_layout: self.templates.default_layout,
            },
            collections: self.collections,
            permalinks: self.permalinks,
            assets: self.assets.map(|assets| AssetConfig {
                source: root.join(assets.source),
                destination: assets.destination,
            }),
            serve,
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_source() -> PathBuf {
    PathBuf::from("src/html")
}

fn default_destination() -> PathBuf {
    PathBuf::from("build")
}

fn default_template_dir() -> PathBuf {
    PathBuf::from("src/template")
}

fn default_partials_dir() -> PathBuf {
    PathBuf::from("src/partials")
}

fn default_layout() -> String {
    "page.html".to_string()
}

fn default_asset_destination() -> PathBuf {
    PathBuf::from(".")
}

fn default_port() -> u16 {
    3000
}

fn default_date_format() -> String {
    "%Y/%m/%d".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::path::PathBuf;
    use tempfile::TempDir;

    const CONFIG: &str = r#"
[site]
name = "Ellen Nethers (1938 - 2016)"
description = "Tribute to Ellen Nethers"
author = "Terrence Drumm"
version = "1.0.0"

[site.development]
domain = "http://127.0.0.1"
rootpath = "/"

[site.production]
domain = "https://example.github.io"
rootpath = "/EllenNethers/"

[site.extra]
analytics = "UA-1"

[build]
mode = "production"
source = "src/html"
destination = "docs"

[[collections]]
name = "page"
pattern = "**/index.*"
sort_by = "priority"
reverse = true
refer = false

[[collections]]
name = "stories"
pattern = "stories/**/*"
sort_by = "title"
limit = 50
[collections.metadata]
layout = "story.html"

[permalinks]
pattern = ":mainCollection/:title"

[assets]
source = "src/assets"
"#;

    fn parse(mode: Option<BuildMode>) -> BuildConfig {
        BuildConfig::parse(CONFIG, Path::new("/site/anvil.toml"), mode).unwrap()
    }

    #[test]
    fn test_production_defaults() {
        let config = parse(None);
        assert_eq!(config.mode, BuildMode::Production);
        assert!(config.clean);
        assert!(config.minify);
        assert!(config.serve.is_none());
        assert!(!config.site.dev_build);
        assert_eq!(config.site.rootpath, "/EllenNethers/");
        assert_eq!(
            config.site.domain.as_deref(),
            Some("https://example.github.io")
        );
    }

    #[test]
    fn test_development_override() {
        let config = parse(Some(BuildMode::Development));
        assert!(!config.clean);
        assert!(!config.minify);
        assert!(config.site.dev_build);
        assert_eq!(config.site.rootpath, "/");
        assert_eq!(config.serve, Some(ServeConfig { port: 3000, open: false }));
    }

    #[test]
    fn test_paths_resolved_against_config_dir() {
        let config = parse(None);
        assert_eq!(config.source, PathBuf::from("/site/src/html"));
        assert_eq!(config.destination, PathBuf::from("/site/docs"));
        assert_eq!(config.templates.directory, PathBuf::from("/site/src/template"));
        assert_eq!(config.templates.partials, PathBuf::from("/site/src/partials"));
        assert_eq!(config.templates.default_layout, "page.html");
        let assets = config.assets.unwrap();
        assert_eq!(assets.source, PathBuf::from("/site/src/assets"));
        assert_eq!(assets.destination, PathBuf::from("."));
    }

    #[test]
    fn test_collections_keep_file_order() {
        let config = parse(None);
        let names: Vec<&str> = config
            .collections
            .iter()
            .map(|collection| collection.name.as_str())
            .collect();
        assert_eq!(names, vec!["page", "stories"]);

        let page = &config.collections[0];
        assert!(page.reverse);
        assert!(!page.refer);
        assert_eq!(page.limit, None);

        let stories = &config.collections[1];
        assert!(stories.refer);
        assert_eq!(stories.limit, Some(50));
        assert_eq!(
            stories.metadata.as_ref().unwrap().get("layout"),
            Some(&json!("story.html"))
        );
    }

    #[test]
    fn test_permalink_defaults() {
        let permalinks = parse(None).permalinks.unwrap();
        assert_eq!(permalinks.pattern, ":mainCollection/:title");
        assert_eq!(permalinks.date_format, "%Y/%m/%d");
        assert_eq!(permalinks.on_collision, CollisionPolicy::Overwrite);
        assert!(permalinks.linksets.is_empty());
    }

    #[test]
    fn test_site_metadata_flattens_extra() {
        let metadata = parse(None).site.to_metadata();
        assert_eq!(metadata.get("name"), Some(&json!("Ellen Nethers (1938 - 2016)")));
        assert_eq!(metadata.get("analytics"), Some(&json!("UA-1")));
        assert_eq!(metadata.get("dev_build"), Some(&json!(false)));
        assert!(metadata.get("contact").is_none());
    }

    #[test]
    fn test_explicit_clean_wins_over_mode() {
        let content = "[site]\nname = \"x\"\n[build]\nmode = \"production\"\nclean = false\n";
        let config = BuildConfig::parse(content, Path::new("anvil.toml"), None).unwrap();
        assert!(!config.clean);
        assert!(config.minify);
    }

    #[test]
    fn test_disabled_server_in_development() {
        let content = "[site]\nname = \"x\"\n[build]\nmode = \"development\"\n[serve]\nenabled = false\n";
        let config = BuildConfig::parse(content, Path::new("anvil.toml"), None).unwrap();
        assert_eq!(config.mode, BuildMode::Development);
        assert!(config.serve.is_none());
    }

    #[test]
    fn test_mode_from_str() {
        assert_eq!("dev".parse::<BuildMode>(), Ok(BuildMode::Development));
        assert_eq!("Production".parse::<BuildMode>(), Ok(BuildMode::Production));
        assert!("staging".parse::<BuildMode>().is_err());
    }

    #[test]
    fn test_missing_config() {
        let dir = TempDir::new().unwrap();
        let result = BuildConfig::load(&dir.path().join(DEFAULT_CONFIG_FILE), None);
        assert!(matches!(result, Err(AnvilError::ConfigNotFound { .. })));
    }

    #[test]
    fn test_invalid_toml() {
        let result = BuildConfig::parse("[site", Path::new("anvil.toml"), None);
        assert!(matches!(result, Err(AnvilError::TomlParse { .. })));
    }
}
