//! Language configuration for compilation and execution

use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{HarnessError, HarnessResult};

/// Embedded default language table
const DEFAULT_LANGUAGES: &str =
    include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/files/languages.toml"));

/// How a language turns a source file into something runnable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LanguageKind {
    /// Compile once, then run the produced binary per case
    Compiled,
    /// Hand the source file straight to an interpreter per case
    Interpreted,
}

impl LanguageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            LanguageKind::Compiled => "compiled",
            LanguageKind::Interpreted => "interpreted",
        }
    }
}

impl std::fmt::Display for LanguageKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Configuration for a supported programming language
#[derive(Debug, Clone)]
pub struct LanguageConfig {
    /// Canonical name (table key, lowercased)
    pub name: String,
    pub kind: LanguageKind,
    /// File suffixes without the dot; the first one names materialized sources
    pub extensions: Vec<String>,
    /// Compile command template (None for interpreted languages)
    pub compile_command: Option<Vec<String>>,
    /// Run command template
    pub run_command: Vec<String>,
}

impl LanguageConfig {
    /// Extension used when writing a submission of this language to disk
    pub fn source_extension(&self) -> &str {
        self.extensions.first().map(String::as_str).unwrap_or("txt")
    }
}

/// Raw TOML configuration for a language
#[derive(Debug, Deserialize)]
struct RawLanguageConfig {
    kind: LanguageKind,
    #[serde(default)]
    extensions: Vec<String>,
    compile_command: Option<String>,
    run_command: String,
    #[serde(default)]
    aliases: Vec<String>,
}

/// Lookup table of supported languages by name, alias and file suffix
#[derive(Debug, Clone)]
pub struct LanguageRegistry {
    languages: BTreeMap<String, LanguageConfig>,
    aliases: HashMap<String, String>,
    extensions: HashMap<String, String>,
}

impl LanguageRegistry {
    /// Registry built from the embedded `files/languages.toml`
    pub fn builtin() -> anyhow::Result<Self> {
        Self::from_toml(DEFAULT_LANGUAGES)
    }

    /// Load from `path` when given, otherwise use the embedded table
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        match path {
            Some(path) => {
                let content = fs::read_to_string(path)
                    .with_context(|| format!("Failed to read {}", path.display()))?;
                Self::from_toml(&content)
                    .with_context(|| format!("Failed to parse {}", path.display()))
            }
            None => Self::builtin(),
        }
    }

    pub fn from_toml(content: &str) -> anyhow::Result<Self> {
        let raw_configs: HashMap<String, RawLanguageConfig> = toml::from_str(content)?;

        let mut registry = Self {
            languages: BTreeMap::new(),
            aliases: HashMap::new(),
            extensions: HashMap::new(),
        };

        for (name, raw) in raw_configs {
            let name = name.to_lowercase();

            let run_command = into_command(&raw.run_command);
            if run_command.is_empty() {
                anyhow::bail!("Empty run command for {}", name);
            }
            let compile_command = raw.compile_command.as_deref().map(into_command);
            match (raw.kind, &compile_command) {
                (LanguageKind::Compiled, None) => {
                    anyhow::bail!("Compiled language {} needs a compile_command", name)
                }
                (LanguageKind::Compiled, Some(cmd)) if cmd.is_empty() => {
                    anyhow::bail!("Empty compile command for {}", name)
                }
                (LanguageKind::Interpreted, Some(_)) => {
                    anyhow::bail!("Interpreted language {} must not have a compile_command", name)
                }
                _ => {}
            }

            let extensions: Vec<String> = raw
                .extensions
                .iter()
                .map(|ext| normalize_tag(ext))
                .filter(|ext| !ext.is_empty())
                .collect();
            if extensions.is_empty() {
                anyhow::bail!("Language {} declares no file extensions", name);
            }
            for ext in &extensions {
                if let Some(owner) = registry.extensions.insert(ext.clone(), name.clone()) {
                    anyhow::bail!("Extension .{} claimed by both {} and {}", ext, owner, name);
                }
            }

            for alias in raw.aliases {
                registry.aliases.insert(normalize_tag(&alias), name.clone());
            }

            registry.languages.insert(
                name.clone(),
                LanguageConfig {
                    name,
                    kind: raw.kind,
                    extensions,
                    compile_command,
                    run_command,
                },
            );
        }

        Ok(registry)
    }

    /// Get language configuration by canonical name or alias
    pub fn get(&self, language: &str) -> Option<&LanguageConfig> {
        let key = normalize_tag(language);
        self.languages.get(&key).or_else(|| {
            self.aliases
                .get(&key)
                .and_then(|name| self.languages.get(name))
        })
    }

    /// Get all supported language names
    pub fn names(&self) -> Vec<String> {
        self.languages.keys().cloned().collect()
    }

    /// Resolve the language of a submission.
    ///
    /// An explicit tag wins; it may be a language name, an alias, a file
    /// suffix, or one of the kinds `compiled` / `interpreted`. Without a tag
    /// the suffix of `file_name` decides.
    pub fn resolve(
        &self,
        tag: Option<&str>,
        file_name: Option<&str>,
    ) -> HarnessResult<&LanguageConfig> {
        if let Some(tag) = tag.filter(|t| !t.trim().is_empty()) {
            return self
                .by_tag(tag)
                .ok_or_else(|| HarnessError::UnsupportedLanguage(tag.to_string()));
        }

        let file_name = file_name.ok_or_else(|| {
            HarnessError::UnsupportedLanguage("no language tag or file name given".to_string())
        })?;

        Path::new(file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| self.by_extension(ext))
            .ok_or_else(|| {
                HarnessError::UnsupportedLanguage(format!("unrecognized file suffix: {}", file_name))
            })
    }

    fn by_tag(&self, tag: &str) -> Option<&LanguageConfig> {
        if let Some(config) = self.get(tag).or_else(|| self.by_extension(tag)) {
            return Some(config);
        }
        let key = normalize_tag(tag);
        let kind = [LanguageKind::Compiled, LanguageKind::Interpreted]
            .into_iter()
            .find(|kind| kind.as_str() == key)?;
        self.languages.values().find(|config| config.kind == kind)
    }

    fn by_extension(&self, ext: &str) -> Option<&LanguageConfig> {
        self.extensions
            .get(&normalize_tag(ext))
            .and_then(|name| self.languages.get(name))
    }
}

fn normalize_tag(tag: &str) -> String {
    tag.trim().trim_start_matches('.').to_lowercase()
}

fn into_command(command: &str) -> Vec<String> {
    command.split_whitespace().map(|s| s.to_string()).collect()
}
