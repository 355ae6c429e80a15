//! Prompt templates with named, typed slots
//!
//! A template is parsed once into literal text and [`Slot`]s. Binding a slot
//! turns it into literal text, so bound values are never scanned again and a
//! later pass can only fill slots that were present in the original file.
//! Unbound slots render back as `{name}`.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use std::path::PathBuf;
use tracing::debug;

use crate::core::errors::{Result, TranslationError};

static PLACEHOLDER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\{([a-z_]+)\}").expect("placeholder pattern is valid"));

/// Template names shipped in the prompts directory
pub const TRANSLATE_SYSTEM: &str = "translate_system.txt";
pub const COMPARE_SYSTEM: &str = "compare_system.txt";

/// A named placeholder a template may contain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Slot {
    Source,
    Target,
    Language,
    TagName,
    OriginalTag,
    BackTranslatedTag,
}

impl Slot {
    pub fn name(&self) -> &'static str {
        match self {
            Slot::Source => "source",
            Slot::Target => "target",
            Slot::Language => "language",
            Slot::TagName => "tag_name",
            Slot::OriginalTag => "original_tag",
            Slot::BackTranslatedTag => "back_translated_tag",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "source" => Some(Slot::Source),
            "target" => Some(Slot::Target),
            "language" => Some(Slot::Language),
            "tag_name" => Some(Slot::TagName),
            "original_tag" => Some(Slot::OriginalTag),
            "back_translated_tag" => Some(Slot::BackTranslatedTag),
            _ => None,
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}", self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Text(String),
    Slot(Slot),
}

/// Parsed prompt template
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    /// Parse template text. Braced names that are not known slots stay literal.
    pub fn parse(source: &str) -> Self {
        let mut segments = Vec::new();
        let mut last = 0;

        for caps in PLACEHOLDER.captures_iter(source) {
            let (Some(whole), Some(slot)) = (caps.get(0), Slot::from_name(&caps[1])) else {
                continue;
            };
            if whole.start() > last {
                segments.push(Segment::Text(source[last..whole.start()].to_string()));
            }
            segments.push(Segment::Slot(slot));
            last = whole.end();
        }

        if last < source.len() {
            segments.push(Segment::Text(source[last..].to_string()));
        }

        Self { segments }
    }

    /// Fill every occurrence of `slot` with `value`
    pub fn bind(mut self, slot: Slot, value: &str) -> Self {
        for segment in &mut self.segments {
            if *segment == Segment::Slot(slot) {
                *segment = Segment::Text(value.to_string());
            }
        }
        self
    }

    /// Fill several slots at once
    pub fn bind_all(self, values: &[(Slot, &str)]) -> Self {
        values
            .iter()
            .fold(self, |template, (slot, value)| template.bind(*slot, value))
    }

    /// Slots still waiting for a value
    pub fn unbound(&self) -> Vec<Slot> {
        let mut slots = Vec::new();
        for segment in &self.segments {
            if let Segment::Slot(slot) = segment {
                if !slots.contains(slot) {
                    slots.push(*slot);
                }
            }
        }
        slots
    }

    /// Render to text, writing unbound slots back as `{name}`
    pub fn render(&self) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Slot(slot) => out.push_str(&slot.to_string()),
            }
        }
        out
    }
}

/// Loads templates from a prompts directory. Files are re-read on every call.
#[derive(Debug, Clone)]
pub struct PromptLoader {
    dir: PathBuf,
}

impl PromptLoader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Load and parse a template by file name
    pub fn load(&self, name: &str) -> Result<Template> {
        let path = self.dir.join(name);
        debug!("Loading prompt from {}", path.display());

        let content = std::fs::read_to_string(&path).map_err(|e| match e.kind() {
            std::io::ErrorKind::NotFound => TranslationError::TemplateNotFound {
                path: path.display().to_string(),
            },
            _ => TranslationError::FileError {
                path: path.display().to_string(),
                message: e.to_string(),
            },
        })?;

        Ok(Template::parse(content.trim()))
    }

    /// Load a template and bind the given slots, leaving the rest for later
    pub fn load_with(&self, name: &str, values: &[(Slot, &str)]) -> Result<Template> {
        Ok(self.load(name)?.bind_all(values))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_binding_keeps_unbound_slot() {
        let template = Template::parse("Translate from {source}. Wrap in <{tag_name}>.");
        let partial = template.bind(Slot::Source, "hu");

        assert_eq!(partial.render(), "Translate from hu. Wrap in <{tag_name}>.");
        assert_eq!(partial.unbound(), vec![Slot::TagName]);

        let full = partial.bind(Slot::TagName, "ab12");
        assert_eq!(full.render(), "Translate from hu. Wrap in <ab12>.");
        assert!(full.unbound().is_empty());
    }

    #[test]
    fn test_bound_values_are_not_rescanned() {
        let template = Template::parse("{source} -> {target} [{tag_name}]")
            .bind(Slot::Source, "{tag_name}")
            .bind(Slot::Target, "en")
            .bind(Slot::TagName, "cafe");

        assert_eq!(template.render(), "{tag_name} -> en [cafe]");
    }

    #[test]
    fn test_unknown_braces_are_literal() {
        let source = r#"Reply as {"answer": 1} or {unknown} in {language}"#;
        let rendered = Template::parse(source).bind(Slot::Language, "hu").render();

        assert_eq!(rendered, r#"Reply as {"answer": 1} or {unknown} in hu"#);
    }

    #[test]
    fn test_repeated_slot_bound_everywhere() {
        let rendered = Template::parse("<{tag_name}>x</{tag_name}>")
            .bind(Slot::TagName, "f00d")
            .render();
        assert_eq!(rendered, "<f00d>x</f00d>");
    }

    #[test]
    fn test_loader_reads_and_binds() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("t.txt"), "\n{source} to {target}\n").unwrap();

        let loader = PromptLoader::new(dir.path());
        let template = loader
            .load_with("t.txt", &[(Slot::Source, "en"), (Slot::Target, "af")])
            .unwrap();
        assert_eq!(template.render(), "en to af");
    }

    #[test]
    fn test_loader_rereads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("t.txt");
        let loader = PromptLoader::new(dir.path());

        std::fs::write(&path, "first").unwrap();
        assert_eq!(loader.load("t.txt").unwrap().render(), "first");

        std::fs::write(&path, "second").unwrap();
        assert_eq!(loader.load("t.txt").unwrap().render(), "second");
    }

    #[test]
    fn test_missing_template() {
        let dir = tempfile::tempdir().unwrap();
        let loader = PromptLoader::new(dir.path());

        match loader.load("missing.txt") {
            Err(TranslationError::TemplateNotFound { path }) => {
                assert!(path.ends_with("missing.txt"))
            }
            other => panic!("expected TemplateNotFound, got {:?}", other),
        }
    }

    #[test]
    fn test_shipped_templates_parse() {
        let loader = PromptLoader::new(concat!(env!("CARGO_MANIFEST_DIR"), "/prompts"));

        let translate = loader.load(TRANSLATE_SYSTEM).unwrap();
        assert_eq!(
            translate.unbound(),
            vec![Slot::Source, Slot::Target, Slot::TagName]
        );

        let compare = loader.load(COMPARE_SYSTEM).unwrap();
        assert_eq!(
            compare.unbound(),
            vec![Slot::Language, Slot::OriginalTag, Slot::BackTranslatedTag]
        );
    }
}
