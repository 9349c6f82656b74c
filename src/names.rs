//! Template modes and interned element/attribute names
//!
//! Names are case-normalized per template mode at intern time: HTML name
//! comparison is case-insensitive (normalized to lowercase), XML is
//! case-sensitive (kept verbatim). The definitions registry pre-registers
//! the standard HTML elements and keeps a bounded LRU cache for everything
//! else, so repeated lookups of the same dynamic name stay cheap.

use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;

/// Markup flavor a parser is bound to at construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemplateMode {
    Html,
    Xml,
}

impl TemplateMode {
    #[inline]
    pub fn is_html(self) -> bool {
        matches!(self, TemplateMode::Html)
    }

    /// Case-normalize a name for this mode.
    pub fn normalize(self, name: &str) -> String {
        match self {
            TemplateMode::Html => name.to_ascii_lowercase(),
            TemplateMode::Xml => name.to_string(),
        }
    }

    /// Compare two names under this mode's case rules.
    #[inline]
    pub fn names_equal(self, a: &str, b: &str) -> bool {
        match self {
            TemplateMode::Html => a.eq_ignore_ascii_case(b),
            TemplateMode::Xml => a == b,
        }
    }
}

impl std::fmt::Display for TemplateMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TemplateMode::Html => write!(f, "HTML"),
            TemplateMode::Xml => write!(f, "XML"),
        }
    }
}

/// Interned, mode-normalized element name.
///
/// Equality is cheap pointer-or-content comparison over the normalized
/// form; two names that differ only in case compare equal in HTML mode
/// because both normalize to the same interned string.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementName {
    normalized: Arc<str>,
}

impl ElementName {
    pub fn as_str(&self) -> &str {
        &self.normalized
    }
}

/// Interned, mode-normalized attribute name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AttributeName {
    normalized: Arc<str>,
}

impl AttributeName {
    pub fn as_str(&self) -> &str {
        &self.normalized
    }
}

/// Static metadata for an element name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementDefinition {
    pub name: ElementName,
    /// HTML void elements never have content and never push onto the
    /// open-tag stack
    pub void_element: bool,
}

/// HTML elements with no content model (never matched by a close tag).
const HTML_VOID_ELEMENTS: &[&str] = &[
    "area", "base", "br", "col", "embed", "hr", "img", "input", "link", "meta", "param", "source",
    "track", "wbr",
];

/// Whether a (lowercased) name is a standard HTML void element.
pub(crate) fn is_html_void(name: &str) -> bool {
    HTML_VOID_ELEMENTS.contains(&name)
}

const DYNAMIC_CACHE_CAPACITY: usize = 512;

/// Registry of element and attribute name definitions for one mode.
///
/// Standard HTML elements are registered eagerly; arbitrary names seen in
/// templates are interned on demand through a bounded LRU cache.
pub struct ElementDefinitions {
    mode: TemplateMode,
    standard: HashMap<&'static str, ElementDefinition>,
    dynamic: LruCache<String, ElementDefinition>,
    attribute_names: LruCache<String, AttributeName>,
}

impl ElementDefinitions {
    pub fn new(mode: TemplateMode) -> Self {
        let mut standard = HashMap::new();
        if mode.is_html() {
            for &name in HTML_VOID_ELEMENTS {
                standard.insert(
                    name,
                    ElementDefinition {
                        name: ElementName {
                            normalized: Arc::from(name),
                        },
                        void_element: true,
                    },
                );
            }
        }
        let cap = NonZeroUsize::new(DYNAMIC_CACHE_CAPACITY).unwrap();
        ElementDefinitions {
            mode,
            standard,
            dynamic: LruCache::new(cap),
            attribute_names: LruCache::new(cap),
        }
    }

    pub fn mode(&self) -> TemplateMode {
        self.mode
    }

    /// Look up (interning on first sight) the definition for an element
    /// name as it appeared in source.
    pub fn for_element(&mut self, raw: &str) -> ElementDefinition {
        let normalized = self.mode.normalize(raw);
        if let Some(def) = self.standard.get(normalized.as_str()) {
            return def.clone();
        }
        if let Some(def) = self.dynamic.get(&normalized) {
            return def.clone();
        }
        let def = ElementDefinition {
            name: ElementName {
                normalized: Arc::from(normalized.as_str()),
            },
            void_element: false,
        };
        self.dynamic.put(normalized, def.clone());
        def
    }

    /// Intern an element name without its definition metadata.
    pub fn element_name(&mut self, raw: &str) -> ElementName {
        self.for_element(raw).name
    }

    /// Intern an attribute name as it appeared in source.
    pub fn attribute_name(&mut self, raw: &str) -> AttributeName {
        let normalized = self.mode.normalize(raw);
        if let Some(name) = self.attribute_names.get(&normalized) {
            return name.clone();
        }
        let name = AttributeName {
            normalized: Arc::from(normalized.as_str()),
        };
        self.attribute_names.put(normalized, name.clone());
        name
    }
}

impl std::fmt::Debug for ElementDefinitions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElementDefinitions")
            .field("mode", &self.mode)
            .field("standard", &self.standard.len())
            .field("dynamic", &self.dynamic.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_html_names_are_case_insensitive() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let a = defs.element_name("DIV");
        let b = defs.element_name("div");
        assert_eq!(a, b);
        assert_eq!(a.as_str(), "div");
    }

    #[test]
    fn test_xml_names_are_case_sensitive() {
        let mut defs = ElementDefinitions::new(TemplateMode::Xml);
        let a = defs.element_name("Node");
        let b = defs.element_name("node");
        assert_ne!(a, b);
        assert_eq!(a.as_str(), "Node");
    }

    #[test]
    fn test_void_elements_preregistered() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        assert!(defs.for_element("BR").void_element);
        assert!(!defs.for_element("div").void_element);
    }

    #[test]
    fn test_xml_has_no_void_elements() {
        let mut defs = ElementDefinitions::new(TemplateMode::Xml);
        assert!(!defs.for_element("br").void_element);
    }

    #[test]
    fn test_dynamic_lookup_reuses_interned_name() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        let a = defs.element_name("my-widget");
        let b = defs.element_name("MY-WIDGET");
        assert!(Arc::ptr_eq(&a.normalized, &b.normalized));
    }

    #[test]
    fn test_attribute_name_normalization() {
        let mut defs = ElementDefinitions::new(TemplateMode::Html);
        assert_eq!(defs.attribute_name("CLASS"), defs.attribute_name("class"));
    }
}
