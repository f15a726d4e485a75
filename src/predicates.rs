//! Tag and attribute name predicates
//!
//! Both grammars are the ones React's server renderer uses. Verdicts are
//! memoized per name for the lifetime of the process; the caches grow with
//! the number of distinct names a program renders, which is small in
//! practice.

use std::collections::HashMap;
use std::sync::RwLock;

use once_cell::sync::Lazy;
use regex::Regex;

/// Tags that never have a closing tag or rendered children
pub const VOID_TAGS: [&str; 15] = [
    "area", "base", "br", "col", "embed", "hr", "img", "input", "keygen", "link", "meta",
    "param", "source", "track", "wbr",
];

static VALID_TAG_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[a-zA-Z][a-zA-Z0-9_.:\-]*$").expect("Invalid tag name regex"));

static VALID_ATTRIBUTE_NAME_REGEX: Lazy<Regex> = Lazy::new(|| {
    const START: &str = ":A-Z_a-z\\x{C0}-\\x{D6}\\x{D8}-\\x{F6}\\x{F8}-\\x{2FF}\\x{370}-\\x{37D}\
        \\x{37F}-\\x{1FFF}\\x{200C}-\\x{200D}\\x{2070}-\\x{218F}\\x{2C00}-\\x{2FEF}\
        \\x{3001}-\\x{D7FF}\\x{F900}-\\x{FDCF}\\x{FDF0}-\\x{FFFD}";
    const REST: &str = "\\-.0-9\\x{B7}\\x{300}-\\x{36F}\\x{203F}-\\x{2040}";
    Regex::new(&format!("^[{START}][{START}{REST}]*$")).expect("Invalid attribute name regex")
});

static TAG_NAMES: Lazy<ValidityCache> = Lazy::new(|| ValidityCache::new(&VALID_TAG_REGEX));

static ATTRIBUTE_NAMES: Lazy<ValidityCache> =
    Lazy::new(|| ValidityCache::new(&VALID_ATTRIBUTE_NAME_REGEX));

/// A memoizing grammar check
pub struct ValidityCache {
    grammar: &'static Lazy<Regex>,
    verdicts: RwLock<HashMap<String, bool>>,
}

impl ValidityCache {
    fn new(grammar: &'static Lazy<Regex>) -> Self {
        Self {
            grammar,
            verdicts: RwLock::new(HashMap::new()),
        }
    }

    /// Check a name, consulting and filling the cache
    pub fn check(&self, name: &str) -> bool {
        if let Some(verdict) = self.cached(name) {
            return verdict;
        }

        let verdict = self.grammar.is_match(name);
        if let Ok(mut verdicts) = self.verdicts.write() {
            verdicts.insert(name.to_string(), verdict);
        }
        verdict
    }

    /// The cached verdict for a name, if it has been checked before
    pub fn cached(&self, name: &str) -> Option<bool> {
        self.verdicts
            .read()
            .ok()
            .and_then(|verdicts| verdicts.get(name).copied())
    }

    /// Number of memoized names
    pub fn len(&self) -> usize {
        self.verdicts.read().map(|v| v.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Whether `tag` is an acceptable HTML tag name
pub fn is_tag_valid(tag: &str) -> bool {
    TAG_NAMES.check(tag)
}

/// Whether `name` is an acceptable HTML attribute name
pub fn is_attribute_name_valid(name: &str) -> bool {
    ATTRIBUTE_NAMES.check(name)
}

/// Whether `tag` is one of the [`VOID_TAGS`] (exact, case-sensitive match)
pub fn is_void_tag(tag: &str) -> bool {
    VOID_TAGS.contains(&tag)
}

/// The process-wide tag name cache
pub fn tag_name_cache() -> &'static ValidityCache {
    &TAG_NAMES
}

/// The process-wide attribute name cache
pub fn attribute_name_cache() -> &'static ValidityCache {
    &ATTRIBUTE_NAMES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_tags() {
        for tag in ["div", "h1", "my-element", "svg:rect", "x.y", "a_b", "DIV"] {
            assert!(is_tag_valid(tag), "{tag} should be valid");
        }
    }

    #[test]
    fn test_invalid_tags() {
        for tag in ["", "-div", "1div", "di v", "div>", "<div", "dïv"] {
            assert!(!is_tag_valid(tag), "{tag:?} should be invalid");
        }
    }

    #[test]
    fn test_tag_cache_is_consistent() {
        let first = is_tag_valid("cache-probe-tag");
        assert_eq!(tag_name_cache().cached("cache-probe-tag"), Some(first));
        assert_eq!(is_tag_valid("cache-probe-tag"), first);

        assert!(!is_tag_valid("-cache-probe"));
        assert_eq!(tag_name_cache().cached("-cache-probe"), Some(false));
        assert!(!tag_name_cache().is_empty());
    }

    #[test]
    fn test_attribute_names() {
        for name in ["class", "data-foo", "aria-label", ":colon", "_x", "xml:lang", "é", "a·b"] {
            assert!(is_attribute_name_valid(name), "{name} should be valid");
        }
        for name in ["", "-x", "1x", "a b", "a\"b", "a=b", "a>b", "a/b", "·x"] {
            assert!(!is_attribute_name_valid(name), "{name:?} should be invalid");
        }
        assert_eq!(attribute_name_cache().cached("a b"), Some(false));
    }

    #[test]
    fn test_void_tags() {
        assert!(is_void_tag("img"));
        assert!(is_void_tag("br"));
        assert!(!is_void_tag("IMG"));
        assert!(!is_void_tag("div"));
        assert_eq!(VOID_TAGS.len(), 15);
    }
}
