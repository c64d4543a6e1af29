use crate::engine::runtime::{Error, ErrorCode};
use std::collections::HashMap;
use std::sync::Arc;

pub trait Collation: Send + Sync {
    fn uri(&self) -> &str;
    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering;
    fn key(&self, s: &str) -> String {
        s.to_string()
    }
    fn compares_equal(&self, a: &str, b: &str) -> bool {
        self.compare(a, b).is_eq()
    }
    /// Whether `contains`, `starts-with` and friends may use this collation.
    fn supports_substring_matching(&self) -> bool {
        false
    }
}

pub use crate::consts::CODEPOINT_URI;
pub use crate::consts::SIMPLE_ACCENT_URI;
pub use crate::consts::SIMPLE_CASE_ACCENT_URI;
pub use crate::consts::SIMPLE_CASE_URI;

/// Look up a collation by URI. A relative URI is first resolved against `base_uri`; both
/// the literal and the resolved form are tried.
pub fn resolve_collation(
    registry: &CollationRegistry,
    uri: &str,
    base_uri: Option<&str>,
) -> Result<Arc<dyn Collation>, Error> {
    if let Some(c) = registry.get(uri) {
        return Ok(c);
    }
    if url::Url::parse(uri).is_err()
        && let Some(base) = base_uri.and_then(|b| url::Url::parse(b).ok())
        && let Ok(abs) = base.join(uri)
        && let Some(c) = registry.get(abs.as_str())
    {
        return Ok(c);
    }
    tracing::debug!(collation = uri, base = ?base_uri, "collation not resolved");
    Err(Error::from_code(ErrorCode::FOCH0002, format!("unknown collation URI: {uri}")))
}

/// Substring functions only work with the codepoint collation.
pub fn require_substring_matching(c: &dyn Collation) -> Result<(), Error> {
    if c.supports_substring_matching() {
        Ok(())
    } else {
        Err(Error::from_code(
            ErrorCode::FOCH0004,
            format!("collation {} does not support substring matching", c.uri()),
        ))
    }
}

pub struct CodepointCollation;

impl Collation for CodepointCollation {
    fn uri(&self) -> &str {
        CODEPOINT_URI
    }
    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
        a.cmp(b)
    }
    fn compares_equal(&self, a: &str, b: &str) -> bool {
        a == b
    }
    fn supports_substring_matching(&self) -> bool {
        true
    }
}

/// Simple case-insensitive collation
pub struct SimpleCaseCollation;

impl Collation for SimpleCaseCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_URI
    }
    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        s.to_lowercase()
    }
}

fn strip_marks(s: &str) -> String {
    use unicode_normalization::UnicodeNormalization;
    use unicode_normalization::char::canonical_combining_class as ccc;
    s.nfd().filter(|&ch| ccc(ch) == 0).collect()
}

/// Simple accent-insensitive collation (NFD + remove combining marks)
pub struct SimpleAccentCollation;

impl Collation for SimpleAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s)
    }
}

/// Simple case+accent-insensitive collation
pub struct SimpleCaseAccentCollation;

impl Collation for SimpleCaseAccentCollation {
    fn uri(&self) -> &str {
        SIMPLE_CASE_ACCENT_URI
    }
    fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
        self.key(a).cmp(&self.key(b))
    }
    fn key(&self, s: &str) -> String {
        strip_marks(s).to_lowercase()
    }
}

/// Registry of available collations, keyed by their URI
pub struct CollationRegistry {
    by_uri: HashMap<String, Arc<dyn Collation>>,
}

impl Default for CollationRegistry {
    fn default() -> Self {
        let mut reg = Self { by_uri: HashMap::new() };
        reg.insert(Arc::new(CodepointCollation));
        reg.insert(Arc::new(SimpleCaseCollation));
        reg.insert(Arc::new(SimpleAccentCollation));
        reg.insert(Arc::new(SimpleCaseAccentCollation));
        tracing::debug!(collations = reg.by_uri.len(), "collation registry initialised");
        reg
    }
}

impl core::fmt::Debug for CollationRegistry {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_set().entries(self.by_uri.keys()).finish()
    }
}

impl CollationRegistry {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn get(&self, uri: &str) -> Option<Arc<dyn Collation>> {
        self.by_uri.get(uri).cloned()
    }
    pub fn insert(&mut self, collation: Arc<dyn Collation>) {
        self.by_uri.insert(collation.uri().to_string(), collation);
    }
    /// The codepoint collation, which is always registered.
    pub fn codepoint() -> Arc<dyn Collation> {
        Arc::new(CodepointCollation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Aliased;

    impl Collation for Aliased {
        fn uri(&self) -> &str {
            "http://example.com/collations/upper"
        }
        fn compare(&self, a: &str, b: &str) -> core::cmp::Ordering {
            a.to_uppercase().cmp(&b.to_uppercase())
        }
    }

    #[test]
    fn relative_uri_resolved_against_base() {
        let mut reg = CollationRegistry::new();
        reg.insert(Arc::new(Aliased));
        let c = resolve_collation(&reg, "upper", Some("http://example.com/collations/")).unwrap();
        assert_eq!(c.uri(), "http://example.com/collations/upper");
        let err = resolve_collation(&reg, "upper", None).err().unwrap();
        assert_eq!(err.code_enum(), ErrorCode::FOCH0002);
    }

    #[test]
    fn only_codepoint_supports_substrings() {
        assert!(require_substring_matching(&CodepointCollation).is_ok());
        let err = require_substring_matching(&SimpleCaseCollation).unwrap_err();
        assert_eq!(err.code_enum(), ErrorCode::FOCH0004);
    }

    #[test]
    fn accent_key_drops_marks() {
        assert!(SimpleCaseAccentCollation.compares_equal("Éte", "ete"));
        assert!(!SimpleCaseCollation.compares_equal("Éte", "ete"));
    }
}
