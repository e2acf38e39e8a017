use regex::Regex;

use crate::types::TypeName;

/// Archive-scope predicate over raw type names (`a.b.Outer$Inner`).
///
/// The pattern is searched for, not anchored. No pattern accepts everything.
#[derive(Debug, Clone, Default)]
pub struct NameFilter(Option<Regex>);

impl NameFilter {
    pub fn new(pattern: Option<&str>) -> Result<Self, regex::Error> {
        pattern.map(Regex::new).transpose().map(NameFilter)
    }

    pub fn accepts(&self, ty: &TypeName) -> bool {
        self.0.as_ref().is_none_or(|re| re.is_match(ty.raw_name()))
    }

    pub fn pattern(&self) -> Option<&str> {
        self.0.as_ref().map(Regex::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_accepts_everything() {
        let filter = NameFilter::default();
        assert!(filter.accepts(&TypeName::new("a.b.C")));
        assert_eq!(filter.pattern(), None);
    }

    #[test]
    fn pattern_is_an_unanchored_search_over_raw_names() {
        let filter = NameFilter::new(Some(r"\.model\.")).unwrap();
        assert!(filter.accepts(&TypeName::new("org.example.model.User")));
        assert!(!filter.accepts(&TypeName::new("org.example.web.Controller")));

        let inner = NameFilter::new(Some(r"\$Builder$")).unwrap();
        assert!(inner.accepts(&TypeName::new("a.User$Builder")));
    }

    #[test]
    fn invalid_pattern_is_rejected() {
        assert!(NameFilter::new(Some("(unclosed")).is_err());
    }
}
