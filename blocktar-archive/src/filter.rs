//! Include/exclude name filtering for list and extract.

use glob::Pattern;

/// Glob based entry selection.
///
/// - If include patterns are given, a name must match at least one
/// - A name matching any exclude pattern is rejected
///
/// Patterns that fail to parse are dropped with a warning. An include list
/// whose patterns all failed still selects nothing.
#[derive(Debug, Clone, Default)]
pub struct EntryFilter {
    include: Vec<Pattern>,
    exclude: Vec<Pattern>,
    include_given: bool,
}

impl EntryFilter {
    /// Build a filter from raw glob strings.
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: compile(include),
            exclude: compile(exclude),
            include_given: !include.is_empty(),
        }
    }

    /// True when no pattern was given.
    pub fn is_empty(&self) -> bool {
        !self.include_given && self.exclude.is_empty()
    }

    /// Check if an entry name is selected.
    pub fn matches(&self, name: &str) -> bool {
        if self.exclude.iter().any(|p| p.matches(name)) {
            return false;
        }
        !self.include_given || self.include.iter().any(|p| p.matches(name))
    }
}

fn compile(patterns: &[String]) -> Vec<Pattern> {
    patterns
        .iter()
        .filter_map(|p| match Pattern::new(p) {
            Ok(pattern) => Some(pattern),
            Err(e) => {
                log::warn!("ignoring invalid pattern '{}': {}", p, e);
                None
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn strings(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_empty_filter_matches_all() {
        let filter = EntryFilter::default();
        assert!(filter.is_empty());
        assert!(filter.matches("anything"));
    }

    #[test]
    fn test_include_exclude() {
        let filter = EntryFilter::new(&strings(&["*.txt", "docs/*"]), &strings(&["*secret*"]));
        assert!(filter.matches("a.txt"));
        assert!(filter.matches("docs/guide.md"));
        assert!(!filter.matches("image.png"));
        assert!(!filter.matches("secret.txt"));
    }

    #[test]
    fn test_invalid_include_selects_nothing() {
        let filter = EntryFilter::new(&strings(&["[unclosed"]), &[]);
        assert!(!filter.is_empty());
        assert!(!filter.matches("anything.bin"));

        let filter = EntryFilter::new(&strings(&["[unclosed", "*.bin"]), &[]);
        assert!(filter.matches("anything.bin"));
        assert!(!filter.matches("other.txt"));
    }

    #[test]
    fn test_invalid_exclude_dropped() {
        let filter = EntryFilter::new(&[], &strings(&["[unclosed"]));
        assert!(filter.is_empty());
        assert!(filter.matches("anything.bin"));
    }
}
