use crate::page::PageReader;

/// One candidate location for a piece of scraped data. Reads the named
/// attribute when `attribute` is set, trimmed text content otherwise.
#[derive(Debug, Clone, Copy)]
pub struct LookupRule {
    pub selector: &'static str,
    pub attribute: Option<&'static str>,
}

impl LookupRule {
    pub const fn text(selector: &'static str) -> Self {
        Self { selector, attribute: None }
    }

    pub const fn attr(selector: &'static str, attribute: &'static str) -> Self {
        Self { selector, attribute: Some(attribute) }
    }

    fn read(&self, page: &dyn PageReader) -> Option<String> {
        match self.attribute {
            Some(attr) => page.query_attr(self.selector, attr),
            None => page.query_text(self.selector),
        }
    }

    fn read_all(&self, page: &dyn PageReader) -> Vec<String> {
        match self.attribute {
            Some(attr) => page.query_all_attr(self.selector, attr),
            None => page.query_all_text(self.selector),
        }
    }
}

/// Try each rule in order; the first non-empty result wins and later rules
/// are never evaluated. An unavailable target is a miss, not an error.
pub fn resolve(page: &dyn PageReader, rules: &[LookupRule]) -> Option<String> {
    rules
        .iter()
        .find_map(|rule| rule.read(page).filter(|v| !v.trim().is_empty()))
        .map(|v| v.trim().to_string())
}

/// Multi-valued variant of [`resolve`]: first rule yielding any values wins.
pub fn resolve_all(page: &dyn PageReader, rules: &[LookupRule]) -> Vec<String> {
    for rule in rules {
        let values = rule.read_all(page);
        if !values.is_empty() {
            return values;
        }
    }
    Vec::new()
}
