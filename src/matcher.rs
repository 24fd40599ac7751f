use regex::{Captures, Regex};
use std::fmt;
use std::sync::Arc;

type Extractor<T> = Arc<dyn Fn(&Captures<'_>) -> Option<T> + Send + Sync>;

/// A pattern-extractor pair.
///
/// The extractor sees the captures of a successful search and may still
/// reject the line by returning `None`.
#[derive(Clone)]
pub struct PatternMatcher<T> {
    pub name: &'static str,
    pub pattern: Regex,
    pub extract: Extractor<T>,
}

impl<T> fmt::Debug for PatternMatcher<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PatternMatcher")
            .field("name", &self.name)
            .field("pattern", &self.pattern.as_str())
            .field("extract", &"Closure")
            .finish()
    }
}

impl<T> PatternMatcher<T> {
    pub fn new(
        name: &'static str,
        pattern: &str,
        extract: impl Fn(&Captures<'_>) -> Option<T> + Send + Sync + 'static,
    ) -> Result<Self, regex::Error> {
        Ok(PatternMatcher {
            name,
            pattern: Regex::new(pattern)?,
            extract: Arc::new(extract),
        })
    }

    /// Searches `line` and runs the extractor on a hit.
    pub fn apply(&self, line: &str) -> Option<T> {
        let caps = self.pattern.captures(line)?;
        (self.extract)(&caps)
    }
}

/// An ordered list of matchers where the first one to produce a value wins.
#[derive(Clone, Debug)]
pub struct MatcherCascade<T> {
    matchers: Vec<PatternMatcher<T>>,
}

impl<T> Default for MatcherCascade<T> {
    fn default() -> Self {
        MatcherCascade {
            matchers: Vec::new(),
        }
    }
}

impl<T> MatcherCascade<T> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a matcher; it is tried after every matcher added before it.
    pub fn with_matcher(mut self, matcher: PatternMatcher<T>) -> Self {
        self.matchers.push(matcher);
        self
    }

    /// Runs the cascade over one line.
    pub fn first_match(&self, line: &str) -> Option<T> {
        self.matchers.iter().find_map(|m| {
            let hit = m.apply(line);
            if hit.is_some() {
                log::trace!("matcher `{}` accepted: {}", m.name, line);
            }
            hit
        })
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.matchers.iter().map(|m| m.name).collect()
    }
}
