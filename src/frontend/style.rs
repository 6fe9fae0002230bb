//! Utility-CSS scan configuration.
//!
//! Mirrors `front/tailwind.config.ts`. The safelist keeps the grid column
//! classes that the gallery view builds at runtime (`grid-cols-{n}`), which
//! a static scan of the sources cannot see.

use serde::{Deserialize, Serialize};

/// Glob handed to the styling engine's content scanner.
pub const CONTENT_GLOB: &str = "./src/**/*.{html,js,svelte,ts}";

/// Largest grid column count the gallery offers.
pub const MAX_GRID_COLUMNS: u8 = 6;

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct ThemeConfig {
    pub extend: serde_json::Map<String, serde_json::Value>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StyleConfig {
    pub content: Vec<String>,
    pub theme: ThemeConfig,
    pub safelist: Vec<String>,
    pub plugins: Vec<String>,
}

/// Build the style configuration from its literal values.
#[must_use]
pub fn style_config() -> StyleConfig {
    StyleConfig {
        content: vec![CONTENT_GLOB.to_owned()],
        theme: ThemeConfig::default(),
        safelist: grid_cols_safelist(MAX_GRID_COLUMNS),
        plugins: Vec::new(),
    }
}

/// `grid-cols-1` through `grid-cols-{max}`.
#[must_use]
pub fn grid_cols_safelist(max: u8) -> Vec<String> {
    (1..=max).map(|n| format!("grid-cols-{n}")).collect()
}

impl StyleConfig {
    /// Whether `path` (relative to the front-end root) is covered by a content glob.
    #[must_use]
    pub fn scans(&self, path: &str) -> bool {
        self.content.iter().any(|glob| glob_matches(glob, path))
    }

    /// Serialize with the tool's key names.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

// =============================================================================
// GLOB MATCHING
// =============================================================================

/// Match a content glob against a relative path.
///
/// Supports `**` (any number of segments), `*` (within one segment) and one
/// `{a,b,...}` alternation, which is all the scanner globs use.
pub(crate) fn glob_matches(glob: &str, path: &str) -> bool {
    expand_braces(glob).iter().any(|pattern| {
        let pattern: Vec<&str> = split_segments(pattern);
        let path: Vec<&str> = split_segments(path);
        match_segments(&pattern, &path)
    })
}

fn expand_braces(glob: &str) -> Vec<String> {
    let (Some(open), Some(close)) = (glob.find('{'), glob.find('}')) else {
        return vec![glob.to_owned()];
    };
    if close < open {
        return vec![glob.to_owned()];
    }
    let (head, tail) = (&glob[..open], &glob[close + 1..]);
    glob[open + 1..close]
        .split(',')
        .map(|alt| format!("{head}{alt}{tail}"))
        .collect()
}

fn split_segments(s: &str) -> Vec<&str> {
    s.trim_start_matches("./")
        .split('/')
        .filter(|seg| !seg.is_empty() && *seg != ".")
        .collect()
}

fn match_segments(pattern: &[&str], path: &[&str]) -> bool {
    match (pattern.first(), path.first()) {
        (None, None) => true,
        (Some(&"**"), _) => {
            match_segments(&pattern[1..], path) || (!path.is_empty() && match_segments(pattern, &path[1..]))
        }
        (Some(p), Some(s)) => match_wildcard(p.as_bytes(), s.as_bytes()) && match_segments(&pattern[1..], &path[1..]),
        _ => false,
    }
}

fn match_wildcard(pattern: &[u8], text: &[u8]) -> bool {
    match pattern.split_first() {
        None => text.is_empty(),
        Some((b'*', rest)) => (0..=text.len()).any(|i| match_wildcard(rest, &text[i..])),
        Some((c, rest)) => text.first() == Some(c) && match_wildcard(rest, &text[1..]),
    }
}
