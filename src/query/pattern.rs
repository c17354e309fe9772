use crate::core::{Result, ServiceError};
use lru::LruCache;
use parking_lot::Mutex;
use regex::Regex;
use std::num::NonZeroUsize;
use std::sync::Arc;

lazy_static::lazy_static! {
    static ref REGEX_LRU_CACHE: Arc<Mutex<LruCache<String, Arc<Regex>>>> =
        Arc::new(Mutex::new(LruCache::new(NonZeroUsize::new(200).unwrap())));
}

/// Convert a LIKE pattern to an anchored regex.
#[inline]
fn like_to_regex(pattern: &str) -> String {
    let mut regex = String::with_capacity(pattern.len() + 2);
    regex.push('^');

    let chars: Vec<char> = pattern.chars().collect();
    let mut i = 0;

    while i < chars.len() {
        match chars[i] {
            '%' => regex.push_str(".*"),
            '_' => regex.push('.'),
            '\\' if i + 1 < chars.len() => {
                i += 1;
                regex.push_str(&regex::escape(&chars[i].to_string()));
            }
            c if ".*+?^${}()|[]\\".contains(c) => {
                regex.push('\\');
                regex.push(c);
            }
            c => regex.push(c),
        }
        i += 1;
    }

    regex.push('$');
    regex
}

/// Fast path for simple patterns, no regex involved.
#[inline]
fn fast_path_like(text: &str, pattern: &str, case_sensitive: bool) -> Option<bool> {
    // 1. Exact match, no wildcards.
    if !pattern.contains('%') && !pattern.contains('_') && !pattern.contains('\\') {
        return Some(if case_sensitive {
            text == pattern
        } else {
            text.eq_ignore_ascii_case(pattern)
        });
    }

    if pattern.contains('\\') {
        return None;
    }

    // 2. "prefix%"
    if pattern.ends_with('%')
        && !pattern[..pattern.len() - 1].contains('%')
        && !pattern.contains('_')
    {
        let prefix = &pattern[..pattern.len() - 1];
        return Some(if case_sensitive {
            text.starts_with(prefix)
        } else {
            text.to_lowercase().starts_with(&prefix.to_lowercase())
        });
    }

    // 3. "%suffix"
    if pattern.starts_with('%') && !pattern[1..].contains('%') && !pattern.contains('_') {
        let suffix = &pattern[1..];
        return Some(if case_sensitive {
            text.ends_with(suffix)
        } else {
            text.to_lowercase().ends_with(&suffix.to_lowercase())
        });
    }

    // 4. "%substring%"
    if pattern.starts_with('%')
        && pattern.ends_with('%')
        && pattern.matches('%').count() == 2
        && !pattern.contains('_')
    {
        let substring = &pattern[1..pattern.len() - 1];
        return Some(if case_sensitive {
            text.contains(substring)
        } else {
            text.to_lowercase().contains(&substring.to_lowercase())
        });
    }

    None
}

/// Fetch a compiled regex from the LRU cache, compiling on miss.
fn get_or_compile_regex(pattern: &str, case_sensitive: bool) -> Result<Arc<Regex>> {
    let cache_key = if case_sensitive {
        format!("s:{}", pattern)
    } else {
        format!("i:{}", pattern)
    };

    {
        let mut cache = REGEX_LRU_CACHE.lock();
        if let Some(regex) = cache.get(&cache_key) {
            return Ok(Arc::clone(regex));
        }
    }

    let regex_pattern = like_to_regex(pattern);
    let compiled = regex::RegexBuilder::new(&regex_pattern)
        .case_insensitive(!case_sensitive)
        .build()
        .map_err(|e| {
            ServiceError::malformed("condition", format!("invalid LIKE pattern: {}", e))
        })?;

    let compiled_arc = Arc::new(compiled);

    {
        let mut cache = REGEX_LRU_CACHE.lock();
        cache.put(cache_key, Arc::clone(&compiled_arc));
    }

    Ok(compiled_arc)
}

/// Evaluate a LIKE pattern, `%` matching any run and `_` one character.
#[inline]
pub fn eval_like(text: &str, pattern: &str, case_sensitive: bool) -> Result<bool> {
    if let Some(result) = fast_path_like(text, pattern, case_sensitive) {
        return Ok(result);
    }

    let regex = get_or_compile_regex(pattern, case_sensitive)?;
    Ok(regex.is_match(text))
}

/// Backslash-escape wildcards so the input matches literally inside a
/// larger pattern.
pub fn escape_wildcards(raw: &str) -> String {
    let mut escaped = String::with_capacity(raw.len());
    for c in raw.chars() {
        if c == '%' || c == '_' || c == '\\' {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}
