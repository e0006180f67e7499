//! Property scope and `##NAME##` marker substitution.

use std::collections::BTreeMap;

use thiserror::Error;

/// Upper bound on substitution rescans of a single string.
pub const MAX_SUBSTITUTION_PASSES: usize = 64;

/// An error raised while substituting property markers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubstitutionError {
    /// Markers kept producing further markers, usually because a property
    /// refers to itself.
    #[error(
        "property substitution did not settle after {limit} passes (last property substituted: '{name_hint}')"
    )]
    PassLimitExceeded { limit: usize, name_hint: String },
}

/// Named string values with an optional parent scope for fallback lookup.
#[derive(Debug, Clone, Default)]
pub struct PropertyScope {
    values: BTreeMap<String, String>,
    parent: Option<Box<PropertyScope>>,
}

impl PropertyScope {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates an empty scope that falls back to `parent`.
    pub fn with_parent(parent: PropertyScope) -> Self {
        Self {
            values: BTreeMap::new(),
            parent: Some(Box::new(parent)),
        }
    }

    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.values.insert(name.into(), value.into());
    }

    pub fn remove(&mut self, name: &str) {
        self.values.remove(name);
    }

    /// Returns true if this scope itself defines `name`.
    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    /// Returns the value of `name`, asking the parent scope when this scope
    /// does not define it. Unknown names resolve to the empty string.
    pub fn get(&self, name: &str) -> &str {
        match self.values.get(name) {
            Some(value) => value,
            None => self.parent.as_deref().map_or("", |parent| parent.get(name)),
        }
    }

    /// Values defined directly in this scope.
    pub fn values(&self) -> &BTreeMap<String, String> {
        &self.values
    }

    /// Replaces every `##NAME##` marker in `input` with the property's value.
    ///
    /// Spaces and tabs just inside the delimiters are ignored. A marker whose
    /// content is not a single name (`##A B##`, `##A-B##`) is removed. An
    /// unterminated `##` is kept as literal text. Replacement repeats on its own
    /// output until a pass replaces nothing, so values may contain markers. At
    /// most [`MAX_SUBSTITUTION_PASSES`] passes may replace something.
    pub fn substitute(&self, input: &str) -> Result<String, SubstitutionError> {
        let mut current = input.to_string();
        for _ in 0..MAX_SUBSTITUTION_PASSES {
            let (output, substituted) = self.substitute_once(&current);
            if substituted.is_none() {
                return Ok(output);
            }
            current = output;
        }
        match self.substitute_once(&current) {
            (output, None) => Ok(output),
            (_, Some(name_hint)) => Err(SubstitutionError::PassLimitExceeded {
                limit: MAX_SUBSTITUTION_PASSES,
                name_hint,
            }),
        }
    }

    /// One left-to-right pass. Returns the output and the last name replaced,
    /// or `None` if no marker was replaced.
    fn substitute_once(&self, input: &str) -> (String, Option<String>) {
        let chars: Vec<char> = input.chars().collect();
        let mut output = String::with_capacity(input.len());
        let mut last = None;
        let mut i = 0;
        while i < chars.len() {
            if !is_delimiter(&chars, i) {
                output.push(chars[i]);
                i += 1;
                continue;
            }

            let start = i;
            i += 2;
            while matches!(chars.get(i), Some(' ' | '\t')) {
                i += 1;
            }
            let mut name = String::new();
            let mut done_with_name = false;
            let mut invalid = false;
            let mut closed = false;
            while i < chars.len() {
                if is_delimiter(&chars, i) {
                    i += 2;
                    closed = true;
                    break;
                }
                match chars[i] {
                    ' ' | '\t' => done_with_name = true,
                    c if is_property_char(c) => {
                        invalid |= done_with_name;
                        name.push(c);
                    }
                    _ => invalid = true,
                }
                i += 1;
            }

            if !closed {
                output.extend(&chars[start..]);
                break;
            }
            if !invalid {
                output.push_str(self.get(&name));
                last = Some(name);
            }
        }
        (output, last)
    }
}

fn is_delimiter(chars: &[char], i: usize) -> bool {
    chars.get(i) == Some(&'#') && chars.get(i + 1) == Some(&'#')
}

fn is_property_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}
