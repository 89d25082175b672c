//! Path template parsing and matching.
//!
//! # Responsibilities
//! - Parse templates like `/v1/items/{id}` into literal and parameter segments
//! - Match a normalized request path, binding parameter values
//! - Detect templates that could match the same concrete path
//!
//! # Design Decisions
//! - Literal matching is case-sensitive
//! - Parameters bind exactly one non-empty segment
//! - Empty segments (`//`, trailing `/`) are ignored on both sides
//! - No regex to guarantee O(segments) matching

use std::fmt;

use thiserror::Error;

/// Error raised for a malformed template.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TemplateError {
    #[error("template {0:?} must start with '/'")]
    MissingLeadingSlash(String),

    #[error("template {template:?} has a malformed segment {segment:?}")]
    MalformedSegment { template: String, segment: String },

    #[error("template {template:?} binds {name:?} more than once")]
    DuplicateParam { template: String, name: String },
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Param(String),
}

/// A compiled path template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// Parameter values bound by a successful match, in template order.
pub type PathParams = Vec<(String, String)>;

/// Split a path into its non-empty segments.
pub fn normalize_path(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

impl PathTemplate {
    pub fn parse(template: &str) -> Result<Self, TemplateError> {
        if !template.starts_with('/') {
            return Err(TemplateError::MissingLeadingSlash(template.to_string()));
        }

        let mut segments = Vec::new();
        for segment in normalize_path(template) {
            let parsed = match segment.strip_prefix('{').and_then(|s| s.strip_suffix('}')) {
                Some(name) if is_identifier(name) => {
                    let duplicate = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Param(existing) if existing == name));
                    if duplicate {
                        return Err(TemplateError::DuplicateParam {
                            template: template.to_string(),
                            name: name.to_string(),
                        });
                    }
                    Segment::Param(name.to_string())
                }
                Some(_) => {
                    return Err(TemplateError::MalformedSegment {
                        template: template.to_string(),
                        segment: segment.to_string(),
                    })
                }
                None if segment.contains(['{', '}']) => {
                    return Err(TemplateError::MalformedSegment {
                        template: template.to_string(),
                        segment: segment.to_string(),
                    })
                }
                None => Segment::Literal(segment.to_string()),
            };
            segments.push(parsed);
        }

        Ok(Self {
            raw: template.to_string(),
            segments,
        })
    }

    /// The template as written in configuration.
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// Names of the bound parameters, in order.
    pub fn params(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Param(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    /// Match already-normalized path segments.
    ///
    /// Parameter values are percent-decoded; a segment that does not decode
    /// to UTF-8 fails the match.
    pub fn matches(&self, path: &[&str]) -> Option<PathParams> {
        if path.len() != self.segments.len() {
            return None;
        }

        let mut params = Vec::new();
        for (segment, actual) in self.segments.iter().zip(path) {
            match segment {
                Segment::Literal(expected) if expected == actual => {}
                Segment::Literal(_) => return None,
                Segment::Param(name) => {
                    let value = urlencoding::decode(actual).ok()?;
                    params.push((name.clone(), value.into_owned()));
                }
            }
        }
        Some(params)
    }

    /// True when some concrete path would match both templates.
    pub fn overlaps(&self, other: &PathTemplate) -> bool {
        self.segments.len() == other.segments.len()
            && self
                .segments
                .iter()
                .zip(&other.segments)
                .all(|pair| match pair {
                    (Segment::Literal(a), Segment::Literal(b)) => a == b,
                    _ => true,
                })
    }
}

impl fmt::Display for PathTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

fn is_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
