use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorKind {
    /// `equals` did not hold
    Equality,
    /// Value had an unexpected type
    Type,
    /// Required key or index was absent
    MissingKey,
    /// No alternative of `any` succeeded
    NoAlternative,
    /// `regex` found no match
    Regex,
    /// JSON, HTML or XML parsing failed
    Parse,
    /// `transform` returned an error
    Transform,
    /// Value is not a valid URL
    Url,
    /// `startswith` / `endswith`
    Predicate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PathSegment {
    Key(String),
    Index(usize),
    /// Named selectors such as `<url.path>` or `<xpath>`
    Selector(String),
}

impl fmt::Display for PathSegment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PathSegment::Key(key) => write!(f, ".{key}"),
            PathSegment::Index(index) => write!(f, "[{index}]"),
            PathSegment::Selector(selector) => write!(f, "<{selector}>"),
        }
    }
}

/// A rejected value, with the breadcrumb path into the rejected document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    pub kind: ValidationErrorKind,
    pub message: String,
    pub path: Vec<PathSegment>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Validation error at $")?;
        for segment in &self.path {
            write!(f, "{segment}")?;
        }
        write!(f, ": {}", self.message)
    }
}

impl std::error::Error for ValidationError {}

impl ValidationError {
    pub fn new(kind: ValidationErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            path: Vec::new(),
        }
    }

    pub fn type_mismatch(expected: &str, actual: &str) -> Self {
        Self::new(
            ValidationErrorKind::Type,
            format!("Type of {actual} should be {expected}"),
        )
    }

    pub(crate) fn at(mut self, path: &[PathSegment]) -> Self {
        self.path = path.to_vec();
        self
    }

    pub(crate) fn within_index(mut self, index: usize) -> Self {
        self.path.insert(0, PathSegment::Index(index));
        self
    }

    /// Renders only the breadcrumb, e.g. `$.content.media[0]`.
    pub fn path_string(&self) -> String {
        let mut path = "$".to_string();
        for segment in &self.path {
            path.push_str(&segment.to_string());
        }
        path
    }
}
