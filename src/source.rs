//! Source kinds, provenance, and endpoint classification.

use std::fmt;

/// Which loader produced a table.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    #[default]
    Upload,
    Warehouse,
    Api,
}

impl SourceKind {
    pub const ALL: [Self; 3] = [Self::Upload, Self::Warehouse, Self::Api];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "CSV",
            Self::Warehouse => "Warehouse",
            Self::Api => "API",
        }
    }

    /// Label of the source selector entry.
    pub fn label(self) -> &'static str {
        match self {
            Self::Upload => "CSV Upload",
            Self::Warehouse => "Warehouse",
            Self::Api => "API",
        }
    }
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Origin of a table: source kind plus the filename, query text or URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Provenance {
    pub kind: SourceKind,
    pub origin: String,
}

impl Provenance {
    pub fn upload(filename: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Upload,
            origin: filename.into(),
        }
    }

    pub fn warehouse(query: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Warehouse,
            origin: query.into(),
        }
    }

    pub fn api(url: impl Into<String>) -> Self {
        Self {
            kind: SourceKind::Api,
            origin: url.into(),
        }
    }

    /// Filename shown in the dataset info panel; only uploads have one.
    pub fn filename(&self) -> Option<&str> {
        match self.kind {
            SourceKind::Upload => Some(self.origin.as_str()),
            _ => None,
        }
    }
}

/// Endpoint scheme accepted by the API loader.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Endpoint {
    Http(String),
    Unsupported(String),
}

/// Classifies a user-supplied endpoint using string parsing only.
pub fn endpoint(url: &str) -> Endpoint {
    let s = url.trim();
    if let Some(after_scheme) = s.find("://") {
        let prefix = s[..after_scheme].to_lowercase();
        let rest = &s[after_scheme + 3..];
        if (prefix == "http" || prefix == "https") && !rest.is_empty() {
            return Endpoint::Http(s.to_string());
        }
    }
    Endpoint::Unsupported(s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoint_http_and_https() {
        assert_eq!(
            endpoint("https://api.example.com/data"),
            Endpoint::Http("https://api.example.com/data".to_string())
        );
        assert_eq!(
            endpoint(" HTTP://host/path "),
            Endpoint::Http("HTTP://host/path".to_string())
        );
    }

    #[test]
    fn endpoint_other_schemes_unsupported() {
        assert!(matches!(endpoint("ftp://host/file"), Endpoint::Unsupported(_)));
        assert!(matches!(endpoint("example.com/data"), Endpoint::Unsupported(_)));
        assert!(matches!(endpoint("https://"), Endpoint::Unsupported(_)));
    }

    #[test]
    fn only_uploads_have_filenames() {
        assert_eq!(Provenance::upload("a.csv").filename(), Some("a.csv"));
        assert_eq!(Provenance::api("https://x").filename(), None);
    }
}
