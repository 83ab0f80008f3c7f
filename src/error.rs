//! Error types for source extraction and catalog construction

use std::path::PathBuf;
use thiserror::Error;

/// Failure to read one source file (a chain spec or a documentation page).
///
/// These never abort startup; the catalog builder falls back to empty data and records
/// a diagnostic instead.
#[derive(Debug, Error)]
pub enum SourceError {
    #[error("source file not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("failed to read {}: {source}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("malformed JSON in {}: {source}", path.display())]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

impl SourceError {
    /// Classify an I/O error on `path` as missing or unreadable.
    pub fn from_io(path: PathBuf, source: std::io::Error) -> Self {
        if source.kind() == std::io::ErrorKind::NotFound {
            SourceError::Missing { path }
        } else {
            SourceError::Unreadable { path, source }
        }
    }

    /// Short machine-readable label
    pub fn kind(&self) -> &'static str {
        match self {
            SourceError::Missing { .. } => "missing",
            SourceError::Unreadable { .. } => "unreadable",
            SourceError::Malformed { .. } => "malformed",
        }
    }
}

/// Fatal errors while building the catalog.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("no rollups found in {}", dir.display())]
    NoRollupsFound { dir: PathBuf },

    #[error("failed to list specifications directory {}: {source}", dir.display())]
    SpecsDirUnreadable {
        dir: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_io_not_found_is_missing() {
        let err = SourceError::from_io(
            PathBuf::from("/nope.json"),
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, SourceError::Missing { .. }));
        assert_eq!(err.kind(), "missing");
    }

    #[test]
    fn test_from_io_other_is_unreadable() {
        let err = SourceError::from_io(
            PathBuf::from("/locked.json"),
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert_eq!(err.kind(), "unreadable");
        assert!(err.to_string().contains("/locked.json"));
    }

    #[test]
    fn test_no_rollups_found_message() {
        let err = CatalogError::NoRollupsFound {
            dir: PathBuf::from("/specs"),
        };
        assert_eq!(err.to_string(), "no rollups found in /specs");
    }
}
