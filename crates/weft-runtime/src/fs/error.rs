//! Filesystem errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`FsError::NotFound`] | `FS_NOT_FOUND` | No |
//! | [`FsError::NotADirectory`] | `FS_NOT_A_DIRECTORY` | No |
//! | [`FsError::IsADirectory`] | `FS_IS_A_DIRECTORY` | No |
//! | [`FsError::Io`] | `FS_IO` | Yes |

use thiserror::Error;
use weft_types::ErrorCode;

/// Filesystem operation failure.
#[derive(Debug, Error)]
pub enum FsError {
    /// Path does not exist.
    #[error("no such file or directory: {0}")]
    NotFound(String),

    /// A path component is a file where a directory was expected.
    #[error("not a directory: {0}")]
    NotADirectory(String),

    /// A directory was found where a file was expected.
    #[error("is a directory: {0}")]
    IsADirectory(String),

    /// Host filesystem failure.
    #[error("i/o error at '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

impl FsError {
    /// Creates an I/O error, folding `NotFound` into [`FsError::NotFound`].
    pub fn io(path: impl Into<String>, source: std::io::Error) -> Self {
        let path = path.into();
        if source.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound(path)
        } else {
            Self::Io { path, source }
        }
    }
}

impl ErrorCode for FsError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "FS_NOT_FOUND",
            Self::NotADirectory(_) => "FS_NOT_A_DIRECTORY",
            Self::IsADirectory(_) => "FS_IS_A_DIRECTORY",
            Self::Io { .. } => "FS_IO",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Io { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use weft_types::assert_error_codes;

    fn all_variants() -> Vec<FsError> {
        vec![
            FsError::NotFound("/a".into()),
            FsError::NotADirectory("/a".into()),
            FsError::IsADirectory("/a".into()),
            FsError::Io {
                path: "/a".into(),
                source: std::io::Error::new(std::io::ErrorKind::Other, "boom"),
            },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "FS_");
    }

    #[test]
    fn io_not_found_is_folded() {
        let err = FsError::io(
            "/x",
            std::io::Error::new(std::io::ErrorKind::NotFound, "gone"),
        );
        assert!(matches!(err, FsError::NotFound(p) if p == "/x"));
    }
}
