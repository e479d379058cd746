//! Error types for RamFS Core

/// Core filesystem error type
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum FsError {
    #[error("not found")]
    NotFound,
    #[error("already exists")]
    AlreadyExists,
    #[error("not a directory")]
    NotADirectory,
    #[error("is a directory")]
    IsADirectory,
    #[error("invalid argument")]
    InvalidArgument,
    #[error("no space left")]
    NoSpace,
    #[error("invalid path: {0}")]
    InvalidPath(String),
}

impl FsError {
    /// POSIX errno the kernel bridge reports for this error
    pub fn errno(&self) -> i32 {
        match self {
            FsError::NotFound => 2,         // ENOENT
            FsError::AlreadyExists => 17,   // EEXIST
            FsError::NotADirectory => 20,   // ENOTDIR
            FsError::IsADirectory => 21,    // EISDIR
            FsError::InvalidArgument => 22, // EINVAL
            FsError::InvalidPath(_) => 22,  // EINVAL
            FsError::NoSpace => 28,         // ENOSPC
        }
    }
}

pub type FsResult<T> = Result<T, FsError>;
