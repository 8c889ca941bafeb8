//! Decode errors for the `.spc` snapshot format.

use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SnapshotError {
    /// The file is shorter than the minimum fixed layout requires.
    ShortRead { expected_at_least: usize, got: usize },
    /// The 33-byte ASCII header did not match the required magic string.
    BadMagic,
}

impl fmt::Display for SnapshotError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SnapshotError::ShortRead { expected_at_least, got } => write!(
                f,
                "snapshot truncated: expected at least {expected_at_least} bytes, got {got}"
            ),
            SnapshotError::BadMagic => {
                write!(f, "snapshot header does not match 'SNES-SPC700 Sound File Data v0.30'")
            }
        }
    }
}

impl std::error::Error for SnapshotError {}

pub type Result<T> = std::result::Result<T, SnapshotError>;
