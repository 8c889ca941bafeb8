use std::fmt;

pub type Result<T> = std::result::Result<T, PlayerError>;

#[derive(Debug)]
pub enum PlayerError {
    Io { message: String },
    Snapshot(spc_snapshot::SnapshotError),
    AudioBackend { message: String },
}

impl fmt::Display for PlayerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlayerError::Io { message } => write!(f, "I/O error: {message}"),
            PlayerError::Snapshot(e) => write!(f, "snapshot error: {e}"),
            PlayerError::AudioBackend { message } => write!(f, "audio backend error: {message}"),
        }
    }
}

impl std::error::Error for PlayerError {}

impl From<std::io::Error> for PlayerError {
    fn from(err: std::io::Error) -> Self {
        PlayerError::Io { message: err.to_string() }
    }
}

impl From<spc_snapshot::SnapshotError> for PlayerError {
    fn from(err: spc_snapshot::SnapshotError) -> Self {
        PlayerError::Snapshot(err)
    }
}
