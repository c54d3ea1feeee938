use std::fmt::{Display, Formatter};

use rawmix_lib::error::MixError;

/// Error type for plan loading, mixing, and output IO.
#[derive(Debug)]
pub enum CliError {
    Io(std::io::Error),
    Plan(String),
    Mix(MixError),
    Wav(hound::Error),
}

impl Display for CliError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Io(err) => write!(f, "io error: {}", err),
            Self::Plan(err) => write!(f, "invalid mix plan: {}", err),
            Self::Mix(err) => write!(f, "{}", err),
            Self::Wav(err) => write!(f, "wav error: {}", err),
        }
    }
}

impl std::error::Error for CliError {}

impl From<std::io::Error> for CliError {
    fn from(value: std::io::Error) -> Self {
        Self::Io(value)
    }
}

impl From<MixError> for CliError {
    fn from(value: MixError) -> Self {
        Self::Mix(value)
    }
}

impl From<hound::Error> for CliError {
    fn from(value: hound::Error) -> Self {
        Self::Wav(value)
    }
}

impl From<serde_json::Error> for CliError {
    fn from(value: serde_json::Error) -> Self {
        Self::Plan(value.to_string())
    }
}
