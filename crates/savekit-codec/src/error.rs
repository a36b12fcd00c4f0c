use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("{format} encode error: {message}")]
    Encode {
        format: &'static str,
        message: String,
    },

    #[error("{format} decode error: {message}")]
    Decode {
        format: &'static str,
        message: String,
    },

    #[error("unknown save format: {0}")]
    UnknownFormat(String),
}

impl CodecError {
    pub(crate) fn encode(format: &'static str, err: impl ToString) -> Self {
        Self::Encode {
            format,
            message: err.to_string(),
        }
    }

    pub(crate) fn decode(format: &'static str, err: impl ToString) -> Self {
        Self::Decode {
            format,
            message: err.to_string(),
        }
    }
}

pub type CodecResult<T> = Result<T, CodecError>;
