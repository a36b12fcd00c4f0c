use crate::value::ValueKind;

/// Errors from schema registration and record application.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum SchemaError {
    /// No schema was registered for the type.
    #[error("type {0} is not registered")]
    UnregisteredType(String),

    /// A schema was registered with an empty storage key.
    #[error("empty storage key for type {0}")]
    EmptyStorageKey(String),

    /// Two types were registered under the same storage key.
    #[error("storage key {key:?} is used by both {first} and {second}")]
    DuplicateStorageKey {
        key: String,
        first: String,
        second: String,
    },

    /// The same type was registered twice.
    #[error("type {0} is registered more than once")]
    DuplicateType(String),

    /// A stored value could not be converted to the member's declared type.
    #[error("member {member} (key {key:?}): {source}")]
    TypeConversion {
        member: String,
        key: String,
        #[source]
        source: ConversionError,
    },
}

impl SchemaError {
    /// Returns `true` for errors caused by how types were registered.
    pub fn is_configuration(&self) -> bool {
        !matches!(self, Self::TypeConversion { .. })
    }
}

/// Result alias for schema operations.
pub type SchemaResult<T> = Result<T, SchemaError>;

/// Why a [`Value`](crate::Value) could not become a typed member.
#[derive(Clone, Debug, PartialEq, thiserror::Error)]
pub enum ConversionError {
    #[error("cannot convert {from} to {to}")]
    Incompatible { from: ValueKind, to: ValueKind },

    #[error("{value} is out of range for {target}")]
    OutOfRange { value: String, target: &'static str },

    #[error("cannot parse {input:?} as {target}")]
    Parse { input: String, target: &'static str },

    /// Structured conversion through serde failed.
    #[error("{0}")]
    Custom(String),
}

impl ConversionError {
    pub(crate) fn incompatible(from: ValueKind, to: ValueKind) -> Self {
        Self::Incompatible { from, to }
    }

    pub(crate) fn out_of_range(value: impl ToString, target: &'static str) -> Self {
        Self::OutOfRange {
            value: value.to_string(),
            target,
        }
    }
}
