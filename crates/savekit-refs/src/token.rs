use std::fmt;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compact stand-in for an external object inside a serialized payload.
///
/// A token is produced by the resolver that claimed the object during
/// encoding and handed back to the same chain during decoding.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ReferenceToken {
    /// Host-defined string identifier (asset path, resource key).
    Name(String),
    /// Globally unique identifier.
    Guid(Uuid),
    /// Position in a resolver-owned object table.
    Index(u32),
}

impl ReferenceToken {
    /// Short name of the token kind.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Name(_) => "name",
            Self::Guid(_) => "guid",
            Self::Index(_) => "index",
        }
    }
}

impl fmt::Display for ReferenceToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(id) => write!(f, "name:{id}"),
            Self::Guid(guid) => write!(f, "guid:{guid}"),
            Self::Index(index) => write!(f, "index:{index}"),
        }
    }
}
