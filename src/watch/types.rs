//! Identifier and binding types shared by the watch components.

use serde::{Deserialize, Serialize};
use std::fmt;
use url::Url;

/// Stable identifier of a watch owner.
///
/// Opaque to the engine. The Discord front-end stores user snowflakes in
/// their decimal form. Serialized as a bare string so the persisted state is
/// a flat `{ "id": "url" }` object.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubscriberId(String);

impl SubscriberId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubscriberId {
    fn from(id: &str) -> Self {
        Self(id.to_owned())
    }
}

impl From<String> for SubscriberId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<u64> for SubscriberId {
    fn from(id: u64) -> Self {
        Self(id.to_string())
    }
}

/// One subscriber bound to one watched page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Watch {
    pub subscriber: SubscriberId,
    pub url: Url,
}
