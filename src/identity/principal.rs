use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attrs {
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub device_id: Option<String>,
}

/// Authenticated caller, established upstream (token verification lives in
/// the request layer). The resolver only ever reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Principal {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub attrs: Attrs,
}

impl Principal {
    pub fn new(id: i64) -> Self {
        Self { id, name: None, attrs: Attrs::default() }
    }
}
