// ── Operation vocabulary ──

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use strum::{Display, EnumString};

/// HTTP verb carried by a request action.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum HttpMethod {
    Get,
    Post,
    Put,
    Patch,
    Delete,
}

impl From<HttpMethod> for tessel_api::Method {
    fn from(method: HttpMethod) -> Self {
        match method {
            HttpMethod::Get => Self::GET,
            HttpMethod::Post => Self::POST,
            HttpMethod::Put => Self::PUT,
            HttpMethod::Patch => Self::PATCH,
            HttpMethod::Delete => Self::DELETE,
        }
    }
}

/// Key of one declared operation on an entity type.
///
/// The five well-known keys have default HTTP methods; anything else is
/// a custom domain operation (e.g. `"detach"`, `"scaleHistory"`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperationKey {
    Get,
    GetMultiple,
    Create,
    Update,
    Remove,
    Custom(String),
}

impl OperationKey {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Get => "get",
            Self::GetMultiple => "getMultiple",
            Self::Create => "create",
            Self::Update => "update",
            Self::Remove => "remove",
            Self::Custom(key) => key,
        }
    }

    /// Default HTTP method for the well-known keys.
    pub fn default_http_method(&self) -> Option<HttpMethod> {
        match self {
            Self::Get | Self::GetMultiple => Some(HttpMethod::Get),
            Self::Create => Some(HttpMethod::Post),
            Self::Remove => Some(HttpMethod::Delete),
            Self::Update => Some(HttpMethod::Put),
            Self::Custom(_) => None,
        }
    }

    /// Whether this operation reads data (drives `fetching`) rather than
    /// mutating it (drives `updating[key]`).
    pub fn is_fetch(&self) -> bool {
        matches!(self, Self::Get | Self::GetMultiple)
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl From<&str> for OperationKey {
    fn from(s: &str) -> Self {
        match s {
            "get" => Self::Get,
            "getMultiple" => Self::GetMultiple,
            "create" => Self::Create,
            "update" => Self::Update,
            "remove" => Self::Remove,
            other => Self::Custom(other.to_owned()),
        }
    }
}

impl From<String> for OperationKey {
    fn from(s: String) -> Self {
        Self::from(s.as_str())
    }
}

impl FromStr for OperationKey {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::from(s))
    }
}

impl Serialize for OperationKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for OperationKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::from(raw))
    }
}
