// ── Response envelopes ──
//
// Collection endpoints answer with `{ total_results, total_pages, resources }`.
// Error responses carry a `description` (or `message`) and an optional code.

use serde::Deserialize;
use serde_json::Value;

use crate::error::Error;

/// One page of a collection response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct PageEnvelope {
    #[serde(default)]
    pub total_results: Option<u64>,
    #[serde(default)]
    pub total_pages: Option<u32>,
    #[serde(default)]
    pub resources: Vec<Value>,
}

impl PageEnvelope {
    /// Decode a collection body.
    ///
    /// A bare JSON array is accepted as a single, complete page.
    pub fn from_value(body: Value) -> Result<Self, Error> {
        match body {
            Value::Array(resources) => Ok(Self {
                total_results: u64::try_from(resources.len()).ok(),
                total_pages: Some(1),
                resources,
            }),
            Value::Object(_) => {
                serde_json::from_value(body.clone()).map_err(|e| Error::Deserialization {
                    message: e.to_string(),
                    body: body.to_string(),
                })
            }
            other => Err(Error::Deserialization {
                message: "expected an object or array for a collection response".into(),
                body: other.to_string(),
            }),
        }
    }
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    description: Option<String>,
    message: Option<String>,
    error: Option<String>,
    error_code: Option<String>,
    code: Option<Value>,
}

/// Extract a human-readable message and error code from a failure body.
///
/// Falls back to the raw body (or the status reason) when the payload is
/// not a recognised error envelope.
pub(crate) fn error_details(body: &str, fallback: &str) -> (String, Option<String>) {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        let trimmed = body.trim();
        let message = if trimmed.is_empty() {
            fallback.to_owned()
        } else {
            trimmed.to_owned()
        };
        return (message, None);
    };

    let message = envelope
        .description
        .or(envelope.message)
        .or(envelope.error)
        .unwrap_or_else(|| fallback.to_owned());
    let code = envelope.error_code.or_else(|| match envelope.code {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        _ => None,
    });
    (message, code)
}
