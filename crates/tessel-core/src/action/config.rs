// ── Declarative request configuration ──
//
// One `ActionBuilderConfig` per operation of an entity type. The variant
// decides whether the resulting builder targets a single entity or a
// paged collection.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::model::{HttpMethod, SchemaKey};

/// Values substituted into a [`UrlTemplate`].
#[derive(Debug, Default)]
pub struct TemplateVars<'a> {
    pub id: Option<&'a str>,
    pub endpoint: Option<&'a str>,
    pub params: Option<&'a crate::model::QueryParams>,
}

impl TemplateVars<'_> {
    fn lookup(&self, name: &str) -> Option<&str> {
        match name {
            "id" => self.id,
            "endpoint" => self.endpoint,
            other => self
                .params
                .and_then(|p| p.get(other))
                .map(String::as_str),
        }
    }
}

/// A URL path with `{name}` placeholders.
///
/// `{id}` and `{endpoint}` are always available (when the call supplies
/// them); any other name is looked up in the request parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UrlTemplate(String);

impl UrlTemplate {
    pub fn new(template: impl Into<String>) -> Self {
        Self(template.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Names of every placeholder, in order of appearance.
    pub fn placeholders(&self) -> Vec<&str> {
        let mut names = Vec::new();
        let mut rest = self.0.as_str();
        while let Some(start) = rest.find('{') {
            let after = &rest[start + 1..];
            let Some(end) = after.find('}') else { break };
            names.push(&after[..end]);
            rest = &after[end + 1..];
        }
        names
    }

    pub fn render(&self, vars: &TemplateVars<'_>) -> Result<String, CoreError> {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}').ok_or_else(|| self.error("unclosed `{`"))?;
            let name = &after[..end];
            if name.is_empty() {
                return Err(self.error("empty placeholder"));
            }
            let value = vars
                .lookup(name)
                .ok_or_else(|| self.error(&format!("no value for `{{{name}}}`")))?;
            out.push_str(value);
            rest = &after[end + 1..];
        }
        if rest.contains('}') {
            return Err(self.error("unmatched `}`"));
        }
        out.push_str(rest);
        Ok(out)
    }

    fn error(&self, reason: &str) -> CoreError {
        CoreError::UrlTemplate {
            template: self.0.clone(),
            reason: reason.to_owned(),
        }
    }
}

impl fmt::Display for UrlTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for UrlTemplate {
    fn from(s: &str) -> Self {
        Self(s.to_owned())
    }
}

/// Single-entity request: one id, CRUD semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityRequestConfig {
    pub schema_key: SchemaKey,
    pub url: UrlTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<HttpMethod>,
    /// The target is served by an external API rather than through an
    /// endpoint, so the transport sends it without endpoint routing.
    #[serde(default)]
    pub external: bool,
}

/// Paged collection request: query semantics.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaginationRequestConfig {
    pub schema_key: SchemaKey,
    pub url: UrlTemplate,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub http_method: Option<HttpMethod>,
    /// Fixed base for the derived pagination key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pagination_key: Option<String>,
    #[serde(default)]
    pub external: bool,
    /// Default flatten mode for monitors built from this operation.
    #[serde(default)]
    pub flatten_pagination: bool,
}

/// Request template for one operation, tagged by target kind.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ActionBuilderConfig {
    Entity(EntityRequestConfig),
    Pagination(PaginationRequestConfig),
}

impl ActionBuilderConfig {
    pub fn entity(schema_key: impl Into<SchemaKey>, url: impl Into<UrlTemplate>) -> Self {
        Self::Entity(EntityRequestConfig {
            schema_key: schema_key.into(),
            url: url.into(),
            http_method: None,
            external: false,
        })
    }

    pub fn pagination(schema_key: impl Into<SchemaKey>, url: impl Into<UrlTemplate>) -> Self {
        Self::Pagination(PaginationRequestConfig {
            schema_key: schema_key.into(),
            url: url.into(),
            http_method: None,
            pagination_key: None,
            external: false,
            flatten_pagination: false,
        })
    }

    /// Set an explicit HTTP method.
    pub fn with_method(mut self, method: HttpMethod) -> Self {
        match &mut self {
            Self::Entity(c) => c.http_method = Some(method),
            Self::Pagination(c) => c.http_method = Some(method),
        }
        self
    }

    /// Fix the pagination key base. No effect on entity configs.
    pub fn with_pagination_key(mut self, key: impl Into<String>) -> Self {
        if let Self::Pagination(c) = &mut self {
            c.pagination_key = Some(key.into());
        }
        self
    }

    pub fn with_flatten(mut self, flatten: bool) -> Self {
        if let Self::Pagination(c) = &mut self {
            c.flatten_pagination = flatten;
        }
        self
    }

    /// Mark the URL as absolute, outside the endpoint's base.
    pub fn with_external(mut self, external: bool) -> Self {
        match &mut self {
            Self::Entity(c) => c.external = external,
            Self::Pagination(c) => c.external = external,
        }
        self
    }

    pub fn schema_key(&self) -> &SchemaKey {
        match self {
            Self::Entity(c) => &c.schema_key,
            Self::Pagination(c) => &c.schema_key,
        }
    }

    pub fn url(&self) -> &UrlTemplate {
        match self {
            Self::Entity(c) => &c.url,
            Self::Pagination(c) => &c.url,
        }
    }

    pub fn http_method(&self) -> Option<HttpMethod> {
        match self {
            Self::Entity(c) => c.http_method,
            Self::Pagination(c) => c.http_method,
        }
    }

    pub fn external(&self) -> bool {
        match self {
            Self::Entity(c) => c.external,
            Self::Pagination(c) => c.external,
        }
    }

    pub fn is_pagination(&self) -> bool {
        matches!(self, Self::Pagination(_))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::QueryParams;

    #[test]
    fn render_substitutes_id_endpoint_and_params() {
        let mut params = QueryParams::new();
        params.insert("space".into(), "dev".into());
        let template = UrlTemplate::from("endpoints/{endpoint}/spaces/{space}/apps/{id}");
        let url = template
            .render(&TemplateVars {
                id: Some("app-1"),
                endpoint: Some("cf"),
                params: Some(&params),
            })
            .unwrap();
        assert_eq!(url, "endpoints/cf/spaces/dev/apps/app-1");
        assert_eq!(template.placeholders(), ["endpoint", "space", "id"]);
    }

    #[test]
    fn render_without_placeholders_is_identity() {
        let url = UrlTemplate::from("apps").render(&TemplateVars::default()).unwrap();
        assert_eq!(url, "apps");
    }

    #[test]
    fn render_reports_missing_values() {
        let err = UrlTemplate::from("apps/{id}")
            .render(&TemplateVars::default())
            .unwrap_err();
        assert!(err.to_string().contains("no value for `{id}`"), "{err}");
    }

    #[test]
    fn render_rejects_malformed_templates() {
        let vars = TemplateVars::default();
        assert!(UrlTemplate::from("apps/{id").render(&vars).is_err());
        assert!(UrlTemplate::from("apps/id}").render(&vars).is_err());
        assert!(UrlTemplate::from("apps/{}").render(&vars).is_err());
    }

    #[test]
    fn config_deserializes_from_tagged_toml_shape() {
        let json = serde_json::json!({
            "kind": "pagination",
            "schema_key": "route",
            "url": "routes",
            "http_method": "GET",
            "pagination_key": "all-routes"
        });
        let config: ActionBuilderConfig = serde_json::from_value(json).unwrap();
        assert!(config.is_pagination());
        assert_eq!(config.http_method(), Some(HttpMethod::Get));
    }
}
