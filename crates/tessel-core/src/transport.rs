// ── HTTP transport ──
//
// Adapts `tessel_api::ApiClient` to the orchestrator's `Transport` seam.
// Paged requests carry their page number and parameters as query
// parameters; relation expansions travel as `include=a,b`. Requests for
// an endpoint name it in a header so the API can route them; external
// requests go out without it.

use futures_util::future::BoxFuture;
use tessel_api::{ApiClient, ApiRequest};
use tracing::trace;

use crate::action::RequestAction;
use crate::error::CoreError;
use crate::orchestrator::Transport;
use crate::model::RelationKey;
use crate::store::ResponseBody;

const PAGE_PARAM: &str = "page";
const INCLUDE_PARAM: &str = "include";
pub const ENDPOINT_HEADER: &str = "x-tessel-endpoint";

pub struct HttpTransport {
    client: ApiClient,
}

impl HttpTransport {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    pub fn client(&self) -> &ApiClient {
        &self.client
    }
}

/// Translate an action into the HTTP exchange that serves it.
pub fn api_request(action: &RequestAction) -> ApiRequest {
    let mut request = ApiRequest::new(action.http_method.into(), action.url.clone());
    for (key, value) in &action.params {
        request = request.query(key.clone(), value.clone());
    }
    if let Some(page) = action.page() {
        request = request.query(PAGE_PARAM, page.to_string());
    }
    if !action.relations.is_empty() {
        let include: Vec<&str> = action.relations.iter().map(RelationKey::as_str).collect();
        request = request.query(INCLUDE_PARAM, include.join(","));
    }
    if !action.external && !action.endpoint_id.as_str().is_empty() {
        request = request.header(ENDPOINT_HEADER, action.endpoint_id.as_str());
    }
    if let Some(body) = &action.body {
        request = request.body(body.clone());
    }
    request
}

impl Transport for HttpTransport {
    fn execute<'a>(&'a self, action: &'a RequestAction) -> BoxFuture<'a, Result<ResponseBody, CoreError>> {
        Box::pin(async move {
            let request = api_request(action);
            trace!(method = %request.method, path = %request.path, "executing request");
            if action.is_pagination() {
                let page = self.client.fetch_page(request).await?;
                Ok(ResponseBody::Page {
                    entities: page.resources,
                    total_results: page.total_results,
                    total_pages: page.total_pages,
                })
            } else {
                Ok(match self.client.send(request).await? {
                    Some(body) => ResponseBody::Entity(body),
                    None => ResponseBody::Empty,
                })
            }
        })
    }
}
