// ── Action builder mapper ──
//
// Declarative request configs in, dispatchable request actions and
// per-operation dispatchers out.

mod builder;
mod config;
mod dispatcher;
mod instances;
mod request;

pub use builder::{ActionBuilder, ActionKind, build_action_builders, resolve_http_method};
pub use config::{
    ActionBuilderConfig, EntityRequestConfig, PaginationRequestConfig, TemplateVars, UrlTemplate,
};
pub use dispatcher::{ActionDispatcher, build_action_dispatcher};
pub use instances::{EntityInstance, build_entity_instances};
pub use request::{ActionArgs, RequestAction, RequestMeta, RequestTarget};
