//! `tessel get` handler.

use std::sync::Arc;

use futures_util::StreamExt;
use serde_json::Value;
use tessel_core::{EntityMonitor, EntityMonitorOptions};

use crate::cli::{GetArgs, GlobalOpts};
use crate::error::CliError;
use crate::output;
use crate::session::Session;

pub async fn handle(args: GetArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let entry = session.entry(&args.entity)?;
    let options = EntityMonitorOptions {
        start_fetch: true,
        endpoint_id: Some(args.endpoint.as_str().into()),
        relations: args.include.iter().map(|r| r.as_str().into()).collect(),
        ..EntityMonitorOptions::default()
    };
    let monitor = entry.get_entity_monitor(args.id.as_str(), options)?;
    let entity = settle(&monitor).await?.ok_or_else(|| CliError::NotFound {
        entity: args.entity.clone(),
        id: args.id.clone(),
    })?;

    let id = args.id;
    let rendered = output::render_single(&global.output, entity.as_ref(), |_| id.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

/// Wait until the entity's fetch settles. Fails with the recorded
/// message if it errored.
async fn settle(monitor: &EntityMonitor) -> Result<Option<Arc<Value>>, CliError> {
    let mut requests = monitor.entity_request();
    while let Some(info) = requests.next().await {
        if info.fetching {
            continue;
        }
        if info.error {
            return Err(CliError::Request {
                message: info.message,
            });
        }
        return Ok(monitor.current_entity());
    }
    Ok(monitor.current_entity())
}
