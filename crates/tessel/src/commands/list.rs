//! `tessel list` handler.

use futures_util::StreamExt;
use tabled::Tabled;
use tessel_core::{ActionArgs, EntityRecord, OperationKey, PaginationMonitor};
use tracing::info;

use crate::cli::{GlobalOpts, ListArgs};
use crate::error::CliError;
use crate::output;
use crate::session::Session;

#[derive(Tabled)]
struct RecordRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "NAME")]
    name: String,
    #[tabled(rename = "SUMMARY")]
    summary: String,
}

fn row(record: &EntityRecord) -> RecordRow {
    RecordRow {
        id: record.id.to_string(),
        name: output::display_name(&record.payload),
        summary: output::summary(&record.payload),
    }
}

pub async fn handle(args: ListArgs, session: &Session, global: &GlobalOpts) -> Result<(), CliError> {
    let entry = session.entry(&args.entity)?;
    let instance = entry.paged_instance(&OperationKey::from(args.op.as_str()))?;
    let monitor = instance.pagination_monitor(call_args(&args))?;

    monitor.fetch_page(args.page);
    settle(&monitor).await?;
    for _ in 1..args.pages {
        if !monitor.load_next_page() {
            break;
        }
        settle(&monitor).await?;
    }

    if let Some(state) = monitor.snapshot() {
        info!(
            key = %state.key,
            page = state.current_page,
            total_pages = ?state.total_pages,
            total_results = ?state.total_results,
            "listing settled"
        );
    }

    let records = monitor.current_page().next().await.unwrap_or_default();
    let rendered = output::render_list(&global.output, &records, row, |r| r.id.to_string())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}

fn call_args(args: &ListArgs) -> ActionArgs {
    let mut call = match &args.parent {
        Some(parent) => ActionArgs::entity(parent.as_str(), args.endpoint.as_str()),
        None => ActionArgs::collection(args.endpoint.as_str()),
    };
    for (key, value) in &args.param {
        call = call.param(key.as_str(), value.as_str());
    }
    for relation in &args.include {
        call = call.include(relation.as_str());
    }
    call.page(args.page).flatten(args.flatten)
}

/// Wait for the selected page's request to settle.
async fn settle(monitor: &PaginationMonitor) -> Result<(), CliError> {
    let mut requests = monitor.current_page_request_info();
    while let Some(info) = requests.next().await {
        if info.fetching {
            continue;
        }
        if info.error {
            return Err(CliError::Request {
                message: info.message,
            });
        }
        break;
    }
    Ok(())
}
