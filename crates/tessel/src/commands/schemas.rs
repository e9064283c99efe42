//! `tessel schemas` handler. Reads the config only; no requests.

use serde::Serialize;
use tabled::Tabled;

use crate::cli::GlobalOpts;
use crate::config;
use crate::error::CliError;
use crate::output;

#[derive(Serialize)]
struct SchemaView {
    key: String,
    id_pointer: String,
    relations: Vec<RelationView>,
}

#[derive(Serialize)]
struct RelationView {
    key: String,
    target: String,
    field: String,
}

#[derive(Tabled)]
struct SchemaRow {
    #[tabled(rename = "SCHEMA")]
    key: String,
    #[tabled(rename = "ID POINTER")]
    id_pointer: String,
    #[tabled(rename = "RELATIONS")]
    relations: String,
}

fn row(schema: &SchemaView) -> SchemaRow {
    SchemaRow {
        key: schema.key.clone(),
        id_pointer: schema.id_pointer.clone(),
        relations: schema
            .relations
            .iter()
            .map(|r| format!("{} ({})", r.key, r.field))
            .collect::<Vec<_>>()
            .join("\n"),
    }
}

pub fn handle(global: &GlobalOpts) -> Result<(), CliError> {
    let cfg = config::load(global)?;
    let registry = cfg.schema_registry()?;
    let schemas: Vec<SchemaView> = registry
        .iter()
        .map(|schema| SchemaView {
            key: schema.key.to_string(),
            id_pointer: schema.id_pointer.clone(),
            relations: schema
                .relations
                .iter()
                .map(|r| RelationView {
                    key: r.key.to_string(),
                    target: r.target.to_string(),
                    field: r.field.clone(),
                })
                .collect(),
        })
        .collect();

    let rendered = output::render_list(&global.output, &schemas, row, |s| s.key.clone())?;
    output::print_output(&rendered, global.quiet);
    Ok(())
}
