//! Resource and data source handlers: offline schema/validate plus the
//! CRUD round trips against a configured server.

use std::io::Read;
use std::path::Path;

use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::Value;
use tabled::Tabled;
use tracing::info;

use octodeploy_api::OctopusClient;
use octodeploy_core::{ApplyResult, CoreError, OctopusProvider, Schema};

use crate::cli::{ConfigFileArgs, GlobalOpts, ImportArgs, SchemaArgs, StateFileArgs, UpdateArgs};
use crate::error::CliError;
use crate::output;

#[derive(Serialize, Tabled)]
struct TypeRow {
    #[tabled(rename = "Kind")]
    kind: &'static str,
    #[tabled(rename = "Type")]
    name: &'static str,
}

// ── Helpers ──────────────────────────────────────────────────────────

/// Read a JSON document from a file, or stdin for `-`.
fn read_document(path: &Path) -> Result<Value, CliError> {
    let read_err = |source: std::io::Error| CliError::ReadFile {
        path: path.display().to_string(),
        source,
    };
    let contents = if path.as_os_str() == "-" {
        let mut buf = String::new();
        std::io::stdin().read_to_string(&mut buf).map_err(read_err)?;
        buf
    } else {
        std::fs::read_to_string(path).map_err(read_err)?
    };
    Ok(serde_json::from_str(&contents)?)
}

fn connect(global: &GlobalOpts) -> Result<OctopusClient, CliError> {
    let config = crate::provider_config(global)?;
    Ok(OctopusProvider::configure(&config)?)
}

fn state_id(state: &Value) -> String {
    state
        .get("id")
        .and_then(Value::as_str)
        .unwrap_or("(no id)")
        .to_owned()
}

fn lookup_schema(provider: &OctopusProvider, name: &str) -> Result<Schema, CoreError> {
    match provider.resource(name) {
        Ok(resource) => Ok(resource.schema()),
        Err(_) => provider.data_source(name).map(|d| d.schema()),
    }
}

fn print_applied(result: &ApplyResult, global: &GlobalOpts) -> Result<(), CliError> {
    output::print_diagnostics(&result.diagnostics);
    output::print_output(&output::render(global.output, &result.state)?);
    Ok(())
}

// ── Offline ──────────────────────────────────────────────────────────

pub fn list(provider: &OctopusProvider, global: &GlobalOpts) -> Result<(), CliError> {
    let rows: Vec<TypeRow> = provider
        .resource_names()
        .map(|name| TypeRow {
            kind: "resource",
            name,
        })
        .chain(provider.data_source_names().map(|name| TypeRow {
            kind: "data",
            name,
        }))
        .collect();
    output::print_output(&output::render_list(global.output, &rows)?);
    Ok(())
}

pub fn schema(
    provider: &OctopusProvider,
    args: &SchemaArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let rendered = match args.name.as_deref() {
        Some(name) => output::render(global.output, &lookup_schema(provider, name)?)?,
        None => output::render(global.output, &provider.schema())?,
    };
    output::print_output(&rendered);
    Ok(())
}

pub fn validate(
    provider: &OctopusProvider,
    args: &ConfigFileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let config = read_document(&args.file)?;
    let diags = match provider.resource(&args.name) {
        Ok(resource) => resource.validate(&config),
        Err(_) => provider.data_source(&args.name)?.validate(&config),
    };
    if diags.has_errors() {
        return Err(CliError::Invalid(diags));
    }
    output::print_diagnostics(&diags);
    if global.output == crate::cli::OutputFormat::Table {
        eprintln!("{} {} configuration is valid", "✓".green(), args.name);
    } else {
        output::print_output(&output::render(
            global.output,
            &serde_json::json!({ "valid": true, "warnings": diags.warnings().count() }),
        )?);
    }
    Ok(())
}

// ── CRUD ─────────────────────────────────────────────────────────────

pub async fn create(
    provider: &OctopusProvider,
    args: &ConfigFileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = provider.resource(&args.name)?;
    let config = read_document(&args.file)?;
    let client = connect(global)?;

    let result = resource.create(&client, config).await?;
    info!(resource = %args.name, id = %state_id(&result.state), "created");
    print_applied(&result, global)
}

pub async fn read(
    provider: &OctopusProvider,
    args: &StateFileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = provider.resource(&args.name)?;
    let state = read_document(&args.state)?;
    let id = state_id(&state);
    let client = connect(global)?;

    match resource.read(&client, state).await? {
        Some(refreshed) => {
            output::print_output(&output::render(global.output, &refreshed)?);
            Ok(())
        }
        None => Err(CliError::NotFound {
            entity_type: args.name.clone(),
            identifier: id,
        }),
    }
}

pub async fn update(
    provider: &OctopusProvider,
    args: &UpdateArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = provider.resource(&args.name)?;
    let state = read_document(&args.state)?;
    let config = read_document(&args.file)?;
    let client = connect(global)?;

    let result = resource.update(&client, state, config).await?;
    info!(resource = %args.name, id = %state_id(&result.state), "updated");
    print_applied(&result, global)
}

pub async fn delete(
    provider: &OctopusProvider,
    args: &StateFileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = provider.resource(&args.name)?;
    let state = read_document(&args.state)?;
    let id = state_id(&state);
    let client = connect(global)?;

    resource.delete(&client, state).await?;
    eprintln!("{} deleted {} {id}", "✓".green(), args.name);
    Ok(())
}

pub async fn import(
    provider: &OctopusProvider,
    args: &ImportArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let resource = provider.resource(&args.name)?;
    let client = connect(global)?;

    let state = resource.import(&client, &args.id).await?;
    info!(resource = %args.name, id = %state_id(&state), "imported");
    output::print_output(&output::render(global.output, &state)?);
    Ok(())
}

pub async fn data(
    provider: &OctopusProvider,
    args: &ConfigFileArgs,
    global: &GlobalOpts,
) -> Result<(), CliError> {
    let source = provider.data_source(&args.name)?;
    let config = read_document(&args.file)?;
    let client = connect(global)?;

    let result = source.read(&client, config).await?;
    output::print_output(&output::render(global.output, &result)?);
    Ok(())
}
