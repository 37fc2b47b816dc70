//! Command handlers.

pub mod config_cmd;
pub mod resource;

use octodeploy_core::OctopusProvider;

use crate::cli::{Command, GlobalOpts};
use crate::error::CliError;

/// Route a resource-level command to its handler.
pub async fn dispatch(cmd: Command, global: &GlobalOpts) -> Result<(), CliError> {
    let provider = OctopusProvider::new();
    match cmd {
        Command::Resources => resource::list(&provider, global),
        Command::Schema(args) => resource::schema(&provider, &args, global),
        Command::Validate(args) => resource::validate(&provider, &args, global),
        Command::Create(args) => resource::create(&provider, &args, global).await,
        Command::Read(args) => resource::read(&provider, &args, global).await,
        Command::Update(args) => resource::update(&provider, &args, global).await,
        Command::Delete(args) => resource::delete(&provider, &args, global).await,
        Command::Import(args) => resource::import(&provider, &args, global).await,
        Command::Data(args) => resource::data(&provider, &args, global).await,
        Command::Config(_) | Command::Completions(_) => unreachable!("handled in main"),
    }
}
