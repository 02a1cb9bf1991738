//! # Command Scripts
//!
//! The batch surface: a [`CommandScript`] is an ordered list of management
//! commands executed sequentially against one server, yielding one response
//! per command. Execution never short-circuits; a failing command is
//! reported in place and the remaining commands still run. The management
//! gate applies per command, exactly as it does on the direct calls.

use crate::container::{ContainerFilter, ContainerResource};
use crate::error::Result;
use crate::message::ServiceResponse;
use crate::release::ReleaseId;
use crate::scanner::ScannerResource;
use crate::server::Server;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// One management command.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "command", rename_all = "kebab-case")]
pub enum ServerCommand {
    CreateContainer {
        container_id: String,
        container: ContainerResource,
    },
    DisposeContainer {
        container_id: String,
    },
    UpdateReleaseId {
        container_id: String,
        release_id: ReleaseId,
        #[serde(default)]
        reset_before_update: bool,
    },
    UpdateScanner {
        container_id: String,
        scanner: ScannerResource,
    },
    ActivateContainer {
        container_id: String,
    },
    DeactivateContainer {
        container_id: String,
    },
    ListContainers,
    GetContainerInfo {
        container_id: String,
    },
    GetServerInfo,
    GetServerState,
}

/// Ordered batch of commands.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandScript {
    pub commands: Vec<ServerCommand>,
}

impl CommandScript {
    #[must_use]
    pub fn new(commands: Vec<ServerCommand>) -> Self {
        Self { commands }
    }
}

/// Executes a script, producing one response per command in order.
pub async fn execute_script(
    server: &Server,
    script: CommandScript,
) -> Result<Vec<ServiceResponse<serde_json::Value>>> {
    let mut responses = Vec::with_capacity(script.commands.len());
    for command in script.commands {
        debug!(?command, "executing script command");
        responses.push(execute(server, command).await?);
    }
    Ok(responses)
}

/// Executes a single command, erasing the payload type to JSON.
pub async fn execute(
    server: &Server,
    command: ServerCommand,
) -> Result<ServiceResponse<serde_json::Value>> {
    let response = match command {
        ServerCommand::CreateContainer {
            container_id,
            container,
        } => erase(server.create_container(&container_id, container).await?)?,
        ServerCommand::DisposeContainer { container_id } => {
            erase(server.dispose_container(&container_id).await?)?
        }
        ServerCommand::UpdateReleaseId {
            container_id,
            release_id,
            reset_before_update,
        } => erase(
            server
                .update_release_id(&container_id, release_id, reset_before_update)
                .await?,
        )?,
        ServerCommand::UpdateScanner {
            container_id,
            scanner,
        } => erase(server.configure_scanner(&container_id, scanner).await?)?,
        ServerCommand::ActivateContainer { container_id } => {
            erase(server.activate_container(&container_id).await?)?
        }
        ServerCommand::DeactivateContainer { container_id } => {
            erase(server.deactivate_container(&container_id).await?)?
        }
        ServerCommand::ListContainers => {
            erase(server.list_containers(&ContainerFilter::any()).await?)?
        }
        ServerCommand::GetContainerInfo { container_id } => {
            erase(server.get_container_info(&container_id).await?)?
        }
        ServerCommand::GetServerInfo => {
            let info = server.get_server_info().await;
            erase(ServiceResponse::success("Server info", info))?
        }
        ServerCommand::GetServerState => erase(server.get_server_state().await?)?,
    };
    Ok(response)
}

fn erase<T: Serialize>(response: ServiceResponse<T>) -> Result<ServiceResponse<serde_json::Value>> {
    let result = match response.result {
        Some(payload) => Some(serde_json::to_value(payload)?),
        None => None,
    };
    Ok(ServiceResponse {
        response_type: response.response_type,
        msg: response.msg,
        result,
    })
}
