//! MCP tool definitions and handlers for querying the rollup catalog

use rmcp::model::{CallToolResult, Content, JsonObject, Tool};
use rmcp::ErrorData as McpError;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;

use crate::catalog::{Catalog, Lookup};

pub const GET_ROLLUP_SPECS: &str = "getRollupSpecs";
pub const LIST_ROLLUPS: &str = "listRollups";
pub const LIST_EXECUTION_ENVIRONMENTS: &str = "listExecutionEnvironments";

/// Parameters of `getRollupSpecs`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GetRollupSpecsParams {
    pub rollup_name: String,
    #[serde(default)]
    pub exec_env: Option<String>,
}

/// Parameters of `listExecutionEnvironments`
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ListExecutionEnvironmentsParams {
    pub rollup_name: String,
}

fn schema(value: Value) -> Arc<JsonObject> {
    match value {
        Value::Object(map) => Arc::new(map),
        _ => Arc::new(JsonObject::new()),
    }
}

/// Get the catalog query tools.
///
/// Rollup and environment parameters are advertised as enums of what the catalog holds.
pub fn get_catalog_tools(catalog: &Catalog) -> Vec<Tool> {
    let rollups = catalog.rollup_names();
    let environments = catalog.environment_ids();

    vec![
        Tool::new(
            GET_ROLLUP_SPECS.to_string(),
            format!(
                "Returns structured JSON data for a given rollup, including metadata, opcodes, precompiles, system contracts, messaging costs and RPC differences. Supported rollups: {}. Rollups with several execution environments require execEnv.",
                rollups.join(", ")
            ),
            schema(json!({
                "type": "object",
                "properties": {
                    "rollupName": {
                        "type": "string",
                        "description": "Name of the rollup to fetch specs for",
                        "enum": rollups
                    },
                    "execEnv": {
                        "type": "string",
                        "description": "Execution environment; required only when the rollup supports more than one",
                        "enum": environments
                    }
                },
                "required": ["rollupName"]
            })),
        ),
        Tool::new(
            LIST_ROLLUPS.to_string(),
            "Returns a list of all supported rollups with high-level metadata (for autocomplete, dropdowns, etc.)".to_string(),
            schema(json!({
                "type": "object",
                "properties": {}
            })),
        ),
        Tool::new(
            LIST_EXECUTION_ENVIRONMENTS.to_string(),
            "Returns the execution environments a rollup supports, each with a short description.".to_string(),
            schema(json!({
                "type": "object",
                "properties": {
                    "rollupName": {
                        "type": "string",
                        "description": "Name of the rollup",
                        "enum": rollups
                    }
                },
                "required": ["rollupName"]
            })),
        ),
    ]
}

fn parse_params<T: DeserializeOwned>(arguments: &Option<JsonObject>) -> Result<T, McpError> {
    let args = arguments
        .as_ref()
        .ok_or_else(|| McpError::invalid_params("Missing arguments", None))?;

    serde_json::from_value(Value::Object(args.clone()))
        .map_err(|e| McpError::invalid_params(format!("Invalid parameters: {}", e), None))
}

fn json_result<T: Serialize>(value: &T) -> Result<CallToolResult, McpError> {
    let text = serde_json::to_string_pretty(value)
        .map_err(|e| McpError::internal_error(e.to_string(), None))?;
    Ok(CallToolResult::success(vec![Content::text(text)]))
}

/// Handle getRollupSpecs tool call
pub fn handle_get_rollup_specs(
    catalog: &Catalog,
    arguments: &Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: GetRollupSpecsParams = parse_params(arguments)?;

    match catalog.lookup(&params.rollup_name, params.exec_env.as_deref()) {
        Lookup::Found(record) => json_result(record),
        Lookup::NotFound => {
            let message = match params.exec_env {
                Some(env) => format!(
                    "No data found for rollup: {} (execEnv: {})",
                    params.rollup_name, env
                ),
                None => format!("No data found for rollup: {}", params.rollup_name),
            };
            Ok(CallToolResult::success(vec![Content::text(message)]))
        }
        Lookup::AmbiguousEnvironment(envs) => Ok(CallToolResult::error(vec![Content::text(
            format!(
                "Rollup '{}' supports multiple execution environments; specify execEnv as one of: {}",
                params.rollup_name,
                envs.join(", ")
            ),
        )])),
    }
}

/// Handle listRollups tool call
pub fn handle_list_rollups(catalog: &Catalog) -> Result<CallToolResult, McpError> {
    json_result(&catalog.list_rollups())
}

/// Handle listExecutionEnvironments tool call
pub fn handle_list_execution_environments(
    catalog: &Catalog,
    arguments: &Option<JsonObject>,
) -> Result<CallToolResult, McpError> {
    let params: ListExecutionEnvironmentsParams = parse_params(arguments)?;

    match catalog.list_execution_environments(&params.rollup_name) {
        Some(envs) => json_result(&envs),
        None => Ok(CallToolResult::success(vec![Content::text(format!(
            "No data found for rollup: {}",
            params.rollup_name
        ))])),
    }
}

/// Dispatch a tool call by name. Returns `None` for names this module doesn't own.
pub fn dispatch(
    catalog: &Catalog,
    name: &str,
    arguments: &Option<JsonObject>,
) -> Option<Result<CallToolResult, McpError>> {
    let result = match name {
        GET_ROLLUP_SPECS => handle_get_rollup_specs(catalog, arguments),
        LIST_ROLLUPS => handle_list_rollups(catalog),
        LIST_EXECUTION_ENVIRONMENTS => handle_list_execution_environments(catalog, arguments),
        _ => return None,
    };
    Some(result)
}
