//! MCP server handler implementation

use anyhow::Result;
use rmcp::{
    model::*,
    service::{RequestContext, RoleServer},
    ErrorData as McpError, ServerHandler,
};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::tools;

const CATALOG_URI: &str = "rollups://catalog";
const DIAGNOSTICS_URI: &str = "rollups://diagnostics";

/// MCP server handler
#[derive(Clone)]
pub struct RollupCodesHandler {
    catalog: Arc<Catalog>,
    tools: Arc<Vec<Tool>>,
}

impl RollupCodesHandler {
    pub fn new(catalog: Catalog) -> Self {
        let tools = tools::get_catalog_tools(&catalog);
        Self {
            catalog: Arc::new(catalog),
            tools: Arc::new(tools),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn tool_list(&self) -> &[Tool] {
        &self.tools
    }

    fn json_resource<T: serde::Serialize>(
        uri: String,
        value: &T,
    ) -> Result<ReadResourceResult, McpError> {
        let json = serde_json::to_string_pretty(value)
            .map_err(|e| McpError::internal_error(e.to_string(), None))?;

        Ok(ReadResourceResult {
            contents: vec![ResourceContents::TextResourceContents {
                uri,
                mime_type: Some("application/json".to_string()),
                text: json,
                meta: None,
            }],
        })
    }

    /// Read a resource by URI
    pub fn read_resource_uri(&self, uri: String) -> Result<ReadResourceResult, McpError> {
        match uri.as_str() {
            CATALOG_URI => Self::json_resource(uri, &self.catalog.list_rollups()),
            DIAGNOSTICS_URI => Self::json_resource(uri, &self.catalog.diagnostics()),
            _ => Err(McpError::invalid_params(
                format!("Unknown resource URI: {}", uri),
                None,
            )),
        }
    }
}

impl ServerHandler for RollupCodesHandler {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            protocol_version: ProtocolVersion::default(),
            capabilities: ServerCapabilities {
                prompts: None,
                resources: Some(ResourcesCapability {
                    subscribe: None,
                    list_changed: None,
                }),
                tools: Some(ToolsCapability {
                    list_changed: None,
                }),
                logging: None,
                completions: None,
                experimental: None,
            },
            server_info: Implementation {
                name: "rollup-codes-mcp".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                title: Some("Rollup Codes MCP Server".to_string()),
                icons: None,
                website_url: Some("https://www.rollup.codes".to_string()),
            },
            instructions: Some("MCP server exposing rollup metadata from rollup.codes: chain IDs, opcodes, precompiles, system contracts, timing parameters, messaging costs and RPC differences, per rollup and execution environment".into()),
        }
    }

    async fn list_tools(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListToolsResult, McpError> {
        Ok(ListToolsResult {
            tools: self.tools.to_vec(),
            next_cursor: None,
        })
    }

    async fn list_resources(
        &self,
        _request: Option<PaginatedRequestParam>,
        _context: RequestContext<RoleServer>,
    ) -> Result<ListResourcesResult, McpError> {
        let mut catalog_resource = RawResource::new(CATALOG_URI, "Rollup Catalog");
        catalog_resource.description =
            Some("All rollups in the catalog with their titles and descriptions".to_string());
        catalog_resource.mime_type = Some("application/json".to_string());

        let mut diagnostics_resource = RawResource::new(DIAGNOSTICS_URI, "Source Diagnostics");
        diagnostics_resource.description = Some(
            "Specification files and documentation pages that could not be used while building the catalog"
                .to_string(),
        );
        diagnostics_resource.mime_type = Some("application/json".to_string());

        Ok(ListResourcesResult {
            resources: vec![
                catalog_resource.no_annotation(),
                diagnostics_resource.no_annotation(),
            ],
            next_cursor: None,
        })
    }

    async fn read_resource(
        &self,
        request: ReadResourceRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<ReadResourceResult, McpError> {
        self.read_resource_uri(request.uri)
    }

    async fn call_tool(
        &self,
        request: CallToolRequestParam,
        _context: RequestContext<RoleServer>,
    ) -> Result<CallToolResult, McpError> {
        tools::dispatch(&self.catalog, &request.name, &request.arguments).unwrap_or_else(|| {
            Err(McpError::invalid_params(
                format!("Unknown tool: {}", request.name),
                None,
            ))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::{docs_dir, snapshot_tree, specs_dir};
    use tempfile::TempDir;

    fn create_test_handler() -> (TempDir, RollupCodesHandler) {
        let root = snapshot_tree();
        let catalog = Catalog::build(&specs_dir(&root), &docs_dir(&root)).unwrap();
        (root, RollupCodesHandler::new(catalog))
    }

    /// Test that server info contains correct name, version, and instructions
    #[test]
    fn test_get_info_returns_valid_server_info() {
        let (_root, handler) = create_test_handler();
        let info = handler.get_info();

        assert_eq!(info.server_info.name, "rollup-codes-mcp");
        assert_eq!(info.server_info.version, env!("CARGO_PKG_VERSION"));
        assert_eq!(
            info.server_info.title,
            Some("Rollup Codes MCP Server".to_string())
        );
        assert!(info.instructions.is_some());
    }

    /// Test that server advertises correct MCP capabilities (resources, tools, but not prompts)
    #[test]
    fn test_get_info_capabilities() {
        let (_root, handler) = create_test_handler();
        let info = handler.get_info();

        assert!(info.capabilities.resources.is_some());
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.prompts.is_none());
    }

    /// Test that the tool list is computed once from the catalog
    #[test]
    fn test_tool_list() {
        let (_root, handler) = create_test_handler();
        assert_eq!(handler.tool_list().len(), 3);
        assert_eq!(handler.catalog().len(), 3);
    }

    /// Test that clones share the same catalog
    #[test]
    fn test_handler_is_clone() {
        let (_root, handler) = create_test_handler();
        let cloned = handler.clone();
        assert!(Arc::ptr_eq(&handler.catalog, &cloned.catalog));
    }

    #[test]
    fn test_read_catalog_resource() {
        let (_root, handler) = create_test_handler();
        let result = handler.read_resource_uri(CATALOG_URI.to_string()).unwrap();

        let ResourceContents::TextResourceContents { text, mime_type, .. } = &result.contents[0]
        else {
            panic!("expected text resource");
        };
        assert_eq!(mime_type.as_deref(), Some("application/json"));
        let rollups: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(rollups[2]["name"], "zksync-era");
    }

    /// Test that the diagnostics resource lists the broken fixture sources
    #[test]
    fn test_read_diagnostics_resource() {
        let (_root, handler) = create_test_handler();
        let result = handler
            .read_resource_uri(DIAGNOSTICS_URI.to_string())
            .unwrap();

        let ResourceContents::TextResourceContents { text, .. } = &result.contents[0] else {
            panic!("expected text resource");
        };
        let diagnostics: serde_json::Value = serde_json::from_str(text).unwrap();
        assert_eq!(diagnostics.as_array().unwrap().len(), 2);
        assert_eq!(diagnostics[0]["rollup"], "scroll");
    }

    #[test]
    fn test_read_unknown_resource() {
        let (_root, handler) = create_test_handler();
        assert!(handler
            .read_resource_uri("rollups://unknown".to_string())
            .is_err());
    }
}
