//! Line-delimited JSON-RPC 2.0 server exposing the diagnostics tools.
//!
//! Each input line is one request; each response is written as one line.
//! Nothing a client sends can stop the loop: malformed input and handler
//! failures come back as error objects.

use crate::error::RpcError;
use crate::extract::LogExtractor;
use crate::locate::DerivedData;
use crate::report::extract_diagnostics;
use anyhow::{Context, Result};
use serde_json::{json, Map, Value};
use std::io::{BufRead, Write};

pub const SERVER_NAME: &str = "xcode-diagnostics";
pub const PROTOCOL_VERSION: &str = "2024-11-05";

pub const TOOL_PROJECTS: &str = "get_xcode_projects";
pub const TOOL_DIAGNOSTICS: &str = "get_project_diagnostics";

pub struct McpServer {
    derived_data: DerivedData,
    extractor: Box<dyn LogExtractor>,
}

impl McpServer {
    pub fn new(derived_data: DerivedData, extractor: Box<dyn LogExtractor>) -> Self {
        McpServer {
            derived_data,
            extractor,
        }
    }

    /// Reads requests until end of input, answering each on its own line.
    pub fn serve<R: BufRead, W: Write>(&self, input: R, mut output: W) -> Result<()> {
        log::info!(
            "{} server listening on stdio (DerivedData: {})",
            SERVER_NAME,
            self.derived_data.root().display()
        );
        for line in input.lines() {
            let line = line.context("Reading request from stdin")?;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }
            if let Some(response) = self.process_line(line) {
                writeln!(output, "{}", response).context("Writing response")?;
                output.flush().context("Flushing response")?;
                log::debug!("sent: {}", response);
            }
        }
        log::info!("input closed, server exiting");
        Ok(())
    }

    /// Answers one raw request line. `None` for notifications.
    pub fn process_line(&self, line: &str) -> Option<String> {
        let response = match serde_json::from_str::<Value>(line) {
            Ok(request) => self.handle_request(&request)?,
            Err(e) => {
                log::error!("invalid JSON ({}): {}", e, line);
                error_response(
                    Value::Null,
                    RpcError::new(RpcError::PARSE_ERROR, "Parse error: invalid JSON"),
                )
            }
        };
        Some(response.to_string())
    }

    pub fn handle_request(&self, request: &Value) -> Option<Value> {
        log::debug!("received: {}", request);
        let id = request.get("id").cloned();
        let method = request
            .get("method")
            .and_then(Value::as_str)
            .filter(|m| !m.is_empty());

        let Some(method) = method else {
            return Some(error_response(
                id.unwrap_or(Value::Null),
                RpcError::new(RpcError::INVALID_REQUEST, "Invalid Request: missing method"),
            ));
        };
        if id.is_none() && method.starts_with("notifications/") {
            log::debug!("notification {}", method);
            return None;
        }

        let empty = Map::new();
        let params = request
            .get("params")
            .and_then(Value::as_object)
            .unwrap_or(&empty);
        let id = id.unwrap_or(Value::Null);
        Some(match self.dispatch(method, params) {
            Ok(result) => json!({ "jsonrpc": "2.0", "id": id, "result": result }),
            Err(e) => {
                log::warn!("{} failed: {}", method, e);
                error_response(id, e)
            }
        })
    }

    fn dispatch(&self, method: &str, params: &Map<String, Value>) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(self.initialize(params)),
            "shutdown" => {
                log::info!("shutdown requested");
                Ok(json!({}))
            }
            "tools/list" | "mcp.list_tools" => Ok(json!({ "tools": tool_descriptors() })),
            "tools/call" | "mcp.call_tool" => self.call_tool(params),
            "prompts/list" => Ok(json!({ "prompts": [] })),
            other => Err(RpcError::new(
                RpcError::METHOD_NOT_FOUND,
                format!("Method '{}' not found", other),
            )),
        }
    }

    fn initialize(&self, params: &Map<String, Value>) -> Value {
        let client = params
            .get("clientInfo")
            .or_else(|| params.get("client_info"))
            .and_then(|c| c.get("name"))
            .and_then(Value::as_str)
            .unwrap_or("unknown");
        log::info!("initialize from client {}", client);
        json!({
            "serverInfo": { "name": SERVER_NAME, "version": env!("CARGO_PKG_VERSION") },
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": { "tools": {}, "resources": {}, "prompts": {} },
        })
    }

    fn call_tool(&self, params: &Map<String, Value>) -> Result<Value, RpcError> {
        let name = params.get("name").and_then(Value::as_str).unwrap_or("");
        let empty = Map::new();
        let arguments = params
            .get("arguments")
            .or_else(|| params.get("parameters"))
            .and_then(Value::as_object)
            .unwrap_or(&empty);

        let result = match name {
            TOOL_PROJECTS => self.get_xcode_projects(),
            TOOL_DIAGNOSTICS => self.get_project_diagnostics(arguments),
            _ => {
                return Err(RpcError::new(
                    RpcError::METHOD_NOT_FOUND,
                    format!("Tool '{}' not found", name),
                ))
            }
        }
        .map_err(|e| {
            RpcError::new(
                RpcError::SERVER_ERROR,
                format!("Tool execution error: {:#}", e),
            )
        })?;

        Ok(json!({ "content": [{ "type": "text", "text": result.to_string() }] }))
    }

    fn get_xcode_projects(&self) -> Result<Value> {
        let projects = self.derived_data.list_projects()?;
        Ok(json!({ "projects": projects }))
    }

    fn get_project_diagnostics(&self, arguments: &Map<String, Value>) -> Result<Value> {
        let project = arguments
            .get("project_dir_name")
            .and_then(Value::as_str)
            .context("missing required argument 'project_dir_name'")?;
        let include_warnings = arguments
            .get("include_warnings")
            .and_then(Value::as_bool)
            .unwrap_or(true);
        let report = extract_diagnostics(
            &self.derived_data,
            self.extractor.as_ref(),
            project,
            include_warnings,
        );
        serde_json::to_value(report).context("Serializing diagnostics report")
    }
}

fn error_response(id: Value, error: RpcError) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "error": { "code": error.code, "message": error.message },
    })
}

/// Descriptors returned by `tools/list`.
pub fn tool_descriptors() -> Value {
    json!([
        {
            "name": TOOL_PROJECTS,
            "description": "Lists all Xcode projects that have build logs in the DerivedData directory.",
            "inputSchema": { "type": "object", "properties": {}, "required": [] },
        },
        {
            "name": TOOL_DIAGNOSTICS,
            "description": "Gets diagnostic information (errors and warnings) from the latest build log of a specific project.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "project_dir_name": {
                        "type": "string",
                        "description": "Directory name of the project in DerivedData (e.g. 'ProjectName-hash')",
                    },
                    "include_warnings": {
                        "type": "boolean",
                        "description": "Whether to include warnings in addition to errors",
                        "default": true,
                    },
                },
                "required": ["project_dir_name"],
            },
        },
    ])
}
