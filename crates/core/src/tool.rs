//! The catalogue of capabilities the model may call.
//!
//! The registry is built once at startup and never mutated afterwards, so it
//! is shared across concurrent turns behind an `Arc`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::debug;

use crate::error::{ToolError, ToolErrorKind, TransportError};
use crate::message::ToolCall;
use crate::schema::InputSchema;

/// Declarative description of a tool, as advertised to the model and as
/// exchanged with the tool host (`{ name, description, inputSchema }`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDeclaration {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub input_schema: InputSchema,
}

/// The result of one tool call.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The call ID this result is for
    pub call_id: String,

    /// The output content (what the model sees)
    pub content: String,

    /// Optional structured data
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    /// Whether the call failed
    #[serde(default)]
    pub is_error: bool,

    /// Why it failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<ToolErrorKind>,
}

impl ToolResult {
    pub fn success(content: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            content: content.into(),
            data: None,
            is_error: false,
            error_kind: None,
        }
    }

    pub fn error(kind: ToolErrorKind, content: impl Into<String>) -> Self {
        Self {
            call_id: String::new(),
            content: content.into(),
            data: None,
            is_error: true,
            error_kind: Some(kind),
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }

    pub fn with_call_id(mut self, call_id: impl Into<String>) -> Self {
        self.call_id = call_id.into();
        self
    }
}

/// The core Tool trait.
///
/// Local tools (shop lookups on the tool host) and remote proxies (the
/// orchestrator's view of those same tools) both implement it.
#[async_trait]
pub trait Tool: Send + Sync {
    /// The unique name of this tool (e.g., "consult_order_status").
    fn name(&self) -> &str;

    /// A description of what this tool does (sent to the LLM).
    fn description(&self) -> &str;

    /// Typed input schema.
    fn input_schema(&self) -> InputSchema;

    /// Execute the tool with already-validated arguments.
    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError>;

    /// Convert this tool into its declaration.
    fn declaration(&self) -> ToolDeclaration {
        ToolDeclaration {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.input_schema(),
        }
    }
}

/// An ordered registry of available tools.
///
/// The agent loop uses this to:
/// 1. Get tool declarations to send to the LLM
/// 2. Validate and dispatch the calls the LLM requests
pub struct ToolRegistry {
    tools: Vec<Box<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name in place.
    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        match self.index.get(&name) {
            Some(&idx) => self.tools[idx] = tool,
            None => {
                self.index.insert(name, self.tools.len());
                self.tools.push(tool);
            }
        }
    }

    /// Get a tool by name.
    pub fn get(&self, name: &str) -> Option<&dyn Tool> {
        self.index.get(name).map(|&idx| self.tools[idx].as_ref())
    }

    /// All tool declarations, in registration order.
    pub fn list(&self) -> Vec<ToolDeclaration> {
        self.tools.iter().map(|t| t.declaration()).collect()
    }

    /// List all registered tool names.
    pub fn names(&self) -> Vec<&str> {
        self.tools.iter().map(|t| t.name()).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Validate and execute a tool call.
    ///
    /// Unknown tools, schema violations, and handler failures all come back as
    /// error results carrying the call id. Only a broken tool host transport
    /// is returned as `Err`, because it fails the whole turn.
    pub async fn invoke(&self, call: &ToolCall) -> Result<ToolResult, TransportError> {
        let Some(tool) = self.get(&call.name) else {
            debug!(tool = %call.name, "Unknown tool requested");
            return Ok(ToolResult::error(
                ToolErrorKind::UnknownTool,
                format!("Unknown tool: {}", call.name),
            )
            .with_call_id(&call.id));
        };

        if let Err(e) = tool.input_schema().validate(&call.arguments) {
            return Ok(ToolResult::error(
                ToolErrorKind::SchemaValidation,
                format!("Invalid arguments for {}: {e}", call.name),
            )
            .with_call_id(&call.id));
        }

        let result = match tool.execute(call.arguments.clone()).await {
            Ok(result) => result,
            Err(ToolError::Transport(e)) => return Err(e),
            Err(ToolError::NotFound(name)) => {
                ToolResult::error(ToolErrorKind::UnknownTool, format!("Unknown tool: {name}"))
            }
            Err(ToolError::InvalidArguments(reason)) => ToolResult::error(
                ToolErrorKind::SchemaValidation,
                format!("Invalid arguments for {}: {reason}", call.name),
            ),
            Err(e @ ToolError::ExecutionFailed { .. }) => {
                ToolResult::error(ToolErrorKind::Execution, e.to_string())
            }
        };
        Ok(result.with_call_id(&call.id))
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
