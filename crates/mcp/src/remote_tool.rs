//! Orchestrator-side proxy for a tool that lives on the tool host.

use async_trait::async_trait;
use orderdesk_core::error::{ToolError, ToolErrorKind};
use orderdesk_core::schema::InputSchema;
use orderdesk_core::tool::{Tool, ToolDeclaration, ToolResult};
use std::sync::Arc;

use crate::host::ToolHost;

pub struct RemoteTool {
    declaration: ToolDeclaration,
    host: Arc<ToolHost>,
}

impl RemoteTool {
    pub fn new(declaration: ToolDeclaration, host: Arc<ToolHost>) -> Self {
        Self { declaration, host }
    }
}

#[async_trait]
impl Tool for RemoteTool {
    fn name(&self) -> &str {
        &self.declaration.name
    }

    fn description(&self) -> &str {
        &self.declaration.description
    }

    fn input_schema(&self) -> InputSchema {
        self.declaration.input_schema.clone()
    }

    async fn execute(&self, arguments: serde_json::Value) -> Result<ToolResult, ToolError> {
        let result = self
            .host
            .call_tool(&self.declaration.name, arguments)
            .await
            .map_err(ToolError::Transport)?;

        let text = result.joined_text();
        if result.is_error {
            Ok(ToolResult::error(ToolErrorKind::Execution, text))
        } else {
            Ok(ToolResult::success(text))
        }
    }

    fn declaration(&self) -> ToolDeclaration {
        self.declaration.clone()
    }
}
