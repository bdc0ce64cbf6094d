//! Model Context Protocol surface: exposes the `ask_ai` tool over stdio.

pub mod protocol;
pub mod server;
pub mod tool;

pub use protocol::{CallToolResult, JsonRpcError, JsonRpcRequest, JsonRpcResponse, ToolDefinition};
pub use server::McpServer;
pub use tool::{ASK_AI_TOOL_NAME, AskAiTool, ToolHandler, format_answer, format_error};
