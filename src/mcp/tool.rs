use crate::llm::{Answer, Query};
use crate::mcp::protocol::{CallToolResult, JsonRpcError, ToolDefinition};
use crate::service::AskAiService;
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::fmt::Display;

pub const ASK_AI_TOOL_NAME: &str = "ask_ai";

const ASK_AI_TOOL_DESCRIPTION: &str = "\
Ask another AI model for help with a problem, for a second opinion, or for brainstorming.

When to call this tool:
- You are stuck on a problem or need help debugging.
- You are unsure about the best approach or a technical decision.
- You want a code review or suggestions for improvement.
- You need new ideas or alternative solutions.

How to get the best results:
- Put your specific question in the 'question' field.
- Put ALL relevant information into the 'context' field in one go: code, error logs, conversation history, requirements, and anything else that helps. The other model has no memory and cannot see your conversation.

**CRITICAL WARNING:**
The answer comes from another AI and may be inaccurate or misleading.
You MUST verify any information, code or suggestion it returns.
Treat its answers as suggestions to check, not as facts.";

/// A tool the MCP server can expose.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    fn definition(&self) -> ToolDefinition;

    /// Run the tool. `Err` is reserved for protocol-level problems such as
    /// malformed arguments; tool failures are reported in the result.
    async fn call(&self, arguments: Value) -> Result<CallToolResult, JsonRpcError>;
}

#[derive(Debug, Deserialize)]
struct AskAiArguments {
    question: String,
    #[serde(default)]
    context: Option<String>,
}

/// The `ask_ai` tool, backed by an [`AskAiService`].
#[derive(Clone)]
pub struct AskAiTool {
    service: AskAiService,
}

impl AskAiTool {
    pub fn new(service: AskAiService) -> Self {
        Self { service }
    }

    pub fn service(&self) -> &AskAiService {
        &self.service
    }

    /// Answer a query and wrap the outcome in a tool result.
    pub async fn ask(&self, query: Query) -> CallToolResult {
        match self.service.answer_query(query).await {
            Ok(answer) => CallToolResult::text(format_answer(&answer)),
            Err(err) => CallToolResult::error(format_error(&err)),
        }
    }
}

#[async_trait]
impl ToolHandler for AskAiTool {
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: ASK_AI_TOOL_NAME.to_string(),
            description: ASK_AI_TOOL_DESCRIPTION.to_string(),
            input_schema: json!({
                "type": "object",
                "properties": {
                    "question": {
                        "type": "string",
                        "description": "The specific question or query to ask the AI model"
                    },
                    "context": {
                        "type": "string",
                        "description": "Optional context: background information, code snippets, previous discussion results, conversation history, and any other relevant details"
                    }
                },
                "required": ["question"],
                "additionalProperties": false
            }),
        }
    }

    async fn call(&self, arguments: Value) -> Result<CallToolResult, JsonRpcError> {
        let arguments: AskAiArguments = serde_json::from_value(arguments).map_err(|e| {
            JsonRpcError::invalid_params(format!(
                "Invalid arguments for {}: {}",
                ASK_AI_TOOL_NAME, e
            ))
        })?;

        let query = Query {
            question: arguments.question,
            context: arguments.context,
        };

        Ok(self.ask(query).await)
    }
}

/// Text payload for a successful answer.
pub fn format_answer(answer: &Answer) -> String {
    let attribution = match &answer.resolved_model_id {
        Some(model) => format!("{}/{}", answer.provider, model),
        None => answer.provider.to_string(),
    };

    format!("**AI Response (By {}):**\n\n{}", attribution, answer.text)
}

/// Text payload for a failed query.
pub fn format_error(error: &impl Display) -> String {
    format!(
        "**Error**: Failed to get AI response: {}\n\nPlease ask the user to check the configuration and try again.",
        error
    )
}
