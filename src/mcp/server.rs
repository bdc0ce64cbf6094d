//! MCP server over newline-delimited JSON-RPC.
//!
//! Requests are read line by line. `tools/call` requests run on their own
//! tasks so a slow model does not block `ping` or other calls; every reply is
//! funneled through one writer task so lines never interleave. A
//! `notifications/cancelled` for an in-flight call aborts its task and no
//! reply is sent for it.

use crate::env::{SERVER_NAME, SERVER_VERSION};
use crate::mcp::protocol::{
    CallToolParams, CancelledParams, Implementation, InitializeParams, InitializeResult,
    JSONRPC_VERSION, JsonRpcError, JsonRpcRequest, JsonRpcResponse, LATEST_PROTOCOL_VERSION,
    ListToolsResult, ServerCapabilities, ToolsCapability,
};
use crate::mcp::tool::ToolHandler;
use serde_json::{Value, json};
use std::collections::HashMap;
use std::io;
use std::sync::Arc;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::{Mutex, mpsc};
use tokio::task::{AbortHandle, JoinSet};
use tracing::{debug, info, warn};

pub struct McpServer {
    info: Implementation,
    tools: HashMap<String, Arc<dyn ToolHandler>>,
}

impl McpServer {
    pub fn new() -> Self {
        Self {
            info: Implementation {
                name: SERVER_NAME.to_string(),
                version: SERVER_VERSION.to_string(),
            },
            tools: HashMap::new(),
        }
    }

    pub fn with_tool(mut self, tool: impl ToolHandler + 'static) -> Self {
        let definition = tool.definition();
        self.tools.insert(definition.name, Arc::new(tool));
        self
    }

    pub fn info(&self) -> &Implementation {
        &self.info
    }

    /// Serve on the process stdin/stdout until stdin closes.
    pub async fn run_stdio(self) -> io::Result<()> {
        self.run(tokio::io::stdin(), tokio::io::stdout()).await
    }

    /// Serve on any reader/writer pair until the reader reaches end of stream.
    ///
    /// Calls still running at end of stream are allowed to finish and their
    /// replies are written before this returns.
    pub async fn run<R, W>(self, reader: R, writer: W) -> io::Result<()>
    where
        R: AsyncRead + Unpin,
        W: AsyncWrite + Unpin + Send + 'static,
    {
        let (tx, rx) = mpsc::unbounded_channel();
        let writer_task = tokio::spawn(write_responses(writer, rx));

        let mut connection = Connection {
            server: Arc::new(self),
            tx,
            tasks: JoinSet::new(),
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        };

        let mut lines = BufReader::new(reader).lines();
        while let Some(line) = lines.next_line().await? {
            connection.handle_line(&line).await;
            while connection.tasks.try_join_next().is_some() {}
        }

        debug!("Input closed, waiting for in-flight calls");
        while connection.tasks.join_next().await.is_some() {}
        drop(connection);

        writer_task.await.map_err(io::Error::other)?
    }

    /// Handle one request and produce its reply, if it gets one.
    ///
    /// `tools/call` is awaited inline here; [`McpServer::run`] spawns it instead.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.jsonrpc != JSONRPC_VERSION {
            return request.id.map(|id| {
                JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!(
                        "Unsupported jsonrpc version: {}",
                        request.jsonrpc
                    )),
                )
            });
        }

        let Some(id) = request.id else {
            self.handle_notification(&request.method, request.params);
            return None;
        };

        let result = match request.method.as_str() {
            "initialize" => self.initialize(request.params),
            "ping" => Ok(json!({})),
            "tools/list" => self.list_tools(),
            "tools/call" => match self.prepare_call(request.params) {
                Ok((tool, arguments)) => tool.call(arguments).await.and_then(|result| {
                    serde_json::to_value(result)
                        .map_err(|e| JsonRpcError::internal_error(e.to_string()))
                }),
                Err(err) => Err(err),
            },
            other => Err(JsonRpcError::method_not_found(other)),
        };

        Some(match result {
            Ok(value) => JsonRpcResponse::success(id, value),
            Err(error) => JsonRpcResponse::failure(id, error),
        })
    }

    fn handle_notification(&self, method: &str, params: Option<Value>) {
        match method {
            "notifications/initialized" => info!("Client initialized"),
            "notifications/cancelled" => {
                // Only meaningful while serving; see Connection::cancel
                debug!(?params, "Cancellation outside of a connection ignored");
            }
            other => debug!(method = other, "Ignoring notification"),
        }
    }

    fn initialize(&self, params: Option<Value>) -> Result<Value, JsonRpcError> {
        let params: InitializeParams = match params {
            Some(value) => serde_json::from_value(value)
                .map_err(|e| JsonRpcError::invalid_params(e.to_string()))?,
            None => InitializeParams::default(),
        };

        if let Some(client) = &params.client_info {
            info!(client = %client.name, version = %client.version, "Initializing session");
        }

        let result = InitializeResult {
            protocol_version: params
                .protocol_version
                .unwrap_or_else(|| LATEST_PROTOCOL_VERSION.to_string()),
            capabilities: ServerCapabilities {
                tools: ToolsCapability {
                    list_changed: false,
                },
            },
            server_info: self.info.clone(),
            instructions: None,
        };

        serde_json::to_value(result).map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn list_tools(&self) -> Result<Value, JsonRpcError> {
        let mut tools: Vec<_> = self.tools.values().map(|tool| tool.definition()).collect();
        tools.sort_by(|a, b| a.name.cmp(&b.name));

        serde_json::to_value(ListToolsResult { tools })
            .map_err(|e| JsonRpcError::internal_error(e.to_string()))
    }

    fn prepare_call(
        &self,
        params: Option<Value>,
    ) -> Result<(Arc<dyn ToolHandler>, Value), JsonRpcError> {
        let params: CallToolParams = params
            .ok_or_else(|| JsonRpcError::invalid_params("Missing params for tools/call"))
            .and_then(|value| {
                serde_json::from_value(value)
                    .map_err(|e| JsonRpcError::invalid_params(e.to_string()))
            })?;

        let tool = self
            .tools
            .get(&params.name)
            .cloned()
            .ok_or_else(|| {
                JsonRpcError::invalid_params(format!("Unknown tool: {}", params.name))
            })?;

        debug!(tool = %params.name, "Calling tool");
        Ok((tool, params.arguments.unwrap_or_else(|| json!({}))))
    }
}

impl Default for McpServer {
    fn default() -> Self {
        Self::new()
    }
}

/// Per-connection state: the reply channel and the calls still running.
struct Connection {
    server: Arc<McpServer>,
    tx: mpsc::UnboundedSender<JsonRpcResponse>,
    tasks: JoinSet<()>,
    in_flight: Arc<Mutex<HashMap<String, AbortHandle>>>,
}

impl Connection {
    async fn handle_line(&mut self, line: &str) {
        let line = line.trim();
        if line.is_empty() {
            return;
        }

        let message: Value = match serde_json::from_str(line) {
            Ok(message) => message,
            Err(e) => {
                warn!(error = %e, "Discarding malformed message");
                self.send(JsonRpcResponse::failure(
                    Value::Null,
                    JsonRpcError::parse_error(e.to_string()),
                ));
                return;
            }
        };

        // Well-formed JSON that is not a request keeps its id when it has a usable one
        let id = match message.get("id") {
            Some(id @ (Value::String(_) | Value::Number(_))) => id.clone(),
            _ => Value::Null,
        };
        let request: JsonRpcRequest = match serde_json::from_value(message) {
            Ok(request) => request,
            Err(e) => {
                warn!(error = %e, "Discarding invalid request");
                self.send(JsonRpcResponse::failure(
                    id,
                    JsonRpcError::invalid_request(format!("Invalid request: {}", e)),
                ));
                return;
            }
        };

        match (request.method.as_str(), &request.id) {
            ("tools/call", Some(_)) if request.jsonrpc == JSONRPC_VERSION => {
                self.spawn_call(request).await
            }
            ("notifications/cancelled", None) => self.cancel(request.params).await,
            _ => {
                if let Some(response) = self.server.handle_request(request).await {
                    self.send(response);
                }
            }
        }
    }

    async fn spawn_call(&mut self, request: JsonRpcRequest) {
        let key = request_key(request.id.as_ref());

        // Hold the lock across spawn so the task cannot finish and clean up
        // before its handle is registered
        let mut registry = self.in_flight.lock().await;
        if registry.contains_key(&key) {
            drop(registry);
            warn!(request_id = %key, "Rejecting call that reuses an in-flight id");
            self.send(JsonRpcResponse::failure(
                request.id.unwrap_or(Value::Null),
                JsonRpcError::invalid_request("Duplicate request id"),
            ));
            return;
        }

        let server = Arc::clone(&self.server);
        let tx = self.tx.clone();
        let in_flight = Arc::clone(&self.in_flight);
        let task_key = key.clone();
        let handle = self.tasks.spawn(async move {
            if let Some(response) = server.handle_request(request).await {
                let _ = tx.send(response);
            }
            in_flight.lock().await.remove(&task_key);
        });
        registry.insert(key, handle);
    }

    async fn cancel(&mut self, params: Option<Value>) {
        let params: CancelledParams = match params.map(serde_json::from_value) {
            Some(Ok(params)) => params,
            _ => {
                warn!("Ignoring malformed cancellation");
                return;
            }
        };

        let key = request_key(Some(&params.request_id));
        match self.in_flight.lock().await.remove(&key) {
            Some(handle) => {
                handle.abort();
                info!(request_id = %key, reason = ?params.reason, "Cancelled in-flight call");
            }
            None => debug!(request_id = %key, "Cancellation for unknown or finished call"),
        }
    }

    fn send(&self, response: JsonRpcResponse) {
        if self.tx.send(response).is_err() {
            warn!("Response writer has stopped, dropping reply");
        }
    }
}

fn request_key(id: Option<&Value>) -> String {
    id.map(Value::to_string).unwrap_or_default()
}

async fn write_responses<W>(
    mut writer: W,
    mut rx: mpsc::UnboundedReceiver<JsonRpcResponse>,
) -> io::Result<()>
where
    W: AsyncWrite + Unpin,
{
    while let Some(response) = rx.recv().await {
        let mut line = serde_json::to_vec(&response)?;
        line.push(b'\n');
        writer.write_all(&line).await?;
        writer.flush().await?;
    }
    writer.shutdown().await
}
