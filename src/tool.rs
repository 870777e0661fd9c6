//! The tool registry: registration, discovery, dispatch, and the
//! `GabpTool`-trait stand-in for reflective binding (`spec.md` §4.5, §9
//! REDESIGN FLAGS — Rust has no runtime reflection over annotated methods,
//! so the "enumerate annotated host methods" surface becomes an explicit,
//! compile-checked collection instead).

use std::collections::HashMap;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use serde_json::Value;
use tokio::sync::RwLock;

use crate::error::{RegistrationError, ToolError};

/// A future returned by a tool handler. Boxed so `ToolRegistry` can hold
/// handlers of heterogeneous concrete future types in one map, the same
/// shape the teacher's `ForwarderCommand` channel uses to erase handler
/// futures behind a single send point.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A tool's callable implementation: raw JSON arguments in, a JSON result or
/// a [`ToolError`] out.
pub type ToolHandler = Arc<dyn Fn(Value) -> BoxFuture<'static, Result<Value, ToolError>> + Send + Sync>;

/// One formal parameter of a tool, as advertised in `tools/list`.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolParameter {
    pub name: String,
    #[serde(rename = "type")]
    pub type_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub required: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
}

impl ToolParameter {
    #[must_use]
    pub fn required(name: impl Into<String>, type_name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: None,
            required: true,
            default: None,
        }
    }

    #[must_use]
    pub fn optional(name: impl Into<String>, type_name: impl Into<String>, default: Value) -> Self {
        Self {
            name: name.into(),
            type_name: type_name.into(),
            description: None,
            required: false,
            default: Some(default),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}

/// Metadata describing a registered tool. `requires_auth` is advertisement
/// only: the session state machine requires auth for every non-handshake
/// method regardless of this flag (`spec.md` §9 open question 5).
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "requiresAuth")]
    pub requires_auth: bool,
    pub parameters: Vec<ToolParameter>,
}

impl ToolDescriptor {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            requires_auth: true,
            parameters: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn with_parameters(mut self, parameters: Vec<ToolParameter>) -> Self {
        self.parameters = parameters;
        self
    }
}

/// A host-provided tool implementation, the trait-based substitute for
/// reflective binding named in `spec.md` §4.5.1 / §9 REDESIGN FLAGS.
pub trait GabpTool: Send + Sync {
    fn name(&self) -> &str;
    fn descriptor(&self) -> ToolDescriptor;
    fn call(&self, args: Value) -> BoxFuture<'static, Result<Value, ToolError>>;
}

struct RegisteredTool {
    descriptor: ToolDescriptor,
    handler: ToolHandler,
    insertion_order: u64,
}

/// Register/unregister/has/list/call over named tools.
///
/// Insertion order is preserved for `list()`, matching the "ordering is
/// insertion order" note in `spec.md` §4.4's routing table.
pub struct ToolRegistry {
    tools: RwLock<HashMap<String, RegisteredTool>>,
    next_order: std::sync::atomic::AtomicU64,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self {
            tools: RwLock::new(HashMap::new()),
            next_order: std::sync::atomic::AtomicU64::new(0),
        }
    }

    /// Registers `name` with `handler`. A missing `descriptor` synthesizes
    /// one with only `name` populated. Re-registering overwrites the prior
    /// entry atomically (a single write-lock critical section).
    pub async fn register_tool(
        &self,
        name: impl Into<String>,
        handler: ToolHandler,
        descriptor: Option<ToolDescriptor>,
    ) -> Result<(), RegistrationError> {
        let name = name.into();
        let trimmed = name.trim();
        if trimmed.is_empty() {
            return Err(RegistrationError::EmptyName);
        }
        let descriptor = descriptor.unwrap_or_else(|| ToolDescriptor::new(trimmed));
        let order = self
            .next_order
            .fetch_add(1, std::sync::atomic::Ordering::Relaxed);

        let mut tools = self.tools.write().await;
        tools.insert(
            trimmed.to_owned(),
            RegisteredTool {
                descriptor,
                handler,
                insertion_order: order,
            },
        );
        Ok(())
    }

    /// Registers every tool yielded by `hosts`, using each tool's own
    /// `name()`/`descriptor()`/`call()` as the registration.
    pub async fn register_tools_from<I>(&self, hosts: I) -> Result<(), RegistrationError>
    where
        I: IntoIterator<Item = Box<dyn GabpTool>>,
    {
        for host in hosts {
            let descriptor = host.descriptor();
            let host = Arc::new(host);
            let handler: ToolHandler = {
                let host = Arc::clone(&host);
                Arc::new(move |args: Value| host.call(args))
            };
            self.register_tool(descriptor.name.clone(), handler, Some(descriptor))
                .await?;
        }
        Ok(())
    }

    pub async fn unregister(&self, name: &str) {
        self.tools.write().await.remove(name);
    }

    pub async fn has(&self, name: &str) -> bool {
        self.tools.read().await.contains_key(name)
    }

    /// All registered tool descriptors, in registration order.
    pub async fn list(&self) -> Vec<ToolDescriptor> {
        let tools = self.tools.read().await;
        let mut entries: Vec<_> = tools.values().collect();
        entries.sort_by_key(|t| t.insertion_order);
        entries.into_iter().map(|t| t.descriptor.clone()).collect()
    }

    /// Invokes the handler registered under `name`. The handler runs
    /// without holding the registry lock — only the `Arc<ToolHandler>` is
    /// cloned out from under the lock before the call.
    pub async fn call(&self, name: &str, args: Value) -> Result<Value, ToolCallError> {
        let handler = {
            let tools = self.tools.read().await;
            let entry = tools.get(name).ok_or(ToolCallError::NotFound)?;
            Arc::clone(&entry.handler)
        };
        handler(args).await.map_err(ToolCallError::Handler)
    }
}

/// Outcome of [`ToolRegistry::call`], translated to error codes by the
/// session layer (`spec.md` §4.4: `ToolNotFound` → -31002, handler failure →
/// `InternalError` → -32603).
#[derive(Debug)]
pub enum ToolCallError {
    NotFound,
    Handler(ToolError),
}
