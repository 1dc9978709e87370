//! Tool handler trait and its object-safe companion.
//!
//! Same blanket-impl pattern as `BoxLlmProvider`: handlers implement the
//! RPITIT `ToolHandler` trait, and `ToolHandlerDyn` erases them so a registry
//! can hold heterogeneous handlers.

use std::future::Future;
use std::pin::Pin;

use serde_json::Value;

use parlor_types::tool::DomainError;

use super::arguments::ToolArguments;

/// A local function the model may invoke.
///
/// Handlers receive arguments that already passed schema validation. Business
/// failures are returned as [`DomainError`] and reach the model as data.
pub trait ToolHandler: Send + Sync {
    fn call(&self, args: ToolArguments) -> impl Future<Output = Result<Value, DomainError>> + Send;
}

/// Object-safe version of [`ToolHandler`] with a boxed future.
pub trait ToolHandlerDyn: Send + Sync {
    fn call_boxed(
        &self,
        args: ToolArguments,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DomainError>> + Send + '_>>;
}

impl<T: ToolHandler> ToolHandlerDyn for T {
    fn call_boxed(
        &self,
        args: ToolArguments,
    ) -> Pin<Box<dyn Future<Output = Result<Value, DomainError>> + Send + '_>> {
        Box::pin(self.call(args))
    }
}

/// Adapter turning an async closure into a [`ToolHandler`].
pub struct FnHandler<F>(F);

impl<F, Fut> ToolHandler for FnHandler<F>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, DomainError>> + Send,
{
    fn call(&self, args: ToolArguments) -> impl Future<Output = Result<Value, DomainError>> + Send {
        (self.0)(args)
    }
}

/// Wrap an async closure as a tool handler.
///
/// ```
/// use parlor_core::tool::tool_fn;
/// use serde_json::json;
///
/// let handler = tool_fn(|args| async move {
///     Ok(json!({ "echo": args.str("text")? }))
/// });
/// # let _ = handler;
/// ```
pub fn tool_fn<F, Fut>(f: F) -> FnHandler<F>
where
    F: Fn(ToolArguments) -> Fut + Send + Sync,
    Fut: Future<Output = Result<Value, DomainError>> + Send,
{
    FnHandler(f)
}
