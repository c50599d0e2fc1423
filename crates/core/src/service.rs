//! Service and adapter lifecycle seams.

use async_trait::async_trait;

use crate::context::Scope;
use crate::error::AppError;

/// Lifecycle every bootstrapped service implements.
#[async_trait]
pub trait Service: Send + Sync {
    /// Unique service code.
    fn code(&self) -> &str;
    /// All initialization: config, dependencies, wiring.
    async fn init(&mut self, scope: &Scope) -> Result<(), AppError>;
    /// Starts background processing (listeners, workers).
    async fn start(&mut self, scope: &Scope) -> Result<(), AppError>;
    /// Releases resources.
    async fn close(&mut self, scope: &Scope);
}

/// External collaborator attached to a service.
#[async_trait]
pub trait Adapter: Send + Sync {
    async fn init(&mut self, scope: &Scope) -> Result<(), AppError>;
    async fn close(&mut self, scope: &Scope) -> Result<(), AppError>;
}
