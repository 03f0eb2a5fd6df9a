use std::sync::Arc;

use serde_json::Value;

use crate::domain::{DispatchError, DispatchResult, Envelope};
use crate::typed::Registry;

/// Dispatcher executes an envelope by dispatching to a registered handler.
///
/// Steps, stopping at the first failure:
/// 1. decode the `(name, token, payload)` envelope
/// 2. look up `name`
/// 3. decode `payload` against the declaration's input
/// 4. run the handler
/// 5. return the result with the inbound token echoed back
///
/// The registry is shared read-only; dispatching never mutates it, so any
/// number of dispatches may run concurrently on clones of the same `Arc`.
pub struct Dispatcher<Ctx> {
    registry: Arc<Registry<Ctx>>,
}

impl<Ctx> Clone for Dispatcher<Ctx> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<Ctx: Send + 'static> Dispatcher<Ctx> {
    pub fn new(registry: Arc<Registry<Ctx>>) -> Self {
        Self { registry }
    }

    pub fn registry(&self) -> &Registry<Ctx> {
        &self.registry
    }

    /// Dispatch one raw envelope.
    pub async fn call(&self, ctx: Ctx, raw: Value) -> Result<DispatchResult, DispatchError> {
        let envelope = Envelope::decode(raw)?;
        self.call_envelope(ctx, envelope).await
    }

    /// Dispatch an envelope the transport has already decoded.
    pub async fn call_envelope(
        &self,
        ctx: Ctx,
        envelope: Envelope,
    ) -> Result<DispatchResult, DispatchError> {
        let Envelope {
            name,
            token,
            payload,
        } = envelope;

        let handler = self
            .registry
            .get(&name)
            .ok_or_else(|| DispatchError::UnknownFunction(name.clone()))?;

        let result = handler.handle_dyn(ctx, payload).await?;
        Ok(DispatchResult { token, result })
    }
}
