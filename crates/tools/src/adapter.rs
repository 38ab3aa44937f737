//! Adapter used by hosts to advertise capabilities and dispatch requests.

use std::sync::Arc;

use dashmap::DashMap;
use proto::{CallId, CapabilityDescriptor, Envelope, Feature, ToolRequest, codes, err};
use tokio::sync::Mutex;
use tracing::{Instrument, debug, debug_span, warn};

use crate::ToolHandler;
use crate::idempotency::IdempotencyStore;
use crate::validation::RequestValidator;

/// Dispatch point wrapping a single tool handler
pub struct Adapter {
    handler: Arc<dyn ToolHandler>,
    validator: Option<RequestValidator>,
    idempotency: Option<Arc<dyn IdempotencyStore>>,
    in_flight: DashMap<String, Arc<Mutex<()>>>,
}

impl Adapter {
    /// Creates an adapter with schema validation on and no idempotency store.
    pub fn new(handler: impl ToolHandler + 'static) -> Self {
        Self::from_arc(Arc::new(handler))
    }

    /// Creates an adapter around a shared handler.
    pub fn from_arc(handler: Arc<dyn ToolHandler>) -> Self {
        let validator = Some(RequestValidator::new(handler.request_schema()));
        Self {
            handler,
            validator,
            idempotency: None,
            in_flight: DashMap::new(),
        }
    }

    /// Disables schema validation; the handler sees every object request.
    pub fn without_validation(mut self) -> Self {
        self.validator = None;
        self
    }

    /// Replays successful envelopes for repeated idempotency keys.
    pub fn with_idempotency(mut self, store: Arc<dyn IdempotencyStore>) -> Self {
        self.idempotency = Some(store);
        self
    }

    /// Returns the wrapped tool's name.
    pub fn tool_name(&self) -> &str {
        self.handler.name()
    }

    /// Advertises the handler's features that are active on this adapter.
    pub fn capabilities(&self) -> Envelope {
        let features = self
            .handler
            .features()
            .into_iter()
            .filter(|feature| match feature {
                Feature::Validation => self.validator.is_some(),
                Feature::Idempotency => self.idempotency.is_some(),
                Feature::Envelope => true,
            })
            .collect();
        CapabilityDescriptor::new(self.handler.name(), features).into()
    }

    /// Validates, deduplicates and dispatches one request.
    ///
    /// Never fails: every problem is reported as an error envelope.
    pub async fn handle(&self, request: serde_json::Value) -> Envelope {
        let call_id = CallId::new();
        let span = debug_span!("dispatch", call_id = %call_id, tool = %self.handler.name());
        self.dispatch(request).instrument(span).await
    }

    async fn dispatch(&self, request: serde_json::Value) -> Envelope {
        let request = match ToolRequest::from_value(request) {
            Ok(request) => request,
            Err(e) => return err(e.code(), e.envelope_message()),
        };

        if let Some(validator) = &self.validator
            && let Err(failure) = validator.validate(request.as_value())
        {
            debug!(%failure, "Request failed schema validation");
            return err(
                codes::E_SCHEMA,
                format!("schema validation failed: {failure}"),
            );
        }

        let Some((store, key)) = self.idempotency.as_ref().zip(request.idempotency_key()) else {
            return self.execute(&request).await;
        };

        // Callers sharing a key wait here until the first one has finished.
        let slot = self.in_flight.entry(key.to_string()).or_default().clone();
        let envelope = {
            let _claim = slot.lock().await;
            match store.get(key) {
                Some(cached) => {
                    debug!(key, "Replaying cached envelope");
                    cached
                }
                None => {
                    let envelope = self.execute(&request).await;
                    if envelope.is_success() {
                        store.put(key, envelope.clone());
                    }
                    envelope
                }
            }
        };
        self.in_flight
            .remove_if(key, |_, held| Arc::ptr_eq(held, &slot) && Arc::strong_count(held) == 2);
        envelope
    }

    async fn execute(&self, request: &ToolRequest) -> Envelope {
        debug!("Executing tool");
        match self.handler.handle(request).await {
            Ok(success) => Envelope::Success(success),
            Err(e) => {
                warn!(code = e.code(), error = %e, "Tool call failed");
                err(e.code(), e.envelope_message())
            }
        }
    }
}
