//! # Event Router
//!
//! Filters classified events and dispatches the survivors to the registered
//! handler for their kind. Filter order:
//!
//! 1. Unknown event kind
//! 2. Emitted by another contract instance
//! 3. No handler registered
//!
//! Handler errors and panics are caught here and reported as
//! `EventHandlerFailed`; they never reach the stream driver.

use futures::FutureExt;
use shared_types::TxEvent;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use crate::domain::{ClassifiedEvent, ContractEventKind, VerifierIdentity};
use crate::events::DiagnosticEvent;
use crate::handlers::{HandlerParams, HandlerRegistry};
use crate::ports::{AssetVerifier, ChainClient};
use crate::queue::{DiagnosticSender, OutboundSender};

/// What happened to a routed event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteOutcome {
    UnknownEvent,
    ContractMismatch,
    Unhandled(ContractEventKind),
    Handled(ContractEventKind),
    HandlerFailed(ContractEventKind),
}

/// Collaborators handed to every handler invocation.
#[derive(Clone)]
pub struct RouterContext {
    pub contract_address: String,
    pub chain: Arc<dyn ChainClient>,
    pub identity: VerifierIdentity,
    pub processor: Arc<dyn AssetVerifier>,
    pub outbound: OutboundSender,
    pub diagnostics: DiagnosticSender,
}

pub struct EventRouter {
    context: RouterContext,
    registry: HandlerRegistry,
}

impl EventRouter {
    pub fn new(context: RouterContext, registry: HandlerRegistry) -> Self {
        Self { context, registry }
    }

    pub fn contract_address(&self) -> &str {
        &self.context.contract_address
    }

    pub fn registry(&self) -> &HandlerRegistry {
        &self.registry
    }

    /// Classify and route a raw chain event. Non-contract events are skipped
    /// silently and return `None`.
    pub async fn route_raw(&self, event: &TxEvent) -> Option<RouteOutcome> {
        match ClassifiedEvent::classify(event) {
            Some(classified) => Some(self.route(classified).await),
            None => None,
        }
    }

    /// Route one classified event. Handlers run to completion before this
    /// returns.
    pub async fn route(&self, event: ClassifiedEvent) -> RouteOutcome {
        let diagnostics = &self.context.diagnostics;

        let Some(kind) = event.event_kind() else {
            diagnostics.publish(DiagnosticEvent::EventIgnoredUnknownEvent { event });
            return RouteOutcome::UnknownEvent;
        };

        if event.contract_address() != Some(self.context.contract_address.as_str()) {
            diagnostics.publish(DiagnosticEvent::EventIgnoredContractMismatch {
                event,
                expected: self.context.contract_address.clone(),
            });
            return RouteOutcome::ContractMismatch;
        }

        let Some(handler) = self.registry.get(kind) else {
            diagnostics.publish(DiagnosticEvent::EventIgnoredUnhandledType { event, kind });
            return RouteOutcome::Unhandled(kind);
        };

        tracing::debug!(kind = %kind, tx_hash = %event.tx_hash(), height = event.block_height(), "Dispatching contract event");
        let params = self.params(event.clone());
        let result = AssertUnwindSafe(handler(params)).catch_unwind().await;

        let error = match result {
            Ok(Ok(())) => return RouteOutcome::Handled(kind),
            Ok(Err(e)) => format!("{e:#}"),
            Err(panic) => format!("handler panicked: {}", panic_message(panic.as_ref())),
        };
        tracing::error!(kind = %kind, tx_hash = %event.tx_hash(), "Event handler failed: {}", error);
        diagnostics.publish(DiagnosticEvent::EventHandlerFailed { event, kind, error });
        RouteOutcome::HandlerFailed(kind)
    }

    fn params(&self, event: ClassifiedEvent) -> HandlerParams {
        let context = &self.context;
        HandlerParams {
            event,
            contract_address: context.contract_address.clone(),
            chain: context.chain.clone(),
            identity: context.identity.clone(),
            processor: context.processor.clone(),
            outbound: context.outbound.clone(),
            diagnostics: context.diagnostics.clone(),
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
