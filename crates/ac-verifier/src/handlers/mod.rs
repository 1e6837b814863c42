//! # Event Handlers
//!
//! Business logic run for each routed contract event, keyed by event kind.
//!
//! A handler is a plain function value taking the fixed [`HandlerParams`]
//! bundle. Every invocation is expected to emit exactly one terminal
//! diagnostic: an ignore reason, a failure, or a success.

use futures::future::BoxFuture;
use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use crate::domain::{ClassifiedEvent, ContractEventKind, VerifierIdentity};
use crate::events::DiagnosticEvent;
use crate::ports::{AssetVerifier, ChainClient};
use crate::queue::{DiagnosticSender, OutboundSender};

pub mod onboard;
pub mod verify;

pub use onboard::handle_onboard_asset;
pub use verify::handle_verify_asset;

/// Everything a handler may use while processing one event.
#[derive(Clone)]
pub struct HandlerParams {
    pub event: ClassifiedEvent,
    /// Address of the watched contract.
    pub contract_address: String,
    pub chain: Arc<dyn ChainClient>,
    pub identity: VerifierIdentity,
    pub processor: Arc<dyn AssetVerifier>,
    pub outbound: OutboundSender,
    pub diagnostics: DiagnosticSender,
}

impl HandlerParams {
    /// Emit a diagnostic.
    pub fn emit(&self, event: DiagnosticEvent) {
        self.diagnostics.publish(event);
    }

    /// Whether the event names this verifier.
    ///
    /// Emits the matching ignore diagnostic when it does not.
    pub fn is_addressed_to_verifier(&self, kind: ContractEventKind) -> bool {
        let addressed = self
            .event
            .verifier_address()
            .map(|address| self.identity.is_addressed_by(address));
        match addressed {
            Some(true) => true,
            Some(false) => {
                self.emit(DiagnosticEvent::EventIgnoredDifferentVerifierAddress {
                    event: self.event.clone(),
                    kind,
                    registered: self.identity.address().to_string(),
                });
                false
            }
            None => {
                self.emit(DiagnosticEvent::EventIgnoredNoVerifierAddress {
                    event: self.event.clone(),
                    kind,
                });
                false
            }
        }
    }
}

/// A registered event handler.
pub type EventHandlerFn =
    Arc<dyn Fn(HandlerParams) -> BoxFuture<'static, anyhow::Result<()>> + Send + Sync>;

/// Wrap an async function as an [`EventHandlerFn`].
pub fn handler_fn<F, Fut>(f: F) -> EventHandlerFn
where
    F: Fn(HandlerParams) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<()>> + Send + 'static,
{
    Arc::new(move |params| Box::pin(f(params)))
}

/// Mapping from event kind to handler.
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: HashMap<ContractEventKind, EventHandlerFn>,
}

impl HandlerRegistry {
    /// A registry with no handlers.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The built-in onboard and verify handlers.
    pub fn with_defaults() -> Self {
        Self::empty()
            .with(
                ContractEventKind::OnboardAsset,
                handler_fn(handle_onboard_asset),
            )
            .with(ContractEventKind::VerifyAsset, handler_fn(handle_verify_asset))
    }

    /// Register a handler, returning the one it replaced.
    pub fn register(
        &mut self,
        kind: ContractEventKind,
        handler: EventHandlerFn,
    ) -> Option<EventHandlerFn> {
        self.handlers.insert(kind, handler)
    }

    pub fn with(mut self, kind: ContractEventKind, handler: EventHandlerFn) -> Self {
        self.register(kind, handler);
        self
    }

    pub fn remove(&mut self, kind: ContractEventKind) -> Option<EventHandlerFn> {
        self.handlers.remove(&kind)
    }

    pub fn get(&self, kind: ContractEventKind) -> Option<&EventHandlerFn> {
        self.handlers.get(&kind)
    }

    pub fn contains(&self, kind: ContractEventKind) -> bool {
        self.handlers.contains_key(&kind)
    }

    pub fn kinds(&self) -> impl Iterator<Item = ContractEventKind> + '_ {
        self.handlers.keys().copied()
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}
