//! Shared test fixtures: a wired engine over in-memory adapters.

use ac_verifier::adapters::memory::{InMemoryBlockSource, InMemoryChainClient, StaticAssetVerifier};
use ac_verifier::adapters::Secp256k1Signer;
use ac_verifier::{
    AssetScopeAttribute, DiagnosticEvent, DiagnosticHandler, HandlerRegistry, OnboardingStatus,
    RestartConfig, VerifierConfig, VerifierService,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use parking_lot::Mutex;
use shared_types::{BlockHeight, EventAttribute, TxEvent};
use std::sync::Arc;
use std::time::Duration;

pub const CONTRACT: &str = "tp1assetclassification";
pub const VERIFIER: &str = "tp1verifier";
pub const OTHER_VERIFIER: &str = "tp1someoneelse";
pub const SCOPE: &str = "scope1qzge0zaztu65tx5x5llv5xc9ztsqxlkwel";
pub const VERIFIER_KEY: &str = "c9afa9d845ba75166b5c215767b1d6934e50c3db36e89b127b8a622b120f6721";

/// Contract event as the block stream delivers it: base64 keys and values.
pub fn encoded_event(height: BlockHeight, tx_hash: &str, attrs: &[(&str, &str)]) -> TxEvent {
    TxEvent::new(
        height,
        tx_hash,
        "wasm",
        attrs
            .iter()
            .map(|(k, v)| EventAttribute::new(STANDARD.encode(k), STANDARD.encode(v)))
            .collect(),
    )
}

/// Contract event as a transaction query returns it: plain text.
pub fn decoded_event(height: BlockHeight, tx_hash: &str, attrs: &[(&str, &str)]) -> TxEvent {
    TxEvent::new(
        height,
        tx_hash,
        "wasm",
        attrs
            .iter()
            .map(|(k, v)| EventAttribute::new(*k, *v))
            .collect(),
    )
}

/// Attributes of an `onboard_asset` event naming `verifier`.
pub fn onboard_attrs(verifier: &str) -> Vec<(&'static str, String)> {
    vec![
        ("_contract_address", CONTRACT.to_string()),
        ("asset_event_type", "onboard_asset".to_string()),
        ("asset_type", "heloc".to_string()),
        ("asset_scope_address", SCOPE.to_string()),
        ("asset_verifier_address", verifier.to_string()),
        ("asset_scope_owner_address", "tp1owner".to_string()),
    ]
}

pub fn as_pairs<'a>(attrs: &'a [(&'static str, String)]) -> Vec<(&'static str, &'a str)> {
    attrs.iter().map(|(k, v)| (*k, v.as_str())).collect()
}

pub fn scope_attribute(status: OnboardingStatus) -> AssetScopeAttribute {
    AssetScopeAttribute {
        asset_uuid: "1f3c5d0e-6a2b-4c9d-8e7f-0a1b2c3d4e5f".into(),
        scope_address: SCOPE.into(),
        asset_type: "heloc".into(),
        requestor_address: "tp1owner".into(),
        verifier_address: VERIFIER.into(),
        onboarding_status: status,
        latest_verification_message: None,
    }
}

/// Diagnostic handler that keeps everything it is given.
#[derive(Default)]
pub struct Recorder {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl Recorder {
    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events.lock().clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.events
            .lock()
            .iter()
            .map(|event| event.name().to_string())
            .collect()
    }

    pub fn count(&self, name: &str) -> usize {
        self.events
            .lock()
            .iter()
            .filter(|event| event.name() == name)
            .count()
    }
}

#[async_trait::async_trait]
impl DiagnosticHandler for Recorder {
    async fn handle(&self, event: &DiagnosticEvent) -> anyhow::Result<()> {
        self.events.lock().push(event.clone());
        Ok(())
    }
}

/// A built engine plus handles on its in-memory collaborators.
pub struct Engine {
    pub service: VerifierService,
    pub source: Arc<InMemoryBlockSource>,
    pub chain: Arc<InMemoryChainClient>,
    pub processor: Arc<StaticAssetVerifier>,
    pub recorder: Arc<Recorder>,
}

pub struct EngineBuilder {
    restart: RestartConfig,
    processor: StaticAssetVerifier,
    handlers: Option<HandlerRegistry>,
}

impl Default for EngineBuilder {
    fn default() -> Self {
        Self {
            restart: RestartConfig::disabled(),
            processor: StaticAssetVerifier::approving(),
            handlers: None,
        }
    }
}

impl EngineBuilder {
    pub fn restart(mut self, restart: RestartConfig) -> Self {
        self.restart = restart;
        self
    }

    pub fn processor(mut self, processor: StaticAssetVerifier) -> Self {
        self.processor = processor;
        self
    }

    pub fn handlers(mut self, handlers: HandlerRegistry) -> Self {
        self.handlers = Some(handlers);
        self
    }

    /// Build the engine. The verifier account starts at number 3, sequence 10.
    pub async fn build(self) -> anyhow::Result<Engine> {
        let source = Arc::new(InMemoryBlockSource::new());
        let chain = Arc::new(InMemoryChainClient::new());
        chain.set_account(VERIFIER, 3, 10);
        let processor = Arc::new(self.processor);
        let recorder = Arc::new(Recorder::default());

        let config = VerifierConfig {
            restart: self.restart,
            ..VerifierConfig::for_contract(CONTRACT)
        };
        let mut builder = VerifierService::builder(config)
            .block_source(source.clone())
            .chain_client(chain.clone())
            .signer(Arc::new(Secp256k1Signer::from_hex(VERIFIER_KEY, VERIFIER)?))
            .asset_verifier(processor.clone())
            .diagnostic_handler(recorder.clone());
        if let Some(handlers) = self.handlers {
            builder = builder.handlers(handlers);
        }

        Ok(Engine {
            service: builder.build().await?,
            source,
            chain,
            processor,
            recorder,
        })
    }
}

/// Yield to spawned tasks until `condition` holds, failing after five seconds.
pub async fn wait_until(mut condition: impl FnMut() -> bool) {
    let result = tokio::time::timeout(Duration::from_secs(5), async {
        while !condition() {
            tokio::task::yield_now().await;
        }
    })
    .await;
    assert!(result.is_ok(), "condition not reached in time");
}
