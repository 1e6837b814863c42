//! Verification decisions and the queued work item built from them.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::classifier::ClassifiedEvent;
use super::contract::{AccessRoute, AssetScopeAttribute};

/// Outcome produced by the asset verifier for one onboarded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationDecision {
    /// Whether the asset passed verification.
    pub success: bool,
    /// Message recorded on chain with the decision.
    pub message: Option<String>,
    /// Locations where the verified asset may be retrieved.
    pub access_routes: Vec<AccessRoute>,
}

impl VerificationDecision {
    pub fn approve(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: Some(message.into()),
            access_routes: Vec::new(),
        }
    }

    pub fn deny(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: Some(message.into()),
            access_routes: Vec::new(),
        }
    }

    /// Attach access routes to the decision.
    pub fn with_access_routes(mut self, routes: impl IntoIterator<Item = AccessRoute>) -> Self {
        self.access_routes.extend(routes);
        self
    }
}

/// A verification waiting to be submitted on chain.
///
/// The `id` correlates the enqueue with the eventual submission diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundVerification {
    pub id: Uuid,
    /// The onboard event that triggered verification.
    pub event: ClassifiedEvent,
    /// Scope attribute as read from the contract before verifying.
    pub scope_attribute: AssetScopeAttribute,
    pub decision: VerificationDecision,
    /// Prepended to log lines about this item.
    pub message_prefix: String,
}

impl OutboundVerification {
    pub fn new(
        event: ClassifiedEvent,
        scope_attribute: AssetScopeAttribute,
        decision: VerificationDecision,
    ) -> Self {
        let message_prefix = format!(
            "[VERIFY ASSET | Tx: {} | Scope: {}]",
            event.tx_hash(),
            scope_attribute.scope_address
        );
        Self {
            id: Uuid::new_v4(),
            event,
            scope_attribute,
            decision,
            message_prefix,
        }
    }
}

/// Identifies the asset being verified in an execute message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetIdentifier {
    AssetUuid(String),
    ScopeAddress(String),
}

/// Execute messages this engine sends to the contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecuteMsg {
    VerifyAsset {
        identifier: AssetIdentifier,
        asset_type: String,
        success: bool,
        message: Option<String>,
        access_routes: Vec<AccessRoute>,
    },
}

impl ExecuteMsg {
    /// The `verify_asset` message for a queued verification.
    pub fn verify_asset(verification: &OutboundVerification) -> Self {
        ExecuteMsg::VerifyAsset {
            identifier: AssetIdentifier::ScopeAddress(
                verification.scope_attribute.scope_address.clone(),
            ),
            asset_type: verification.scope_attribute.asset_type.clone(),
            success: verification.decision.success,
            message: verification.decision.message.clone(),
            access_routes: verification.decision.access_routes.clone(),
        }
    }
}
