//! # Contract Vocabulary
//!
//! The attribute namespace, event kinds and onboarding statuses of the asset
//! classification smart contract, plus the scope attribute it stores per
//! onboarded asset.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Event type of every event emitted by a wasm contract execution.
pub const WASM_EVENT_TYPE: &str = "wasm";

/// Attribute keys the contract writes onto its wasm events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContractKey {
    ContractAddress,
    EventType,
    AssetType,
    ScopeAddress,
    VerifierAddress,
    ScopeOwnerAddress,
    NewValue,
    AdditionalMetadata,
}

impl ContractKey {
    /// Every key in the namespace.
    pub const ALL: [ContractKey; 8] = [
        ContractKey::ContractAddress,
        ContractKey::EventType,
        ContractKey::AssetType,
        ContractKey::ScopeAddress,
        ContractKey::VerifierAddress,
        ContractKey::ScopeOwnerAddress,
        ContractKey::NewValue,
        ContractKey::AdditionalMetadata,
    ];

    /// Attribute key as it appears on chain.
    pub const fn as_str(self) -> &'static str {
        match self {
            ContractKey::ContractAddress => "_contract_address",
            ContractKey::EventType => "asset_event_type",
            ContractKey::AssetType => "asset_type",
            ContractKey::ScopeAddress => "asset_scope_address",
            ContractKey::VerifierAddress => "asset_verifier_address",
            ContractKey::ScopeOwnerAddress => "asset_scope_owner_address",
            ContractKey::NewValue => "asset_new_value",
            ContractKey::AdditionalMetadata => "asset_additional_metadata",
        }
    }

    /// Look up a key by its on-chain spelling.
    pub fn from_key(key: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|k| k.as_str() == key)
    }
}

impl fmt::Display for ContractKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unrecognised contract event name.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown contract event type: {0}")]
pub struct UnknownEventKind(pub String);

/// The closed set of events the contract emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ContractEventKind {
    OnboardAsset,
    VerifyAsset,
    AddAssetDefinition,
    UpdateAssetDefinition,
    DeleteAssetDefinition,
    ToggleAssetDefinition,
    AddAssetVerifier,
    UpdateAssetVerifier,
    UpdateAccessRoutes,
    BindContractAlias,
    InstantiateContract,
    MigrateContract,
}

impl ContractEventKind {
    /// Every event kind.
    pub const ALL: [ContractEventKind; 12] = [
        ContractEventKind::OnboardAsset,
        ContractEventKind::VerifyAsset,
        ContractEventKind::AddAssetDefinition,
        ContractEventKind::UpdateAssetDefinition,
        ContractEventKind::DeleteAssetDefinition,
        ContractEventKind::ToggleAssetDefinition,
        ContractEventKind::AddAssetVerifier,
        ContractEventKind::UpdateAssetVerifier,
        ContractEventKind::UpdateAccessRoutes,
        ContractEventKind::BindContractAlias,
        ContractEventKind::InstantiateContract,
        ContractEventKind::MigrateContract,
    ];

    /// Name written into the `asset_event_type` attribute.
    pub const fn contract_name(self) -> &'static str {
        match self {
            ContractEventKind::OnboardAsset => "onboard_asset",
            ContractEventKind::VerifyAsset => "verify_asset",
            ContractEventKind::AddAssetDefinition => "add_asset_definition",
            ContractEventKind::UpdateAssetDefinition => "update_asset_definition",
            ContractEventKind::DeleteAssetDefinition => "delete_asset_definition",
            ContractEventKind::ToggleAssetDefinition => "toggle_asset_definition",
            ContractEventKind::AddAssetVerifier => "add_asset_verifier",
            ContractEventKind::UpdateAssetVerifier => "update_asset_verifier",
            ContractEventKind::UpdateAccessRoutes => "update_access_routes",
            ContractEventKind::BindContractAlias => "bind_contract_alias",
            ContractEventKind::InstantiateContract => "instantiate_contract",
            ContractEventKind::MigrateContract => "migrate_contract",
        }
    }
}

impl FromStr for ContractEventKind {
    type Err = UnknownEventKind;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.contract_name() == s)
            .ok_or_else(|| UnknownEventKind(s.to_string()))
    }
}

impl fmt::Display for ContractEventKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.contract_name())
    }
}

/// Unrecognised onboarding status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("Unknown onboarding status: {0}")]
pub struct UnknownOnboardingStatus(pub String);

/// Onboarding status of a scope attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OnboardingStatus {
    /// Awaiting a verifier decision.
    Pending,
    /// Verifier rejected the asset.
    Denied,
    /// Verifier accepted the asset.
    Approved,
}

impl OnboardingStatus {
    /// Status as written by the contract.
    pub const fn as_str(self) -> &'static str {
        match self {
            OnboardingStatus::Pending => "pending",
            OnboardingStatus::Denied => "denied",
            OnboardingStatus::Approved => "approved",
        }
    }
}

impl FromStr for OnboardingStatus {
    type Err = UnknownOnboardingStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(OnboardingStatus::Pending),
            "denied" => Ok(OnboardingStatus::Denied),
            "approved" => Ok(OnboardingStatus::Approved),
            other => Err(UnknownOnboardingStatus(other.to_string())),
        }
    }
}

impl fmt::Display for OnboardingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A location where the verified asset can be retrieved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AccessRoute {
    /// Route, usually a URI.
    pub route: String,
    /// Optional human-readable name for the route.
    pub name: Option<String>,
}

impl AccessRoute {
    /// An unnamed route.
    pub fn new(route: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            name: None,
        }
    }

    /// A named route.
    pub fn named(route: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            route: route.into(),
            name: Some(name.into()),
        }
    }
}

/// Per-scope record the contract keeps for an onboarded asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetScopeAttribute {
    /// Asset identifier.
    pub asset_uuid: String,
    /// Scope holding the asset.
    pub scope_address: String,
    /// Asset type the scope was onboarded as.
    pub asset_type: String,
    /// Account that requested onboarding.
    pub requestor_address: String,
    /// Verifier chosen by the requestor.
    pub verifier_address: String,
    /// Current onboarding status.
    pub onboarding_status: OnboardingStatus,
    /// Message from the latest verification, if any.
    pub latest_verification_message: Option<String>,
}
