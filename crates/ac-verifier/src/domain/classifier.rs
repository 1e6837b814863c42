//! # Event Classifier
//!
//! Turns a raw transaction event into a typed view over the contract's
//! attribute namespace.
//!
//! The block stream delivers attributes base64-encoded, while transaction
//! queries used for manual replay return them as plain text. The encoding is
//! detected per event: an event is plain if any key matches a
//! contract key verbatim, otherwise every key and value is base64-decoded and
//! attributes that fail to decode are dropped.
//!
//! Classification is pure. The same raw event always yields the same result.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use shared_types::{BlockHeight, EventAttribute, TxEvent};
use std::collections::BTreeMap;
use std::fmt;

use super::contract::{ContractEventKind, ContractKey, OnboardingStatus, WASM_EVENT_TYPE};

/// How the attributes of a raw event were encoded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttributeEncoding {
    /// Keys and values were base64 strings.
    Base64,
    /// Keys and values were plain text.
    Plain,
}

/// A wasm event that carries at least one contract attribute.
///
/// Accessors return `None` for absent, blank or unparseable values; they
/// never fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassifiedEvent {
    block_height: BlockHeight,
    tx_hash: String,
    encoding: AttributeEncoding,
    attributes: BTreeMap<String, String>,
}

impl ClassifiedEvent {
    /// Classify a raw event.
    ///
    /// Returns `None` if the event is not a wasm event or carries no
    /// attribute from the contract namespace.
    pub fn classify(raw: &TxEvent) -> Option<Self> {
        if raw.event_type != WASM_EVENT_TYPE {
            return None;
        }

        let encoding = detect_encoding(&raw.attributes);
        let mut attributes = BTreeMap::new();
        for attribute in &raw.attributes {
            if let Some((key, value)) = normalize(attribute, encoding) {
                // First occurrence of a duplicated key wins.
                attributes.entry(key).or_insert(value);
            }
        }

        if !attributes
            .keys()
            .any(|key| ContractKey::from_key(key).is_some())
        {
            return None;
        }

        Some(Self {
            block_height: raw.block_height,
            tx_hash: raw.tx_hash.clone(),
            encoding,
            attributes,
        })
    }

    /// Height of the block the event was emitted in.
    pub fn block_height(&self) -> BlockHeight {
        self.block_height
    }

    /// Hash of the transaction that emitted the event.
    pub fn tx_hash(&self) -> &str {
        &self.tx_hash
    }

    pub fn encoding(&self) -> AttributeEncoding {
        self.encoding
    }

    /// All decoded attributes, including those outside the contract namespace.
    pub fn attributes(&self) -> &BTreeMap<String, String> {
        &self.attributes
    }

    /// Value of a contract attribute, if present and non-blank.
    pub fn attribute(&self, key: ContractKey) -> Option<&str> {
        self.attributes
            .get(key.as_str())
            .map(String::as_str)
            .filter(|value| !value.trim().is_empty())
    }

    pub fn contract_address(&self) -> Option<&str> {
        self.attribute(ContractKey::ContractAddress)
    }

    /// Raw `asset_event_type` value, whether or not it is a known kind.
    pub fn raw_event_type(&self) -> Option<&str> {
        self.attribute(ContractKey::EventType)
    }

    /// Parsed event kind. `None` when absent or unrecognised.
    pub fn event_kind(&self) -> Option<ContractEventKind> {
        self.raw_event_type().and_then(|value| value.parse().ok())
    }

    pub fn asset_type(&self) -> Option<&str> {
        self.attribute(ContractKey::AssetType)
    }

    pub fn scope_address(&self) -> Option<&str> {
        self.attribute(ContractKey::ScopeAddress)
    }

    pub fn verifier_address(&self) -> Option<&str> {
        self.attribute(ContractKey::VerifierAddress)
    }

    pub fn scope_owner_address(&self) -> Option<&str> {
        self.attribute(ContractKey::ScopeOwnerAddress)
    }

    /// Onboarding status carried in `asset_new_value`, if it parses as one.
    pub fn new_onboarding_status(&self) -> Option<OnboardingStatus> {
        self.attribute(ContractKey::NewValue)
            .and_then(|value| value.parse().ok())
    }

    /// Free-form message carried in `asset_additional_metadata`.
    pub fn message(&self) -> Option<&str> {
        self.attribute(ContractKey::AdditionalMetadata)
    }
}

impl fmt::Display for ClassifiedEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} [tx {} @ {}]",
            self.raw_event_type().unwrap_or("<no event type>"),
            self.tx_hash,
            self.block_height
        )
    }
}

fn detect_encoding(attributes: &[EventAttribute]) -> AttributeEncoding {
    if attributes
        .iter()
        .any(|attribute| ContractKey::from_key(&attribute.key).is_some())
    {
        AttributeEncoding::Plain
    } else {
        AttributeEncoding::Base64
    }
}

fn normalize(attribute: &EventAttribute, encoding: AttributeEncoding) -> Option<(String, String)> {
    match encoding {
        AttributeEncoding::Plain => Some((attribute.key.clone(), attribute.value.clone())),
        AttributeEncoding::Base64 => Some((decode(&attribute.key)?, decode(&attribute.value)?)),
    }
}

fn decode(encoded: &str) -> Option<String> {
    let bytes = STANDARD.decode(encoded).ok()?;
    String::from_utf8(bytes).ok()
}
