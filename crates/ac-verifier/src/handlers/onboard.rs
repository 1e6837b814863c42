//! Default `onboard_asset` handler.
//!
//! An onboard event asks the named verifier to inspect a scope's asset. The
//! handler fetches the scope attribute, skips scopes that are no longer
//! pending, runs the business verification and queues the decision for
//! submission.

use crate::domain::{ContractEventKind, ContractKey, OnboardingStatus, OutboundVerification};
use crate::events::DiagnosticEvent;

use super::HandlerParams;

const KIND: ContractEventKind = ContractEventKind::OnboardAsset;

pub async fn handle_onboard_asset(params: HandlerParams) -> anyhow::Result<()> {
    if !params.is_addressed_to_verifier(KIND) {
        return Ok(());
    }

    let event = &params.event;
    let Some(scope_address) = event.scope_address() else {
        params.emit(missing(&params, ContractKey::ScopeAddress));
        return Ok(());
    };
    if event.asset_type().is_none() {
        params.emit(missing(&params, ContractKey::AssetType));
        return Ok(());
    }

    let attribute = match params
        .chain
        .query_scope_attribute(&params.contract_address, scope_address)
        .await
    {
        Ok(attribute) => attribute,
        Err(e) => {
            params.emit(DiagnosticEvent::OnboardEventFailedToFetchScopeAttribute {
                event: event.clone(),
                error: e.to_string(),
            });
            return Ok(());
        }
    };

    if attribute.onboarding_status != OnboardingStatus::Pending {
        params.emit(DiagnosticEvent::OnboardEventIgnoredPreviouslyProcessed {
            event: event.clone(),
            status: attribute.onboarding_status,
        });
        return Ok(());
    }

    let asset = match params.processor.retrieve_asset(&attribute).await {
        Ok(asset) => asset,
        Err(e) => {
            params.emit(DiagnosticEvent::OnboardEventFailedToRetrieveAsset {
                event: event.clone(),
                error: format!("{e:#}"),
            });
            return Ok(());
        }
    };

    let decision = match params.processor.verify_asset(&attribute, asset).await {
        Ok(decision) => decision,
        Err(e) => {
            params.emit(DiagnosticEvent::OnboardEventFailedToVerifyAsset {
                event: event.clone(),
                error: format!("{e:#}"),
            });
            return Ok(());
        }
    };

    let verification = OutboundVerification::new(event.clone(), attribute, decision.clone());
    tracing::debug!(id = %verification.id, "{} Queueing verification", verification.message_prefix);
    params.outbound.publish(verification);
    params.emit(DiagnosticEvent::OnboardEventPreVerifySend {
        event: event.clone(),
        decision,
    });
    Ok(())
}

fn missing(params: &HandlerParams, key: ContractKey) -> DiagnosticEvent {
    DiagnosticEvent::EventIgnoredMissingAttribute {
        event: params.event.clone(),
        kind: KIND,
        key,
    }
}
