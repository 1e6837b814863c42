//! Default `verify_asset` handler.
//!
//! Confirms that a verification this verifier submitted was recorded by the
//! contract.

use crate::domain::{ContractEventKind, ContractKey, OnboardingStatus};
use crate::events::DiagnosticEvent;

use super::HandlerParams;

const KIND: ContractEventKind = ContractEventKind::VerifyAsset;

pub async fn handle_verify_asset(params: HandlerParams) -> anyhow::Result<()> {
    if !params.is_addressed_to_verifier(KIND) {
        return Ok(());
    }

    let event = &params.event;
    let Some(scope_address) = event.scope_address() else {
        params.emit(DiagnosticEvent::EventIgnoredMissingAttribute {
            event: event.clone(),
            kind: KIND,
            key: ContractKey::ScopeAddress,
        });
        return Ok(());
    };

    let attribute = match params
        .chain
        .query_scope_attribute(&params.contract_address, scope_address)
        .await
    {
        Ok(attribute) => attribute,
        Err(e) => {
            params.emit(DiagnosticEvent::VerifyEventFailedToFetchScopeAttribute {
                event: event.clone(),
                error: e.to_string(),
            });
            return Ok(());
        }
    };

    let reported = event.new_onboarding_status();
    let diagnostic = match attribute.onboarding_status {
        OnboardingStatus::Pending => DiagnosticEvent::VerifyEventStillPending {
            event: event.clone(),
        },
        actual if reported.map_or(true, |status| status == actual) => {
            DiagnosticEvent::VerifyEventSuccessful {
                event: event.clone(),
                status: actual,
            }
        }
        actual => DiagnosticEvent::VerifyEventUnexpectedStatus {
            event: event.clone(),
            reported,
            actual,
        },
    };
    params.emit(diagnostic);
    Ok(())
}
