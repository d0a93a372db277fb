//! Compensable dispatch: pre-action, forward, compensate on failure.
//!
//! # Data Flow
//! ```text
//! Idle
//!   → (plan present, value changed) write new value → PreActionApplied
//!       → write failed → Aborted (PreActionFailed, nothing forwarded)
//!   → forward
//!       → success → Forwarded { success: true }, compensation dropped
//!       → failure → Compensating → Compensated { restored }
//! ```
//!
//! # Design Decisions
//! - The identity system and the downstream service share no transaction;
//!   compensation restores the identity system on a best-effort basis
//! - Compensation runs before the response is written, at most once, never retried
//! - The caller always sees the forward outcome, never the compensation's

use axum::http::StatusCode;
use bytes::Bytes;

use crate::config::PreActionConfig;
use crate::identity::{AccountUpdate, IdentityError, IdentityStore};
use crate::observability::metrics;
use crate::proxy::forwarder::{Forward, OutboundRequest};
use crate::proxy::outcome::{FailureKind, RerouteOutcome};
use crate::routing::matcher::Params;
use crate::security::Principal;

/// Where a dispatch ended up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SagaStage {
    Idle,
    PreActionApplied,
    Aborted,
    Forwarded { success: bool },
    Compensating,
    Compensated { restored: bool },
}

/// The value a pre-action wants to write.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Email(String),
    Locked(bool),
}

/// A pre-action bound to one account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreActionPlan {
    pub subject: String,
    pub change: Change,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    #[error("No user UID found")]
    MissingPrincipal,
    #[error("Missing path parameter `{0}`")]
    MissingParam(String),
}

impl From<PlanError> for RerouteOutcome {
    fn from(err: PlanError) -> Self {
        RerouteOutcome::local(FailureKind::InvalidRequest, StatusCode::BAD_REQUEST, err)
    }
}

impl PreActionPlan {
    /// Plan a route's pre-action. `Ok(None)` when the body carries no new value.
    pub fn from_route(
        action: &PreActionConfig,
        principal: Option<&Principal>,
        params: &Params,
        body: &Bytes,
    ) -> Result<Option<Self>, PlanError> {
        let json: Option<serde_json::Value> = serde_json::from_slice(body).ok();
        let field = |name: &str| json.as_ref().and_then(|v| v.get(name)).cloned();

        match action {
            PreActionConfig::SyncEmail => {
                let subject = principal
                    .map(|p| p.id.clone())
                    .filter(|id| !id.is_empty())
                    .ok_or(PlanError::MissingPrincipal)?;
                let email = field("email")
                    .and_then(|v| v.as_str().map(str::to_string))
                    .filter(|email| !email.is_empty());
                Ok(email.map(|email| PreActionPlan {
                    subject,
                    change: Change::Email(email),
                }))
            }
            PreActionConfig::SetAccountLock { param } => {
                let subject = params
                    .get(param)
                    .ok_or_else(|| PlanError::MissingParam(param.clone()))?
                    .to_string();
                let locked = field("locked").and_then(|v| v.as_bool());
                Ok(locked.map(|locked| PreActionPlan {
                    subject,
                    change: Change::Locked(locked),
                }))
            }
        }
    }

    fn label(&self) -> &'static str {
        match self.change {
            Change::Email(_) => "email",
            Change::Locked(_) => "lock_status",
        }
    }

    fn failure_message(&self) -> &'static str {
        match self.change {
            Change::Email(_) => "Failed to update email in identity provider",
            Change::Locked(_) => "Failed to update user lock status",
        }
    }
}

/// Restores the value a pre-action overwrote. Consumed on use.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Compensation {
    subject: String,
    restore: AccountUpdate,
    label: &'static str,
}

impl Compensation {
    /// Best-effort restore; returns whether it succeeded.
    pub async fn run(self, identity: &dyn IdentityStore) -> bool {
        match identity.update_account(&self.subject, self.restore).await {
            Ok(()) => {
                tracing::warn!(subject = %self.subject, field = self.label, "Rolled back identity change");
                metrics::record_compensation(self.label, true);
                true
            }
            Err(e) => {
                tracing::error!(subject = %self.subject, field = self.label, error = %e, "Failed to roll back identity change");
                metrics::record_compensation(self.label, false);
                false
            }
        }
    }
}

/// Result of one dispatch.
#[derive(Debug)]
pub struct Dispatched {
    pub outcome: RerouteOutcome,
    pub stage: SagaStage,
}

/// Wraps a forwarder with an optional identity pre-action and its rollback.
pub struct CompensableDispatcher<'a> {
    identity: &'a dyn IdentityStore,
    forwarder: &'a dyn Forward,
}

impl<'a> CompensableDispatcher<'a> {
    pub fn new(identity: &'a dyn IdentityStore, forwarder: &'a dyn Forward) -> Self {
        Self {
            identity,
            forwarder,
        }
    }

    pub async fn dispatch(
        &self,
        plan: Option<PreActionPlan>,
        compensate: bool,
        request: OutboundRequest,
    ) -> Dispatched {
        let compensation = match plan {
            None => None,
            Some(plan) => match self.apply(&plan).await {
                Ok(compensation) => {
                    if compensation.is_some() {
                        tracing::debug!(subject = %plan.subject, stage = ?SagaStage::PreActionApplied, "Pre-action applied");
                    }
                    compensation
                }
                Err(e) => {
                    tracing::error!(subject = %plan.subject, field = plan.label(), error = %e, "Pre-action failed");
                    metrics::record_pre_action_failure(plan.label());
                    return Dispatched {
                        outcome: RerouteOutcome::local(
                            FailureKind::PreActionFailed,
                            StatusCode::INTERNAL_SERVER_ERROR,
                            plan.failure_message(),
                        ),
                        stage: SagaStage::Aborted,
                    };
                }
            },
        };

        let outcome = self.forwarder.forward(request).await;
        let forwarded = SagaStage::Forwarded {
            success: outcome.is_success(),
        };

        if outcome.is_success() {
            return Dispatched {
                outcome,
                stage: forwarded,
            };
        }

        let stage = match compensation {
            Some(compensation) if compensate => {
                tracing::debug!(stage = ?SagaStage::Compensating, kind = ?outcome.kind(), "Forward failed, compensating");
                let restored = compensation.run(self.identity).await;
                SagaStage::Compensated { restored }
            }
            Some(_) => {
                tracing::debug!(kind = ?outcome.kind(), "Forward failed, route keeps its pre-action");
                forwarded
            }
            None => forwarded,
        };

        Dispatched { outcome, stage }
    }

    /// Read current value, write the new one, return how to undo it.
    async fn apply(&self, plan: &PreActionPlan) -> Result<Option<Compensation>, IdentityError> {
        let account = self
            .identity
            .get_account(&plan.subject)
            .await?
            .ok_or_else(|| IdentityError::NotFound(plan.subject.clone()))?;

        let (update, restore) = match &plan.change {
            Change::Email(email) => {
                if account.email.as_deref() == Some(email.as_str()) {
                    tracing::info!(subject = %plan.subject, "Email unchanged, no identity update needed");
                    return Ok(None);
                }
                (
                    AccountUpdate::email(email.clone()),
                    account.email.map(AccountUpdate::email),
                )
            }
            Change::Locked(locked) => {
                if account.disabled == *locked {
                    return Ok(None);
                }
                (
                    AccountUpdate::disabled(*locked),
                    Some(AccountUpdate::disabled(account.disabled)),
                )
            }
        };

        self.identity.update_account(&plan.subject, update).await?;
        tracing::info!(subject = %plan.subject, field = plan.label(), "Updated identity system");

        Ok(restore.map(|restore| Compensation {
            subject: plan.subject.clone(),
            restore,
            label: plan.label(),
        }))
    }
}
