use serde::Deserialize;
use serde_json::json;
use uuid::Uuid;

use crate::auth::extractor::AuthUser;
use crate::db;
use crate::error::AppError;
use crate::middleware::audit;
use crate::models::{Submission, SubmissionStatus};
use crate::state::SharedState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReviewDecision {
    Approve,
    Reject,
}

impl ReviewDecision {
    pub fn status(self) -> SubmissionStatus {
        match self {
            ReviewDecision::Approve => SubmissionStatus::Approved,
            ReviewDecision::Reject => SubmissionStatus::Rejected,
        }
    }
}

pub struct ReviewOutcome {
    pub submission: Submission,
    /// New tax amount, present only when the decision granted a discount.
    pub tax_amount: Option<f64>,
}

/// Apply a review decision. The status flip and the ledger discount commit
/// in one transaction; racing reviewers contend on the pending-status guard,
/// so exactly one wins and the rest see a conflict.
pub async fn transition_submission(
    state: &SharedState,
    reviewer: &AuthUser,
    submission_id: Uuid,
    decision: ReviewDecision,
) -> Result<ReviewOutcome, AppError> {
    reviewer.require_admin()?;

    let mut tx = state.pool.begin().await?;

    let updated = db::submissions::transition(
        &mut *tx,
        submission_id,
        decision.status(),
        reviewer.account_id,
    )
    .await?;

    let Some(submission) = updated else {
        drop(tx);
        let existing = db::submissions::find_by_id(&state.pool, submission_id)
            .await?
            .ok_or_else(|| AppError::NotFound("Submission not found".to_string()))?;
        return Err(AppError::Conflict(format!(
            "Submission already {}",
            existing.status
        )));
    };

    let tax_amount = match decision {
        ReviewDecision::Approve => {
            let amount = db::facilities::apply_discount(
                &mut *tx,
                submission.facility_id,
                state.config.discount_rate,
            )
            .await?
            .ok_or_else(|| {
                AppError::Internal(format!(
                    "Facility {} missing during discount application",
                    submission.facility_id
                ))
            })?;
            Some(amount)
        }
        ReviewDecision::Reject => None,
    };

    tx.commit().await?;

    let action = match decision {
        ReviewDecision::Approve => "submission.approved",
        ReviewDecision::Reject => "submission.rejected",
    };
    audit::log_event(
        &state.pool,
        Some(reviewer.account_id),
        action,
        "submission",
        Some(submission.id),
        Some(json!({
            "facility_id": submission.facility_id,
            "tax_amount": tax_amount,
        })),
    )
    .await;

    Ok(ReviewOutcome {
        submission,
        tax_amount,
    })
}
