//! Audit write-through for access decisions.

use chrono::Utc;
use entity::audit_log;
use platform_access::AccessDecision;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::json;
use tracing::warn;
use uuid::Uuid;

use platform_db::DbPool;

/// Persist one decision record. Best-effort: a failed audit write is logged
/// and swallowed so it cannot turn an allowed lookup into a 500.
pub async fn record_decision(
    pool: &DbPool,
    actor_id: Option<Uuid>,
    action: &str,
    subject: &str,
    decision: &AccessDecision,
) {
    let detail = json!({
        "subject": subject,
        "decision": decision,
    });
    let entry = audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        action: Set(action.to_string()),
        actor_id: Set(actor_id),
        detail: Set(detail),
        created_at: Set(Utc::now().into()),
    };
    if let Err(err) = entry.insert(pool).await {
        warn!(%err, action, subject, "audit write failed");
    }
}
