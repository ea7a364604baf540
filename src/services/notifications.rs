use std::sync::Arc;

use serde_json::json;
use sqlx::PgPool;

use crate::{
    error::AppResult,
    models::{NotificationKind, NotificationView, TargetType},
    push::PushRegistry,
};

/// Notifications per page when listing
const PAGE_SIZE: i64 = 25;

/// Records social-action notifications and hands them to the push channel.
///
/// Both halves are best-effort: a failed insert is logged and swallowed, and
/// push delivery is fire-and-forget. Notification fan-out must never fail
/// the business action that triggered it.
pub struct NotificationDispatcher {
    pool: PgPool,
    push: Arc<PushRegistry>,
}

impl NotificationDispatcher {
    pub fn new(pool: PgPool, push: Arc<PushRegistry>) -> Self {
        Self { pool, push }
    }

    /// Persists one notification and attempts real-time delivery.
    ///
    /// Self-directed notifications (receiver == sender) are valid: they give
    /// the actor an activity-log entry, e.g. "You are now following X".
    pub async fn notify(
        &self,
        sender_id: i64,
        receiver_id: i64,
        kind: NotificationKind,
        message: &str,
        target: Option<(TargetType, i64)>,
    ) {
        let (target_type, target_id) = match target {
            Some((target_type, target_id)) => (Some(target_type), Some(target_id)),
            None => (None, None),
        };

        let persisted = sqlx::query(
            r#"
            INSERT INTO notifications (sender_id, receiver_id, kind, message, target_type, target_id)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(sender_id)
        .bind(receiver_id)
        .bind(kind)
        .bind(message)
        .bind(target_type)
        .bind(target_id)
        .execute(&self.pool)
        .await;

        if let Err(e) = persisted {
            tracing::error!(
                sender_id,
                receiver_id,
                kind = %kind,
                error = %e,
                "Failed to persist notification"
            );
        }

        self.push.send(
            receiver_id,
            "notification",
            json!({
                "sender_id": sender_id,
                "type": kind.to_string(),
                "message": message,
            }),
        );
    }

    /// Lists a user's notifications, newest first
    pub async fn list(&self, user_id: i64, offset: i64) -> AppResult<Vec<NotificationView>> {
        let notifications = sqlx::query_as::<_, NotificationView>(
            r#"
            SELECT n.id, n.sender_id, n.receiver_id, n.kind, n.message,
                   n.target_type, n.target_id, n.is_read, n.created_at,
                   u.username AS sender_username,
                   u.profile_img AS sender_profile_img
            FROM notifications n
            JOIN users u ON n.sender_id = u.id
            WHERE n.receiver_id = $1
            ORDER BY n.created_at DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(user_id)
        .bind(PAGE_SIZE)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(notifications)
    }

    /// Marks one notification as read, scoped to its receiver.
    ///
    /// Read state only ever moves false → true; re-marking is a no-op.
    pub async fn mark_read(&self, user_id: i64, notification_id: i64) -> AppResult<()> {
        sqlx::query(
            r#"
            UPDATE notifications
            SET is_read = TRUE
            WHERE id = $1 AND receiver_id = $2
            "#,
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
