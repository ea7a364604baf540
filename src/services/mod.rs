use sqlx::PgPool;

pub mod books;
pub mod comments;
pub mod dashboard;
pub mod feed;
pub mod history;
pub mod notifications;
pub mod reviews;
pub mod social;
pub mod users;

/// Best-effort username lookup for notification messages.
///
/// Notification text must never fail the triggering action, so lookup
/// failures fall back to a generic sender name.
pub(crate) async fn display_name(pool: &PgPool, user_id: i64) -> String {
    let username = sqlx::query_scalar::<_, String>(r#"SELECT username FROM users WHERE id = $1"#)
        .bind(user_id)
        .fetch_optional(pool)
        .await;

    match username {
        Ok(Some(name)) => name,
        Ok(None) => "Someone".to_string(),
        Err(e) => {
            tracing::warn!(user_id, error = %e, "Username lookup failed");
            "Someone".to_string()
        }
    }
}
