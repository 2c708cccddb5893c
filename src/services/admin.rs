use chrono::{DateTime, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::database::models::{SystemStat, User, UserUsage, STAT_MESSAGES_SENT};
use crate::database::DatabaseManager;
use crate::services::notifier::Notifier;
use crate::utils::logging::{log_dispatch, log_system_event};
use crate::utils::markdown::{bold, escape_markdown};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub failed: usize,
    pub deactivated: usize,
}

pub fn broadcast_message(text: &str) -> String {
    format!("📢 {}\n\n{}", bold("Message from the admins:"), escape_markdown(text.trim()))
}

/// Sends `text` privately to every active user.
///
/// Users who blocked the bot are marked inactive and skipped from then on.
pub async fn broadcast(
    db: &Arc<DatabaseManager>,
    notifier: &Arc<dyn Notifier>,
    text: &str,
    now: DateTime<Utc>,
) -> Result<BroadcastReport, sqlx::Error> {
    let pool = &db.pool;
    let message = broadcast_message(text);
    let mut report = BroadcastReport::default();

    for user in User::find_active(pool).await? {
        match notifier.send_text(user.telegram_id, message.clone()).await {
            Ok(_) => {
                log_dispatch("broadcast", user.telegram_id, "admin message", Ok(()));
                report.sent += 1;
            }
            Err(e) => {
                log_dispatch("broadcast", user.telegram_id, "admin message", Err(e.to_string().as_str()));
                report.failed += 1;
                if e.user_unreachable() && User::deactivate(pool, user.id).await? {
                    report.deactivated += 1;
                }
            }
        }
    }

    if report.sent > 0 {
        SystemStat::increment(pool, STAT_MESSAGES_SENT, report.sent as i64, now).await?;
    }
    log_system_event("Broadcast finished", Some(&format!("{report:?}")));
    Ok(report)
}

pub fn broadcast_summary(report: &BroadcastReport) -> String {
    format!(
        "Broadcast delivered to {} users. Failed for {} ({} blocked the bot and were deactivated).",
        report.sent, report.failed, report.deactivated
    )
}

/// Text of the admin `/stats` command.
pub fn usage_report(usage: &UserUsage, now: DateTime<Utc>, tz: Tz) -> String {
    format!(
        "📊 {}\n\n{}\n{}\n\n{}\n{}\n\n{}",
        bold("Bot statistics"),
        bold("Users"),
        escape_markdown(&format!("• Total: {}\n• Active: {}", usage.total, usage.active)),
        bold("Private schedules"),
        escape_markdown(&format!(
            "• Morning: {}\n• Evening: {}\n• Custom: {}",
            usage.morning, usage.evening, usage.custom
        )),
        escape_markdown(&format!("As of {}", now.with_timezone(&tz).format("%Y-%m-%d %H:%M"))),
    )
}

pub async fn collect_usage_report(db: &DatabaseManager, now: DateTime<Utc>, tz: Tz) -> Result<String, sqlx::Error> {
    let usage = User::usage_counts(&db.pool).await?;
    Ok(usage_report(&usage, now, tz))
}
