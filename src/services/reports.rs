use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

use crate::database::models::*;
use crate::database::DatabaseManager;
use crate::services::messages::leaderboard_lines;
use crate::services::motivation::random_quote;
use crate::services::notifier::Notifier;
use crate::utils::datetime::{format_local, local_day_bounds};
use crate::utils::logging::log_dispatch;
use crate::utils::markdown::{bold, escape_markdown};

pub const LEADERBOARD_SIZE: i64 = 10;

/// Daily summary of a camp as seen from the group's timezone.
pub async fn camp_report(
    db: &DatabaseManager,
    camp: &Camp,
    now: DateTime<Utc>,
    tz: Tz,
) -> Result<String, sqlx::Error> {
    let pool = &db.pool;
    let today = now.with_timezone(&tz).date_naive();

    let participants = CampParticipant::count_active(pool, camp.id).await?;
    let top = CampParticipant::leaderboard(pool, camp.id, LEADERBOARD_SIZE).await?;

    let sent_today = match local_day_bounds(today, tz) {
        Some((start, end)) => CampTask::count_sent_between(pool, camp.id, start, end).await?,
        None => 0,
    };
    let tomorrow = match today.succ_opt().and_then(|day| local_day_bounds(day, tz)) {
        Some((start, end)) => CampTask::find_scheduled_between(pool, camp.id, start, end).await?,
        None => Vec::new(),
    };

    let mut text = format!(
        "📊 {}\n\n{}\n{}\n{}\n",
        bold(&format!("Daily report: {}", camp.name)),
        escape_markdown(&format!(
            "📈 Progress: {}% ({} days left)",
            camp.progress_percent(now),
            camp.remaining_days(now)
        )),
        escape_markdown(&format!("👥 Participants: {participants}")),
        escape_markdown(&format!("📌 Tasks today: {sent_today}")),
    );

    text.push_str(&format!("\n🏆 {}\n{}\n", bold("Leaderboard"), leaderboard_lines(&top)));

    if !tomorrow.is_empty() {
        text.push_str(&format!("\n📅 {}\n", bold("Tomorrow")));
        for task in &tomorrow {
            let when = task
                .scheduled_time()
                .map(|at| format_local(&at, tz))
                .unwrap_or_default();
            text.push_str(&format!(
                "{}\n",
                escape_markdown(&format!("• {} {} (+{} pts)", when, task.title, task.points))
            ));
        }
    }

    text.push_str(&format!("\n{}", escape_markdown(random_quote())));
    Ok(text)
}

/// Sends the daily report of every running camp whose group just reached `report_hour`.
///
/// Each camp gets at most one report per local date.
pub async fn send_due_camp_reports(
    db: &Arc<DatabaseManager>,
    notifier: &Arc<dyn Notifier>,
    default_tz: Tz,
    report_hour: u32,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let mut sent = 0;

    for camp in Camp::find_running(&db.pool, now).await? {
        let Some(group) = Group::find_by_id(&db.pool, camp.group_id).await? else {
            continue;
        };
        let tz = group.tz(default_tz);
        let local = now.with_timezone(&tz);
        if local.hour() != report_hour {
            continue;
        }
        if !CampReport::claim(&db.pool, camp.id, local.date_naive(), now).await? {
            continue;
        }

        let text = camp_report(db, &camp, now, tz).await?;
        match notifier.send_text(group.telegram_chat_id, text).await {
            Ok(_) => {
                log_dispatch("camp_report", group.telegram_chat_id, &camp.name, Ok(()));
                sent += 1;
            }
            Err(e) => log_dispatch("camp_report", group.telegram_chat_id, &camp.name, Err(e.to_string().as_str())),
        }
    }

    if sent > 0 {
        SystemStat::increment(&db.pool, STAT_MESSAGES_SENT, sent as i64, now).await?;
    }
    Ok(sent)
}

/// The `/ranking` text for a group.
pub async fn group_leaderboard(db: &DatabaseManager, group: &Group) -> Result<String, sqlx::Error> {
    let entries = GroupParticipant::leaderboard(&db.pool, group.id, LEADERBOARD_SIZE).await?;
    let title = group.title.as_deref().unwrap_or("this group");
    Ok(format!(
        "🏆 {}\n\n{}",
        bold(&format!("Top students in {title}")),
        leaderboard_lines(&entries)
    ))
}
