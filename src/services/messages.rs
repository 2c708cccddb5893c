//! MarkdownV2 text for everything the bot posts on its own.

use chrono::{DateTime, Utc};
use chrono_tz::Tz;

use crate::database::models::{Camp, CampTask, LeaderboardEntry};
use crate::schedule::{ScheduleSlot, ScheduleType};
use crate::utils::datetime::{format_local, format_minutes, format_time};
use crate::utils::markdown::{bold, code, escape_markdown};

pub const JOIN_TASK_BUTTON: &str = "✅ I'm in";
pub const DONE_BUTTON: &str = "✅ Done";
pub const JOIN_CAMP_BUTTON: &str = "🏕 Join camp";

pub fn medal(rank: usize) -> &'static str {
    match rank {
        1 => "🥇",
        2 => "🥈",
        3 => "🥉",
        _ => "🏅",
    }
}

/// Numbered leaderboard lines, or a placeholder when nobody scored yet.
pub fn leaderboard_lines(entries: &[LeaderboardEntry]) -> String {
    if entries.is_empty() {
        return escape_markdown("No points recorded yet. Be the first!");
    }

    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| {
            format!(
                "{} {} {} \\({} pts, {} tasks\\)",
                medal(index + 1),
                escape_markdown(&format!("{}.", index + 1)),
                escape_markdown(&entry.display_name()),
                entry.points,
                entry.completions
            )
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Group post for a schedule slot. The join button sits under it.
pub fn group_task_message(schedule_type: ScheduleType, slot: &ScheduleSlot) -> String {
    format!(
        "{}\n\n⏰ {} {}\n\n{}\n🎯 {}",
        bold(schedule_type.label()),
        escape_markdown(&format_time(slot.time)),
        bold(&slot.title),
        escape_markdown(&format!("Tap the button within {} minutes to join.", slot.deadline_minutes)),
        escape_markdown(&format!("+{} points", slot.points)),
    )
}

/// Private reminder for a slot of the user's own schedule.
pub fn private_reminder_message(schedule_type: ScheduleType, slot: &ScheduleSlot) -> String {
    format!(
        "🔔 {}\n\n{} {}\n\n{}",
        bold(schedule_type.label()),
        escape_markdown(&format_time(slot.time)),
        bold(&slot.title),
        escape_markdown(&format!(
            "Tap Done when you finish it today (+{} points) or send /done {}.",
            slot.points, slot.key
        )),
    )
}

/// Slot list of a schedule, ticking the keys already completed.
pub fn schedule_overview(schedule_type: ScheduleType, slots: &[ScheduleSlot], completed: &[&str]) -> String {
    let mut text = format!("{}\n\n", bold(schedule_type.label()));
    for slot in slots {
        let mark = if completed.contains(&slot.key.as_str()) { "✅" } else { "⬜" };
        text.push_str(&format!(
            "{} {}\n",
            mark,
            escape_markdown(&format!("{} {} (+{})", format_time(slot.time), slot.title, slot.points)),
        ));
        text.push_str(&format!("      {}\n", code(&slot.key)));
    }
    if schedule_type.completion_bonus() > 0 {
        text.push_str(&format!(
            "\n🎁 {}",
            escape_markdown(&format!("Finish every task for a +{} bonus.", schedule_type.completion_bonus()))
        ));
    }
    text
}

pub fn camp_task_message(camp: &Camp, task: &CampTask) -> String {
    let mut text = format!("🏕 {}\n\n📌 {}\n", bold(&camp.name), bold(&task.title));
    if !task.description.trim().is_empty() {
        text.push_str(&format!("{}\n", escape_markdown(task.description.trim())));
    }
    text.push_str(&format!(
        "\n⏳ {}\n🎯 {}",
        escape_markdown(&format!("Join within {}", format_minutes(task.deadline_minutes))),
        escape_markdown(&format!("+{} points", task.points)),
    ));
    text
}

pub fn camp_announcement(camp: &Camp, participants: i64, tz: Tz) -> String {
    let mut text = format!("🏕 {}\n", bold(&format!("New study camp: {}", camp.name)));
    if !camp.description.trim().is_empty() {
        text.push_str(&format!("\n{}\n", escape_markdown(camp.description.trim())));
    }

    let when = |at: Option<DateTime<Utc>>| {
        at.map(|at| format_local(&at, tz))
            .unwrap_or_else(|| "?".to_string())
    };
    let capacity = if camp.has_capacity_limit() {
        format!("{participants}/{}", camp.max_participants)
    } else {
        participants.to_string()
    };

    text.push_str(&format!(
        "\n📅 {}\n🏁 {}\n👥 {}\n🆔 {}",
        escape_markdown(&format!("Starts: {}", when(camp.starts_at()))),
        escape_markdown(&format!("Ends: {}", when(camp.ends_at()))),
        escape_markdown(&format!("Participants: {capacity}")),
        code(&format!("/campreport {}", camp.id)),
    ));
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::schedule::find_builtin_slot;

    #[test]
    fn test_group_task_message_mentions_deadline_and_points() {
        let slot = find_builtin_slot(ScheduleType::Morning, "study_1").unwrap();
        let text = group_task_message(ScheduleType::Morning, &slot);
        assert!(text.contains("within 15 minutes"));
        assert!(text.contains("\\+10 points"));
        assert!(text.contains("*First study block*"));
    }

    #[test]
    fn test_schedule_overview_ticks_completed_tasks() {
        let slots = crate::schedule::builtin_slots(ScheduleType::Evening);
        let text = schedule_overview(ScheduleType::Evening, &slots, &["join"]);
        assert!(text.starts_with("*🌙 Evening schedule*"));
        assert_eq!(text.matches('✅').count(), 1);
        assert!(text.contains("`early_sleep`"));
        assert!(text.contains("\\+15 bonus"));
    }

    #[test]
    fn test_leaderboard_placeholder_and_medals() {
        assert!(leaderboard_lines(&[]).contains("No points"));

        let entries = vec![
            LeaderboardEntry {
                telegram_id: 1,
                username: Some("amal".to_string()),
                first_name: None,
                points: 30,
                completions: 4,
            },
            LeaderboardEntry {
                telegram_id: 2,
                username: None,
                first_name: Some("Omar".to_string()),
                points: 12,
                completions: 2,
            },
        ];
        let text = leaderboard_lines(&entries);
        assert!(text.starts_with("🥇 1\\. @amal"));
        assert!(text.contains("🥈 2\\. Omar \\(12 pts, 2 tasks\\)"));
    }
}
