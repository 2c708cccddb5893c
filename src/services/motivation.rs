use chrono::{DateTime, Timelike, Utc};
use chrono_tz::Tz;
use rand::seq::IndexedRandom;
use std::sync::Arc;

use crate::database::models::{Group, SystemStat, STAT_MESSAGES_SENT};
use crate::database::DatabaseManager;
use crate::services::notifier::Notifier;
use crate::utils::logging::log_dispatch;
use crate::utils::markdown::escape_markdown;

pub const QUOTES: &[&str] = &[
    "💪 Success is the sum of small efforts repeated day in and day out.",
    "📚 The expert in anything was once a beginner.",
    "🌱 Don't watch the clock; do what it does. Keep going.",
    "🎯 A little progress each day adds up to big results.",
    "⭐ Discipline is choosing between what you want now and what you want most.",
    "🔥 You don't have to be great to start, but you have to start to be great.",
    "🧠 Learning never exhausts the mind.",
    "🏔 It always seems impossible until it's done.",
    "⏳ Focus on being productive instead of busy.",
    "🌅 Every morning is a new chance to get closer to your goals.",
    "✨ Believe you can and you're halfway there.",
    "📖 Study while others are sleeping; work while others are loafing.",
];

/// Local hours during which groups may receive quotes.
const ACTIVE_HOURS: std::ops::RangeInclusive<u32> = 6..=22;

pub fn random_quote() -> &'static str {
    QUOTES.choose(&mut rand::rng()).copied().unwrap_or(QUOTES[0])
}

/// A quarter of the eligible groups, rounded up, and never zero when any exist.
pub fn sample_size(eligible: usize) -> usize {
    if eligible == 0 {
        return 0;
    }
    eligible.div_ceil(4).clamp(1, eligible)
}

/// Posts a quote to a random sample of groups that opted in and are awake.
pub async fn send_motivation_round(
    db: &Arc<DatabaseManager>,
    notifier: &Arc<dyn Notifier>,
    default_tz: Tz,
    now: DateTime<Utc>,
) -> Result<usize, sqlx::Error> {
    let eligible: Vec<Group> = Group::find_motivation_enabled(&db.pool)
        .await?
        .into_iter()
        .filter(|group| ACTIVE_HOURS.contains(&now.with_timezone(&group.tz(default_tz)).hour()))
        .collect();

    let picked: Vec<Group> = {
        let mut rng = rand::rng();
        eligible
            .choose_multiple(&mut rng, sample_size(eligible.len()))
            .cloned()
            .collect()
    };

    let mut sent = 0;
    for group in picked {
        let text = escape_markdown(random_quote());
        match notifier.send_text(group.telegram_chat_id, text).await {
            Ok(_) => {
                log_dispatch("motivation", group.telegram_chat_id, "quote", Ok(()));
                sent += 1;
            }
            Err(e) => log_dispatch("motivation", group.telegram_chat_id, "quote", Err(e.to_string().as_str())),
        }
    }

    if sent > 0 {
        SystemStat::increment(&db.pool, STAT_MESSAGES_SENT, sent as i64, now).await?;
    }
    Ok(sent)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_size_is_a_quarter_rounded_up() {
        assert_eq!(sample_size(0), 0);
        assert_eq!(sample_size(1), 1);
        assert_eq!(sample_size(3), 1);
        assert_eq!(sample_size(4), 1);
        assert_eq!(sample_size(5), 2);
        assert_eq!(sample_size(40), 10);
    }

    #[test]
    fn test_random_quote_comes_from_the_list() {
        for _ in 0..20 {
            assert!(QUOTES.contains(&random_quote()));
        }
    }

    #[test]
    fn test_quiet_hours() {
        assert!(!ACTIVE_HOURS.contains(&5));
        assert!(ACTIVE_HOURS.contains(&6));
        assert!(ACTIVE_HOURS.contains(&22));
        assert!(!ACTIVE_HOURS.contains(&23));
    }
}
