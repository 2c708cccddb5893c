use chrono::NaiveDate;

/// Next streak value after activity on `today`.
///
/// Activity on the same day leaves the streak alone, activity on the day
/// after the last one extends it, and anything else starts over at one.
pub fn next_streak(last_activity: Option<NaiveDate>, current: i64, today: NaiveDate) -> i64 {
    match last_activity {
        Some(last) if last == today => current,
        Some(last) if Some(last) == today.pred_opt() => current + 1,
        _ => 1,
    }
}

/// Rank shown next to a user's points.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AchievementLevel {
    Beginner,
    Active,
    Advanced,
    Pro,
    Expert,
    Legend,
}

impl AchievementLevel {
    pub fn from_points(points: i64) -> Self {
        match points {
            p if p < 50 => AchievementLevel::Beginner,
            p if p < 100 => AchievementLevel::Active,
            p if p < 200 => AchievementLevel::Advanced,
            p if p < 500 => AchievementLevel::Pro,
            p if p < 1000 => AchievementLevel::Expert,
            _ => AchievementLevel::Legend,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AchievementLevel::Beginner => "Beginner",
            AchievementLevel::Active => "Active",
            AchievementLevel::Advanced => "Advanced",
            AchievementLevel::Pro => "Pro",
            AchievementLevel::Expert => "Expert",
            AchievementLevel::Legend => "Legend",
        }
    }

    pub fn emoji(&self) -> &'static str {
        match self {
            AchievementLevel::Beginner => "🌱",
            AchievementLevel::Active => "🔥",
            AchievementLevel::Advanced => "🌟",
            AchievementLevel::Pro => "🏆",
            AchievementLevel::Expert => "🎓",
            AchievementLevel::Legend => "👑",
        }
    }

    /// Points needed for the next level, `None` at the top.
    pub fn next_threshold(&self) -> Option<i64> {
        match self {
            AchievementLevel::Beginner => Some(50),
            AchievementLevel::Active => Some(100),
            AchievementLevel::Advanced => Some(200),
            AchievementLevel::Pro => Some(500),
            AchievementLevel::Expert => Some(1000),
            AchievementLevel::Legend => None,
        }
    }
}
