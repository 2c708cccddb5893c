use chrono::{Duration, NaiveDate, NaiveDateTime, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Minutes a scheduled group task stays joinable after it is posted.
pub const SCHEDULE_TASK_DEADLINE_MINUTES: i64 = 15;

/// The kinds of daily schedule a group or user can follow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScheduleType {
    Morning,
    Evening,
    Custom,
}

impl ScheduleType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ScheduleType::Morning => "morning",
            ScheduleType::Evening => "evening",
            ScheduleType::Custom => "custom",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            ScheduleType::Morning => "🌅 Morning schedule",
            ScheduleType::Evening => "🌙 Evening schedule",
            ScheduleType::Custom => "🗓 Custom schedule",
        }
    }

    /// Column on `users` that accumulates points earned on this schedule.
    pub fn points_column(&self) -> &'static str {
        match self {
            ScheduleType::Morning => "morning_points",
            ScheduleType::Evening => "evening_points",
            ScheduleType::Custom => "custom_points",
        }
    }

    /// Bonus for finishing every task of the day. Custom schedules have none.
    pub fn completion_bonus(&self) -> i64 {
        match self {
            ScheduleType::Morning => 20,
            ScheduleType::Evening => 15,
            ScheduleType::Custom => 0,
        }
    }
}

impl fmt::Display for ScheduleType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ScheduleType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "morning" => Ok(ScheduleType::Morning),
            "evening" => Ok(ScheduleType::Evening),
            "custom" => Ok(ScheduleType::Custom),
            other => Err(format!("unknown schedule type '{other}'")),
        }
    }
}

/// One time-tagged task of a daily schedule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScheduleSlot {
    pub key: String,
    pub title: String,
    pub time: NaiveTime,
    pub points: i64,
    pub deadline_minutes: i64,
}

struct SlotTemplate {
    key: &'static str,
    title: &'static str,
    hour: u32,
    minute: u32,
    points: i64,
}

const MORNING_SLOTS: &[SlotTemplate] = &[
    SlotTemplate { key: "join", title: "Join today's schedule", hour: 5, minute: 0, points: 5 },
    SlotTemplate { key: "prayer_1", title: "Fajr prayer", hour: 5, minute: 15, points: 5 },
    SlotTemplate { key: "meal_1", title: "Breakfast and rest", hour: 5, minute: 30, points: 3 },
    SlotTemplate { key: "study_1", title: "First study block", hour: 6, minute: 0, points: 10 },
    SlotTemplate { key: "prayer_2", title: "Dhuhr prayer", hour: 12, minute: 0, points: 5 },
    SlotTemplate { key: "study_2", title: "Second study block", hour: 12, minute: 30, points: 10 },
    SlotTemplate { key: "return_after_break", title: "Back after the break", hour: 13, minute: 30, points: 5 },
    SlotTemplate { key: "prayer_3", title: "Asr prayer", hour: 15, minute: 30, points: 5 },
    SlotTemplate { key: "study_3", title: "Third study block", hour: 16, minute: 0, points: 10 },
    SlotTemplate { key: "prayer_4", title: "Maghrib prayer", hour: 18, minute: 0, points: 5 },
    SlotTemplate { key: "prayer_5", title: "Isha prayer", hour: 19, minute: 30, points: 5 },
    SlotTemplate { key: "evaluation", title: "Daily evaluation", hour: 21, minute: 0, points: 7 },
];

const EVENING_SLOTS: &[SlotTemplate] = &[
    SlotTemplate { key: "join", title: "Join tonight's schedule", hour: 16, minute: 0, points: 5 },
    SlotTemplate { key: "study_1", title: "First evening session", hour: 16, minute: 30, points: 10 },
    SlotTemplate { key: "prayer_1", title: "Maghrib prayer", hour: 18, minute: 0, points: 5 },
    SlotTemplate { key: "study_2", title: "Second evening session", hour: 18, minute: 30, points: 10 },
    SlotTemplate { key: "prayer_2", title: "Isha prayer", hour: 19, minute: 30, points: 5 },
    SlotTemplate { key: "study_3", title: "Night session", hour: 20, minute: 0, points: 10 },
    SlotTemplate { key: "evaluation", title: "Evening evaluation", hour: 21, minute: 30, points: 7 },
    SlotTemplate { key: "early_sleep", title: "Early sleep", hour: 22, minute: 30, points: 8 },
];

impl SlotTemplate {
    fn to_slot(&self) -> ScheduleSlot {
        ScheduleSlot {
            key: self.key.to_string(),
            title: self.title.to_string(),
            time: NaiveTime::from_hms_opt(self.hour, self.minute, 0).unwrap_or(NaiveTime::MIN),
            points: self.points,
            deadline_minutes: SCHEDULE_TASK_DEADLINE_MINUTES,
        }
    }
}

/// Slots of the built-in morning and evening schedules, in time order.
///
/// Custom schedules live in the database, so this returns nothing for them.
pub fn builtin_slots(schedule_type: ScheduleType) -> Vec<ScheduleSlot> {
    let templates = match schedule_type {
        ScheduleType::Morning => MORNING_SLOTS,
        ScheduleType::Evening => EVENING_SLOTS,
        ScheduleType::Custom => return Vec::new(),
    };
    templates.iter().map(SlotTemplate::to_slot).collect()
}

pub fn find_builtin_slot(schedule_type: ScheduleType, key: &str) -> Option<ScheduleSlot> {
    builtin_slots(schedule_type)
        .into_iter()
        .find(|slot| slot.key == key)
}

/// Returns every `(local_date, slot)` occurrence that should fire at `now_local`.
///
/// An occurrence is due once its wall-clock time has passed and for at most
/// `grace` afterwards. Yesterday's occurrences are checked as well so a slot
/// shortly before midnight still fires after the date rolls over.
pub fn due_slots(
    slots: &[ScheduleSlot],
    now_local: NaiveDateTime,
    grace: Duration,
) -> Vec<(NaiveDate, &ScheduleSlot)> {
    let today = now_local.date();
    let dates: Vec<NaiveDate> = [today.pred_opt(), Some(today)].into_iter().flatten().collect();

    let mut due = Vec::new();
    for slot in slots {
        for date in &dates {
            let at = date.and_time(slot.time);
            if at <= now_local && now_local - at <= grace {
                due.push((*date, slot));
            }
        }
    }
    due
}
