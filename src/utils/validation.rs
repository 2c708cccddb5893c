use anyhow::{anyhow, Result};
use chrono::NaiveTime;
use chrono_tz::Tz;

use crate::database::models::{NewCamp, NewCampTask};
use crate::error::CampError;
use crate::schedule::templates::SCHEDULE_TASK_DEADLINE_MINUTES;
use crate::schedule::ScheduleSlot;
use crate::utils::datetime::{parse_hhmm, parse_local_datetime};

pub const NEW_CAMP_USAGE: &str =
    "/newcamp name | description | YYYY-MM-DD HH:MM | YYYY-MM-DD HH:MM [| max participants]";
pub const ADD_TASK_USAGE: &str =
    "/addtask camp_id | title | description | YYYY-MM-DD HH:MM | points [| deadline minutes]";
pub const CUSTOM_USAGE: &str = "/custom 06:00 Morning review, 14:30 Practice problems";

pub const DEFAULT_CAMP_TASK_DEADLINE: i64 = 10;
pub const MIN_TASK_POINTS: i64 = 1;
pub const MAX_TASK_POINTS: i64 = 10;
const CUSTOM_SLOT_POINTS: i64 = 5;
const MAX_CUSTOM_SLOTS: usize = 20;

pub fn validate_camp_name(name: &str) -> Result<()> {
    validate_title(name, "Camp name", 3)
}

pub fn validate_task_title(title: &str) -> Result<()> {
    validate_title(title, "Task title", 1)
}

fn validate_title(title: &str, what: &str, min_len: usize) -> Result<()> {
    let title = title.trim();

    if title.is_empty() {
        return Err(anyhow!("{} cannot be empty", what));
    }

    if title.chars().count() < min_len {
        return Err(anyhow!("{} must be at least {} characters long", what, min_len));
    }

    if title.chars().count() > 100 {
        return Err(anyhow!("{} cannot be longer than 100 characters", what));
    }

    if title.contains('\n') || title.contains('\r') {
        return Err(anyhow!("{} cannot contain line breaks", what));
    }

    Ok(())
}

pub fn parse_timezone(input: &str) -> Result<Tz> {
    input
        .trim()
        .parse::<Tz>()
        .map_err(|_| anyhow!("'{}' is not a known timezone, try e.g. Asia/Riyadh or Europe/Berlin", input.trim()))
}

fn split_fields(input: &str) -> Vec<&str> {
    input.split('|').map(str::trim).collect()
}

/// Parses the `/newcamp` arguments. Dates are wall-clock times in `tz`.
pub fn parse_camp_args(input: &str, tz: Tz) -> Result<NewCamp, CampError> {
    let fields = split_fields(input);
    if !(4..=5).contains(&fields.len()) {
        return Err(CampError::InvalidFormat(NEW_CAMP_USAGE.to_string()));
    }

    let name = fields[0].to_string();
    validate_camp_name(&name).map_err(|e| CampError::InvalidFormat(e.to_string()))?;

    let start_at = parse_local_datetime(fields[2], tz).map_err(|e| CampError::InvalidDate(e.to_string()))?;
    let end_at = parse_local_datetime(fields[3], tz).map_err(|e| CampError::InvalidDate(e.to_string()))?;

    let max_participants = match fields.get(4) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<i64>()
            .map_err(|_| CampError::InvalidFormat(format!("'{raw}' is not a number of participants")))?
            .max(0),
        _ => 0,
    };

    Ok(NewCamp {
        name,
        description: fields[1].to_string(),
        start_at,
        end_at,
        max_participants,
    })
}

/// Parses the `/addtask` arguments into the camp id and the task.
///
/// Points are clamped to 1..=10 and the deadline to at least one minute.
pub fn parse_task_args(input: &str, tz: Tz) -> Result<(i64, NewCampTask), CampError> {
    let fields = split_fields(input);
    if !(5..=6).contains(&fields.len()) {
        return Err(CampError::InvalidFormat(ADD_TASK_USAGE.to_string()));
    }

    let camp_id = fields[0]
        .parse::<i64>()
        .map_err(|_| CampError::InvalidFormat(format!("'{}' is not a camp id", fields[0])))?;

    let title = fields[1].to_string();
    validate_task_title(&title).map_err(|e| CampError::InvalidFormat(e.to_string()))?;

    let scheduled_at = parse_local_datetime(fields[3], tz).map_err(|e| CampError::InvalidDate(e.to_string()))?;

    let points = fields[4]
        .parse::<i64>()
        .map_err(|_| CampError::InvalidFormat(format!("'{}' is not a number of points", fields[4])))?
        .clamp(MIN_TASK_POINTS, MAX_TASK_POINTS);

    let deadline_minutes = match fields.get(5) {
        Some(raw) if !raw.is_empty() => raw
            .parse::<i64>()
            .map_err(|_| CampError::InvalidFormat(format!("'{raw}' is not a number of minutes")))?
            .max(1),
        _ => DEFAULT_CAMP_TASK_DEADLINE,
    };

    Ok((
        camp_id,
        NewCampTask {
            title,
            description: fields[2].to_string(),
            scheduled_at,
            points,
            deadline_minutes,
        },
    ))
}

/// Parses `HH:MM Title, HH:MM Title` into custom slots ordered by time.
pub fn parse_custom_slots(input: &str) -> Result<Vec<ScheduleSlot>> {
    let entries: Vec<&str> = input
        .split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .collect();

    if entries.is_empty() {
        return Err(anyhow!("Give at least one entry like: {}", CUSTOM_USAGE));
    }

    if entries.len() > MAX_CUSTOM_SLOTS {
        return Err(anyhow!("A custom schedule can have at most {} tasks", MAX_CUSTOM_SLOTS));
    }

    let mut slots = Vec::with_capacity(entries.len());
    for entry in entries {
        let (time, title) = entry
            .split_once(char::is_whitespace)
            .ok_or_else(|| anyhow!("'{}' needs a time and a title", entry))?;
        let time = parse_hhmm(time)?;
        let title = title.trim();
        validate_task_title(title)?;

        slots.push(ScheduleSlot {
            key: String::new(),
            title: title.to_string(),
            time,
            points: CUSTOM_SLOT_POINTS,
            deadline_minutes: SCHEDULE_TASK_DEADLINE_MINUTES,
        });
    }

    slots.sort_by_key(|slot| slot.time);
    // a replaced schedule must not reuse a key already posted today
    let mut previous: Option<(NaiveTime, usize)> = None;
    for slot in slots.iter_mut() {
        let n = match previous {
            Some((time, n)) if time == slot.time => n + 1,
            _ => 1,
        };
        previous = Some((slot.time, n));
        slot.key = format!("slot_{}_{}", slot.time.format("%H%M"), n);
    }

    Ok(slots)
}
