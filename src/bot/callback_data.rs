use chrono::NaiveDate;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

use crate::schedule::ScheduleType;
use crate::utils::datetime::{parse_db_date, to_db_date};

/// A group setting flipped from the `/settings` keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingsToggle {
    Schedule(ScheduleType),
    Motivation,
}

/// Everything an inline button can ask for, encoded in its callback data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CallbackAction {
    /// `task:<group_task_id>`
    JoinGroupTask(i64),
    /// `done:<schedule>:<YYYY-MM-DD>:<task_key>`
    CompletePrivateTask {
        schedule_type: ScheduleType,
        date: NaiveDate,
        key: String,
    },
    /// `camp:<camp_id>`
    JoinCamp(i64),
    /// `ctask:<camp_task_id>`
    JoinCampTask(i64),
    /// `settings:<toggle>`
    Settings(SettingsToggle),
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("invalid callback data '{0}'")]
pub struct InvalidCallbackData(pub String);

impl fmt::Display for CallbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CallbackAction::JoinGroupTask(id) => write!(f, "task:{id}"),
            CallbackAction::CompletePrivateTask { schedule_type, date, key } => {
                write!(f, "done:{}:{}:{}", schedule_type, to_db_date(*date), key)
            }
            CallbackAction::JoinCamp(id) => write!(f, "camp:{id}"),
            CallbackAction::JoinCampTask(id) => write!(f, "ctask:{id}"),
            CallbackAction::Settings(SettingsToggle::Schedule(schedule_type)) => {
                write!(f, "settings:toggle_{schedule_type}")
            }
            CallbackAction::Settings(SettingsToggle::Motivation) => write!(f, "settings:toggle_motivation"),
        }
    }
}

impl FromStr for CallbackAction {
    type Err = InvalidCallbackData;

    fn from_str(data: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidCallbackData(data.to_string());
        let parse_id = |raw: &str| raw.parse::<i64>().ok().filter(|id| *id > 0).ok_or_else(invalid);

        let (prefix, rest) = data.split_once(':').ok_or_else(invalid)?;
        match prefix {
            "task" => Ok(CallbackAction::JoinGroupTask(parse_id(rest)?)),
            "camp" => Ok(CallbackAction::JoinCamp(parse_id(rest)?)),
            "ctask" => Ok(CallbackAction::JoinCampTask(parse_id(rest)?)),
            "done" => {
                let parts: Vec<&str> = rest.splitn(3, ':').collect();
                let [schedule_type, date, key] = parts.as_slice() else {
                    return Err(invalid());
                };
                let schedule_type = schedule_type.parse::<ScheduleType>().map_err(|_| invalid())?;
                let date = parse_db_date(date).ok_or_else(invalid)?;
                if key.is_empty() {
                    return Err(invalid());
                }
                Ok(CallbackAction::CompletePrivateTask {
                    schedule_type,
                    date,
                    key: key.to_string(),
                })
            }
            "settings" => match rest {
                "toggle_motivation" => Ok(CallbackAction::Settings(SettingsToggle::Motivation)),
                other => {
                    let schedule_type = other
                        .strip_prefix("toggle_")
                        .and_then(|name| name.parse::<ScheduleType>().ok())
                        .ok_or_else(invalid)?;
                    Ok(CallbackAction::Settings(SettingsToggle::Schedule(schedule_type)))
                }
            },
            _ => Err(invalid()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_done_key_may_contain_colons() {
        let action: CallbackAction = "done:morning:2024-03-01:study:extra".parse().unwrap();
        assert_eq!(
            action,
            CallbackAction::CompletePrivateTask {
                schedule_type: ScheduleType::Morning,
                date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
                key: "study:extra".to_string(),
            }
        );
    }

    #[test]
    fn test_rejects_non_positive_ids() {
        assert!("task:0".parse::<CallbackAction>().is_err());
        assert!("camp:-4".parse::<CallbackAction>().is_err());
    }
}
