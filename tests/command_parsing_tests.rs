use chrono::NaiveDate;
use study_camp_bot::bot::callback_data::{CallbackAction, SettingsToggle};
use study_camp_bot::bot::commands::Command;
use study_camp_bot::schedule::ScheduleType;
use teloxide::utils::command::BotCommands;

#[cfg(test)]
mod command_parsing_tests {
    use super::*;

    #[test]
    fn test_simple_commands_parse() {
        let cases = [
            ("/help", Command::Help),
            ("/start", Command::Start),
            ("/morning", Command::Morning),
            ("/evening", Command::Evening),
            ("/stop", Command::Stop),
            ("/today", Command::Today),
            ("/points", Command::Points),
            ("/ranking", Command::Ranking),
            ("/motivation", Command::Motivation),
            ("/settings", Command::Settings),
            ("/camps", Command::Camps),
            ("/stats", Command::Stats),
        ];

        for (input, expected) in cases {
            assert_eq!(Command::parse(input, "testbot").unwrap(), expected, "parsing {input}");
        }
    }

    #[test]
    fn test_command_with_bot_mention() {
        let result = Command::parse("/points@testbot", "testbot");
        assert_eq!(result.unwrap(), Command::Points);
    }

    #[test]
    fn test_command_for_another_bot_is_rejected() {
        assert!(Command::parse("/points@otherbot", "testbot").is_err());
    }

    #[test]
    fn test_custom_keeps_the_whole_slot_list() {
        let result = Command::parse("/custom 06:00 Morning review, 14:30 Practice problems", "testbot").unwrap();
        assert_eq!(
            result,
            Command::Custom("06:00 Morning review, 14:30 Practice problems".to_string())
        );
    }

    #[test]
    fn test_done_takes_the_task_key() {
        let result = Command::parse("/done study_1", "testbot").unwrap();
        assert_eq!(result, Command::Done("study_1".to_string()));
    }

    #[test]
    fn test_newcamp_keeps_pipe_separated_args() {
        let input = "/newcamp Exam Sprint | Daily drills | 2024-03-02 08:00 | 2024-03-09 20:00 | 30";
        let result = Command::parse(input, "testbot").unwrap();
        assert_eq!(
            result,
            Command::NewCamp("Exam Sprint | Daily drills | 2024-03-02 08:00 | 2024-03-09 20:00 | 30".to_string())
        );
    }

    #[test]
    fn test_addtask_and_campreport() {
        let result = Command::parse("/addtask 3 | Read | Chapter 4 | 2024-03-03 09:00 | 5", "testbot").unwrap();
        assert!(matches!(result, Command::AddTask(args) if args.starts_with("3 | Read")));

        let result = Command::parse("/campreport 3", "testbot").unwrap();
        assert_eq!(result, Command::CampReport("3".to_string()));
    }

    #[test]
    fn test_leavecamp_and_broadcast_arguments() {
        let result = Command::parse("/leavecamp 3", "testbot").unwrap();
        assert_eq!(result, Command::LeaveCamp("3".to_string()));

        let result = Command::parse("/broadcast Library closes at 6 today", "testbot").unwrap();
        assert_eq!(result, Command::Broadcast("Library closes at 6 today".to_string()));
    }

    #[test]
    fn test_timezone_argument() {
        let result = Command::parse("/timezone Europe/Berlin", "testbot").unwrap();
        assert_eq!(result, Command::Timezone("Europe/Berlin".to_string()));
    }

    #[test]
    fn test_unknown_command() {
        assert!(Command::parse("/schedule", "testbot").is_err());
        assert!(Command::parse("not a command", "testbot").is_err());
    }

    #[test]
    fn test_help_text_lists_camp_commands() {
        let help = Command::descriptions().to_string();
        for command in ["/newcamp", "/addtask", "/camps", "/campreport", "/leavecamp", "/done"] {
            assert!(help.contains(command), "help is missing {command}");
        }
    }
}

#[cfg(test)]
mod callback_data_tests {
    use super::*;

    #[test]
    fn test_button_payloads_fit_telegram_limit() {
        let actions = [
            CallbackAction::JoinGroupTask(i64::MAX),
            CallbackAction::JoinCampTask(i64::MAX),
            CallbackAction::JoinCamp(i64::MAX),
            CallbackAction::CompletePrivateTask {
                schedule_type: ScheduleType::Evening,
                date: NaiveDate::from_ymd_opt(2024, 12, 31).unwrap(),
                key: "return_after_break".to_string(),
            },
            CallbackAction::Settings(SettingsToggle::Motivation),
        ];

        for action in actions {
            assert!(action.to_string().len() <= 64, "{action} is too long");
        }
    }

    #[test]
    fn test_private_task_payload() {
        let action = CallbackAction::CompletePrivateTask {
            schedule_type: ScheduleType::Morning,
            date: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            key: "study_1".to_string(),
        };
        assert_eq!(action.to_string(), "done:morning:2024-03-01:study_1");
        assert_eq!("done:morning:2024-03-01:study_1".parse::<CallbackAction>().unwrap(), action);
    }

    #[test]
    fn test_malformed_payloads_are_rejected() {
        for data in ["", "task", "task:", "task:abc", "task:-4", "done:weekly:2024-03-01:x", "done:morning:2024-13-01:x", "unknown:1"] {
            assert!(data.parse::<CallbackAction>().is_err(), "'{data}' should not parse");
        }
    }

    #[test]
    fn test_settings_toggles() {
        assert_eq!(
            "settings:toggle_evening".parse::<CallbackAction>().unwrap(),
            CallbackAction::Settings(SettingsToggle::Schedule(ScheduleType::Evening))
        );
        assert!("settings:toggle_weekly".parse::<CallbackAction>().is_err());
    }
}
