use chrono::{TimeZone, Utc};
use chrono_tz::Tz;
use study_camp_bot::error::CampError;
use study_camp_bot::utils::datetime::{parse_hhmm, parse_local_datetime};
use study_camp_bot::utils::markdown::escape_markdown;
use study_camp_bot::utils::validation::*;
use tokio_test::{assert_err, assert_ok};

#[cfg(test)]
mod validation_tests {
    use super::*;

    #[test]
    fn test_task_title_validation() {
        assert_ok!(validate_task_title("Read chapter 3"));
        assert_ok!(validate_task_title("x"));
        assert_err!(validate_task_title(""));
        assert!(validate_task_title("line\rbreak").is_err());
        assert!(validate_task_title(&"t".repeat(100)).is_ok());
        assert!(validate_task_title(&"t".repeat(101)).is_err());
    }

    #[test]
    fn test_camp_args_with_optional_capacity() {
        let camp = parse_camp_args("Sprint | Finals prep | 2024-03-02 08:00 | 2024-03-09 20:00", Tz::UTC).unwrap();
        assert_eq!(camp.max_participants, 0);
        assert_eq!(camp.start_at, Utc.with_ymd_and_hms(2024, 3, 2, 8, 0, 0).unwrap());

        let camp = parse_camp_args("Sprint | | 2024-03-02 08:00 | 2024-03-09 20:00 | -4", Tz::UTC).unwrap();
        assert_eq!(camp.max_participants, 0);
        assert_eq!(camp.description, "");

        let camp = parse_camp_args("Sprint | x | 2024-03-02 08:00 | 2024-03-09 20:00 | 25", Tz::UTC).unwrap();
        assert_eq!(camp.max_participants, 25);
    }

    #[test]
    fn test_camp_args_errors() {
        assert!(matches!(
            parse_camp_args("Sprint | x | 2024-03-02 08:00", Tz::UTC),
            Err(CampError::InvalidFormat(usage)) if usage == NEW_CAMP_USAGE
        ));
        assert!(matches!(
            parse_camp_args("ab | x | 2024-03-02 08:00 | 2024-03-09 20:00", Tz::UTC),
            Err(CampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_camp_args("Sprint | x | 2024-03-02 | 2024-03-09 20:00", Tz::UTC),
            Err(CampError::InvalidDate(_))
        ));
        assert!(matches!(
            parse_camp_args("Sprint | x | 2024-03-02 08:00 | 2024-03-09 20:00 | lots", Tz::UTC),
            Err(CampError::InvalidFormat(_))
        ));
    }

    #[test]
    fn test_task_args_clamp_points_and_deadline() {
        let (camp_id, task) = parse_task_args("7 | Read | Ch. 2 | 2024-03-03 09:00 | 0 | 0", Tz::UTC).unwrap();
        assert_eq!(camp_id, 7);
        assert_eq!(task.points, MIN_TASK_POINTS);
        assert_eq!(task.deadline_minutes, 1);

        let (_, task) = parse_task_args("7 | Read | | 2024-03-03 09:00 | 99", Tz::UTC).unwrap();
        assert_eq!(task.points, MAX_TASK_POINTS);
        assert_eq!(task.deadline_minutes, DEFAULT_CAMP_TASK_DEADLINE);
    }

    #[test]
    fn test_task_args_errors() {
        assert!(matches!(
            parse_task_args("seven | Read | | 2024-03-03 09:00 | 5", Tz::UTC),
            Err(CampError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_task_args("7 | Read | | 2024-03-03 09:00", Tz::UTC),
            Err(CampError::InvalidFormat(usage)) if usage == ADD_TASK_USAGE
        ));
        assert!(matches!(
            parse_task_args("7 | Read | | tomorrow | 5", Tz::UTC),
            Err(CampError::InvalidDate(_))
        ));
    }

    #[test]
    fn test_local_datetime_conversion() {
        let utc = parse_local_datetime("2024-03-02 08:00", Tz::Asia__Riyadh).unwrap();
        assert_eq!(utc, Utc.with_ymd_and_hms(2024, 3, 2, 5, 0, 0).unwrap());

        // skipped by the spring-forward change in Berlin
        assert!(parse_local_datetime("2024-03-31 02:30", Tz::Europe__Berlin).is_err());
        assert_err!(parse_hhmm("25:00"));
        assert_ok!(parse_hhmm(" 07:45 "));
    }

    #[test]
    fn test_custom_slots_limit() {
        let many: Vec<String> = (0..21).map(|i| format!("{:02}:00 Block {}", i, i)).collect();
        assert!(parse_custom_slots(&many.join(", ")).is_err());

        let slots = parse_custom_slots("07:00 Review, , 09:00 Drills,").unwrap();
        assert_eq!(slots.len(), 2);
        assert!(slots.iter().all(|slot| slot.points > 0));
    }

    #[test]
    fn test_markdown_escaping() {
        assert_eq!(escape_markdown("a.b"), "a\\.b");
        assert_eq!(escape_markdown("(+5)"), "\\(\\+5\\)");
        assert_eq!(escape_markdown("plain text"), "plain text");
    }
}
