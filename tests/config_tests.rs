use chrono_tz::Tz;
use std::env;
use std::sync::Mutex;
use study_camp_bot::config::Config;

// Mutex to ensure config tests run sequentially to avoid environment variable conflicts
static CONFIG_TEST_MUTEX: Mutex<()> = Mutex::new(());

const OPTIONAL_VARS: &[&str] = &[
    "DATABASE_URL",
    "HTTP_PORT",
    "BOT_TIMEZONE",
    "TASK_GRACE_MINUTES",
    "ADMIN_IDS",
    "CAMP_REPORT_HOUR",
];

fn clear_env() {
    env::remove_var("TELEGRAM_BOT_TOKEN");
    for var in OPTIONAL_VARS {
        env::remove_var(var);
    }
}

#[test]
fn test_config_from_env_with_all_vars() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "test_token_123");
    env::set_var("DATABASE_URL", "sqlite:test.db");
    env::set_var("HTTP_PORT", "8080");
    env::set_var("BOT_TIMEZONE", "Europe/Berlin");
    env::set_var("TASK_GRACE_MINUTES", "5");
    env::set_var("ADMIN_IDS", "111, 222");
    env::set_var("CAMP_REPORT_HOUR", "21");

    let config = Config::from_env().unwrap();

    assert_eq!(config.telegram_bot_token, "test_token_123");
    assert_eq!(config.database_url, "sqlite:test.db");
    assert_eq!(config.http_port, 8080);
    assert_eq!(config.timezone, Tz::Europe__Berlin);
    assert_eq!(config.task_grace_minutes, 5);
    assert_eq!(config.admin_ids, vec![111, 222]);
    assert_eq!(config.camp_report_hour, 21);
    assert!(config.is_global_admin(222));
    assert!(!config.is_global_admin(333));

    clear_env();
}

#[test]
fn test_config_from_env_with_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "required_token");

    let config = Config::from_env().unwrap();

    assert_eq!(config.database_url, "sqlite:./data/study_bot.db");
    assert_eq!(config.http_port, 3000);
    assert_eq!(config.timezone, Tz::Asia__Riyadh);
    assert_eq!(config.task_grace_minutes, 15);
    assert!(config.admin_ids.is_empty());
    assert_eq!(config.camp_report_hour, 23);

    clear_env();
}

#[test]
fn test_blank_optional_vars_fall_back_to_defaults() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    env::set_var("TELEGRAM_BOT_TOKEN", "token");
    env::set_var("HTTP_PORT", "  ");
    env::set_var("ADMIN_IDS", "");

    let config = Config::from_env().unwrap();
    assert_eq!(config.http_port, 3000);
    assert!(config.admin_ids.is_empty());

    clear_env();
}

#[test]
fn test_config_missing_or_blank_token() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();
    clear_env();

    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN must be set"));

    env::set_var("TELEGRAM_BOT_TOKEN", "   ");
    let err = Config::from_env().unwrap_err();
    assert!(err.to_string().contains("TELEGRAM_BOT_TOKEN must be set"));

    clear_env();
}

#[test]
fn test_invalid_values_are_rejected() {
    let _guard = CONFIG_TEST_MUTEX.lock().unwrap();

    let cases = [
        ("HTTP_PORT", "not_a_number", "Invalid HTTP_PORT"),
        ("HTTP_PORT", "70000", "Invalid HTTP_PORT"),
        ("BOT_TIMEZONE", "Mars/Olympus", "Invalid BOT_TIMEZONE"),
        ("TASK_GRACE_MINUTES", "-1", "Invalid TASK_GRACE_MINUTES"),
        ("ADMIN_IDS", "12,abc", "Invalid ADMIN_IDS entry"),
        ("CAMP_REPORT_HOUR", "24", "Invalid CAMP_REPORT_HOUR"),
    ];

    for (var, value, expected) in cases {
        clear_env();
        env::set_var("TELEGRAM_BOT_TOKEN", "token");
        env::set_var(var, value);

        let err = Config::from_env().unwrap_err();
        assert!(
            err.to_string().contains(expected),
            "{var}={value} gave '{err}', expected '{expected}'"
        );
    }

    clear_env();
}
