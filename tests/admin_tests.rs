use anyhow::Result;
use chrono::{DateTime, TimeZone, Utc};
use std::sync::Arc;
use study_camp_bot::database::{connection::DatabaseManager, models::*};
use study_camp_bot::error::NotifyError;
use study_camp_bot::schedule::ScheduleType;
use study_camp_bot::services::admin::{broadcast, broadcast_summary, collect_usage_report};
use study_camp_bot::services::notifier::{MockNotifier, Notifier};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(Arc<DatabaseManager>, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((Arc::new(db_manager), temp_dir))
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

async fn users(db: &DatabaseManager, ids: &[i64]) -> Result<Vec<User>> {
    let mut conn = db.pool.acquire().await?;
    let mut created = Vec::new();
    for id in ids {
        let profile = UserProfile {
            telegram_id: *id,
            username: Some(format!("reader{id}")),
            first_name: None,
        };
        created.push(User::upsert_profile(&mut conn, &profile, at(2024, 3, 1, 0, 0)).await?);
    }
    Ok(created)
}

#[tokio::test]
async fn test_broadcast_reaches_active_users_and_drops_blockers() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let created = users(&db, &[11, 12, 13]).await?;
    User::deactivate(&db.pool, created[2].id).await?;

    let mut mock = MockNotifier::new();
    mock.expect_send_text()
        .withf(|chat_id, text| *chat_id == 11 && text.contains("Library opens at 8"))
        .times(1)
        .returning(|_, _| Ok(1));
    mock.expect_send_text()
        .withf(|chat_id, _| *chat_id == 12)
        .times(1)
        .returning(|_, _| Err(NotifyError::Request(teloxide::RequestError::Api(teloxide::ApiError::BotBlocked))));
    let notifier: Arc<dyn Notifier> = Arc::new(mock);

    let report = broadcast(&db, &notifier, "Library opens at 8", at(2024, 3, 1, 9, 0)).await?;
    assert_eq!(report.sent, 1);
    assert_eq!(report.failed, 1);
    assert_eq!(report.deactivated, 1);
    assert!(broadcast_summary(&report).contains("delivered to 1 users"));

    let active: Vec<i64> = User::find_active(&db.pool).await?.iter().map(|user| user.telegram_id).collect();
    assert_eq!(active, vec![11]);
    assert_eq!(SystemStat::get_count(&db.pool, STAT_MESSAGES_SENT).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_broadcast_with_no_users_sends_nothing() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let mut mock = MockNotifier::new();
    mock.expect_send_text().never();
    let notifier: Arc<dyn Notifier> = Arc::new(mock);

    let report = broadcast(&db, &notifier, "Anyone?", at(2024, 3, 1, 9, 0)).await?;
    assert_eq!(report, Default::default());
    Ok(())
}

#[tokio::test]
async fn test_usage_counts_by_schedule() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let created = users(&db, &[21, 22, 23, 24]).await?;
    User::set_preferred_schedule(&db.pool, created[0].id, Some(ScheduleType::Morning)).await?;
    User::set_preferred_schedule(&db.pool, created[1].id, Some(ScheduleType::Morning)).await?;
    User::set_preferred_schedule(&db.pool, created[2].id, Some(ScheduleType::Evening)).await?;
    User::deactivate(&db.pool, created[3].id).await?;

    let usage = User::usage_counts(&db.pool).await?;
    assert_eq!(
        usage,
        UserUsage {
            total: 4,
            active: 3,
            morning: 2,
            evening: 1,
            custom: 0
        }
    );

    let text = collect_usage_report(&db, at(2024, 3, 1, 9, 0), chrono_tz::Tz::UTC).await?;
    assert!(text.contains("Total: 4"));
    assert!(text.contains("Morning: 2"));
    Ok(())
}

#[tokio::test]
async fn test_contact_reactivates_a_deactivated_user() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let created = users(&db, &[31]).await?;

    assert!(User::deactivate(&db.pool, created[0].id).await?);
    assert!(!User::deactivate(&db.pool, created[0].id).await?);

    let again = users(&db, &[31]).await?;
    assert!(again[0].is_active);
    Ok(())
}
