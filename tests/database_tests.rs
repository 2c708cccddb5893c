use anyhow::Result;
use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use study_camp_bot::database::{connection::DatabaseManager, models::*};
use study_camp_bot::schedule::{builtin_slots, ScheduleSlot, ScheduleType};
use tempfile::{tempdir, TempDir};

async fn setup_test_db() -> Result<(DatabaseManager, TempDir)> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("test.db");
    let database_url = format!("sqlite:{}", db_path.display());

    let db_manager = DatabaseManager::new(&database_url).await?;
    db_manager.run_migrations().await?;

    Ok((db_manager, temp_dir))
}

fn at(y: i32, m: u32, d: u32, h: u32, min: u32) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(y, m, d, h, min, 0).unwrap()
}

fn profile(telegram_id: i64, username: Option<&str>) -> UserProfile {
    UserProfile {
        telegram_id,
        username: username.map(str::to_string),
        first_name: Some("Sara".to_string()),
    }
}

#[tokio::test]
async fn test_group_registration_keeps_first_admin() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);

    let group = Group::get_or_create(&db.pool, -1001, Some("Physics"), Some(42), Tz::Asia__Riyadh, now).await?;
    assert_eq!(group.admin_id, Some(42));
    assert_eq!(group.timezone, "Asia/Riyadh");
    assert!(group.enabled_schedules().is_empty());
    assert!(group.motivation_enabled);

    let again = Group::get_or_create(&db.pool, -1001, Some("Physics 2"), Some(99), Tz::UTC, now).await?;
    assert_eq!(again.id, group.id);
    assert_eq!(again.admin_id, Some(42));
    assert_eq!(again.title.as_deref(), Some("Physics 2"));
    assert_eq!(again.timezone, "Asia/Riyadh");

    assert!(Group::find_by_chat_id(&db.pool, 12345).await?.is_none());
    Ok(())
}

#[tokio::test]
async fn test_group_settings_updates() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let group = Group::get_or_create(&db.pool, -1002, None, None, Tz::UTC, at(2024, 3, 1, 8, 0)).await?;

    Group::set_schedule_enabled(&db.pool, group.id, ScheduleType::Evening, true).await?;
    Group::set_motivation_enabled(&db.pool, group.id, false).await?;
    Group::set_timezone(&db.pool, group.id, Tz::Europe__Berlin).await?;

    let group = Group::find_by_id(&db.pool, group.id).await?.unwrap();
    assert_eq!(group.enabled_schedules(), vec![ScheduleType::Evening]);
    assert!(!group.motivation_enabled);
    assert_eq!(group.tz(Tz::UTC), Tz::Europe__Berlin);

    assert_eq!(Group::find_with_schedules(&db.pool).await?.len(), 1);
    assert!(Group::find_motivation_enabled(&db.pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_removed_group_is_deactivated_until_readded() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let group = Group::get_or_create(&db.pool, -1003, Some("Chemistry"), Some(5), Tz::UTC, now).await?;
    Group::set_schedule_enabled(&db.pool, group.id, ScheduleType::Morning, true).await?;

    assert!(Group::deactivate(&db.pool, -1003).await?);
    assert!(!Group::deactivate(&db.pool, -1003).await?);
    assert!(!Group::deactivate(&db.pool, -424242).await?);

    assert!(Group::find_with_schedules(&db.pool).await?.is_empty());
    assert!(Group::find_motivation_enabled(&db.pool).await?.is_empty());
    assert_eq!(Group::count(&db.pool).await?, 0);

    let back = Group::get_or_create(&db.pool, -1003, None, None, Tz::UTC, now).await?;
    assert!(back.is_active);
    assert_eq!(back.enabled_schedules(), vec![ScheduleType::Morning]);
    assert_eq!(Group::find_with_schedules(&db.pool).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_user_upsert_and_point_buckets() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let mut conn = db.pool.acquire().await?;

    let user = User::upsert_profile(&mut conn, &profile(7, None), now).await?;
    assert_eq!(user.display_name(), "Sara");
    assert_eq!(user.preferred_schedule(), None);

    let user = User::upsert_profile(&mut conn, &profile(7, Some("sara_k")), now).await?;
    assert_eq!(user.display_name(), "@sara_k");

    User::add_points(&mut conn, user.id, 10, PointsSource::Schedule(ScheduleType::Morning)).await?;
    User::add_points(&mut conn, user.id, 4, PointsSource::Camp).await?;
    User::add_points(&mut conn, user.id, -5, PointsSource::Camp).await?;
    User::add_points(&mut conn, user.id, 0, PointsSource::Camp).await?;

    let user = User::find_by_id(&mut *conn, user.id).await?.unwrap();
    assert_eq!(user.total_points, 14);
    assert_eq!(user.morning_points, 10);
    assert_eq!(user.camp_points, 4);
    assert_eq!(user.evening_points, 0);
    assert_eq!(User::count(&db.pool).await?, 1);
    Ok(())
}

#[tokio::test]
async fn test_streaks_move_and_reset() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let mut conn = db.pool.acquire().await?;
    let user = User::upsert_profile(&mut conn, &profile(8, None), at(2024, 3, 1, 8, 0)).await?;

    let day = |d: u32| NaiveDate::from_ymd_opt(2024, 3, d).unwrap();
    assert_eq!(User::record_activity_day(&mut conn, user.id, day(1)).await?, 1);
    assert_eq!(User::record_activity_day(&mut conn, user.id, day(1)).await?, 1);
    assert_eq!(User::record_activity_day(&mut conn, user.id, day(2)).await?, 2);
    assert_eq!(User::record_activity_day(&mut conn, user.id, day(5)).await?, 1);
    drop(conn);

    // last activity on the 5th: still alive on the 6th, gone on the 7th
    assert_eq!(User::reset_stale_streaks(&db.pool, day(5)).await?, 0);
    assert_eq!(User::reset_stale_streaks(&db.pool, day(6)).await?, 1);

    let user = User::find_by_id(&db.pool, user.id).await?.unwrap();
    assert_eq!(user.streak_days, 0);
    Ok(())
}

#[tokio::test]
async fn test_preferred_schedule_selection() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let mut conn = db.pool.acquire().await?;
    let first = User::upsert_profile(&mut conn, &profile(1, None), at(2024, 3, 1, 8, 0)).await?;
    let _second = User::upsert_profile(&mut conn, &profile(2, None), at(2024, 3, 1, 8, 0)).await?;
    drop(conn);

    User::set_preferred_schedule(&db.pool, first.id, Some(ScheduleType::Evening)).await?;
    let following = User::find_with_preference(&db.pool).await?;
    assert_eq!(following.len(), 1);
    assert_eq!(following[0].preferred_schedule(), Some(ScheduleType::Evening));

    User::set_preferred_schedule(&db.pool, first.id, None).await?;
    assert!(User::find_with_preference(&db.pool).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_group_task_claim_is_exclusive() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 3, 0);
    let group = Group::get_or_create(&db.pool, -1003, None, None, Tz::Asia__Riyadh, now).await?;
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let slot = builtin_slots(ScheduleType::Morning)[3].clone();

    let task = GroupTask::claim(&db.pool, group.id, date, ScheduleType::Morning, &slot, now).await?;
    let task = task.expect("first claim wins");
    assert!(!task.is_sent());
    assert!(task.window().is_none());

    let again = GroupTask::claim(&db.pool, group.id, date, ScheduleType::Morning, &slot, now).await?;
    assert!(again.is_none());

    // a different day is a different occurrence
    let next_day = date.succ_opt().unwrap();
    assert!(GroupTask::claim(&db.pool, group.id, next_day, ScheduleType::Morning, &slot, now).await?.is_some());

    GroupTask::mark_sent(&db.pool, task.id, 555, now).await?;
    let task = GroupTask::find_by_id(&db.pool, task.id).await?.unwrap();
    assert!(task.is_sent());
    assert_eq!(task.message_id, Some(555));
    assert_eq!(task.schedule_type(), Some(ScheduleType::Morning));
    assert_eq!(task.schedule_date(), Some(date));
    assert_eq!(task.window().unwrap().closes_at(), now + Duration::minutes(15));

    assert_eq!(GroupTask::find_for_group_date(&db.pool, group.id, date).await?.len(), 1);
    Ok(())
}

#[tokio::test]
async fn test_tracker_marks_each_task_once() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let mut conn = db.pool.acquire().await?;
    let user = User::upsert_profile(&mut conn, &profile(9, None), at(2024, 3, 1, 8, 0)).await?;
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();

    let tracker = ScheduleTracker::mark_task(&mut conn, user.id, date, ScheduleType::Morning, "study_1", 10)
        .await?
        .unwrap();
    assert_eq!(tracker.completed_keys(), vec!["study_1"]);
    assert_eq!(tracker.points, 10);

    let repeat = ScheduleTracker::mark_task(&mut conn, user.id, date, ScheduleType::Morning, "study_1", 10).await?;
    assert!(repeat.is_none());

    // a key that contains another one as a substring is still distinct
    let tracker = ScheduleTracker::mark_task(&mut conn, user.id, date, ScheduleType::Morning, "study_10", 3)
        .await?
        .unwrap();
    assert!(tracker.has_task("study_1"));
    assert!(tracker.has_task("study_10"));
    assert!(!tracker.has_task("study"));

    assert!(ScheduleTracker::award_completion_once(&mut conn, tracker.id, 20).await?);
    assert!(!ScheduleTracker::award_completion_once(&mut conn, tracker.id, 20).await?);

    let tracker = ScheduleTracker::find(&mut *conn, user.id, date, ScheduleType::Morning).await?.unwrap();
    assert!(tracker.completion_awarded);
    assert_eq!(tracker.points, 33);
    Ok(())
}

#[tokio::test]
async fn test_reminder_and_report_claims() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
    let mut conn = db.pool.acquire().await?;
    let user = User::upsert_profile(&mut conn, &profile(10, None), now).await?;
    drop(conn);

    assert!(UserReminder::claim(&db.pool, user.id, date, ScheduleType::Evening, "join", now).await?);
    assert!(!UserReminder::claim(&db.pool, user.id, date, ScheduleType::Evening, "join", now).await?);
    assert!(UserReminder::claim(&db.pool, user.id, date, ScheduleType::Evening, "study_1", now).await?);

    let group = Group::get_or_create(&db.pool, -1004, None, None, Tz::UTC, now).await?;
    let camp = Camp::create(
        &db.pool,
        group.id,
        10,
        &NewCamp {
            name: "Sprint".to_string(),
            description: String::new(),
            start_at: at(2024, 3, 2, 0, 0),
            end_at: at(2024, 3, 9, 0, 0),
            max_participants: 0,
        },
        now,
    )
    .await?;

    assert!(CampReport::claim(&db.pool, camp.id, date, now).await?);
    assert!(!CampReport::claim(&db.pool, camp.id, date, now).await?);
    Ok(())
}

#[tokio::test]
async fn test_custom_slots_replace_whole_schedule() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let group = Group::get_or_create(&db.pool, -1005, None, None, Tz::UTC, at(2024, 3, 1, 8, 0)).await?;

    let slot = |key: &str, h: u32, title: &str| ScheduleSlot {
        key: key.to_string(),
        title: title.to_string(),
        time: NaiveTime::from_hms_opt(h, 0, 0).unwrap(),
        points: 5,
        deadline_minutes: 15,
    };

    CustomSlot::replace_for_group(&db.pool, group.id, &[slot("slot_1", 7, "Review"), slot("slot_2", 9, "Drills")])
        .await?;
    CustomSlot::replace_for_group(&db.pool, group.id, &[slot("slot_1", 14, "Essay"), slot("slot_2", 8, "Vocab")])
        .await?;

    let slots = CustomSlot::schedule_for_group(&db.pool, group.id).await?;
    let titles: Vec<_> = slots.iter().map(|s| s.title.as_str()).collect();
    assert_eq!(titles, vec!["Vocab", "Essay"]);
    assert_eq!(slots[0].time, NaiveTime::from_hms_opt(8, 0, 0).unwrap());
    Ok(())
}

#[tokio::test]
async fn test_camp_participants_and_ranking() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let group = Group::get_or_create(&db.pool, -1006, None, None, Tz::UTC, now).await?;
    let camp = Camp::create(
        &db.pool,
        group.id,
        1,
        &NewCamp {
            name: "Sprint".to_string(),
            description: "Finals".to_string(),
            start_at: at(2024, 3, 2, 0, 0),
            end_at: at(2024, 3, 4, 0, 0),
            max_participants: 5,
        },
        now,
    )
    .await?;

    assert!(camp.is_joinable(now));
    assert!(!camp.is_running(now));
    assert!(camp.is_running(at(2024, 3, 3, 0, 0)));
    assert_eq!(camp.progress_percent(at(2024, 3, 3, 0, 0)), 50);
    assert_eq!(camp.remaining_days(at(2024, 3, 2, 0, 0)), 2);

    let mut conn = db.pool.acquire().await?;
    let alice = User::upsert_profile(&mut conn, &profile(21, Some("alice")), now).await?;
    let bob = User::upsert_profile(&mut conn, &profile(22, Some("bob")), now).await?;
    let a = CampParticipant::insert(&mut conn, camp.id, alice.id, now).await?;
    let b = CampParticipant::insert(&mut conn, camp.id, bob.id, now + Duration::minutes(1)).await?;
    CampParticipant::add_points(&mut *conn, a.id, 3).await?;
    CampParticipant::add_points(&mut *conn, b.id, 8).await?;
    drop(conn);

    assert_eq!(CampParticipant::count_active(&db.pool, camp.id).await?, 2);

    let board = CampParticipant::leaderboard(&db.pool, camp.id, 10).await?;
    let names: Vec<_> = board.iter().map(|e| e.display_name()).collect();
    assert_eq!(names, vec!["@bob", "@alice"]);

    let a = CampParticipant::find(&db.pool, camp.id, alice.id).await?.unwrap();
    assert_eq!(CampParticipant::rank_of(&db.pool, &a).await?, 2);
    Ok(())
}

#[tokio::test]
async fn test_camp_expiry_and_counts() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let group = Group::get_or_create(&db.pool, -1007, None, None, Tz::UTC, now).await?;
    let new_camp = NewCamp {
        name: "Short".to_string(),
        description: String::new(),
        start_at: at(2024, 3, 1, 9, 0),
        end_at: at(2024, 3, 1, 12, 0),
        max_participants: 0,
    };
    let camp = Camp::create(&db.pool, group.id, 1, &new_camp, now).await?;
    assert!(!camp.has_capacity_limit());

    assert_eq!(Camp::count_active(&db.pool).await?, 1);
    assert_eq!(Camp::find_running(&db.pool, at(2024, 3, 1, 10, 0)).await?.len(), 1);
    assert_eq!(Camp::deactivate_expired(&db.pool, at(2024, 3, 1, 11, 0)).await?, 0);
    assert_eq!(Camp::deactivate_expired(&db.pool, at(2024, 3, 1, 13, 0)).await?, 1);
    assert_eq!(Camp::count_active(&db.pool).await?, 0);
    assert!(Camp::find_active_by_group(&db.pool, group.id).await?.is_empty());
    Ok(())
}

#[tokio::test]
async fn test_camp_task_status_transitions() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);
    let group = Group::get_or_create(&db.pool, -1008, None, None, Tz::UTC, now).await?;
    let camp = Camp::create(
        &db.pool,
        group.id,
        1,
        &NewCamp {
            name: "Sprint".to_string(),
            description: String::new(),
            start_at: at(2024, 3, 2, 0, 0),
            end_at: at(2024, 3, 5, 0, 0),
            max_participants: 0,
        },
        now,
    )
    .await?;
    let task = CampTask::create(
        &db.pool,
        camp.id,
        &NewCampTask {
            title: "Read".to_string(),
            description: "Chapter 1".to_string(),
            scheduled_at: at(2024, 3, 2, 10, 0),
            points: 5,
            deadline_minutes: 10,
        },
        now,
    )
    .await?;

    assert_eq!(task.status, CampTaskStatus::Scheduled.as_str());
    assert!(CampTask::claim(&db.pool, task.id).await?);
    assert!(!CampTask::claim(&db.pool, task.id).await?);
    assert!(!CampTask::mark_skipped(&db.pool, task.id).await?);

    CampTask::mark_sent(&db.pool, task.id, 77, at(2024, 3, 2, 10, 0)).await?;
    let task = CampTask::find_by_id(&db.pool, task.id).await?.unwrap();
    assert!(task.is_sent());
    assert_eq!(task.window().unwrap().closes_at(), at(2024, 3, 2, 10, 10));
    assert_eq!(
        CampTask::count_sent_between(&db.pool, camp.id, at(2024, 3, 2, 0, 0), at(2024, 3, 3, 0, 0)).await?,
        1
    );
    Ok(())
}

#[tokio::test]
async fn test_system_stats_and_activity_pruning() -> Result<()> {
    let (db, _temp_dir) = setup_test_db().await?;
    let now = at(2024, 3, 1, 8, 0);

    assert_eq!(SystemStat::get_count(&db.pool, STAT_MESSAGES_SENT).await?, 0);
    SystemStat::increment(&db.pool, STAT_MESSAGES_SENT, 2, now).await?;
    SystemStat::increment(&db.pool, STAT_MESSAGES_SENT, 3, now).await?;
    assert_eq!(SystemStat::get_count(&db.pool, STAT_MESSAGES_SENT).await?, 5);

    SystemStat::set(&db.pool, STAT_LAST_MAINTENANCE_DATE, "2024-03-01", now).await?;
    assert_eq!(
        SystemStat::get(&db.pool, STAT_LAST_MAINTENANCE_DATE).await?.as_deref(),
        Some("2024-03-01")
    );

    let mut conn = db.pool.acquire().await?;
    let user = User::upsert_profile(&mut conn, &profile(30, None), now).await?;
    ActivityLog::record(&mut *conn, user.id, "camp_join", Some("1"), now - Duration::days(40)).await?;
    ActivityLog::record(&mut *conn, user.id, "camp_join", Some("2"), now).await?;
    drop(conn);

    assert_eq!(ActivityLog::prune_before(&db.pool, now - Duration::days(30)).await?, 1);
    assert_eq!(ActivityLog::count_for_user(&db.pool, user.id).await?, 1);
    Ok(())
}
