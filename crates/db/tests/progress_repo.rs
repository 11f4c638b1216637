//! Integration tests for client writes and progress queries.

use ailingo_core::progress::{ProgressKey, ProgressStatus};
use ailingo_db::models::progress::WriteProgress;
use ailingo_db::repositories::ProgressRepo;
use chrono::{Duration, Utc};
use sqlx::PgPool;

const UID: &str = "user-1";

fn write(status: ProgressStatus, xp_reward: Option<i32>) -> WriteProgress {
    WriteProgress { status, xp_reward }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn first_write_has_no_before_image(pool: PgPool) {
    let key = ProgressKey::new("courseA", "unit1_lesson1").unwrap();

    let change =
        ProgressRepo::write_from_client(&pool, UID, &key, &write(ProgressStatus::Pending, None))
            .await
            .unwrap();

    assert!(change.before.is_none());
    assert_eq!(change.after.doc_id, "courseA_unit1_lesson1");
    assert_eq!(change.after.course_id, "courseA");
    assert_eq!(change.after.lesson_id, "unit1_lesson1");
    assert_eq!(change.after.status(), Some(ProgressStatus::Pending));
    assert!(!change.after.finalized);
    assert!(change.after.completed_at.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn second_write_merges_and_returns_before_image(pool: PgPool) {
    let key = ProgressKey::new("courseA", "lesson1").unwrap();
    ProgressRepo::write_from_client(&pool, UID, &key, &write(ProgressStatus::Pending, Some(30)))
        .await
        .unwrap();

    let change =
        ProgressRepo::write_from_client(&pool, UID, &key, &write(ProgressStatus::Completed, None))
            .await
            .unwrap();

    let before = change.before.expect("before image should exist");
    assert_eq!(before.status(), Some(ProgressStatus::Pending));
    assert!(change.after.is_completed());
    // Omitted xp_reward keeps the stored proposal.
    assert_eq!(change.after.xp_reward, Some(30));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn client_write_never_clears_finalized(pool: PgPool) {
    let key = ProgressKey::new("courseA", "lesson1").unwrap();
    ProgressRepo::write_from_client(&pool, UID, &key, &write(ProgressStatus::Completed, None))
        .await
        .unwrap();
    sqlx::query("UPDATE progress SET finalized = TRUE, xp_earned = 10 WHERE uid = $1")
        .bind(UID)
        .execute(&pool)
        .await
        .unwrap();

    let change =
        ProgressRepo::write_from_client(&pool, UID, &key, &write(ProgressStatus::Pending, Some(50)))
            .await
            .unwrap();

    assert!(change.after.finalized);
    assert_eq!(change.after.xp_earned, Some(10));
    assert!(change.after.is_done());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn list_for_course_scopes_to_user_and_course(pool: PgPool) {
    for (uid, course, lesson) in [
        (UID, "courseA", "lesson2"),
        (UID, "courseA", "lesson1"),
        (UID, "courseB", "lesson1"),
        ("user-2", "courseA", "lesson1"),
    ] {
        let key = ProgressKey::new(course, lesson).unwrap();
        ProgressRepo::write_from_client(&pool, uid, &key, &write(ProgressStatus::Completed, None))
            .await
            .unwrap();
    }

    let records = ProgressRepo::list_for_course(&pool, UID, "courseA")
        .await
        .unwrap();

    let lessons: Vec<_> = records.iter().map(|r| r.lesson_id.as_str()).collect();
    assert_eq!(lessons, ["lesson1", "lesson2"]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn awaiting_settlement_lists_only_unfinalized_completions(pool: PgPool) {
    let completed = ProgressKey::new("courseA", "lesson1").unwrap();
    let pending = ProgressKey::new("courseA", "lesson2").unwrap();
    let finalized = ProgressKey::new("courseA", "lesson3").unwrap();
    ProgressRepo::write_from_client(&pool, UID, &completed, &write(ProgressStatus::Completed, None))
        .await
        .unwrap();
    ProgressRepo::write_from_client(&pool, UID, &pending, &write(ProgressStatus::Pending, None))
        .await
        .unwrap();
    ProgressRepo::write_from_client(&pool, UID, &finalized, &write(ProgressStatus::Completed, None))
        .await
        .unwrap();
    sqlx::query("UPDATE progress SET finalized = TRUE, xp_earned = 10 WHERE doc_id = $1")
        .bind(finalized.doc_id())
        .execute(&pool)
        .await
        .unwrap();

    let cutoff = Utc::now() + Duration::seconds(5);
    let records = ProgressRepo::list_awaiting_settlement(&pool, cutoff, 10)
        .await
        .unwrap();
    let ids: Vec<_> = records.iter().map(|r| r.doc_id.as_str()).collect();
    assert_eq!(ids, ["courseA_lesson1"]);

    // Nothing is older than a cutoff in the past.
    let cutoff = Utc::now() - Duration::hours(1);
    let records = ProgressRepo::list_awaiting_settlement(&pool, cutoff, 10)
        .await
        .unwrap();
    assert!(records.is_empty());
}
