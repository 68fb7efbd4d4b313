mod common;

use chrono::{Duration, Utc};
use common::*;
use lcsp_bot::database::models::{
    AttendanceStatus, MeetingRef, MeetingUpdate, NewMeeting, Pole, TargetRoles,
};
use lcsp_bot::database::{attendance, meetings, DbError};

#[tokio::test]
async fn create_stores_normalized_target_roles() {
    let pool = setup_pool().await;
    let meeting = add_future_meeting(&pool, "Sprint review", 3, &["ia", "DEV"]).await;

    let stored = meetings::get_meeting(&pool, meeting.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Sprint review");
    assert_eq!(stored.target_roles.names(), vec!["DEV", "IA"]);
    assert!(!stored.is_completed);
    assert!(!stored.attendance_validated);
}

#[tokio::test]
async fn all_sentinel_targets_everyone() {
    let pool = setup_pool().await;
    let meeting = add_future_meeting(&pool, "AG", 3, &["DEV", "all"]).await;

    let stored = meetings::get_meeting(&pool, meeting.id).await.unwrap().unwrap();
    assert_eq!(stored.target_roles, TargetRoles::All);
}

#[tokio::test]
async fn invalid_or_empty_roles_are_rejected() {
    let pool = setup_pool().await;
    let new_meeting = |roles: Vec<String>| NewMeeting {
        title: "Bad".into(),
        date: Utc::now() + Duration::days(1),
        description: None,
        created_by: ADMIN_ID.into(),
        organizer_id: None,
        target_roles: roles,
    };

    let unknown = meetings::create_meeting(&pool, new_meeting(vec!["DEV".into(), "SALES".into()])).await;
    assert!(matches!(unknown, Err(DbError::InvalidTargetRoles(role)) if role == "SALES"));

    let empty = meetings::create_meeting(&pool, new_meeting(Vec::new())).await;
    assert!(matches!(empty, Err(DbError::InvalidTargetRoles(_))));
}

#[tokio::test]
async fn name_search_skips_completed_meetings() {
    let pool = setup_pool().await;
    let standup = add_past_meeting(&pool, "Standup", 1, &["ALL"]).await;
    validate(&pool, &standup).await;

    assert!(meetings::search_meetings_by_name(&pool, "standup").await.unwrap().is_empty());
    assert!(meetings::get_meeting(&pool, standup.id).await.unwrap().is_some());
}

#[tokio::test]
async fn name_search_is_case_insensitive_and_ordered_by_date() {
    let pool = setup_pool().await;
    let later = add_future_meeting(&pool, "Weekly DEV", 7, &["DEV"]).await;
    let sooner = add_future_meeting(&pool, "weekly IA", 2, &["IA"]).await;
    add_future_meeting(&pool, "Hackathon", 1, &["ALL"]).await;

    let found = meetings::search_meetings_by_name(&pool, "WEEKLY").await.unwrap();
    let ids: Vec<i64> = found.iter().map(|meeting| meeting.id).collect();
    assert_eq!(ids, vec![sooner.id, later.id]);
}

#[tokio::test]
async fn update_by_unique_name_applies_changes() {
    let pool = setup_pool().await;
    let meeting = add_future_meeting(&pool, "Atelier Rust", 5, &["DEV"]).await;
    let new_date = Utc::now() + Duration::days(10);

    let updated = meetings::update_meeting(
        &pool,
        &MeetingRef::Name("atelier".into()),
        MeetingUpdate {
            description: Some("Ownership et lifetimes".into()),
            date: Some(new_date),
            target_roles: Some(vec!["DEV".into(), "INFRA".into()]),
            ..Default::default()
        },
    )
    .await
    .unwrap();
    assert!(updated);

    let stored = meetings::get_meeting(&pool, meeting.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Atelier Rust");
    assert_eq!(stored.description.as_deref(), Some("Ownership et lifetimes"));
    assert_eq!(stored.date, new_date);
    assert!(stored.target_roles.includes(Some(Pole::Infra)));
    assert!(!stored.target_roles.includes(Some(Pole::Ia)));
}

#[tokio::test]
async fn update_revalidates_target_roles() {
    let pool = setup_pool().await;
    let meeting = add_future_meeting(&pool, "Atelier", 5, &["DEV"]).await;

    let result = meetings::update_meeting(
        &pool,
        &MeetingRef::Id(meeting.id),
        MeetingUpdate {
            title: Some("Renamed".into()),
            target_roles: Some(vec!["MARKETING".into()]),
            ..Default::default()
        },
    )
    .await;
    assert!(matches!(result, Err(DbError::InvalidTargetRoles(_))));

    let stored = meetings::get_meeting(&pool, meeting.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "Atelier");
}

#[tokio::test]
async fn ambiguous_name_lists_candidates() {
    let pool = setup_pool().await;
    let first = add_future_meeting(&pool, "Réunion DEV", 1, &["DEV"]).await;
    let second = add_future_meeting(&pool, "Réunion IA", 2, &["IA"]).await;

    let update = MeetingUpdate {
        title: Some("x".into()),
        ..Default::default()
    };
    match meetings::update_meeting(&pool, &MeetingRef::Name("réunion".into()), update).await {
        Err(DbError::AmbiguousMeeting { candidates }) => {
            assert_eq!(candidates, vec![first.id, second.id]);
        }
        other => panic!("expected AmbiguousMeeting, got {other:?}"),
    }

    let deleted = meetings::delete_meeting(&pool, &MeetingRef::Name("Réunion".into())).await;
    assert!(matches!(deleted, Err(DbError::AmbiguousMeeting { .. })));
    assert!(meetings::get_meeting(&pool, first.id).await.unwrap().is_some());
}

#[tokio::test]
async fn unknown_references_report_false() {
    let pool = setup_pool().await;
    let update = MeetingUpdate {
        title: Some("x".into()),
        ..Default::default()
    };

    assert!(!meetings::update_meeting(&pool, &MeetingRef::Id(42), update.clone()).await.unwrap());
    assert!(!meetings::update_meeting(&pool, &MeetingRef::Name("nothing".into()), update).await.unwrap());
    assert!(!meetings::delete_meeting(&pool, &MeetingRef::Id(42)).await.unwrap());
}

#[tokio::test]
async fn delete_cascades_to_attendance_rows() {
    let pool = setup_pool().await;
    let alice = add_member(&pool, "1", "Alice", Some(Pole::Dev)).await;
    let meeting = add_past_meeting(&pool, "Demo", 1, &["ALL"]).await;
    mark(&pool, &meeting, &alice, AttendanceStatus::Present).await;

    assert!(meetings::delete_meeting(&pool, &MeetingRef::Id(meeting.id)).await.unwrap());
    assert!(meetings::get_meeting(&pool, meeting.id).await.unwrap().is_none());

    let rows = attendance::get_member_attendance(&pool, alice.id, &[meeting.id]).await.unwrap();
    assert!(rows.is_empty());
}

#[tokio::test]
async fn upcoming_meetings_filtered_by_pole() {
    let pool = setup_pool().await;
    add_past_meeting(&pool, "Passée", 2, &["ALL"]).await;
    let general = add_future_meeting(&pool, "Générale", 1, &["ALL"]).await;
    let dev = add_future_meeting(&pool, "DEV only", 2, &["DEV"]).await;
    let ia = add_future_meeting(&pool, "IA only", 3, &["IA"]).await;

    let all = meetings::list_upcoming_meetings(&pool, Utc::now(), 10, None).await.unwrap();
    let ids: Vec<i64> = all.iter().map(|meeting| meeting.id).collect();
    assert_eq!(ids, vec![general.id, dev.id, ia.id]);

    let for_dev = meetings::list_upcoming_meetings(&pool, Utc::now(), 10, Some(Pole::Dev))
        .await
        .unwrap();
    let ids: Vec<i64> = for_dev.iter().map(|meeting| meeting.id).collect();
    assert_eq!(ids, vec![general.id, dev.id]);

    let limited = meetings::list_upcoming_meetings(&pool, Utc::now(), 1, None).await.unwrap();
    assert_eq!(limited.len(), 1);
}
