use axum::http::{Method, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use super::{start_attempt, submit_attempt};
use crate::test_support;
use crate::test_support::{ExamFixture, StudentFixture};

#[tokio::test]
async fn owner_lists_attempts_with_violation_counts() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "owner1@example.edu", "Owner One").await;
    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;
    let other = test_support::insert_student(
        ctx.state.db(),
        StudentFixture { email: "second@example.edu", ..Default::default() },
    )
    .await;
    let exam =
        test_support::insert_exam(ctx.state.db(), &faculty.id, ExamFixture::default()).await;

    let first_token = test_support::bearer_token(&student, ctx.state.settings());
    let second_token = test_support::bearer_token(&other, ctx.state.settings());

    let (_, started) = start_attempt(ctx.app.clone(), &first_token, &exam.id).await;
    let attempt_id = started["attempt_id"].as_str().expect("attempt id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/proctor"),
            Some(&first_token),
            Some(json!({ "type": "visibility-hidden" })),
        ))
        .await
        .expect("record event");
    assert_eq!(response.status(), StatusCode::OK);

    let (status, _) = submit_attempt(ctx.app.clone(), &first_token, &attempt_id).await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = start_attempt(ctx.app.clone(), &second_token, &exam.id).await;
    assert_eq!(status, StatusCode::OK);

    let faculty_token = test_support::bearer_token(&faculty, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/exam/{}", exam.id),
            Some(&faculty_token),
            None,
        ))
        .await
        .expect("list attempts");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");
    assert_eq!(body["total_count"], 2);

    let items = body["items"].as_array().expect("items");
    let submitted =
        items.iter().find(|item| item["id"] == attempt_id.as_str()).expect("submitted row");
    assert_eq!(submitted["status"], "submitted");
    assert_eq!(submitted["violations_count"], 1);
    assert_eq!(submitted["student_email"], "student@example.edu");
}

#[tokio::test]
async fn non_owner_faculty_cannot_see_attempts() {
    let ctx = test_support::setup_test_context().await;

    let owner =
        test_support::insert_faculty(ctx.state.db(), "owner2@example.edu", "Owner Two").await;
    let outsider =
        test_support::insert_faculty(ctx.state.db(), "other2@example.edu", "Other Two").await;
    let exam = test_support::insert_exam(ctx.state.db(), &owner.id, ExamFixture::default()).await;

    let outsider_token = test_support::bearer_token(&outsider, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/attempts/exam/{}", exam.id),
            Some(&outsider_token),
            None,
        ))
        .await
        .expect("list attempts");

    // Non-ownership reads as not-found, never as forbidden.
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn grant_retake_validates_target_and_count() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "owner3@example.edu", "Owner Three").await;
    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;
    let exam =
        test_support::insert_exam(ctx.state.db(), &faculty.id, ExamFixture::default()).await;

    let faculty_token = test_support::bearer_token(&faculty, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/exam/{}/grant-retake", exam.id),
            Some(&faculty_token),
            Some(json!({ "student_id": "no-such-user" })),
        ))
        .await
        .expect("grant retake");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/exam/{}/grant-retake", exam.id),
            Some(&faculty_token),
            Some(json!({ "student_id": student.id, "count": 0 })),
        ))
        .await
        .expect("grant retake");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    // Repeated grants accumulate into one ledger entry.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/exam/{}/grant-retake", exam.id),
            Some(&faculty_token),
            Some(json!({ "student_id": student.id })),
        ))
        .await
        .expect("grant retake");
    let first = test_support::read_json(response).await;
    assert_eq!(first["remaining"], 1);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/exam/{}/grant-retake", exam.id),
            Some(&faculty_token),
            Some(json!({ "student_id": student.id, "count": 3 })),
        ))
        .await
        .expect("grant retake");
    let second = test_support::read_json(response).await;
    assert_eq!(second["remaining"], 4);

    let rows: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM retake_grants WHERE exam_id = $1 AND student_id = $2",
    )
    .bind(&exam.id)
    .bind(&student.id)
    .fetch_one(ctx.state.db())
    .await
    .expect("grant rows");
    assert_eq!(rows, 1);
}

#[tokio::test]
async fn proctor_events_readable_by_owner_student_and_owning_faculty_only() {
    let ctx = test_support::setup_test_context().await;

    let owner =
        test_support::insert_faculty(ctx.state.db(), "owner4@example.edu", "Owner Four").await;
    let outsider =
        test_support::insert_faculty(ctx.state.db(), "other4@example.edu", "Other Four").await;
    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;
    let other_student = test_support::insert_student(
        ctx.state.db(),
        StudentFixture { email: "peer@example.edu", ..Default::default() },
    )
    .await;
    let exam = test_support::insert_exam(ctx.state.db(), &owner.id, ExamFixture::default()).await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let (_, started) = start_attempt(ctx.app.clone(), &student_token, &exam.id).await;
    let attempt_id = started["attempt_id"].as_str().expect("attempt id").to_string();

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/proctor"),
            Some(&student_token),
            Some(json!({ "type": "return-timeout" })),
        ))
        .await
        .expect("record event");
    assert_eq!(response.status(), StatusCode::OK);

    for (token, expected) in [
        (test_support::bearer_token(&owner, ctx.state.settings()), StatusCode::OK),
        (test_support::bearer_token(&outsider, ctx.state.settings()), StatusCode::FORBIDDEN),
        (test_support::bearer_token(&other_student, ctx.state.settings()), StatusCode::FORBIDDEN),
        (student_token.clone(), StatusCode::OK),
    ] {
        let response = ctx
            .app
            .clone()
            .oneshot(test_support::json_request(
                Method::GET,
                &format!("/api/v1/attempts/{attempt_id}/events"),
                Some(&token),
                None,
            ))
            .await
            .expect("list events");
        assert_eq!(response.status(), expected);
    }
}
