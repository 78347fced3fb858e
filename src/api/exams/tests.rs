use axum::http::{Method, StatusCode};
use serde_json::json;
use time::format_description::well_known::Rfc3339;
use time::{Duration, OffsetDateTime};
use tower::ServiceExt;

use crate::db::models::AssignmentCriteria;
use crate::test_support;
use crate::test_support::{ExamFixture, StudentFixture};

fn rfc3339_in(minutes: i64) -> String {
    (OffsetDateTime::now_utc() + Duration::minutes(minutes))
        .format(&Rfc3339)
        .expect("format datetime")
}

fn exam_payload() -> serde_json::Value {
    json!({
        "title": "Circuits Midterm",
        "description": "Closed book",
        "duration_minutes": 45,
        "window": { "start": rfc3339_in(-5), "end": rfc3339_in(120) },
        "questions": [
            {
                "type": "single",
                "text": "Ohm's law relates V, I and?",
                "options": ["Resistance", "Capacitance"],
                "correct_answers": [0],
                "points": 5
            },
            {
                "type": "mcq",
                "text": "Pick the passive components",
                "options": ["Resistor", "Op-amp", "Capacitor"],
                "correct_answers": [0, 2],
                "points": 3
            },
            { "type": "text", "text": "Explain Kirchhoff's current law", "points": 2 }
        ],
        "assignment_criteria": { "year": [2, 3] }
    })
}

#[tokio::test]
async fn faculty_creates_and_reads_back_an_exam() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "author1@example.edu", "Author One").await;
    let token = test_support::bearer_token(&faculty, ctx.state.settings());

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload()),
        ))
        .await
        .expect("create exam");

    let status = response.status();
    let created = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::CREATED, "response: {created}");
    let exam_id = created["id"].as_str().expect("exam id");
    assert_eq!(created["questions"].as_array().expect("questions").len(), 3);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{exam_id}"),
            Some(&token),
            None,
        ))
        .await
        .expect("get exam");

    let status = response.status();
    let fetched = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {fetched}");
    assert_eq!(fetched["title"], "Circuits Midterm");
    // The owner view keeps the answer keys.
    assert_eq!(fetched["questions"][0]["correct_answers"], json!([0]));
}

#[tokio::test]
async fn exam_validation_reports_every_problem_at_once() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "author2@example.edu", "Author Two").await;
    let token = test_support::bearer_token(&faculty, ctx.state.settings());

    let payload = json!({
        "title": "Broken",
        "duration_minutes": 30,
        // Inverted window
        "window": { "start": rfc3339_in(60), "end": rfc3339_in(0) },
        "questions": [
            // Single-choice with one option and no answer key
            { "type": "single", "text": "?", "options": ["only"], "correct_answers": [], "points": 1 },
            // Correct index out of range
            { "type": "mcq", "text": "?", "options": ["a", "b"], "correct_answers": [0, 9], "points": 1 }
        ]
    });

    let response = ctx
        .app
        .oneshot(test_support::json_request(Method::POST, "/api/v1/exams", Some(&token), Some(payload)))
        .await
        .expect("create exam");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::BAD_REQUEST, "response: {body}");

    let detail = body["detail"].as_str().expect("detail");
    assert!(detail.contains("window end"), "missing window problem: {detail}");
    assert!(detail.contains("question 0"), "missing question 0 problem: {detail}");
    assert!(detail.contains("question 1"), "missing question 1 problem: {detail}");
}

#[tokio::test]
async fn students_cannot_author_exams() {
    let ctx = test_support::setup_test_context().await;

    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;
    let token = test_support::bearer_token(&student, ctx.state.settings());

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/exams",
            Some(&token),
            Some(exam_payload()),
        ))
        .await
        .expect("create exam");

    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn exam_reads_are_owner_scoped() {
    let ctx = test_support::setup_test_context().await;

    let owner =
        test_support::insert_faculty(ctx.state.db(), "author3@example.edu", "Author Three").await;
    let outsider =
        test_support::insert_faculty(ctx.state.db(), "author4@example.edu", "Author Four").await;
    let exam = test_support::insert_exam(ctx.state.db(), &owner.id, ExamFixture::default()).await;

    let outsider_token = test_support::bearer_token(&outsider, ctx.state.settings());
    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::GET,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&outsider_token),
            None,
        ))
        .await
        .expect("get exam");

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn update_revalidates_the_merged_definition() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "author5@example.edu", "Author Five").await;
    let exam = test_support::insert_exam(ctx.state.db(), &faculty.id, ExamFixture::default()).await;

    let token = test_support::bearer_token(&faculty, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&token),
            Some(json!({ "window": { "start": rfc3339_in(60), "end": rfc3339_in(10) } })),
        ))
        .await
        .expect("update exam");
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = ctx
        .app
        .oneshot(test_support::json_request(
            Method::PUT,
            &format!("/api/v1/exams/{}", exam.id),
            Some(&token),
            Some(json!({ "title": "Midterm (rescheduled)" })),
        ))
        .await
        .expect("update exam");

    let status = response.status();
    let updated = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {updated}");
    assert_eq!(updated["title"], "Midterm (rescheduled)");
}

#[tokio::test]
async fn available_listing_filters_by_window_and_eligibility() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "author6@example.edu", "Author Six").await;
    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;

    let open_matching =
        test_support::insert_exam(ctx.state.db(), &faculty.id, ExamFixture::default()).await;
    let _open_wrong_year = test_support::insert_exam(
        ctx.state.db(),
        &faculty.id,
        ExamFixture {
            title: "Other cohort".to_string(),
            assignment_criteria: AssignmentCriteria { year: vec![5], ..Default::default() },
            ..Default::default()
        },
    )
    .await;
    let _not_yet_open = test_support::insert_exam(
        ctx.state.db(),
        &faculty.id,
        ExamFixture {
            title: "Future exam".to_string(),
            window_start_offset_minutes: 30,
            window_end_offset_minutes: 90,
            ..Default::default()
        },
    )
    .await;

    let token = test_support::bearer_token(&student, ctx.state.settings());
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/available",
            Some(&token),
            None,
        ))
        .await
        .expect("available exams");

    let status = response.status();
    let body = test_support::read_json(response).await;
    assert_eq!(status, StatusCode::OK, "response: {body}");

    let items = body.as_array().expect("array");
    assert_eq!(items.len(), 1, "response: {body}");
    assert_eq!(items[0]["id"], open_matching.id.as_str());
    assert_eq!(items[0]["status"], "not-started");
}

#[tokio::test]
async fn available_listing_relabels_terminal_attempts_with_grants() {
    let ctx = test_support::setup_test_context().await;

    let faculty =
        test_support::insert_faculty(ctx.state.db(), "author7@example.edu", "Author Seven").await;
    let student = test_support::insert_student(ctx.state.db(), StudentFixture::default()).await;
    let exam =
        test_support::insert_exam(ctx.state.db(), &faculty.id, ExamFixture::default()).await;

    let student_token = test_support::bearer_token(&student, ctx.state.settings());
    let faculty_token = test_support::bearer_token(&faculty, ctx.state.settings());

    // Start and submit, then check the derived label at each step.
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            "/api/v1/attempts/start",
            Some(&student_token),
            Some(json!({ "exam_id": exam.id })),
        ))
        .await
        .expect("start attempt");
    let started = test_support::read_json(response).await;
    let attempt_id = started["attempt_id"].as_str().expect("attempt id");

    let listing = fetch_available(&ctx, &student_token).await;
    assert_eq!(listing[0]["status"], "in-progress");

    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::POST,
            &format!("/api/v1/attempts/{attempt_id}/submit"),
            Some(&student_token),
            None,
        ))
        .await
        .expect("submit attempt");
    assert_eq!(response.status(), StatusCode::OK);

    let listing = fetch_available(&ctx, &student_token).await;
    assert_eq!(listing[0]["status"], "submitted");

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
    assert_eq!(response.status(), StatusCode::OK);

    // With an unspent grant the exam reads as startable again.
    let listing = fetch_available(&ctx, &student_token).await;
    assert_eq!(listing[0]["status"], "not-started");
}

async fn fetch_available(
    ctx: &test_support::TestContext,
    token: &str,
) -> Vec<serde_json::Value> {
    let response = ctx
        .app
        .clone()
        .oneshot(test_support::json_request(
            Method::GET,
            "/api/v1/exams/available",
            Some(token),
            None,
        ))
        .await
        .expect("available exams");
    let body = test_support::read_json(response).await;
    body.as_array().expect("array").clone()
}
