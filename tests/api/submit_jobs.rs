use chrono::{Duration, Utc};
use serde_json::Value;

use image_processing_service::domain::entities::image_job::JobCompletion;
use image_processing_service::ports::job_repository::JobRepository;

use crate::helpers::{
    image_bytes, image_part, spawn_app, spawn_app_customised, spawn_app_with, StubBehaviour,
};

#[tokio::test]
async fn an_anonymous_single_file_compression_completes_the_job() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(1000)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 1);

    let job = &jobs[0];
    assert_eq!(job["status"], "completed");
    assert_eq!(job["fileName"], "photo.jpg");
    assert_eq!(job["operation"], "compress");
    assert_eq!(job["originalSize"], 1000);
    assert_eq!(job["processedSize"], 500);
    assert_eq!(job["compressionRatio"], 50.0);
    assert!(job["downloadUrl"]
        .as_str()
        .unwrap()
        .starts_with("/download/"));
    assert!(job["expiresAt"].is_string());

    assert_eq!(app.jobs.count(), 1);
    // The uploaded file is gone once the batch is done
    let mut entries = tokio::fs::read_dir(&app.upload_dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn a_batch_from_a_non_premium_caller_is_rejected_without_creating_jobs() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("a.jpg", "image/jpeg", image_bytes(100)))
        .part("images", image_part("b.jpg", "image/jpeg", image_bytes(100)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(
        body["error"],
        "Batch processing requires a premium subscription"
    );
    assert_eq!(app.jobs.count(), 0);
}

#[tokio::test]
async fn a_premium_user_can_submit_a_batch() {
    let app = spawn_app().await;
    let (_, token) = app.user_token(true);

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("a.jpg", "image/jpeg", image_bytes(100)))
        .part("images", image_part("b.jpg", "image/jpeg", image_bytes(200)))
        .part("images", image_part("c.jpg", "image/jpeg", image_bytes(300)));

    let response = app.post_jobs("compress", form, Some(&token)).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 3);
    assert!(jobs.iter().all(|job| job["status"] == "completed"));
}

#[tokio::test]
async fn a_batch_above_the_configured_maximum_is_rejected() {
    let app = spawn_app_customised(StubBehaviour::Shrink, |settings| {
        settings.storage.max_batch_size = 2;
    })
    .await;
    let (_, token) = app.user_token(true);

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("a.jpg", "image/jpeg", image_bytes(100)))
        .part("images", image_part("b.jpg", "image/jpeg", image_bytes(100)))
        .part("images", image_part("c.jpg", "image/jpeg", image_bytes(100)));

    let response = app.post_jobs("compress", form, Some(&token)).await;

    assert_eq!(403, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "A batch cannot contain more than 2 files");
    assert_eq!(app.jobs.count(), 0);
}

#[tokio::test]
async fn a_failed_transformation_marks_the_job_failed() {
    let app = spawn_app_with(StubBehaviour::Fail).await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(1000)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let job = &body["jobs"][0];
    assert_eq!(job["status"], "failed");
    assert!(job["downloadUrl"].is_null());
    assert!(job["processedSize"].is_null());

    // No artifact was stored for the failed job
    let mut entries = tokio::fs::read_dir(&app.processed_dir).await.unwrap();
    assert!(entries.next_entry().await.unwrap().is_none());
}

#[tokio::test]
async fn one_failing_file_does_not_affect_the_rest_of_the_batch() {
    let app = spawn_app_with(StubBehaviour::FailOnMarker).await;
    let (_, token) = app.user_token(true);

    let mut poisoned = b"FAIL".to_vec();
    poisoned.extend(image_bytes(100));

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("bad.jpg", "image/jpeg", poisoned))
        .part("images", image_part("good.jpg", "image/jpeg", image_bytes(1000)));

    let response = app.post_jobs("compress", form, Some(&token)).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["fileName"], "bad.jpg");
    assert_eq!(jobs[0]["status"], "failed");
    assert_eq!(jobs[1]["fileName"], "good.jpg");
    assert_eq!(jobs[1]["status"], "completed");
    assert_eq!(jobs[1]["processedSize"], 500);
}

#[tokio::test]
async fn a_request_without_files_is_rejected() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new().text("quality", "80");

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "No files were uploaded");
}

#[tokio::test]
async fn an_unsupported_file_type_is_rejected() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("notes.txt", "text/plain", image_bytes(100)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(app.jobs.count(), 0);
}

#[tokio::test]
async fn an_oversized_file_is_rejected() {
    let app = spawn_app_customised(StubBehaviour::Shrink, |settings| {
        settings.storage.max_file_size_bytes = 50;
    })
    .await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("big.jpg", "image/jpeg", image_bytes(100)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(app.jobs.count(), 0);
}

#[tokio::test]
async fn an_unknown_operation_is_rejected() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(100)));

    let response = app.post_jobs("rotate", form, None).await;

    assert_eq!(400, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Unknown operation: rotate");
}

#[tokio::test]
async fn invalid_operation_settings_are_rejected() {
    let app = spawn_app().await;

    // convert without a target format
    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(100)));

    let response = app.post_jobs("convert", form, None).await;

    assert_eq!(400, response.status().as_u16());
    assert_eq!(app.jobs.count(), 0);
}

#[tokio::test]
async fn a_compression_that_does_not_shrink_is_retried_once() {
    let app = spawn_app_with(StubBehaviour::Inflate).await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(1000)));

    let response = app.post_jobs("compress", form, None).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.transformer.calls(), 2);

    // The retried output is kept even when it is still larger than the input
    let body: Value = response.json().await.unwrap();
    let job = &body["jobs"][0];
    assert_eq!(job["status"], "completed");
    assert_eq!(job["processedSize"], 2024);
    assert!(job["compressionRatio"].as_f64().unwrap() < 0.0);
}

#[tokio::test]
async fn a_resize_that_does_not_shrink_is_not_retried() {
    let app = spawn_app_with(StubBehaviour::Passthrough).await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(1000)))
        .text("percentage", "150")
        .text("doNotEnlarge", "true");

    let response = app.post_jobs("resize", form, None).await;

    assert_eq!(200, response.status().as_u16());
    assert_eq!(app.transformer.calls(), 1);

    let body: Value = response.json().await.unwrap();
    let job = &body["jobs"][0];
    assert_eq!(job["status"], "completed");
    assert_eq!(job["processedSize"], 1000);
    assert_eq!(job["compressionRatio"], 0.0);
}

#[tokio::test]
async fn a_terminal_job_cannot_be_transitioned_again() {
    let app = spawn_app().await;

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(1000)));
    let response = app.post_jobs("compress", form, None).await;
    let body: Value = response.json().await.unwrap();
    let job_id = body["jobs"][0]["id"].as_i64().unwrap();
    let job = app.jobs.get_sync(job_id).unwrap();
    assert_eq!(job.status.as_str(), "completed");

    // Neither transition matches a job that already left `processing`
    assert!(app.jobs.fail(job_id).await.is_err());
    let completion = JobCompletion {
        processed_size: 1,
        compression_ratio: 0.0,
        artifact_name: "job_0_overwrite.jpg".to_string(),
        download_token: "0".repeat(64),
        expires_at: Utc::now() + Duration::hours(24),
    };
    assert!(app.jobs.complete(job_id, &completion).await.is_err());

    // The original outcome is untouched
    let unchanged = app.jobs.get_sync(job_id).unwrap();
    assert_eq!(unchanged.processed_size, job.processed_size);
    assert_eq!(unchanged.download_token, job.download_token);
}

#[tokio::test]
async fn a_submission_records_a_usage_event() {
    let app = spawn_app().await;
    let (user_id, token) = app.user_token(false);

    let form = reqwest::multipart::Form::new()
        .part("images", image_part("photo.jpg", "image/jpeg", image_bytes(100)))
        .text("sessionId", "session-123");

    let response = app.post_jobs("compress", form, Some(&token)).await;
    assert_eq!(200, response.status().as_u16());

    app.wait_for_usage_records(1).await;
    let records = app.usage.records();
    assert_eq!(records[0].operation.as_str(), "compress");
    assert_eq!(records[0].user_id, Some(user_id));
    assert_eq!(records[0].session_id.as_deref(), Some("session-123"));
}
