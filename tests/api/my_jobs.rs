use serde_json::Value;

use crate::helpers::{image_bytes, image_part, spawn_app};

#[tokio::test]
async fn listing_jobs_requires_authentication() {
    let app = spawn_app().await;

    let response = app.get("/my-jobs", None).await;

    assert_eq!(401, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"], "Authentication required");
}

#[tokio::test]
async fn an_invalid_token_is_treated_as_anonymous() {
    let app = spawn_app().await;

    let response = app.get("/my-jobs", Some("not-a-jwt")).await;

    assert_eq!(401, response.status().as_u16());
}

#[tokio::test]
async fn listing_returns_only_the_callers_jobs_newest_first() {
    let app = spawn_app().await;
    let (_, token) = app.user_token(false);

    for file_name in ["first.jpg", "second.jpg"] {
        let form = reqwest::multipart::Form::new().part(
            "images",
            image_part(file_name, "image/jpeg", image_bytes(100)),
        );
        let response = app.post_jobs("compress", form, Some(&token)).await;
        assert_eq!(200, response.status().as_u16());
    }

    // A job of someone else
    let form = reqwest::multipart::Form::new()
        .part("images", image_part("other.jpg", "image/jpeg", image_bytes(100)));
    app.post_jobs("compress", form, None).await;

    let response = app.get("/my-jobs", Some(&token)).await;

    assert_eq!(200, response.status().as_u16());
    let body: Value = response.json().await.unwrap();
    let jobs = body["jobs"].as_array().unwrap();
    assert_eq!(jobs.len(), 2);
    assert_eq!(jobs[0]["fileName"], "second.jpg");
    assert_eq!(jobs[1]["fileName"], "first.jpg");
}
