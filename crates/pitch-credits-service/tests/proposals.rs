//! Metered proposal generation integration tests.

mod common;

use axum::http::StatusCode;
use common::TestHarness;
use serde_json::json;

fn brief() -> serde_json::Value {
    json!({
        "platform": "upwork",
        "tone": "Friendly",
        "job_title": "Landing page",
        "job_description": "Need a landing page for a bakery.",
        "author_name": "Dana"
    })
}

async fn generate(harness: &TestHarness, body: &serde_json::Value) -> axum_test::TestResponse {
    harness
        .server
        .post("/v1/proposals/generate")
        .add_header("x-user-id", harness.user_id_header())
        .json(body)
        .await
}

#[tokio::test]
async fn generation_charges_one_credit_and_saves_proposal() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(5).await;

    let response = generate(&harness, &brief()).await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["charged"], 1);
    assert_eq!(body["balance"], 4);
    let text = body["proposal"]["proposal_text"].as_str().unwrap();
    assert!(text.contains("Landing page"));
    assert!(text.ends_with("Dana"));
    assert!(!text.contains("[Your Name]"));
    assert_eq!(body["proposal"]["platform"], "Upwork");

    assert_eq!(harness.balance().await, 4);
    let entries = harness.transactions().await;
    assert_eq!(entries[0]["reason"], "generation_charge");
    assert_eq!(entries[0]["delta"], -1);
    let proposal_id = body["proposal"]["id"].as_str().unwrap();
    assert!(entries[0]["note"].as_str().unwrap().contains(proposal_id));
    assert_eq!(harness.generator.calls(), 1);
}

#[tokio::test]
async fn failed_generation_is_not_charged() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(5).await;
    harness.generator.push(Err("upstream overloaded"));

    let response = generate(&harness, &brief()).await;

    response.assert_status(StatusCode::BAD_GATEWAY);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["retryable"], true);
    assert_eq!(harness.balance().await, 5);
    assert_eq!(harness.transactions().await.len(), 1);

    let list = harness
        .server
        .get("/v1/proposals")
        .add_header("x-user-id", harness.user_id_header())
        .await;
    list.assert_status_ok();
    assert!(list.json::<serde_json::Value>()["proposals"]
        .as_array()
        .unwrap()
        .is_empty());
}

#[tokio::test]
async fn blank_output_is_not_charged() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(5).await;
    harness.generator.push(Ok("   \n"));

    generate(&harness, &brief())
        .await
        .assert_status(StatusCode::BAD_GATEWAY);

    assert_eq!(harness.balance().await, 5);
}

#[tokio::test]
async fn empty_balance_is_payment_required_without_calling_generator() {
    let harness = TestHarness::new();
    harness.open_account().await;

    let response = generate(&harness, &brief()).await;

    response.assert_status(StatusCode::PAYMENT_REQUIRED);
    let body: serde_json::Value = response.json();
    assert_eq!(body["error"]["details"]["balance"], 0);
    assert_eq!(body["error"]["details"]["required"], 1);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("Top up"));
    assert_eq!(harness.generator.calls(), 0);
}

#[tokio::test]
async fn blank_job_description_is_bad_request() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(5).await;

    let mut body = brief();
    body["job_description"] = json!("  ");

    generate(&harness, &body)
        .await
        .assert_status(StatusCode::BAD_REQUEST);
    assert_eq!(harness.generator.calls(), 0);
    assert_eq!(harness.balance().await, 5);
}

#[tokio::test]
async fn missing_author_name_falls_back_to_user_id() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(1).await;

    let mut body = brief();
    body.as_object_mut().unwrap().remove("author_name");

    let response = generate(&harness, &body).await;

    response.assert_status(StatusCode::CREATED);
    let body: serde_json::Value = response.json();
    let text = body["proposal"]["proposal_text"].as_str().unwrap();
    assert!(text.ends_with(&harness.test_user_id.to_string()));
    assert_eq!(body["balance"], 0);
}

#[tokio::test]
async fn proposals_are_private_to_their_owner() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(2).await;

    let response = generate(&harness, &brief()).await;
    response.assert_status(StatusCode::CREATED);
    let id = response.json::<serde_json::Value>()["proposal"]["id"]
        .as_str()
        .unwrap()
        .to_string();

    let own = harness
        .server
        .get(&format!("/v1/proposals/{id}"))
        .add_header("x-user-id", harness.user_id_header())
        .await;
    own.assert_status_ok();
    assert_eq!(own.json::<serde_json::Value>()["id"], id.as_str());

    harness
        .server
        .get(&format!("/v1/proposals/{id}"))
        .add_header("x-user-id", harness.staff_id_header())
        .await
        .assert_status_not_found();
}

#[tokio::test]
async fn concurrent_generations_never_overdraw() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(3).await;

    let body = brief();
    let attempts = (0..8).map(|_| generate(&harness, &body));
    let responses = futures::future::join_all(attempts).await;

    let created = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::CREATED)
        .count();
    let refused = responses
        .iter()
        .filter(|r| r.status_code() == StatusCode::PAYMENT_REQUIRED)
        .count();

    assert_eq!(created, 3);
    assert_eq!(refused, 5);
    assert_eq!(harness.balance().await, 0);

    let list = harness
        .server
        .get("/v1/proposals")
        .add_header("x-user-id", harness.user_id_header())
        .await;
    assert_eq!(
        list.json::<serde_json::Value>()["proposals"]
            .as_array()
            .unwrap()
            .len(),
        3
    );
}

#[tokio::test]
async fn proposal_list_honors_offset() {
    let harness = TestHarness::new();
    harness.open_account().await;
    harness.top_up(3).await;

    let mut ids = Vec::new();
    for _ in 0..3 {
        // proposal IDs order by creation millisecond
        tokio::time::sleep(std::time::Duration::from_millis(2)).await;
        let response = generate(&harness, &brief()).await;
        response.assert_status(StatusCode::CREATED);
        ids.push(
            response.json::<serde_json::Value>()["proposal"]["id"]
                .as_str()
                .unwrap()
                .to_string(),
        );
    }

    let response = harness
        .server
        .get("/v1/proposals?limit=1&offset=1")
        .add_header("x-user-id", harness.user_id_header())
        .await;

    response.assert_status_ok();
    let body: serde_json::Value = response.json();
    let page = body["proposals"].as_array().unwrap();
    assert_eq!(page.len(), 1);
    // newest first, so offset 1 is the middle one
    assert_eq!(page[0]["id"], ids[1].as_str());
}
