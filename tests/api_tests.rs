use std::sync::Arc;

use async_trait::async_trait;
use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode};
use serde_json::{Value, json};
use tower::ServiceExt;

use pizza_ranking::app::build_router;
use pizza_ranking::rows::{data_rows, mapping_range, ratings_range, spots_range};
use pizza_ranking::{
    GatewayError, RankingService, Row, SheetGateway, SheetRange, Workbook, WorkbookGateway,
};

fn row(cells: &[&str]) -> Row {
    cells.iter().map(|c| c.to_string()).collect()
}

fn setup() -> (Arc<WorkbookGateway>, Router) {
    let mut workbook = Workbook::bootstrap();
    workbook
        .append(
            &spots_range(),
            vec![
                row(&["Joes", "7 Carmine St", "Classic slice"]),
                row(&["Lucali", "575 Henry St", "Candlelit pies"]),
            ],
        )
        .unwrap();
    workbook
        .append(&mapping_range(), vec![row(&["known", "Ann"])])
        .unwrap();

    let gateway = Arc::new(WorkbookGateway::in_memory(workbook));
    let app = build_router(Arc::new(RankingService::new(gateway.clone())));
    (gateway, app)
}

fn post_json(uri: &str, body: Value) -> Request<Body> {
    Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

fn get(uri: &str) -> Request<Body> {
    Request::builder().uri(uri).body(Body::empty()).unwrap()
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, body)
}

fn rating(user_key: &str, spot: &str, notes: &str, scores: [f64; 4]) -> Value {
    json!({
        "userKey": user_key,
        "spotName": spot,
        "notes": notes,
        "ratings": {
            "crust": scores[0],
            "sauce": scores[1],
            "cheese": scores[2],
            "flavor": scores[3],
        }
    })
}

#[tokio::test]
async fn repeated_submission_updates_the_same_row() {
    let (gateway, app) = setup();

    for _ in 0..2 {
        let (status, body) = send(
            &app,
            post_json("/submit-rating", rating("known", "Joes", "thin crust", [7.0, 6.0, 8.0, 7.0])),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "message": "Rating submitted successfully!" }));
    }

    let rows = gateway.get(&ratings_range()).await.unwrap();
    let data = data_rows(&rows);
    assert_eq!(data.len(), 1);
    assert_eq!(data[0][2], "Ann");
    assert_eq!(data[0][7], "thin crust\nthin crust");

    let (_, rating) = send(&app, get("/get-rating?userKey=known&spotName=Joes")).await;
    assert_eq!(
        rating,
        json!({
            "ratings": { "crust": 7.0, "sauce": 6.0, "cheese": 8.0, "flavor": 7.0 },
            "notes": "thin crust\nthin crust",
        })
    );
}

#[tokio::test]
async fn submission_accepts_legacy_field_names() {
    let (gateway, app) = setup();

    let body = json!({
        "clientUID": "legacy",
        "spotName": "Lucali",
        "user": "Old Client",
        "notes": "",
        "ratings": { "crust": "8", "sauce": 7, "cheese": 6, "flavor": 9 }
    });
    let (status, _) = send(&app, post_json("/submit-rating", body)).await;
    assert_eq!(status, StatusCode::OK);

    let rows = gateway.get(&ratings_range()).await.unwrap();
    assert_eq!(
        data_rows(&rows)[0][..7],
        row(&["legacy", "Lucali", "Old Client", "8", "7", "6", "9"])[..]
    );

    let spots = gateway.get(&spots_range()).await.unwrap();
    assert_eq!(spots[2].get(4).map(String::as_str), Some("TRUE"));
}

#[tokio::test]
async fn leaderboard_averages_and_orders_spots() {
    let (_, app) = setup();

    let submissions = [
        rating("a", "Joes", "", [3.0, 4.0, 5.0, 6.0]),
        rating("b", "Joes", "", [7.0, 6.0, 5.0, 4.0]),
        rating("a", "Lucali", "", [6.0, 6.0, 6.0, 6.0]),
    ];
    for body in submissions {
        let (status, _) = send(&app, post_json("/submit-rating", body)).await;
        assert_eq!(status, StatusCode::OK);
    }

    let (status, board) = send(&app, get("/get-leaderboard")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        board,
        json!([
            {
                "spotName": "Lucali",
                "averageScore": 24.0,
                "averageCrust": 6.0,
                "averageSauce": 6.0,
                "averageCheese": 6.0,
                "averageOverallFlavor": 6.0,
            },
            {
                "spotName": "Joes",
                "averageScore": 20.0,
                "averageCrust": 5.0,
                "averageSauce": 5.0,
                "averageCheese": 5.0,
                "averageOverallFlavor": 5.0,
            },
        ])
    );
}

#[tokio::test]
async fn get_rating_defaults_unusable_scores_to_five() {
    let (gateway, app) = setup();
    gateway
        .append(
            &ratings_range(),
            vec![row(&["known", "Joes", "Ann", "n/a", "7", "", "9", "ok"])],
        )
        .await
        .unwrap();

    let (status, body) = send(&app, get("/get-rating?userKey=known&spotName=Joes")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ratings"]["crust"], json!(5.0));
    assert_eq!(body["ratings"]["sauce"], json!(7.0));
    assert_eq!(body["ratings"]["cheese"], json!(5.0));

    let (_, missing) = send(&app, get("/get-rating?userKey=known&spotName=Lucali")).await;
    assert_eq!(missing, json!({ "ratings": null, "notes": "" }));
}

#[tokio::test]
async fn get_username_registers_placeholder_once() {
    let (gateway, app) = setup();

    let (_, first) = send(&app, post_json("/get-username", json!({ "userKey": "fresh" }))).await;
    let (_, second) = send(&app, post_json("/get-username", json!({ "userKey": "fresh" }))).await;
    assert_eq!(first, json!({ "userName": "Click to Edit Name" }));
    assert_eq!(second, first);

    let rows = gateway.get(&mapping_range()).await.unwrap();
    let fresh: Vec<_> = data_rows(&rows).iter().filter(|r| r[0] == "fresh").collect();
    assert_eq!(fresh.len(), 1);

    let (_, known) = send(&app, post_json("/get-username", json!({ "userKey": "known" }))).await;
    assert_eq!(known, json!({ "userName": "Ann" }));
}

#[tokio::test]
async fn set_name_then_submission_uses_it() {
    let (gateway, app) = setup();

    let (status, body) = send(
        &app,
        post_json("/set-name", json!({ "userKey": "newbie", "userName": "Sal" })),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Name set successfully!" }));

    send(&app, post_json("/submit-rating", rating("newbie", "Joes", "", [5.0; 4]))).await;
    let rows = gateway.get(&ratings_range()).await.unwrap();
    assert_eq!(data_rows(&rows)[0][2], "Sal");
}

#[tokio::test]
async fn verify_code_distinguishes_known_keys() {
    let (_, app) = setup();

    let (status, body) = send(&app, post_json("/verify-code", json!({ "userCode": "known" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "valid": true }));

    let (status, body) = send(&app, post_json("/verify-code", json!({ "userCode": "nobody" }))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "valid": false }));
}

#[tokio::test]
async fn update_ranked_on_unknown_spot_fails_without_writing() {
    let (gateway, app) = setup();
    let before = gateway.snapshot().unwrap();

    let (status, body) = send(&app, post_json("/update-ranked", json!({ "spotName": "Nowhere" }))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to update ranked status." }));
    assert_eq!(gateway.snapshot().unwrap(), before);

    let (status, body) = send(&app, post_json("/update-ranked", json!({ "spotName": "Lucali" }))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "message": "Ranked status updated successfully!" }));
}

#[tokio::test]
async fn spots_and_history_for_a_user() {
    let (_, app) = setup();
    send(&app, post_json("/submit-rating", rating("known", "Joes", "", [8.0, 7.0, 6.0, 5.0]))).await;
    send(&app, post_json("/submit-rating", rating("other", "Lucali", "", [1.0; 4]))).await;

    let (status, listing) = send(&app, get("/get-spots?userKey=known")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(listing["spots"].as_array().map(Vec::len), Some(2));
    assert_eq!(
        listing["spots"][0],
        json!({ "spotName": "Joes", "address": "7 Carmine St", "description": "Classic slice" })
    );
    assert_eq!(
        listing["responses"],
        json!([{ "spotName": "Joes", "crust": "8", "sauce": "7" }])
    );

    let (status, history) = send(&app, get("/get-user-ratings?clientUID=known")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        history,
        json!([{
            "spotName": "Joes",
            "crust": "8",
            "sauce": "7",
            "cheese": "6",
            "overallFlavor": "5",
        }])
    );
}

struct BrokenGateway;

#[async_trait]
impl SheetGateway for BrokenGateway {
    async fn get(&self, range: &SheetRange) -> Result<Vec<Row>, GatewayError> {
        Err(GatewayError::SheetNotFound(range.sheet.clone()))
    }

    async fn update(&self, range: &SheetRange, _values: Vec<Row>) -> Result<(), GatewayError> {
        Err(GatewayError::SheetNotFound(range.sheet.clone()))
    }

    async fn append(&self, range: &SheetRange, _values: Vec<Row>) -> Result<(), GatewayError> {
        Err(GatewayError::SheetNotFound(range.sheet.clone()))
    }
}

#[tokio::test]
async fn store_failures_become_generic_500s() {
    let app = build_router(Arc::new(RankingService::new(Arc::new(BrokenGateway))));

    let cases = [
        (post_json("/submit-rating", rating("u", "Joes", "", [5.0; 4])), "Failed to submit rating."),
        (get("/get-user-ratings?userKey=u"), "Failed to fetch user ratings."),
        (post_json("/set-name", json!({ "userKey": "u", "userName": "x" })), "Failed to set name."),
        (post_json("/get-username", json!({ "userKey": "u" })), "Failed to fetch username."),
        (get("/get-rating?userKey=u&spotName=Joes"), "Failed to fetch ratings."),
        (get("/get-spots?userKey=u"), "Failed to fetch spots"),
        (post_json("/update-ranked", json!({ "spotName": "Joes" })), "Failed to update ranked status."),
        (get("/get-leaderboard"), "Failed to fetch leaderboard."),
        (post_json("/verify-code", json!({ "userCode": "u" })), "Failed to verify code."),
    ];

    for (request, expected) in cases {
        let (status, body) = send(&app, request).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR, "{expected}");
        assert_eq!(body, json!({ "error": expected }));
    }
}

#[tokio::test]
async fn undecodable_bodies_become_json_500s() {
    let (gateway, app) = setup();
    let before = gateway.snapshot().unwrap();

    let wrong_type = json!({
        "userKey": "known",
        "spotName": "Joes",
        "ratings": { "crust": true }
    });
    let (status, body) = send(&app, post_json("/submit-rating", wrong_type)).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to submit rating." }));

    let (status, body) = send(&app, post_json("/verify-code", json!({}))).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to verify code." }));

    let broken = Request::builder()
        .method("POST")
        .uri("/set-name")
        .header("content-type", "application/json")
        .body(Body::from("{\"userKey\": "))
        .unwrap();
    let (status, body) = send(&app, broken).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to set name." }));

    let no_content_type = Request::builder()
        .method("POST")
        .uri("/update-ranked")
        .body(Body::from(json!({ "spotName": "Joes" }).to_string()))
        .unwrap();
    let (status, body) = send(&app, no_content_type).await;
    assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body, json!({ "error": "Failed to update ranked status." }));

    assert_eq!(gateway.snapshot().unwrap(), before);
}
