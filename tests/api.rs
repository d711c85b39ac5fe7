use axum::{
    body::Body,
    http::{Request, StatusCode},
    Router,
};
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use tempfile::TempDir;
use tower::ServiceExt;

use fyyur::api::{router, AppState};
use fyyur::Store;

struct TestApp {
    _dir: TempDir,
    app: Router,
}

impl TestApp {
    fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let path = dir.path().join("fyyur.sqlite");
        Store::open(&path).expect("create database");
        Self {
            app: router(AppState::new(path)),
            _dir: dir,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value) {
        let response = self.app.clone().oneshot(request).await.expect("response");
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).expect("json body")
        };
        (status, body)
    }

    async fn get(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::get(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn delete(&self, uri: &str) -> (StatusCode, Value) {
        self.send(Request::delete(uri).body(Body::empty()).expect("request"))
            .await
    }

    async fn post(&self, uri: &str, body: Value) -> (StatusCode, Value) {
        self.send(
            Request::post(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .expect("request"),
        )
        .await
    }

    async fn create(&self, uri: &str, body: Value) -> i64 {
        let (status, created) = self.post(uri, body).await;
        assert_eq!(status, StatusCode::CREATED, "{created}");
        created["id"].as_i64().expect("created id")
    }
}

fn venue(name: &str, city: &str, state: &str) -> Value {
    json!({
        "name": name,
        "city": city,
        "state": state,
        "address": "1015 Folsom Street",
        "phone": "123-123-1234",
        "genres": ["Jazz", "Folk"],
        "website": "",
        "seeking_talent": "y",
    })
}

fn artist(name: &str) -> Value {
    json!({
        "name": name,
        "city": "San Francisco",
        "state": "CA",
        "phone": "326-123-5000",
        "genres": ["Rock n Roll"],
        "image_link": "https://img.example.com/artist.png",
    })
}

#[tokio::test]
async fn venue_lifecycle() {
    let app = TestApp::new();
    let hop = app
        .create("/venues/create", venue("The Musical Hop", "San Francisco", "CA"))
        .await;
    let petals = app.create("/artists/create", artist("Guns N Petals")).await;

    let upcoming = (Utc::now() + Duration::days(3)).to_rfc3339();
    let past = (Utc::now() - Duration::days(3)).to_rfc3339();
    for start_time in [&upcoming, &past] {
        app.create(
            "/shows/create",
            json!({ "artist_id": petals, "venue_id": hop, "start_time": start_time }),
        )
        .await;
    }

    let (status, detail) = app.get(&format!("/venues/{hop}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["name"], "The Musical Hop");
    assert_eq!(detail["website"], Value::Null);
    assert_eq!(detail["seeking_talent"], true);
    assert_eq!(detail["upcoming_shows_count"], 1);
    assert_eq!(detail["past_shows_count"], 1);
    assert_eq!(detail["upcoming_shows"][0]["artist_name"], "Guns N Petals");
    assert_eq!(
        detail["upcoming_shows"][0]["artist_image_link"],
        "https://img.example.com/artist.png"
    );

    let (status, page) = app.get(&format!("/venues/{hop}/edit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["id"], hop);
    assert_eq!(page["form"]["genres"], json!(["Jazz", "Folk"]));
    assert_eq!(page["form"]["seeking_talent"], "y");
    assert_eq!(page["form"]["website"], "");

    let mut edited = venue("The Musical Hop", "Oakland", "CA");
    edited["seeking_talent"] = Value::Null;
    let (status, body) = app.post(&format!("/venues/{hop}/edit"), edited).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "success": true }));

    let (_, areas) = app.get("/venues").await;
    assert_eq!(areas[0]["city"], "Oakland");
    assert_eq!(areas[0]["venues"][0]["num_upcoming_shows"], 1);

    let (status, body) = app.delete(&format!("/venues/{hop}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);

    let (status, body) = app.get(&format!("/venues/{hop}")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], "NOT_FOUND");

    let (_, shows) = app.get("/shows").await;
    assert_eq!(shows, json!([]));
}

#[tokio::test]
async fn created_records_are_confirmed_by_name() {
    let app = TestApp::new();
    let (status, body) = app
        .post("/venues/create", venue("  The Musical Hop ", "San Francisco", "CA"))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Venue The Musical Hop was successfully listed!");
    let hop = body["id"].as_i64().expect("venue id");

    let (_, body) = app.post("/artists/create", artist("Matt Quevedo")).await;
    assert_eq!(body["message"], "Artist Matt Quevedo was successfully listed!");
    let quevedo = body["id"].as_i64().expect("artist id");

    let (status, body) = app
        .post(
            "/shows/create",
            json!({
                "artist_id": quevedo,
                "venue_id": hop,
                "start_time": (Utc::now() + Duration::days(2)).to_rfc3339(),
            }),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["message"], "Show was successfully listed!");
}

#[tokio::test]
async fn malformed_requests_answer_with_error_body() {
    let app = TestApp::new();

    let (status, body) = app
        .post("/shows/create", json!({ "artist_id": 1, "venue_id": 1 }))
        .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "INVALID_REQUEST");
    assert!(body["message"].as_str().is_some_and(|m| !m.is_empty()));

    let (status, body) = app
        .send(
            Request::post("/venues/create")
                .header("content-type", "application/json")
                .body(Body::from("{not json"))
                .expect("request"),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");

    let (status, body) = app.get("/venues/the-musical-hop").await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "INVALID_REQUEST");
}

#[tokio::test]
async fn search_matches_partial_names() {
    let app = TestApp::new();
    app.create("/venues/create", venue("The Musical Hop", "San Francisco", "CA"))
        .await;
    app.create(
        "/venues/create",
        venue("Park Square Live Music & Coffee", "San Francisco", "CA"),
    )
    .await;
    app.create("/artists/create", artist("The Wild Sax Band")).await;

    let (status, results) = app
        .post("/venues/search", json!({ "search_term": "Hop" }))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(results["count"], 1);
    assert_eq!(results["data"][0]["name"], "The Musical Hop");
    assert_eq!(results["data"][0]["num_upcoming_shows"], 0);

    let (_, results) = app
        .post("/venues/search", json!({ "search_term": "MUSIC" }))
        .await;
    assert_eq!(results["count"], 2);

    let (_, results) = app.post("/venues/search", json!({})).await;
    assert_eq!(results["count"], 2);

    let (_, results) = app
        .post("/artists/search", json!({ "search_term": "band" }))
        .await;
    assert_eq!(results["count"], 1);
    assert_eq!(results["data"][0]["name"], "The Wild Sax Band");
}

#[tokio::test]
async fn invalid_submissions_are_rejected() {
    let app = TestApp::new();

    let mut nameless = venue("", "San Francisco", "CA");
    nameless["name"] = json!("   ");
    let (status, body) = app.post("/venues/create", nameless).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], "VALIDATION_ERROR");

    let (_, areas) = app.get("/venues").await;
    assert_eq!(areas, json!([]));

    let (status, body) = app
        .post(
            "/shows/create",
            json!({ "artist_id": 1, "venue_id": 1, "start_time": Utc::now().to_rfc3339() }),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], "PERSISTENCE_FAILED");
    assert_eq!(
        body["message"],
        "An error occurred. Show for artist 1 at venue 1 could not be listed."
    );

    let (status, _) = app.post("/artists/7/edit", artist("Nobody")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = app.delete("/artists/7").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn artist_pages() {
    let app = TestApp::new();
    let hop = app
        .create("/venues/create", venue("The Musical Hop", "San Francisco", "CA"))
        .await;
    let quevedo = app.create("/artists/create", artist("Matt Quevedo")).await;
    let sax = app.create("/artists/create", artist("The Wild Sax Band")).await;
    app.create(
        "/shows/create",
        json!({
            "artist_id": sax,
            "venue_id": hop,
            "start_time": (Utc::now() + Duration::days(1)).to_rfc3339(),
        }),
    )
    .await;

    let (_, listing) = app.get("/artists").await;
    assert_eq!(
        listing,
        json!([
            { "id": quevedo, "name": "Matt Quevedo" },
            { "id": sax, "name": "The Wild Sax Band" },
        ])
    );

    let (status, detail) = app.get(&format!("/artists/{sax}")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(detail["upcoming_shows"][0]["venue_id"], hop);
    assert_eq!(detail["upcoming_shows"][0]["venue_name"], "The Musical Hop");
    assert_eq!(detail["seeking_venue"], false);

    let (_, shows) = app.get("/shows").await;
    assert_eq!(shows[0]["artist_name"], "The Wild Sax Band");
    assert_eq!(shows[0]["venue_name"], "The Musical Hop");

    let (status, _) = app.delete(&format!("/artists/{sax}")).await;
    assert_eq!(status, StatusCode::OK);
    let (_, shows) = app.get("/shows").await;
    assert_eq!(shows, json!([]));

    let (status, page) = app.get(&format!("/artists/{quevedo}/edit")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(page["form"]["name"], "Matt Quevedo");
    assert_eq!(page["form"]["seeking_venue"], Value::Null);

    let (status, _) = app.get(&format!("/artists/{sax}/edit")).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
