use axum::{
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    routing::{get, post},
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use video_shorts::api_client::{VideoService, VideoServiceClient};
use video_shorts::auth;
use video_shorts::config::ClientConfig;
use video_shorts::error::{ApiError, ClientError};
use video_shorts::library::{LibraryState, VideoLibrary, SESSION_EXPIRED_MESSAGE};
use video_shorts::models::auth::{Session, UserIdentity};
use video_shorts::models::subtitle::SubtitleStyle;
use video_shorts::models::video::FilterName;
use video_shorts::session::SessionStore;

#[derive(Default)]
struct Recorded {
    authorization: Mutex<Vec<Option<String>>>,
    bodies: Mutex<Vec<Value>>,
}

type Shared = Arc<Recorded>;
type Reply = Result<Json<Value>, (StatusCode, Json<Value>)>;

fn record(state: &Recorded, headers: &HeaderMap, body: Option<Value>) {
    let auth = headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);
    state.authorization.lock().unwrap().push(auth);
    if let Some(body) = body {
        state.bodies.lock().unwrap().push(body);
    }
}

fn video(id: u32, created_at: &str) -> Value {
    json!({
        "id": id,
        "youtube_url": "https://youtu.be/abc",
        "title": format!("Video {}", id),
        "short_video_file": format!("http://localhost:8000/media/shorts/{}.mp4", id),
        "created_at": created_at,
        "updated_at": created_at,
    })
}

fn unauthorized() -> (StatusCode, Json<Value>) {
    (StatusCode::UNAUTHORIZED, Json(json!({"detail": "Unauthorized"})))
}

async fn login(Json(body): Json<Value>) -> Reply {
    if body["password"] == "secret" {
        Ok(Json(json!({
            "access": "access-token",
            "refresh": "refresh-token",
            "username": body["username"],
        })))
    } else {
        Err((StatusCode::UNAUTHORIZED, Json(json!({"detail": "Invalid credentials"}))))
    }
}

async fn register(Json(body): Json<Value>) -> Reply {
    if body["username"] == "taken" {
        return Err((StatusCode::BAD_REQUEST, Json(json!({"detail": "Username already exists"}))));
    }
    Ok(Json(json!({
        "access": "access-token",
        "refresh": "refresh-token",
        "username": body["username"],
    })))
}

async fn convert(State(state): State<Shared>, headers: HeaderMap, Json(body): Json<Value>) -> Reply {
    record(&state, &headers, Some(body));
    if headers.get("authorization").is_none() {
        return Err(unauthorized());
    }
    Ok(Json(video(42, "2024-05-01T10:00:00Z")))
}

async fn my_videos(State(state): State<Shared>, headers: HeaderMap) -> Reply {
    record(&state, &headers, None);
    match headers.get("authorization").and_then(|v| v.to_str().ok()) {
        None | Some("Bearer expired") => return Err(unauthorized()),
        Some(_) => {}
    }
    Ok(Json(json!([
        video(1, "2024-04-01T09:00:00Z"),
        video(3, "2024-06-01T09:00:00+02:00"),
        video(2, "2024-05-01T09:00:00Z"),
    ])))
}

async fn apply_filter(
    State(state): State<Shared>,
    Path(id): Path<String>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    record(&state, &headers, Some(body));
    if id == "500" {
        return Err((
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(json!({"detail": "Filter rendering failed"})),
        ));
    }
    let id: u32 = id.parse().unwrap_or(0);
    Ok(Json(video(id, "2024-05-01T10:00:00Z")))
}

async fn apply_subtitles(
    State(state): State<Shared>,
    Path(id): Path<u32>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    record(&state, &headers, Some(body));
    Ok(Json(video(id, "2024-05-01T10:00:00Z")))
}

async fn start_server() -> (String, Shared) {
    let state: Shared = Arc::new(Recorded::default());
    let router = Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/core/convert-video", post(convert))
        .route("/api/core/my-videos", get(my_videos))
        .route("/api/core/videos/:id/apply-filter", post(apply_filter))
        .route("/api/core/videos/:id/apply-subtitles", post(apply_subtitles))
        .route("/api/broken/core/my-videos", get(|| async { "not json" }))
        .route(
            "/api/slow/core/my-videos",
            get(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                "[]"
            }),
        )
        .with_state(state.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });

    (format!("http://{}/api", addr), state)
}

fn client(base_url: &str) -> (VideoServiceClient, Arc<SessionStore>) {
    let session = Arc::new(SessionStore::in_memory());
    let config = ClientConfig::new(base_url).unwrap();
    (VideoServiceClient::new(&config, session.clone()).unwrap(), session)
}

#[tokio::test]
async fn test_sign_in_stores_session_and_attaches_bearer() {
    let (base, recorded) = start_server().await;
    let (client, session) = client(&base);

    let signed_in = auth::sign_in(&client, &session, "mira", "secret").await.unwrap();
    assert_eq!(signed_in.user.username, "mira");
    assert_eq!(session.access_token().as_deref(), Some("access-token"));

    let job = client.create_job("https://youtu.be/abc").await.unwrap();
    assert_eq!(job.id, "42");
    assert_eq!(job.title.as_deref(), Some("Video 42"));

    assert_eq!(
        recorded.authorization.lock().unwrap().last().cloned().flatten().as_deref(),
        Some("Bearer access-token")
    );
    assert_eq!(
        recorded.bodies.lock().unwrap().last(),
        Some(&json!({"youtube_url": "https://youtu.be/abc"}))
    );
}

#[tokio::test]
async fn test_bad_credentials_are_an_auth_error() {
    let (base, _) = start_server().await;
    let (client, session) = client(&base);

    let err = auth::sign_in(&client, &session, "mira", "wrong").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api(ApiError::Auth(ref message)) if message == "Invalid credentials"
    ));
    assert!(session.get_session().is_none());
}

#[tokio::test]
async fn test_register_confirms_username() {
    let (base, _) = start_server().await;
    let (client, session) = client(&base);

    let registration = auth::sign_up(&client, "newbie", "secret").await.unwrap();
    assert_eq!(registration.username, "newbie");
    assert!(session.get_session().is_none());

    let err = auth::sign_up(&client, "taken", "secret").await.unwrap_err();
    assert!(matches!(
        err,
        ClientError::Api(ApiError::Validation(ref message)) if message == "Username already exists"
    ));
}

#[tokio::test]
async fn test_requests_without_session_are_rejected() {
    let (base, recorded) = start_server().await;
    let (client, _session) = client(&base);

    let err = client.list_jobs().await.unwrap_err();
    assert_eq!(err, ApiError::Auth("Unauthorized".into()));
    assert_eq!(recorded.authorization.lock().unwrap().as_slice(), &[None]);
}

#[tokio::test]
async fn test_list_jobs_is_newest_first() {
    let (base, _) = start_server().await;
    let (client, session) = client(&base);
    auth::sign_in(&client, &session, "mira", "secret").await.unwrap();

    let ids: Vec<String> = client.list_jobs().await.unwrap().into_iter().map(|j| j.id).collect();
    assert_eq!(ids, vec!["3", "2", "1"]);
}

#[tokio::test]
async fn test_filter_and_subtitle_payloads() {
    let (base, recorded) = start_server().await;
    let (client, session) = client(&base);
    auth::sign_in(&client, &session, "mira", "secret").await.unwrap();

    let job = client.apply_filter("42", FilterName::Sepia).await.unwrap();
    assert_eq!(job.id, "42");
    assert_eq!(
        recorded.bodies.lock().unwrap().last(),
        Some(&json!({"filter_name": "sepia"}))
    );

    client
        .apply_subtitle_style("42", &SubtitleStyle::default())
        .await
        .unwrap();
    assert_eq!(
        recorded.bodies.lock().unwrap().last(),
        Some(&json!({"font": "Roboto", "fontsize": 80, "bold": 400, "color": "#FF0000"}))
    );
}

#[tokio::test]
async fn test_server_failure_maps_to_remote_service_error() {
    let (base, _) = start_server().await;
    let (client, session) = client(&base);
    auth::sign_in(&client, &session, "mira", "secret").await.unwrap();

    let err = client.apply_filter("500", FilterName::Warm).await.unwrap_err();
    assert_eq!(
        err,
        ApiError::RemoteService {
            status: Some(500),
            message: "Filter rendering failed".into()
        }
    );
}

#[tokio::test]
async fn test_malformed_body_is_a_remote_service_error() {
    let (base, _) = start_server().await;
    let (client, _session) = client(&format!("{}/broken", base));

    let err = client.list_jobs().await.unwrap_err();
    assert!(matches!(err, ApiError::RemoteService { status: Some(200), .. }));
}

#[tokio::test]
async fn test_hung_request_times_out_as_network_error() {
    let (base, _) = start_server().await;
    let session = Arc::new(SessionStore::in_memory());
    let config = ClientConfig::new(&format!("{}/slow", base))
        .unwrap()
        .with_timeout(Duration::from_millis(50));
    let client = VideoServiceClient::new(&config, session).unwrap();

    let err = client.list_jobs().await.unwrap_err();
    assert!(
        matches!(err, ApiError::Network(ref message) if message.starts_with("Request timed out")),
        "{:?}",
        err
    );
}

#[tokio::test]
async fn test_unreachable_service_is_a_network_error() {
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);

    let (client, _session) = client(&format!("http://{}/api/", addr));
    let err = client.create_job("https://youtu.be/abc").await.unwrap_err();
    assert!(matches!(err, ApiError::Network(_)));
}

#[tokio::test]
async fn test_library_forces_logout_on_auth_failure() {
    let (base, _) = start_server().await;
    let (client, session) = client(&base);
    let service: Arc<dyn VideoService> = Arc::new(client);
    let library = VideoLibrary::new(service.clone(), session.clone());

    auth::sign_in(service.as_ref(), &session, "mira", "secret").await.unwrap();
    match library.load().await {
        LibraryState::Loaded(jobs) => assert_eq!(jobs.len(), 3),
        other => panic!("unexpected {:?}", other),
    }

    // The store still holds a session but the server refuses its token.
    session
        .set_session(Session {
            access_token: "expired".into(),
            refresh_token: "refresh-token".into(),
            user: UserIdentity {
                username: "mira".into(),
            },
        })
        .unwrap();
    assert_eq!(
        library.load().await,
        LibraryState::Unavailable(SESSION_EXPIRED_MESSAGE.to_string())
    );
    assert!(session.get_session().is_none());
}
