/// HTTP client tests against a local `tiny_http` server.
///
/// Each test binds its own server on an ephemeral port, serves a scripted
/// list of responses, and reports back the request paths it saw.
use std::net::TcpListener;
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use metricsview::analytics::logger;
use metricsview::client::logged::LoggedSource;
use metricsview::client::{FetchError, HttpMetricsClient, MetricsSource};
use metricsview::view::{MetricsView, ViewState};
use tiny_http::{Header, Response, Server, StatusCode};

/// Start a server that answers one request per scripted `(status, body)`.
fn serve(script: Vec<(u16, &'static str)>) -> (String, JoinHandle<Vec<String>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();

    let handle = thread::spawn(move || {
        let mut seen = Vec::new();
        for (status, body) in script {
            let Ok(request) = server.recv() else { break };
            seen.push(request.url().to_string());
            let header =
                Header::from_bytes("Content-Type", "application/json; charset=utf-8").unwrap();
            let response = Response::from_string(body)
                .with_header(header)
                .with_status_code(StatusCode(status));
            let _ = request.respond(response);
        }
        seen
    });

    (format!("http://{addr}"), handle)
}

fn client(base_url: &str) -> HttpMetricsClient {
    HttpMetricsClient::new(base_url, "/api/metrics", Duration::from_secs(5))
}

#[test]
fn fetch_parses_data_payload() {
    let (base, server) = serve(vec![(
        200,
        r#"{"data": {"case_count": 2, "uploaded_files": 8, "cache_hits": 3, "cache_misses": 1}}"#,
    )]);

    let snapshot = client(&base).fetch().unwrap();
    assert_eq!(snapshot.case_count, 2);
    assert_eq!(snapshot.uploaded_files, 8);
    assert_eq!(snapshot.task_count, 0);
    assert_eq!(snapshot.hit_rate(), 75);

    assert_eq!(server.join().unwrap(), vec!["/api/metrics".to_string()]);
}

#[test]
fn fetch_without_data_field_is_missing_data() {
    let (base, server) = serve(vec![(200, r#"{"status": "ok"}"#)]);
    assert_eq!(client(&base).fetch(), Err(FetchError::MissingData));
    server.join().unwrap();
}

#[test]
fn fetch_error_status_is_reported() {
    let (base, server) = serve(vec![(503, r#"{"error": "unavailable"}"#)]);
    assert_eq!(client(&base).fetch(), Err(FetchError::Status(503)));
    server.join().unwrap();
}

#[test]
fn fetch_malformed_body_is_decode_error() {
    let (base, server) = serve(vec![(200, "<html>oops</html>")]);
    assert!(matches!(client(&base).fetch(), Err(FetchError::Decode(_))));
    server.join().unwrap();
}

#[test]
fn fetch_connection_refused_is_transport_error() {
    // Grab a free port, then close it so nothing is listening.
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let result = client(&format!("http://127.0.0.1:{port}")).fetch();
    assert!(matches!(result, Err(FetchError::Transport(_))), "{result:?}");
}

#[test]
fn view_over_http_degrades_and_recovers() {
    let (base, server) = serve(vec![
        (200, r#"{"data": {"cache_hits": 1, "cache_misses": 1}}"#),
        (500, "{}"),
        (200, r#"{"data": {"cache_hits": 1, "cache_misses": 2}}"#),
    ]);

    let view = MetricsView::initialize(Arc::new(client(&base)));
    assert_eq!(view.hit_rate(), 50);

    view.refresh();
    assert_eq!(view.state(), ViewState::Empty);

    view.refresh();
    assert_eq!(view.hit_rate(), 33);

    assert_eq!(server.join().unwrap().len(), 3);
}

#[test]
fn logged_source_records_http_outcomes() {
    let dir = std::env::temp_dir().join(format!("metricsview-client-log-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    let log_path = dir.join("fetch-log.jsonl");

    let (base, server) = serve(vec![
        (200, r#"{"data": {"cache_hits": 9, "cache_misses": 1}}"#),
        (404, r#"{"error": "not found"}"#),
    ]);

    let source = LoggedSource::new(client(&base), log_path.clone());
    let view = MetricsView::initialize(Arc::new(source));
    view.refresh();
    server.join().unwrap();

    let entries = logger::read_entries(&log_path);
    assert_eq!(entries.len(), 2);
    assert!(entries[0].success);
    assert_eq!(entries[0].hit_rate, Some(90));
    assert_eq!(entries[0].url, format!("{base}/api/metrics"));
    assert!(!entries[1].success);
    assert_eq!(entries[1].error.as_deref(), Some("endpoint returned HTTP 404"));

    let _ = std::fs::remove_dir_all(&dir);
}
