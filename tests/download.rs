use std::fs;
use std::time::Duration;

use gyazo_drain::api::build_http_client;
use gyazo_drain::download::{DownloadProgress, Downloader};
use tempfile::TempDir;
use tokio::runtime::Runtime;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn serve_bytes(rt: &Runtime, route: &str, status: u16, body: Vec<u8>) -> MockServer {
    let server = rt.block_on(MockServer::start());
    rt.block_on(
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(status).set_body_bytes(body))
            .mount(&server),
    );
    server
}

#[test]
fn download_writes_the_whole_body() {
    let rt = Runtime::new().unwrap();
    let body: Vec<u8> = (0..300_000u32).map(|i| (i % 251) as u8).collect();
    let server = serve_bytes(&rt, "/a.png", 200, body.clone());
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("a.png");

    let downloader = Downloader::new(build_http_client().unwrap());
    let bytes = downloader
        .download(&format!("{}/a.png", server.uri()), &dest, &mut |_: &DownloadProgress| {})
        .unwrap();

    assert_eq!(bytes, body.len() as u64);
    assert_eq!(fs::read(&dest).unwrap(), body);
}

#[test]
fn progress_is_reported_with_known_total() {
    let rt = Runtime::new().unwrap();
    let body = vec![7u8; 200_000];
    let server = serve_bytes(&rt, "/b.jpg", 200, body.clone());
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("b.jpg");

    let downloader = Downloader::new(build_http_client().unwrap()).with_interval(Duration::ZERO);
    let mut seen: Vec<DownloadProgress> = Vec::new();
    downloader
        .download(&format!("{}/b.jpg", server.uri()), &dest, &mut |p: &DownloadProgress| seen.push(*p))
        .unwrap();

    assert!(!seen.is_empty());
    assert!(seen.iter().all(|p| p.total == Some(200_000)));
    assert!(seen.windows(2).all(|w| w[0].transferred < w[1].transferred));
    assert_eq!(seen.last().map(|p| p.transferred), Some(200_000));
}

#[test]
fn error_status_fails_the_download() {
    let rt = Runtime::new().unwrap();
    let server = serve_bytes(&rt, "/gone.png", 404, Vec::new());
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("gone.png");

    let downloader = Downloader::new(build_http_client().unwrap());
    let err = downloader
        .download(&format!("{}/gone.png", server.uri()), &dest, &mut |_: &DownloadProgress| {})
        .unwrap_err();

    assert!(err.to_string().contains("404"));
    assert!(!dest.exists());
}

#[test]
fn unreachable_host_fails_the_download() {
    let dir = TempDir::new().unwrap();
    let dest = dir.path().join("x.png");

    let downloader = Downloader::new(build_http_client().unwrap());
    // port 9 (discard) on localhost is closed in test environments
    let result = downloader.download("http://127.0.0.1:9/x.png", &dest, &mut |_: &DownloadProgress| {});

    assert!(result.is_err());
}
