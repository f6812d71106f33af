//! End-to-end pipeline tests against an in-process HTTP server.

use std::io::Read;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tiny_http::{Response, Server};

use overlayshot::{Overlay, OverlayConfig, SolidColor, Viewport};

/// One request the server saw.
#[derive(Debug, Clone)]
struct Recorded {
    url: String,
    content_type: String,
    body: Vec<u8>,
}

/// Start a recording HTTP server; `/upload` answers with a fixed body so the
/// result-notification chain has something to forward.
fn start_recording_server() -> (String, Arc<Mutex<Vec<Recorded>>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let addr = server.server_addr().to_ip().unwrap();
    let records: Arc<Mutex<Vec<Recorded>>> = Arc::new(Mutex::new(Vec::new()));

    let sink = Arc::clone(&records);
    std::thread::spawn(move || {
        for mut request in server.incoming_requests() {
            let url = request.url().to_string();
            let content_type = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Content-Type"))
                .map(|h| h.value.as_str().to_string())
                .unwrap_or_default();

            let mut body = Vec::new();
            let _ = request.as_reader().read_to_end(&mut body);

            sink.lock().unwrap().push(Recorded {
                url: url.clone(),
                content_type,
                body,
            });

            let reply = if url == "/upload" { "ok-primary" } else { "ok" };
            let _ = request.respond(Response::from_string(reply));
        }
    });

    (format!("http://{}", addr), records)
}

fn red_overlay(width: u32, height: u32) -> Overlay {
    let config = OverlayConfig {
        viewport: Viewport { width, height },
        refresh_rate_hz: 120,
        ..Default::default()
    };
    let source = Arc::new(SolidColor::new(width, height, [255, 0, 0, 255]));
    Overlay::new(config, source).expect("failed to create overlay")
}

/// Wait until the server has seen `n` requests, or panic after ~5s.
async fn wait_for_records(records: &Arc<Mutex<Vec<Recorded>>>, n: usize) {
    for _ in 0..100 {
        if records.lock().unwrap().len() >= n {
            return;
        }
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    panic!(
        "server saw {} requests, expected {}",
        records.lock().unwrap().len(),
        n
    );
}

fn contains_subslice(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

#[tokio::test(flavor = "multi_thread")]
async fn json_upload_and_result_notification() {
    let (base, records) = start_recording_server();

    let mut overlay = red_overlay(16, 8);
    let handle = overlay.handle();

    handle
        .post_message(&format!(
            r#"{{"request":{{"encoding":"png","quality":0,"correlation":"abc",
                "targetURL":"{base}/upload","targetField":"","resultURL":"{base}/result"}}}}"#
        ))
        .unwrap();

    let task = tokio::spawn(async move {
        overlay.run().await;
    });

    wait_for_records(&records, 2).await;
    handle.shutdown();
    task.await.unwrap();

    let seen = records.lock().unwrap().clone();
    let upload = seen.iter().find(|r| r.url == "/upload").expect("no upload");
    let result = seen.iter().find(|r| r.url == "/result").expect("no result");

    // Primary: JSON mode with a png data URI and the correlation id
    assert!(upload.content_type.starts_with("application/json"));
    let body: serde_json::Value = serde_json::from_slice(&upload.body).unwrap();
    assert_eq!(body["id"], "abc");
    let data_uri = body["data"].as_str().unwrap();
    assert!(data_uri.starts_with("data:image/png;base64,"));

    // The captured frame decodes back to solid red, exactly (png is lossless)
    let (mime, bytes) = overlayshot::delivery::data_uri_to_bytes(data_uri).unwrap();
    assert_eq!(mime, "image/png");
    let img = image::load_from_memory(&bytes).unwrap().into_rgba8();
    assert_eq!((img.width(), img.height()), (16, 8));
    assert!(img.pixels().all(|p| p.0 == [255, 0, 0, 255]));

    // Secondary: the primary response text, echoed with the same id
    let body: serde_json::Value = serde_json::from_slice(&result.body).unwrap();
    assert_eq!(body["id"], "abc");
    assert_eq!(body["data"], "ok-primary");
}

#[tokio::test(flavor = "multi_thread")]
async fn multipart_upload_carries_named_file() {
    let (base, records) = start_recording_server();

    let mut overlay = red_overlay(8, 8);
    let handle = overlay.handle();

    handle
        .post_message(&format!(
            r#"{{"request":{{"encoding":"jpg","quality":0.5,"correlation":"mp-1",
                "targetURL":"{base}/upload","targetField":"file","resultURL":""}}}}"#
        ))
        .unwrap();

    let task = tokio::spawn(async move {
        overlay.run().await;
    });

    wait_for_records(&records, 1).await;
    handle.shutdown();
    task.await.unwrap();

    let seen = records.lock().unwrap().clone();
    let upload = &seen[0];
    assert_eq!(upload.url, "/upload");
    assert!(upload.content_type.starts_with("multipart/form-data"));
    assert!(contains_subslice(&upload.body, b"name=\"file\""));
    assert!(contains_subslice(&upload.body, b"filename=\"screenshot.jpg\""));
    assert!(contains_subslice(&upload.body, b"image/jpeg"));
    // JPEG SOI marker somewhere in the part body
    assert!(contains_subslice(&upload.body, &[0xFF, 0xD8, 0xFF]));

    // No resultURL, so nothing else arrives
    tokio::time::sleep(Duration::from_millis(200)).await;
    assert_eq!(records.lock().unwrap().len(), 1);
}

#[tokio::test(flavor = "multi_thread")]
async fn second_request_replaces_unconsumed_first() {
    let (base, records) = start_recording_server();

    let mut overlay = red_overlay(8, 8);
    let handle = overlay.handle();

    // Both arrive before any frame is rendered; only the second may upload
    for correlation in ["first", "second"] {
        handle
            .post_message(&format!(
                r#"{{"request":{{"encoding":"png","correlation":"{correlation}",
                    "targetURL":"{base}/upload"}}}}"#
            ))
            .unwrap();
    }

    let task = tokio::spawn(async move {
        overlay.run().await;
    });

    wait_for_records(&records, 1).await;
    // Let a few more frames pass to prove the first request never surfaces
    tokio::time::sleep(Duration::from_millis(200)).await;
    handle.shutdown();
    task.await.unwrap();

    let seen = records.lock().unwrap().clone();
    assert_eq!(seen.len(), 1);
    let body: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
    assert_eq!(body["id"], "second");
}

#[tokio::test(flavor = "multi_thread")]
async fn resize_before_capture_changes_output_dimensions() {
    let (base, records) = start_recording_server();

    let mut overlay = red_overlay(16, 16);
    let handle = overlay.handle();

    handle.resize(Viewport { width: 6, height: 4 }).unwrap();
    handle
        .post_message(&format!(
            r#"{{"request":{{"encoding":"png","correlation":"rz","targetURL":"{base}/upload"}}}}"#
        ))
        .unwrap();

    let task = tokio::spawn(async move {
        overlay.run().await;
    });

    wait_for_records(&records, 1).await;
    handle.shutdown();
    task.await.unwrap();

    let seen = records.lock().unwrap().clone();
    let body: serde_json::Value = serde_json::from_slice(&seen[0].body).unwrap();
    let (_, bytes) =
        overlayshot::delivery::data_uri_to_bytes(body["data"].as_str().unwrap()).unwrap();
    let img = image::load_from_memory(&bytes).unwrap().into_rgba8();
    assert_eq!((img.width(), img.height()), (6, 4));
}
