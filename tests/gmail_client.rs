//! Drives `GmailClient` + `list_recent_emails` against a local stand-in for
//! the Gmail REST API.

use base64::Engine as _;
use base64::engine::general_purpose::URL_SAFE;
use std::thread::{self, JoinHandle};
use tiny_http::{Header, Response, Server};

use mail_helpers::mail::{GmailClient, MailApi, list_recent_emails};

struct Seen {
    url: String,
    authorization: Option<String>,
}

fn raw_message(id: &str) -> String {
    let rfc822 = format!(
        "From: Sender {id} <{id}@example.com>\r\nSubject: Hello {id}\r\n\r\nbody of {id}\r\n"
    );
    serde_json::json!({
        "id": id,
        "threadId": id,
        "snippet": format!("body of {id}"),
        "raw": URL_SAFE.encode(rfc822),
    })
    .to_string()
}

/// Serves `requests` requests: the message list returns `ids`, each message
/// fetch returns a small RFC 822 document, and any id in `failing` gets a 500.
fn spawn_stub(
    ids: &'static [&'static str],
    failing: &'static [&'static str],
    requests: usize,
) -> (String, JoinHandle<Vec<Seen>>) {
    let server = Server::http("127.0.0.1:0").unwrap();
    let base = format!("http://127.0.0.1:{}/gmail/v1", server.server_addr().port());

    let handle = thread::spawn(move || {
        let json = Header::from_bytes("Content-Type", "application/json").unwrap();
        let mut seen = Vec::new();
        for _ in 0..requests {
            let request = server.recv().unwrap();
            let url = request.url().to_string();
            let authorization = request
                .headers()
                .iter()
                .find(|h| h.field.equiv("Authorization"))
                .map(|h| h.value.as_str().to_string());

            let path = url.split('?').next().unwrap_or_default();
            let response = if path == "/gmail/v1/users/me/messages" {
                let messages: Vec<_> = ids
                    .iter()
                    .map(|id| serde_json::json!({"id": id, "threadId": id}))
                    .collect();
                let body = if messages.is_empty() {
                    serde_json::json!({"resultSizeEstimate": 0})
                } else {
                    serde_json::json!({"messages": messages, "resultSizeEstimate": ids.len()})
                };
                Response::from_string(body.to_string()).with_header(json.clone())
            } else if let Some(id) = path.strip_prefix("/gmail/v1/users/me/messages/") {
                if failing.contains(&id) {
                    Response::from_string("{\"error\": \"backend\"}").with_status_code(500)
                } else {
                    Response::from_string(raw_message(id)).with_header(json.clone())
                }
            } else {
                Response::from_string("not found").with_status_code(404)
            };

            request.respond(response).unwrap();
            seen.push(Seen { url, authorization });
        }
        seen
    });

    (base, handle)
}

#[test]
fn ten_requested_three_returned_in_order() {
    let (base, stub) = spawn_stub(&["m3", "m1", "m2"], &[], 4);
    let gmail = GmailClient::with_base_url(&base, "access-123");

    let out = list_recent_emails(&gmail, 10).unwrap();

    assert_eq!(out.len(), 3);
    assert_eq!(out[0].subject, "Hello m3");
    assert_eq!(out[1].subject, "Hello m1");
    assert_eq!(out[2].subject, "Hello m2");
    assert_eq!(out[0].from, "Sender m3 <m3@example.com>");
    assert_eq!(out[0].snippet, "body of m3");

    let seen = stub.join().unwrap();
    assert!(seen[0].url.contains("labelIds=INBOX"));
    assert!(seen[0].url.contains("maxResults=10"));
    assert_eq!(seen[1].url, "/gmail/v1/users/me/messages/m3?format=raw");
    assert!(
        seen.iter()
            .all(|s| s.authorization.as_deref() == Some("Bearer access-123"))
    );
}

#[test]
fn empty_label_lists_nothing() {
    let (base, stub) = spawn_stub(&[], &[], 1);
    let gmail = GmailClient::with_base_url(&base, "t");

    assert!(gmail.list_message_ids("INBOX", 10).unwrap().is_empty());
    stub.join().unwrap();
}

#[test]
fn server_error_on_one_message_fails_the_listing() {
    // list, m1 ok, m2 fails; m3 is never requested
    let (base, stub) = spawn_stub(&["m1", "m2", "m3"], &["m2"], 3);
    let gmail = GmailClient::with_base_url(&base, "t");

    let err = list_recent_emails(&gmail, 10).unwrap_err();
    let msg = format!("{err:#}");
    assert!(msg.contains("m2"), "{msg}");
    assert!(msg.contains("500"), "{msg}");

    let seen = stub.join().unwrap();
    assert_eq!(seen.len(), 3);
}

#[test]
fn trailing_slash_on_base_url_is_tolerated() {
    let (base, stub) = spawn_stub(&["only"], &[], 2);
    let gmail = GmailClient::with_base_url(format!("{base}/"), "t");

    let raw = gmail.get_raw_message("only").unwrap();
    assert_eq!(raw.id, "only");
    assert_eq!(raw.snippet.as_deref(), Some("body of only"));

    let ids = gmail.list_message_ids("INBOX", 1).unwrap();
    assert_eq!(ids, ["only"]);
    stub.join().unwrap();
}
