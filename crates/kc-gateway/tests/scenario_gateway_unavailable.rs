//! Gateway client failure mapping.
//!
//! - a non-zero exit is "unavailable" regardless of stdout
//! - missing binary, timeout, empty and malformed output are "unavailable" too
//! - approve maps every failure to `false`
//! - unrecognized shapes are empty, not errors

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use kc_gateway::{CommandOutput, CommandRunner, GatewayClient, GatewayError};

struct Canned {
    replies: Mutex<VecDeque<Result<CommandOutput, GatewayError>>>,
    calls: Mutex<Vec<Vec<String>>>,
}

impl Canned {
    fn new(replies: Vec<Result<CommandOutput, GatewayError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl CommandRunner for Canned {
    fn program(&self) -> &str {
        "openclaw"
    }

    async fn run(&self, args: &[&str]) -> Result<CommandOutput, GatewayError> {
        self.calls
            .lock()
            .unwrap()
            .push(args.iter().map(|a| a.to_string()).collect());
        self.replies
            .lock()
            .unwrap()
            .pop_front()
            .expect("unexpected extra gateway call")
    }
}

#[tokio::test]
async fn non_zero_exit_is_unavailable_even_with_valid_stdout() {
    let client = GatewayClient::new(Canned::new(vec![
        Ok(CommandOutput::failed(1, r#"[{"status": "online"}]"#, "boom")),
        Ok(CommandOutput::failed(1, r#"{"requests": [{"id": "r1"}]}"#, "boom")),
    ]));

    let err = client.list_nodes().await.unwrap_err();
    assert!(matches!(err, GatewayError::NonZeroExit { code: Some(1), .. }));
    assert!(client.list_pending().await.is_err());
}

#[tokio::test]
async fn transport_failures_are_unavailable() {
    let client = GatewayClient::new(Canned::new(vec![
        Err(GatewayError::NotFound {
            program: "openclaw".to_string(),
        }),
        Err(GatewayError::Timeout {
            command: "openclaw nodes pending --json".to_string(),
            secs: 30,
        }),
        Ok(CommandOutput::ok("")),
        Ok(CommandOutput::ok("not json at all")),
    ]));

    assert!(client.list_pending().await.is_err());
    assert!(client.list_pending().await.is_err());
    assert!(matches!(
        client.list_pending().await,
        Err(GatewayError::EmptyOutput { .. })
    ));
    assert!(matches!(
        client.list_nodes().await,
        Err(GatewayError::InvalidJson { .. })
    ));
}

#[tokio::test]
async fn unrecognized_shape_is_empty_not_error() {
    let client = GatewayClient::new(Canned::new(vec![
        Ok(CommandOutput::ok(r#"{"items": [{"id": "r1"}]}"#)),
        Ok(CommandOutput::ok(r#""just a string""#)),
    ]));

    assert!(client.list_pending().await.unwrap().is_empty());
    assert!(client.list_nodes().await.unwrap().is_empty());
}

#[tokio::test]
async fn pending_shapes_produce_identical_requests() {
    let body = r#"[{"id": "r1", "description": "abc123"}, {"requestId": "r2"}]"#;
    let client = GatewayClient::new(Canned::new(vec![
        Ok(CommandOutput::ok(body)),
        Ok(CommandOutput::ok(format!(r#"{{"nodes": {body}}}"#))),
        Ok(CommandOutput::ok(format!(r#"{{"requests": {body}}}"#))),
    ]));

    let bare = client.list_pending().await.unwrap();
    let nodes = client.list_pending().await.unwrap();
    let requests = client.list_pending().await.unwrap();

    assert_eq!(bare, nodes);
    assert_eq!(nodes, requests);
    assert_eq!(bare[0].request_id.as_deref(), Some("r1"));
    assert_eq!(bare[1].request_id.as_deref(), Some("r2"));

    let calls = client.runner().calls.lock().unwrap();
    assert!(calls
        .iter()
        .all(|c| c == &["nodes", "pending", "--json"]));
}

#[tokio::test]
async fn approve_reports_bool() {
    let client = GatewayClient::new(Canned::new(vec![
        Ok(CommandOutput::ok("")),
        Ok(CommandOutput::failed(1, "", "unknown request")),
        Err(GatewayError::NotFound {
            program: "openclaw".to_string(),
        }),
    ]));

    assert!(client.approve("r1").await);
    assert!(!client.approve("r1").await);
    assert!(!client.approve("r1").await);

    let calls = client.runner().calls.lock().unwrap();
    assert_eq!(calls[0], vec!["nodes", "approve", "r1"]);
}
