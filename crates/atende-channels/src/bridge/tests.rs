use super::codec::{decode_line, BridgeCommand, Decoded};
use super::BridgeClient;
use atende_core::{
    config::BridgeConfig, event::ClientEvent, session::SessionCredentials,
    traits::WhatsAppClient,
};
use serde_json::{json, Value};
use std::time::Duration;

fn event(line: &str) -> ClientEvent {
    match decode_line(line) {
        Some(Decoded::Event(e)) => e,
        other => panic!("expected event, got {other:?}"),
    }
}

#[test]
fn test_decode_lifecycle_events() {
    assert!(matches!(
        event(r#"{"type":"qr","data":"2@abc"}"#),
        ClientEvent::CodeReady(code) if code == "2@abc"
    ));
    assert!(matches!(event(r#"{"type":"ready"}"#), ClientEvent::Ready));
    assert!(matches!(
        event(r#"{"type":"disconnected","reason":"NAVIGATION"}"#),
        ClientEvent::Disconnected(r) if r == "NAVIGATION"
    ));
    assert!(matches!(
        event(r#"{"type":"auth_failure","message":"bad token"}"#),
        ClientEvent::AuthFailure(m) if m == "bad token"
    ));
    assert!(matches!(
        event(r#"{"type":"error","message":"page crashed"}"#),
        ClientEvent::Error(m) if m == "page crashed"
    ));
}

#[test]
fn test_decode_authenticated_with_and_without_session() {
    match event(r#"{"type":"authenticated","session":{"WABrowserId":"b"}}"#) {
        ClientEvent::Authenticated(Some(v)) => assert_eq!(v["WABrowserId"], "b"),
        other => panic!("unexpected {other:?}"),
    }
    assert!(matches!(
        event(r#"{"type":"authenticated","session":null}"#),
        ClientEvent::Authenticated(None)
    ));
    assert!(matches!(
        event(r#"{"type":"authenticated"}"#),
        ClientEvent::Authenticated(None)
    ));
}

#[test]
fn test_decode_message() {
    let line = r#"{"type":"message","id":"ABC","from":"5511999999999@c.us","body":"oi","push_name":"Maria Silva"}"#;
    match event(line) {
        ClientEvent::Message(msg) => {
            assert_eq!(msg.sender_id, "5511999999999@c.us");
            assert_eq!(msg.chat_id, "5511999999999@c.us");
            assert_eq!(msg.text, "oi");
            assert_eq!(msg.first_name(), Some("Maria"));
            assert!(msg.is_individual());
            assert!(!msg.is_group);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_decode_group_message_and_blank_name() {
    let line = r#"{"type":"message","from":"120363@g.us","chat":"120363@g.us","body":"1","push_name":"  ","is_group":true}"#;
    match event(line) {
        ClientEvent::Message(msg) => {
            assert!(msg.is_group);
            assert!(!msg.is_individual());
            assert_eq!(msg.sender_name, None);
        }
        other => panic!("unexpected {other:?}"),
    }
}

#[test]
fn test_decode_noise() {
    assert!(decode_line("").is_none());
    assert!(decode_line("   ").is_none());
    assert!(matches!(
        decode_line("[bridge] launching chromium"),
        Some(Decoded::Output(_))
    ));
    assert!(matches!(
        decode_line(r#"{"type":"loading_screen","percent":50}"#),
        Some(Decoded::Unrecognized(_))
    ));
    assert!(matches!(
        decode_line(r#"{"type":"qr"}"#),
        Some(Decoded::Unrecognized(_))
    ));
}

#[test]
fn test_encode_commands() {
    let line = BridgeCommand::Send {
        to: "5511@c.us",
        text: "Olá",
    }
    .to_line()
    .unwrap();
    assert!(line.ends_with('\n'));
    let v: Value = serde_json::from_str(line.trim()).unwrap();
    assert_eq!(v, json!({"type": "send", "to": "5511@c.us", "text": "Olá"}));

    let v: Value =
        serde_json::from_str(&BridgeCommand::Typing { chat: "c" }.to_line().unwrap()).unwrap();
    assert_eq!(v, json!({"type": "typing", "chat": "c"}));

    let v: Value = serde_json::from_str(&BridgeCommand::Shutdown.to_line().unwrap()).unwrap();
    assert_eq!(v, json!({"type": "shutdown"}));
}

#[test]
fn test_encode_initialize_session() {
    let creds = SessionCredentials::placeholder();
    let line = BridgeCommand::Initialize {
        session: Some(&creds),
    }
    .to_line()
    .unwrap();
    let v: Value = serde_json::from_str(&line).unwrap();
    assert_eq!(v["type"], "initialize");
    assert_eq!(v["session"]["WABrowserId"], creds.browser_id);
    assert_eq!(v["session"]["WAToken2"], creds.token2);

    let v: Value = serde_json::from_str(
        &BridgeCommand::Initialize { session: None }.to_line().unwrap(),
    )
    .unwrap();
    assert_eq!(v, json!({"type": "initialize", "session": null}));
}

#[test]
fn test_command_line() {
    let client = BridgeClient::new(BridgeConfig {
        command: "node".into(),
        script: "/opt/bridge/bridge.js".into(),
        args: vec!["--headless".into()],
    });
    assert_eq!(
        client.command_line(),
        vec!["node", "/opt/bridge/bridge.js", "--headless"]
    );

    let bare = BridgeClient::new(BridgeConfig {
        command: "wa-bridge".into(),
        script: String::new(),
        args: vec![],
    });
    assert_eq!(bare.command_line(), vec!["wa-bridge"]);
}

async fn next(rx: &mut tokio::sync::mpsc::Receiver<ClientEvent>) -> Option<ClientEvent> {
    tokio::time::timeout(Duration::from_secs(5), rx.recv())
        .await
        .expect("timed out waiting for bridge event")
}

/// Fake bridge: a shell script speaking the line protocol.
fn shell_bridge(script: &str) -> BridgeClient {
    BridgeClient::new(BridgeConfig {
        command: "sh".into(),
        script: String::new(),
        args: vec!["-c".into(), script.into()],
    })
}

#[tokio::test]
async fn test_bridge_process_roundtrip() {
    let client = shell_bridge(
        r#"read init
case "$init" in *'"type":"initialize"'*) ;; *) exit 1 ;; esac
echo "bridge booting"
echo '{"type":"qr","data":"2@xyz"}'
echo '{"type":"ready"}'
read cmd
case "$cmd" in *'"type":"send"'*) echo '{"type":"message","from":"echo@c.us","body":"ack"}' ;; esac
read bye"#,
    );

    let mut rx = client.initialize(None).await.unwrap();
    assert!(client.is_running().await);

    assert!(matches!(next(&mut rx).await, Some(ClientEvent::CodeReady(c)) if c == "2@xyz"));
    assert!(matches!(next(&mut rx).await, Some(ClientEvent::Ready)));

    client.send_message("echo@c.us", "hello").await.unwrap();
    match next(&mut rx).await {
        Some(ClientEvent::Message(msg)) => assert_eq!(msg.text, "ack"),
        other => panic!("unexpected {other:?}"),
    }

    client.stop().await.unwrap();
    assert!(!client.is_running().await);
    assert!(next(&mut rx).await.is_none());
}

#[tokio::test]
async fn test_spawn_failure_is_client_error() {
    let client = BridgeClient::new(BridgeConfig {
        command: "/nonexistent/__atende_bridge__".into(),
        script: String::new(),
        args: vec![],
    });
    let err = client.initialize(None).await.unwrap_err();
    assert!(err.to_string().contains("failed to spawn bridge"));
    assert!(!client.is_running().await);
}

#[tokio::test]
async fn test_send_without_process_fails() {
    let client = shell_bridge("true");
    assert!(client.send_message("x@c.us", "hi").await.is_err());
    assert!(client.stop().await.is_ok());
}
