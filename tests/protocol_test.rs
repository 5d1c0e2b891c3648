//! Message protocol tests: every coordinator message answers exactly once
//! on every branch.
//!
//! Run with: cargo test --test protocol_test

use std::sync::Arc;

use pagesmith::protocol::{coordinator_router, Routed, Router, SenderContext, SurfaceEvent};
use pagesmith::registry::{Coordinator, MemoryStyleTarget, MemoryUserScripts, RegistrationStore};
use serde_json::{json, Value};
use tokio::sync::mpsc;

struct Fixture {
    store: Arc<MemoryUserScripts>,
    styles: Arc<MemoryStyleTarget>,
    router: Router,
    events: mpsc::UnboundedReceiver<SurfaceEvent>,
}

fn fixture(runtime_version: u32) -> Fixture {
    let store = Arc::new(MemoryUserScripts::new());
    let styles = Arc::new(MemoryStyleTarget::new());
    let coordinator = Coordinator::new(store.clone(), styles.clone()).with_runtime(runtime_version, None);
    let (tx, events) = mpsc::unbounded_channel();
    Fixture {
        store,
        styles,
        router: coordinator_router(Arc::new(coordinator), tx),
        events,
    }
}

fn tab(tab_id: i64, window_id: i64) -> SenderContext {
    SenderContext {
        tab_id: Some(tab_id),
        window_id: Some(window_id),
        url: Some("https://www.foo.com/page".to_string()),
    }
}

/// Dispatch and wait for the single reply.
async fn ask(router: &Router, message: Value) -> Value {
    router
        .request(message, SenderContext::default())
        .await
        .expect("handler must respond exactly once")
        .expect("message must be handled")
}

#[tokio::test]
async fn register_script_success_and_listing() {
    let fx = fixture(138);

    let reply = ask(
        &fx.router,
        json!({
            "action": "register-script",
            "id": "abc-1",
            "targetUrl": "https://www.foo.com/page",
            "code": "document.title='x'"
        }),
    )
    .await;
    assert_eq!(reply, json!({"success": true, "status": "registered"}));

    let reply = ask(&fx.router, json!({"action": "list-registered"})).await;
    assert_eq!(reply["success"], true);
    assert_eq!(reply["scripts"][0]["id"], "abc-1");
    assert_eq!(reply["scripts"][0]["matchPattern"], "*://*.foo.com/*");
}

#[tokio::test]
async fn register_script_validation_failure_names_field() {
    let fx = fixture(138);

    let reply = ask(
        &fx.router,
        json!({"action": "register-script", "id": "a", "code": "var x"}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert_eq!(reply["error"], "Missing required field: targetUrl");
}

#[tokio::test]
async fn register_script_malformed_payload_replies_once() {
    let fx = fixture(138);

    let routed = fx
        .router
        .dispatch(
            json!({"action": "register-script", "id": {"nested": true}}),
            SenderContext::default(),
        )
        .unwrap();
    match routed {
        Routed::Replied(reply) => assert_eq!(reply["success"], false),
        _ => panic!("malformed payload should be answered synchronously"),
    }
}

#[tokio::test]
async fn register_script_reports_guidance_when_disabled() {
    let fx = fixture(120);
    fx.store.set_enabled(false);

    let reply = ask(
        &fx.router,
        json!({"action": "register-script", "id": "a", "targetUrl": "https://a.com", "code": "var x"}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert!(reply["guidance"].as_str().unwrap().contains("Developer Mode"));
}

#[tokio::test]
async fn css_goes_through_style_path() {
    let fx = fixture(138);

    let reply = ask(
        &fx.router,
        json!({
            "action": "register-script",
            "id": "style-1",
            "targetUrl": "https://a.com",
            "code": "body { background: black }"
        }),
    )
    .await;
    assert_eq!(reply["status"], "style-applied");
    assert_eq!(fx.styles.sheets_for("style-1").await.len(), 1);
    assert!(fx.store.get_scripts().await.unwrap().is_empty());

    let reply = ask(
        &fx.router,
        json!({"action": "remove-script-effect", "id": "style-1", "codeSample": "body { }"}),
    )
    .await;
    assert_eq!(reply, json!({"success": true, "status": "removed"}));

    let reply = ask(
        &fx.router,
        json!({"action": "remove-script-effect", "id": "style-1", "codeSample": "body { }"}),
    )
    .await;
    assert_eq!(reply["status"], "not-present");
}

#[tokio::test]
async fn explicit_kind_overrides_heuristic() {
    let fx = fixture(138);

    // The comment would make the heuristic pick JavaScript.
    let reply = ask(
        &fx.router,
        json!({
            "action": "register-script",
            "id": "tagged",
            "targetUrl": "https://a.com",
            "code": "/* const */ p { color: red }",
            "kind": "css"
        }),
    )
    .await;
    assert_eq!(reply["status"], "style-applied");
}

#[tokio::test]
async fn remove_script_effect_for_js() {
    let fx = fixture(138);

    ask(
        &fx.router,
        json!({"action": "register-script", "id": "s", "targetUrl": "https://a.com", "code": "var x"}),
    )
    .await;

    let reply = ask(
        &fx.router,
        json!({"action": "remove-script-effect", "id": "s", "codeSample": "var x"}),
    )
    .await;
    assert_eq!(reply, json!({"success": true, "status": "removed"}));

    let reply = ask(
        &fx.router,
        json!({"action": "remove-script-effect", "id": "s", "codeSample": "var x"}),
    )
    .await;
    assert_eq!(reply, json!({"success": true, "status": "not-registered"}));
}

#[tokio::test]
async fn remove_script_effect_failure_when_disabled() {
    let fx = fixture(138);
    fx.store.set_enabled(false);

    let reply = ask(
        &fx.router,
        json!({"action": "remove-script-effect", "id": "s", "codeSample": "let y", "kind": "js"}),
    )
    .await;
    assert_eq!(reply["success"], false);
    assert!(!reply["error"].as_str().unwrap().is_empty());
}

#[tokio::test]
async fn check_capability_both_branches() {
    let fx = fixture(140);

    let reply = ask(&fx.router, json!({"action": "check-capability"})).await;
    assert_eq!(reply, json!({"available": true}));

    fx.store.set_enabled(false);
    let reply = ask(&fx.router, json!({"action": "check-capability"})).await;
    assert_eq!(reply["available"], false);
    assert!(reply["guidance"].as_str().unwrap().contains("Allow User Scripts"));
    assert!(reply["error"].is_string());
}

#[tokio::test]
async fn list_registered_failure_branch() {
    let fx = fixture(138);
    fx.store.set_enabled(false);

    let reply = ask(&fx.router, json!({"action": "list-registered"})).await;
    assert_eq!(reply["success"], false);
    assert!(reply.get("scripts").is_none());
}

#[tokio::test]
async fn display_state_message_intersects() {
    let fx = fixture(138);

    ask(
        &fx.router,
        json!({"action": "register-script", "id": 7, "targetUrl": "https://a.com", "code": "var x"}),
    )
    .await;

    let reply = ask(
        &fx.router,
        json!({"action": "display-state", "scripts": [{"id": "7", "name": "Dark"}, {"id": "8"}]}),
    )
    .await;
    assert_eq!(reply, json!({"success": true, "scripts": [{"id": "7", "name": "Dark"}]}));
}

#[tokio::test]
async fn open_side_surface_uses_sender_context() {
    let mut fx = fixture(138);

    let reply = fx
        .router
        .request(json!({"action": "open-side-surface"}), tab(4, 9))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, json!({"status": "opened"}));
    assert_eq!(
        fx.events.recv().await.unwrap(),
        SurfaceEvent::OpenSideSurface {
            tab_id: Some(4),
            window_id: Some(9)
        }
    );

    let reply = ask(&fx.router, json!({"action": "open-side-surface"})).await;
    assert_eq!(reply["status"], "error");
}

#[tokio::test]
async fn element_selected_is_relayed_to_surface() {
    let mut fx = fixture(138);

    let reply = fx
        .router
        .request(json!({"type": "element-selected", "selector": "#main > h1"}), tab(2, 1))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(reply, json!({"status": "received"}));
    assert_eq!(
        fx.events.recv().await.unwrap(),
        SurfaceEvent::ElementSelected {
            selector: "#main > h1".to_string(),
            tab_id: Some(2)
        }
    );

    let reply = ask(&fx.router, json!({"type": "element-selected"})).await;
    assert_eq!(reply["status"], "error");
}

#[tokio::test]
async fn unknown_messages_fall_through() {
    let fx = fixture(138);

    let reply = fx
        .router
        .request(json!({"action": "summon-llm", "prompt": "make it blue"}), SenderContext::default())
        .await
        .unwrap();
    assert!(reply.is_none());

    let reply = fx
        .router
        .request(json!({"prompt": "no discriminant"}), SenderContext::default())
        .await
        .unwrap();
    assert!(reply.is_none());
}

#[tokio::test]
async fn interleaved_async_requests_each_get_their_reply() {
    let fx = fixture(138);

    let pending: Vec<_> = (0..5)
        .map(|i| {
            fx.router
                .dispatch(
                    json!({
                        "action": "register-script",
                        "id": format!("s{}", i),
                        "targetUrl": "https://a.com",
                        "code": "var x"
                    }),
                    SenderContext::default(),
                )
                .unwrap()
        })
        .collect();

    for routed in pending {
        assert!(matches!(routed, Routed::Pending(_)));
        let reply = routed.into_reply().await.unwrap().unwrap();
        assert_eq!(reply["success"], true);
    }
    assert_eq!(fx.store.get_scripts().await.unwrap().len(), 5);
}
