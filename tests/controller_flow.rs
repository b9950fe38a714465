mod common;

use common::{MockHub, unreachable_base_url};
use multimodal_hub::chat::{APOLOGY_TEXT, Role, TranscriptItem};
use multimodal_hub::controller::{CHAT_FAILED, CLASSIFY_FAILED};
use multimodal_hub::session::SessionId;
use multimodal_hub::upload::{StagedImage, UploadPhase};
use multimodal_hub::view::{NotificationLevel, ServerStatus};
use multimodal_hub::{ClientController, ControllerOptions, HubClient};

async fn controller_for(hub: &MockHub) -> ClientController<HubClient> {
    let api = HubClient::new(&hub.base_url).unwrap();
    ClientController::new(api, ControllerOptions::default())
}

#[tokio::test]
async fn test_load_marks_online_and_opens_session() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;

    controller.load().await;
    assert_eq!(controller.state().status, ServerStatus::Online);

    let chat = controller.state().chat.as_ref().unwrap();
    let id = chat.session().unwrap();
    assert!(SessionId::is_well_formed(id.as_str()));
    assert_eq!(chat.session_label(), format!("{}...", &id.as_str()[..20]));
}

#[tokio::test]
async fn test_unreachable_server_is_offline() {
    let api = HubClient::new(unreachable_base_url().await).unwrap();
    let mut controller = ClientController::new(api, ControllerOptions::default());
    assert_eq!(controller.check_health().await, ServerStatus::Offline);
}

#[tokio::test]
async fn test_classify_file_from_disk() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("snack.jpg");
    std::fs::write(&path, [0xFF, 0xD8, 0xFF, 0xE0]).unwrap();

    controller.select_image_file(&path).await.unwrap();
    assert_eq!(controller.state().upload.phase(), UploadPhase::Previewing);
    assert_eq!(hub.request_count(), 0);

    controller.classify_image().await.unwrap();
    let view = controller.state().classification().unwrap();
    assert_eq!(view.label, "hot dog");
    assert_eq!(view.bar_width, "87.34%");

    let request = &hub.requests()[0];
    let file = request.field("file").unwrap();
    assert_eq!(file.file_name.as_deref(), Some("snack.jpg"));
    assert_eq!(file.content_type.as_deref(), Some("image/jpeg"));
}

#[tokio::test]
async fn test_rejected_files_never_reach_server() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;

    let dir = tempfile::tempdir().unwrap();
    let gif = dir.path().join("anim.gif");
    std::fs::write(&gif, b"GIF89a").unwrap();
    assert!(controller.select_image_file(&gif).await.is_err());
    assert!(controller.stage_chat_image_file(&gif).await.is_err());

    let big = StagedImage::new("big.png", "image/png", vec![0; 5 * 1024 * 1024 + 1]);
    assert!(controller.stage_chat_image(big).is_err());
    assert!(controller.classify_image().await.is_err());
    assert!(controller.send_chat_message("  ").await.is_err());
    assert!(controller.analyze_sentiment("").await.is_err());

    assert_eq!(hub.request_count(), 0);
    let notes = controller.take_notifications();
    assert_eq!(notes.len(), 6);
    assert!(notes.iter().all(|n| n.level == NotificationLevel::Error));
}

#[tokio::test]
async fn test_sentiment_issues_exactly_one_get() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;

    controller
        .analyze_sentiment("  good vibes only  ")
        .await
        .unwrap();
    let requests = hub.requests();
    assert_eq!(requests.len(), 1);
    assert_eq!(
        requests[0].query.get("text").map(String::as_str),
        Some("good vibes only")
    );

    let view = controller.state().sentiment.clone().unwrap();
    assert_eq!(view.label, "POSITIVE");
    assert_eq!(view.score, "0.8000");
    assert_eq!(view.bar_width, "80.00%");
}

#[tokio::test]
async fn test_chat_round_trip_with_image() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;
    controller.load().await;
    let session = controller
        .state()
        .chat
        .as_ref()
        .unwrap()
        .session()
        .unwrap()
        .clone();

    controller
        .stage_chat_image(StagedImage::new("red.png", "image/png", vec![7; 32]))
        .unwrap();
    let reply = controller.send_chat_message("What color?").await.unwrap();
    assert_eq!(reply.session_id, session.as_str());

    let chat = controller.state().chat.as_ref().unwrap();
    assert!(chat.staged_image().is_none());
    assert!(!chat.is_thinking());
    let messages: Vec<_> = chat.messages().collect();
    assert_eq!(messages.len(), 2);
    assert_eq!(messages[0].role, Role::User);
    assert!(messages[0].image.is_some());
    assert_eq!(messages[1].content, "That's interesting! Tell me more.");

    // Health probe plus one chat turn.
    let chat_request = hub
        .requests()
        .into_iter()
        .find(|r| r.path == "/chat")
        .unwrap();
    assert_eq!(
        chat_request.field("session_id").unwrap().text(),
        session.as_str()
    );
    assert!(chat_request.field("image").is_some());
}

#[tokio::test]
async fn test_failed_chat_leaves_one_apology() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;
    controller.init_new_session().unwrap();
    hub.fail_all();

    assert!(controller.send_chat_message("hello").await.is_err());

    let chat = controller.state().chat.as_ref().unwrap();
    assert!(!chat.is_thinking());
    let last = chat.messages().last().unwrap();
    assert_eq!(last.role, Role::Assistant);
    assert_eq!(last.content, APOLOGY_TEXT);
    assert_eq!(
        chat.messages().filter(|m| m.content == APOLOGY_TEXT).count(),
        1
    );

    let notes = controller.take_notifications();
    assert_eq!(notes.len(), 1);
    assert_eq!(notes[0].message, CHAT_FAILED);
}

#[tokio::test]
async fn test_failed_classification_shows_nothing() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;
    controller
        .select_image(StagedImage::new("a.png", "image/png", vec![1]))
        .unwrap();
    controller.classify_image().await.unwrap();
    assert!(controller.state().classification().is_some());

    hub.fail_all();
    assert!(controller.classify_image().await.is_err());
    assert!(controller.state().classification().is_none());
    assert!(!controller.state().loading);
    assert_eq!(controller.take_notifications()[0].message, CLASSIFY_FAILED);
}

#[tokio::test]
async fn test_clear_history_deletes_then_resets() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;
    let first = controller.init_new_session().unwrap();
    controller.send_chat_message("remember me").await.unwrap();

    controller.clear_history().await.unwrap();

    let delete = hub
        .requests()
        .into_iter()
        .find(|r| r.method == "DELETE")
        .unwrap();
    assert_eq!(delete.path, format!("/chat/history/{first}"));

    let chat = controller.state().chat.as_ref().unwrap();
    let second = chat.session().unwrap();
    assert_ne!(second, &first);
    assert!(matches!(
        chat.transcript(),
        [TranscriptItem::Welcome { session_id }] if session_id == second.as_str()
    ));
}

#[tokio::test]
async fn test_thinking_is_published_while_in_flight() {
    let hub = MockHub::start().await;
    let mut controller = controller_for(&hub).await;
    let mut updates = controller.subscribe();

    let watcher = tokio::spawn(async move {
        let mut saw_thinking = false;
        while updates.changed().await.is_ok() {
            let thinking = updates
                .borrow_and_update()
                .chat
                .as_ref()
                .is_some_and(|c| c.is_thinking());
            saw_thinking |= thinking;
        }
        saw_thinking
    });

    controller.send_chat_message("hi").await.unwrap();
    drop(controller);

    assert!(watcher.await.unwrap());
}
