use recall_chat::config::{ChatConfig, MemoryBackend, PipelineProfile};
use recall_chat::kernel::TurnController;
use recall_chat::{build_controller, repl, AppOptions};

async fn offline_controller() -> TurnController {
    let config = ChatConfig {
        openai_api_key: "sk-test".into(),
        openai_base_url: None,
        chat_model: None,
        embedding_model: None,
        memory: MemoryBackend::Local,
    };
    let options = AppOptions {
        model: None,
        web_search: true,
    };
    build_controller(&config, &PipelineProfile::default(), &options)
        .await
        .unwrap()
}

async fn drive(script: &str) -> (String, usize) {
    let controller = offline_controller().await;
    let mut output = Vec::new();
    let session = repl::run(&controller, script.as_bytes(), &mut output)
        .await
        .unwrap();
    (String::from_utf8(output).unwrap(), session.transcript().len())
}

#[tokio::test]
async fn help_lists_builtins_and_capabilities() {
    let (output, messages) = drive("/help\n/quit\n").await;
    assert!(output.contains("/history"));
    assert!(output.contains("/search"));
    assert_eq!(messages, 0);
}

#[tokio::test]
async fn history_of_a_fresh_session_is_empty() {
    let (output, _) = drive("/history\n").await;
    assert!(output.contains("(no messages yet)"));
}

#[tokio::test]
async fn blank_lines_are_ignored() {
    let (output, messages) = drive("\n   \n/quit\n").await;
    assert_eq!(messages, 0);
    assert_eq!(output, "> > > ");
}

#[tokio::test]
async fn quit_stops_reading() {
    let (output, _) = drive("/quit\n/help\n").await;
    assert!(!output.contains("/history"));
}

#[tokio::test]
async fn new_resets_the_conversation() {
    let (output, messages) = drive("/new\n/history\n").await;
    assert!(output.contains("Started a new conversation."));
    assert!(output.contains("(no messages yet)"));
    assert_eq!(messages, 0);
}
