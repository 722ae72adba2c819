//! End to end tests for a chat turn: storage, streaming, and web
//! enhancement against mocked HTTP servers.

mod test_utils;

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;

    use yak::chat::{TurnOutcome, TurnState};
    use yak::ollama::{ClientError, Message};

    use crate::test_utils::{
        RecordingSink, ScriptedInput, SinkEvent, chat_stream_body, test_chat, test_store,
    };

    /// Tests a full turn stores the user message and the streamed reply
    #[tokio::test]
    async fn it_stores_streamed_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "model": "llama3",
                "stream": true,
                "messages": [{"role": "user", "content": "hello"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/x-ndjson")
            .with_body(chat_stream_body(&["Hi", " there", "!"]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();

        let outcome = chat.handle_input("hello", &mut sink).await.unwrap();

        mock.assert();
        match outcome {
            TurnOutcome::Replied(msg) => assert_eq!(msg, Message::assistant("Hi there!")),
            other => panic!("Expected a reply, got {:?}", other),
        }
        assert_eq!(chat.state(), TurnState::AwaitingInput);
        assert_eq!(sink.tokens(), vec!["Hi", " there", "!"]);
        assert_eq!(sink.events.first(), Some(&SinkEvent::Started));
        assert_eq!(sink.events.last(), Some(&SinkEvent::Finished));

        // Durable across a fresh store over the same directory
        let history = test_store(dir.path()).read_history().unwrap();
        assert_eq!(
            history,
            vec![Message::user("hello"), Message::assistant("Hi there!")]
        );
    }

    /// Tests the stored reply is trimmed but streamed tokens are not
    #[tokio::test]
    async fn it_trims_stored_reply() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(chat_stream_body(&["\n  Sure", ", done.", "  \n"]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();

        chat.handle_input("go", &mut sink).await.unwrap();

        assert_eq!(sink.tokens().concat(), "\n  Sure, done.  \n");
        let history = chat.store().read_history().unwrap();
        assert_eq!(history[1], Message::assistant("Sure, done."));
    }

    /// Tests a backend failure keeps the user message and stores no reply
    #[tokio::test]
    async fn it_keeps_user_message_on_backend_error() {
        let mut server = mockito::Server::new_async().await;
        let failing = server
            .mock("POST", "/api/chat")
            // Only the first request ends with the "first" message
            .match_body(Matcher::Regex(r#""content":"first"\}\]"#.to_string()))
            .with_status(500)
            .create();
        let working = server
            .mock("POST", "/api/chat")
            .match_body(Matcher::Regex("second".to_string()))
            .with_status(200)
            .with_body(chat_stream_body(&["ok"]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();

        let outcome = chat.handle_input("first", &mut sink).await.unwrap();

        failing.assert();
        assert!(matches!(
            outcome,
            TurnOutcome::Failed(ClientError::Backend { status: 500, .. })
        ));
        assert_eq!(chat.state(), TurnState::AwaitingInput);
        assert_eq!(sink.failures(), 1);
        assert!(sink.tokens().is_empty());
        assert_eq!(
            chat.store().read_history().unwrap(),
            vec![Message::user("first")]
        );

        // The next turn carries on with the failed message still in
        // the history that is sent
        chat.handle_input("second", &mut sink).await.unwrap();

        working.assert();
        assert_eq!(
            chat.store().read_history().unwrap(),
            vec![
                Message::user("first"),
                Message::user("second"),
                Message::assistant("ok")
            ]
        );
    }

    /// Tests a malformed record between two good ones is skipped
    #[tokio::test]
    async fn it_skips_malformed_stream_lines() {
        let mut server = mockito::Server::new_async().await;
        let body = concat!(
            r#"{"message":{"content":"one"},"done":false}"#,
            "\n",
            "{\"message\": oops\n",
            r#"{"message":{"content":" two"},"done":false}"#,
            "\n",
            r#"{"done":true}"#,
            "\n",
        );
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(body)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();

        chat.handle_input("count", &mut sink).await.unwrap();

        assert_eq!(sink.tokens(), vec!["one", " two"]);
        assert_eq!(
            chat.store().read_history().unwrap()[1],
            Message::assistant("one two")
        );
    }

    /// Tests page content reaches the backend but never the stored history
    #[tokio::test]
    async fn it_does_not_persist_web_content() {
        let mut pages = mockito::Server::new_async().await;
        let page = pages
            .mock("GET", "/post")
            .with_status(200)
            .with_header("content-type", "text/html")
            .with_body("<html><body><article><p>Secret sauce recipe</p></article></body></html>")
            .create();

        let mut ollama = mockito::Server::new_async().await;
        let chat_mock = ollama
            .mock("POST", "/api/chat")
            .match_body(Matcher::AllOf(vec![
                Matcher::Regex("Based on this webpage content from".to_string()),
                Matcher::Regex("Secret sauce recipe".to_string()),
            ]))
            .with_status(200)
            .with_body(chat_stream_body(&["Tomatoes."]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &ollama.url(), true);
        let mut sink = RecordingSink::default();
        let input = format!("what is in {}/post", pages.url());

        chat.handle_input(&input, &mut sink).await.unwrap();

        page.assert();
        chat_mock.assert();
        assert_eq!(
            chat.store().read_history().unwrap(),
            vec![Message::user(&input), Message::assistant("Tomatoes.")]
        );
        assert!(
            sink.events
                .iter()
                .any(|e| matches!(e, SinkEvent::Notice(n) if n.starts_with("Detected URL")))
        );
    }

    /// Tests a failed page fetch doesn't interrupt the turn
    #[tokio::test]
    async fn it_continues_when_page_fetch_fails() {
        let mut pages = mockito::Server::new_async().await;
        let _page = pages.mock("GET", "/gone").with_status(404).create();

        let mut ollama = mockito::Server::new_async().await;
        let input = format!("read {}/gone", pages.url());
        let chat_mock = ollama
            .mock("POST", "/api/chat")
            .match_body(Matcher::PartialJson(json!({
                "messages": [{"role": "user", "content": input.clone()}]
            })))
            .with_status(200)
            .with_body(chat_stream_body(&["Can't see it."]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &ollama.url(), true);
        let mut sink = RecordingSink::default();

        let outcome = chat.handle_input(&input, &mut sink).await.unwrap();

        chat_mock.assert();
        assert!(matches!(outcome, TurnOutcome::Replied(_)));
        assert!(
            sink.events
                .iter()
                .any(|e| matches!(e, SinkEvent::Notice(n) if n.starts_with("Failed to fetch")))
        );
    }

    /// Tests the interactive loop skips blank lines and stops at a quit token
    #[tokio::test]
    async fn it_runs_until_quit() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(chat_stream_body(&["Hey"]))
            .expect(1)
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();
        let mut input = ScriptedInput::new(&["", "   ", "hello", "/bye", "never sent"]);

        chat.run(&mut input, &mut sink).await.unwrap();

        mock.assert();
        assert_eq!(chat.state(), TurnState::Exit);
        assert_eq!(input.0.len(), 1);
        assert_eq!(
            chat.store().read_history().unwrap(),
            vec![Message::user("hello"), Message::assistant("Hey")]
        );
    }

    /// Tests each session keeps its own transcript
    #[tokio::test]
    async fn it_keeps_sessions_separate() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_body(chat_stream_body(&["Noted"]))
            .create();

        let dir = tempfile::tempdir().unwrap();
        let mut store = test_store(dir.path());
        store.create_session("work notes").unwrap();

        let mut chat = test_chat(dir.path(), &server.url(), false);
        let mut sink = RecordingSink::default();
        chat.handle_input("default chat message", &mut sink).await.unwrap();

        // `test_chat` starts from default settings, so that turn went
        // to the default session
        let mut store = test_store(dir.path());
        assert_eq!(store.read_history().unwrap().len(), 2);
        store.switch_session("work-notes").unwrap();
        assert!(store.read_history().unwrap().is_empty());
        assert_eq!(store.list_sessions().unwrap(), vec!["default", "work-notes"]);
    }
}
