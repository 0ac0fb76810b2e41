#[cfg(test)]
mod tests {
    use crate::auth::*;
    use crate::chat::*;
    use crate::cooldown::*;
    use crate::event_bus::EventBus;
    use crate::ports::*;
    use crate::session::SessionManager;
    use crate::transcript::*;
    use chat_types::api::*;
    use chat_types::config::ClientConfig;
    use chat_types::event::ChatEvent;
    use chat_types::message::*;
    use chat_types::session::SessionId;
    use chat_types::{ChatError, Result};

    use std::cell::{Cell, RefCell};
    use std::collections::HashMap;
    use std::future::Future;
    use std::pin::Pin;
    use std::rc::Rc;
    use std::task::Poll;
    use async_trait::async_trait;
    use futures::channel::oneshot;

    // ─── Mocks ───────────────────────────────────────────────

    #[derive(Default)]
    struct MemoryStore {
        data: RefCell<HashMap<String, String>>,
        writes: Cell<usize>,
    }

    impl MemoryStore {
        fn with(key: &str, value: &str) -> Self {
            let store = Self::default();
            store.data.borrow_mut().insert(key.to_string(), value.to_string());
            store
        }
    }

    impl SessionStore for MemoryStore {
        fn get(&self, key: &str) -> Result<Option<String>> {
            Ok(self.data.borrow().get(key).cloned())
        }

        fn set(&self, key: &str, value: &str) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.data.borrow_mut().insert(key.to_string(), value.to_string());
            Ok(())
        }

        fn remove(&self, key: &str) -> Result<()> {
            self.data.borrow_mut().remove(key);
            Ok(())
        }

        fn backend_name(&self) -> &str {
            "mock-memory"
        }
    }

    /// Store that fails every call, as when sessionStorage is disabled
    struct BrokenStore;

    impl SessionStore for BrokenStore {
        fn get(&self, _key: &str) -> Result<Option<String>> {
            Err(ChatError::Storage("disabled".to_string()))
        }

        fn set(&self, _key: &str, _value: &str) -> Result<()> {
            Err(ChatError::Storage("disabled".to_string()))
        }

        fn remove(&self, _key: &str) -> Result<()> {
            Err(ChatError::Storage("disabled".to_string()))
        }

        fn backend_name(&self) -> &str {
            "broken"
        }
    }

    struct MockChatBackend {
        history: RefCell<Result<Vec<Message>>>,
        reply: RefCell<Result<ChatReply>>,
        history_calls: Cell<usize>,
        send_calls: Cell<usize>,
        last_query: RefCell<Option<ChatQuery>>,
        /// When set, `send_query` waits for it before answering
        gate: RefCell<Option<oneshot::Receiver<()>>>,
    }

    impl MockChatBackend {
        fn replying(text: &str) -> Self {
            Self {
                history: RefCell::new(Ok(Vec::new())),
                reply: RefCell::new(Ok(ChatReply {
                    response: Some(text.to_string()),
                    session_id: None,
                })),
                history_calls: Cell::new(0),
                send_calls: Cell::new(0),
                last_query: RefCell::new(None),
                gate: RefCell::new(None),
            }
        }

        fn failing() -> Self {
            let backend = Self::replying("");
            *backend.reply.borrow_mut() = Err(ChatError::Network("connection refused".to_string()));
            backend
        }

        fn with_history(self, history: Vec<Message>) -> Self {
            *self.history.borrow_mut() = Ok(history);
            self
        }
    }

    #[async_trait(?Send)]
    impl ChatBackend for MockChatBackend {
        async fn fetch_history(&self, _session_id: &SessionId) -> Result<Vec<Message>> {
            self.history_calls.set(self.history_calls.get() + 1);
            self.history.borrow().clone()
        }

        async fn send_query(&self, query: ChatQuery) -> Result<ChatReply> {
            self.send_calls.set(self.send_calls.get() + 1);
            *self.last_query.borrow_mut() = Some(query);
            let gate = self.gate.borrow_mut().take();
            if let Some(rx) = gate {
                let _ = rx.await;
            }
            self.reply.borrow().clone()
        }
    }

    struct MockAuthBackend {
        login: RefCell<Result<LoginReply>>,
        register: RefCell<Result<()>>,
        verify: RefCell<Result<OtpVerified>>,
        resend: RefCell<Result<()>>,
        forgot: RefCell<Result<StatusReply>>,
        reset: RefCell<Result<StatusReply>>,
        calls: Cell<usize>,
        last_resend: RefCell<Option<ResendOtpRequest>>,
        last_reset: RefCell<Option<ResetPasswordRequest>>,
    }

    impl MockAuthBackend {
        fn accepting() -> Self {
            Self {
                login: RefCell::new(Ok(LoginReply {
                    message: Some("OTP sent to your email".to_string()),
                    email: Some("ana@example.com".to_string()),
                })),
                register: RefCell::new(Ok(())),
                verify: RefCell::new(Ok(OtpVerified {
                    token: Some("tok-1".to_string()),
                    message: None,
                })),
                resend: RefCell::new(Ok(())),
                forgot: RefCell::new(Ok(StatusReply {
                    message: Some("Password reset link sent to email".to_string()),
                })),
                reset: RefCell::new(Ok(StatusReply::default())),
                calls: Cell::new(0),
                last_resend: RefCell::new(None),
                last_reset: RefCell::new(None),
            }
        }

        fn bump(&self) {
            self.calls.set(self.calls.get() + 1);
        }
    }

    #[async_trait(?Send)]
    impl AuthBackend for MockAuthBackend {
        async fn login(&self, _req: LoginRequest) -> Result<LoginReply> {
            self.bump();
            self.login.borrow().clone()
        }

        async fn register(&self, _req: RegisterRequest) -> Result<()> {
            self.bump();
            self.register.borrow().clone()
        }

        async fn verify_otp(&self, _req: OtpVerification) -> Result<OtpVerified> {
            self.bump();
            self.verify.borrow().clone()
        }

        async fn resend_otp(&self, req: ResendOtpRequest) -> Result<()> {
            self.bump();
            *self.last_resend.borrow_mut() = Some(req);
            self.resend.borrow().clone()
        }

        async fn forgot_password(&self, _req: ForgotPasswordRequest) -> Result<StatusReply> {
            self.bump();
            self.forgot.borrow().clone()
        }

        async fn reset_password(&self, req: ResetPasswordRequest) -> Result<StatusReply> {
            self.bump();
            *self.last_reset.borrow_mut() = Some(req);
            self.reset.borrow().clone()
        }
    }

    /// Records cooldowns instead of scheduling ticks; tests tick by hand
    #[derive(Default)]
    struct ManualDriver {
        driven: RefCell<Vec<SharedCooldown>>,
    }

    impl CooldownDriver for ManualDriver {
        fn drive(&self, cooldown: SharedCooldown) {
            self.driven.borrow_mut().push(cooldown);
        }
    }

    fn block_on<F: Future<Output = T>, T>(f: F) -> T {
        use std::task::{Context, Wake, Waker};
        use std::sync::Arc;

        struct NoopWaker;
        impl Wake for NoopWaker {
            fn wake(self: Arc<Self>) {}
        }

        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        let mut f = std::pin::pin!(f);

        loop {
            match f.as_mut().poll(&mut cx) {
                Poll::Ready(val) => return val,
                Poll::Pending => std::thread::yield_now(),
            }
        }
    }

    fn poll_once<F: Future>(f: Pin<&mut F>) -> Poll<F::Output> {
        use std::task::{Context, Wake, Waker};
        use std::sync::Arc;

        struct NoopWaker;
        impl Wake for NoopWaker {
            fn wake(self: Arc<Self>) {}
        }

        let waker = Waker::from(Arc::new(NoopWaker));
        let mut cx = Context::from_waker(&waker);
        f.poll(&mut cx)
    }

    const KEY: &str = "chatSessionId";

    fn controller_with(
        store: Rc<MemoryStore>,
        backend: Rc<MockChatBackend>,
    ) -> (ChatController, EventBus) {
        let bus = EventBus::new();
        let sessions = SessionManager::new(store, KEY);
        let controller = ChatController::new(sessions, backend, bus.clone(), &ClientConfig::default());
        (controller, bus)
    }

    // ─── EventBus Tests ──────────────────────────────────────

    #[test]
    fn test_event_bus_new_is_empty() {
        let bus = EventBus::new();
        assert!(bus.drain().is_empty());
        assert!(bus.drain_for("abc123").is_empty());
    }

    #[test]
    fn test_event_bus_clone_shares_state() {
        let bus1 = EventBus::new();
        let bus2 = bus1.clone();
        bus1.emit(ChatEvent::ConversationReset { session_id: "s".to_string() });
        assert_eq!(bus2.drain().len(), 1);
        assert!(bus1.drain().is_empty());
    }

    #[test]
    fn test_event_bus_drain_for_drops_other_sessions() {
        let bus = EventBus::new();
        bus.emit(ChatEvent::AwaitingResponse { session_id: "old1".to_string() });
        bus.emit(ChatEvent::MessageAppended {
            sender: Sender::User,
            text: "hello".to_string(),
        });
        bus.emit(ChatEvent::ConversationReset { session_id: "new1".to_string() });
        bus.emit(ChatEvent::SessionStarted {
            session_id: "new1".to_string(),
            restored: false,
        });

        let events = bus.drain_for("new1");
        assert_eq!(events.len(), 3);
        assert!(matches!(events[0], ChatEvent::MessageAppended { .. }));
        assert!(events.iter().all(|e| e.session_id() != Some("old1")));
        assert!(bus.drain().is_empty());
    }

    // ─── SessionManager Tests ────────────────────────────────

    #[test]
    fn test_ensure_session_is_stable() {
        let store = Rc::new(MemoryStore::default());
        let sessions = SessionManager::new(store.clone(), KEY);
        let first = sessions.ensure_session();
        let second = sessions.ensure_session();
        assert_eq!(first, second);
        assert_eq!(store.get(KEY).unwrap().as_deref(), Some(first.as_str()));
    }

    #[test]
    fn test_ensure_session_restores_without_writing() {
        let store = Rc::new(MemoryStore::with(KEY, "abc123"));
        let sessions = SessionManager::new(store.clone(), KEY);
        let origin = sessions.open();
        assert!(origin.is_restored());
        assert_eq!(origin.id().as_str(), "abc123");
        assert_eq!(store.writes.get(), 0);
    }

    #[test]
    fn test_empty_stored_id_counts_as_missing() {
        let store = Rc::new(MemoryStore::with(KEY, ""));
        let sessions = SessionManager::new(store, KEY);
        let origin = sessions.open();
        assert!(!origin.is_restored());
        assert!(!origin.id().as_str().is_empty());
    }

    #[test]
    fn test_start_new_rotates_and_persists() {
        let store = Rc::new(MemoryStore::with(KEY, "abc123"));
        let sessions = SessionManager::new(store.clone(), KEY);
        let old = sessions.ensure_session();
        let new = sessions.start_new();
        assert_ne!(old, new);
        assert_eq!(sessions.stored(), Some(new.clone()));
        assert_eq!(sessions.ensure_session(), new);
    }

    #[test]
    fn test_degraded_store_gives_fresh_ids() {
        let sessions = SessionManager::new(Rc::new(BrokenStore), KEY);
        let a = sessions.ensure_session();
        let b = sessions.ensure_session();
        assert_ne!(a, b);
        assert!(sessions.stored().is_none());
        let c = sessions.start_new();
        assert_ne!(b, c);
    }

    // ─── Cooldown Tests ──────────────────────────────────────

    #[test]
    fn test_cooldown_runs_to_zero() {
        let mut cd = Cooldown::new();
        cd.start(30);
        assert!(cd.is_active());
        let mut previous = cd.remaining();
        for _ in 0..30 {
            cd.tick();
            assert!(cd.remaining() < previous);
            previous = cd.remaining();
        }
        assert_eq!(cd.state(), CooldownState { active: false, remaining: 0 });
    }

    #[test]
    fn test_cooldown_restart_replaces() {
        let mut cd = Cooldown::new();
        cd.start(30);
        cd.tick();
        assert_eq!(cd.remaining(), 29);
        cd.start(5);
        assert_eq!(cd.remaining(), 5);
        assert!(cd.is_active());
    }

    #[test]
    fn test_cooldown_tick_when_inactive_is_noop() {
        let mut cd = Cooldown::new();
        assert!(!cd.tick());
        assert_eq!(cd.remaining(), 0);
        cd.start(1);
        assert!(!cd.tick());
        assert!(!cd.tick());
        assert_eq!(cd.remaining(), 0);
    }

    #[test]
    fn test_cooldown_zero_duration_is_inactive() {
        let mut cd = Cooldown::new();
        cd.start(0);
        assert!(!cd.is_active());
    }

    #[test]
    fn test_cooldown_advance() {
        let mut cd = Cooldown::new();
        cd.start(30);
        cd.advance(12);
        assert_eq!(cd.state(), CooldownState { active: true, remaining: 18 });
        cd.advance(100);
        assert_eq!(cd.state(), CooldownState { active: false, remaining: 0 });
    }

    #[test]
    fn test_cooldown_cancel_bumps_epoch() {
        let mut cd = Cooldown::new();
        cd.start(30);
        let epoch = cd.epoch();
        cd.cancel();
        assert!(!cd.is_active());
        assert_eq!(cd.remaining(), 0);
        assert!(cd.epoch() > epoch);
    }

    #[test]
    fn test_remaining_after() {
        assert_eq!(remaining_after(30, 0), 30);
        assert_eq!(remaining_after(30, 29), 1);
        assert_eq!(remaining_after(30, 45), 0);
    }

    // ─── Transcript / Label Tests ────────────────────────────

    #[test]
    fn test_label_ids_not_reused_after_removal() {
        let mut labels = HistoryLabels::new();
        let a = labels.push("first");
        let b = labels.push("second");
        assert!(labels.remove(a));
        let c = labels.push("third");
        assert_ne!(c, a);
        assert_ne!(c, b);
        assert_eq!(labels.len(), 2);
    }

    #[test]
    fn test_labels_rebuild_from_user_messages() {
        let mut labels = HistoryLabels::new();
        labels.rebuild_from(&[
            Message::user("hi"),
            Message::assistant("hello"),
            Message::user("how are you"),
        ]);
        let titles: Vec<String> = labels.titles(20).into_iter().map(|l| l.text).collect();
        assert_eq!(titles, vec!["hi", "how are you"]);
    }

    #[test]
    fn test_labels_remove_unknown() {
        let mut labels = HistoryLabels::new();
        labels.push("only");
        assert!(!labels.remove(42));
        assert_eq!(labels.len(), 1);
    }

    #[test]
    fn test_transcript_replace_and_clear() {
        let mut transcript = Transcript::new();
        transcript.push(Message::user("local"));
        transcript.replace(vec![Message::user("a"), Message::assistant("b")]);
        assert_eq!(transcript.len(), 2);
        assert_eq!(transcript.messages()[1], Message::assistant("b"));
        transcript.clear();
        assert!(transcript.is_empty());
    }

    // ─── ChatController Tests ────────────────────────────────

    #[test]
    fn test_fresh_session_starts_idle_and_empty() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("hi"));
        let (controller, bus) = controller_with(store.clone(), backend.clone());

        assert_eq!(controller.state(), ChatState::Idle);
        block_on(controller.start());

        assert_eq!(backend.history_calls.get(), 0);
        assert!(controller.is_empty());
        assert_eq!(store.get(KEY).unwrap(), Some(controller.session_id().into_inner()));
        let events = bus.drain();
        assert!(matches!(events[0], ChatEvent::SessionStarted { restored: false, .. }));
    }

    #[test]
    fn test_restored_session_loads_history() {
        let store = Rc::new(MemoryStore::with(KEY, "abc123"));
        let backend = Rc::new(MockChatBackend::replying("").with_history(vec![Message::user("hi")]));
        let (controller, _bus) = controller_with(store, backend.clone());

        assert_eq!(controller.state(), ChatState::LoadingHistory);
        assert_eq!(controller.session_id().as_str(), "abc123");

        block_on(controller.start());

        assert_eq!(backend.history_calls.get(), 1);
        assert_eq!(controller.transcript(), vec![Message::user("hi")]);
        assert_eq!(controller.state(), ChatState::Idle);
        assert_eq!(controller.derive_titles().len(), 1);

        // A second start does not refetch
        block_on(controller.start());
        assert_eq!(backend.history_calls.get(), 1);
    }

    #[test]
    fn test_load_history_overwrites_local_content() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("local reply"));
        let (controller, _bus) = controller_with(store, backend.clone());

        block_on(controller.submit_message("local only"));
        assert_eq!(controller.len(), 2);

        *backend.history.borrow_mut() = Ok(vec![
            Message::user("server q"),
            Message::assistant("server a"),
            Message::user("server q2"),
        ]);
        block_on(controller.load_history(controller.session_id()));

        assert_eq!(
            controller.transcript(),
            vec![
                Message::user("server q"),
                Message::assistant("server a"),
                Message::user("server q2"),
            ]
        );
        let titles: Vec<String> = controller.derive_titles().into_iter().map(|l| l.text).collect();
        assert_eq!(titles, vec!["server q", "server q2"]);
    }

    #[test]
    fn test_history_failure_keeps_transcript() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("ok"));
        let (controller, bus) = controller_with(store, backend.clone());

        block_on(controller.submit_message("hello"));
        let before = controller.transcript();
        let _ = bus.drain();

        *backend.history.borrow_mut() = Err(ChatError::Http { status: 500, detail: None });
        block_on(controller.load_history(controller.session_id()));

        assert_eq!(controller.transcript(), before);
        assert!(matches!(controller.state(), ChatState::Error(_)));
        let events = bus.drain();
        assert!(events.iter().any(|e| matches!(e, ChatEvent::HistoryFetchFailed { .. })));
        // Nothing user-facing is appended for a failed history fetch
        assert!(!events.iter().any(|e| matches!(e, ChatEvent::MessageAppended { .. })));
    }

    #[test]
    fn test_history_without_list_keeps_transcript() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("hi there"));
        let (controller, bus) = controller_with(store, backend.clone());

        block_on(controller.submit_message("hello"));
        let _ = bus.drain();

        // A 2xx body of `{}` decoded the same way the REST adapter does
        *backend.history.borrow_mut() = serde_json::from_str::<HistoryResponse>("{}")
            .map_err(ChatError::from)
            .and_then(HistoryResponse::into_messages);
        block_on(controller.load_history(controller.session_id()));

        assert_eq!(
            controller.transcript(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
        assert_eq!(controller.derive_titles().len(), 1);
        assert!(matches!(controller.state(), ChatState::Error(_)));
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, ChatEvent::HistoryFetchFailed { .. })));
    }

    #[test]
    fn test_load_history_waits_out_pending_reply() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(
            MockChatBackend::replying("hi there").with_history(vec![Message::user("server q")]),
        );
        let (tx, rx) = oneshot::channel();
        *backend.gate.borrow_mut() = Some(rx);
        let (controller, _bus) = controller_with(store, backend.clone());

        let pending = controller.submit_message("hello");
        let mut pending = std::pin::pin!(pending);
        assert!(poll_once(pending.as_mut()).is_pending());

        block_on(controller.load_history(controller.session_id()));

        assert_eq!(backend.history_calls.get(), 0);
        assert_eq!(controller.state(), ChatState::AwaitingResponse);
        assert_eq!(block_on(controller.submit_message("again")), SubmitOutcome::Busy);

        tx.send(()).unwrap();
        assert_eq!(block_on(pending), SubmitOutcome::Delivered);
        assert_eq!(
            controller.transcript(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[test]
    fn test_submit_success_appends_reply() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("hi there"));
        let (controller, _bus) = controller_with(store, backend.clone());

        let outcome = block_on(controller.submit_message("hello"));

        assert_eq!(outcome, SubmitOutcome::Delivered);
        assert_eq!(
            controller.transcript(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
        assert_eq!(controller.state(), ChatState::Idle);
    }

    #[test]
    fn test_submit_failure_appends_error_entry() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::failing());
        let (controller, bus) = controller_with(store, backend.clone());

        let outcome = block_on(controller.submit_message("hello"));

        assert_eq!(outcome, SubmitOutcome::Failed);
        assert_eq!(
            controller.transcript(),
            vec![
                Message::user("hello"),
                Message::assistant("Error: Unable to get a response from the server."),
            ]
        );
        assert_eq!(controller.state(), ChatState::Idle);
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, ChatEvent::MessageSendFailed { .. })));

        // Retry is allowed straight away
        *backend.reply.borrow_mut() = Ok(ChatReply {
            response: Some("back online".to_string()),
            session_id: None,
        });
        assert_eq!(block_on(controller.submit_message("hello")), SubmitOutcome::Delivered);
        assert_eq!(controller.len(), 4);
    }

    #[test]
    fn test_submit_missing_reply_uses_fallback() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying(""));
        *backend.reply.borrow_mut() = Ok(ChatReply::default());
        let (controller, _bus) = controller_with(store, backend);

        block_on(controller.submit_message("hello"));

        assert_eq!(controller.transcript()[1], Message::assistant(EMPTY_REPLY_TEXT));
    }

    #[test]
    fn test_submit_blank_is_noop() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("hi"));
        let (controller, _bus) = controller_with(store, backend.clone());

        assert_eq!(block_on(controller.submit_message("")), SubmitOutcome::Ignored);
        assert_eq!(block_on(controller.submit_message("   ")), SubmitOutcome::Ignored);
        assert_eq!(block_on(controller.submit_message("\n\t")), SubmitOutcome::Ignored);

        assert!(controller.is_empty());
        assert_eq!(backend.send_calls.get(), 0);
        assert!(controller.derive_titles().is_empty());
    }

    #[test]
    fn test_submit_is_optimistic_and_guards_in_flight() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("hi there"));
        let (tx, rx) = oneshot::channel();
        *backend.gate.borrow_mut() = Some(rx);
        let (controller, _bus) = controller_with(store, backend.clone());

        let pending = controller.submit_message("hello");
        let mut pending = std::pin::pin!(pending);
        assert!(poll_once(pending.as_mut()).is_pending());

        // Phase 1 is visible before the backend answers
        assert_eq!(controller.transcript(), vec![Message::user("hello")]);
        assert_eq!(controller.state(), ChatState::AwaitingResponse);
        assert!(controller.is_busy());

        // A second submission is refused while the first is in flight
        assert_eq!(block_on(controller.submit_message("again")), SubmitOutcome::Busy);
        assert_eq!(controller.len(), 1);
        assert_eq!(backend.send_calls.get(), 1);

        tx.send(()).unwrap();
        assert_eq!(block_on(pending), SubmitOutcome::Delivered);
        assert_eq!(
            controller.transcript(),
            vec![Message::user("hello"), Message::assistant("hi there")]
        );
    }

    #[test]
    fn test_submit_query_body() {
        let store = Rc::new(MemoryStore::with(KEY, "abc123"));
        let backend = Rc::new(MockChatBackend::replying("ok"));
        let (controller, _bus) = controller_with(store, backend.clone());
        block_on(controller.start());
        controller.set_user_id("ana@example.com");

        block_on(controller.submit_message("  hello  "));

        let query = backend.last_query.borrow().clone().unwrap();
        assert_eq!(query.query, "hello");
        assert_eq!(query.session_id.as_str(), "abc123");
        assert_eq!(query.user_id, "ana@example.com");
        assert!(!query.timestamp.is_empty());
        assert_eq!(controller.transcript()[0], Message::user("hello"));
    }

    #[test]
    fn test_start_new_conversation_clears_everything() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("ok"));
        let (controller, bus) = controller_with(store.clone(), backend);

        block_on(controller.submit_message("hello"));
        let old = controller.session_id();
        let _ = bus.drain();

        let new = controller.start_new_conversation();

        assert_ne!(old, new);
        assert_eq!(controller.session_id(), new);
        assert!(controller.is_empty());
        assert!(controller.derive_titles().is_empty());
        assert_eq!(controller.state(), ChatState::Idle);
        assert_eq!(store.get(KEY).unwrap(), Some(new.into_inner()));
        assert!(bus
            .drain()
            .iter()
            .any(|e| matches!(e, ChatEvent::ConversationReset { .. })));
    }

    #[test]
    fn test_reply_after_reset_is_discarded() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("late"));
        let (tx, rx) = oneshot::channel();
        *backend.gate.borrow_mut() = Some(rx);
        let (controller, _bus) = controller_with(store, backend);

        let pending = controller.submit_message("hello");
        let mut pending = std::pin::pin!(pending);
        assert!(poll_once(pending.as_mut()).is_pending());

        controller.start_new_conversation();
        tx.send(()).unwrap();

        assert_eq!(block_on(pending), SubmitOutcome::Discarded);
        assert!(controller.is_empty());
    }

    #[test]
    fn test_remove_history_entry_leaves_transcript() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("ok"));
        let (controller, _bus) = controller_with(store, backend);

        block_on(controller.submit_message("first question"));
        block_on(controller.submit_message("second question"));
        let titles = controller.derive_titles();
        assert_eq!(titles.len(), 2);

        assert!(controller.remove_history_entry(titles[0].id));
        assert!(!controller.remove_history_entry(titles[0].id));

        let remaining = controller.derive_titles();
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].text, "second question");
        assert_eq!(controller.len(), 4);
        assert_eq!(controller.transcript()[0], Message::user("first question"));
    }

    #[test]
    fn test_derive_titles_truncates_without_mutating() {
        let store = Rc::new(MemoryStore::default());
        let backend = Rc::new(MockChatBackend::replying("ok"));
        let (controller, _bus) = controller_with(store, backend);

        block_on(controller.submit_message("what is the weather like in Toronto"));

        let titles = controller.derive_titles();
        assert_eq!(titles[0].text, "what is the weather ...");
        assert_eq!(controller.transcript()[0].text, "what is the weather like in Toronto");
        assert_eq!(controller.derive_titles(), titles);
    }

    // ─── AuthFlow Tests ──────────────────────────────────────

    struct AuthFixture {
        flow: AuthFlow,
        backend: Rc<MockAuthBackend>,
        session: Rc<MemoryStore>,
        persistent: Rc<MemoryStore>,
        driver: Rc<ManualDriver>,
    }

    fn auth_fixture(email: Option<&str>) -> AuthFixture {
        let backend = Rc::new(MockAuthBackend::accepting());
        let session = Rc::new(match email {
            Some(e) => MemoryStore::with("email", e),
            None => MemoryStore::default(),
        });
        let persistent = Rc::new(MemoryStore::default());
        let driver = Rc::new(ManualDriver::default());
        let flow = AuthFlow::new(
            backend.clone(),
            session.clone(),
            persistent.clone(),
            driver.clone(),
            &ClientConfig::default(),
        );
        AuthFixture { flow, backend, session, persistent, driver }
    }

    #[test]
    fn test_login_remembers_email() {
        let fx = auth_fixture(None);
        let outcome = block_on(fx.flow.login("ana@example.com", "secret"));
        assert_eq!(outcome, FlowOutcome::Success);
        assert_eq!(fx.session.get("email").unwrap().as_deref(), Some("ana@example.com"));
        assert_eq!(fx.flow.email(), "ana@example.com");
    }

    #[test]
    fn test_login_rejection_uses_detail() {
        let fx = auth_fixture(None);
        *fx.backend.login.borrow_mut() = Err(ChatError::Http {
            status: 401,
            detail: Some("Invalid credentials".to_string()),
        });
        assert_eq!(block_on(fx.flow.login("a@b.c", "x")), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some("Invalid credentials"));

        *fx.backend.login.borrow_mut() = Err(ChatError::Network("offline".to_string()));
        block_on(fx.flow.login("a@b.c", "x"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(LOGIN_ERROR));
    }

    #[test]
    fn test_register_success_and_failure() {
        let fx = auth_fixture(None);
        assert_eq!(block_on(fx.flow.register("Ana", "a@b.c", "pw")), FlowOutcome::Success);
        assert_eq!(fx.flow.feedback().success.as_deref(), Some(REGISTERED));

        *fx.backend.register.borrow_mut() = Err(ChatError::Http { status: 400, detail: None });
        assert_eq!(block_on(fx.flow.register("Ana", "a@b.c", "pw")), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(REGISTER_FAILED));
    }

    #[test]
    fn test_verify_empty_otp_is_skipped() {
        let fx = auth_fixture(Some("ana@example.com"));
        assert_eq!(block_on(fx.flow.verify_otp("  ")), FlowOutcome::Skipped);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(OTP_REQUIRED));
        assert_eq!(fx.backend.calls.get(), 0);
    }

    #[test]
    fn test_verify_stores_token_and_logout_clears_it() {
        let fx = auth_fixture(Some("ana@example.com"));
        assert!(!fx.flow.is_authenticated());

        assert_eq!(block_on(fx.flow.verify_otp("123456")), FlowOutcome::Success);
        assert_eq!(fx.persistent.get("token").unwrap().as_deref(), Some("tok-1"));
        assert!(fx.flow.is_authenticated());

        fx.flow.logout();
        assert!(!fx.flow.is_authenticated());
        assert_eq!(fx.persistent.get("token").unwrap(), None);
        // Email stays for the rest of the browsing session
        assert_eq!(fx.flow.email(), "ana@example.com");
    }

    #[test]
    fn test_verify_rejection_messages() {
        let fx = auth_fixture(Some("ana@example.com"));

        *fx.backend.verify.borrow_mut() = Err(ChatError::Http {
            status: 401,
            detail: Some("Invalid OTP".to_string()),
        });
        assert_eq!(block_on(fx.flow.verify_otp("000000")), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some("Invalid OTP"));

        *fx.backend.verify.borrow_mut() = Err(ChatError::Http { status: 401, detail: None });
        block_on(fx.flow.verify_otp("000000"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(OTP_INVALID));

        *fx.backend.verify.borrow_mut() = Err(ChatError::Network("offline".to_string()));
        block_on(fx.flow.verify_otp("000000"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(SOMETHING_WRONG));
        assert!(!fx.flow.is_authenticated());
    }

    #[test]
    fn test_resend_starts_cooldown_and_blocks_repeat() {
        let fx = auth_fixture(Some(" ana@example.com "));

        assert_eq!(block_on(fx.flow.resend_otp()), FlowOutcome::Success);
        assert_eq!(fx.flow.feedback().success.as_deref(), Some(OTP_RESENT));
        assert_eq!(
            fx.backend.last_resend.borrow().as_ref().map(|r| r.email.clone()),
            Some("ana@example.com".to_string())
        );
        assert_eq!(fx.flow.cooldown(), CooldownState { active: true, remaining: 30 });
        assert_eq!(fx.driver.driven.borrow().len(), 1);

        assert_eq!(block_on(fx.flow.resend_otp()), FlowOutcome::Skipped);
        assert_eq!(fx.backend.calls.get(), 1);

        // Drive the countdown to the end by hand
        let cooldown = fx.driver.driven.borrow()[0].clone();
        for _ in 0..30 {
            cooldown.borrow_mut().tick();
        }
        assert!(!fx.flow.cooldown().active);
        assert_eq!(block_on(fx.flow.resend_otp()), FlowOutcome::Success);
        assert_eq!(fx.backend.calls.get(), 2);
    }

    #[test]
    fn test_resend_failure_reenables() {
        let fx = auth_fixture(Some("ana@example.com"));
        *fx.backend.resend.borrow_mut() = Err(ChatError::Http {
            status: 404,
            detail: Some("User not found".to_string()),
        });

        assert_eq!(block_on(fx.flow.resend_otp()), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some("User not found"));
        assert!(!fx.flow.cooldown().active);

        *fx.backend.resend.borrow_mut() = Err(ChatError::Http { status: 500, detail: None });
        block_on(fx.flow.resend_otp());
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(OTP_RESEND_FAILED));
    }

    #[test]
    fn test_resend_without_email() {
        let fx = auth_fixture(None);
        assert_eq!(block_on(fx.flow.resend_otp()), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(EMAIL_MISSING));
        assert_eq!(fx.backend.calls.get(), 0);
        // The button stays locked for the cooldown, as after a normal resend
        assert!(fx.flow.cooldown().active);
    }

    #[test]
    fn test_forgot_password_success_uses_backend_message() {
        let fx = auth_fixture(None);
        assert_eq!(block_on(fx.flow.forgot_password(" ana@example.com ")), FlowOutcome::Success);
        assert_eq!(
            fx.flow.feedback().success.as_deref(),
            Some("Password reset link sent to email")
        );

        *fx.backend.forgot.borrow_mut() = Ok(StatusReply::default());
        block_on(fx.flow.forgot_password("ana@example.com"));
        assert_eq!(fx.flow.feedback().success.as_deref(), Some(RESET_LINK_SENT));
        assert!(fx.flow.feedback().error.is_none());
    }

    #[test]
    fn test_forgot_password_validation_and_rejection() {
        let fx = auth_fixture(None);
        assert_eq!(block_on(fx.flow.forgot_password("  ")), FlowOutcome::Skipped);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(EMAIL_REQUIRED));
        assert_eq!(fx.backend.calls.get(), 0);

        *fx.backend.forgot.borrow_mut() = Err(ChatError::Http {
            status: 404,
            detail: Some("User not found".to_string()),
        });
        assert_eq!(block_on(fx.flow.forgot_password("who@example.com")), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some("User not found"));

        *fx.backend.forgot.borrow_mut() = Err(ChatError::Http { status: 500, detail: None });
        block_on(fx.flow.forgot_password("who@example.com"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(RESET_LINK_FAILED));

        *fx.backend.forgot.borrow_mut() = Err(ChatError::Network("offline".to_string()));
        block_on(fx.flow.forgot_password("who@example.com"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(SOMETHING_WRONG));
    }

    #[test]
    fn test_reset_password_sends_token_and_does_not_sign_in() {
        let fx = auth_fixture(None);
        assert_eq!(
            block_on(fx.flow.reset_password(" tok-abc ", "new-secret")),
            FlowOutcome::Success
        );
        assert_eq!(fx.flow.feedback().success.as_deref(), Some(PASSWORD_RESET));
        let req = fx.backend.last_reset.borrow().clone().unwrap();
        assert_eq!(req.token, "tok-abc");
        assert_eq!(req.new_password, "new-secret");
        assert!(!fx.flow.is_authenticated());
    }

    #[test]
    fn test_reset_password_validation_and_rejection() {
        let fx = auth_fixture(None);
        assert_eq!(block_on(fx.flow.reset_password("", "pw")), FlowOutcome::Skipped);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(RESET_TOKEN_MISSING));
        assert_eq!(block_on(fx.flow.reset_password("tok", "")), FlowOutcome::Skipped);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(PASSWORD_REQUIRED));
        assert_eq!(fx.backend.calls.get(), 0);

        *fx.backend.reset.borrow_mut() = Err(ChatError::Http {
            status: 400,
            detail: Some("Invalid or expired token".to_string()),
        });
        assert_eq!(block_on(fx.flow.reset_password("old", "pw")), FlowOutcome::Failed);
        assert_eq!(fx.flow.feedback().error.as_deref(), Some("Invalid or expired token"));

        *fx.backend.reset.borrow_mut() = Err(ChatError::Http { status: 400, detail: None });
        block_on(fx.flow.reset_password("old", "pw"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(RESET_FAILED));

        *fx.backend.reset.borrow_mut() = Err(ChatError::Network("offline".to_string()));
        block_on(fx.flow.reset_password("old", "pw"));
        assert_eq!(fx.flow.feedback().error.as_deref(), Some(SOMETHING_WRONG));
    }
}
