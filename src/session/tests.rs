use super::*;
use crate::provider::{
    ChatRequest, CompletionResponse, Connector, Error as ProviderError, LlmApi, Message, Role,
    Usage,
};
use crate::tool::ToolRegistry;
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

const KEY: &str = "AIza-test-key";

/// Shared view into everything the mock service saw.
#[derive(Default)]
struct Probe {
    connects: AtomicUsize,
    requests: Mutex<Vec<ChatRequest>>,
    replies: Mutex<VecDeque<String>>,
    failure: Mutex<Option<String>>,
}

impl Probe {
    fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }

    fn last_request(&self) -> ChatRequest {
        self.requests.lock().unwrap().last().cloned().unwrap()
    }

    fn fail_with(&self, message: &str) {
        *self.failure.lock().unwrap() = Some(message.to_string());
    }

    fn queue_reply(&self, reply: &str) {
        self.replies.lock().unwrap().push_back(reply.to_string());
    }
}

struct MockApi {
    probe: Arc<Probe>,
}

#[async_trait]
impl LlmApi for MockApi {
    fn id(&self) -> &str {
        "mock"
    }

    async fn complete(&self, request: ChatRequest) -> Result<CompletionResponse, ProviderError> {
        let input = request
            .messages
            .last()
            .map(Message::joined_text)
            .unwrap_or_default();
        self.probe.requests.lock().unwrap().push(request);

        if let Some(message) = self.probe.failure.lock().unwrap().clone() {
            return Err(ProviderError::Api(message));
        }
        let reply = self
            .probe
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| format!("reply to: {input}"));
        Ok(CompletionResponse {
            message: Message::text(Role::Assistant, reply),
            usage: Usage::default(),
        })
    }
}

struct MockConnector {
    probe: Arc<Probe>,
}

#[async_trait]
impl Connector for MockConnector {
    async fn connect(
        &self,
        credential: &Credential,
        _model: &str,
    ) -> Result<Arc<dyn LlmApi>, ProviderError> {
        self.probe.connects.fetch_add(1, Ordering::SeqCst);
        match credential.expose() {
            "bad-key" => Err(ProviderError::Authentication(
                "HTTP 400: API key not valid. Please pass a valid API key.".into(),
            )),
            "offline" => Err(ProviderError::Api("connection refused".into())),
            _ => Ok(Arc::new(MockApi {
                probe: self.probe.clone(),
            })),
        }
    }
}

fn factory(probe: &Arc<Probe>) -> Arc<AgentFactory> {
    Arc::new(AgentFactory::new(
        Arc::new(MockConnector {
            probe: probe.clone(),
        }),
        ToolRegistry::new(),
    ))
}

fn session() -> (ChatSession, Arc<Probe>) {
    let probe = Arc::new(Probe::default());
    (ChatSession::new(factory(&probe)), probe)
}

#[tokio::test]
async fn test_first_ensure_builds_and_greets() {
    let (mut session, probe) = session();

    let status = session.ensure_agent(KEY, Persona::Calm).await.unwrap();
    assert_eq!(status, AgentStatus::Rebuilt);
    assert!(session.is_ready());
    assert_eq!(session.persona(), Some(Persona::Calm));

    let turns = session.transcript().turns();
    assert_eq!(turns.len(), 1);
    assert_eq!(turns[0].role, TurnRole::Assistant);
    assert!(turns[0].content.starts_with("reply to: Greet me warmly"));

    let request = probe.last_request();
    let system = request.system.as_deref().unwrap();
    assert!(system.contains(Persona::Calm.instructions()));
    assert!(system.starts_with("You are \"Aura\""));
    assert_eq!(probe.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ensure_is_idempotent() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Cheerful).await.unwrap();
    session.send("Hello").await.unwrap();

    for _ in 0..3 {
        let status = session.ensure_agent(KEY, Persona::Cheerful).await.unwrap();
        assert_eq!(status, AgentStatus::Reused);
    }

    assert_eq!(probe.connects.load(Ordering::SeqCst), 1);
    assert_eq!(probe.request_count(), 2);
    assert_eq!(session.transcript().len(), 3);
}

#[tokio::test]
async fn test_persona_change_rebuilds_once() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Cheerful).await.unwrap();
    session.send("Hello").await.unwrap();

    let status = session.ensure_agent(KEY, Persona::Tsundere).await.unwrap();
    assert_eq!(status, AgentStatus::Rebuilt);
    assert_eq!(
        session.ensure_agent(KEY, Persona::Tsundere).await.unwrap(),
        AgentStatus::Reused
    );

    assert_eq!(probe.connects.load(Ordering::SeqCst), 2);
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript().count(TurnRole::Assistant), 1);
    assert!(
        probe
            .last_request()
            .system
            .as_deref()
            .unwrap()
            .contains("Your personality is Tsundere.")
    );
}

#[tokio::test]
async fn test_credential_change_rebuilds_once() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Yandere).await.unwrap();
    session.send("Hello").await.unwrap();

    let status = session
        .ensure_agent("another-key", Persona::Yandere)
        .await
        .unwrap();
    assert_eq!(status, AgentStatus::Rebuilt);
    assert_eq!(probe.connects.load(Ordering::SeqCst), 2);
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn test_surrounding_whitespace_is_same_credential() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Calm).await.unwrap();
    let status = session
        .ensure_agent(&format!("  {KEY}\n"), Persona::Calm)
        .await
        .unwrap();
    assert_eq!(status, AgentStatus::Reused);
    assert_eq!(probe.connects.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_reset_then_ensure_greets_once() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Kuudere).await.unwrap();
    session.send("Hello").await.unwrap();

    session.reset();
    assert!(session.transcript().is_empty());
    assert!(!session.is_ready());

    let status = session.ensure_agent(KEY, Persona::Kuudere).await.unwrap();
    assert_eq!(status, AgentStatus::Rebuilt);
    assert_eq!(session.transcript().len(), 1);
    assert_eq!(session.transcript().count(TurnRole::Assistant), 1);

    // The new agent starts with empty memory.
    assert_eq!(probe.last_request().messages.len(), 1);
}

#[tokio::test]
async fn test_blank_turn_rejected() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Calm).await.unwrap();
    let before = probe.request_count();

    for text in ["", "   ", "\n\t"] {
        assert!(matches!(
            session.send(text).await,
            Err(SessionError::EmptyTurn)
        ));
    }
    assert_eq!(probe.request_count(), before);
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn test_missing_credential() {
    let (mut session, probe) = session();

    for key in ["", "   "] {
        let err = session.ensure_agent(key, Persona::Calm).await.unwrap_err();
        assert!(matches!(err, SessionError::MissingCredential));
        assert!(err.is_blocking());
    }
    assert_eq!(probe.connects.load(Ordering::SeqCst), 0);
    assert!(!session.is_ready());
}

#[tokio::test]
async fn test_missing_credential_keeps_existing_agent() {
    let (mut session, _probe) = session();
    session.ensure_agent(KEY, Persona::Calm).await.unwrap();

    assert!(session.ensure_agent("", Persona::Humorous).await.is_err());
    assert!(session.is_ready());
    assert_eq!(session.persona(), Some(Persona::Calm));
    assert_eq!(session.transcript().len(), 1);
}

#[tokio::test]
async fn test_send_appends_human_and_assistant() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Humorous).await.unwrap();

    let turn = session.send("Hello").await.unwrap();
    assert_eq!(turn.role, TurnRole::Assistant);
    assert_eq!(turn.content, "reply to: Hello");

    let turns = session.transcript().turns();
    assert_eq!(turns.len(), 3);
    assert_eq!(turns[1].role, TurnRole::Human);
    assert_eq!(turns[1].content, "Hello");

    // Memory carries the greeting exchange into the next request.
    let messages = probe.last_request().messages;
    assert_eq!(messages.len(), 3);
    assert!(messages[0].joined_text().starts_with("Greet me warmly"));
    assert_eq!(messages[2].joined_text(), "Hello");
}

#[tokio::test]
async fn test_invocation_failure_becomes_turn() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Mysterious).await.unwrap();
    probe.fail_with("model exploded");

    let turn = session.send("Hello").await.unwrap();
    assert_eq!(turn.content, "An error occurred: API error: model exploded");
    assert_eq!(session.transcript().count(TurnRole::Human), 1);
    assert_eq!(session.transcript().len(), 3);
}

#[tokio::test]
async fn test_empty_reply_fallback() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Intellectual).await.unwrap();
    probe.queue_reply("   ");

    let turn = session.send("Say nothing").await.unwrap();
    assert_eq!(turn.content, EMPTY_REPLY);

    // The silent exchange is not replayed, so roles still alternate.
    session.send("Hello?").await.unwrap();
    let roles: Vec<_> = probe.last_request().messages.iter().map(|m| m.role).collect();
    assert_eq!(roles, [Role::User, Role::Assistant, Role::User]);
}

#[tokio::test]
async fn test_send_before_ready() {
    let (mut session, probe) = session();
    assert!(matches!(
        session.send("Hello").await,
        Err(SessionError::NotReady)
    ));
    assert!(session.transcript().is_empty());
    assert_eq!(probe.request_count(), 0);
}

#[tokio::test]
async fn test_rejected_key_is_authentication_error() {
    let (mut session, probe) = session();
    session.ensure_agent(KEY, Persona::Calm).await.unwrap();

    let err = session
        .ensure_agent("bad-key", Persona::Calm)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Authentication(ref m) if m.contains("API key not valid")));
    assert!(err.is_blocking());
    assert!(!session.is_ready());
    assert!(session.transcript().is_empty());
    assert!(!format!("{err:?}").contains(KEY));

    // Retrying with the bad key attempts a fresh connection.
    assert!(session.ensure_agent("bad-key", Persona::Calm).await.is_err());
    assert_eq!(probe.connects.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_transport_failure_is_connection_error() {
    let (mut session, _probe) = session();
    let err = session
        .ensure_agent("offline", Persona::Calm)
        .await
        .unwrap_err();
    assert!(matches!(err, SessionError::Connection(_)));
    assert!(err.is_blocking());
}

#[tokio::test]
async fn test_greeting_failure_leaves_session_usable() {
    let (mut session, probe) = session();
    probe.fail_with("quota exhausted for today");

    let err = session.ensure_agent(KEY, Persona::Calm).await.unwrap_err();
    assert!(matches!(err, SessionError::Startup(_)));
    assert!(!err.is_blocking());
    assert!(session.is_ready());
    assert!(session.transcript().is_empty());

    // Same configuration afterwards is a reuse, not another greeting.
    *probe.failure.lock().unwrap() = None;
    assert_eq!(
        session.ensure_agent(KEY, Persona::Calm).await.unwrap(),
        AgentStatus::Reused
    );
    session.send("Hello").await.unwrap();
    assert_eq!(session.transcript().len(), 2);
}

#[tokio::test]
async fn test_store_lifecycle() {
    let probe = Arc::new(Probe::default());
    let mut store = SessionStore::new(factory(&probe));

    let a = store.create();
    let b = store.create();
    assert_ne!(a, b);
    assert_eq!(store.len(), 2);

    let session = store.get_mut(&a).unwrap();
    session.ensure_agent(KEY, Persona::Calm).await.unwrap();
    session.send("Hello").await.unwrap();

    assert_eq!(store.get(&a).unwrap().transcript().len(), 3);
    assert!(store.get(&b).unwrap().transcript().is_empty());

    store.destroy(&a).unwrap();
    assert!(store.get(&a).is_none());
    assert!(matches!(
        store.destroy(&a),
        Err(SessionStoreError::NotFound(id)) if id == a
    ));
    assert_eq!(store.len(), 1);
}
