//! Turn-based dialogue state machine.
//!
//! Every submitted message lands in one of three bands:
//!
//! | Band | Condition | Reply |
//! |------|-----------|-------|
//! | Deflect | message length `<= 7` | random filler from [`DEFLECT_REPLIES`] |
//! | Probe | longer message, history length `<= 3` | random prompt from [`PROBE_REPLIES`] |
//! | Delegate | longer message, history length `>= 4` | answer from the resolver |
//!
//! History length counts the message being evaluated, the way a chat window
//! shows it right after it is sent.
//!
//! The transitions are pure functions over [`Session`], which is passed in
//! and returned by value. [`ChatDriver`] owns the live session on a single
//! task, runs the typing delay and the non-blocking resolver calls, and
//! publishes each new session snapshot on a `watch` channel. Every appended
//! [`Entry`] is also broadcast, for front-ends that print a transcript.

use async_trait::async_trait;
use rand::seq::SliceRandom;
use rand::Rng;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::markup;
use crate::models::Query;
use crate::resolver::Resolver;

/// Fillers for messages too short to act on.
pub const DEFLECT_REPLIES: [&str; 4] = [
    "you need to be a bit more specific",
    "come on I am trying to help",
    "whatever",
    "that does not sound like a bug",
];

/// Clarifying prompts used early in the conversation.
pub const PROBE_REPLIES: [&str; 5] = [
    "can you elaborate?",
    "and why do you believe that is so?",
    "can you be more specific?",
    "what would be your guess?",
    "I need more details for this one",
];

/// Messages up to this many characters are deflected.
pub const DEFLECT_MAX_LEN: usize = 7;
/// History length, including the message itself, up to which longer
/// messages are probed instead of resolved.
pub const PROBE_MAX_HISTORY: usize = 3;
/// Entries dropped from the front once history exceeds its limit.
const TRIM_COUNT: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Band {
    Deflect,
    Probe,
    Delegate,
}

/// Chooses the band for `message` submitted on top of `history_len` entries.
pub fn classify(message: &str, history_len: usize) -> Band {
    if message.chars().count() <= DEFLECT_MAX_LEN {
        Band::Deflect
    } else if history_len < PROBE_MAX_HISTORY {
        // The message itself is one more entry on top of `history_len`.
        Band::Probe
    } else {
        Band::Delegate
    }
}

/// A random canned reply for the Deflect or Probe band.
pub fn canned_reply<R: Rng + ?Sized>(band: Band, rng: &mut R) -> Option<String> {
    let pool: &[&str] = match band {
        Band::Deflect => &DEFLECT_REPLIES,
        Band::Probe => &PROBE_REPLIES,
        Band::Delegate => return None,
    };
    pool.choose(rng).map(|s| s.to_string())
}

/// Drops the two oldest entries once `history` is longer than `limit`.
///
/// Applied once per submit, so a history well over the limit shrinks by two
/// per call rather than all the way down.
pub fn trim_history(history: &mut Vec<String>, limit: usize) {
    if history.len() > limit {
        let n = TRIM_COUNT.min(history.len());
        history.drain(..n);
    }
}

/// Conversation state for one chat.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub input_value: String,
    pub last_submitted: String,
    pub history: Vec<String>,
    pub history_limit: usize,
}

impl Default for Session {
    fn default() -> Self {
        Self {
            input_value: String::new(),
            last_submitted: String::new(),
            history: Vec::new(),
            history_limit: 12,
        }
    }
}

/// A message accepted by [`Session::submit`] and waiting for evaluation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pending {
    pub message: String,
}

impl Session {
    pub fn new(greeting: &str) -> Self {
        Self {
            history: vec![greeting.to_string()],
            ..Self::default()
        }
    }

    pub fn with_history(history: Vec<String>) -> Self {
        Self {
            history,
            ..Self::default()
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.history_limit = limit;
        self
    }

    /// Tracks the text currently in the input box.
    pub fn input(mut self, value: &str) -> Self {
        self.input_value = value.to_string();
        self
    }

    /// Handles the submit event.
    ///
    /// Blank text is ignored. Otherwise the input box is cleared, the message
    /// becomes `last_submitted` and the history is trimmed.
    pub fn submit(mut self, text: &str) -> (Self, Option<Pending>) {
        let message = text.trim();
        if message.is_empty() {
            return (self, None);
        }

        self.input_value.clear();
        self.last_submitted = message.to_string();
        trim_history(&mut self.history, self.history_limit);

        let pending = Pending {
            message: message.to_string(),
        };
        (self, Some(pending))
    }

    /// Appends a completed turn: the user's message, then the reply.
    pub fn record(mut self, message: &str, reply: String) -> Self {
        self.history.push(message.to_string());
        self.history.push(reply);
        self
    }

    /// Appends a message that will get no reply of its own.
    pub fn record_unanswered(mut self, message: &str) -> Self {
        self.history.push(message.to_string());
        self
    }

    pub fn band_for(&self, pending: &Pending) -> Band {
        classify(&pending.message, self.history.len())
    }
}

// ============ Resolution outcomes ============

/// What came back from a delegated resolution, as the dialogue sees it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResolutionOutcome {
    /// Success with a non-empty markup body.
    Answer(String),
    /// Success but no usable body.
    EmptyBody,
    /// Not found or any other client-class rejection.
    Rejected,
    /// Transport failure, server error or an unrecognized status.
    Failed(String),
}

/// Turns a resolution outcome into the reply appended to history.
pub fn reply_for<R: Rng + ?Sized>(outcome: &ResolutionOutcome, rng: &mut R) -> String {
    match outcome {
        ResolutionOutcome::Answer(markup) => {
            let text = markup::flatten(markup);
            if text.trim().is_empty() {
                DEFLECT_REPLIES[0].to_string()
            } else {
                text
            }
        }
        ResolutionOutcome::EmptyBody | ResolutionOutcome::Rejected => {
            DEFLECT_REPLIES[0].to_string()
        }
        ResolutionOutcome::Failed(_) => {
            canned_reply(Band::Probe, rng).unwrap_or_else(|| PROBE_REPLIES[0].to_string())
        }
    }
}

/// Classifies a `{ status, data }` response envelope from the query endpoint.
pub fn classify_envelope(status: Option<u64>, data: &Value) -> ResolutionOutcome {
    match status {
        Some(200) => match data.get("body").and_then(Value::as_str) {
            Some(body) if !body.trim().is_empty() => ResolutionOutcome::Answer(body.to_string()),
            _ => ResolutionOutcome::EmptyBody,
        },
        Some(code) if (400..500).contains(&code) => ResolutionOutcome::Rejected,
        Some(code) => ResolutionOutcome::Failed(format!("status {}", code)),
        None => ResolutionOutcome::Failed("response without status".to_string()),
    }
}

// ============ Backends ============

/// The network boundary the dialogue delegates to.
#[async_trait]
pub trait ResolveBackend: Send + Sync {
    async fn resolve(&self, query: &str) -> ResolutionOutcome;
}

/// Posts the query to a running server's `/query` endpoint.
pub struct HttpBackend {
    url: String,
    http: reqwest::Client,
}

#[derive(Deserialize)]
struct Envelope {
    #[serde(default)]
    status: Option<u64>,
    #[serde(default)]
    data: Value,
}

impl HttpBackend {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            http: reqwest::Client::new(),
        }
    }
}

#[async_trait]
impl ResolveBackend for HttpBackend {
    async fn resolve(&self, query: &str) -> ResolutionOutcome {
        let response = match self
            .http
            .post(&self.url)
            .json(&json!({ "query": query }))
            .send()
            .await
        {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, "query request failed");
                return ResolutionOutcome::Failed(e.to_string());
            }
        };

        match response.json::<Envelope>().await {
            Ok(envelope) => classify_envelope(envelope.status, &envelope.data),
            Err(e) => {
                warn!(error = %e, "unreadable query response");
                ResolutionOutcome::Failed(e.to_string())
            }
        }
    }
}

/// Resolves in-process, without the HTTP hop.
pub struct LocalBackend {
    resolver: Arc<Resolver>,
}

impl LocalBackend {
    pub fn new(resolver: Arc<Resolver>) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ResolveBackend for LocalBackend {
    async fn resolve(&self, query: &str) -> ResolutionOutcome {
        let result = match Query::parse(query) {
            Ok(query) => self.resolver.resolve(&query).await,
            Err(e) => Err(e),
        };
        match result {
            Ok(answer) => match answer.markup() {
                Some(body) => ResolutionOutcome::Answer(body.to_string()),
                None => ResolutionOutcome::EmptyBody,
            },
            Err(e) if e.status().is_client_error() => ResolutionOutcome::Rejected,
            Err(e) => ResolutionOutcome::Failed(e.to_string()),
        }
    }
}

// ============ Driver ============

/// One entry appended to the history, tagged with who said it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    Message(String),
    Reply(String),
}

#[derive(Debug)]
enum ChatEvent {
    Input(String),
    Submit(String),
    Evaluate(u64),
    Resolved {
        pending: Pending,
        outcome: ResolutionOutcome,
    },
}

/// Handle used by the front-end to feed events into a running chat.
///
/// Dropping every handle ends the driver once in-flight work has reported.
#[derive(Clone)]
pub struct ChatHandle {
    events: mpsc::UnboundedSender<ChatEvent>,
    sessions: watch::Receiver<Session>,
    entries: broadcast::Sender<Entry>,
}

impl ChatHandle {
    pub fn input(&self, value: &str) {
        let _ = self.events.send(ChatEvent::Input(value.to_string()));
    }

    pub fn submit(&self, text: &str) {
        let _ = self.events.send(ChatEvent::Submit(text.to_string()));
    }

    /// Receiver of session snapshots, updated after every history change.
    pub fn sessions(&self) -> watch::Receiver<Session> {
        self.sessions.clone()
    }

    /// Every entry appended from now on, in order.
    pub fn entries(&self) -> broadcast::Receiver<Entry> {
        self.entries.subscribe()
    }
}

/// A submitted message sitting out its typing delay.
struct Typing {
    ticket: u64,
    pending: Pending,
    timer: JoinHandle<()>,
}

/// Owns the live [`Session`] and serializes every mutation onto one task.
///
/// A new submit aborts a typing delay that has not fired yet. The message
/// it was holding is recorded without a reply, and only the newest message
/// is evaluated. Resolutions already in flight are not cancelled; each one
/// records its own message and reply when it completes, in completion order.
pub struct ChatDriver<R> {
    session: Session,
    backend: Arc<dyn ResolveBackend>,
    rng: R,
    typing_delay: Duration,
    events: mpsc::WeakUnboundedSender<ChatEvent>,
    sessions: watch::Sender<Session>,
    entries: broadcast::Sender<Entry>,
    typing: Option<Typing>,
    next_ticket: u64,
}

impl<R: Rng + Send + 'static> ChatDriver<R> {
    /// Starts the driver task and returns a handle plus the task itself,
    /// which yields the final session when the chat ends.
    pub fn spawn(
        session: Session,
        backend: Arc<dyn ResolveBackend>,
        rng: R,
        typing_delay: Duration,
    ) -> (ChatHandle, JoinHandle<Session>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let (sessions_tx, sessions_rx) = watch::channel(session.clone());
        let (entries_tx, _) = broadcast::channel(64);

        let driver = ChatDriver {
            session,
            backend,
            rng,
            typing_delay,
            events: tx.downgrade(),
            sessions: sessions_tx,
            entries: entries_tx.clone(),
            typing: None,
            next_ticket: 0,
        };
        let task = tokio::spawn(driver.run(rx));

        let handle = ChatHandle {
            events: tx,
            sessions: sessions_rx,
            entries: entries_tx,
        };
        (handle, task)
    }

    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<ChatEvent>) -> Session {
        while let Some(event) = rx.recv().await {
            self.handle(event);
        }
        self.session
    }

    fn handle(&mut self, event: ChatEvent) {
        match event {
            ChatEvent::Input(value) => {
                self.session = std::mem::take(&mut self.session).input(&value);
            }
            ChatEvent::Submit(text) => {
                let (session, pending) = std::mem::take(&mut self.session).submit(&text);
                self.session = session;
                if let Some(pending) = pending {
                    self.supersede();
                    self.schedule(pending);
                }
                self.publish();
            }
            ChatEvent::Evaluate(ticket) => {
                // A stale ticket means its message was already superseded.
                match self.typing.take() {
                    Some(typing) if typing.ticket == ticket => self.evaluate(typing.pending),
                    other => self.typing = other,
                }
            }
            ChatEvent::Resolved { pending, outcome } => {
                debug!(?outcome, "resolution finished");
                let reply = reply_for(&outcome, &mut self.rng);
                self.record(&pending, reply);
            }
        }
    }

    fn supersede(&mut self) {
        let Some(previous) = self.typing.take() else {
            return;
        };
        previous.timer.abort();
        debug!(message = %previous.pending.message, "superseded before evaluation");
        self.session =
            std::mem::take(&mut self.session).record_unanswered(&previous.pending.message);
        let _ = self.entries.send(Entry::Message(previous.pending.message));
    }

    fn schedule(&mut self, pending: Pending) {
        let Some(tx) = self.events.upgrade() else {
            return;
        };
        let ticket = self.next_ticket;
        self.next_ticket += 1;

        let delay = self.typing_delay;
        let timer = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = tx.send(ChatEvent::Evaluate(ticket));
        });
        self.typing = Some(Typing {
            ticket,
            pending,
            timer,
        });
    }

    fn evaluate(&mut self, pending: Pending) {
        let band = self.session.band_for(&pending);
        debug!(?band, history = self.session.history.len(), "evaluating message");

        match canned_reply(band, &mut self.rng) {
            Some(reply) => self.record(&pending, reply),
            None => {
                let Some(tx) = self.events.upgrade() else {
                    return;
                };
                let backend = self.backend.clone();
                tokio::spawn(async move {
                    let outcome = backend.resolve(&pending.message).await;
                    let _ = tx.send(ChatEvent::Resolved { pending, outcome });
                });
            }
        }
    }

    fn record(&mut self, pending: &Pending, reply: String) {
        self.session =
            std::mem::take(&mut self.session).record(&pending.message, reply.clone());
        self.publish();
        let _ = self.entries.send(Entry::Message(pending.message.clone()));
        let _ = self.entries.send(Entry::Reply(reply));
    }

    fn publish(&self) {
        self.sessions.send_replace(self.session.clone());
    }
}
