//! Mock transport for testing: scripted responses, a call log, and an
//! injectable server-event channel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::mpsc;

use live_protocol::{ClockSnapshot, MoveDescriptor, MoveRecord, ServerEvent};

use crate::transport::{
    ResumeRequestStatus, SessionInfo, Transport, TransportError, TransportResult,
};

/// Every RPC the mock observed, in order.
#[derive(Debug, Clone)]
pub enum MockCall {
    FetchSession,
    FetchMoveHistory,
    Subscribe,
    SendMove(Box<MoveDescriptor>),
    PauseGame(ClockSnapshot),
    ResignGame,
    OfferDraw,
    AcceptDraw,
    DeclineDraw,
    RequestResume,
    RespondResume(bool),
    ResumeRequestStatus,
    ClearResumeRequest,
    ForfeitByTimeout,
}

#[derive(Default)]
struct MockInner {
    session: Option<SessionInfo>,
    history: Vec<MoveRecord>,
    resume_status: ResumeRequestStatus,
    failures: HashMap<&'static str, TransportError>,
    calls: Vec<MockCall>,
    event_rx: Option<mpsc::Receiver<ServerEvent>>,
}

/// Scriptable [`Transport`] double. Construction hands back the sender
/// half of the event channel so tests can push server events at will.
#[derive(Clone)]
pub struct MockTransport {
    inner: Arc<Mutex<MockInner>>,
}

impl MockTransport {
    pub fn new() -> (Self, mpsc::Sender<ServerEvent>) {
        let (event_tx, event_rx) = mpsc::channel(64);
        let transport = Self {
            inner: Arc::new(Mutex::new(MockInner {
                event_rx: Some(event_rx),
                ..MockInner::default()
            })),
        };
        (transport, event_tx)
    }

    pub fn with_session(self, info: SessionInfo) -> Self {
        self.inner.lock().unwrap().session = Some(info);
        self
    }

    pub fn set_history(&self, history: Vec<MoveRecord>) {
        self.inner.lock().unwrap().history = history;
    }

    pub fn set_resume_status(&self, status: ResumeRequestStatus) {
        self.inner.lock().unwrap().resume_status = status;
    }

    /// Make every future call to `method` fail with `err`.
    pub fn fail_with(&self, method: &'static str, err: TransportError) {
        self.inner.lock().unwrap().failures.insert(method, err);
    }

    pub fn clear_failure(&self, method: &'static str) {
        self.inner.lock().unwrap().failures.remove(method);
    }

    pub fn calls(&self) -> Vec<MockCall> {
        self.inner.lock().unwrap().calls.clone()
    }

    pub fn call_count(&self, name: &str) -> usize {
        self.calls()
            .iter()
            .filter(|call| call_name(call) == name)
            .count()
    }

    fn record(&self, call: MockCall, method: &'static str) -> TransportResult<()> {
        let mut inner = self.inner.lock().unwrap();
        inner.calls.push(call);
        match inner.failures.get(method) {
            Some(err) => Err(err.clone()),
            None => Ok(()),
        }
    }
}

fn call_name(call: &MockCall) -> &'static str {
    match call {
        MockCall::FetchSession => "fetch_session",
        MockCall::FetchMoveHistory => "fetch_move_history",
        MockCall::Subscribe => "subscribe",
        MockCall::SendMove(_) => "send_move",
        MockCall::PauseGame(_) => "pause_game",
        MockCall::ResignGame => "resign_game",
        MockCall::OfferDraw => "offer_draw",
        MockCall::AcceptDraw => "accept_draw",
        MockCall::DeclineDraw => "decline_draw",
        MockCall::RequestResume => "request_resume",
        MockCall::RespondResume(_) => "respond_resume",
        MockCall::ResumeRequestStatus => "resume_request_status",
        MockCall::ClearResumeRequest => "clear_resume_request",
        MockCall::ForfeitByTimeout => "forfeit_by_timeout",
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn fetch_session(&self) -> TransportResult<SessionInfo> {
        self.record(MockCall::FetchSession, "fetch_session")?;
        self.inner
            .lock()
            .unwrap()
            .session
            .clone()
            .ok_or_else(|| TransportError::Protocol("mock session not configured".into()))
    }

    async fn fetch_move_history(&self) -> TransportResult<Vec<MoveRecord>> {
        self.record(MockCall::FetchMoveHistory, "fetch_move_history")?;
        Ok(self.inner.lock().unwrap().history.clone())
    }

    async fn subscribe(&self) -> TransportResult<mpsc::Receiver<ServerEvent>> {
        self.record(MockCall::Subscribe, "subscribe")?;
        self.inner
            .lock()
            .unwrap()
            .event_rx
            .take()
            .ok_or_else(|| TransportError::Protocol("already subscribed".into()))
    }

    async fn send_move(&self, descriptor: MoveDescriptor) -> TransportResult<()> {
        self.record(MockCall::SendMove(Box::new(descriptor)), "send_move")
    }

    async fn pause_game(&self, clocks: ClockSnapshot) -> TransportResult<()> {
        self.record(MockCall::PauseGame(clocks), "pause_game")
    }

    async fn resign_game(&self) -> TransportResult<()> {
        self.record(MockCall::ResignGame, "resign_game")
    }

    async fn offer_draw(&self) -> TransportResult<()> {
        self.record(MockCall::OfferDraw, "offer_draw")
    }

    async fn accept_draw(&self) -> TransportResult<()> {
        self.record(MockCall::AcceptDraw, "accept_draw")
    }

    async fn decline_draw(&self) -> TransportResult<()> {
        self.record(MockCall::DeclineDraw, "decline_draw")
    }

    async fn request_resume(&self) -> TransportResult<()> {
        self.record(MockCall::RequestResume, "request_resume")
    }

    async fn respond_resume(&self, accepted: bool) -> TransportResult<()> {
        self.record(MockCall::RespondResume(accepted), "respond_resume")
    }

    async fn resume_request_status(&self) -> TransportResult<ResumeRequestStatus> {
        self.record(MockCall::ResumeRequestStatus, "resume_request_status")?;
        Ok(self.inner.lock().unwrap().resume_status.clone())
    }

    async fn clear_resume_request(&self) -> TransportResult<()> {
        self.record(MockCall::ClearResumeRequest, "clear_resume_request")
    }

    async fn forfeit_by_timeout(&self) -> TransportResult<()> {
        self.record(MockCall::ForfeitByTimeout, "forfeit_by_timeout")
    }
}
