//! Cheap, cloneable handle to a session actor.

use tokio::sync::{broadcast, mpsc, oneshot};
use tokio_stream::wrappers::BroadcastStream;

use crate::commands::SessionCommand;
use crate::error::{SessionError, SessionResult};
use crate::view::{EngineEvent, SessionView};

#[derive(Clone, Debug)]
pub struct SessionHandle {
    id: String,
    cmd_tx: mpsc::Sender<SessionCommand>,
}

impl SessionHandle {
    pub(crate) fn new(id: String, cmd_tx: mpsc::Sender<SessionCommand>) -> Self {
        Self { id, cmd_tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Attempt a local move. Rejections carry the specific reason and
    /// guarantee zero state mutation.
    pub async fn attempt_move(
        &self,
        from: &str,
        to: &str,
        promotion: Option<char>,
    ) -> SessionResult<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::AttemptMove {
            from: from.to_string(),
            to: to.to_string(),
            promotion,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn request_resume(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::RequestResume { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    /// Resume with bounded automatic retries (for lobby-style callers).
    pub async fn auto_resume(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::AutoResume { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn respond_resume(&self, accepted: bool) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::RespondResume {
            accepted,
            reply: tx,
        })
        .await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn resign(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Resign { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn offer_draw(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::OfferDraw { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn accept_draw(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::AcceptDraw { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    pub async fn decline_draw(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::DeclineDraw { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)?
    }

    /// Answer the presence prompt: "I'm still here".
    pub async fn confirm_presence(&self) -> SessionResult<()> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::ConfirmPresence { reply: tx })
            .await?;
        rx.await.map_err(|_| SessionError::EngineClosed)
    }

    pub async fn view(&self) -> SessionResult<SessionView> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::GetView { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)
    }

    /// Current view plus a subscription to subsequent engine events.
    pub async fn subscribe(
        &self,
    ) -> SessionResult<(SessionView, broadcast::Receiver<EngineEvent>)> {
        let (tx, rx) = oneshot::channel();
        self.send(SessionCommand::Subscribe { reply: tx }).await?;
        rx.await.map_err(|_| SessionError::EngineClosed)
    }

    /// Like [`subscribe`](Self::subscribe), but wraps the receiver as a
    /// `Stream` for select-based render loops.
    pub async fn event_stream(
        &self,
    ) -> SessionResult<(SessionView, BroadcastStream<EngineEvent>)> {
        let (view, rx) = self.subscribe().await?;
        Ok((view, BroadcastStream::new(rx)))
    }

    pub async fn shutdown(&self) {
        let _ = self.cmd_tx.send(SessionCommand::Shutdown).await;
    }

    async fn send(&self, cmd: SessionCommand) -> SessionResult<()> {
        self.cmd_tx
            .send(cmd)
            .await
            .map_err(|_| SessionError::EngineClosed)
    }
}
