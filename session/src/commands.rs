//! Commands sent to the session actor. Each embeds a oneshot for the
//! reply.

use tokio::sync::{broadcast, oneshot};

use crate::error::SessionError;
use crate::view::{EngineEvent, SessionView};

pub enum SessionCommand {
    AttemptMove {
        from: String,
        to: String,
        promotion: Option<char>,
        reply: oneshot::Sender<Result<SessionView, SessionError>>,
    },
    RequestResume {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// Externally-initiated resume with bounded retries (lobby flow).
    AutoResume {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    RespondResume {
        accepted: bool,
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    Resign {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    OfferDraw {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    AcceptDraw {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    DeclineDraw {
        reply: oneshot::Sender<Result<(), SessionError>>,
    },
    /// The player confirmed the presence prompt.
    ConfirmPresence {
        reply: oneshot::Sender<()>,
    },
    GetView {
        reply: oneshot::Sender<SessionView>,
    },
    Subscribe {
        reply: oneshot::Sender<(SessionView, broadcast::Receiver<EngineEvent>)>,
    },
    Shutdown,
}
