//! The session actor loop.
//!
//! Owns all mutable state. One `tokio::select!` serializes local
//! commands, remote server events, the 1-second clock tick, the
//! 1-second presence check, and the auto-resume retry deadline. There
//! is no ordering guarantee between a locally-applied move and the
//! transport's echo of it; correctness rests on actor-identity checks,
//! not arrival order.

use std::sync::Arc;
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

use tokio::sync::{broadcast, mpsc};
use tokio::time;
use tracing::Instrument;

use live_protocol::{GameResult, PlayerColor, ServerEvent, SessionStatus};

use crate::clock::compute_remaining;
use crate::commands::SessionCommand;
use crate::error::{SessionError, SessionResult};
use crate::ports::SessionPorts;
use crate::presence::PresenceAction;
use crate::resume::{resolve_race, AutoResume, RaceResolution, ResumeDirection, ResumeNegotiation};
use crate::state::SessionState;
use crate::transport::Transport;
use crate::view::{EngineEvent, SessionView};

pub(crate) struct ActorDeps {
    pub transport: Arc<dyn Transport>,
    pub ports: SessionPorts,
}

pub(crate) async fn run_session_actor(
    state: SessionState,
    deps: ActorDeps,
    cmd_rx: mpsc::Receiver<SessionCommand>,
    server_rx: mpsc::Receiver<ServerEvent>,
    event_tx: broadcast::Sender<EngineEvent>,
) {
    let session_id = state.session_id.clone();
    run_actor_inner(state, deps, cmd_rx, server_rx, event_tx)
        .instrument(tracing::info_span!("session", id = %session_id))
        .await;
}

async fn run_actor_inner(
    mut state: SessionState,
    deps: ActorDeps,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    mut server_rx: mpsc::Receiver<ServerEvent>,
    event_tx: broadcast::Sender<EngineEvent>,
) {
    tracing::info!("Session actor started");

    let mut clock_interval = time::interval(state.config.tick_interval);
    clock_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);
    let mut presence_interval = time::interval(state.config.tick_interval);
    presence_interval.set_missed_tick_behavior(time::MissedTickBehavior::Skip);

    let mut server_open = true;

    loop {
        let retry_at = state.auto_resume.as_ref().and_then(AutoResume::next_at);

        tokio::select! {
            biased;

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(SessionCommand::Shutdown) | None => {
                        tracing::info!("Session actor shutting down");
                        teardown(&mut state, &deps).await;
                        break;
                    }
                    Some(cmd) => handle_command(&mut state, cmd, &deps, &event_tx).await,
                }
            }

            event = server_rx.recv(), if server_open => {
                match event {
                    Some(event) => handle_server_event(&mut state, event, &deps, &event_tx).await,
                    None => {
                        tracing::warn!("Server event channel closed");
                        server_open = false;
                        state.connected = false;
                        emit_state(&state, &event_tx);
                    }
                }
            }

            _ = clock_interval.tick(), if state.clocks.running().is_some() => {
                on_clock_tick(&mut state, &deps, &event_tx).await;
            }

            _ = presence_interval.tick(), if state.is_active() => {
                on_presence_tick(&mut state, &deps, &event_tx).await;
            }

            _ = sleep_until_deadline(retry_at), if retry_at.is_some() => {
                on_auto_resume_due(&mut state, &deps, &event_tx).await;
            }
        }
    }

    tracing::info!("Session actor exited");
}

async fn sleep_until_deadline(at: Option<Instant>) {
    match at {
        Some(at) => time::sleep_until(time::Instant::from_std(at)).await,
        None => std::future::pending().await,
    }
}

fn emit_state(state: &SessionState, event_tx: &broadcast::Sender<EngineEvent>) {
    let _ = event_tx.send(EngineEvent::StateChanged(state.snapshot(Instant::now())));
}

/// Teardown must never leave a resume request orphaned server-side.
async fn teardown(state: &mut SessionState, deps: &ActorDeps) {
    let pending_sent = state
        .negotiation
        .as_ref()
        .is_some_and(|n| n.is_pending() && n.direction == ResumeDirection::Sent);
    if pending_sent {
        if let Err(e) = deps.transport.clear_resume_request().await {
            tracing::warn!(error = %e, "Failed to clear pending resume request on teardown");
        }
        state.negotiation = None;
    }
}

// --- Commands ---

async fn handle_command(
    state: &mut SessionState,
    cmd: SessionCommand,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    match cmd {
        SessionCommand::AttemptMove {
            from,
            to,
            promotion,
            reply,
        } => {
            let result = attempt_move(state, deps, &from, &to, promotion).await;
            if result.is_ok() {
                emit_state(state, event_tx);
            }
            let _ = reply.send(result);
        }
        SessionCommand::RequestResume { reply } => {
            let result = request_resume_flow(state, deps).await;
            emit_state(state, event_tx);
            let _ = reply.send(result);
        }
        SessionCommand::AutoResume { reply } => {
            let result = if state.status == SessionStatus::Paused {
                state.manual_resume_available = false;
                state.auto_resume = Some(AutoResume::new(
                    state.config.auto_resume_backoff.clone(),
                    Instant::now(),
                ));
                Ok(())
            } else {
                Err(SessionError::NotPaused)
            };
            let _ = reply.send(result);
        }
        SessionCommand::RespondResume { accepted, reply } => {
            let result = respond_resume_flow(state, deps, accepted).await;
            emit_state(state, event_tx);
            let _ = reply.send(result);
        }
        SessionCommand::Resign { reply } => {
            teardown(state, deps).await;
            let result = deps
                .transport
                .resign_game()
                .await
                .map_err(SessionError::from);
            let _ = reply.send(result);
        }
        SessionCommand::OfferDraw { reply } => {
            let result = deps.transport.offer_draw().await.map_err(SessionError::from);
            let _ = reply.send(result);
        }
        SessionCommand::AcceptDraw { reply } => {
            let result = deps
                .transport
                .accept_draw()
                .await
                .map_err(SessionError::from);
            let _ = reply.send(result);
        }
        SessionCommand::DeclineDraw { reply } => {
            let result = deps
                .transport
                .decline_draw()
                .await
                .map_err(SessionError::from);
            let _ = reply.send(result);
        }
        SessionCommand::ConfirmPresence { reply } => {
            state.presence.confirm(Instant::now());
            emit_state(state, event_tx);
            let _ = reply.send(());
        }
        SessionCommand::GetView { reply } => {
            let _ = reply.send(state.snapshot(Instant::now()));
        }
        SessionCommand::Subscribe { reply } => {
            let snapshot = state.snapshot(Instant::now());
            let _ = reply.send((snapshot, event_tx.subscribe()));
        }
        SessionCommand::Shutdown => unreachable!(),
    }
}

async fn attempt_move(
    state: &mut SessionState,
    deps: &ActorDeps,
    from: &str,
    to: &str,
    promotion: Option<char>,
) -> SessionResult<SessionView> {
    state
        .validate_attempt()
        .map_err(SessionError::Rejected)?;

    // Validate against the current authoritative FEN, never a cached
    // board. A failed apply leaves everything untouched.
    let mut position = state.position()?;
    let applied = position.apply_uci(from, to, promotion)?;

    let now = Instant::now();
    let elapsed_s = now.duration_since(state.turn_started).as_secs_f64();
    let score_delta = deps.ports.evaluator.evaluate(
        &applied.san,
        &applied.fen_before,
        &applied.fen_after,
        elapsed_s,
        state.baseline_rating,
        state.difficulty_factor,
    );

    let record = state.apply_local_move(&applied, score_delta, now);

    // Remember our own evaluation key so a delayed echo cannot trigger
    // a second scoring call.
    let _ = state.dedup.insert_if_new(
        (
            state.local_player_id.clone(),
            record.san.clone(),
            record.fen_after.clone(),
        ),
        now,
        state.config.dedup_ttl,
    );

    // Fire and forget: the authoritative echo arrives on the event
    // channel. A transmit failure is surfaced but the optimistic state
    // stands until an authoritative event says otherwise.
    let descriptor = state.descriptor_for(record);
    if let Err(e) = deps.transport.send_move(descriptor).await {
        tracing::warn!(error = %e, "Failed to transmit move");
    }

    deps.ports.sounds.move_played();
    Ok(state.snapshot(now))
}

/// The ordered pre-send race check of the resume handshake.
async fn request_resume_flow(state: &mut SessionState, deps: &ActorDeps) -> SessionResult<()> {
    if state.status != SessionStatus::Paused {
        return Err(SessionError::NotPaused);
    }

    let now = Instant::now();
    // Local checks first; only a clean local state warrants the
    // authoritative server query.
    let resolution = match resolve_race(state.negotiation.as_ref(), None, &state.local_player_id) {
        RaceResolution::ClearToSend => {
            let server = deps.transport.resume_request_status().await?;
            let resolution = resolve_race(
                state.negotiation.as_ref(),
                server.pending_requester_id.as_deref(),
                &state.local_player_id,
            );
            if resolution == RaceResolution::CounterpartPending {
                let deadline = server
                    .expires_at_ms
                    .and_then(|at| deadline_from_epoch(at, now))
                    .unwrap_or(now + state.config.resume_ttl);
                state.negotiation = Some(ResumeNegotiation::received(
                    state.opponent_id().to_string(),
                    deadline,
                ));
            }
            resolution
        }
        local => local,
    };

    match resolution {
        RaceResolution::ClearToSend => {
            deps.transport.request_resume().await?;
            state.negotiation = Some(ResumeNegotiation::sent(
                state.opponent_id().to_string(),
                now + state.config.resume_ttl,
            ));
            Ok(())
        }
        // A duplicate send is a protocol race, never a user-facing
        // error: the existing negotiation simply stands.
        RaceResolution::AlreadyPending
        | RaceResolution::AlreadyReceived
        | RaceResolution::CounterpartPending => Ok(()),
    }
}

async fn respond_resume_flow(
    state: &mut SessionState,
    deps: &ActorDeps,
    accepted: bool,
) -> SessionResult<()> {
    let is_received = state
        .negotiation
        .as_ref()
        .is_some_and(|n| n.is_pending() && n.direction == ResumeDirection::Received);
    if !is_received {
        return Err(SessionError::NoResumeRequest);
    }

    deps.transport.respond_resume(accepted).await?;
    if accepted {
        // Keep the negotiation until the authoritative Resumed event.
        if let Some(neg) = state.negotiation.as_mut() {
            neg.outcome = live_protocol::ResumeOutcome::Accepted;
        }
    } else {
        state.negotiation = None;
    }
    Ok(())
}

// --- Server events ---

/// Per-handler catch: a bad event is logged and surfaced, never fatal
/// to the actor.
async fn handle_server_event(
    state: &mut SessionState,
    event: ServerEvent,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    if let Err(e) = try_handle_server_event(state, event, deps, event_tx).await {
        tracing::error!(error = %e, "Server event handler failed");
        let _ = event_tx.send(EngineEvent::Error(e.to_string()));
    }
}

async fn try_handle_server_event(
    state: &mut SessionState,
    event: ServerEvent,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) -> SessionResult<()> {
    let now = Instant::now();
    match event {
        ServerEvent::Connected => {
            state.connected = true;
        }
        ServerEvent::Disconnected => {
            // Retryable, dismissible; the session itself survives.
            state.connected = false;
        }
        ServerEvent::Move {
            actor_id,
            fen,
            descriptor,
        } => {
            if actor_id == state.local_player_id {
                // Echo of our own optimistic move: overwrite the board,
                // rebase the clocks, but never re-append or flip turn.
                state.fen = fen;
                state.rebase_from_echo(&descriptor.record);
            } else {
                let key = (
                    actor_id,
                    descriptor.record.san.clone(),
                    descriptor.record.fen_after.clone(),
                );
                if state.dedup.insert_if_new(key, now, state.config.dedup_ttl) {
                    let delta = deps.ports.evaluator.evaluate(
                        &descriptor.record.san,
                        &descriptor.record.fen_before,
                        &descriptor.record.fen_after,
                        descriptor.record.elapsed_ms as f64 / 1000.0,
                        state.baseline_rating,
                        state.difficulty_factor,
                    );
                    state.apply_remote_move(&descriptor, &fen, delta, now);
                    deps.ports.sounds.move_played();
                } else {
                    // Duplicate delivery: the overwrite is idempotent,
                    // everything else is skipped.
                    state.fen = fen;
                }
            }
        }
        ServerEvent::StatusChanged { status, result } => {
            if status.is_terminal() {
                state.status = status;
                state.result = result;
                state.clocks.stop();
            } else {
                state.set_status(status, now);
            }
        }
        ServerEvent::Ended {
            result,
            end_reason,
            winner_id: _,
            final_fen,
            white_score,
            black_score,
            white,
            black,
        } => {
            state.white = white;
            state.black = black;
            state.flag_fallen = None;
            let summary =
                state.apply_ended(result, &end_reason, &final_fen, white_score, black_score);
            if let Some(summary) = summary {
                if let Err(e) = deps.ports.summaries.persist(summary).await {
                    tracing::warn!(error = %e, "Failed to persist game summary");
                }
            }
            deps.ports.sounds.game_ended();
        }
        ServerEvent::Activated => {
            state.set_status(SessionStatus::Active, now);
        }
        ServerEvent::Resumed {
            turn,
            grace_ms_white,
            grace_ms_black,
        } => {
            // The local history cannot be trusted across a pause:
            // moves may have happened while disconnected. If the
            // re-fetch fails the authoritative transition still goes
            // through on the local copy; later Move events overwrite
            // any drift.
            let history = match deps.transport.fetch_move_history().await {
                Ok(history) => history,
                Err(e) => {
                    tracing::warn!(error = %e, "History re-fetch failed on resume; using local history");
                    state.notice = Some("Resumed; history refresh failed".to_string());
                    state.history.clone()
                }
            };
            let base = compute_remaining(&history, state.initial_clock_ms, state.increment_ms);
            if let Some(last) = history.last() {
                state.fen = last.fen_after.clone();
                state.white_score = last.white_score;
                state.black_score = last.black_score;
            }
            state.history = history;
            state.turn = turn;
            state.clocks.rebase(base);
            state.clocks.add_grace(grace_ms_white, grace_ms_black);
            state.negotiation = None;
            state.auto_resume = None;
            state.manual_resume_available = false;
            state.flag_fallen = None;
            state.set_status(SessionStatus::Active, now);
        }
        ServerEvent::Paused { paused_by_name } => {
            state.set_status(SessionStatus::Paused, now);
            state.presence.pause_cleared(now);
            state.notice = Some(format!("Game paused by {}", paused_by_name));
        }
        ServerEvent::ResumeRequestSent {
            requester_id,
            expires_at_ms,
        } => {
            let deadline = deadline_from_epoch(expires_at_ms, now)
                .unwrap_or(now + state.config.resume_ttl);
            if requester_id == state.local_player_id {
                // Confirmation of our own request; refresh the deadline.
                match state.negotiation.as_mut() {
                    Some(neg) if neg.direction == ResumeDirection::Sent => {
                        neg.deadline = deadline;
                    }
                    _ => {
                        state.negotiation = Some(ResumeNegotiation::sent(
                            state.opponent_id().to_string(),
                            deadline,
                        ));
                    }
                }
            } else {
                let ours_pending = state
                    .negotiation
                    .as_ref()
                    .is_some_and(|n| n.is_pending() && n.direction == ResumeDirection::Sent);
                if ours_pending {
                    // Both requests crossed on the wire despite the
                    // pre-send check; the server arbitrates via the
                    // response events, keep ours.
                    tracing::warn!("Counterpart resume request crossed with ours");
                } else {
                    state.negotiation =
                        Some(ResumeNegotiation::received(requester_id, deadline));
                }
            }
        }
        ServerEvent::ResumeRequestResponse { outcome } => {
            state.notice = Some(match outcome {
                live_protocol::ResumeOutcome::Accepted => "Resume request accepted".to_string(),
                live_protocol::ResumeOutcome::Declined => "Resume request declined".to_string(),
                live_protocol::ResumeOutcome::Expired => "Resume request expired".to_string(),
                live_protocol::ResumeOutcome::Pending => "Resume request pending".to_string(),
            });
            match outcome {
                live_protocol::ResumeOutcome::Accepted => {
                    if let Some(neg) = state.negotiation.as_mut() {
                        neg.outcome = outcome;
                    }
                    // The Resumed event carries the authoritative
                    // transition; nothing more to do here.
                }
                live_protocol::ResumeOutcome::Declined
                | live_protocol::ResumeOutcome::Expired => {
                    state.negotiation = None;
                    schedule_auto_retry(state, now);
                }
                live_protocol::ResumeOutcome::Pending => {}
            }
        }
        ServerEvent::ResumeRequestExpired => {
            state.negotiation = None;
            schedule_auto_retry(state, now);
        }
        ServerEvent::ConnectionChanged { actor_id, kind } => {
            let who = if actor_id == state.local_player_id {
                "You".to_string()
            } else {
                state.opponent_name().to_string()
            };
            state.notice = Some(match kind {
                live_protocol::ConnectionKind::Joined => format!("{} joined", who),
                live_protocol::ConnectionKind::Left => format!("{} disconnected", who),
                live_protocol::ConnectionKind::Reconnected => format!("{} reconnected", who),
            });
        }
        ServerEvent::Error { message } => {
            tracing::error!("Server error: {}", message);
            let _ = event_tx.send(EngineEvent::Error(message));
        }
    }

    emit_state(state, event_tx);
    Ok(())
}

// --- Timers ---

async fn on_clock_tick(
    state: &mut SessionState,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    if let Some(flagged) = state.clocks.tick() {
        handle_flag(state, deps, event_tx, flagged).await;
        return;
    }

    let times = state.clocks.times();
    let local_remaining = match state.local_color {
        PlayerColor::White => times.white_ms,
        PlayerColor::Black => times.black_ms,
    };
    if !state.clock_low_notified && local_remaining <= state.config.clock_low_ms {
        state.clock_low_notified = true;
        deps.ports.sounds.clock_low();
    }

    let _ = event_tx.send(EngineEvent::ClockTick {
        white_ms: times.white_ms,
        black_ms: times.black_ms,
        running: state.clocks.running(),
    });
}

/// Flag semantics: block moves immediately, make exactly one forfeit
/// call, and only synthesize a local result if that call fails. Any
/// authoritative Ended event supersedes the synthesized one.
async fn handle_flag(
    state: &mut SessionState,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
    flagged: PlayerColor,
) {
    tracing::info!(side = %flagged, "Clock flag fell");
    state.flag_fallen = Some(flagged);

    if let Err(e) = deps.transport.forfeit_by_timeout().await {
        tracing::warn!(error = %e, "Forfeit call failed; synthesizing provisional result");
        state.result = Some(match flagged {
            PlayerColor::White => GameResult::BlackWins,
            PlayerColor::Black => GameResult::WhiteWins,
        });
        state.end_reason = Some("timeout".to_string());
        state.status = SessionStatus::Finished;
        // summary_emitted stays false: the provisional result is UI
        // continuity only, persistence waits for the authoritative end.
    }

    emit_state(state, event_tx);
}

async fn on_presence_tick(
    state: &mut SessionState,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    let now = Instant::now();
    match state.presence.check(now) {
        Some(PresenceAction::RaisePrompt) => {
            let countdown_ms = state
                .presence
                .prompt_remaining(now)
                .unwrap_or_default()
                .as_millis() as u64;
            let _ = event_tx.send(EngineEvent::PresencePrompt { countdown_ms });
            emit_state(state, event_tx);
        }
        Some(PresenceAction::RequestPause) => {
            state.presence.pause_requested();
            // Not a unilateral local termination: the pause request
            // carries the clock snapshot and the server decides.
            if let Err(e) = deps.transport.pause_game(state.clocks.snapshot()).await {
                tracing::warn!(error = %e, "Pause request failed");
                state.presence.pause_cleared(now);
                let _ = event_tx.send(EngineEvent::Error(format!("Pause failed: {}", e)));
            }
            emit_state(state, event_tx);
        }
        None => {}
    }
}

async fn on_auto_resume_due(
    state: &mut SessionState,
    deps: &ActorDeps,
    event_tx: &broadcast::Sender<EngineEvent>,
) {
    let now = Instant::now();
    let due = state.auto_resume.as_ref().is_some_and(|a| a.due(now));
    if !due {
        return;
    }
    let attempt = state
        .auto_resume
        .as_mut()
        .map(AutoResume::take_attempt)
        .unwrap_or(0);
    tracing::debug!(attempt, "Auto-resume attempt");

    match request_resume_flow(state, deps).await {
        Ok(()) if state.negotiation.is_some() => {
            // Request out (or counterpart's adopted); retries stop
            // unless it later declines or expires.
        }
        Ok(()) => schedule_auto_retry(state, now),
        Err(e) => {
            tracing::warn!(error = %e, attempt, "Auto-resume attempt failed");
            schedule_auto_retry(state, now);
        }
    }
    emit_state(state, event_tx);
}

fn schedule_auto_retry(state: &mut SessionState, now: Instant) {
    if let Some(auto) = state.auto_resume.as_mut() {
        if auto.attempt_failed(now) {
            state.auto_resume = None;
            state.manual_resume_available = true;
        }
    }
}

/// A timestamp already in the past yields an immediate deadline, not
/// `None`: the request must show as expired, never freshly pending.
fn deadline_from_epoch(expires_at_ms: u64, now: Instant) -> Option<Instant> {
    let epoch_now_ms = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .ok()?
        .as_millis() as u64;
    let remaining = expires_at_ms.saturating_sub(epoch_now_ms);
    Some(now + Duration::from_millis(remaining))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_past_epoch_deadline_is_immediate() {
        let now = Instant::now();
        let deadline = deadline_from_epoch(1_000, now).unwrap();
        assert!(deadline <= now, "expired timestamp must not extend the deadline");
    }

    #[test]
    fn test_future_epoch_deadline_lands_ahead() {
        let now = Instant::now();
        let epoch_now_ms = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap()
            .as_millis() as u64;
        let deadline = deadline_from_epoch(epoch_now_ms + 5_000, now).unwrap();
        assert!(deadline > now + Duration::from_secs(4));
        assert!(deadline <= now + Duration::from_secs(6));
    }
}
