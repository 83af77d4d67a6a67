use std::sync::Arc;

use crate::conversation::{ConversationLog, Message, Role};
use crate::error::{CompletionError, display_reply};
use crate::llm::ChatBackend;

/// Outcome of one user submission
#[derive(Debug)]
pub struct Exchange {
    /// Text recorded as the assistant turn
    pub reply: String,
    /// Set when `reply` is a flattened failure rather than a model answer
    pub error: Option<CompletionError>,
}

impl Exchange {
    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

/// A completion that has been started but not yet run
pub struct PendingTurn {
    generation: u64,
    messages: Vec<Message>,
    backend: Arc<dyn ChatBackend>,
}

/// Result of [`PendingTurn::run`], handed back to [`ChatSession::finish`]
pub struct CompletedTurn {
    generation: u64,
    result: Result<String, CompletionError>,
}

impl PendingTurn {
    pub async fn run(self) -> CompletedTurn {
        let result = self.backend.complete(&self.messages).await;
        CompletedTurn {
            generation: self.generation,
            result,
        }
    }
}

/// One user's chat: the persona, its transcript, and the backend it talks to.
///
/// At most one completion is in flight at a time. Resetting while a turn is
/// pending discards that turn's reply when it arrives, but the turn still
/// counts as in flight until it is finished or abandoned.
pub struct ChatSession {
    persona: String,
    log: ConversationLog,
    backend: Arc<dyn ChatBackend>,
    generation: u64,
    /// Generation of the turn currently running, if any
    in_flight: Option<u64>,
}

impl ChatSession {
    pub fn new(persona: impl Into<String>, backend: Arc<dyn ChatBackend>) -> Self {
        let persona = persona.into();
        Self {
            log: ConversationLog::initialize(persona.clone()),
            persona,
            backend,
            generation: 0,
            in_flight: None,
        }
    }

    pub fn log(&self) -> &ConversationLog {
        &self.log
    }

    pub fn is_pending(&self) -> bool {
        self.in_flight.is_some()
    }

    /// Record the user's text and snapshot the transcript for the backend.
    ///
    /// Returns `None` while another turn is still pending.
    pub fn begin(&mut self, text: impl Into<String>) -> Option<PendingTurn> {
        if self.in_flight.is_some() {
            return None;
        }
        self.log.append(Role::User, text);
        self.in_flight = Some(self.generation);
        Some(PendingTurn {
            generation: self.generation,
            messages: self.log.messages().to_vec(),
            backend: Arc::clone(&self.backend),
        })
    }

    /// Record the reply of a completed turn as the assistant message.
    ///
    /// Failures are flattened and recorded too, so they become part of the
    /// context sent with later turns. Returns `None` for a turn that was
    /// started before the last reset.
    pub fn finish(&mut self, turn: CompletedTurn) -> Option<Exchange> {
        if self.in_flight == Some(turn.generation) {
            self.in_flight = None;
        }
        if turn.generation != self.generation {
            tracing::debug!(generation = turn.generation, "dropping reply from before reset");
            return None;
        }

        let reply = display_reply(&turn.result);
        self.log.append(Role::Assistant, reply.clone());

        let error = turn.result.err();
        if let Some(err) = &error {
            tracing::warn!(error = %err, "completion failed");
        }
        Some(Exchange { reply, error })
    }

    /// Append `text`, wait for the reply and record it
    pub async fn submit(&mut self, text: impl Into<String>) -> Option<Exchange> {
        let turn = self.begin(text)?;
        let completed = turn.run().await;
        self.finish(completed)
    }

    /// Give up on the in-flight turn without recording a reply.
    ///
    /// Only call this once the turn's call has stopped running (its task
    /// was aborted or died). The user message stays in the log.
    pub fn abandon_pending(&mut self) {
        if self.in_flight.take().is_some() {
            self.generation += 1;
        }
    }

    /// Clear history back to the persona prompt.
    ///
    /// A turn that is still running stays pending; its reply is dropped.
    pub fn reset(&mut self) {
        self.log.reset(self.persona.clone());
        self.generation += 1;
        tracing::info!("conversation cleared");
    }
}
