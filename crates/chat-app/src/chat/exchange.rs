use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use murmur_llm::{CompletionRequest, LlmProvider, ProviderConfig, ProviderResult, create_provider};
use snafu::ResultExt;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

use super::events::{
    ExchangeEvent, Intent, ProviderSnafu, SubmitOutcome, TurnCompleted, WorkerPanickedSnafu,
};
use super::message::{Message, MessageId, Notices, TurnId};
use super::store::{ConversationStore, Snapshot};
use super::turn::{ExchangeState, TurnTransition};

const EVENT_CHANNEL_CAPACITY: usize = 64;

/// Controller-level turn metadata kept outside the conversation model.
struct ActiveTurn {
    turn: TurnId,
    placeholder_id: MessageId,
    // Dropping the sender cancels the turn worker.
    _cancel_tx: oneshot::Sender<()>,
}

/// Owns the conversation and runs one request/response cycle per user turn.
///
/// All mutation happens on the task that owns the controller. Provider calls
/// run on spawned workers and report back through [`TurnCompleted`], so the
/// controller must be driven inside a tokio runtime.
pub struct ExchangeController {
    store: ConversationStore,
    provider: Arc<dyn LlmProvider>,
    notices: Notices,
    state: ExchangeState,
    active_turn: Option<ActiveTurn>,
    next_turn_id: u64,
    draft: String,
    last_error: Option<String>,
    completion_tx: mpsc::UnboundedSender<TurnCompleted>,
    completion_rx: mpsc::UnboundedReceiver<TurnCompleted>,
    event_tx: broadcast::Sender<ExchangeEvent>,
}

impl ExchangeController {
    pub fn new(provider: Arc<dyn LlmProvider>, notices: Notices) -> Self {
        let store = ConversationStore::new(Message::assistant(notices.greeting.clone()));
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Self {
            store,
            provider,
            notices,
            state: ExchangeState::Idle,
            active_turn: None,
            next_turn_id: 1,
            draft: String::new(),
            last_error: None,
            completion_tx,
            completion_rx,
            event_tx,
        }
    }

    pub fn store(&self) -> &ConversationStore {
        &self.store
    }

    pub fn subscribe(&self) -> watch::Receiver<Snapshot> {
        self.store.subscribe()
    }

    pub fn events(&self) -> broadcast::Receiver<ExchangeEvent> {
        self.event_tx.subscribe()
    }

    pub fn state(&self) -> ExchangeState {
        self.state
    }

    pub fn is_busy(&self) -> bool {
        !self.state.is_idle()
    }

    pub fn provider(&self) -> &Arc<dyn LlmProvider> {
        &self.provider
    }

    /// Detail of the most recent failed turn, for diagnostics only.
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    /// Submits the pending input buffer. The buffer is only cleared on admission.
    pub fn submit_draft(&mut self) -> SubmitOutcome {
        let text = self.draft.clone();
        self.submit(&text)
    }

    pub fn set_provider(&mut self, provider: Arc<dyn LlmProvider>) {
        tracing::info!(
            provider = %provider.name(),
            model = %provider.model_name(),
            "switched completion provider"
        );
        self.provider = provider;
    }

    /// Rebuilds the provider for subsequent turns; an in-flight turn keeps its own.
    pub fn apply_config(&mut self, config: &ProviderConfig) -> ProviderResult<()> {
        let provider = create_provider(config)?;
        self.set_provider(provider);
        Ok(())
    }

    /// Starts a turn for `text` without waiting for the response.
    pub fn submit(&mut self, text: &str) -> SubmitOutcome {
        if text.trim().is_empty() {
            return SubmitOutcome::Ignored;
        }

        let turn = TurnId::new(self.next_turn_id);
        self.state = match self.state.apply(TurnTransition::Begin(turn)) {
            Ok(state) => state,
            Err(rejection) => {
                let active = self.state.active_turn().unwrap_or(turn);
                tracing::warn!(
                    active = %active,
                    rejection = ?rejection,
                    "rejecting submit while a turn is awaiting its response"
                );
                self.emit(ExchangeEvent::SubmitRejected { active });
                return SubmitOutcome::Busy(active);
            }
        };
        // Reserve the id immediately so later turns never reuse it.
        self.next_turn_id = self.next_turn_id.saturating_add(1);

        self.store.append(Message::user(text));
        let placeholder = Message::placeholder(turn);
        let placeholder_id = placeholder.id;
        self.store.append(placeholder);

        self.draft.clear();
        self.emit(ExchangeEvent::InputCleared);

        let request = CompletionRequest::new(self.store.history());
        let (cancel_tx, cancel_rx) = oneshot::channel();
        self.spawn_turn_worker(turn, request, cancel_rx);
        self.active_turn = Some(ActiveTurn {
            turn,
            placeholder_id,
            _cancel_tx: cancel_tx,
        });

        tracing::debug!(
            turn = %turn,
            provider = %self.provider.name(),
            model = %self.provider.model_name(),
            "turn started"
        );
        self.emit(ExchangeEvent::TurnStarted(turn));
        SubmitOutcome::Admitted(turn)
    }

    /// Submits `text` and waits until its turn has settled.
    pub async fn send_message(&mut self, text: &str) -> SubmitOutcome {
        let outcome = self.submit(text);
        if let SubmitOutcome::Admitted(_) = outcome {
            self.settle().await;
        }
        outcome
    }

    /// Waits for the active turn to complete and applies it.
    pub async fn settle(&mut self) -> Option<TurnId> {
        self.active_turn.as_ref()?;

        while let Some(completed) = self.completion_rx.recv().await {
            let turn = completed.turn;
            if self.handle_completion(completed) {
                return Some(turn);
            }
        }
        None
    }

    /// Reconciles a worker result into the conversation.
    ///
    /// Returns false when the completion belongs to a turn that is no longer
    /// active (for example one discarded by [`Self::new_chat`]).
    pub fn handle_completion(&mut self, completed: TurnCompleted) -> bool {
        let Some(active) = self
            .active_turn
            .take_if(|active| active.turn == completed.turn)
        else {
            tracing::warn!(turn = %completed.turn, "dropping completion for a stale turn");
            return false;
        };

        self.state = self
            .state
            .apply(completed.transition())
            .unwrap_or_else(|rejection| {
                tracing::warn!(
                    turn = %active.turn,
                    rejection = ?rejection,
                    "turn state out of sync; forcing idle"
                );
                ExchangeState::Idle
            });

        match self.store.remove_loading_placeholder() {
            Some(placeholder) if placeholder.id == active.placeholder_id => {}
            Some(placeholder) => tracing::warn!(
                turn = %active.turn,
                expected = %active.placeholder_id,
                removed = %placeholder.id,
                "removed a placeholder that belongs to another turn"
            ),
            None => tracing::warn!(turn = %active.turn, "no loading placeholder to remove"),
        }

        let failed = match completed.result {
            Ok(content) => {
                tracing::debug!(turn = %active.turn, reply_len = content.len(), "turn settled");
                self.store.append(Message::assistant(content));
                false
            }
            Err(error) => {
                let detail = error.to_string();
                tracing::error!(turn = %active.turn, error = %detail, "completion failed");
                self.store.append(Message::error_notice(
                    self.notices.error_notice.clone(),
                    detail.clone(),
                ));
                self.last_error = Some(detail);
                true
            }
        };

        self.emit(ExchangeEvent::TurnSettled {
            turn: active.turn,
            failed,
        });
        true
    }

    /// Discards the conversation and any in-flight turn, then reseeds the greeting.
    pub fn new_chat(&mut self) {
        if let Some(active) = self.active_turn.take() {
            tracing::debug!(turn = %active.turn, "cancelling in-flight turn for new chat");
        }
        self.state = self
            .state
            .apply(TurnTransition::Abandon)
            .unwrap_or_default();

        self.store
            .reset(Message::assistant(self.notices.greeting.clone()));
        self.emit(ExchangeEvent::ConversationReset);
    }

    /// Drives the controller from presentation intents until the channel closes.
    pub async fn run(mut self, mut intents: mpsc::Receiver<Intent>) {
        loop {
            tokio::select! {
                intent = intents.recv() => {
                    let Some(intent) = intent else {
                        break;
                    };
                    self.handle_intent(intent);
                }
                Some(completed) = self.completion_rx.recv() => {
                    self.handle_completion(completed);
                }
            }
        }

        tracing::debug!("intent channel closed; exchange loop stopped");
    }

    fn handle_intent(&mut self, intent: Intent) {
        match intent {
            Intent::Submit(text) => {
                self.submit(&text);
            }
            Intent::NewChat => self.new_chat(),
            Intent::ApplyConfig(config) => {
                if let Err(error) = self.apply_config(&config) {
                    tracing::error!(
                        error = %error,
                        "failed to rebuild provider from settings; keeping the previous one"
                    );
                }
            }
        }
    }

    fn spawn_turn_worker(
        &self,
        turn: TurnId,
        request: CompletionRequest,
        cancel_rx: oneshot::Receiver<()>,
    ) {
        let provider = Arc::clone(&self.provider);
        let completion_tx = self.completion_tx.clone();

        // The provider runs inside the unwind guard so a panic still settles the turn.
        let completion = AssertUnwindSafe(async move { provider.complete(request).await })
            .catch_unwind();

        tokio::spawn(async move {
            tokio::select! {
                _ = cancel_rx => {
                    tracing::debug!(turn = %turn, "turn worker cancelled");
                }
                outcome = completion => {
                    let result = match outcome {
                        Ok(result) => result.context(ProviderSnafu { stage: "complete" }),
                        Err(payload) => {
                            let message = panic_message(payload.as_ref());
                            tracing::error!(
                                turn = %turn,
                                panic = %message,
                                "turn worker panicked"
                            );
                            WorkerPanickedSnafu {
                                stage: "complete",
                                message,
                            }
                            .fail()
                        }
                    };
                    let _ = completion_tx.send(TurnCompleted { turn, result });
                }
            }
        });
    }

    fn emit(&self, event: ExchangeEvent) {
        let _ = self.event_tx.send(event);
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
