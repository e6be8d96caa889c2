//! # Editing Pipeline
//!
//! Coordinates the update cycle: Queue → Transaction → Notify
//!
//! The Pipeline manages:
//! - Coalescing queued commands into one transaction
//! - Rolling back commands that no-op or fail partway
//! - Exactly one listener notification per closed transaction
//! - Running follow-up commands from listeners as new transactions
//! - Undo/redo history and late image-decode results

use crate::commands::{execute, Command, CommandOutcome};
use crate::images::{ImageDecoder, ImageFile, ImageTicket};
use crate::post_effects::{PostEffect, PostEffectEngine, UpdateEvent};
use crate::toolbar::ToolbarState;
use crate::undo_stack::UndoStack;
use crate::{DecodeError, EditorError, EditorSession, InsertPayload, NoOpReason, Snapshot};
use scribe_model::ImagePayload;
use std::collections::VecDeque;
use tracing::{debug, info, instrument, warn};

/// Result of one closed transaction
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionReport {
    /// Sequence number, starting at 1
    pub id: u64,
    /// One outcome per command, in queue order
    pub outcomes: Vec<CommandOutcome>,
    pub tree_changed: bool,
}

/// Owns a session and serializes every change to it through transactions
#[derive(Debug)]
pub struct Pipeline {
    session: EditorSession,
    queue: VecDeque<Command>,
    effects: PostEffectEngine,
    history: UndoStack,
    transactions: u64,
}

impl Pipeline {
    /// Create pipeline for session
    pub fn new(session: EditorSession) -> Self {
        let history = UndoStack::with_max_levels(session.config().history_limit);
        Self {
            session,
            queue: VecDeque::new(),
            effects: PostEffectEngine::new(),
            history,
            transactions: 0,
        }
    }

    pub fn session(&self) -> &EditorSession {
        &self.session
    }

    pub fn add_effect(&mut self, effect: Box<dyn PostEffect>) {
        self.effects.register(effect);
    }

    /// Queue a command for the next [`flush`](Self::flush)
    pub fn dispatch(&mut self, command: Command) {
        self.queue.push_back(command);
    }

    pub fn pending(&self) -> usize {
        self.queue.len()
    }

    /// Queue a command and flush immediately, returning its outcome
    pub fn apply(&mut self, command: Command) -> Result<CommandOutcome, EditorError> {
        self.dispatch(command);
        let reports = self.flush()?;
        Ok(reports
            .first()
            .and_then(|report| report.outcomes.last().cloned())
            .unwrap_or(CommandOutcome::NoOp(NoOpReason::SessionClosed)))
    }

    /// Run every queued command as one transaction, then any follow-ups the
    /// listeners request as further transactions.
    ///
    /// Returns one report per transaction, in the order they closed.
    #[instrument(skip(self), fields(session = %self.session.id, queued = self.queue.len()))]
    pub fn flush(&mut self) -> Result<Vec<TransactionReport>, EditorError> {
        let mut reports = Vec::new();
        if self.queue.is_empty() {
            return Ok(reports);
        }
        if !self.session.is_live() {
            warn!(dropped = self.queue.len(), "commands queued on a closed session");
            self.queue.clear();
            return Ok(reports);
        }

        let limit = self.session.config().max_reentrant_transactions;
        let mut batch: Vec<Command> = self.queue.drain(..).collect();
        let mut depth = 0;
        loop {
            let report = self.run_transaction(batch)?;
            let follow_ups = self.notify(&report);
            reports.push(report);

            // Listeners may have queued more through the same pipeline handle
            self.queue.extend(follow_ups);
            if self.queue.is_empty() {
                break;
            }
            if depth >= limit {
                warn!(
                    limit,
                    dropped = self.queue.len(),
                    "re-entrant transaction limit reached"
                );
                self.queue.clear();
                break;
            }
            depth += 1;
            batch = self.queue.drain(..).collect();
        }
        Ok(reports)
    }

    fn run_transaction(&mut self, batch: Vec<Command>) -> Result<TransactionReport, EditorError> {
        self.transactions += 1;
        let id = self.transactions;
        let before = self.session.checkpoint();
        let mut outcomes = Vec::with_capacity(batch.len());
        let mut names = Vec::with_capacity(batch.len());

        for command in &batch {
            let checkpoint = self.session.checkpoint();
            let outcome = match execute(&mut self.session, command) {
                Ok(outcome) if outcome.tree_changed() => match self.session.tree().validate() {
                    Ok(()) => outcome,
                    Err(err) => {
                        self.session.restore(checkpoint);
                        CommandOutcome::NoOp(NoOpReason::RolledBack(err.to_string()))
                    }
                },
                Ok(CommandOutcome::NoOp(reason)) => {
                    self.session.restore(checkpoint);
                    CommandOutcome::NoOp(reason)
                }
                Ok(outcome) => outcome,
                Err(err) => {
                    self.session.restore(checkpoint);
                    CommandOutcome::NoOp(NoOpReason::RolledBack(err.to_string()))
                }
            };
            if let CommandOutcome::NoOp(reason) = &outcome {
                warn!(transaction = id, command = command.name(), %reason, "command rejected");
            }
            if outcome.tree_changed() {
                names.push(command.name());
            }
            outcomes.push(outcome);
        }

        let tree_changed = !names.is_empty();
        if tree_changed {
            self.history.record(before, names.join(", "));
        }
        info!(transaction = id, commands = batch.len(), tree_changed, "transaction closed");

        Ok(TransactionReport {
            id,
            outcomes,
            tree_changed,
        })
    }

    fn notify(&mut self, report: &TransactionReport) -> Vec<Command> {
        let event = UpdateEvent {
            transaction: report.id,
            tree: self.session.tree(),
            selection: self.session.selection(),
            tree_changed: report.tree_changed,
            outcomes: &report.outcomes,
            config: self.session.config(),
        };
        self.effects.notify(&event)
    }

    /// Run a restore from history as its own notifying transaction
    fn history_transaction(&mut self, snapshot: Snapshot, label: &str) -> TransactionReport {
        self.transactions += 1;
        self.session.restore(snapshot);
        let report = TransactionReport {
            id: self.transactions,
            outcomes: vec![CommandOutcome::Applied { tree_changed: true }],
            tree_changed: true,
        };
        info!(transaction = report.id, label, "history transaction closed");

        let follow_ups = self.notify(&report);
        self.queue.extend(follow_ups);
        report
    }

    /// Step back one transaction. `None` when there is nothing to undo.
    pub fn undo(&mut self) -> Result<Option<TransactionReport>, EditorError> {
        if !self.session.is_live() {
            return Ok(None);
        }
        let Some(previous) = self.history.undo(self.session.checkpoint()) else {
            return Ok(None);
        };
        let report = self.history_transaction(previous, "undo");
        self.flush()?;
        Ok(Some(report))
    }

    /// Re-apply the last undone transaction
    pub fn redo(&mut self) -> Result<Option<TransactionReport>, EditorError> {
        if !self.session.is_live() {
            return Ok(None);
        }
        let Some(next) = self.history.redo(self.session.checkpoint()) else {
            return Ok(None);
        };
        let report = self.history_transaction(next, "redo");
        self.flush()?;
        Ok(Some(report))
    }

    pub fn can_undo(&self) -> bool {
        self.history.can_undo()
    }

    pub fn can_redo(&self) -> bool {
        self.history.can_redo()
    }

    /// Toolbar state for the current selection
    pub fn toolbar_state(&self) -> ToolbarState {
        ToolbarState::compute(self.session.tree(), self.session.selection())
    }

    /// Start an image insert whose file is read asynchronously
    pub fn begin_image_insert(&self) -> ImageTicket {
        ImageTicket {
            generation: self.session.generation(),
        }
    }

    /// Finish an image insert started with [`begin_image_insert`](Self::begin_image_insert).
    ///
    /// The result is dropped when the session was torn down or reloaded in the
    /// meantime, or when decoding failed. A selection that went stale while the
    /// file was read falls back to the end of the document.
    pub fn complete_image_insert(
        &mut self,
        ticket: ImageTicket,
        decoded: Result<ImagePayload, DecodeError>,
    ) -> Result<CommandOutcome, EditorError> {
        if !self.session.is_live() || ticket.generation != self.session.generation() {
            debug!(session = %self.session.id, "dropping image decoded for a closed context");
            return Ok(CommandOutcome::NoOp(NoOpReason::SessionClosed));
        }
        let image = match decoded {
            Ok(image) => image,
            Err(err) => {
                warn!(%err, "image decode failed");
                return Ok(CommandOutcome::NoOp(NoOpReason::DecodeFailed(err)));
            }
        };

        let stale = self
            .session
            .selection()
            .map_or(true, |selection| selection.resolve(self.session.tree()).is_none());
        if stale {
            let end = self.session.caret_at_document_end();
            self.session.set_selection(Some(end));
        }
        self.apply(Command::InsertNode {
            node: InsertPayload::Image(image),
        })
    }

    /// Decode a file synchronously and insert it at the caret
    pub fn insert_image_file(
        &mut self,
        file: &ImageFile,
        decoder: &dyn ImageDecoder,
    ) -> Result<CommandOutcome, EditorError> {
        let ticket = self.begin_image_insert();
        self.complete_image_insert(ticket, decoder.decode(file))
    }

    /// Close the session; queued commands and pending image inserts are dropped
    pub fn teardown(&mut self) {
        self.queue.clear();
        self.session.teardown();
    }

    /// Hand back the session, dropping listeners and history
    pub fn into_session(self) -> EditorSession {
        self.session
    }
}
