//! High-level pipeline: replicates every selected item into every selected destination.
//!
//! This module provides [`ReplicationEngine`], which takes a committed
//! [`SelectionSet`] and:
//!   - Walks destinations in commit order (outer loop) and items in commit order (inner loop)
//!   - Fetches each item's content and creates a sticker or emoji in the destination
//!   - Shrinks raw attachments to the configured byte budget first (see [`crate::reduce`])
//!   - Folds per-pair outcomes into a [`ReplicationReport`]
//!
//! # Error Handling
//! A [`RemoteRejection`](crate::contract::RemoteRejection) only fails its own pair: it is
//! logged and recorded, and the batch continues. Anything else (unexpected transport
//! failures, reducer errors, a sticker path taken for a non-sticker item) aborts the batch
//! and no report is produced.
//!
//! # Concurrency
//! Attempts are strictly sequential. Each remote call is awaited before the next pair
//! starts, which keeps attempt order (and therefore log and report order) deterministic.

use std::time::Duration;

use tracing::{info, warn, Instrument, Span};

use crate::config::ReplicationConfig;
use crate::contract::{Destination, NewEmoji, NewSticker, RemoteError, RemoteId, TransportError};
use crate::item::{Item, ItemKind, Location};
use crate::reduce::{ReduceError, SizeBudgetReducer};
use crate::report::{aggregate, CopyOutcome, DestinationRef, ItemRef, ReplicationReport};
use crate::selection::SelectionSet;

#[derive(Debug, thiserror::Error)]
pub enum ReplicationError {
    /// A caller routed an item down a path its kind does not support.
    #[error("invariant violated: {0}")]
    InvariantViolation(String),
    #[error("remote call failed unexpectedly: {0}")]
    Remote(TransportError),
    #[error("could not fit attachment within the upload budget: {0}")]
    Reduce(#[from] ReduceError),
}

/// Per-pair failure: either recorded (`Rejected`) or fatal for the batch.
enum PairError {
    Rejected(crate::contract::RemoteRejection),
    Fatal(ReplicationError),
}

impl From<RemoteError> for PairError {
    fn from(e: RemoteError) -> Self {
        match e {
            RemoteError::Rejected(rejection) => PairError::Rejected(rejection),
            RemoteError::Unexpected(source) => PairError::Fatal(ReplicationError::Remote(source)),
        }
    }
}

impl From<ReplicationError> for PairError {
    fn from(e: ReplicationError) -> Self {
        PairError::Fatal(e)
    }
}

impl From<ReduceError> for PairError {
    fn from(e: ReduceError) -> Self {
        PairError::Fatal(ReplicationError::Reduce(e))
    }
}

pub struct ReplicationEngine {
    config: ReplicationConfig,
    reducer: SizeBudgetReducer,
    span: Span,
}

impl ReplicationEngine {
    pub fn new(config: ReplicationConfig) -> Self {
        let reducer =
            SizeBudgetReducer::default().with_max_iterations(config.max_reduce_iterations);
        Self {
            config,
            reducer,
            span: tracing::info_span!("replicate"),
        }
    }

    /// Runs all engine logging inside `span`.
    pub fn with_span(mut self, span: Span) -> Self {
        self.span = span;
        self
    }

    pub fn with_reducer(mut self, reducer: SizeBudgetReducer) -> Self {
        self.reducer = reducer;
        self
    }

    pub fn config(&self) -> &ReplicationConfig {
        &self.config
    }

    /// Copies every item in `selection` to every destination in `selection`.
    ///
    /// `acting_identity` is the requesting user's name, recorded in audit-log reasons.
    /// Returns [`ReplicationReport::Empty`] without any remote call when either side of
    /// the selection is empty.
    pub async fn replicate(
        &self,
        selection: &SelectionSet,
        acting_identity: &str,
    ) -> Result<ReplicationReport, ReplicationError> {
        self.run(selection, acting_identity)
            .instrument(self.span.clone())
            .await
    }

    async fn run(
        &self,
        selection: &SelectionSet,
        acting_identity: &str,
    ) -> Result<ReplicationReport, ReplicationError> {
        if selection.is_empty() {
            info!(
                items = selection.items.len(),
                destinations = selection.destinations.len(),
                "[REPLICATE] Nothing selected, skipping"
            );
            return Ok(ReplicationReport::Empty);
        }

        info!(
            items = selection.items.len(),
            destinations = selection.destinations.len(),
            requested_by = acting_identity,
            "[REPLICATE] Starting batch"
        );

        let pacing = Duration::from_millis(self.config.pacing_ms);
        let mut outcomes =
            Vec::with_capacity(selection.items.len() * selection.destinations.len());

        for destination in &selection.destinations {
            let destination_ref = DestinationRef::of(destination.as_ref());
            for item in &selection.items {
                if !pacing.is_zero() && !outcomes.is_empty() {
                    tokio::time::sleep(pacing).await;
                }
                let item_ref = ItemRef::from(item);
                match self
                    .copy_one(item, destination.as_ref(), acting_identity)
                    .await
                {
                    Ok(remote_id) => {
                        info!(
                            item = %item,
                            destination = %destination_ref.name,
                            destination_id = destination_ref.id,
                            remote_id = remote_id.0,
                            "[REPLICATE] Copied"
                        );
                        outcomes.push(CopyOutcome::Succeeded {
                            item: item_ref,
                            destination: destination_ref.clone(),
                        });
                    }
                    Err(PairError::Rejected(rejection)) => {
                        warn!(
                            item = %item,
                            destination = %destination_ref.name,
                            destination_id = destination_ref.id,
                            code = rejection.code,
                            reason = %rejection.text,
                            "[REPLICATE] Failed to copy"
                        );
                        outcomes.push(CopyOutcome::Failed {
                            item: item_ref,
                            destination: destination_ref.clone(),
                            rejection,
                        });
                    }
                    Err(PairError::Fatal(e)) => {
                        warn!(
                            item = %item,
                            destination = %destination_ref.name,
                            error = %e,
                            attempted = outcomes.len(),
                            "[REPLICATE][ABORT] Batch aborted"
                        );
                        return Err(e);
                    }
                }
            }
        }

        let report = aggregate(outcomes);
        info!(
            succeeded = report.succeeded(),
            failed = report.failures().len(),
            "[REPLICATE] Batch complete"
        );
        Ok(report)
    }

    async fn copy_one(
        &self,
        item: &Item,
        destination: &dyn Destination,
        acting_identity: &str,
    ) -> Result<RemoteId, PairError> {
        match item.kind() {
            ItemKind::Sticker { emoji_hint } => {
                self.copy_sticker(item, emoji_hint, destination, acting_identity)
                    .await
            }
            _ if item.location() == Location::Sticker => {
                Err(ReplicationError::InvariantViolation(format!(
                    "{item} is recorded as a sticker but is {:?}",
                    item.kind()
                ))
                .into())
            }
            _ => self.copy_emoji(item, destination, acting_identity).await,
        }
    }

    async fn copy_sticker(
        &self,
        item: &Item,
        emoji_hint: &str,
        destination: &dyn Destination,
        acting_identity: &str,
    ) -> Result<RemoteId, PairError> {
        let file = item.read_content().await?;
        let reason = format!("Copying sticker (requested by @{acting_identity})");
        let created = destination
            .create_sticker(NewSticker {
                name: item.name(),
                description: item.description(),
                emoji_hint,
                file: &file,
                reason: &reason,
            })
            .await?;
        Ok(created)
    }

    async fn copy_emoji(
        &self,
        item: &Item,
        destination: &dyn Destination,
        acting_identity: &str,
    ) -> Result<RemoteId, PairError> {
        let raw = item.read_content().await?;
        let (image, reason) = if let ItemKind::Attachment { .. } = item.kind() {
            let reduced = self
                .reducer
                .reduce(raw, item.format_hint(), self.config.budget_bytes)?;
            (
                reduced,
                format!("Uploading emoji (requested by @{acting_identity})"),
            )
        } else {
            (
                raw,
                format!("Copying emoji (requested by @{acting_identity})"),
            )
        };
        let name = item.upload_name();
        let created = destination
            .create_emoji(NewEmoji {
                name: &name,
                image: &image,
                reason: &reason,
            })
            .await?;
        Ok(created)
    }
}
