//! Campaign run executor.
//!
//! Executes one campaign run to completion: resolves recipients, partitions
//! them into batches, selects and builds message content per send unit,
//! posts the status broadcast and its mention notification per batch, and
//! paces batches with randomized delays. Cancellation is cooperative and
//! observed at defined checkpoints: before each batch, and at each
//! inter-batch sleep. An in-flight send is never preempted.

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use tokio_util::sync::CancellationToken;

use crate::campaign::batch::{self, MAX_MENTIONS_PER_STATUS};
use crate::campaign::content;
use crate::common::error::{CampaignError, ResolveError};
use crate::common::{ProgressUpdate, RunOutcome};
use crate::config::types::{Config, DelayBounds, MessageSelection, MessageTemplate, MentionMode, SelectionMode};
use crate::events::EventSink;
use crate::gateway::Gateway;
use crate::resolver;

/// Dismissal delay after a successful completion.
const HIDE_AFTER_COMPLETE: Duration = Duration::from_secs(3);
/// Dismissal delay after an interruption or failure.
const HIDE_AFTER_ABORT: Duration = Duration::from_secs(2);

/// Progress percent ceiling until the final batch completes.
const PERCENT_CAP: u8 = 95;

/// Emits progress updates with a monotonically non-decreasing percent.
struct ProgressTracker {
    sink: Arc<EventSink>,
    floor: u8,
}

impl ProgressTracker {
    fn new(sink: Arc<EventSink>) -> Self {
        Self { sink, floor: 0 }
    }

    fn update(&mut self, text: impl Into<String>, percent: u8) {
        let percent = percent.max(self.floor);
        self.floor = percent;
        self.sink.progress(ProgressUpdate::new(text, percent));
    }

    /// Emit at the current floor, without advancing it.
    fn update_keep(&mut self, text: impl Into<String>) {
        let floor = self.floor;
        self.update(text, floor);
    }
}

/// Executes a single campaign run against a ready gateway handle.
///
/// The gateway reference is borrowed for the duration of the run only; the
/// lifecycle manager keeps ownership of the live connection.
pub struct CampaignOrchestrator {
    gateway: Arc<dyn Gateway>,
    sink: Arc<EventSink>,
    cancel: CancellationToken,
}

impl CampaignOrchestrator {
    pub fn new(gateway: Arc<dyn Gateway>, sink: Arc<EventSink>, cancel: CancellationToken) -> Self {
        Self {
            gateway,
            sink,
            cancel,
        }
    }

    /// Run the campaign to its terminal outcome.
    ///
    /// Never panics or escapes an error: failures are logged, reported as a
    /// terminal progress update, and folded into [`RunOutcome::Failed`].
    pub async fn execute(&self, config: &Config) -> RunOutcome {
        let mut progress = ProgressTracker::new(Arc::clone(&self.sink));

        let outcome = match self.run(config, &mut progress).await {
            Ok(outcome) => outcome,
            Err(e) => {
                self.sink.error(format!("Campaign failed: {}", e));
                progress.update_keep("Sending failed!");
                RunOutcome::Failed(e.to_string())
            }
        };

        let hide_delay = match outcome {
            RunOutcome::Completed => HIDE_AFTER_COMPLETE,
            _ => HIDE_AFTER_ABORT,
        };
        self.sink.schedule_progress_hide(hide_delay);

        outcome
    }

    async fn run(
        &self,
        config: &Config,
        progress: &mut ProgressTracker,
    ) -> Result<RunOutcome, CampaignError> {
        if config.messages.is_empty() {
            return Err(CampaignError::NoMessages);
        }
        if config.settings.message_selection.mode == SelectionMode::Fixed {
            let index = config.settings.message_selection.fixed_index;
            if index >= config.messages.len() {
                return Err(CampaignError::MessageIndexOutOfRange {
                    index,
                    count: config.messages.len(),
                });
            }
        }

        let resolved =
            resolver::resolve(self.gateway.as_ref(), &config.settings, &config.recipients).await?;
        if let Some(subject) = &resolved.group_subject {
            self.sink.info(format!(
                "Found {} member(s) in group \"{}\"",
                resolved.recipients.len(),
                subject
            ));
        }

        // Delivery inside the group replaces the private status flow entirely
        if config.settings.use_group && config.settings.mention_inside_group {
            return self.run_group_message(config, &resolved, progress).await;
        }

        match config.settings.mention_mode {
            MentionMode::Grouped => self.run_grouped(config, &resolved.recipients, progress).await,
            MentionMode::Single => self.run_single(config, &resolved.recipients, progress).await,
        }
    }

    async fn run_group_message(
        &self,
        config: &Config,
        resolved: &resolver::Resolved,
        progress: &mut ProgressTracker,
    ) -> Result<RunOutcome, CampaignError> {
        let group_jid = config
            .settings
            .group_jid
            .as_deref()
            .filter(|jid| !jid.is_empty())
            .ok_or(CampaignError::Resolve(ResolveError::MissingGroup))?;
        let members = resolved.recipients.as_slice();

        if self.cancel.is_cancelled() {
            return Ok(self.interrupted(progress));
        }

        let template = select_template(&config.messages, &config.settings.message_selection)?;
        let content = content::build_content(template)?;

        self.sink.info(format!(
            "Sending one message into the group, mentioning {} member(s)",
            members.len()
        ));
        progress.update(
            format!("Group message | {} mentions | {}", members.len(), template.name),
            30,
        );

        self.gateway
            .send_group_message(group_jid, &content, members)
            .await?;
        self.sink.success(format!(
            "Group message sent to \"{}\"",
            resolved.group_subject.as_deref().unwrap_or(group_jid)
        ));
        progress.update("Completed!", 100);

        Ok(RunOutcome::Completed)
    }

    async fn run_grouped(
        &self,
        config: &Config,
        recipients: &resolver::RecipientSet,
        progress: &mut ProgressTracker,
    ) -> Result<RunOutcome, CampaignError> {
        let recipients = recipients.as_slice();
        let batches = batch::partition(recipients, MAX_MENTIONS_PER_STATUS);
        let total = batches.len();

        self.sink.info(format!(
            "Creating {} status(es) for {} recipient(s), up to {} mentions per status",
            total,
            recipients.len(),
            MAX_MENTIONS_PER_STATUS
        ));
        progress.update(
            format!(
                "Preparing campaign | {} recipients | {} batches",
                recipients.len(),
                total
            ),
            10,
        );

        for (index, batch) in batches.iter().enumerate() {
            if self.cancel.is_cancelled() {
                return Ok(self.interrupted(progress));
            }

            // Selection and content are re-evaluated per batch; the media
            // existence check happens immediately before use.
            let template =
                select_template(&config.messages, &config.settings.message_selection)?;
            let content = content::build_content(template)?;

            let start_percent = ((index * 100) / total).min(PERCENT_CAP as usize) as u8;
            progress.update(
                format!(
                    "Status {}/{} | {} recipients | {}",
                    index + 1,
                    total,
                    batch.len(),
                    template.name
                ),
                start_percent,
            );

            self.gateway.post_status(&content, batch).await?;
            self.sink
                .success(format!("Status {} of {} posted", index + 1, total));

            self.gateway.send_status_mentions(&content, batch).await?;
            self.sink.success(format!(
                "{} mention(s) sent for status {}",
                batch.len(),
                index + 1
            ));

            let after_percent =
                ((start_percent as usize + 100 / total).min(PERCENT_CAP as usize)) as u8;
            progress.update(
                format!(
                    "Status {}/{} | {} mentions sent | {}",
                    index + 1,
                    total,
                    batch.len(),
                    template.name
                ),
                after_percent,
            );

            if index + 1 < total {
                if self.cancel.is_cancelled() {
                    return Ok(self.interrupted(progress));
                }

                let delay = random_delay(&config.settings.delay);
                self.sink.info(format!(
                    "Waiting {:.1} seconds before status {}",
                    delay.as_secs_f64(),
                    index + 2
                ));
                progress.update(
                    format!("Waiting before status {}/{}", index + 2, total),
                    (((index + 1) * 100 / total).min(PERCENT_CAP as usize)) as u8,
                );

                tokio::select! {
                    _ = tokio::time::sleep(delay) => {}
                    _ = self.cancel.cancelled() => {
                        return Ok(self.interrupted(progress));
                    }
                }
            }
        }

        self.sink
            .success("All status mentions sent - campaign completed");
        progress.update("Completed!", 100);
        Ok(RunOutcome::Completed)
    }

    async fn run_single(
        &self,
        config: &Config,
        recipients: &resolver::RecipientSet,
        progress: &mut ProgressTracker,
    ) -> Result<RunOutcome, CampaignError> {
        let recipients = recipients.as_slice();

        if self.cancel.is_cancelled() {
            return Ok(self.interrupted(progress));
        }

        // Single mode: one selection, one batch, no pacing.
        let template = select_template(&config.messages, &config.settings.message_selection)?;
        let content = content::build_content(template)?;

        self.sink.info(format!(
            "Creating single status for all {} recipient(s)",
            recipients.len()
        ));
        progress.update(
            format!(
                "Single status | {} recipients | {}",
                recipients.len(),
                template.name
            ),
            30,
        );

        self.gateway.post_status(&content, recipients).await?;
        self.sink.success("Status posted");
        progress.update(
            format!("Sending {} mention(s)...", recipients.len()),
            50,
        );

        self.gateway
            .send_status_mentions(&content, recipients)
            .await?;
        self.sink
            .success(format!("{} mention(s) sent", recipients.len()));
        progress.update("Completed!", 100);

        Ok(RunOutcome::Completed)
    }

    fn interrupted(&self, progress: &mut ProgressTracker) -> RunOutcome {
        self.sink.info("Sending interrupted by operator");
        progress.update_keep("Sending interrupted!");
        RunOutcome::Interrupted
    }
}

/// Pick the template for one unit of sending.
fn select_template<'a>(
    messages: &'a [MessageTemplate],
    selection: &MessageSelection,
) -> Result<&'a MessageTemplate, CampaignError> {
    let index = match selection.mode {
        SelectionMode::Random => rand::thread_rng().gen_range(0..messages.len()),
        SelectionMode::Fixed => selection.fixed_index,
    };
    messages.get(index).ok_or(CampaignError::MessageIndexOutOfRange {
        index,
        count: messages.len(),
    })
}

/// Uniformly random delay within the configured bounds.
fn random_delay(bounds: &DelayBounds) -> Duration {
    let min_ms = bounds.min * 1000;
    let max_ms = bounds.max * 1000;
    Duration::from_millis(rand::thread_rng().gen_range(min_ms..=max_ms))
}
