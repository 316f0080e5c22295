//! Append-only conversation store
//!
//! Owns every chat entry of the session and is the only place entries are
//! created. The three entry kinds form a small state machine driven by three
//! gestures: a user submission, a backend reply, and the "View" action on a
//! weekly prompt. Entries are never mutated or removed; derived views (the
//! daily-plan table) are recomputed from the store on every render.

use std::fmt;

use chrono::{DateTime, SecondsFormat, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::backend::{BackendError, ChatResponse};
use crate::plan::{project_rows, CurriculumPlan, PlanRow};
use crate::timeago::time_ago;

pub const NO_REPLY_TEXT: &str = "(no reply)";
pub const SERVER_ERROR_TEXT: &str = "Server error. Check backend.";
pub const WEEKLY_PROMPT_TEXT: &str =
    "If you want to know the detailed daily plan for this curriculum, choose View.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryId(Uuid);

impl EntryId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for EntryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    User,
    Assistant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
    Normal,
    WeeklyPrompt,
    DailyPlan,
}

#[derive(Debug, Clone)]
pub struct ChatEntry {
    pub id: EntryId,
    pub origin: Origin,
    pub display_text: String,
    pub created_at: String,
    pub kind: EntryKind,
    /// Lookup key into the store, resolved at render time
    pub related_entry_id: Option<EntryId>,
    pub curriculum: Option<CurriculumPlan>,
    pub agent_activity: Option<serde_json::Value>,
}

impl ChatEntry {
    fn new(origin: Origin, kind: EntryKind, text: impl Into<String>, created_at: String) -> Self {
        Self {
            id: EntryId::new(),
            origin,
            display_text: text.into(),
            created_at,
            kind,
            related_entry_id: None,
            curriculum: None,
            agent_activity: None,
        }
    }

    /// Text of the opaque agent activity payload, if it carries one
    pub fn agent_activity_text(&self) -> Option<&str> {
        self.agent_activity
            .as_ref()
            .and_then(|activity| activity.get("text"))
            .and_then(|text| text.as_str())
            .filter(|text| !text.is_empty())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitRejection {
    #[error("message is empty")]
    Empty,
    #[error("a reply is still pending")]
    InFlight,
    #[error("message is too long ({len} characters, maximum {max})")]
    TooLong { len: usize, max: usize },
}

/// A submission the caller must deliver to the backend exactly once
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundMessage {
    pub entry_id: EntryId,
    pub message: String,
}

/// Render-ready projection of one entry
#[derive(Debug, Clone)]
pub struct EntryView<'a> {
    pub id: EntryId,
    pub kind: EntryKind,
    pub origin: Origin,
    pub text: &'a str,
    pub age: String,
    /// Curriculum card shown under an assistant reply
    pub curriculum: Option<&'a CurriculumPlan>,
    /// Any agent payload at all, with or without text
    pub has_agent_activity: bool,
    pub agent_text: Option<&'a str>,
    /// Whether View on a weekly prompt would resolve
    pub actionable: bool,
    /// Daily-plan table rows, only for `DailyPlan` entries
    pub rows: Vec<PlanRow>,
}

pub fn iso_timestamp(now: DateTime<Utc>) -> String {
    now.to_rfc3339_opts(SecondsFormat::Millis, true)
}

pub struct Conversation {
    entries: Vec<ChatEntry>,
    in_flight: bool,
    max_input_chars: usize,
}

impl Conversation {
    pub fn new(max_input_chars: usize) -> Self {
        Self {
            entries: Vec::new(),
            in_flight: false,
            max_input_chars,
        }
    }

    #[cfg(test)]
    pub fn entries(&self) -> &[ChatEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight
    }

    pub fn max_input_chars(&self) -> usize {
        self.max_input_chars
    }

    pub fn get(&self, id: &EntryId) -> Option<&ChatEntry> {
        self.entries.iter().find(|e| e.id == *id)
    }

    /// Check the submit guards without changing anything
    pub fn check_submit(&self, raw: &str) -> Result<(), SubmitRejection> {
        if raw.trim().is_empty() {
            return Err(SubmitRejection::Empty);
        }
        if self.in_flight {
            return Err(SubmitRejection::InFlight);
        }
        let len = raw.chars().count();
        if len > self.max_input_chars {
            return Err(SubmitRejection::TooLong {
                len,
                max: self.max_input_chars,
            });
        }
        Ok(())
    }

    /// Append the user's entry and mark a request as in flight.
    pub fn submit(&mut self, raw: &str, now: DateTime<Utc>) -> Result<OutboundMessage, SubmitRejection> {
        if let Err(rejection) = self.check_submit(raw) {
            debug!(%rejection, "submit: rejected");
            return Err(rejection);
        }

        let message = raw.trim().to_string();
        let entry = ChatEntry::new(Origin::User, EntryKind::Normal, message.clone(), iso_timestamp(now));
        let entry_id = entry.id;
        self.entries.push(entry);
        self.in_flight = true;

        info!(%entry_id, len = message.chars().count(), "submit: user message appended");
        Ok(OutboundMessage { entry_id, message })
    }

    /// Apply a finished request. Returns the ids appended, in order.
    pub fn receive_reply(
        &mut self,
        outcome: Result<ChatResponse, BackendError>,
        now: DateTime<Utc>,
    ) -> Vec<EntryId> {
        self.in_flight = false;

        let response = match outcome {
            Ok(response) => response,
            Err(err) => {
                warn!(error = %err, "receive_reply: request failed");
                let entry = ChatEntry::new(
                    Origin::Assistant,
                    EntryKind::Normal,
                    SERVER_ERROR_TEXT,
                    iso_timestamp(now),
                );
                let id = entry.id;
                self.entries.push(entry);
                return vec![id];
            }
        };

        let text = response
            .reply
            .filter(|reply| !reply.is_empty())
            .unwrap_or_else(|| NO_REPLY_TEXT.to_string());
        let created_at = response
            .timestamp
            .filter(|timestamp| !timestamp.is_empty())
            .unwrap_or_else(|| iso_timestamp(now));
        let mut reply = ChatEntry::new(Origin::Assistant, EntryKind::Normal, text, created_at);
        reply.curriculum = response.learning_plan;
        reply.agent_activity = response.agent_activity;
        let reply_id = reply.id;
        let has_plan = reply.curriculum.is_some();

        // Both appends happen under the same &mut borrow.
        let mut appended = vec![reply_id];
        self.entries.push(reply);
        if has_plan {
            let mut prompt = ChatEntry::new(
                Origin::Assistant,
                EntryKind::WeeklyPrompt,
                WEEKLY_PROMPT_TEXT,
                iso_timestamp(now),
            );
            prompt.related_entry_id = Some(reply_id);
            appended.push(prompt.id);
            self.entries.push(prompt);
        }

        info!(%reply_id, has_plan, "receive_reply: assistant reply appended");
        appended
    }

    /// The curriculum-bearing entry a weekly prompt points at
    fn resolve_prompt_target(&self, prompt_id: &EntryId) -> Option<&ChatEntry> {
        let prompt = self.get(prompt_id)?;
        if prompt.kind != EntryKind::WeeklyPrompt {
            return None;
        }
        let target_id = prompt.related_entry_id?;
        self.get(&target_id).filter(|target| target.curriculum.is_some())
    }

    /// Append a daily-plan entry for the prompt's curriculum. No-op when the
    /// prompt or its curriculum entry cannot be found.
    pub fn view_daily_plan(&mut self, prompt_id: &EntryId, now: DateTime<Utc>) -> Option<EntryId> {
        let Some(target_id) = self.resolve_prompt_target(prompt_id).map(|t| t.id) else {
            debug!(%prompt_id, "view_daily_plan: prompt does not resolve, ignoring");
            return None;
        };

        let mut entry = ChatEntry::new(Origin::Assistant, EntryKind::DailyPlan, "", iso_timestamp(now));
        entry.related_entry_id = Some(target_id);
        let id = entry.id;
        self.entries.push(entry);

        info!(%id, %target_id, "view_daily_plan: daily plan appended");
        Some(id)
    }

    /// Ids of weekly prompts whose View would succeed, in display order
    pub fn actionable_prompts(&self) -> Vec<EntryId> {
        self.entries
            .iter()
            .filter(|e| e.kind == EntryKind::WeeklyPrompt)
            .filter(|e| self.resolve_prompt_target(&e.id).is_some())
            .map(|e| e.id)
            .collect()
    }

    /// Project the store for display.
    pub fn render(&self, now: DateTime<Utc>) -> Vec<EntryView<'_>> {
        self.entries
            .iter()
            .filter_map(|entry| self.render_entry(entry, now))
            .collect()
    }

    fn render_entry<'a>(&'a self, entry: &'a ChatEntry, now: DateTime<Utc>) -> Option<EntryView<'a>> {
        let mut view = EntryView {
            id: entry.id,
            kind: entry.kind,
            origin: entry.origin,
            text: &entry.display_text,
            age: time_ago(&entry.created_at, now),
            curriculum: None,
            has_agent_activity: false,
            agent_text: None,
            actionable: false,
            rows: Vec::new(),
        };

        match entry.kind {
            EntryKind::Normal => {
                if entry.origin == Origin::Assistant {
                    view.curriculum = entry.curriculum.as_ref();
                    view.has_agent_activity = entry.agent_activity.is_some();
                    view.agent_text = entry.agent_activity_text();
                }
            }
            EntryKind::WeeklyPrompt => {
                view.actionable = self.resolve_prompt_target(&entry.id).is_some();
            }
            EntryKind::DailyPlan => {
                let source = self.get(&entry.related_entry_id?)?;
                view.rows = project_rows(source.curriculum.as_ref());
            }
        }

        Some(view)
    }

    #[cfg(test)]
    pub(crate) fn push_raw(&mut self, entry: ChatEntry) {
        self.entries.push(entry);
    }
}
