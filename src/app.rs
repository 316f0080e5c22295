use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::backend::{BackendClient, BackendError, ChatResponse};
use crate::config::Config;
use crate::conversation::{Conversation, EntryId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    Normal,
    Editing,
}

/// The single outstanding backend request. Dropping it aborts the task so a
/// late completion can never reach a torn-down screen.
pub struct PendingReply {
    handle: JoinHandle<Result<ChatResponse, BackendError>>,
}

impl PendingReply {
    fn spawn(backend: BackendClient, message: String) -> Self {
        let handle = tokio::spawn(async move { backend.send_message(&message).await });
        Self { handle }
    }

    /// Cancel safe. Must not be awaited again once it has resolved.
    async fn outcome(&mut self) -> Result<ChatResponse, BackendError> {
        match (&mut self.handle).await {
            Ok(outcome) => outcome,
            Err(err) => Err(BackendError::TaskFailed(err.to_string())),
        }
    }
}

impl Drop for PendingReply {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

pub struct App {
    pub should_quit: bool,
    pub input_mode: InputMode,

    pub conversation: Conversation,
    pub backend: BackendClient,
    pub reply_task: Option<PendingReply>,

    // Input box
    pub input: String,
    pub input_cursor: usize,

    // Chat pane, sizes are updated during render
    pub chat_scroll: u16,
    pub chat_height: u16,
    pub total_chat_lines: u16,
    pub follow_bottom: bool,

    /// Weekly prompt that View acts on
    pub selected_prompt: Option<EntryId>,

    pub animation_frame: u8,
}

impl App {
    pub fn new(config: &Config) -> Self {
        Self {
            should_quit: false,
            input_mode: InputMode::Editing,

            conversation: Conversation::new(config.max_message_length),
            backend: BackendClient::new(&config.backend_url),
            reply_task: None,

            input: String::new(),
            input_cursor: 0,

            chat_scroll: 0,
            chat_height: 0,
            total_chat_lines: 0,
            follow_bottom: true,

            selected_prompt: None,

            animation_frame: 0,
        }
    }

    pub fn is_sending(&self) -> bool {
        self.conversation.is_in_flight()
    }

    pub fn input_char_count(&self) -> usize {
        self.input.chars().count()
    }

    pub fn input_too_long(&self) -> bool {
        self.input_char_count() > self.conversation.max_input_chars()
    }

    pub fn can_submit(&self) -> bool {
        self.conversation.check_submit(&self.input).is_ok()
    }

    /// Send the input box contents. Returns false when the guards reject it.
    pub fn submit_input(&mut self) -> bool {
        let outbound = match self.conversation.submit(&self.input, Utc::now()) {
            Ok(outbound) => outbound,
            Err(rejection) => {
                debug!(%rejection, "submit_input: not sending");
                return false;
            }
        };

        self.input.clear();
        self.input_cursor = 0;
        self.follow_bottom = true;
        debug!(entry_id = %outbound.entry_id, "submit_input: request spawned");
        self.reply_task = Some(PendingReply::spawn(self.backend.clone(), outbound.message));
        true
    }

    /// Wait for the pending request and apply its outcome. Never resolves
    /// while nothing is in flight.
    pub async fn await_reply(&mut self) {
        let Some(task) = self.reply_task.as_mut() else {
            return std::future::pending().await;
        };
        let outcome = task.outcome().await;
        self.reply_task = None;
        self.apply_reply(outcome);
    }

    pub fn apply_reply(&mut self, outcome: Result<ChatResponse, BackendError>) {
        let appended = self.conversation.receive_reply(outcome, Utc::now());
        self.follow_bottom = true;

        // A fresh weekly prompt becomes the View target
        let newest_prompt = self
            .conversation
            .actionable_prompts()
            .into_iter()
            .rev()
            .find(|id| appended.contains(id));
        if newest_prompt.is_some() {
            self.selected_prompt = newest_prompt;
        }
    }

    pub fn view_selected_prompt(&mut self) -> bool {
        let Some(prompt_id) = self.selected_prompt else {
            return false;
        };
        let appended = self.conversation.view_daily_plan(&prompt_id, Utc::now()).is_some();
        if appended {
            self.follow_bottom = true;
        }
        appended
    }

    pub fn select_next_prompt(&mut self) {
        self.step_prompt_selection(true);
    }

    pub fn select_prev_prompt(&mut self) {
        self.step_prompt_selection(false);
    }

    fn step_prompt_selection(&mut self, forward: bool) {
        let prompts = self.conversation.actionable_prompts();
        if prompts.is_empty() {
            self.selected_prompt = None;
            return;
        }
        let current = self
            .selected_prompt
            .and_then(|id| prompts.iter().position(|p| *p == id));
        let next = match (current, forward) {
            (None, true) => 0,
            (None, false) => prompts.len() - 1,
            (Some(i), true) => (i + 1).min(prompts.len() - 1),
            (Some(i), false) => i.saturating_sub(1),
        };
        self.selected_prompt = Some(prompts[next]);
    }

    /// Abort any pending request; its completion is discarded.
    pub fn shutdown(&mut self) {
        if self.reply_task.take().is_some() {
            info!("shutdown: discarding pending reply");
        }
    }

    // Input editing
    pub fn insert_char(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
        self.input.insert(byte_pos, c);
        self.input_cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.input_cursor > 0 {
            self.input_cursor -= 1;
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.input_cursor < self.input_char_count() {
            let byte_pos = char_to_byte_index(&self.input, self.input_cursor);
            self.input.remove(byte_pos);
        }
    }

    pub fn cursor_left(&mut self) {
        self.input_cursor = self.input_cursor.saturating_sub(1);
    }

    pub fn cursor_right(&mut self) {
        self.input_cursor = (self.input_cursor + 1).min(self.input_char_count());
    }

    pub fn cursor_home(&mut self) {
        self.input_cursor = 0;
    }

    pub fn cursor_end(&mut self) {
        self.input_cursor = self.input_char_count();
    }

    // Chat scrolling
    pub fn max_scroll(&self) -> u16 {
        self.total_chat_lines.saturating_sub(self.chat_height)
    }

    pub fn scroll_up(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.min(self.max_scroll()).saturating_sub(lines);
        self.follow_bottom = false;
    }

    pub fn scroll_down(&mut self, lines: u16) {
        self.chat_scroll = self.chat_scroll.saturating_add(lines).min(self.max_scroll());
        self.follow_bottom = self.chat_scroll >= self.max_scroll();
    }

    pub fn scroll_to_top(&mut self) {
        self.chat_scroll = 0;
        self.follow_bottom = false;
    }

    pub fn scroll_to_bottom(&mut self) {
        self.follow_bottom = true;
    }

    /// Called from render once the chat line count is known
    pub fn update_chat_layout(&mut self, total_lines: u16, height: u16) {
        self.total_chat_lines = total_lines;
        self.chat_height = height;
        if self.follow_bottom {
            self.chat_scroll = self.max_scroll();
        } else {
            self.chat_scroll = self.chat_scroll.min(self.max_scroll());
        }
    }

    /// Tick animation frame (called by Tick event)
    pub fn tick_animation(&mut self) {
        if self.is_sending() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }
}
