use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use tracing::debug;

use crate::app::{App, InputMode};
use crate::tui::AppEvent;

pub fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Resize(_, _) => {}
        AppEvent::Tick => app.tick_animation(),
        // Nothing to update; the redraw after every event refreshes ages
        AppEvent::Refresh => debug!("handle_event: refresh tick"),
    }
    Ok(())
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Back to typing
        KeyCode::Char('i') | KeyCode::Tab => {
            app.input_mode = InputMode::Editing;
            app.cursor_end();
        }

        // Weekly prompt selection and View
        KeyCode::Char('n') | KeyCode::Right => app.select_next_prompt(),
        KeyCode::Char('p') | KeyCode::Left => app.select_prev_prompt(),
        KeyCode::Char('v') | KeyCode::Enter => {
            app.view_selected_prompt();
        }

        // Chat scrolling
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_up(app.chat_height / 2);
        }
        KeyCode::Char('j') | KeyCode::Down => app.scroll_down(1),
        KeyCode::Char('k') | KeyCode::Up => app.scroll_up(1),
        KeyCode::Char('g') => app.scroll_to_top(),
        KeyCode::Char('G') => app.scroll_to_bottom(),

        _ => {}
    }
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc | KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Enter => {
            app.submit_input();
        }
        KeyCode::Backspace => app.backspace(),
        KeyCode::Delete => app.delete(),
        KeyCode::Left => app.cursor_left(),
        KeyCode::Right => app.cursor_right(),
        KeyCode::Home => app.cursor_home(),
        KeyCode::End => app.cursor_end(),
        KeyCode::Up => app.scroll_up(1),
        KeyCode::Down => app.scroll_down(1),
        KeyCode::Char(c) => app.insert_char(c),
        _ => {}
    }
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    match mouse.kind {
        MouseEventKind::ScrollDown => app.scroll_down(3),
        MouseEventKind::ScrollUp => app.scroll_up(3),
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatResponse;
    use crate::config::Config;
    use crate::conversation::EntryKind;
    use crate::plan::tests::sample_plan;

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn app() -> App {
        App::new(&Config {
            backend_url: "http://127.0.0.1:9/chat".to_string(),
            ..Config::default()
        })
    }

    #[tokio::test]
    async fn test_typing_and_enter_submits() {
        let mut app = app();
        for c in "teach me Go".chars() {
            handle_event(&mut app, key(KeyCode::Char(c))).unwrap();
        }
        assert_eq!(app.input, "teach me Go");

        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert_eq!(app.conversation.len(), 1);
        assert!(app.input.is_empty());
        app.shutdown();
    }

    #[tokio::test]
    async fn test_enter_on_blank_input_does_nothing() {
        let mut app = app();
        handle_event(&mut app, key(KeyCode::Char(' '))).unwrap();
        handle_event(&mut app, key(KeyCode::Enter)).unwrap();
        assert!(app.conversation.is_empty());
        assert!(app.reply_task.is_none());
    }

    #[tokio::test]
    async fn test_view_key_in_normal_mode() {
        let mut app = app();
        app.conversation.submit("teach me Go", chrono::Utc::now()).unwrap();
        app.apply_reply(Ok(ChatResponse {
            reply: Some("ok".to_string()),
            learning_plan: Some(sample_plan()),
            ..ChatResponse::default()
        }));

        handle_event(&mut app, key(KeyCode::Esc)).unwrap();
        assert_eq!(app.input_mode, InputMode::Normal);
        handle_event(&mut app, key(KeyCode::Char('v'))).unwrap();

        let last = app.conversation.entries().last().unwrap();
        assert_eq!(last.kind, EntryKind::DailyPlan);
    }

    #[tokio::test]
    async fn test_ctrl_c_quits_from_editing() {
        let mut app = app();
        let event = AppEvent::Key(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL));
        handle_event(&mut app, event).unwrap();
        assert!(app.should_quit);
        assert!(app.input.is_empty());
    }
}
