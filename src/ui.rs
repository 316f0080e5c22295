use chrono::Utc;
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Paragraph, Scrollbar, ScrollbarOrientation, ScrollbarState, Wrap},
};

use crate::app::{App, InputMode};
use crate::conversation::{EntryId, EntryKind, EntryView, Origin};
use crate::plan::{CurriculumPlan, PlanRow};

const DAILY_PLAN_INTRO: &str = "Here is your detailed daily learning plan:";
const FOCUS_COLUMN_MAX: usize = 24;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    let [header_area, chat_area, input_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(3),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);
    render_chat(app, frame, chat_area);
    render_input(app, frame, input_area);
    render_footer(app, frame, footer_area);
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Learning Chat ", Style::default().fg(Color::Cyan).bold()),
        Span::styled(app.backend.chat_url().to_string(), Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("v{}", env!("CARGO_PKG_VERSION")),
            Style::default().fg(Color::Gray),
        ),
    ]);

    let header = Paragraph::new(title).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(header, area);
}

fn render_footer(app: &App, frame: &mut Frame, area: Rect) {
    let (mode_text, mode_style) = match app.input_mode {
        InputMode::Normal => (" CHAT ", Style::default().bg(Color::Blue).fg(Color::White)),
        InputMode::Editing => (" TYPE ", Style::default().bg(Color::Yellow).fg(Color::Black)),
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);
    let disabled_style = Style::default().bg(Color::Black).fg(Color::DarkGray);

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    match app.input_mode {
        InputMode::Editing => {
            let send_style = if app.can_submit() { label_style } else { disabled_style };
            spans.extend(vec![
                Span::styled(" Enter ", key_style),
                Span::styled(if app.is_sending() { " sending " } else { " send " }, send_style),
                Span::styled(" Esc ", key_style),
                Span::styled(" chat ", label_style),
                Span::styled(" Ctrl-C ", key_style),
                Span::styled(" quit ", label_style),
            ]);
        }
        InputMode::Normal => {
            let view_style = if app.selected_prompt.is_some() { label_style } else { disabled_style };
            spans.extend(vec![
                Span::styled(" j/k ", key_style),
                Span::styled(" scroll ", label_style),
                Span::styled(" n/p ", key_style),
                Span::styled(" select plan ", label_style),
                Span::styled(" v ", key_style),
                Span::styled(" view ", view_style),
                Span::styled(" i ", key_style),
                Span::styled(" type ", label_style),
                Span::styled(" q ", key_style),
                Span::styled(" quit ", label_style),
            ]);
        }
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if app.input_mode == InputMode::Normal {
            Color::Cyan
        } else {
            Color::DarkGray
        }))
        .title(" Chat ");

    let inner = block.inner(area);
    let views = app.conversation.render(Utc::now());

    let lines = if views.is_empty() && !app.is_sending() {
        vec![Line::from(Span::styled(
            "Ask for a learning plan, e.g. \"I want to learn Python\"",
            Style::default().fg(Color::DarkGray),
        ))]
    } else {
        let mut lines = chat_lines(&views, app.selected_prompt.as_ref());
        if app.is_sending() {
            lines.push(Line::from(Span::styled(
                "Bot:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            // Animated ellipsis: cycles through ".", "..", "..."
            let dots = ".".repeat((app.animation_frame as usize) + 1);
            lines.push(Line::from(Span::styled(
                format!("Thinking{}", dots),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    };

    let chat = Paragraph::new(Text::from(lines)).wrap(Wrap { trim: false });
    // Measured before the block is attached so borders are not counted
    let total_lines = chat.line_count(inner.width).min(u16::MAX as usize) as u16;
    app.update_chat_layout(total_lines, inner.height);

    let chat = chat.block(block).scroll((app.chat_scroll, 0));
    frame.render_widget(chat, area);

    if app.total_chat_lines > app.chat_height {
        let scrollbar = Scrollbar::new(ScrollbarOrientation::VerticalRight)
            .begin_symbol(Some("^"))
            .end_symbol(Some("v"));

        let mut scrollbar_state = ScrollbarState::new(app.total_chat_lines as usize)
            .position(app.chat_scroll as usize);

        frame.render_stateful_widget(
            scrollbar,
            area.inner(ratatui::layout::Margin {
                vertical: 1,
                horizontal: 0,
            }),
            &mut scrollbar_state,
        );
    }
}

/// Owned lines so the store borrow ends before layout is updated
fn chat_lines(views: &[EntryView<'_>], selected_prompt: Option<&EntryId>) -> Vec<Line<'static>> {
    let mut lines = Vec::new();

    for view in views {
        let (label, label_color, alignment) = match view.origin {
            Origin::User => ("You", Color::Cyan, Alignment::Right),
            Origin::Assistant => ("Bot", Color::Yellow, Alignment::Left),
        };

        let age = Line::from(Span::styled(view.age.clone(), Style::default().fg(Color::DarkGray)))
            .alignment(alignment);
        lines.push(age);
        lines.push(
            Line::from(Span::styled(
                format!("{}:", label),
                Style::default().fg(label_color).add_modifier(Modifier::BOLD),
            ))
            .alignment(alignment),
        );

        match view.kind {
            EntryKind::Normal => {
                for text_line in view.text.lines() {
                    lines.push(Line::from(text_line.to_string()).alignment(alignment));
                }
                if let Some(plan) = view.curriculum {
                    lines.extend(curriculum_lines(plan));
                }
                if view.has_agent_activity {
                    lines.push(section_title("Agent Activity (SDK)"));
                }
                if let Some(agent_text) = view.agent_text {
                    lines.push(Line::from(agent_text.to_string()));
                }
            }
            EntryKind::WeeklyPrompt => {
                lines.push(Line::from(view.text.to_string()));
                let selected = selected_prompt == Some(&view.id);
                let button_style = match (view.actionable, selected) {
                    (true, true) => Style::default().fg(Color::Black).bg(Color::Yellow).bold(),
                    (true, false) => Style::default().fg(Color::Yellow).bold(),
                    (false, _) => Style::default().fg(Color::DarkGray),
                };
                lines.push(Line::from(Span::styled("[ View ]", button_style)));
            }
            EntryKind::DailyPlan => {
                lines.push(Line::from(DAILY_PLAN_INTRO));
                lines.extend(table_lines(&view.rows));
            }
        }

        lines.push(Line::default());
    }

    lines
}

fn section_title(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
    ))
}

fn curriculum_lines(plan: &CurriculumPlan) -> Vec<Line<'static>> {
    let link_style = Style::default().fg(Color::Blue).add_modifier(Modifier::UNDERLINED);
    let mut lines = vec![
        Line::default(),
        Line::from(Span::styled(
            format!("{} – {}", plan.topic, plan.level),
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled(
            format!("Duration: {} weeks", plan.duration_weeks),
            Style::default().fg(Color::Gray),
        )),
        section_title("Curriculum"),
    ];

    for (index, module) in plan.modules.iter().enumerate() {
        lines.push(Line::from(Span::styled(
            format!("{}. {}", index + 1, module.title),
            Style::default().add_modifier(Modifier::BOLD),
        )));
        if !module.description.is_empty() {
            lines.push(Line::from(format!("   {}", module.description)));
        }
    }

    lines.push(section_title("YouTube videos"));
    for url in &plan.video_links {
        lines.push(Line::from(Span::styled(url.clone(), link_style)));
    }

    lines.push(section_title("LinkedIn Learning videos"));
    for url in &plan.article_links {
        lines.push(Line::from(Span::styled(url.clone(), link_style)));
    }

    lines
}

fn pad(text: &str, width: usize) -> String {
    let truncated: String = if text.chars().count() > width {
        let mut s: String = text.chars().take(width.saturating_sub(1)).collect();
        s.push('…');
        s
    } else {
        text.to_string()
    };
    let fill = width.saturating_sub(truncated.chars().count());
    format!("{}{}", truncated, " ".repeat(fill))
}

/// Day / Focus / Activity columns as fixed-width text lines
fn table_lines(rows: &[PlanRow]) -> Vec<Line<'static>> {
    let day_width = rows
        .iter()
        .map(|r| r.day_label.chars().count())
        .chain(std::iter::once("Day".len()))
        .max()
        .unwrap_or(3);
    let focus_width = rows
        .iter()
        .map(|r| r.focus.chars().count())
        .chain(std::iter::once("Focus".len()))
        .max()
        .unwrap_or(5)
        .min(FOCUS_COLUMN_MAX);

    let header_style = Style::default().fg(Color::Black).bg(Color::Gray).bold();
    let mut lines = vec![Line::from(vec![
        Span::styled(pad("Day", day_width), header_style),
        Span::styled(" │ ", header_style),
        Span::styled(pad("Focus", focus_width), header_style),
        Span::styled(" │ ", header_style),
        Span::styled("Activity", header_style),
    ])];

    for row in rows {
        lines.push(Line::from(vec![
            Span::styled(pad(&row.day_label, day_width), Style::default().fg(Color::Cyan)),
            Span::raw(" │ "),
            Span::raw(pad(&row.focus, focus_width)),
            Span::raw(" │ "),
            Span::raw(row.activity.clone()),
        ]));
    }

    lines
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if editing { Color::Yellow } else { Color::DarkGray };

    let max = app.conversation.max_input_chars();
    let too_long = app.input_too_long();
    let counter = format!(
        " {}/{}{} ",
        app.input_char_count(),
        max,
        if too_long { " – too long" } else { "" }
    );
    let counter_style = if too_long {
        Style::default().fg(Color::Red).bold()
    } else {
        Style::default().fg(Color::DarkGray)
    };

    let title = if app.is_sending() { " Message (waiting for reply...) " } else { " Message " };
    let input_block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title)
        .title_bottom(Line::from(Span::styled(counter, counter_style)).alignment(Alignment::Right));

    // Keep the cursor visible with horizontal scrolling
    let inner_width = area.width.saturating_sub(2) as usize;
    let cursor_pos = app.input_cursor;
    let scroll_offset = if inner_width == 0 {
        0
    } else if cursor_pos >= inner_width {
        cursor_pos - inner_width + 1
    } else {
        0
    };

    let visible_text: String = app
        .input
        .chars()
        .skip(scroll_offset)
        .take(inner_width)
        .collect();

    let placeholder = app.input.is_empty();
    let input = Paragraph::new(if placeholder {
        Span::styled("Type a message...", Style::default().fg(Color::DarkGray))
    } else {
        Span::styled(visible_text, Style::default().fg(Color::Cyan))
    })
    .block(input_block);

    frame.render_widget(input, area);

    if editing {
        let cursor_x = (cursor_pos - scroll_offset) as u16;
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::ChatResponse;
    use crate::config::Config;
    use crate::plan::tests::sample_plan;
    use ratatui::{backend::TestBackend, Terminal};

    fn app() -> App {
        App::new(&Config {
            backend_url: "http://127.0.0.1:9/chat".to_string(),
            max_message_length: 10,
            ..Config::default()
        })
    }

    fn draw(app: &mut App, width: u16, height: u16) -> String {
        let mut terminal = Terminal::new(TestBackend::new(width, height)).unwrap();
        terminal.draw(|frame| render(app, frame)).unwrap();
        let buffer = terminal.backend().buffer();
        let mut out = String::new();
        for row in buffer.content.chunks(buffer.area.width as usize) {
            for cell in row {
                out.push_str(cell.symbol());
            }
            out.push('\n');
        }
        out
    }

    #[test]
    fn test_table_lines_align_columns() {
        let rows = crate::plan::project_rows(Some(&sample_plan()));
        let lines = table_lines(&rows);
        assert_eq!(lines.len(), 4);
        let widths: Vec<usize> = lines
            .iter()
            .map(|l| l.spans[0].content.chars().count())
            .collect();
        assert!(widths.iter().all(|w| *w == "Week 1 · Day 1".chars().count()));
    }

    #[test]
    fn test_pad_truncates_long_cells() {
        assert_eq!(pad("abcdef", 4), "abc…");
        assert_eq!(pad("ab", 4), "ab  ");
    }

    #[test]
    fn test_render_plan_prompt_and_table() {
        let mut app = app();
        app.conversation.submit("teach me Go", Utc::now()).unwrap();
        app.apply_reply(Ok(ChatResponse {
            reply: Some("ok".to_string()),
            learning_plan: Some(sample_plan()),
            ..ChatResponse::default()
        }));
        app.view_selected_prompt();

        let screen = draw(&mut app, 100, 60);
        assert!(screen.contains("teach me Go"));
        assert!(screen.contains("Go – Beginner"));
        assert!(screen.contains("Duration: 2 weeks"));
        assert!(screen.contains("[ View ]"));
        assert!(screen.contains(DAILY_PLAN_INTRO));
        assert!(screen.contains("Week 2 · Day 1"));
        assert!(screen.contains("just now"));
    }

    #[test]
    fn test_counter_flags_over_long_input() {
        let mut app = app();
        app.input = "this is far too long".to_string();
        app.input_cursor = app.input_char_count();
        let screen = draw(&mut app, 80, 12);
        assert!(screen.contains("20/10 – too long"));
    }

    #[test]
    fn test_long_reply_scrolls_to_its_last_line() {
        let mut app = app();
        app.conversation.submit("hi", Utc::now()).unwrap();
        app.apply_reply(Ok(ChatResponse {
            reply: Some(format!("{}\nLASTLINE", "abcdefghijklmn ".repeat(40))),
            ..ChatResponse::default()
        }));

        let screen = draw(&mut app, 40, 20);
        assert!(screen.contains("LASTLINE"));
        assert_eq!(app.chat_scroll, app.max_scroll());
    }

    #[test]
    fn test_agent_heading_without_text() {
        let mut app = app();
        app.conversation.submit("hi", Utc::now()).unwrap();
        app.apply_reply(Ok(ChatResponse {
            reply: Some("ok".to_string()),
            agent_activity: Some(serde_json::json!({"type": "message"})),
            ..ChatResponse::default()
        }));

        let screen = draw(&mut app, 80, 20);
        assert!(screen.contains("Agent Activity (SDK)"));
    }

    #[test]
    fn test_placeholder_when_empty() {
        let mut app = app();
        let screen = draw(&mut app, 80, 12);
        assert!(screen.contains("Ask for a learning plan"));
        assert!(screen.contains("0/10"));
    }
}
