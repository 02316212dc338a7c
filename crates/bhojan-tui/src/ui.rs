use chrono::Local;
use ratatui::{
    Frame,
    layout::{Constraint, Flex, Layout, Rect},
    style::{Color, Modifier, Style, Stylize},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, Paragraph, Wrap},
};
use bhojan_core::{AnalysisResult, ChatMessage, ChatRole, Provider, RiskLevel};
use crate::app::{App, FocusPane, InputMode};

const HISTORY_WIDTH: u16 = 36;

pub fn render(app: &mut App, frame: &mut Frame) {
    let area = frame.area();

    // Main layout: header, body, footer
    let [header_area, body_area, footer_area] = Layout::vertical([
        Constraint::Length(1),
        Constraint::Min(0),
        Constraint::Length(1),
    ])
    .areas(area);

    render_header(app, frame, header_area);

    let chat_column = if app.show_history {
        let [history_area, chat_column] = Layout::horizontal([
            Constraint::Length(HISTORY_WIDTH),
            Constraint::Min(0),
        ])
        .areas(body_area);
        render_history(app, frame, history_area);
        chat_column
    } else {
        app.history_area = None;
        body_area
    };

    render_chat_column(app, frame, chat_column);
    render_footer(app, frame, footer_area);

    // Render popups (in order of priority)
    if app.show_api_key_input {
        render_api_key_input(app, frame, area);
    } else if app.show_provider_picker {
        render_provider_picker(app, frame, area);
    } else if app.show_attach_input {
        render_attach_input(app, frame, area);
    }
}

fn render_header(app: &App, frame: &mut Frame, area: Rect) {
    let title = Line::from(vec![
        Span::styled(" Bhojanbytes ", Style::default().fg(Color::Cyan).bold()),
        Span::styled("ingredient alignment", Style::default().fg(Color::Gray)),
        Span::raw(" "),
        Span::styled(
            format!("[{} saved]", app.history.len()),
            Style::default().fg(Color::Gray),
        ),
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
    let mode_style = match app.input_mode {
        InputMode::Normal => Style::default().bg(Color::Blue).fg(Color::White),
        InputMode::Editing => Style::default().bg(Color::Yellow).fg(Color::Black),
    };
    let mode_text = match app.input_mode {
        InputMode::Normal => " NORMAL ",
        InputMode::Editing => " EDIT ",
    };

    // Key style: dark background with bright text for visibility on both light/dark terminals
    let key_style = Style::default().bg(Color::DarkGray).fg(Color::White);
    let label_style = Style::default().bg(Color::Black).fg(Color::White);

    let pairs: Vec<(&str, &str)> = if app.input_mode == InputMode::Editing {
        vec![("Enter", "send"), ("^O", "attach"), ("Tab", "chat"), ("Esc", "normal")]
    } else if app.focus == FocusPane::History {
        vec![
            ("j/k", "nav"),
            ("Enter", "open"),
            ("D", "clear all"),
            ("Tab", "focus"),
            ("h", "hide"),
            ("q", "quit"),
        ]
    } else {
        vec![
            ("e", "edit"),
            ("o", "attach"),
            ("x", "detach"),
            ("j/k", "scroll"),
            ("c", "copy"),
            ("n", "new"),
            ("h", "history"),
            ("P", "provider"),
            ("q", "quit"),
        ]
    };

    let mut spans = vec![Span::styled(mode_text, mode_style), Span::raw(" ")];
    for (key, label) in pairs {
        spans.push(Span::styled(format!(" {} ", key), key_style));
        spans.push(Span::styled(format!(" {} ", label), label_style));
    }
    if let Some(status) = &app.status {
        spans.push(Span::raw(" "));
        spans.push(Span::styled(status.clone(), Style::default().fg(Color::Yellow)));
    }

    frame.render_widget(Paragraph::new(Line::from(spans)), area);
}

fn render_history(app: &mut App, frame: &mut Frame, area: Rect) {
    app.history_area = Some(area);

    let focused = app.focus == FocusPane::History;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(" History ");

    if app.history.is_empty() {
        let empty = Paragraph::new(Span::styled(
            "No past scans yet",
            Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
        ))
        .block(block);
        frame.render_widget(empty, area);
        return;
    }

    let text_width = area.width.saturating_sub(4) as usize;
    let items: Vec<ListItem> = app
        .history
        .items()
        .iter()
        .map(|item| {
            let time = item.timestamp.with_timezone(&Local).format("%H:%M").to_string();
            let summary = truncate(&item.summary, text_width.saturating_sub(time.len() + 1));
            ListItem::new(vec![
                Line::from(vec![
                    Span::styled(summary, Style::default().add_modifier(Modifier::BOLD)),
                    Span::raw(" "),
                    Span::styled(time, Style::default().fg(Color::DarkGray)),
                ]),
                Line::from(Span::styled(
                    truncate(&item.overall_assessment, text_width),
                    Style::default().fg(Color::Gray),
                )),
            ])
        })
        .collect();

    let list = List::new(items)
        .block(block)
        .highlight_style(
            Style::default()
                .bg(Color::Indexed(236))
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, area, &mut app.history_state);
}

fn render_chat_column(app: &mut App, frame: &mut Frame, area: Rect) {
    let attachment_height = if app.attached_image.is_some() { 1 } else { 0 };
    let [chat_area, attachment_area, input_area] = Layout::vertical([
        Constraint::Min(0),
        Constraint::Length(attachment_height),
        Constraint::Length(3),
    ])
    .areas(area);

    // Store areas for mouse hit-testing and scroll calculations (inner size minus borders)
    app.chat_area = Some(chat_area);
    app.chat_height = chat_area.height.saturating_sub(2);
    app.chat_width = chat_area.width.saturating_sub(2);

    render_chat(app, frame, chat_area);

    if let Some(image) = &app.attached_image {
        let line = Line::from(vec![
            Span::styled(" 📎 ", Style::default().fg(Color::Magenta)),
            Span::styled(image.display().to_string(), Style::default().fg(Color::Magenta)),
            Span::styled("  (x to remove)", Style::default().fg(Color::DarkGray)),
        ]);
        frame.render_widget(Paragraph::new(line), attachment_area);
    }

    render_input(app, frame, input_area);
}

fn render_chat(app: &mut App, frame: &mut Frame, area: Rect) {
    let focused = app.focus == FocusPane::Chat;
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(if focused { Color::Cyan } else { Color::DarkGray }))
        .title(format!(
            " {}: {} ",
            app.client.provider().display_name(),
            app.client.model()
        ));

    let lines = if app.conversation.is_empty() && !app.loading {
        welcome_lines()
    } else {
        let mut lines: Vec<Line<'static>> = Vec::new();
        for msg in app.conversation.messages() {
            lines.extend(message_lines(msg));
            lines.push(Line::default());
        }
        if app.loading {
            lines.push(Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            )));
            lines.push(Line::from(Span::styled(
                app.loading_text(),
                Style::default().fg(Color::DarkGray).add_modifier(Modifier::ITALIC),
            )));
        }
        lines
    };

    // Keep the newest reply in view unless the user scrolled away
    let total = wrapped_height(&lines, app.chat_width as usize);
    let max_scroll = total.saturating_sub(app.chat_height);
    if app.follow_chat {
        app.chat_scroll = max_scroll;
    } else {
        app.chat_scroll = app.chat_scroll.min(max_scroll);
    }

    let chat = Paragraph::new(Text::from(lines))
        .block(block)
        .wrap(Wrap { trim: false })
        .scroll((app.chat_scroll, 0));

    frame.render_widget(chat, area);
}

fn render_input(app: &App, frame: &mut Frame, area: Rect) {
    let editing = app.input_mode == InputMode::Editing;
    let border_color = if app.focus == FocusPane::Input || editing {
        Color::Yellow
    } else {
        Color::DarkGray
    };

    let title = if app.turn_task.is_some() {
        " Ingredients (analyzing...) "
    } else {
        " Ingredients, comma separated "
    };
    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(border_color))
        .title(title);

    let inner_width = area.width.saturating_sub(2) as usize;
    let (visible_text, cursor_x) = visible_slice(&app.input, app.input_cursor, inner_width);

    let input = Paragraph::new(visible_text)
        .style(Style::default().fg(Color::Cyan))
        .block(block);
    frame.render_widget(input, area);

    if editing && !app.show_attach_input && !app.show_api_key_input && !app.show_provider_picker {
        frame.set_cursor_position((area.x + cursor_x + 1, area.y + 1));
    }
}

fn welcome_lines() -> Vec<Line<'static>> {
    vec![
        Line::from(Span::styled(
            "Bhojanbytes",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        )),
        Line::default(),
        Line::from(Span::styled(
            "Type an ingredient list (comma separated) and press Enter,",
            Style::default().fg(Color::DarkGray),
        )),
        Line::from(Span::styled(
            "or press Ctrl-O to attach a photo of a food label.",
            Style::default().fg(Color::DarkGray),
        )),
    ]
}

fn message_lines(msg: &ChatMessage) -> Vec<Line<'static>> {
    match msg.role {
        ChatRole::User => {
            let mut lines = vec![Line::from(Span::styled(
                "You:",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ))];
            if let Some(image) = &msg.image {
                lines.push(Line::from(Span::styled(
                    format!("📎 {}", image.display()),
                    Style::default().fg(Color::Magenta),
                )));
            }
            for line in msg.content.lines() {
                lines.push(Line::from(line.to_string()));
            }
            lines
        }
        ChatRole::Assistant => {
            let mut lines = vec![Line::from(Span::styled(
                "AI:",
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ))];
            match &msg.analysis {
                Some(analysis) if analysis.inferred_intent.is_some() => {
                    lines.extend(analysis_card_lines(analysis));
                }
                _ => {
                    for line in msg.content.lines() {
                        lines.push(Line::from(line.to_string()));
                    }
                }
            }
            lines
        }
    }
}

fn risk_style(level: RiskLevel) -> Style {
    let color = match level {
        RiskLevel::High => Color::Red,
        RiskLevel::Medium => Color::Yellow,
        RiskLevel::Low => Color::Green,
        RiskLevel::Unknown => Color::Gray,
    };
    Style::default().fg(Color::Black).bg(color).add_modifier(Modifier::BOLD)
}

fn section_heading(title: &str) -> Line<'static> {
    Line::from(Span::styled(
        title.to_string(),
        Style::default().fg(Color::White).add_modifier(Modifier::BOLD | Modifier::UNDERLINED),
    ))
}

/// Card view of an analysis. Renders nothing when the intent is missing.
pub fn analysis_card_lines(analysis: &AnalysisResult) -> Vec<Line<'static>> {
    let Some(intent) = &analysis.inferred_intent else {
        return Vec::new();
    };

    let dim = Style::default().fg(Color::Gray);
    let mut lines = Vec::new();

    if !analysis.overall_assessment.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("“{}”", analysis.overall_assessment),
            Style::default().fg(Color::White).add_modifier(Modifier::ITALIC),
        )));
        lines.push(Line::default());
    }

    // Intent
    lines.push(Line::from(vec![
        Span::raw(format!("{} ", intent.kind().icon())),
        Span::styled(
            intent.label.replace('_', " ").to_uppercase(),
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!("  {}% confidence", intent.confidence_percent()), dim),
    ]));
    for reason in &intent.reasoning {
        lines.push(Line::from(Span::styled(format!("  · {}", reason), dim)));
    }
    lines.push(Line::default());

    // Conflicts
    lines.push(section_heading("Alignment conflicts"));
    if analysis.primary_conflicts.is_empty() {
        lines.push(Line::from(Span::styled("  No conflicts detected", Style::default().fg(Color::Green))));
    }
    for conflict in &analysis.primary_conflicts {
        let risk = conflict.risk();
        let badge = match risk {
            RiskLevel::Unknown => format!(" {} ", conflict.risk_level.to_uppercase()),
            _ => format!(" {} RISK ", risk),
        };
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(badge, risk_style(risk)),
            Span::raw(" "),
            Span::styled(conflict.ingredient.clone(), Style::default().add_modifier(Modifier::BOLD)),
        ]));
        lines.push(Line::from(Span::styled(format!("    {}", conflict.why_it_matters), dim)));
    }
    lines.push(Line::default());

    // Tradeoffs
    lines.push(section_heading("Tradeoffs"));
    if analysis.secondary_tradeoffs.is_empty() {
        lines.push(Line::from(Span::styled("  No notable tradeoffs", dim)));
    }
    for tradeoff in &analysis.secondary_tradeoffs {
        lines.push(Line::from(vec![
            Span::raw("  "),
            Span::styled(tradeoff.ingredient.clone(), Style::default().add_modifier(Modifier::BOLD)),
            Span::styled(format!(": {}", tradeoff.explanation), dim),
        ]));
    }
    lines.push(Line::default());

    // Footer
    let status = analysis.uncertainty_status();
    if analysis.uncertainty_notes.is_empty() {
        lines.push(Line::from(Span::styled(
            format!("✓ {}", status),
            Style::default().fg(Color::Green),
        )));
    } else {
        lines.push(Line::from(vec![
            Span::styled(format!("⚠ {}: ", status), Style::default().fg(Color::Yellow)),
            Span::styled(analysis.uncertainty_notes.join(" • "), dim),
        ]));
    }

    lines
}

/// Estimated rows after wrapping, counting characters per line
fn wrapped_height(lines: &[Line], width: usize) -> u16 {
    let width = width.max(1);
    let total: usize = lines
        .iter()
        .map(|line| line.width().div_ceil(width).max(1))
        .sum();
    u16::try_from(total).unwrap_or(u16::MAX)
}

/// Slice of the input that fits, scrolled so the cursor stays visible.
/// Returns the text and the cursor's column within it.
fn visible_slice(text: &str, cursor: usize, width: usize) -> (String, u16) {
    let scroll_offset = if width == 0 {
        0
    } else if cursor >= width {
        cursor - width + 1
    } else {
        0
    };

    let visible: String = text.chars().skip(scroll_offset).take(width).collect();
    (visible, (cursor - scroll_offset) as u16)
}

fn truncate(text: &str, max: usize) -> String {
    if text.chars().count() <= max {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max.saturating_sub(1)).collect();
    out.push('…');
    out
}

/// Rect of the given size centered in `area`
fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let [row] = Layout::vertical([Constraint::Length(height)])
        .flex(Flex::Center)
        .areas(area);
    let [cell] = Layout::horizontal([Constraint::Length(width.min(area.width))])
        .flex(Flex::Center)
        .areas(row);
    cell
}

fn render_line_popup(frame: &mut Frame, area: Rect, title: &str, text: &str, cursor: usize, masked: bool) {
    let popup = centered(area, 64, 3);
    frame.render_widget(Clear, popup);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(Style::default().fg(Color::Yellow))
        .title(title.to_string());

    let inner_width = popup.width.saturating_sub(2) as usize;
    let shown = if masked {
        "•".repeat(text.chars().count())
    } else {
        text.to_string()
    };
    let (visible, cursor_x) = visible_slice(&shown, cursor, inner_width);

    frame.render_widget(Paragraph::new(visible).block(block), popup);
    frame.set_cursor_position((popup.x + cursor_x + 1, popup.y + 1));
}

fn render_attach_input(app: &App, frame: &mut Frame, area: Rect) {
    render_line_popup(
        frame,
        area,
        " Image path (Enter to attach, empty to remove, Esc to cancel) ",
        &app.attach_input,
        app.attach_cursor,
        false,
    );
}

fn render_api_key_input(app: &App, frame: &mut Frame, area: Rect) {
    let provider = app
        .api_key_target_provider
        .map(|p| p.display_name())
        .unwrap_or("provider");
    render_line_popup(
        frame,
        area,
        &format!(" API key for {} ", provider),
        &app.api_key_input,
        app.api_key_input_cursor,
        true,
    );
}

fn render_provider_picker(app: &mut App, frame: &mut Frame, area: Rect) {
    let providers = Provider::all();
    let popup = centered(area, 44, providers.len() as u16 + 2);
    frame.render_widget(Clear, popup);

    let items: Vec<ListItem> = providers
        .iter()
        .map(|p| {
            let source = match app.config.key_source(*p) {
                Some(source) => format!("({})", source),
                None => "(needs key)".to_string(),
            };
            let current = if *p == app.client.provider() { " *" } else { "" };
            ListItem::new(Line::from(vec![
                Span::raw(format!(" {}{} ", p.display_name(), current)),
                Span::styled(source, Style::default().fg(Color::DarkGray)),
            ]))
        })
        .collect();

    let list = List::new(items)
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::Cyan))
                .title(" Provider "),
        )
        .highlight_style(Style::default().bg(Color::Cyan).fg(Color::Black))
        .highlight_symbol("> ");

    frame.render_stateful_widget(list, popup, &mut app.provider_picker_state);
}
