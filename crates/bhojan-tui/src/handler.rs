use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers, MouseEvent, MouseEventKind};
use ratatui::layout::Rect;
use crate::app::{App, FocusPane, InputMode};
use crate::tui::AppEvent;

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

/// Line-editing keys shared by the message box and both popups.
/// Returns false when the key is not an editing key.
fn edit_line(text: &mut String, cursor: &mut usize, key: KeyEvent) -> bool {
    match key.code {
        KeyCode::Backspace => {
            if *cursor > 0 {
                *cursor -= 1;
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Delete => {
            if *cursor < text.chars().count() {
                let byte_pos = char_to_byte_index(text, *cursor);
                text.remove(byte_pos);
            }
        }
        KeyCode::Left => {
            *cursor = cursor.saturating_sub(1);
        }
        KeyCode::Right => {
            *cursor = (*cursor + 1).min(text.chars().count());
        }
        KeyCode::Home => {
            *cursor = 0;
        }
        KeyCode::End => {
            *cursor = text.chars().count();
        }
        KeyCode::Char(c) => {
            let byte_pos = char_to_byte_index(text, *cursor);
            text.insert(byte_pos, c);
            *cursor += 1;
        }
        _ => return false,
    }
    true
}

pub async fn handle_event(app: &mut App, event: AppEvent) -> Result<()> {
    match event {
        AppEvent::Key(key) => handle_key(app, key),
        AppEvent::Mouse(mouse) => handle_mouse(app, mouse),
        AppEvent::Paste(text) => handle_paste(app, &text),
        AppEvent::Resize => {}
        AppEvent::Tick => app.tick_animation(),
    }
    app.poll_turn().await;
    Ok(())
}

/// Insert `pasted` at the cursor; line breaks become spaces.
fn insert_text(text: &mut String, cursor: &mut usize, pasted: &str) {
    let flat: String = pasted
        .trim_end()
        .chars()
        .map(|c| if c == '\n' || c == '\r' { ' ' } else { c })
        .collect();
    let byte_pos = char_to_byte_index(text, *cursor);
    text.insert_str(byte_pos, &flat);
    *cursor += flat.chars().count();
}

fn handle_paste(app: &mut App, pasted: &str) {
    if app.show_api_key_input {
        insert_text(&mut app.api_key_input, &mut app.api_key_input_cursor, pasted.trim());
    } else if app.show_attach_input {
        insert_text(&mut app.attach_input, &mut app.attach_cursor, pasted.trim());
    } else if !app.show_provider_picker {
        if app.input_mode == InputMode::Normal {
            enter_editing(app);
        }
        insert_text(&mut app.input, &mut app.input_cursor, pasted);
    }
}

fn handle_key(app: &mut App, key: KeyEvent) {
    // Global keys that work in any mode
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        app.should_quit = true;
        return;
    }

    // Popups take every key while open (in order of priority)
    if app.show_api_key_input {
        handle_api_key_input(app, key);
        return;
    }
    if app.show_provider_picker {
        handle_provider_picker(app, key);
        return;
    }
    if app.show_attach_input {
        handle_attach_input(app, key);
        return;
    }

    match app.input_mode {
        InputMode::Normal => handle_normal_mode(app, key),
        InputMode::Editing => handle_editing_mode(app, key),
    }
}

fn handle_api_key_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.cancel_api_key(),
        KeyCode::Enter => app.confirm_api_key(),
        _ => {
            edit_line(&mut app.api_key_input, &mut app.api_key_input_cursor, key);
        }
    }
}

fn handle_provider_picker(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => app.show_provider_picker = false,
        KeyCode::Char('j') | KeyCode::Down => app.provider_picker_nav_down(),
        KeyCode::Char('k') | KeyCode::Up => app.provider_picker_nav_up(),
        KeyCode::Enter => app.pick_provider(),
        _ => {}
    }
}

fn handle_attach_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.show_attach_input = false;
            app.attach_input.clear();
            app.attach_cursor = 0;
        }
        KeyCode::Enter => app.confirm_attach_input(),
        _ => {
            edit_line(&mut app.attach_input, &mut app.attach_cursor, key);
        }
    }
}

fn handle_normal_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.should_quit = true,

        // Start editing the message
        KeyCode::Char('e') | KeyCode::Char('i') => enter_editing(app),
        KeyCode::Enter => {
            if app.focus == FocusPane::History {
                app.load_selected_history();
            } else {
                enter_editing(app);
            }
        }

        // Tab cycles: Input -> Chat -> History (when shown) -> Input
        KeyCode::Tab => {
            app.focus = match app.focus {
                FocusPane::Input => FocusPane::Chat,
                FocusPane::Chat if app.show_history => FocusPane::History,
                FocusPane::Chat | FocusPane::History => FocusPane::Input,
            };
            if app.focus == FocusPane::Input {
                enter_editing(app);
            }
        }

        KeyCode::Char('j') | KeyCode::Down => match app.focus {
            FocusPane::History => app.history_nav_down(),
            _ => app.scroll_chat_down(1),
        },
        KeyCode::Char('k') | KeyCode::Up => match app.focus {
            FocusPane::History => app.history_nav_up(),
            _ => app.scroll_chat_up(1),
        },
        KeyCode::Char('d') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_down(app.chat_height / 2);
        }
        KeyCode::Char('u') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.scroll_chat_up(app.chat_height / 2);
        }
        KeyCode::Char('g') => match app.focus {
            FocusPane::History => {
                if !app.history.is_empty() {
                    app.history_state.select(Some(0));
                }
            }
            _ => app.scroll_chat_top(),
        },
        KeyCode::Char('G') => match app.focus {
            FocusPane::History => {
                if !app.history.is_empty() {
                    app.history_state.select(Some(app.history.len() - 1));
                }
            }
            _ => app.scroll_chat_bottom(),
        },

        // Attachments
        KeyCode::Char('o') => app.open_attach_input(),
        KeyCode::Char('x') => app.remove_attachment(),

        // History
        KeyCode::Char('h') => app.toggle_history(),
        KeyCode::Char('D') => {
            if app.show_history {
                app.clear_history();
            }
        }
        KeyCode::Char('n') => app.new_conversation(),

        // Copy the latest reply
        KeyCode::Char('c') => {
            if let Some(msg) = app.conversation.last_assistant() {
                copy_to_clipboard(&msg.content);
                app.status = Some("Copied reply".to_string());
            }
        }

        KeyCode::Char('P') => app.open_provider_picker(),

        KeyCode::Esc => app.status = None,

        _ => {}
    }
}

fn enter_editing(app: &mut App) {
    app.focus = FocusPane::Input;
    app.input_mode = InputMode::Editing;
    // Cursor at end of existing text
    app.input_cursor = app.input.chars().count();
}

fn handle_editing_mode(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Esc => {
            app.input_mode = InputMode::Normal;
        }
        KeyCode::Tab => {
            app.input_mode = InputMode::Normal;
            app.focus = FocusPane::Chat;
        }
        KeyCode::Enter => {
            app.send_input();
        }
        // Attach without leaving the message box
        KeyCode::Char('o') if key.modifiers.contains(KeyModifiers::CONTROL) => {
            app.open_attach_input();
        }
        _ => {
            edit_line(&mut app.input, &mut app.input_cursor, key);
        }
    }
}

/// Check if a point is within a rectangle
fn point_in_rect(x: u16, y: u16, rect: Rect) -> bool {
    x >= rect.x && x < rect.x + rect.width && y >= rect.y && y < rect.y + rect.height
}

fn handle_mouse(app: &mut App, mouse: MouseEvent) {
    let x = mouse.column;
    let y = mouse.row;

    // Position-based scrolling
    let in_chat = app.chat_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);
    let in_history = app.history_area.map(|r| point_in_rect(x, y, r)).unwrap_or(false);

    match mouse.kind {
        MouseEventKind::ScrollDown => {
            if in_history {
                app.history_nav_down();
            } else if in_chat {
                app.scroll_chat_down(3);
            }
        }
        MouseEventKind::ScrollUp => {
            if in_history {
                app.history_nav_up();
            } else if in_chat {
                app.scroll_chat_up(3);
            }
        }
        _ => {}
    }
}

fn copy_to_clipboard(text: &str) {
    use std::io::Write;
    use std::process::{Command, Stdio};

    // First clipboard tool that starts wins
    let candidates: [(&str, &[&str]); 3] = [
        ("pbcopy", &[]),
        ("wl-copy", &[]),
        ("xclip", &["-selection", "clipboard"]),
    ];

    for (program, args) in candidates {
        if let Ok(mut child) = Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .spawn()
        {
            if let Some(mut stdin) = child.stdin.take() {
                let _ = stdin.write_all(text.as_bytes());
            }
            let _ = child.wait();
            return;
        }
    }
    tracing::warn!("no clipboard tool available");
}
