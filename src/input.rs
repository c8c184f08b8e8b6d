use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::app::{App, AppMode, Tab};
use crate::model::PostStatus;
use crate::selection::VideoFilter;

// --- Event Handling ---

pub fn handle_key_event(app: &mut App, key: KeyEvent) {
  let ctrl = key.modifiers.contains(KeyModifiers::CONTROL);
  if ctrl && key.code == KeyCode::Char('c') {
    app.should_quit = true;
    return;
  }

  if ctrl && key.code == KeyCode::Char('t') {
    app.next_theme();
    return;
  }

  if app.mode == AppMode::SignedOut {
    handle_signed_out_key(app, key);
    return;
  }

  if ctrl {
    match key.code {
      KeyCode::Char('p') => app.toggle_provider(),
      KeyCode::Char('a') => app.toggle_autopilot(),
      KeyCode::Char('l') => app.end_session(),
      _ => {}
    }
    return;
  }

  // Overlays take every key while open.
  if app.confirm.is_some() {
    handle_confirm_key(app, key);
  } else if app.editor.is_some() {
    handle_editor_key(app, key);
  } else if app.detail.is_some() {
    handle_detail_key(app, key);
  } else if app.tab == Tab::Posts {
    handle_posts_key(app, key);
  } else {
    handle_videos_key(app, key);
  }
}

fn handle_signed_out_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Enter => app.start_session(),
    KeyCode::Char('q') | KeyCode::Esc => app.should_quit = true,
    _ => {}
  }
}

fn handle_confirm_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => app.answer_confirmation(true),
    KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => app.answer_confirmation(false),
    _ => {}
  }
}

fn handle_editor_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Esc => app.cancel_edit(),
    KeyCode::Enter => app.save_edit(),
    _ => {
      let Some(editor) = app.editor.as_mut() else { return };
      match key.code {
        KeyCode::Tab | KeyCode::Down => editor.next_field(),
        KeyCode::BackTab | KeyCode::Up => editor.prev_field(),
        KeyCode::Backspace => editor.backspace(),
        KeyCode::Char(c) => editor.push(c),
        _ => {}
      }
    }
  }
}

fn handle_detail_key(app: &mut App, key: KeyEvent) {
  match key.code {
    KeyCode::Esc | KeyCode::Char('q') => app.close_detail(),
    KeyCode::Down | KeyCode::Char('j') => app.scroll_detail(1),
    KeyCode::Up | KeyCode::Char('k') => app.scroll_detail(-1),
    KeyCode::PageDown => app.scroll_detail(10),
    KeyCode::PageUp => app.scroll_detail(-10),
    KeyCode::Char('t') => app.transcribe_detail(),
    KeyCode::Char('g') => app.preview_detail(),
    KeyCode::Char('d') => app.save_preview(PostStatus::Draft),
    KeyCode::Char('p') => app.save_preview(PostStatus::Published),
    _ => {}
  }
}

/// Keys shared by every list tab. Returns false when the key was not handled.
fn handle_list_key(app: &mut App, key: KeyEvent) -> bool {
  match key.code {
    KeyCode::Char('q') => app.should_quit = true,
    KeyCode::Tab => app.next_tab(),
    KeyCode::BackTab => app.prev_tab(),
    KeyCode::Char(c @ '1'..='3') => {
      // '1'..='3' maps to 0..3, within Tab::ALL.
      app.select_tab(Tab::ALL[(c as u8 - b'1') as usize]);
    }
    KeyCode::Down | KeyCode::Char('j') => app.move_cursor(1),
    KeyCode::Up | KeyCode::Char('k') => app.move_cursor(-1),
    KeyCode::PageDown => app.move_cursor(10),
    KeyCode::PageUp => app.move_cursor(-10),
    KeyCode::Char('f') => app.cycle_filter(),
    KeyCode::Esc => app.clear_error(),
    _ => return false,
  }
  true
}

fn handle_videos_key(app: &mut App, key: KeyEvent) {
  if handle_list_key(app, key) {
    return;
  }
  match key.code {
    KeyCode::Enter => app.open_detail(),
    KeyCode::Char(' ') => app.toggle_highlighted(),
    KeyCode::Char('a') => app.toggle_select_all(),
    KeyCode::Char('c') => app.clear_selection(),
    KeyCode::Char('F') => app.set_filter(VideoFilter::All),
    KeyCode::Char('t') => app.bulk_transcribe(),
    KeyCode::Char('T') => app.transcribe_all(),
    KeyCode::Char('g') => app.bulk_generate(),
    KeyCode::Char('m') => app.load_more(),
    KeyCode::Char('i') => app.import_latest(),
    KeyCode::Char('r') => app.trigger_refresh(),
    _ => {}
  }
}

fn handle_posts_key(app: &mut App, key: KeyEvent) {
  if handle_list_key(app, key) {
    return;
  }
  match key.code {
    KeyCode::Char('p') => app.publish_highlighted(),
    KeyCode::Char('u') => app.unpublish_highlighted(),
    KeyCode::Char('e') => app.edit_highlighted(),
    KeyCode::Char('x') | KeyCode::Delete => app.request_delete_highlighted(),
    KeyCode::Char('r') => app.load_posts(),
    _ => {}
  }
}
