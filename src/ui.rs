use chrono::DateTime;
use ratatui::{
  Frame,
  layout::{Alignment, Constraint, Flex, Layout, Rect},
  style::{Modifier, Style, Stylize},
  text::{Line, Span},
  widgets::{Block, BorderType, Clear, List, ListItem, Padding, Paragraph, Tabs, Wrap},
};
use unicode_width::UnicodeWidthChar;

use crate::app::{App, AppMode, DetailView, Tab};
use crate::model::{AudioStatus, Category, Post, PostStatus, TranscriptStatus, VideoRecord};
use crate::posts::{EditField, PostEditor};
use crate::theme::Theme;

// --- Helpers ---

/// Truncate to `max_width` display columns, appending "…" if truncated.
fn truncate_str(s: &str, max_width: usize) -> String {
  if str_width(s) <= max_width {
    return s.to_string();
  }
  let mut width = 0;
  let mut out = String::new();
  for c in s.chars() {
    let w = c.width().unwrap_or(0);
    if width + w + 1 > max_width {
      break;
    }
    width += w;
    out.push(c);
  }
  out.push('…');
  out
}

fn str_width(s: &str) -> usize {
  s.chars().map(|c| c.width().unwrap_or(0)).sum()
}

/// `h:mm:ss` or `m:ss`.
fn format_duration(secs: u64) -> String {
  let (h, m, s) = (secs / 3600, (secs % 3600) / 60, secs % 60);
  if h > 0 { format!("{}:{:02}:{:02}", h, m, s) } else { format!("{}:{:02}", m, s) }
}

/// Calendar date of an RFC 3339 timestamp; anything else is shown as-is, cut to the date part.
fn format_date(raw: &str) -> String {
  match DateTime::parse_from_rfc3339(raw) {
    Ok(dt) => dt.format("%Y-%m-%d").to_string(),
    Err(_) => raw.chars().take(10).collect(),
  }
}

fn centered(area: Rect, width_pct: u16, height: Constraint) -> Rect {
  let [area] = Layout::horizontal([Constraint::Percentage(width_pct)]).flex(Flex::Center).areas(area);
  let [area] = Layout::vertical([height]).flex(Flex::Center).areas(area);
  area
}

fn bordered(theme: &Theme) -> Block<'static> {
  Block::bordered().border_type(BorderType::Rounded).border_style(Style::default().fg(theme.border))
}

/// Title on the left, metadata spans pushed to the right edge.
fn spread_line(title: String, title_style: Style, right: Vec<Span<'static>>, width: usize) -> Line<'static> {
  let right_w: usize = right.iter().map(|s| str_width(&s.content)).sum();
  let title = truncate_str(&title, width.saturating_sub(right_w + 2));
  let gap = width.saturating_sub(str_width(&title) + right_w);
  let mut spans = vec![Span::styled(title, title_style), Span::raw(" ".repeat(gap))];
  spans.extend(right);
  Line::from(spans)
}

// --- UI Rendering ---

pub fn ui(frame: &mut Frame, app: &mut App) {
  let theme = app.theme();
  frame.render_widget(Block::default().style(Style::default().bg(theme.bg)), frame.area());

  let [header_area, tabs_area, toolbar_area, main_area, status_area, footer_area] = Layout::vertical([
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Length(1),
    Constraint::Min(3),
    Constraint::Length(1),
    Constraint::Length(1),
  ])
  .areas(frame.area());

  render_header(frame, app, header_area);
  if app.mode == AppMode::SignedOut {
    render_welcome(frame, app, Rect::union(tabs_area, main_area));
  } else {
    render_tabs(frame, app, tabs_area);
    render_toolbar(frame, app, toolbar_area);
    match app.tab {
      Tab::Posts => render_posts(frame, app, main_area),
      Tab::Videos(category) => render_videos(frame, app, category, main_area),
    }
  }
  render_status(frame, app, status_area);
  render_footer(frame, app, footer_area);

  if let Some(detail) = &app.detail {
    render_detail(frame, theme, detail);
  }
  if let Some(editor) = &app.editor {
    render_editor(frame, theme, editor);
  }
  if app.confirm.is_some() {
    render_confirm(frame, app);
  }
}

fn render_header(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let left = Line::from(Span::styled(" ▶ tubeblog ", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)));
  frame.render_widget(left, area);

  let autopilot = match app.autopilot {
    Some(true) => "autopilot on  ",
    Some(false) => "autopilot off  ",
    None => "",
  };
  let polling = if app.poller_running() { "● polling  " } else { "" };
  let provider = app.config.transcription_provider.label();
  let right_text = format!("{}{}{}  v{} ", polling, autopilot, provider, env!("CARGO_PKG_VERSION"));
  let width = str_width(&right_text) as u16;
  let right = Line::from(Span::styled(right_text, Style::default().fg(theme.muted)));
  let right_area = Rect { x: area.x + area.width.saturating_sub(width), width: width.min(area.width), ..area };
  frame.render_widget(right, right_area);
}

fn render_welcome(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let text = vec![
    Line::from(""),
    Line::from(Span::styled("▶  tubeblog", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
    Line::from(""),
    Line::from(Span::styled("Turn channel videos into blog posts.", Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(Span::styled(format!("Backend  {}", app.config.api_url()), Style::default().fg(theme.muted))),
    Line::from(Span::styled(format!("Config   {}", app.config.display_path()), Style::default().fg(theme.muted))),
    Line::from(""),
    Line::from(Span::styled("Press Enter to sign in.", Style::default().fg(theme.fg))),
  ];
  let paragraph = Paragraph::new(text).alignment(Alignment::Center).block(bordered(theme));
  frame.render_widget(paragraph, area);
}

fn render_tabs(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let titles: Vec<Line> = Tab::ALL
    .iter()
    .enumerate()
    .map(|(i, tab)| {
      let count = match tab {
        Tab::Posts => app.posts.counts().total,
        Tab::Videos(category) => app.catalog.videos(*category).len(),
      };
      Line::from(format!("{} {} ({})", i + 1, tab.label(), count))
    })
    .collect();
  let tabs = Tabs::new(titles)
    .select(app.tab.index())
    .style(Style::default().fg(theme.muted))
    .highlight_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .divider(Span::styled("│", Style::default().fg(theme.border)));
  frame.render_widget(tabs, area);
}

fn render_toolbar(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let muted = Style::default().fg(theme.muted);
  let value = Style::default().fg(theme.fg);
  let sep = || Span::styled("  │  ", Style::default().fg(theme.border));

  let spans = match app.tab {
    Tab::Videos(category) => {
      let stats = app.catalog.stats(category);
      let cursor = &app.cursors[category.index()];
      let paging = if cursor.is_busy() {
        "loading…"
      } else if cursor.next_token().is_some() {
        "more available"
      } else {
        ""
      };
      let mut spans = vec![
        Span::styled(" filter ", muted),
        Span::styled(app.selection.filter(category).label(), value),
        sep(),
        Span::styled(format!("{} selected", app.selection.count(category)), value),
        sep(),
        Span::styled(
          format!("{} total · {} transcribed · {} blogged", stats.total, stats.transcribed, stats.blogged),
          muted,
        ),
      ];
      if !paging.is_empty() {
        spans.push(sep());
        spans.push(Span::styled(paging, Style::default().fg(theme.status)));
      }
      spans
    }
    Tab::Posts => {
      let counts = app.posts.counts();
      vec![
        Span::styled(" filter ", muted),
        Span::styled(app.posts.filter().label(), value),
        sep(),
        Span::styled(
          format!(
            "{} total · {} draft · {} published · {} scheduled",
            counts.total, counts.draft, counts.published, counts.scheduled
          ),
          muted,
        ),
      ]
    }
  };
  frame.render_widget(Line::from(spans), area);
}

/// Pipeline badges for one video, most advanced stage first.
fn video_badges(video: &VideoRecord, theme: &Theme) -> Vec<Span<'static>> {
  let mut badges = Vec::new();
  match video.transcript_status {
    TranscriptStatus::Completed if video.has_transcript() => {
      badges.push(Span::styled("✓ transcript", Style::default().fg(theme.success)));
    }
    TranscriptStatus::Processing => badges.push(Span::styled("⏳ transcribing", Style::default().fg(theme.status))),
    TranscriptStatus::Failed => badges.push(Span::styled("✗ transcript", Style::default().fg(theme.error))),
    _ if video.audio_status == AudioStatus::Processing => {
      badges.push(Span::styled("⏳ audio", Style::default().fg(theme.status)));
    }
    _ => {}
  }
  if video.blog_created {
    badges.push(Span::raw("  "));
    badges.push(Span::styled("✎ blog", Style::default().fg(theme.accent)));
  }
  badges
}

fn render_videos(frame: &mut Frame, app: &mut App, category: Category, area: Rect) {
  let theme = app.theme();
  // Borders, highlight symbol and checkbox.
  let inner_w = area.width.saturating_sub(8) as usize;
  let selected_row = app.list_states[Tab::Videos(category).index()].selected();

  let items: Vec<ListItem> = app
    .visible_videos(category)
    .into_iter()
    .enumerate()
    .map(|(i, video)| {
      let is_highlighted = Some(i) == selected_row;
      let fg = if is_highlighted { theme.highlight_fg } else { theme.fg };
      let bg = if is_highlighted {
        theme.highlight_bg
      } else if i % 2 == 1 {
        theme.stripe_bg
      } else {
        theme.bg
      };
      let checkbox = if app.selection.is_selected(category, &video.id) { "[x] " } else { "[ ] " };

      let mut right = video_badges(video, theme);
      right.push(Span::styled(format!("  {:>8}", format_duration(video.duration)), Style::default().fg(theme.muted)));
      if let Some(date) = &video.published_at {
        right.push(Span::styled(format!("  {}", format_date(date)), Style::default().fg(theme.muted)));
      }
      let mut line = spread_line(video.title.clone(), Style::default().fg(fg), right, inner_w);
      line.spans.insert(0, Span::styled(checkbox, Style::default().fg(theme.accent)));
      ListItem::new(line).bg(bg)
    })
    .collect();

  let empty = items.is_empty();
  let title = if app.catalog.is_loaded() {
    format!(" {} ", category.label())
  } else {
    format!(" {} (loading…) ", category.label())
  };
  let list = List::new(items)
    .block(bordered(theme).title(title).title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));

  frame.render_stateful_widget(list, area, &mut app.list_states[Tab::Videos(category).index()]);

  if empty && app.catalog.is_loaded() {
    let hint = Span::styled("No videos here. Press m to load from the channel.", Style::default().fg(theme.muted));
    let hint = Paragraph::new(hint).alignment(Alignment::Center);
    let [hint_area] = Layout::vertical([Constraint::Length(1)]).flex(Flex::Center).areas(area);
    frame.render_widget(hint, hint_area);
  }
}

fn post_status_style(status: PostStatus, theme: &Theme) -> Style {
  match status {
    PostStatus::Published => Style::default().fg(theme.success),
    PostStatus::Scheduled => Style::default().fg(theme.status),
    PostStatus::Draft => Style::default().fg(theme.muted),
  }
}

fn post_item(i: usize, post: &Post, highlighted: bool, theme: &Theme, width: usize) -> ListItem<'static> {
  let fg = if highlighted { theme.highlight_fg } else { theme.fg };
  let bg = if highlighted {
    theme.highlight_bg
  } else if i % 2 == 1 {
    theme.stripe_bg
  } else {
    theme.bg
  };
  let mut right = vec![
    Span::styled(post.category.clone(), Style::default().fg(theme.muted)),
    Span::raw("  "),
    Span::styled(format!("{:<9}", post.status.label()), post_status_style(post.status, theme)),
  ];
  if let Some(date) = &post.date {
    right.push(Span::styled(format!("  {}", format_date(date)), Style::default().fg(theme.muted)));
  }
  ListItem::new(spread_line(post.title.clone(), Style::default().fg(fg), right, width)).bg(bg)
}

fn render_posts(frame: &mut Frame, app: &mut App, area: Rect) {
  let theme = app.theme();
  let inner_w = area.width.saturating_sub(4) as usize;
  let selected_row = app.list_states[Tab::Posts.index()].selected();
  let items: Vec<ListItem> = app
    .posts
    .visible()
    .into_iter()
    .enumerate()
    .map(|(i, post)| post_item(i, post, Some(i) == selected_row, theme, inner_w))
    .collect();

  let title = if app.posts.is_loaded() { " Posts ".to_string() } else { " Posts (loading…) ".to_string() };
  let list = List::new(items)
    .block(bordered(theme).title(title).title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)))
    .highlight_symbol("▶ ")
    .highlight_style(Style::default().fg(theme.highlight_fg).bg(theme.highlight_bg).add_modifier(Modifier::BOLD));
  frame.render_stateful_widget(list, area, &mut app.list_states[Tab::Posts.index()]);
}

fn transcript_label(video: &VideoRecord) -> &'static str {
  match (video.transcript_status, video.audio_status) {
    (TranscriptStatus::Completed, _) => "completed",
    (TranscriptStatus::Processing, _) => "transcribing",
    (TranscriptStatus::Failed, _) => "failed",
    (TranscriptStatus::None, AudioStatus::Processing) => "extracting audio",
    (TranscriptStatus::None, _) => "none",
  }
}

fn render_detail(frame: &mut Frame, theme: &Theme, detail: &DetailView) {
  let area = centered(frame.area(), 80, Constraint::Percentage(80));
  frame.render_widget(Clear, area);

  let video = &detail.video;
  let label = Style::default().fg(theme.muted);
  let value = Style::default().fg(theme.fg);
  let heading = Style::default().fg(theme.accent).add_modifier(Modifier::BOLD);
  let field = |name: &'static str, text: String| Line::from(vec![Span::styled(name, label), Span::styled(text, value)]);

  let mut lines = vec![
    field("Category    ", video.category().label().to_string()),
    field("Duration    ", format_duration(video.duration)),
    field("Published   ", video.published_at.as_deref().map(format_date).unwrap_or_else(|| "-".to_string())),
    field("Transcript  ", transcript_label(video).to_string()),
    field("Blog post   ", if video.blog_created { "created" } else { "none" }.to_string()),
    field("Link        ", format!("https://youtu.be/{}", video.id)),
    Line::from(""),
  ];
  if let Some(description) = video.description.as_deref().filter(|d| !d.trim().is_empty()) {
    lines.push(Line::from(Span::styled("Description", heading)));
    lines.extend(description.lines().map(|l| Line::from(Span::styled(l.to_string(), value))));
    lines.push(Line::from(""));
  }

  if let Some(preview) = &detail.preview {
    lines.push(Line::from(Span::styled("Generated post", heading)));
    lines.push(Line::from(Span::styled(preview.title.clone(), value.add_modifier(Modifier::BOLD))));
    if let Some(meta) = &preview.meta {
      lines.push(Line::from(Span::styled(meta.clone(), label.add_modifier(Modifier::ITALIC))));
    }
    lines.push(Line::from(""));
    lines.extend(preview.body.lines().map(|l| Line::from(Span::styled(l.to_string(), value))));
    lines.push(Line::from(""));
  }

  lines.push(Line::from(Span::styled("Transcript", heading)));
  match video.transcript.as_deref().filter(|t| !t.trim().is_empty()) {
    Some(text) => lines.extend(text.lines().map(|l| Line::from(Span::styled(l.to_string(), value)))),
    None => lines.push(Line::from(Span::styled("No transcript yet.", label))),
  }

  let title = format!(" {} ", truncate_str(&video.title, area.width.saturating_sub(6) as usize));
  let block = bordered(theme)
    .title(title)
    .title_style(heading)
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1))
    .style(Style::default().bg(theme.bg));
  let paragraph = Paragraph::new(lines).block(block).wrap(Wrap { trim: false }).scroll((detail.scroll, 0));
  frame.render_widget(paragraph, area);
}

fn render_editor(frame: &mut Frame, theme: &Theme, editor: &PostEditor) {
  let area = centered(frame.area(), 70, Constraint::Length(EditField::ALL.len() as u16 * 2 + 3));
  frame.render_widget(Clear, area);

  let width = area.width.saturating_sub(4) as usize;
  let mut text = Vec::new();
  for field in EditField::ALL {
    let focused = field == editor.focus();
    let label_style = if focused { Style::default().fg(theme.accent).bold() } else { Style::default().fg(theme.muted) };
    text.push(Line::from(Span::styled(field.label(), label_style)));
    let mut value = truncate_str(editor.value(field), width.saturating_sub(1));
    if focused {
      value.push('▏');
    }
    text.push(Line::from(Span::styled(value, Style::default().fg(theme.fg))));
  }
  let block = bordered(theme)
    .title(" Edit post ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1))
    .style(Style::default().bg(theme.bg));
  frame.render_widget(Paragraph::new(text).block(block), area);
}

fn render_confirm(frame: &mut Frame, app: &App) {
  let Some(confirm) = &app.confirm else { return };
  let theme = app.theme();
  let area = centered(frame.area(), 50, Constraint::Length(6));
  frame.render_widget(Clear, area);

  let text = vec![
    Line::from(Span::styled(confirm.message.clone(), Style::default().fg(theme.fg))),
    Line::from(""),
    Line::from(vec![
      Span::styled(" y ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(" Yes   ", Style::default().fg(theme.muted)),
      Span::styled(" n ", Style::default().fg(theme.key_fg).bg(theme.key_bg)),
      Span::styled(" No ", Style::default().fg(theme.muted)),
    ]),
  ];
  let block = bordered(theme)
    .title(" Confirm ")
    .title_style(Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
    .border_style(Style::default().fg(theme.accent))
    .padding(Padding::horizontal(1))
    .style(Style::default().bg(theme.bg));
  frame.render_widget(Paragraph::new(text).alignment(Alignment::Center).wrap(Wrap { trim: true }).block(block), area);
}

fn render_status(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let (text, style) = if let Some(msg) = &app.status_message {
    (format!(" ⏳ {}", msg), Style::default().fg(theme.status))
  } else if let Some(err) = &app.last_error {
    (format!(" ⚠  {}", err), Style::default().fg(theme.error))
  } else if let Some(info) = &app.info_message {
    (format!(" ✓ {}", info), Style::default().fg(theme.success))
  } else {
    (" Ready".to_string(), Style::default().fg(theme.muted))
  };
  frame.render_widget(Paragraph::new(text).style(style), area);
}

fn render_footer(frame: &mut Frame, app: &App, area: Rect) {
  let theme = app.theme();
  let keys: Vec<(&str, &str)> = if app.confirm.is_some() {
    vec![("y", "Yes"), ("n", "No")]
  } else if app.editor.is_some() {
    vec![("Tab", "Next field"), ("Enter", "Save"), ("Esc", "Cancel")]
  } else if app.detail.is_some() {
    let mut k = vec![("j/k", "Scroll"), ("t", "Transcribe"), ("g", "Generate")];
    if app.detail.as_ref().is_some_and(|d| d.preview.is_some()) {
      k.push(("d", "Save draft"));
      k.push(("p", "Publish"));
    }
    k.push(("Esc", "Close"));
    k
  } else {
    match (app.mode, app.tab) {
      (AppMode::SignedOut, _) => vec![("Enter", "Sign in"), ("^t", "Theme"), ("q", "Quit")],
      (AppMode::Browsing, Tab::Posts) => vec![
        ("1-3", "Tabs"),
        ("p", "Publish"),
        ("u", "Unpublish"),
        ("e", "Edit"),
        ("x", "Delete"),
        ("f", "Filter"),
        ("r", "Reload"),
        ("^l", "Sign out"),
      ],
      (AppMode::Browsing, Tab::Videos(_)) => vec![
        ("1-3", "Tabs"),
        ("Space", "Select"),
        ("a", "All"),
        ("f", "Filter"),
        ("t", "Transcribe"),
        ("T", "Transcribe all"),
        ("g", "Generate"),
        ("m", "More"),
        ("i", "Import"),
        ("Enter", "Open"),
        ("^p", "Provider"),
        ("^a", "Autopilot"),
      ],
    }
  };

  let spans: Vec<Span> = keys
    .iter()
    .enumerate()
    .flat_map(|(i, (key, action))| {
      let mut s = vec![
        Span::styled(format!(" {} ", key), Style::default().fg(theme.key_fg).bg(theme.key_bg)),
        Span::styled(format!(" {} ", action), Style::default().fg(theme.muted)),
      ];
      if i < keys.len() - 1 {
        s.push(Span::raw(" "));
      }
      s
    })
    .collect();

  frame.render_widget(Line::from(spans), area);

  let theme_label = format!("{} ", theme.name);
  let right = Line::from(Span::styled(&theme_label, Style::default().fg(theme.muted)));
  let right_area =
    Rect { x: area.x + area.width.saturating_sub(theme_label.len() as u16), width: theme_label.len() as u16, ..area };
  frame.render_widget(right, right_area);
}
