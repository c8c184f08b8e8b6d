use ratatui::style::Color;

pub struct Theme {
  pub name: &'static str,
  pub bg: Color,
  pub fg: Color,
  pub accent: Color,
  pub muted: Color,
  pub border: Color,
  pub highlight_fg: Color,
  pub highlight_bg: Color,
  pub stripe_bg: Color,
  pub status: Color,
  pub error: Color,
  pub success: Color,
  pub key_fg: Color,
  pub key_bg: Color,
}

pub static THEMES: [Theme; 3] = [
  Theme {
    name: "Pastel",
    bg: Color::Rgb(30, 30, 46),
    fg: Color::Rgb(205, 214, 244),
    accent: Color::Rgb(245, 194, 231),
    muted: Color::Rgb(127, 132, 156),
    border: Color::Rgb(88, 91, 112),
    highlight_fg: Color::Rgb(30, 30, 46),
    highlight_bg: Color::Rgb(203, 166, 247),
    stripe_bg: Color::Rgb(36, 36, 54),
    status: Color::Rgb(137, 220, 235),
    error: Color::Rgb(243, 139, 168),
    success: Color::Rgb(166, 227, 161),
    key_fg: Color::Rgb(30, 30, 46),
    key_bg: Color::Rgb(180, 190, 254),
  },
  Theme {
    name: "Paper",
    bg: Color::Rgb(250, 244, 237),
    fg: Color::Rgb(87, 82, 121),
    accent: Color::Rgb(215, 130, 126),
    muted: Color::Rgb(152, 147, 165),
    border: Color::Rgb(206, 202, 205),
    highlight_fg: Color::Rgb(250, 244, 237),
    highlight_bg: Color::Rgb(144, 122, 169),
    stripe_bg: Color::Rgb(242, 233, 225),
    status: Color::Rgb(40, 105, 131),
    error: Color::Rgb(180, 99, 122),
    success: Color::Rgb(86, 148, 159),
    key_fg: Color::Rgb(250, 244, 237),
    key_bg: Color::Rgb(87, 82, 121),
  },
  Theme {
    name: "Terminal",
    bg: Color::Reset,
    fg: Color::White,
    accent: Color::Magenta,
    muted: Color::DarkGray,
    border: Color::Gray,
    highlight_fg: Color::Black,
    highlight_bg: Color::Cyan,
    stripe_bg: Color::Reset,
    status: Color::Cyan,
    error: Color::Red,
    success: Color::Green,
    key_fg: Color::Black,
    key_bg: Color::Gray,
  },
];
