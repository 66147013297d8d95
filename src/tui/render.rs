use crate::settings::ThemeSettings;
use crate::tui::state::{App, Dashboard, Form, Screen, TAB_TITLES};
use anyhow::{Result, anyhow};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Layout, Position, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Padding, Paragraph, Wrap},
};
use std::str::FromStr;

const BOX_WIDTH: u16 = 54;
// Border plus padding on each axis
const BOX_VERTICAL_CHROME: u16 = 4;
const BOX_HORIZONTAL_CHROME: u16 = 6;
const FIELD_PREFIX: &str = "> ";

/// Colours used by the renderer. Built once at startup and passed in by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Theme {
    pub title: Color,
    pub text: Color,
    pub accent: Color,
    pub error: Color,
    pub border: Color,
    pub tab: Color,
    pub active_tab: Color,
}

impl Default for Theme {
    fn default() -> Self {
        Theme {
            title: Color::Rgb(0x89, 0xB4, 0xFA),
            text: Color::Rgb(0xCD, 0xD6, 0xF4),
            accent: Color::Rgb(0xF3, 0x8B, 0xA8),
            error: Color::Rgb(0xF3, 0x8B, 0xA8),
            border: Color::Rgb(0xB4, 0xBE, 0xFE),
            tab: Color::Rgb(0xB4, 0xBE, 0xFE),
            active_tab: Color::Rgb(0xF3, 0x8B, 0xA8),
        }
    }
}

impl Theme {
    pub fn from_settings(settings: &ThemeSettings) -> Result<Theme> {
        Ok(Theme {
            title: parse_color(&settings.title)?,
            text: parse_color(&settings.text)?,
            accent: parse_color(&settings.accent)?,
            error: parse_color(&settings.error)?,
            border: parse_color(&settings.border)?,
            tab: parse_color(&settings.tab)?,
            active_tab: parse_color(&settings.active_tab)?,
        })
    }

    fn title_style(&self) -> Style {
        Style::default().fg(self.title).add_modifier(Modifier::BOLD)
    }

    fn text_style(&self) -> Style {
        Style::default().fg(self.text)
    }

    fn button_style(&self) -> Style {
        Style::default().fg(self.accent).add_modifier(Modifier::BOLD)
    }

    fn error_style(&self) -> Style {
        Style::default().fg(self.error).add_modifier(Modifier::BOLD)
    }

    fn tab_style(&self, active: bool) -> Style {
        let color = if active { self.active_tab } else { self.tab };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}

fn parse_color(value: &str) -> Result<Color> {
    Color::from_str(value).map_err(|_| anyhow!("invalid colour '{}' in theme settings", value))
}

/// Draws the screen held by `app` inside the viewport recorded in it.
pub fn render(f: &mut Frame, app: &App, theme: &Theme) {
    let viewport =
        Rect::new(0, 0, app.viewport.width, app.viewport.height).intersection(f.area());

    match &app.screen {
        Screen::InputForm(form) => render_input_form(f, form, theme, viewport),
        Screen::Connecting(_) => render_connecting(f, theme, viewport),
        Screen::Error { message, .. } => render_error(f, message, theme, viewport),
        Screen::Dashboard(dashboard) => render_dashboard(f, dashboard, theme, viewport),
    }
}

fn app_block(theme: &Theme) -> Block<'static> {
    Block::bordered()
        .border_style(Style::default().fg(theme.border))
        .padding(Padding::new(2, 2, 1, 1))
}

/// Width available to text inside the box drawn in `viewport`.
fn content_width(viewport: Rect) -> u16 {
    BOX_WIDTH
        .min(viewport.width)
        .saturating_sub(BOX_HORIZONTAL_CHROME)
}

fn saturating_u16(count: usize) -> u16 {
    u16::try_from(count).unwrap_or(u16::MAX)
}

/// Renders `body` and then `footer` in the application border, centred in
/// `viewport`. The footer keeps its own rows when the body has to be clipped.
/// Returns the area the body was drawn in.
fn render_boxed(
    f: &mut Frame,
    body: Vec<Line<'_>>,
    footer: Vec<Line<'_>>,
    theme: &Theme,
    viewport: Rect,
) -> Rect {
    let body = Paragraph::new(body)
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: false });
    let footer_height = saturating_u16(footer.len());
    let height = body
        .line_count(content_width(viewport))
        .saturating_add(footer.len())
        .saturating_add(BOX_VERTICAL_CHROME.into());
    let area = centered(viewport, BOX_WIDTH, saturating_u16(height));

    let block = app_block(theme);
    let inner = block.inner(area);
    f.render_widget(block, area);

    let [body_area, footer_area] =
        Layout::vertical([Constraint::Min(0), Constraint::Length(footer_height)]).areas(inner);
    f.render_widget(body, body_area);
    f.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center),
        footer_area,
    );
    body_area
}

fn centered(area: Rect, width: u16, height: u16) -> Rect {
    let width = width.min(area.width);
    let height = height.min(area.height);
    Rect::new(
        area.x + (area.width - width) / 2,
        area.y + (area.height - height) / 2,
        width,
        height,
    )
}

fn render_input_form(f: &mut Frame, form: &Form, theme: &Theme, viewport: Rect) {
    let header = vec![
        Line::styled("Configure PostgreSQL", theme.title_style()),
        Line::default(),
    ];
    let header_rows = Paragraph::new(header.clone())
        .wrap(Wrap { trim: false })
        .line_count(content_width(viewport));
    // Fields never wrap: long values scroll horizontally instead
    let field_width = usize::from(content_width(viewport)).saturating_sub(FIELD_PREFIX.len());

    let mut lines = header;
    let mut cursor_column = 0;
    for (i, field) in form.fields().iter().enumerate() {
        let focused = i == form.focused();
        let prefix_style = if focused {
            Style::default().fg(theme.accent)
        } else {
            theme.text_style()
        };
        let content = if field.value().is_empty() {
            Span::styled(
                field.placeholder().chars().take(field_width).collect::<String>(),
                Style::default()
                    .fg(Color::DarkGray)
                    .add_modifier(Modifier::ITALIC),
            )
        } else {
            let (visible, column) = field.scrolled(field_width);
            if focused {
                cursor_column = column;
            }
            Span::styled(visible, theme.text_style())
        };
        let prefix = if focused { FIELD_PREFIX } else { "  " };
        lines.push(
            Line::from(vec![Span::styled(prefix, prefix_style), content])
                .alignment(Alignment::Left),
        );
    }

    let footer = vec![
        Line::default(),
        Line::styled("Connect (Press Enter)", theme.button_style()),
    ];
    let body = render_boxed(f, lines, footer, theme, viewport);

    let cursor = Position::new(
        body.x
            .saturating_add(saturating_u16(FIELD_PREFIX.len()))
            .saturating_add(saturating_u16(cursor_column)),
        body.y
            .saturating_add(saturating_u16(header_rows))
            .saturating_add(saturating_u16(form.focused())),
    );
    if body.contains(cursor) {
        f.set_cursor_position(cursor);
    }
}

fn render_connecting(f: &mut Frame, theme: &Theme, viewport: Rect) {
    let body = vec![Line::styled(
        "Loading database information...",
        theme.text_style(),
    )];
    let footer = vec![
        Line::default(),
        Line::styled(
            "Press Ctrl+C to quit",
            Style::default().add_modifier(Modifier::ITALIC),
        ),
    ];
    render_boxed(f, body, footer, theme, viewport);
}

fn render_error(f: &mut Frame, message: &str, theme: &Theme, viewport: Rect) {
    let body = vec![Line::from(vec![
        Span::styled("Error: ", theme.error_style()),
        Span::styled(message, theme.text_style()),
    ])];
    let footer = vec![
        Line::default(),
        Line::styled("Press Enter to retry", theme.button_style()),
    ];
    render_boxed(f, body, footer, theme, viewport);
}

fn render_dashboard(f: &mut Frame, dashboard: &Dashboard, theme: &Theme, viewport: Rect) {
    let mut tabs = Vec::with_capacity(TAB_TITLES.len() * 2);
    for (i, title) in TAB_TITLES.iter().enumerate() {
        if i > 0 {
            tabs.push(Span::raw(" "));
        }
        tabs.push(Span::styled(
            format!(" {} ", title),
            theme.tab_style(i == dashboard.selected_tab()),
        ));
    }

    let mut lines = vec![
        Line::from(tabs),
        Line::default(),
        Line::styled("Tables:", theme.text_style()),
    ];
    for table in &dashboard.tables {
        let count = dashboard.row_counts.get(table).copied().unwrap_or_default();
        lines.push(Line::raw(format!("{}: {} rows", table, count)));
    }
    let footer = vec![
        Line::default(),
        Line::styled("Press q or Ctrl+C to quit", theme.button_style()),
    ];

    render_boxed(f, lines, footer, theme, viewport);
}
