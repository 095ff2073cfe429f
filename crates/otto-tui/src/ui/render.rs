use otto_core::RouteDecision;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::Style,
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::{App, AppState, LoginFocus};

use super::dashboard;
use super::styles;

/// Width of the visible part of the login input fields
const FIELD_WIDTH: usize = 24;

const LOGO: [&str; 3] = [
    "          ╔═╗╔╦╗╔╦╗╔═╗",
    "          ║ ║ ║  ║ ║ ║",
    "          ╚═╝ ╩  ╩ ╚═╝",
];

pub fn render(frame: &mut Frame, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Title bar
            Constraint::Min(10),   // Main content
            Constraint::Length(2), // Status bar
        ])
        .split(frame.area());

    let route = app.route();

    render_title_bar(frame, app, chunks[0]);
    match route {
        RouteDecision::Loading => render_loading(frame, chunks[1]),
        RouteDecision::Render => dashboard::render(frame, app, chunks[1]),
        // The login overlay below covers the main area
        RouteDecision::RedirectToLogin => {}
    }
    render_status_bar(frame, app, route, chunks[2]);

    if route == RouteDecision::RedirectToLogin {
        render_login_overlay(frame, app);
    }

    // Render overlays
    if matches!(app.state, AppState::ShowingHelp) {
        render_help_overlay(frame);
    }

    if matches!(app.state, AppState::ConfirmingQuit) {
        render_quit_overlay(frame);
    }
}

fn render_title_bar(frame: &mut Frame, app: &App, area: Rect) {
    let title = "  Otto";
    let identity = app
        .current_user()
        .map(|user| format!("{}  ", user.display_name()))
        .unwrap_or_default();
    let help_hint = "[?] Help";

    let title_line = Line::from(vec![
        Span::styled(title, styles::title_style()),
        Span::raw(" ".repeat(
            (area.width as usize).saturating_sub(title.len() + identity.chars().count() + help_hint.len() + 2),
        )),
        Span::styled(identity, styles::highlight_style()),
        Span::styled(help_hint, styles::muted_style()),
    ]);

    let block = Block::default()
        .borders(Borders::BOTTOM)
        .border_style(styles::muted_style());

    let paragraph = Paragraph::new(title_line).block(block);
    frame.render_widget(paragraph, area);
}

fn render_loading(frame: &mut Frame, area: Rect) {
    let inner = centered_rect_fixed(40, 1, area);
    let paragraph = Paragraph::new(Line::from(Span::styled(
        "Loading authentication status...",
        styles::muted_style(),
    )))
    .centered();
    frame.render_widget(paragraph, inner);
}

fn render_status_bar(frame: &mut Frame, app: &App, route: RouteDecision, area: Rect) {
    let shortcuts = match route {
        RouteDecision::Render => "[r]efresh | ←/→ turn | [l]ogout | [q]uit",
        RouteDecision::RedirectToLogin => "[Tab] next field | [Enter] select | [Esc] quit",
        RouteDecision::Loading => "[q]uit",
    };

    let left_text = match app.status_message {
        Some(ref msg) => format!(" {} ", msg),
        None => format!(" {} ", app.config.base_url),
    };
    let right_text = format!(" {} ", shortcuts);

    let width = area.width as usize;
    let padding_len = width
        .saturating_sub(left_text.chars().count())
        .saturating_sub(right_text.chars().count());
    let status_line = Line::from(vec![
        Span::styled(left_text, styles::muted_style()),
        Span::raw(" ".repeat(padding_len)),
        Span::styled(right_text, styles::muted_style()),
    ]);
    let paragraph = Paragraph::new(status_line).style(styles::status_bar_style());
    frame.render_widget(paragraph, area);
}

fn logo_lines() -> Vec<Line<'static>> {
    LOGO.iter()
        .map(|row| Line::from(Span::styled(*row, styles::title_style())))
        .collect()
}

/// Show the tail of `value` so the cursor end stays visible
fn field_tail(value: &str) -> String {
    let len = value.chars().count();
    value.chars().skip(len.saturating_sub(FIELD_WIDTH)).collect()
}

fn input_line<'a>(label: &'a str, value: String, focused: bool) -> Line<'a> {
    let style = if focused {
        styles::selected_style()
    } else {
        styles::text_style()
    };
    let cursor = if focused { "▌" } else { "" };
    Line::from(vec![
        Span::raw("  "),
        Span::styled(label, styles::muted_style()),
        Span::styled(" [", styles::muted_style()),
        Span::styled(format!("{:<width$}{}", value, cursor, width = FIELD_WIDTH), style),
        Span::styled("]", styles::muted_style()),
    ])
}

fn render_login_overlay(frame: &mut Frame, app: &App) {
    let message = app.login_message();
    let height = if message.is_some() || app.is_signing_in() { 13 } else { 11 };
    let area = centered_rect_fixed(46, height, frame.area());

    // Clear the area
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));

    lines.push(input_line(
        "Email:   ",
        field_tail(&app.login_email),
        app.login_focus == LoginFocus::Email,
    ));
    let masked = "*".repeat(app.login_password.chars().count().min(FIELD_WIDTH));
    lines.push(input_line(
        "Password:",
        masked,
        app.login_focus == LoginFocus::Password,
    ));

    // Login button (centered)
    lines.push(Line::from(""));
    let button_focused = app.login_focus == LoginFocus::Button;
    let (label, style) = if button_focused {
        (" ▶ Login ◀ ", styles::selected_style())
    } else {
        ("   Login   ", styles::text_style())
    };
    lines.push(Line::from(vec![
        Span::raw("               ["),
        Span::styled(label, style),
        Span::raw("]"),
    ]));

    if app.is_signing_in() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(" Signing in...", styles::highlight_style())));
    } else if let Some(error) = message {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled(format!(" {}", error), styles::error_style())));
    }

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
        .style(Style::default());

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn help_row(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("  {:<10}", key), styles::help_key_style()),
        Span::styled(desc, styles::help_desc_style()),
    ])
}

fn render_help_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 17, frame.area());
    frame.render_widget(Clear, area);

    let version = env!("CARGO_PKG_VERSION");

    let mut lines = logo_lines();
    lines.push(Line::from(Span::styled(
        format!("            version {}", version),
        styles::muted_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(" Dashboard", styles::highlight_style())));
    lines.push(help_row("←/→", "Previous/next turn"));
    lines.push(help_row("r", "Refresh data"));
    lines.push(help_row("A", "Toggle route logging (admin)"));
    lines.push(help_row("l", "Sign out"));
    lines.push(help_row("q", "Quit"));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("     Press ", styles::muted_style()),
        Span::styled("?", styles::help_key_style()),
        Span::styled(" or ", styles::muted_style()),
        Span::styled("Esc", styles::help_key_style()),
        Span::styled(" to close", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

/// Create a centered rectangle with fixed dimensions
pub(crate) fn centered_rect_fixed(width: u16, height: u16, r: Rect) -> Rect {
    let x = r.x + (r.width.saturating_sub(width)) / 2;
    let y = r.y + (r.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(r.width), height.min(r.height))
}

fn render_quit_overlay(frame: &mut Frame) {
    let area = centered_rect_fixed(46, 9, frame.area());
    frame.render_widget(Clear, area);

    let mut lines = logo_lines();
    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        "   Are you sure you want to quit?",
        styles::highlight_style(),
    )));
    lines.push(Line::from(""));
    lines.push(Line::from(vec![
        Span::styled("   Press ", styles::muted_style()),
        Span::styled("[Y]", styles::help_key_style()),
        Span::styled(" to quit, ", styles::muted_style()),
        Span::styled("[N]", styles::help_key_style()),
        Span::styled(" to cancel", styles::muted_style()),
    ]));

    let block = Block::default()
        .borders(Borders::ALL)
        .border_style(styles::border_style(true));

    frame.render_widget(Paragraph::new(lines).block(block), area);
}
