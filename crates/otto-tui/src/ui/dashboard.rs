use chrono::{DateTime, Local, Utc};
use otto_core::models::UserProfile;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use crate::app::App;
use crate::ui::styles;

pub fn render(frame: &mut Frame, app: &App, area: Rect) {
    // Profile | Data over Turn (50/50)
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(columns[1]);

    render_profile(frame, app, columns[0]);
    render_data(frame, app, right[0]);
    render_turn(frame, app, right[1]);
}

fn panel(title: &str) -> Block<'_> {
    Block::default()
        .title(title)
        .title_style(styles::title_style())
        .borders(Borders::ALL)
        .border_style(styles::border_style(true))
}

fn field(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{:<14}", label), styles::muted_style()),
        Span::styled(value, styles::text_style()),
    ])
}

fn or_dash(value: Option<&str>) -> String {
    value.filter(|v| !v.is_empty()).unwrap_or("-").to_string()
}

fn format_timestamp(ts: Option<DateTime<Utc>>) -> String {
    ts.map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn profile_lines(user: &UserProfile) -> Vec<Line<'static>> {
    let mut lines = vec![
        field("Email", or_dash(user.email())),
        field("Clan", or_dash(user.clan())),
        field("Timezone", or_dash(user.timezone())),
        field("Last login", format_timestamp(user.last_login())),
        field("Member since", format_timestamp(user.created())),
    ];

    if user.is_admin() {
        lines.push(Line::from(""));
        lines.push(Line::from(Span::styled("Administrator", styles::highlight_style())));
    }
    if user.is_active() == Some(false) {
        lines.push(Line::from(Span::styled("Account inactive", styles::error_style())));
    }
    lines
}

fn render_profile(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match app.current_user() {
        Some(user) => profile_lines(&user),
        None => vec![Line::from(Span::styled("No profile loaded", styles::muted_style()))],
    };

    frame.render_widget(Paragraph::new(lines).block(panel(" Profile ")), area);
}

fn render_data(frame: &mut Frame, app: &App, area: Rect) {
    let lines = match (&app.data, app.loading_data) {
        (Some(data), _) => vec![
            field("Clan", or_dash(data.clan.as_deref())),
            field("Path", or_dash(data.path.as_deref())),
        ],
        (None, true) => vec![Line::from(Span::styled("Loading...", styles::muted_style()))],
        (None, false) => vec![Line::from(Span::styled(
            "No data. Press r to refresh",
            styles::muted_style(),
        ))],
    };

    frame.render_widget(Paragraph::new(lines).block(panel(" Data ")), area);
}

fn render_turn(frame: &mut Frame, app: &App, area: Rect) {
    let title = format!(" Turn {} ", app.turn);
    let mut lines = match app.turn_data {
        Some(ref turn) => {
            let (label, style) = if turn.exists {
                ("available", styles::success_style())
            } else {
                ("not found", styles::error_style())
            };
            vec![
                Line::from(vec![
                    Span::styled(format!("{:<14}", "Status"), styles::muted_style()),
                    Span::styled(label, style),
                ]),
                field("Path", or_dash(turn.path.as_deref())),
            ]
        }
        None => vec![Line::from(Span::styled("Loading...", styles::muted_style()))],
    };

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled("←/→ previous/next turn", styles::muted_style())));

    frame.render_widget(Paragraph::new(lines).block(panel(&title)), area);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_or_dash() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("0138")), "0138");
    }

    #[test]
    fn test_format_timestamp_missing() {
        assert_eq!(format_timestamp(None), "-");
    }

    #[test]
    fn test_profile_lines_mark_admin() {
        let user = UserProfile::from(serde_json::json!({"email": "a@b.com", "isAdmin": true}));
        let text: String = profile_lines(&user)
            .iter()
            .flat_map(|line| line.spans.iter().map(|s| s.content.to_string()))
            .collect();
        assert!(text.contains("a@b.com"));
        assert!(text.contains("Administrator"));

        let plain = profile_lines(&UserProfile::default());
        assert_eq!(plain.len(), 5);
    }
}
