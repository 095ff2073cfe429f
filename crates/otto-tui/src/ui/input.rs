//! Keyboard input handling for the TUI.
//!
//! Overlays take keys first. Otherwise the route the guard picks decides
//! which handler sees the key.

use anyhow::Result;
use crossterm::event::{KeyCode, KeyEvent};
use otto_core::RouteDecision;

use crate::app::{can_add_email_char, can_add_password_char, App, AppState, LoginFocus};

/// Handle keyboard input. Returns true if the app should quit.
pub fn handle_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // Handle help overlay
    if matches!(app.state, AppState::ShowingHelp) {
        if matches!(key.code, KeyCode::Esc | KeyCode::Char('?') | KeyCode::Char('q')) {
            app.state = AppState::Normal;
        }
        return Ok(false);
    }

    // Handle quit confirmation
    if matches!(app.state, AppState::ConfirmingQuit) {
        match key.code {
            KeyCode::Char('y') | KeyCode::Char('Y') | KeyCode::Enter => {
                app.state = AppState::Quitting;
                return Ok(true);
            }
            KeyCode::Char('n') | KeyCode::Char('N') | KeyCode::Esc => {
                app.state = AppState::Normal;
            }
            _ => {}
        }
        return Ok(false);
    }

    match app.route() {
        RouteDecision::Loading => {
            if key.code == KeyCode::Char('q') {
                app.state = AppState::ConfirmingQuit;
            }
            Ok(false)
        }
        RouteDecision::RedirectToLogin => handle_login_input(app, key),
        RouteDecision::Render => {
            handle_dashboard_input(app, key);
            Ok(false)
        }
    }
}

fn handle_login_input(app: &mut App, key: KeyEvent) -> Result<bool> {
    // The form is frozen while a request is in flight
    if app.is_signing_in() {
        if key.code == KeyCode::Esc {
            app.state = AppState::Quitting;
            return Ok(true);
        }
        return Ok(false);
    }

    match key.code {
        KeyCode::Esc => {
            // Quit if on login screen
            app.state = AppState::Quitting;
            return Ok(true);
        }
        KeyCode::Down | KeyCode::Tab => {
            app.login_focus = app.login_focus.next();
        }
        KeyCode::Up | KeyCode::BackTab => {
            app.login_focus = app.login_focus.prev();
        }
        KeyCode::Enter => match app.login_focus {
            LoginFocus::Email => app.login_focus = LoginFocus::Password,
            LoginFocus::Password | LoginFocus::Button => app.attempt_login(),
        },
        KeyCode::Backspace => match app.login_focus {
            LoginFocus::Email => {
                app.login_email.pop();
            }
            LoginFocus::Password => {
                app.login_password.pop();
            }
            LoginFocus::Button => {}
        },
        KeyCode::Char(c) => match app.login_focus {
            LoginFocus::Email => {
                if can_add_email_char(app.login_email.chars().count(), c) {
                    app.login_email.push(c);
                }
            }
            LoginFocus::Password => {
                if can_add_password_char(app.login_password.chars().count(), c) {
                    app.login_password.push(c);
                }
            }
            // Ignore character input on button
            LoginFocus::Button => {}
        },
        _ => {}
    }
    Ok(false)
}

fn handle_dashboard_input(app: &mut App, key: KeyEvent) {
    match key.code {
        KeyCode::Char('q') => app.state = AppState::ConfirmingQuit,
        KeyCode::Char('?') => app.state = AppState::ShowingHelp,
        KeyCode::Char('l') => app.logout(),
        KeyCode::Char('r') => {
            app.status_message = None;
            app.refresh_dashboard();
        }
        KeyCode::Char('A') => app.toggle_route_logging(),
        KeyCode::Left => {
            let turn = app.turn.prev();
            app.select_turn(turn);
        }
        KeyCode::Right => {
            let turn = app.turn.next();
            app.select_turn(turn);
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use crossterm::event::KeyModifiers;
    use otto_core::auth::MemoryTokenStore;
    use otto_core::SessionStatus;

    use crate::app::tests::test_app;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn press(app: &mut App, code: KeyCode) -> bool {
        handle_input(app, key(code)).expect("handle key")
    }

    #[test]
    fn test_typing_goes_to_focused_field() {
        let mut app = test_app(MemoryTokenStore::new());
        for c in "a@b.com".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Tab);
        for c in "pw q".chars() {
            press(&mut app, KeyCode::Char(c));
        }
        press(&mut app, KeyCode::Backspace);

        assert_eq!(app.login_email, "a@b.com");
        assert_eq!(app.login_password, "pw ");
        assert_eq!(app.login_focus, LoginFocus::Password);
        // 'q' was typed, not treated as quit
        assert_eq!(app.state, AppState::Normal);
    }

    #[test]
    fn test_email_rejects_whitespace() {
        let mut app = test_app(MemoryTokenStore::new());
        press(&mut app, KeyCode::Char(' '));
        assert!(app.login_email.is_empty());
    }

    #[test]
    fn test_focus_cycles_with_tab_and_backtab() {
        let mut app = test_app(MemoryTokenStore::new());
        assert_eq!(app.login_focus, LoginFocus::Email);
        press(&mut app, KeyCode::Tab);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.login_focus, LoginFocus::Button);
        press(&mut app, KeyCode::Tab);
        assert_eq!(app.login_focus, LoginFocus::Email);
        press(&mut app, KeyCode::BackTab);
        assert_eq!(app.login_focus, LoginFocus::Button);
    }

    #[test]
    fn test_submit_without_credentials_shows_error() {
        let mut app = test_app(MemoryTokenStore::new());
        app.login_focus = LoginFocus::Button;
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.login_error.as_deref(), Some("Email and password required"));
        assert_eq!(app.session.status(), SessionStatus::Unauthenticated);
    }

    #[test]
    fn test_enter_on_email_moves_to_password() {
        let mut app = test_app(MemoryTokenStore::new());
        press(&mut app, KeyCode::Enter);
        assert_eq!(app.login_focus, LoginFocus::Password);
        assert!(app.login_error.is_none());
    }

    #[test]
    fn test_escape_on_login_quits() {
        let mut app = test_app(MemoryTokenStore::new());
        assert!(press(&mut app, KeyCode::Esc));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[test]
    fn test_loading_only_accepts_quit() {
        let mut app = test_app(MemoryTokenStore::with_token("T_old"));
        press(&mut app, KeyCode::Char('l'));
        assert_eq!(app.session.status(), SessionStatus::Initializing);

        press(&mut app, KeyCode::Char('q'));
        assert_eq!(app.state, AppState::ConfirmingQuit);
        press(&mut app, KeyCode::Char('n'));
        assert_eq!(app.state, AppState::Normal);
        press(&mut app, KeyCode::Char('q'));
        assert!(press(&mut app, KeyCode::Char('y')));
        assert_eq!(app.state, AppState::Quitting);
    }

    #[test]
    fn test_help_overlay_swallows_keys() {
        let mut app = test_app(MemoryTokenStore::new());
        app.state = AppState::ShowingHelp;
        press(&mut app, KeyCode::Char('x'));
        assert!(app.login_email.is_empty());
        assert_eq!(app.state, AppState::ShowingHelp);
        press(&mut app, KeyCode::Esc);
        assert_eq!(app.state, AppState::Normal);
    }
}
