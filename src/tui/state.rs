//! The interaction state machine.
//!
//! [`App::transition`] maps the current state and a single [`AppEvent`] to the
//! next state plus an optional [`Command`] for the event loop to carry out. It
//! performs no I/O. Each [`Screen`] variant carries only the data that screen
//! needs, so for example the dashboard can never hold an error message.

use crate::db::{ConnectionParameters, Introspection, ProbeResult};
use crate::tui::input::TextField;
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use std::collections::HashMap;
use std::io;

pub const FIELD_COUNT: usize = 5;
pub const TAB_TITLES: [&str; 4] = ["Dashboard", "Queries", "Logs", "Settings"];

const USER: usize = 0;
const PASSWORD: usize = 1;
const HOST: usize = 2;
const PORT: usize = 3;
const DATABASE: usize = 4;

#[derive(Debug)]
pub enum AppEvent {
    Key(KeyEvent),
    Resize(u16, u16),
    ProbeCompleted(ProbeResult),
    /// The terminal can no longer be read. The event loop stops with this
    /// error before the state machine sees it.
    InputFailed(io::Error),
}

#[derive(Debug, PartialEq, Eq)]
pub enum Command {
    Probe(ConnectionParameters),
    Quit,
}

/// The five connection inputs and which one has focus.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Form {
    fields: [TextField; FIELD_COUNT],
    focused: usize,
}

impl Default for Form {
    fn default() -> Self {
        Form {
            fields: [
                TextField::new("Username"),
                TextField::masked("Password"),
                TextField::new("Host"),
                TextField::new("Port (default 5432)"),
                TextField::new("Database Name"),
            ],
            focused: 0,
        }
    }
}

impl Form {
    pub fn from_parameters(params: &ConnectionParameters) -> Self {
        let mut form = Form::default();
        form.fields[USER].set_value(params.user.as_str());
        form.fields[PASSWORD].set_value(params.password.as_str());
        form.fields[HOST].set_value(params.host.as_str());
        form.fields[PORT].set_value(params.port.as_str());
        form.fields[DATABASE].set_value(params.database.as_str());
        form
    }

    pub fn fields(&self) -> &[TextField; FIELD_COUNT] {
        &self.fields
    }

    pub fn focused(&self) -> usize {
        self.focused
    }

    pub fn parameters(&self) -> ConnectionParameters {
        ConnectionParameters {
            host: self.fields[HOST].value().to_string(),
            port: self.fields[PORT].value().to_string(),
            user: self.fields[USER].value().to_string(),
            password: self.fields[PASSWORD].value().to_string(),
            database: self.fields[DATABASE].value().to_string(),
        }
    }

    fn focus_next(&mut self) {
        self.focused = (self.focused + 1) % FIELD_COUNT;
    }

    fn focus_previous(&mut self) {
        self.focused = (self.focused + FIELD_COUNT - 1) % FIELD_COUNT;
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Dashboard {
    pub tables: Vec<String>,
    pub row_counts: HashMap<String, i64>,
    selected_tab: usize,
}

impl Dashboard {
    pub fn new(introspection: Introspection) -> Self {
        Dashboard {
            tables: introspection.tables,
            row_counts: introspection.row_counts,
            selected_tab: 0,
        }
    }

    pub fn selected_tab(&self) -> usize {
        self.selected_tab
    }

    fn next_tab(&mut self) {
        self.selected_tab = (self.selected_tab + 1) % TAB_TITLES.len();
    }

    fn previous_tab(&mut self) {
        self.selected_tab = (self.selected_tab + TAB_TITLES.len() - 1) % TAB_TITLES.len();
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Screen {
    InputForm(Form),
    /// A probe is outstanding. The form is kept so a failure can return to it.
    Connecting(Form),
    Dashboard(Dashboard),
    Error { form: Form, message: String },
}

impl Screen {
    pub fn name(&self) -> &'static str {
        match self {
            Screen::InputForm(_) => "input-form",
            Screen::Connecting(_) => "connecting",
            Screen::Dashboard(_) => "dashboard",
            Screen::Error { .. } => "error",
        }
    }

    fn on_key(self, key: KeyEvent) -> (Screen, Option<Command>) {
        if is_ctrl_c(key) {
            return (self, Some(Command::Quit));
        }

        match self {
            Screen::InputForm(mut form) => match key.code {
                KeyCode::Tab | KeyCode::Down => {
                    form.focus_next();
                    (Screen::InputForm(form), None)
                }
                KeyCode::BackTab | KeyCode::Up => {
                    form.focus_previous();
                    (Screen::InputForm(form), None)
                }
                KeyCode::Enter => {
                    let params = form.parameters();
                    (Screen::Connecting(form), Some(Command::Probe(params)))
                }
                _ => {
                    form.fields[form.focused].handle_key(key);
                    (Screen::InputForm(form), None)
                }
            },
            // Nothing is interactive while a probe is outstanding
            Screen::Connecting(form) => (Screen::Connecting(form), None),
            Screen::Error { form, message } => match key.code {
                KeyCode::Enter => (Screen::InputForm(form), None),
                _ => (Screen::Error { form, message }, None),
            },
            Screen::Dashboard(mut dashboard) => match key.code {
                KeyCode::Left => {
                    dashboard.previous_tab();
                    (Screen::Dashboard(dashboard), None)
                }
                KeyCode::Right => {
                    dashboard.next_tab();
                    (Screen::Dashboard(dashboard), None)
                }
                KeyCode::Char('q') => (Screen::Dashboard(dashboard), Some(Command::Quit)),
                _ => (Screen::Dashboard(dashboard), None),
            },
        }
    }

    fn on_probe_completed(self, result: ProbeResult) -> Screen {
        match (self, result) {
            (Screen::Connecting(_), Ok(introspection)) => {
                Screen::Dashboard(Dashboard::new(introspection))
            }
            (Screen::Connecting(form), Err(message)) => Screen::Error { form, message },
            // A completion outside of Connecting is stale
            (screen, _) => screen,
        }
    }
}

fn is_ctrl_c(key: KeyEvent) -> bool {
    key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL)
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

/// The whole interaction state. Only the event loop owns and advances it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct App {
    pub screen: Screen,
    pub viewport: Viewport,
}

impl Default for App {
    fn default() -> Self {
        App::new(Form::default())
    }
}

impl App {
    pub fn new(form: Form) -> Self {
        App {
            screen: Screen::InputForm(form),
            viewport: Viewport::default(),
        }
    }

    pub fn with_viewport(mut self, width: u16, height: u16) -> Self {
        self.viewport = Viewport { width, height };
        self
    }

    pub fn is_connecting(&self) -> bool {
        matches!(self.screen, Screen::Connecting(_))
    }

    pub fn transition(self, event: AppEvent) -> (App, Option<Command>) {
        let App { screen, viewport } = self;
        match event {
            AppEvent::Resize(width, height) => (
                App {
                    screen,
                    viewport: Viewport { width, height },
                },
                None,
            ),
            AppEvent::Key(key) => {
                let (screen, command) = screen.on_key(key);
                (App { screen, viewport }, command)
            }
            AppEvent::ProbeCompleted(result) => (
                App {
                    screen: screen.on_probe_completed(result),
                    viewport,
                },
                None,
            ),
            AppEvent::InputFailed(_) => (App { screen, viewport }, None),
        }
    }
}
