pub mod input;
pub mod render;
pub mod state;

use crate::db::{ConnectionParameters, Prober};
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::{Terminal, backend::Backend};
use std::io;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender, WeakUnboundedSender};
use tokio::task::JoinHandle;

pub use render::{Theme, render};
pub use state::{App, AppEvent, Command, Form, Screen};

const INPUT_POLL_INTERVAL: Duration = Duration::from_millis(250);

/// Single threaded dispatcher: the only place the [`App`] is mutated and drawn.
///
/// The loop holds a weak handle to its own queue. Producers (the terminal
/// input reader and an in-flight probe) hold the strong ones, so the loop also
/// ends once every producer is gone.
pub struct EventLoop<P: Prober> {
    app: App,
    prober: Arc<P>,
    theme: Theme,
    events: UnboundedReceiver<AppEvent>,
    sender: WeakUnboundedSender<AppEvent>,
    probe_task: Option<JoinHandle<()>>,
}

impl<P: Prober> EventLoop<P> {
    pub fn new(
        app: App,
        prober: P,
        theme: Theme,
        events: UnboundedReceiver<AppEvent>,
        sender: &UnboundedSender<AppEvent>,
    ) -> Self {
        EventLoop {
            app,
            prober: Arc::new(prober),
            theme,
            events,
            sender: sender.downgrade(),
            probe_task: None,
        }
    }

    /// Runs until a quit command or until the queue closes, returning the final
    /// state. A terminal input failure ends the loop with that error.
    pub async fn run<B: Backend>(mut self, terminal: &mut Terminal<B>) -> io::Result<App> {
        terminal.draw(|f| render(f, &self.app, &self.theme))?;

        while let Some(event) = self.events.recv().await {
            if let AppEvent::InputFailed(e) = event {
                tracing::error!(error = %e, "terminal input failed");
                self.abort_probe();
                return Err(e);
            }
            if matches!(event, AppEvent::ProbeCompleted(_)) {
                self.probe_task = None;
                if !self.app.is_connecting() {
                    tracing::warn!(
                        screen = self.app.screen.name(),
                        "ignoring probe completion outside the connecting screen"
                    );
                }
            }

            let from = self.app.screen.name();
            let (app, command) = std::mem::take(&mut self.app).transition(event);
            self.app = app;
            if from != self.app.screen.name() {
                tracing::debug!(from, to = self.app.screen.name(), "screen changed");
            }

            match command {
                Some(Command::Probe(params)) => self.spawn_probe(params),
                Some(Command::Quit) => {
                    tracing::info!("quit requested");
                    break;
                }
                None => {}
            }

            terminal.draw(|f| render(f, &self.app, &self.theme))?;
        }

        self.abort_probe();
        Ok(self.app)
    }

    // Nothing will consume the result once the loop is gone
    fn abort_probe(&mut self) {
        if let Some(task) = self.probe_task.take() {
            task.abort();
        }
    }

    fn spawn_probe(&mut self, params: ConnectionParameters) {
        debug_assert!(self.probe_task.is_none(), "a probe is already outstanding");

        // Every producer is gone, so the queue is about to close and the loop with it
        let Some(sender) = self.sender.upgrade() else {
            return;
        };

        tracing::info!(
            host = %params.host,
            port = %params.port,
            database = %params.database,
            "starting probe"
        );

        let prober = Arc::clone(&self.prober);
        self.probe_task = Some(tokio::spawn(async move {
            let result = prober.probe(params).await;
            match &result {
                Ok(introspection) => {
                    tracing::info!(tables = introspection.tables.len(), "probe succeeded")
                }
                Err(reason) => tracing::warn!(%reason, "probe failed"),
            }
            // Sent exactly once; the loop may already have exited
            let _ = sender.send(AppEvent::ProbeCompleted(result));
        }));
    }
}

/// Forwards terminal key presses and resizes to the event queue from a
/// dedicated thread, since reading crossterm events blocks. A read error is
/// forwarded as [`AppEvent::InputFailed`] and stops the thread.
pub fn spawn_input_reader(sender: UnboundedSender<AppEvent>) -> thread::JoinHandle<()> {
    thread::spawn(move || {
        while !sender.is_closed() {
            let app_event = match read_input() {
                Ok(Some(app_event)) => app_event,
                Ok(None) => continue,
                Err(e) => {
                    let _ = sender.send(AppEvent::InputFailed(e));
                    break;
                }
            };

            if sender.send(app_event).is_err() {
                break;
            }
        }
    })
}

/// Waits up to [`INPUT_POLL_INTERVAL`] for the next event the app cares about.
fn read_input() -> io::Result<Option<AppEvent>> {
    if !event::poll(INPUT_POLL_INTERVAL)? {
        return Ok(None);
    }

    Ok(match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => Some(AppEvent::Key(key)),
        Event::Resize(width, height) => Some(AppEvent::Resize(width, height)),
        _ => None,
    })
}

/// Wires the terminal input reader to an [`EventLoop`] and runs it.
pub async fn run_app<B: Backend, P: Prober>(
    terminal: &mut Terminal<B>,
    app: App,
    prober: P,
    theme: Theme,
) -> io::Result<App> {
    let (tx, rx) = mpsc::unbounded_channel();
    let event_loop = EventLoop::new(app, prober, theme, rx, &tx);
    spawn_input_reader(tx);
    event_loop.run(terminal).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{Introspection, ProbeResult};
    use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
    use ratatui::backend::TestBackend;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use tokio::sync::Notify;

    struct StubProbe {
        result: ProbeResult,
        started: Arc<Notify>,
        calls: Arc<Mutex<Vec<ConnectionParameters>>>,
    }

    impl StubProbe {
        fn new(result: ProbeResult) -> Self {
            StubProbe {
                result,
                started: Arc::new(Notify::new()),
                calls: Arc::new(Mutex::new(Vec::new())),
            }
        }
    }

    impl Prober for StubProbe {
        async fn probe(&self, params: ConnectionParameters) -> ProbeResult {
            self.calls.lock().unwrap().push(params);
            self.started.notify_one();
            self.result.clone()
        }
    }

    /// Never completes, like a connection attempt against a black hole.
    struct HangingProbe;

    impl Prober for HangingProbe {
        async fn probe(&self, _params: ConnectionParameters) -> ProbeResult {
            std::future::pending().await
        }
    }

    fn key(code: KeyCode) -> AppEvent {
        AppEvent::Key(KeyEvent::new(code, KeyModifiers::NONE))
    }

    fn terminal() -> Terminal<TestBackend> {
        Terminal::new(TestBackend::new(80, 24)).unwrap()
    }

    fn app() -> App {
        let params = ConnectionParameters {
            host: "localhost".to_string(),
            port: "5432".to_string(),
            user: "postgres".to_string(),
            password: "secret".to_string(),
            database: "shop".to_string(),
        };
        App::new(Form::from_parameters(&params)).with_viewport(80, 24)
    }

    /// Presses Enter, lets the probe start, then closes the input side so the
    /// loop stops once the probe's completion has been applied.
    async fn connect_with(probe: StubProbe) -> App {
        let started = Arc::clone(&probe.started);
        let (tx, rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(app(), probe, Theme::default(), rx, &tx);
        tx.send(key(KeyCode::Enter)).unwrap();

        let mut terminal = terminal();
        let close_input = async move {
            started.notified().await;
            drop(tx);
        };
        let (result, ()) = tokio::join!(event_loop.run(&mut terminal), close_input);
        result.unwrap()
    }

    #[tokio::test]
    async fn test_probe_success_reaches_dashboard() {
        let introspection = Introspection {
            tables: vec!["users".to_string(), "orders".to_string()],
            row_counts: HashMap::from([("users".to_string(), 3), ("orders".to_string(), 0)]),
        };
        let probe = StubProbe::new(Ok(introspection.clone()));
        let calls = Arc::clone(&probe.calls);

        let app = connect_with(probe).await;
        match app.screen {
            Screen::Dashboard(dashboard) => {
                assert_eq!(dashboard.tables, introspection.tables);
                assert_eq!(dashboard.row_counts, introspection.row_counts);
            }
            other => panic!("expected dashboard, got {}", other.name()),
        }

        let calls = calls.lock().unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].host, "localhost");
        assert_eq!(calls[0].database, "shop");
    }

    #[tokio::test]
    async fn test_probe_failure_reaches_error_screen() {
        let probe = StubProbe::new(Err("could not ping the database".to_string()));

        let app = connect_with(probe).await;
        match app.screen {
            Screen::Error { message, .. } => assert_eq!(message, "could not ping the database"),
            other => panic!("expected error screen, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_quit_while_connecting() {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(app(), HangingProbe, Theme::default(), rx, &tx);
        tx.send(key(KeyCode::Enter)).unwrap();
        tx.send(key(KeyCode::Enter)).unwrap();
        tx.send(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();

        let app = event_loop.run(&mut terminal()).await.unwrap();
        assert!(app.is_connecting());
    }

    #[tokio::test]
    async fn test_stale_completion_and_resize_before_quit() {
        let (tx, rx) = mpsc::unbounded_channel();
        let probe = StubProbe::new(Ok(Introspection::default()));
        let calls = Arc::clone(&probe.calls);
        let event_loop = EventLoop::new(app(), probe, Theme::default(), rx, &tx);

        tx.send(AppEvent::ProbeCompleted(Err("stale".to_string())))
            .unwrap();
        tx.send(AppEvent::Resize(100, 30)).unwrap();
        tx.send(AppEvent::Key(KeyEvent::new(
            KeyCode::Char('c'),
            KeyModifiers::CONTROL,
        )))
        .unwrap();

        let final_app = event_loop.run(&mut terminal()).await.unwrap();
        assert_eq!(final_app.screen, app().screen);
        assert_eq!(final_app.viewport.width, 100);
        assert_eq!(final_app.viewport.height, 30);
        assert!(calls.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loop_ends_when_input_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(
            app(),
            StubProbe::new(Ok(Introspection::default())),
            Theme::default(),
            rx,
            &tx,
        );
        tx.send(key(KeyCode::Tab)).unwrap();
        drop(tx);

        let app = event_loop.run(&mut terminal()).await.unwrap();
        match app.screen {
            Screen::InputForm(form) => assert_eq!(form.focused(), 1),
            other => panic!("expected input form, got {}", other.name()),
        }
    }

    #[tokio::test]
    async fn test_input_failure_ends_loop_with_error() {
        let (tx, rx) = mpsc::unbounded_channel();
        let event_loop = EventLoop::new(app(), HangingProbe, Theme::default(), rx, &tx);
        tx.send(key(KeyCode::Enter)).unwrap();
        tx.send(AppEvent::InputFailed(io::Error::other("terminal went away")))
            .unwrap();
        tx.send(key(KeyCode::Tab)).unwrap();

        let err = event_loop.run(&mut terminal()).await.unwrap_err();
        assert_eq!(err.to_string(), "terminal went away");
    }
}
