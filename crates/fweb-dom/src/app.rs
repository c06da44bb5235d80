#![forbid(unsafe_code)]

//! Process-level lifecycle: configuration, the binding refresh loop, page
//! clients, the shared client, and app-wide hooks.
//!
//! # Design
//!
//! One [`App`] per runtime thread. [`App::start`] must run inside a
//! `tokio::task::LocalSet`; it runs the startup hooks, then spawns the
//! refresh loop and the shared client's outbox loop. Page clients created
//! through [`App::new_page`] get their own outbox loop and forward their
//! connect and disconnect events to the app-wide hooks. [`App::shutdown`]
//! runs the shutdown hooks, cancels everything, deletes every client, and
//! drains the binding graph.
//!
//! # Invariants
//!
//! 1. Startup hooks run at most once, before any app task is spawned.
//! 2. App-wide connect and disconnect hooks see every client created by the
//!    app, including hooks registered after the client was created.
//!
//! # Failure Modes
//!
//! - **Late startup hook**: registering one after [`App::start`] fails with
//!   [`Error::Context`](fweb_core::Error::Context).

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::Rc;

use fweb_core::{Config, Error, Result};
use fweb_runtime::reactive::{self, RefreshConfig};
use fweb_runtime::{CancelPolicy, ShutdownReport, TaskSet};

use crate::client::{Client, ClientKind};

type ClientHook = Rc<dyn Fn(&Client)>;
type AppHook = Rc<dyn Fn(&App)>;

/// Lifecycle phase of an [`App`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Created,
    Started,
    Stopping,
}

#[derive(Default)]
struct Hooks {
    connect: RefCell<Vec<ClientHook>>,
    disconnect: RefCell<Vec<ClientHook>>,
    startup: RefCell<Vec<AppHook>>,
    shutdown: RefCell<Vec<AppHook>>,
}

impl Hooks {
    fn run(list: &RefCell<Vec<ClientHook>>, client: &Client) {
        let hooks = list.borrow().clone();
        for hook in hooks {
            hook(client);
        }
    }
}

pub struct App {
    config: Config,
    shared: Client,
    tasks: TaskSet,
    hooks: Rc<Hooks>,
    state: Cell<AppState>,
}

impl fmt::Debug for App {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("App")
            .field("state", &self.state.get())
            .field("shared", &self.shared.id())
            .field("tasks", &self.tasks.running())
            .finish_non_exhaustive()
    }
}

impl App {
    /// Validate `config` and create the shared client.
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;
        let shared = Client::shared_with(config.clone());
        let app = Self {
            config,
            shared,
            tasks: TaskSet::new(),
            hooks: Rc::new(Hooks::default()),
            state: Cell::new(AppState::Created),
        };
        app.adopt(&app.shared);
        Ok(app)
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    #[must_use]
    pub fn shared(&self) -> &Client {
        &self.shared
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskSet {
        &self.tasks
    }

    #[must_use]
    pub fn state(&self) -> AppState {
        self.state.get()
    }

    // ── Hooks ────────────────────────────────────────────────────────

    /// Run `hook` whenever any client of this app gets its first socket.
    pub fn on_connect(&self, hook: impl Fn(&Client) + 'static) {
        self.hooks.connect.borrow_mut().push(Rc::new(hook));
    }

    /// Run `hook` whenever any client of this app loses its last socket.
    pub fn on_disconnect(&self, hook: impl Fn(&Client) + 'static) {
        self.hooks.disconnect.borrow_mut().push(Rc::new(hook));
    }

    /// Run `hook` from [`start`](Self::start).
    ///
    /// # Errors
    ///
    /// [`Error::Context`] once the app has started.
    pub fn on_startup(&self, hook: impl Fn(&App) + 'static) -> Result<()> {
        if self.state.get() != AppState::Created {
            return Err(Error::context(
                "cannot register a startup hook: the app has already been started",
            ));
        }
        self.hooks.startup.borrow_mut().push(Rc::new(hook));
        Ok(())
    }

    /// Run `hook` from [`shutdown`](Self::shutdown), before tasks are
    /// cancelled and clients deleted.
    pub fn on_shutdown(&self, hook: impl Fn(&App) + 'static) {
        self.hooks.shutdown.borrow_mut().push(Rc::new(hook));
    }

    /// Forward the connect and disconnect events of `client` to the app-wide
    /// hooks.
    fn adopt(&self, client: &Client) {
        let hooks = Rc::clone(&self.hooks);
        client.on_connect(move |client| Hooks::run(&hooks.connect, client));
        let hooks = Rc::clone(&self.hooks);
        client.on_disconnect(move |client| Hooks::run(&hooks.disconnect, client));
    }

    // ── Lifecycle ────────────────────────────────────────────────────

    /// Run the startup hooks, then spawn the binding refresh loop and the
    /// shared client's outbox loop. Later calls do nothing.
    pub fn start(&self) {
        if self.state.get() != AppState::Created {
            return;
        }
        self.state.set(AppState::Started);
        let hooks = self.hooks.startup.borrow().clone();
        for hook in hooks {
            hook(self);
        }
        let refresh = RefreshConfig::from(&self.config);
        self.tasks
            .spawn_lazy("binding-refresh", reactive::refresh_loop(refresh));
        self.shared.start();
        tracing::info!(
            refresh_interval = ?self.config.binding_refresh_interval,
            history = self.config.message_history_length,
            "app.start"
        );
    }

    /// Create a private client with a running outbox loop.
    pub fn new_page(&self) -> Client {
        let client = Client::new(ClientKind::Page, self.config.clone());
        self.adopt(&client);
        client.start();
        client
    }

    /// Create a page client and build its content with `build`.
    pub fn page<R>(&self, build: impl FnOnce(&Client) -> Result<R>) -> Result<(Client, R)> {
        let client = self.new_page();
        match client.build(|| build(&client)) {
            Ok(out) => Ok((client, out)),
            Err(err) => {
                client.delete();
                Err(err)
            }
        }
    }

    /// Live page clients.
    #[must_use]
    pub fn pages(&self) -> Vec<Client> {
        Client::all()
            .into_iter()
            .filter(|c| c.kind() == ClientKind::Page)
            .collect()
    }

    /// Run the shutdown hooks, cancel app tasks, delete every client, and
    /// drain the binding graph.
    pub fn shutdown(self) -> ShutdownReport {
        self.state.set(AppState::Stopping);
        let hooks = self.hooks.shutdown.borrow().clone();
        for hook in hooks {
            hook(&self);
        }
        let report = self.tasks.shutdown();
        for client in Client::all() {
            client.delete();
        }
        reactive::reset();
        tracing::info!(cancelled = report.cancelled, "app.shutdown");
        report
    }

    /// Spawn an app-level task that outlives page clients.
    pub fn spawn(&self, name: &str, policy: CancelPolicy, future: impl Future<Output = ()> + 'static) {
        self.tasks.spawn(name, policy, future);
    }
}
