#![forbid(unsafe_code)]

//! Clients: one rendering surface each.
//!
//! # Design
//!
//! A [`Client`] owns an element tree, an [`Outbox`], the sockets currently
//! attached to it, pending script round trips, lifecycle hooks, and a
//! [`TaskSet`] of background flows. Clients live in a per-thread registry;
//! element handles resolve their client through it and fail with
//! [`Error::ClientDeleted`] once the client is gone.
//!
//! Transport code drives a client through four entry points:
//! [`handle_handshake`](Client::handle_handshake),
//! [`handle_message`](Client::handle_message),
//! [`handle_disconnect`](Client::handle_disconnect) and the frames it
//! receives on the channel it attached.
//!
//! # Invariants
//!
//! 1. Frames reach every socket in sequence order; a socket that rejects a
//!    frame is detached.
//! 2. Without any attached socket, queued messages stay queued.
//! 3. Events for unknown elements or listeners are dropped, never errors.
//! 4. A private client is deleted when no socket re-attaches within the
//!    reconnect timeout; the shared client is never deleted that way.
//!
//! # Failure Modes
//!
//! - **No transport yet**: script calls resolve to `null` immediately.
//! - **Handler errors**: reported through [`fweb_core::exception::report`].

use std::cell::{Cell, RefCell};
use std::collections::BTreeMap;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::rc::{Rc, Weak};
use std::time::Duration;

use ahash::AHashMap;
use fweb_core::protocol::{ElementState, EventMessage, Frame, Inbound, NotifyOptions, Outbound, ScriptResponse};
use fweb_core::{ClientId, Config, ElementId, Error, RequestId, Result, SocketId};
use fweb_runtime::reactive::{self, ObjectId};
use fweb_runtime::{CancelPolicy, TaskHandle, TaskSet};
use indexmap::IndexMap;
use serde_json::Value;
use tokio::sync::{Notify, mpsc, oneshot, watch};

use crate::context;
use crate::element::Element;
use crate::listener::{EventArgs, Handler};
use crate::outbox::{Outbox, Target};
use crate::slot::Slot;
use crate::tree::{Node, Tree};

/// Pending result of a script round trip.
pub type ScriptCall = Pin<Box<dyn Future<Output = Result<Value>>>>;

/// Sequence number of the `history_exhausted` answer; real frames start at 1.
pub const HISTORY_EXHAUSTED_SEQ: u64 = 0;

/// Kind of the root element of every client.
pub const ROOT_KIND: &str = "Root";

type Hook = Rc<dyn Fn(&Client)>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientKind {
    /// Private, reconnectable session of one visited page.
    Page,
    /// Process-wide session for output not scoped to any page.
    Shared,
}

struct ClientInner {
    id: ClientId,
    kind: ClientKind,
    config: Config,
    root: Element,
    tree: RefCell<Tree>,
    outbox: RefCell<Outbox>,
    sockets: RefCell<IndexMap<SocketId, mpsc::UnboundedSender<Frame>>>,
    connected: watch::Sender<bool>,
    wake: Notify,
    connect_hooks: RefCell<Vec<Hook>>,
    disconnect_hooks: RefCell<Vec<Hook>>,
    delete_hooks: RefCell<Vec<Hook>>,
    scripts: RefCell<AHashMap<RequestId, oneshot::Sender<Result<Value>>>>,
    tasks: TaskSet,
    title: RefCell<Option<String>>,
    deleted: Cell<bool>,
    /// Bumped on every attach and detach; a pending reconnect timer only
    /// fires if nothing happened since it was armed.
    epoch: Cell<u64>,
}

/// Handle to one rendering surface.
#[derive(Clone)]
pub struct Client {
    inner: Rc<ClientInner>,
}

impl PartialEq for Client {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.inner, &other.inner)
    }
}

impl Eq for Client {}

impl fmt::Debug for Client {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Client")
            .field("id", &self.inner.id)
            .field("kind", &self.inner.kind)
            .field("elements", &self.inner.tree.borrow().nodes.len())
            .field("sockets", &self.inner.sockets.borrow().len())
            .field("deleted", &self.inner.deleted.get())
            .finish()
    }
}

thread_local! {
    static CLIENTS: RefCell<AHashMap<ClientId, Client>> = RefCell::new(AHashMap::new());
    static SHARED: RefCell<Option<Client>> = const { RefCell::new(None) };
}

impl Client {
    /// Create and register a client with an empty root element.
    #[must_use]
    pub fn new(kind: ClientKind, config: Config) -> Self {
        let id = ClientId::next();
        let mut tree = Tree::new(id);
        let root_id = tree.allocate();
        let mut node = Node::new(ROOT_KIND, "div".to_string());
        node.classes.push("fweb-content".to_string());
        let root = Element::from_parts(id, root_id, node.object);
        tree.nodes.insert(root_id, node);
        let history = match kind {
            ClientKind::Page => config.message_history_length,
            ClientKind::Shared => 0,
        };
        let client = Self {
            inner: Rc::new(ClientInner {
                id,
                kind,
                config,
                root,
                tree: RefCell::new(tree),
                outbox: RefCell::new(Outbox::new(history)),
                sockets: RefCell::new(IndexMap::new()),
                connected: watch::channel(false).0,
                wake: Notify::new(),
                connect_hooks: RefCell::new(Vec::new()),
                disconnect_hooks: RefCell::new(Vec::new()),
                delete_hooks: RefCell::new(Vec::new()),
                scripts: RefCell::new(AHashMap::new()),
                tasks: TaskSet::new(),
                title: RefCell::new(None),
                deleted: Cell::new(false),
                epoch: Cell::new(0),
            }),
        };
        CLIENTS.with(|clients| clients.borrow_mut().insert(id, client.clone()));
        tracing::debug!(client = %id, ?kind, "client.create");
        client
    }

    /// Resolve a live client by id.
    pub fn lookup(id: ClientId) -> Result<Self> {
        CLIENTS
            .with(|clients| clients.borrow().get(&id).cloned())
            .ok_or(Error::ClientDeleted { client: id })
    }

    /// Every live client of this thread, ordered by id.
    #[must_use]
    pub fn all() -> Vec<Self> {
        let mut clients: Vec<_> = CLIENTS.with(|clients| clients.borrow().values().cloned().collect());
        clients.sort_by_key(Client::id);
        clients
    }

    /// The shared client of this thread, created with `config` if absent.
    pub fn shared_with(config: Config) -> Self {
        SHARED.with(|shared| {
            shared
                .borrow_mut()
                .get_or_insert_with(|| Self::new(ClientKind::Shared, config))
                .clone()
        })
    }

    /// The shared client of this thread.
    pub fn shared() -> Self {
        Self::shared_with(Config::default())
    }

    #[inline]
    #[must_use]
    pub fn id(&self) -> ClientId {
        self.inner.id
    }

    #[must_use]
    pub fn kind(&self) -> ClientKind {
        self.inner.kind
    }

    #[must_use]
    pub fn config(&self) -> &Config {
        &self.inner.config
    }

    #[must_use]
    pub fn is_deleted(&self) -> bool {
        self.inner.deleted.get()
    }

    pub(crate) fn tree(&self) -> &RefCell<Tree> {
        &self.inner.tree
    }

    /// Root element of the tree.
    #[must_use]
    pub fn root(&self) -> Element {
        self.inner.root
    }

    /// Default slot of the root; page content is built here.
    #[must_use]
    pub fn content(&self) -> Slot {
        self.inner.root.default_slot()
    }

    /// Run `f` with the page content as the current slot.
    pub fn build<R>(&self, f: impl FnOnce() -> R) -> R {
        context::scope(vec![self.content()], f)
    }

    #[must_use]
    pub fn element(&self, id: ElementId) -> Option<Element> {
        self.inner.tree.borrow().handle(id)
    }

    /// Every live element, ordered by id.
    #[must_use]
    pub fn elements(&self) -> Vec<Element> {
        let tree = self.inner.tree.borrow();
        let mut ids: Vec<_> = tree.nodes.keys().copied().collect();
        ids.sort_unstable();
        ids.into_iter().filter_map(|id| tree.handle(id)).collect()
    }

    #[must_use]
    pub fn element_count(&self) -> usize {
        self.inner.tree.borrow().nodes.len()
    }

    #[must_use]
    pub fn tasks(&self) -> &TaskSet {
        &self.inner.tasks
    }

    /// Spawn a flow owned by this client, inheriting the caller's slot
    /// stack (or the page content when there is none).
    pub fn spawn<F>(&self, name: &str, policy: CancelPolicy, future: F) -> TaskHandle
    where
        F: Future<Output = ()> + 'static,
    {
        let mut stack = context::snapshot();
        if stack.is_empty() {
            stack.push(self.content());
        }
        self.inner.tasks.spawn(name, policy, context::isolate(stack, future))
    }

    // ── Outbox ───────────────────────────────────────────────────────

    pub(crate) fn enqueue_update(&self, id: ElementId) {
        if self.inner.outbox.borrow_mut().enqueue_update(id) {
            self.inner.wake.notify_one();
        }
    }

    /// Queue a non-tree message.
    pub fn enqueue_message(&self, message: Outbound, target: Target) {
        tracing::trace!(client = %self.id(), kind = message.kind(), ?target, "outbox.enqueue");
        self.inner.outbox.borrow_mut().enqueue_message(message, target);
        self.inner.wake.notify_one();
    }

    #[must_use]
    pub fn has_pending(&self) -> bool {
        !self.inner.outbox.borrow().is_empty()
    }

    /// Sequence number of the last delivered frame.
    #[must_use]
    pub fn last_seq(&self) -> u64 {
        self.inner.outbox.borrow().last_seq()
    }

    /// Deliver queued messages to the attached sockets.
    ///
    /// Returns the number of frames drained. Nothing is drained while no
    /// socket is attached.
    ///
    /// # Panics
    ///
    /// A socket whose receiver is gone is detached through
    /// [`handle_disconnect`](Self::handle_disconnect), which needs a
    /// `tokio::task::LocalSet` when it was the last socket of a page client.
    pub fn flush(&self) -> usize {
        if self.inner.sockets.borrow().is_empty() {
            return 0;
        }
        let frames = {
            let tree = self.inner.tree.borrow();
            self.inner
                .outbox
                .borrow_mut()
                .drain(|id| tree.get(id).map(|node| node.state(id)))
        };
        let count = frames.len();
        let mut dead = Vec::new();
        {
            let sockets = self.inner.sockets.borrow();
            for (target, frame) in frames {
                match target {
                    Target::Client => {
                        for (socket, sender) in sockets.iter() {
                            if sender.send(frame.clone()).is_err() && !dead.contains(socket) {
                                dead.push(*socket);
                            }
                        }
                    }
                    Target::Socket(socket) => {
                        if let Some(sender) = sockets.get(&socket)
                            && sender.send(frame).is_err()
                            && !dead.contains(&socket)
                        {
                            dead.push(socket);
                        }
                    }
                }
            }
        }
        for socket in dead {
            tracing::warn!(client = %self.id(), %socket, "socket closed during send; detaching");
            self.handle_disconnect(socket);
        }
        if count > 0 {
            tracing::trace!(client = %self.id(), frames = count, "outbox.flush");
        }
        count
    }

    /// Snapshot of the whole tree for the initial page render.
    ///
    /// Pending element updates are discarded since the snapshot contains
    /// them; other queued messages are kept.
    #[must_use]
    pub fn initial_state(&self) -> BTreeMap<ElementId, ElementState> {
        let tree = self.inner.tree.borrow();
        let state = tree.nodes.iter().map(|(id, node)| (*id, node.state(*id))).collect();
        self.inner.outbox.borrow_mut().discard_updates();
        state
    }

    /// Spawn the loop that flushes the outbox whenever something is queued,
    /// and at least every `outbox_idle_interval`.
    pub fn start(&self) -> TaskHandle {
        let weak = Rc::downgrade(&self.inner);
        let idle = self.inner.config.outbox_idle_interval;
        self.inner.tasks.spawn("outbox", CancelPolicy::Cancel, async move {
            loop {
                let Some(client) = upgrade(&weak) else {
                    return;
                };
                tokio::select! {
                    () = client.inner.wake.notified() => {}
                    () = tokio::time::sleep(idle) => {}
                }
                // Let the flow that queued the message finish its batch.
                tokio::task::yield_now().await;
                if client.is_deleted() {
                    return;
                }
                client.flush();
            }
        })
    }

    // ── Transport ────────────────────────────────────────────────────

    /// Attach a socket after its handshake.
    ///
    /// With a reconnect marker, frames newer than it are replayed to the new
    /// socket, or `history_exhausted` is sent when they are gone. Frames that
    /// were addressed to one particular socket are not replayed.
    pub fn handle_handshake(
        &self,
        socket: SocketId,
        sender: mpsc::UnboundedSender<Frame>,
        last_seq: Option<u64>,
    ) -> Result<()> {
        if self.is_deleted() {
            return Err(Error::ClientDeleted { client: self.id() });
        }
        if let Some(last_seq) = last_seq {
            let replay = self.inner.outbox.borrow().replay_since(last_seq, socket);
            match replay {
                Some(frames) => {
                    tracing::debug!(client = %self.id(), %socket, last_seq, replayed = frames.len(), "client.replay");
                    for frame in frames {
                        let _ = sender.send(frame);
                    }
                }
                None => {
                    tracing::debug!(client = %self.id(), %socket, last_seq, "client.history_exhausted");
                    let _ = sender.send(Frame {
                        seq: HISTORY_EXHAUSTED_SEQ,
                        message: Outbound::HistoryExhausted,
                    });
                }
            }
        }
        self.inner.sockets.borrow_mut().insert(socket, sender);
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        self.inner.connected.send_replace(true);
        tracing::debug!(client = %self.id(), %socket, "client.connect");
        let hooks = self.inner.connect_hooks.borrow().clone();
        for hook in hooks {
            self.build(|| hook(self));
        }
        self.flush();
        Ok(())
    }

    /// Detach a socket. When the last one leaves, disconnect hooks run and
    /// a private client arms its reconnect timer.
    ///
    /// # Panics
    ///
    /// Arming the reconnect timer spawns a local task, so detaching the last
    /// socket of a page client must happen inside a `tokio::task::LocalSet`.
    pub fn handle_disconnect(&self, socket: SocketId) {
        let remaining = {
            let mut sockets = self.inner.sockets.borrow_mut();
            if sockets.shift_remove(&socket).is_none() {
                return;
            }
            sockets.len()
        };
        self.inner.epoch.set(self.inner.epoch.get() + 1);
        tracing::debug!(client = %self.id(), %socket, remaining, "client.disconnect");
        if remaining > 0 {
            return;
        }
        self.inner.connected.send_replace(false);
        let hooks = self.inner.disconnect_hooks.borrow().clone();
        for hook in hooks {
            self.build(|| hook(self));
        }
        if self.kind() == ClientKind::Page && !self.is_deleted() {
            self.arm_reconnect_timer();
        }
    }

    fn arm_reconnect_timer(&self) {
        let weak = Rc::downgrade(&self.inner);
        let epoch = self.inner.epoch.get();
        let timeout = self.inner.config.reconnect_timeout;
        self.inner.tasks.spawn("reconnect-timeout", CancelPolicy::Finish, async move {
            tokio::time::sleep(timeout).await;
            if let Some(client) = upgrade(&weak)
                && client.inner.epoch.get() == epoch
                && !client.has_socket_connection()
            {
                tracing::debug!(client = %client.id(), ?timeout, "client.reconnect_timeout");
                client.delete();
            }
        });
    }

    /// Dispatch one inbound message from `socket`.
    pub fn handle_message(&self, socket: SocketId, message: Inbound) {
        match message {
            Inbound::Handshake { .. } => {
                tracing::warn!(client = %self.id(), %socket, "duplicate handshake ignored");
            }
            Inbound::Event(event) => self.handle_event(event),
            Inbound::ScriptResponse(response) => self.script_response(response),
        }
    }

    /// Invoke the listener named by `message`.
    ///
    /// Unknown elements or listeners are dropped silently, as are events
    /// for hidden elements and for disabled elements that gate on it.
    pub fn handle_event(&self, message: EventMessage) {
        let resolved = {
            let tree = self.inner.tree.borrow();
            tree.get(message.element_id).map(|node| {
                let ignored = node.is_hidden() || node.is_disabled();
                let listener = node
                    .listeners
                    .get(&message.listener_id)
                    .map(|l| (Rc::clone(&l.event_type), l.handler.clone()));
                let slot = node
                    .parent
                    .as_ref()
                    .and_then(|(parent, name)| tree.handle(*parent).map(|p| Slot::new(p, Rc::clone(name))));
                (ignored, listener, slot, node.object)
            })
        };
        let Some((ignored, listener, slot, object)) = resolved else {
            tracing::trace!(client = %self.id(), element = %message.element_id, "event.stale_element");
            return;
        };
        let Some((event_type, handler)) = listener else {
            tracing::trace!(client = %self.id(), listener = %message.listener_id, "event.stale_listener");
            return;
        };
        if ignored {
            tracing::trace!(client = %self.id(), element = %message.element_id, "event.ignored");
            return;
        }
        let sender = Element::from_parts(self.id(), message.element_id, object);
        let slot = slot.unwrap_or_else(|| sender.default_slot());
        let origin = format!("event handler `{event_type}` on element {}", message.element_id);
        let args = EventArgs {
            client: self.clone(),
            sender,
            event_type,
            args: message.args,
        };
        match handler {
            Handler::Sync(f) => {
                if let Err(err) = context::with_slot(slot, || f(&args)) {
                    fweb_core::exception::report(&origin, err.as_ref());
                }
            }
            Handler::Async(f) => {
                let future = context::isolate(vec![slot], f(args));
                self.inner.tasks.spawn("event handler", CancelPolicy::Cancel, async move {
                    if let Err(err) = future.await {
                        fweb_core::exception::report(&origin, err.as_ref());
                    }
                });
            }
        }
    }

    // ── Scripts and notifications ────────────────────────────────────

    /// Run `code` in the browser and await its result.
    ///
    /// The request is queued immediately. Without an attached socket the
    /// returned future resolves to `null` right away.
    ///
    /// # Errors
    ///
    /// The future fails with [`Error::Timeout`] when no response arrives
    /// within `timeout` (default: `script_timeout`), with [`Error::Script`]
    /// when the browser reports an error, and with
    /// [`Error::ClientDeleted`] when the client goes away first.
    pub fn run_script(&self, code: impl Into<String>, timeout: Option<Duration>) -> ScriptCall {
        let correlation_id = RequestId::generate();
        self.enqueue_message(
            Outbound::RunScript {
                correlation_id,
                code: code.into(),
            },
            Target::Client,
        );
        if !self.has_socket_connection() {
            return Box::pin(async { Ok(Value::Null) });
        }
        let (tx, rx) = oneshot::channel();
        self.inner.scripts.borrow_mut().insert(correlation_id, tx);
        let timeout = timeout.unwrap_or(self.inner.config.script_timeout);
        let weak = Rc::downgrade(&self.inner);
        let client = self.id();
        Box::pin(async move {
            match tokio::time::timeout(timeout, rx).await {
                Ok(Ok(result)) => result,
                Ok(Err(_)) => Err(Error::ClientDeleted { client }),
                Err(_) => {
                    if let Some(inner) = weak.upgrade() {
                        inner.scripts.borrow_mut().remove(&correlation_id);
                    }
                    Err(Error::timeout("script response", timeout))
                }
            }
        })
    }

    /// Queue `code` for the browser without waiting for its result.
    pub fn run_script_detached(&self, code: impl Into<String>) {
        self.enqueue_message(
            Outbound::RunScript {
                correlation_id: RequestId::generate(),
                code: code.into(),
            },
            Target::Client,
        );
    }

    /// Resolve a pending script call. Unknown correlation ids are ignored.
    pub fn script_response(&self, response: ScriptResponse) {
        let Some(sender) = self.inner.scripts.borrow_mut().remove(&response.correlation_id) else {
            tracing::trace!(client = %self.id(), id = %response.correlation_id, "script.unknown_response");
            return;
        };
        let result = match response.error {
            Some(message) => Err(Error::Script { message }),
            None => Ok(response.result.unwrap_or(Value::Null)),
        };
        let _ = sender.send(result);
    }

    #[must_use]
    pub fn pending_scripts(&self) -> usize {
        self.inner.scripts.borrow().len()
    }

    /// Page title used by the initial render, if one was set.
    #[must_use]
    pub fn title(&self) -> Option<String> {
        self.inner.title.borrow().clone()
    }

    /// Set the page title. Connected browsers are updated right away.
    pub fn set_title(&self, title: impl Into<String>) {
        let title = title.into();
        if self.has_socket_connection() {
            let literal = Value::String(title.clone()).to_string();
            self.run_script_detached(format!("document.title = {literal}"));
        }
        *self.inner.title.borrow_mut() = Some(title);
    }

    /// Ask the browser to open `path`, in a new tab when `new_tab` is set.
    pub fn open(&self, path: impl Into<String>, new_tab: bool) {
        self.enqueue_message(
            Outbound::Custom {
                kind: "open".to_string(),
                payload: serde_json::json!({ "path": path.into(), "new_tab": new_tab }),
            },
            Target::Client,
        );
    }

    /// Ask the browser to download `src`.
    pub fn download(&self, src: impl Into<String>, filename: Option<&str>, media_type: &str) {
        self.enqueue_message(
            Outbound::Custom {
                kind: "download".to_string(),
                payload: serde_json::json!({
                    "src": src.into(),
                    "filename": filename,
                    "media_type": media_type,
                }),
            },
            Target::Client,
        );
    }

    /// Show a toast on every socket of this client.
    pub fn notify(&self, options: NotifyOptions) {
        self.enqueue_message(Outbound::Notify { options }, Target::Client);
    }

    // ── Connection state ─────────────────────────────────────────────

    #[must_use]
    pub fn has_socket_connection(&self) -> bool {
        !self.inner.sockets.borrow().is_empty()
    }

    #[must_use]
    pub fn socket_count(&self) -> usize {
        self.inner.sockets.borrow().len()
    }

    /// Wait until a socket is attached.
    ///
    /// # Errors
    ///
    /// [`Error::Timeout`] after `timeout` (default: `connect_timeout`).
    pub async fn connected(&self, timeout: Option<Duration>) -> Result<()> {
        self.wait_connection(true, timeout.unwrap_or(self.inner.config.connect_timeout))
            .await
    }

    /// Wait until the last socket detached.
    pub async fn disconnected(&self, timeout: Option<Duration>) -> Result<()> {
        self.wait_connection(false, timeout.unwrap_or(self.inner.config.connect_timeout))
            .await
    }

    async fn wait_connection(&self, state: bool, timeout: Duration) -> Result<()> {
        if self.is_deleted() {
            return Err(Error::ClientDeleted { client: self.id() });
        }
        let mut rx = self.inner.connected.subscribe();
        let wait = async move { rx.wait_for(|connected| *connected == state).await.map(|_| ()) };
        match tokio::time::timeout(timeout, wait).await {
            Ok(Ok(())) => Ok(()),
            Ok(Err(_)) => Err(Error::ClientDeleted { client: self.id() }),
            Err(_) => Err(Error::timeout(
                if state { "client connection" } else { "client disconnection" },
                timeout,
            )),
        }
    }

    // ── Lifecycle hooks ──────────────────────────────────────────────

    pub fn on_connect(&self, hook: impl Fn(&Client) + 'static) {
        self.inner.connect_hooks.borrow_mut().push(Rc::new(hook));
    }

    pub fn on_disconnect(&self, hook: impl Fn(&Client) + 'static) {
        self.inner.disconnect_hooks.borrow_mut().push(Rc::new(hook));
    }

    pub fn on_delete(&self, hook: impl Fn(&Client) + 'static) {
        self.inner.delete_hooks.borrow_mut().push(Rc::new(hook));
    }

    /// Tear the client down: run delete hooks, cancel owned tasks, release
    /// every element and its binding links, and unregister.
    pub fn delete(&self) {
        if self.inner.deleted.replace(true) {
            return;
        }
        let hooks = self.inner.delete_hooks.borrow().clone();
        for hook in hooks {
            hook(self);
        }
        let report = self.inner.tasks.shutdown();

        let element_hooks: Vec<_> = {
            let mut tree = self.inner.tree.borrow_mut();
            tree.nodes
                .iter_mut()
                .map(|(id, node)| (*id, node.object, std::mem::take(&mut node.delete_hooks)))
                .collect()
        };
        for (id, object, hooks) in element_hooks {
            let element = Element::from_parts(self.id(), id, object);
            for hook in hooks {
                hook(element);
            }
        }
        let objects: Vec<ObjectId> = {
            let mut tree = self.inner.tree.borrow_mut();
            tree.nodes.drain().map(|(_, node)| node.object).collect()
        };
        let links = reactive::remove(objects.iter().copied());

        self.inner.scripts.borrow_mut().clear();
        self.inner.sockets.borrow_mut().clear();
        self.inner.connected.send_replace(false);
        CLIENTS.with(|clients| clients.borrow_mut().remove(&self.id()));
        SHARED.with(|shared| {
            let mut shared = shared.borrow_mut();
            if shared.as_ref() == Some(self) {
                *shared = None;
            }
        });
        tracing::debug!(
            client = %self.id(),
            elements = objects.len(),
            links,
            cancelled = report.cancelled,
            "client.delete"
        );
    }
}

fn upgrade(weak: &Weak<ClientInner>) -> Option<Client> {
    let inner = weak.upgrade()?;
    (!inner.deleted.get()).then_some(Client { inner })
}
