//! App-wide hooks and lifecycle phases.

use std::cell::RefCell;
use std::future::Future;
use std::rc::Rc;

use fweb_core::{Config, Error, SocketId};
use fweb_dom::{App, AppState, Client};
use pretty_assertions::assert_eq;
use tokio::sync::mpsc;

fn run(future: impl Future<Output = ()>) {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_time()
        .start_paused(true)
        .build()
        .expect("runtime");
    tokio::task::LocalSet::new().block_on(&runtime, future);
}

type Log = Rc<RefCell<Vec<String>>>;

fn record(log: &Log, entry: impl Into<String>) {
    log.borrow_mut().push(entry.into());
}

#[test]
fn startup_and_shutdown_hooks_bracket_the_app() {
    run(async {
        let app = App::new(Config::default()).unwrap();
        let log = Log::default();
        let seen = Rc::clone(&log);
        app.on_startup(move |app| record(&seen, format!("startup {:?}", app.state())))
            .unwrap();
        let seen = Rc::clone(&log);
        app.on_shutdown(move |app| record(&seen, format!("shutdown pages={}", app.pages().len())));
        assert_eq!(app.state(), AppState::Created);

        app.start();
        app.start();
        assert_eq!(app.state(), AppState::Started);
        assert!(matches!(app.on_startup(|_| {}), Err(Error::Context { .. })));

        let page = app.new_page();
        app.shutdown();
        assert!(page.is_deleted());
        assert_eq!(*log.borrow(), ["startup Started", "shutdown pages=1"]);
    });
}

#[test]
fn app_hooks_see_connections_of_every_page() {
    run(async {
        let app = App::new(Config::default()).unwrap();
        let first = app.new_page();
        let log = Log::default();
        let seen = Rc::clone(&log);
        app.on_connect(move |client: &Client| record(&seen, format!("connect {}", client.id())));
        let seen = Rc::clone(&log);
        app.on_disconnect(move |client: &Client| record(&seen, format!("disconnect {}", client.id())));
        let second = app.new_page();

        let mut sockets = Vec::new();
        for client in [&first, &second] {
            let socket = SocketId::next();
            let (tx, rx) = mpsc::unbounded_channel();
            client.handle_handshake(socket, tx, None).unwrap();
            sockets.push((socket, rx));
        }
        first.handle_disconnect(sockets[0].0);

        assert_eq!(
            *log.borrow(),
            [
                format!("connect {}", first.id()),
                format!("connect {}", second.id()),
                format!("disconnect {}", first.id()),
            ]
        );
    });
}

#[test]
fn plain_clients_are_not_reported_to_app_hooks() {
    run(async {
        let app = App::new(Config::default()).unwrap();
        let count = Rc::new(std::cell::Cell::new(0));
        let seen = Rc::clone(&count);
        app.on_connect(move |_| seen.set(seen.get() + 1));

        let outside = Client::new(fweb_dom::ClientKind::Page, Config::default());
        let (tx, _rx) = mpsc::unbounded_channel();
        outside.handle_handshake(SocketId::next(), tx, None).unwrap();
        assert_eq!(count.get(), 0);

        let (tx, _rx) = mpsc::unbounded_channel();
        app.shared().handle_handshake(SocketId::next(), tx, None).unwrap();
        assert_eq!(count.get(), 1);
    });
}
