#![forbid(unsafe_code)]

//! Periodic refresh of polled links.
//!
//! Each pass reads the source of every polled link, compares it with the
//! snapshot taken after the previous pass, and runs one propagation pass per
//! changed source vertex. Sources shared by several links are propagated
//! once.
//!
//! The pass runs on the same thread as UI work, so a slow pass is reported
//! with a `WARN` event carrying the link count and the elapsed time.

use std::rc::Rc;
use std::time::Duration;

use ahash::AHashSet;
use web_time::Instant;

use fweb_core::Config;

use super::bindable::{Bindable, NodeKey};
use super::graph::{self, with_graph};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshConfig {
    pub interval: Duration,
    /// Passes slower than this emit a warning.
    pub max_propagation_time: Duration,
}

impl Default for RefreshConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for RefreshConfig {
    fn from(config: &Config) -> Self {
        Self {
            interval: config.binding_refresh_interval,
            max_propagation_time: config.max_propagation_time,
        }
    }
}

/// Outcome of one refresh pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RefreshReport {
    pub polled_links: usize,
    pub changed_sources: usize,
    pub elapsed: Duration,
    /// The pass exceeded `max_propagation_time`.
    pub slow: bool,
}

/// Run one refresh pass over all polled links of the current thread.
pub fn refresh_step(config: &RefreshConfig) -> RefreshReport {
    let started = Instant::now();

    // (source vertex, source handle, snapshot) per polled link.
    let polled: Vec<(NodeKey, Rc<dyn Bindable>, Option<serde_json::Value>)> = with_graph(|g| {
        g.links
            .values()
            .filter_map(|link| {
                let snapshot = link.snapshot.clone()?;
                let handle = g.handle(link.source.object)?;
                Some((link.source.clone(), handle, snapshot))
            })
            .collect()
    });

    let mut changed: Vec<(NodeKey, Rc<dyn Bindable>)> = Vec::new();
    let mut seen = AHashSet::new();
    for (key, handle, snapshot) in &polled {
        if seen.contains(key) || !handle.is_alive() {
            continue;
        }
        if handle.read(&key.attr) != *snapshot {
            seen.insert(key.clone());
            changed.push((key.clone(), Rc::clone(handle)));
        }
    }

    for (key, handle) in &changed {
        graph::propagate(key.object, &key.attr);
        graph::snapshot_sources(handle, &key.attr);
    }

    let elapsed = started.elapsed();
    let report = RefreshReport {
        polled_links: polled.len(),
        changed_sources: changed.len(),
        elapsed,
        slow: elapsed > config.max_propagation_time,
    };
    if report.slow {
        tracing::warn!(
            polled_links = report.polled_links,
            changed_sources = report.changed_sources,
            elapsed_ms = elapsed.as_secs_f64() * 1000.0,
            threshold_ms = config.max_propagation_time.as_secs_f64() * 1000.0,
            "binding refresh pass exceeded its time budget; consider instrumented \
             properties instead of polled links"
        );
    }
    report
}

/// Run [`refresh_step`] every `config.interval`, forever.
///
/// Spawn it on the runtime thread (e.g. with `tokio::task::spawn_local`);
/// cancel it by aborting the task.
pub async fn refresh_loop(config: RefreshConfig) {
    let mut ticker = tokio::time::interval(config.interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    loop {
        ticker.tick().await;
        refresh_step(&config);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reactive::{Accessor, Observable, ValueMap, bind_to, reset};
    use serde_json::json;
    use std::cell::Cell;
    use std::sync::{Arc, Mutex};
    use tracing::Subscriber;
    use tracing_subscriber::Layer;
    use tracing_subscriber::layer::{Context, SubscriberExt};

    #[test]
    fn polled_change_propagates_once_per_source() {
        reset();
        let map = ValueMap::new();
        map.insert("count", json!(1));
        let a = Observable::new(0i64);
        let b = Observable::new(0i64);
        bind_to(&map, "count", &a, "value", None);
        bind_to(&map, "count", &b, "value", None);
        assert_eq!((a.get(), b.get()), (1, 1));

        let quiet = refresh_step(&RefreshConfig::default());
        assert_eq!(quiet.polled_links, 2);
        assert_eq!(quiet.changed_sources, 0);

        map.insert("count", json!(5));
        let report = refresh_step(&RefreshConfig::default());
        assert_eq!(report.changed_sources, 1);
        assert_eq!((a.get(), b.get()), (5, 5));

        let again = refresh_step(&RefreshConfig::default());
        assert_eq!(again.changed_sources, 0);
    }

    #[test]
    fn instrumented_sources_are_not_polled() {
        reset();
        let a = Observable::new(1i64);
        let map = ValueMap::new();
        bind_to(&a, "value", &map, "x", None);
        assert_eq!(refresh_step(&RefreshConfig::default()).polled_links, 0);
        assert_eq!(map.get("x"), Some(json!(1)));
    }

    #[derive(Default)]
    struct WarnCapture {
        warnings: Arc<Mutex<Vec<String>>>,
    }

    impl<S: Subscriber> Layer<S> for WarnCapture {
        fn on_event(&self, event: &tracing::Event<'_>, _ctx: Context<'_, S>) {
            if *event.metadata().level() != tracing::Level::WARN {
                return;
            }
            struct Msg(Option<String>);
            impl tracing::field::Visit for Msg {
                fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
                    if field.name() == "message" {
                        self.0 = Some(format!("{value:?}"));
                    }
                }
            }
            let mut msg = Msg(None);
            event.record(&mut msg);
            if let Some(text) = msg.0 {
                self.warnings.lock().expect("capture lock").push(text);
            }
        }
    }

    #[test]
    fn slow_pass_emits_warning() {
        reset();
        let warnings = Arc::new(Mutex::new(Vec::new()));
        let subscriber = tracing_subscriber::registry().with(WarnCapture {
            warnings: Arc::clone(&warnings),
        });
        let _guard = tracing::subscriber::set_default(subscriber);

        let tick = Rc::new(Cell::new(0i64));
        let t = Rc::clone(&tick);
        let slow = Accessor::new(
            move |_| {
                std::thread::sleep(Duration::from_millis(3));
                Some(json!(t.get()))
            },
            |_, _| Ok(()),
        );
        let sink = Observable::new(0i64);
        bind_to(&slow, "v", &sink, "value", None);
        tick.set(1);

        let config = RefreshConfig {
            interval: Duration::from_millis(100),
            max_propagation_time: Duration::from_millis(1),
        };
        let report = refresh_step(&config);
        assert!(report.slow);
        assert_eq!(sink.get(), 1);
        let captured = warnings.lock().expect("capture lock");
        assert!(
            captured.iter().any(|m| m.contains("exceeded its time budget")),
            "expected slow-pass warning, got {captured:?}"
        );
    }
}
