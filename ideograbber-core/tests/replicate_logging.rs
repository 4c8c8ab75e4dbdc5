use std::fmt::Write as _;
use std::sync::{Arc, Mutex};

use ideograbber_core::contract::{
    Destination, InMemoryContent, MockDestination, RemoteError, RemoteId, RemoteRejection,
};
use ideograbber_core::{Item, Location, ReplicationConfig, ReplicationEngine, SelectionSet};
use tracing::Level;
use tracing_subscriber::layer::Context;
use tracing_subscriber::prelude::*;
use tracing_subscriber::registry::LookupSpan;
use tracing_subscriber::{Layer, Registry};

#[derive(Debug, Clone)]
struct Captured {
    level: Level,
    span: Option<String>,
    text: String,
}

/// Custom Layer to collect emitted events along with their enclosing span.
struct EventCollector {
    events: Arc<Mutex<Vec<Captured>>>,
}

impl<S> Layer<S> for EventCollector
where
    S: tracing::Subscriber + for<'a> LookupSpan<'a>,
{
    fn on_event(&self, event: &tracing::Event<'_>, ctx: Context<'_, S>) {
        let mut text = String::new();
        let _ = write!(&mut text, "{:?}", event);
        self.events.lock().unwrap().push(Captured {
            level: *event.metadata().level(),
            span: ctx.event_span(event).map(|span| span.name().to_string()),
            text,
        });
    }
}

#[tokio::test]
async fn logs_successes_as_info_and_rejections_as_warnings_inside_injected_span() {
    let events = Arc::new(Mutex::new(Vec::new()));
    let subscriber = Registry::default().with(EventCollector {
        events: events.clone(),
    });
    let _guard = tracing::subscriber::set_default(subscriber);

    let mut dest = MockDestination::new();
    dest.expect_id().return_const(1u64);
    dest.expect_name().return_const("guild".to_string());
    dest.expect_create_emoji().returning(|req| {
        if req.name == "bad" {
            Err(RemoteError::Rejected(RemoteRejection::new(
                50035,
                "Invalid Form Body",
            )))
        } else {
            Ok(RemoteId(1))
        }
    });
    let destinations: Vec<Arc<dyn Destination>> = vec![Arc::new(dest)];
    let items = ["good", "bad"]
        .iter()
        .enumerate()
        .map(|(i, name)| {
            Item::emoji(
                i as u64,
                *name,
                false,
                Location::MessageBody,
                Arc::new(InMemoryContent(vec![1])),
            )
        })
        .collect();

    let engine = ReplicationEngine::new(ReplicationConfig::default())
        .with_span(tracing::info_span!("copy_batch"));
    let report = engine
        .replicate(&SelectionSet::new(items, destinations), "alice")
        .await
        .unwrap();
    assert_eq!(report.succeeded(), 1);

    let events = events.lock().unwrap();
    let copied = events
        .iter()
        .find(|e| e.text.contains("[REPLICATE] Copied"))
        .expect("success event");
    assert_eq!(copied.level, Level::INFO);
    assert_eq!(copied.span.as_deref(), Some("copy_batch"));

    let failed = events
        .iter()
        .find(|e| e.text.contains("[REPLICATE] Failed to copy"))
        .expect("failure event");
    assert_eq!(failed.level, Level::WARN);
    assert!(failed.text.contains("50035"), "{:?}", failed.text);
    assert_eq!(failed.span.as_deref(), Some("copy_batch"));
}
