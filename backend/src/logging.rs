use tracing::{Event, Subscriber};
use tracing_subscriber::{layer::Context, Layer, EnvFilter, Registry};
use tracing_subscriber::prelude::*;

const DEFAULT_FILTER: &str = "warn,upgrade_server=info";

#[derive(Default)]
struct MessageVisitor(String);

impl tracing::field::Visit for MessageVisitor {
    fn record_debug(&mut self, field: &tracing::field::Field, value: &dyn std::fmt::Debug) {
        if field.name() == "message" {
            self.0.push_str(&format!("{:?}", value));
        }
    }

    fn record_str(&mut self, field: &tracing::field::Field, value: &str) {
        if field.name() == "message" {
            self.0.push_str(value);
        }
    }
}

struct CustomLayer;

impl<S: Subscriber> Layer<S> for CustomLayer {
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);
        if visitor.0.is_empty() {
            return;
        }

        let timestamp = chrono::Local::now().format("%Y-%m-%d %H:%M:%S%.3f");
        match *metadata.level() {
            tracing::Level::ERROR => println!("[{}] ❌ Error: {} - {}", timestamp, metadata.target(), visitor.0),
            tracing::Level::WARN => println!("[{}] ⚠️ Warning: {} - {}", timestamp, metadata.target(), visitor.0),
            tracing::Level::INFO => println!("[{}] ℹ️ {} - {}", timestamp, metadata.target(), visitor.0),
            tracing::Level::DEBUG => {
                // Settlement and socket chatter only
                if metadata.target().contains("services") || metadata.target().contains("games") {
                    println!("[{}] 🔄 {} - {}", timestamp, metadata.target(), visitor.0);
                }
            },
            _ => {}
        }
    }
}

pub fn setup() -> Result<(), tracing::subscriber::SetGlobalDefaultError> {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    let subscriber = Registry::default()
        .with(env_filter)
        .with(CustomLayer);

    tracing::subscriber::set_global_default(subscriber)
}
