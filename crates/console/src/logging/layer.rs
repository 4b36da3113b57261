use std::cell::Cell;
use std::fmt;
use std::fmt::Write as _;

use tracing::field::{Field, Visit};
use tracing::{Event, Subscriber, debug};
use tracing_subscriber::Layer;
use tracing_subscriber::layer::Context;

use crate::ConsoleHandle;
use crate::logging::{JsonFormatter, LogEntry, LogFormatter};

/// Crates whose events are never forwarded; they are emitted while publishing.
const OWN_CRATES: [&str; 2] = ["wsconsole", "wsconsole_http"];

thread_local! {
    static PUBLISHING: Cell<bool> = const { Cell::new(false) };
}

/// A [`Layer`] broadcasting every event to the pages connected to a console.
///
/// ```no_run
/// # fn install(handle: wsconsole::ConsoleHandle) {
/// use tracing_subscriber::layer::SubscriberExt;
/// use tracing_subscriber::util::SubscriberInitExt;
///
/// tracing_subscriber::registry()
///     .with(tracing_subscriber::fmt::layer())
///     .with(wsconsole::logging::ConsoleLayer::new(handle))
///     .init();
/// # }
/// ```
pub struct ConsoleLayer<F = JsonFormatter> {
    handle: ConsoleHandle,
    formatter: F,
}

impl ConsoleLayer {
    /// A layer publishing through `handle` with the [`JsonFormatter`].
    pub fn new(handle: ConsoleHandle) -> Self {
        Self { handle, formatter: JsonFormatter }
    }
}

impl<F: LogFormatter> ConsoleLayer<F> {
    /// Replaces the formatter turning entries into websocket messages.
    pub fn with_formatter<G: LogFormatter>(self, formatter: G) -> ConsoleLayer<G> {
        ConsoleLayer { handle: self.handle, formatter }
    }

    fn publish(&self, entry: &LogEntry) {
        match self.formatter.format(entry) {
            Ok(bytes) => {
                self.handle.publish(self.formatter.opcode(), &bytes);
            }
            Err(e) => debug!(cause = %e, "failed to format log entry"),
        }
    }
}

impl<F> fmt::Debug for ConsoleLayer<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConsoleLayer").field("handle", &self.handle).finish_non_exhaustive()
    }
}

impl<S, F> Layer<S> for ConsoleLayer<F>
where
    S: Subscriber,
    F: LogFormatter + 'static,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        if is_own_target(metadata.target()) || self.handle.session_count() == 0 {
            return;
        }

        let Some(_guard) = PublishGuard::enter() else {
            return;
        };

        let mut visitor = MessageVisitor::default();
        event.record(&mut visitor);

        let entry = LogEntry::new(metadata.level().into(), metadata.target(), visitor.finish())
            .with_location(metadata.file(), metadata.line());
        self.publish(&entry);
    }
}

/// True for the crates themselves and their modules, not for other crates sharing the prefix.
fn is_own_target(target: &str) -> bool {
    OWN_CRATES
        .iter()
        .any(|name| target.strip_prefix(name).is_some_and(|rest| rest.is_empty() || rest.starts_with("::")))
}

/// Marks the current thread as publishing; events raised meanwhile are dropped.
struct PublishGuard;

impl PublishGuard {
    fn enter() -> Option<Self> {
        (!PUBLISHING.with(|publishing| publishing.replace(true))).then_some(PublishGuard)
    }
}

impl Drop for PublishGuard {
    fn drop(&mut self) {
        PUBLISHING.with(|publishing| publishing.set(false));
    }
}

#[derive(Default)]
struct MessageVisitor {
    message: String,
    fields: String,
}

impl MessageVisitor {
    fn finish(mut self) -> String {
        if !self.fields.is_empty() {
            if !self.message.is_empty() {
                self.message.push(' ');
            }
            self.message.push_str(&self.fields);
        }
        self.message
    }

    fn field_separator(&mut self) {
        if !self.fields.is_empty() {
            self.fields.push(' ');
        }
    }
}

impl Visit for MessageVisitor {
    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message.push_str(value);
        } else {
            self.field_separator();
            let _ = write!(self.fields, "{}={value}", field.name());
        }
    }

    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            let _ = write!(self.message, "{value:?}");
        } else {
            self.field_separator();
            let _ = write!(self.fields, "{}={value:?}", field.name());
        }
    }
}
