//! Embeddable websocket debug console.
//!
//! A [`Console`] serves a small set of files (the console page and its assets) over
//! plain HTTP and accepts websocket connections from that page. Everything published
//! through a [`ConsoleHandle`] is broadcast to all connected pages; installing a
//! [`ConsoleLayer`](logging::ConsoleLayer) publishes every `tracing` event.
//!
//! # Example
//!
//! ```no_run
//! use tracing_subscriber::layer::SubscriberExt;
//! use tracing_subscriber::util::SubscriberInitExt;
//! use wsconsole::logging::ConsoleLayer;
//! use wsconsole::mount::StaticContent;
//! use wsconsole::Console;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let console = Console::builder()
//!         .port(8080)
//!         .mount(StaticContent::from_bytes("/index.html", &b"<html>...</html>"[..]))
//!         .build()?;
//!
//!     tracing_subscriber::registry()
//!         .with(tracing_subscriber::fmt::layer())
//!         .with(ConsoleLayer::new(console.handle()))
//!         .init();
//!
//!     console.start().await?;
//!     Ok(())
//! }
//! ```

pub mod logging;
pub mod mount;
mod server;

pub use server::BoundConsole;
pub use server::BuildError;
pub use server::Console;
pub use server::ConsoleBuilder;
pub use server::ConsoleError;
pub use server::ConsoleHandle;

pub use wsconsole_http::connection::SessionConfig;
pub use wsconsole_http::handler::ContentProvider;
pub use wsconsole_http::protocol::OpCode;
pub use wsconsole_http::registry::InboundFrame;
