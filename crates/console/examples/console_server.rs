//! Serves a minimal console page on port 8080 and streams this process' log to it.
//!
//! Open <http://localhost:8080/> while the example runs. Messages typed into the page
//! are logged back, so they show up in every open console.

use std::time::Duration;

use tracing::{info, warn};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use wsconsole::Console;
use wsconsole::logging::ConsoleLayer;
use wsconsole::mount::StaticContent;

const INDEX_HTML: &str = r#"<!DOCTYPE html>
<html>
<head>
  <meta charset="utf-8">
  <title>wsconsole</title>
  <style>
    body { font-family: monospace; margin: 0; }
    #log { height: calc(100vh - 3em); overflow-y: auto; padding: 0.5em; }
    .error { color: #c00; } .warning { color: #b60; } .debug { color: #888; }
    form { display: flex; } input { flex: 1; }
  </style>
</head>
<body>
  <div id="log"></div>
  <form id="send"><input id="text" autocomplete="off"><button>send</button></form>
  <script>
    const log = document.getElementById("log");
    const socket = new WebSocket(`ws://${location.host}/ws`);
    socket.onmessage = (event) => {
      const entry = JSON.parse(event.data);
      const line = document.createElement("div");
      line.className = entry.level;
      line.textContent = `${new Date(entry.unix_time * 1000).toISOString()} [${entry.level}] ${entry.target}: ${entry.message}`;
      log.appendChild(line);
      log.scrollTop = log.scrollHeight;
    };
    document.getElementById("send").onsubmit = (event) => {
      event.preventDefault();
      const text = document.getElementById("text");
      socket.send(text.value);
      text.value = "";
    };
  </script>
</body>
</html>
"#;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let console = Console::builder().port(8080).mount(StaticContent::from_bytes("/index.html", INDEX_HTML)).build()?;
    let handle = console.handle();

    tracing_subscriber::registry().with(tracing_subscriber::fmt::layer()).with(ConsoleLayer::new(handle.clone())).init();

    let mut inbound = handle.subscribe();
    tokio::spawn(async move {
        while let Ok(received) = inbound.recv().await {
            match std::str::from_utf8(received.frame.payload()) {
                Ok(text) => info!(target: "console_server", session = %received.session, "page says: {text}"),
                Err(_e) => warn!(target: "console_server", session = %received.session, "binary message dropped"),
            }
        }
    });

    tokio::spawn(async {
        let mut ticks = tokio::time::interval(Duration::from_secs(2));
        for tick in 0u64.. {
            ticks.tick().await;
            info!(target: "console_server", tick, "still alive");
        }
    });

    let shutdown = handle.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            shutdown.shutdown();
        }
    });

    console.start().await?;
    Ok(())
}
