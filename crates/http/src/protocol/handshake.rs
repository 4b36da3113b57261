//! WebSocket opening handshake, server side.

use base64::Engine;
use sha1::{Digest, Sha1};

use crate::protocol::{ResponseHead, StatusLine, Utf8Bytes};

/// The fixed GUID appended to the client key (RFC 6455 section 1.3).
pub const WS_GUID: &str = "258EAFA5-E914-47DA-95CA-C5AB0DC85B11";

/// Computes `Sec-WebSocket-Accept`: Base64(SHA-1(key + GUID)).
pub fn accept_key(key: impl AsRef<[u8]>) -> Utf8Bytes {
    let mut hasher = Sha1::new();
    hasher.update(key.as_ref());
    hasher.update(WS_GUID.as_bytes());
    let hash = hasher.finalize();
    Utf8Bytes::from(base64::engine::general_purpose::STANDARD.encode(hash))
}

/// The `101 Switching Protocols` response head for the given client key.
pub fn upgrade_response(key: impl AsRef<[u8]>) -> ResponseHead {
    ResponseHead::new(StatusLine::SWITCHING_PROTOCOLS)
        .header("Upgrade", Utf8Bytes::from_static("websocket"))
        .header("Connection", Utf8Bytes::from_static("Upgrade"))
        .header("Sec-WebSocket-Accept", accept_key(key))
}
