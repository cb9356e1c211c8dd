//! Commands that can be sent to the board.
//!
//! The board supports several categories of commands:
//! - Housekeeping (ping, list, LED, reboot)
//! - Wi-Fi management (save, connect, disconnect, scan, addresses)
//! - HTTP requests, answered with a marker-delimited stream
//! - Device-side JSON extraction

use crate::codec::LineCodec;
use crate::error::{ProtocolError, ProtocolResult};
use crate::markers::HttpVerb;

/// How the board answers a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseShape {
    /// Nothing is sent back.
    None,
    /// A single status or payload line.
    Line,
    /// A status line, then a body terminated by the verb's end marker.
    Stream(HttpVerb),
}

/// Commands understood by the FlipperHTTP firmware.
///
/// Arguments that the board parses as JSON (`headers`, `payload`, `json`) are
/// passed through as literal text; the client never inspects them. String
/// arguments that the command embeds into JSON itself (`url`, `ssid`, `key`)
/// are escaped.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    // ========== Housekeeping ==========
    /// Check that the board is alive.
    Ping,

    /// Ask the board for its command list.
    List,

    /// Let the LED blink while the board is busy.
    LedOn,

    /// Keep the LED off while the board is busy.
    LedOff,

    /// Restart the board.
    Reboot,

    // ========== Wi-Fi ==========
    /// Connect to the saved network.
    WifiConnect,

    /// Disconnect from the current network.
    WifiDisconnect,

    /// Scan for nearby networks.
    WifiScan,

    /// List the saved network settings.
    WifiList,

    /// Get the public address seen from the connected network.
    WifiIp,

    /// Get the board's local address.
    IpAddress,

    /// Save network credentials on the board.
    WifiSave {
        /// Network name.
        ssid: String,
        /// Network password.
        password: String,
    },

    // ========== HTTP ==========
    /// Plain GET with no headers.
    Get {
        /// Target URL.
        url: String,
    },

    /// GET with headers.
    GetHttp {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
    },

    /// GET with headers, body returned as raw bytes by the board.
    GetBytes {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
    },

    /// POST with headers and a payload.
    PostHttp {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
        /// Request body as JSON literal text.
        payload: String,
    },

    /// POST with headers and a payload, body returned as raw bytes.
    PostBytes {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
        /// Request body as JSON literal text.
        payload: String,
    },

    /// PUT with headers and a payload.
    PutHttp {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
        /// Request body as JSON literal text.
        payload: String,
    },

    /// DELETE with headers and a payload.
    DeleteHttp {
        /// Target URL.
        url: String,
        /// Headers as a JSON object literal.
        headers: String,
        /// Request body as JSON literal text.
        payload: String,
    },

    // ========== JSON ==========
    /// Extract `key` from a JSON object on the board.
    Parse {
        /// Key to extract.
        key: String,
        /// JSON object literal.
        json: String,
    },

    /// Extract `key` from element `index` of a JSON array on the board.
    ParseArray {
        /// Key to extract.
        key: String,
        /// Array index.
        index: u32,
        /// JSON array literal.
        json: String,
    },

    // ========== Raw Command ==========
    /// Send a raw command string.
    Raw {
        /// The raw command text.
        command: String,
    },
}

impl Command {
    /// Label for logs and metrics.
    ///
    /// For every typed command this is the bracket tag that starts it on the
    /// wire. `Raw` is sent verbatim, so its `[RAW]` label never appears in
    /// the encoded bytes.
    pub fn tag(&self) -> &'static str {
        match self {
            Command::Ping => "[PING]",
            Command::List => "[LIST]",
            Command::LedOn => "[LED/ON]",
            Command::LedOff => "[LED/OFF]",
            Command::Reboot => "[REBOOT]",
            Command::WifiConnect => "[WIFI/CONNECT]",
            Command::WifiDisconnect => "[WIFI/DISCONNECT]",
            Command::WifiScan => "[WIFI/SCAN]",
            Command::WifiList => "[WIFI/LIST]",
            Command::WifiIp => "[WIFI/IP]",
            Command::IpAddress => "[IP/ADDRESS]",
            Command::WifiSave { .. } => "[WIFI/SAVE]",
            Command::Get { .. } => "[GET]",
            Command::GetHttp { .. } => "[GET/HTTP]",
            Command::GetBytes { .. } => "[GET/BYTES]",
            Command::PostHttp { .. } => "[POST/HTTP]",
            Command::PostBytes { .. } => "[POST/BYTES]",
            Command::PutHttp { .. } => "[PUT/HTTP]",
            Command::DeleteHttp { .. } => "[DELETE/HTTP]",
            Command::Parse { .. } => "[PARSE]",
            Command::ParseArray { .. } => "[PARSE/ARRAY]",
            Command::Raw { .. } => "[RAW]",
        }
    }

    /// The HTTP verb if this command is answered with a stream.
    pub fn http_verb(&self) -> Option<HttpVerb> {
        match self {
            Command::Get { .. } | Command::GetHttp { .. } | Command::GetBytes { .. } => {
                Some(HttpVerb::Get)
            }
            Command::PostHttp { .. } | Command::PostBytes { .. } => Some(HttpVerb::Post),
            Command::PutHttp { .. } => Some(HttpVerb::Put),
            Command::DeleteHttp { .. } => Some(HttpVerb::Delete),
            _ => None,
        }
    }

    /// How the board answers this command.
    pub fn response_shape(&self) -> ResponseShape {
        if let Some(verb) = self.http_verb() {
            return ResponseShape::Stream(verb);
        }
        match self {
            Command::LedOn | Command::LedOff | Command::Reboot => ResponseShape::None,
            _ => ResponseShape::Line,
        }
    }

    /// Check the arguments before anything is written.
    pub fn validate(&self) -> ProtocolResult<()> {
        let invalid = |reason: &str| ProtocolError::InvalidCommand {
            tag: self.tag(),
            reason: reason.to_string(),
        };

        match self {
            Command::WifiSave { ssid, password } => {
                if ssid.is_empty() {
                    return Err(invalid("ssid is empty"));
                }
                if password.is_empty() {
                    return Err(invalid("password is empty"));
                }
            }
            Command::Get { url }
            | Command::GetHttp { url, .. }
            | Command::GetBytes { url, .. }
            | Command::PostHttp { url, .. }
            | Command::PostBytes { url, .. }
            | Command::PutHttp { url, .. }
            | Command::DeleteHttp { url, .. } => {
                if url.is_empty() {
                    return Err(invalid("url is empty"));
                }
            }
            Command::Parse { key, .. } | Command::ParseArray { key, .. } => {
                if key.is_empty() {
                    return Err(invalid("key is empty"));
                }
            }
            Command::Raw { command } => {
                if command.is_empty() {
                    return Err(invalid("command is empty"));
                }
            }
            _ => {}
        }

        // One command, one line: an embedded newline would split it into two.
        if self.to_command_string().contains(['\r', '\n']) {
            return Err(invalid("argument contains a line break"));
        }

        Ok(())
    }

    /// Encode the command as a line to send to the board.
    /// Returns the bytes to send (including the `\n` terminator).
    pub fn encode(&self) -> Vec<u8> {
        let cmd_str = self.to_command_string();
        LineCodec::encode_command(&cmd_str)
    }

    /// The command string with secrets masked, for logging.
    pub fn to_log_string(&self) -> String {
        match self {
            Command::WifiSave { ssid, .. } => format!(
                "[WIFI/SAVE]{{\"ssid\":{},\"password\":\"***\"}}",
                json_string(ssid)
            ),
            _ => self.to_command_string(),
        }
    }

    /// Get the command string without the terminator.
    pub fn to_command_string(&self) -> String {
        match self {
            Command::WifiSave { ssid, password } => format!(
                "[WIFI/SAVE]{{\"ssid\":{},\"password\":{}}}",
                json_string(ssid),
                json_string(password)
            ),

            Command::Get { url } => format!("[GET]{}", url),
            Command::GetHttp { url, headers } | Command::GetBytes { url, headers } => format!(
                "{}{{\"url\":{},\"headers\":{}}}",
                self.tag(),
                json_string(url),
                json_literal(headers)
            ),
            Command::PostHttp { url, headers, payload }
            | Command::PostBytes { url, headers, payload }
            | Command::PutHttp { url, headers, payload }
            | Command::DeleteHttp { url, headers, payload } => format!(
                "{}{{\"url\":{},\"headers\":{},\"payload\":{}}}",
                self.tag(),
                json_string(url),
                json_literal(headers),
                json_literal(payload)
            ),

            Command::Parse { key, json } => format!(
                "[PARSE]{{\"key\":{},\"json\":{}}}",
                json_string(key),
                json_literal(json)
            ),
            Command::ParseArray { key, index, json } => format!(
                "[PARSE/ARRAY]{{\"key\":{},\"index\":{},\"json\":{}}}",
                json_string(key),
                index,
                json_literal(json)
            ),

            Command::Raw { command } => command.clone(),

            // Bare tags
            _ => self.tag().to_string(),
        }
    }
}

/// Quote and escape a string as a JSON string literal.
fn json_string(s: &str) -> String {
    serde_json::Value::from(s).to_string()
}

/// Pass JSON literal text through, substituting `{}` for blank input.
fn json_literal(s: &str) -> &str {
    let trimmed = s.trim();
    if trimmed.is_empty() {
        "{}"
    } else {
        trimmed
    }
}
