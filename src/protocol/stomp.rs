// SPDX-License-Identifier: MPL-2.0
// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.

//! STOMP 1.2 frame codec.
//!
//! Frames travel as WebSocket text messages. A message may hold several
//! NUL-terminated frames, and bare end-of-line characters between frames
//! are heart-beats.

use std::time::Duration;

use crate::error::ParseError;

/// Client frame commands.
pub mod command {
    pub const CONNECT: &str = "CONNECT";
    pub const SUBSCRIBE: &str = "SUBSCRIBE";
    pub const DISCONNECT: &str = "DISCONNECT";
    pub const CONNECTED: &str = "CONNECTED";
    pub const MESSAGE: &str = "MESSAGE";
    pub const RECEIPT: &str = "RECEIPT";
    pub const ERROR: &str = "ERROR";
}

/// Heart-beat sent on an idle connection.
pub const HEARTBEAT: &str = "\n";

/// A STOMP frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub command: String,
    /// Headers in wire order. Repeated headers are kept; the first wins.
    pub headers: Vec<(String, String)>,
    pub body: String,
}

impl Frame {
    /// Creates a frame without headers or body.
    #[must_use]
    pub fn new(command: impl Into<String>) -> Self {
        Self {
            command: command.into(),
            headers: Vec::new(),
            body: String::new(),
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.push((name.into(), value.into()));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }

    /// Returns the value of the first header with this name.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// Builds a `CONNECT` frame.
    ///
    /// `heartbeat` is `(outgoing, incoming)` in milliseconds.
    #[must_use]
    pub fn connect(login: &str, passcode: &str, heartbeat: (u64, u64)) -> Self {
        Self::new(command::CONNECT)
            .with_header("accept-version", "1.2,1.1,1.0")
            .with_header("login", login)
            .with_header("passcode", passcode)
            .with_header("heart-beat", format!("{},{}", heartbeat.0, heartbeat.1))
    }

    /// Builds a `SUBSCRIBE` frame.
    #[must_use]
    pub fn subscribe(id: &str, destination: &str) -> Self {
        Self::new(command::SUBSCRIBE)
            .with_header("id", id)
            .with_header("destination", destination)
            .with_header("ack", "auto")
    }

    /// Builds a `DISCONNECT` frame.
    #[must_use]
    pub fn disconnect() -> Self {
        Self::new(command::DISCONNECT)
    }

    /// Serializes the frame, NUL terminator included.
    #[must_use]
    pub fn encode(&self) -> String {
        let raw = skips_escaping(&self.command);
        let mut out = String::with_capacity(self.command.len() + self.body.len() + 64);
        out.push_str(&self.command);
        out.push('\n');
        for (name, value) in &self.headers {
            if raw {
                out.push_str(name);
                out.push(':');
                out.push_str(value);
            } else {
                out.push_str(&escape(name));
                out.push(':');
                out.push_str(&escape(value));
            }
            out.push('\n');
        }
        if !self.body.is_empty() && self.header("content-length").is_none() {
            out.push_str("content-length:");
            out.push_str(&self.body.len().to_string());
            out.push('\n');
        }
        out.push('\n');
        out.push_str(&self.body);
        out.push('\0');
        out
    }
}

/// Decodes every frame in a WebSocket text message.
///
/// Heart-beats are skipped, so a message holding only a heart-beat decodes
/// to no frame.
///
/// # Errors
///
/// Returns [`ParseError::MalformedFrame`] on a missing terminator, a header
/// line without a colon, a bad escape sequence or an invalid
/// `content-length`.
pub fn decode(text: &str) -> Result<Vec<Frame>, ParseError> {
    let mut frames = Vec::new();
    let mut rest = text;

    loop {
        rest = rest.trim_start_matches(['\r', '\n']);
        if rest.is_empty() {
            return Ok(frames);
        }
        let (frame, remaining) = decode_one(rest)?;
        frames.push(frame);
        rest = remaining;
    }
}

fn decode_one(input: &str) -> Result<(Frame, &str), ParseError> {
    let (command, mut rest) = split_line(input)
        .ok_or_else(|| ParseError::MalformedFrame("missing command line".to_string()))?;
    let command = command.to_string();
    let raw = skips_escaping(&command);

    let mut headers = Vec::new();
    loop {
        let (line, remaining) = split_line(rest)
            .ok_or_else(|| ParseError::MalformedFrame("unterminated headers".to_string()))?;
        rest = remaining;
        if line.is_empty() {
            break;
        }
        let (name, value) = line
            .split_once(':')
            .ok_or_else(|| ParseError::MalformedFrame(format!("header without colon: {line}")))?;
        if raw {
            headers.push((name.to_string(), value.to_string()));
        } else {
            headers.push((unescape(name)?, unescape(value)?));
        }
    }

    let content_length = headers
        .iter()
        .find(|(name, _)| name == "content-length")
        .map(|(_, value)| {
            value.parse::<usize>().map_err(|_| {
                ParseError::MalformedFrame(format!("invalid content-length: {value}"))
            })
        })
        .transpose()?;

    let (body, rest) = match content_length {
        Some(len) => {
            let body = rest.get(..len).ok_or_else(|| {
                ParseError::MalformedFrame(format!("body shorter than content-length {len}"))
            })?;
            let rest = rest[len..]
                .strip_prefix('\0')
                .ok_or_else(|| ParseError::MalformedFrame("missing NUL terminator".to_string()))?;
            (body, rest)
        }
        None => rest
            .split_once('\0')
            .ok_or_else(|| ParseError::MalformedFrame("missing NUL terminator".to_string()))?,
    };

    Ok((
        Frame {
            command,
            headers,
            body: body.to_string(),
        },
        rest,
    ))
}

fn split_line(input: &str) -> Option<(&str, &str)> {
    let (line, rest) = input.split_once('\n')?;
    Some((line.strip_suffix('\r').unwrap_or(line), rest))
}

fn skips_escaping(command: &str) -> bool {
    command == command::CONNECT || command == command::CONNECTED
}

fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            ':' => out.push_str("\\c"),
            c => out.push(c),
        }
    }
    out
}

fn unescape(value: &str) -> Result<String, ParseError> {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('\\') => out.push('\\'),
            Some('n') => out.push('\n'),
            Some('r') => out.push('\r'),
            Some('c') => out.push(':'),
            other => {
                return Err(ParseError::MalformedFrame(format!(
                    "invalid escape sequence: \\{}",
                    other.map(String::from).unwrap_or_default()
                )));
            }
        }
    }
    Ok(out)
}

/// Negotiates heart-beat intervals.
///
/// `client` is what the client offered as `(outgoing, incoming)` in
/// milliseconds; `server` is the `heart-beat` header of `CONNECTED`.
/// Returns `(outgoing, incoming)`, where `None` disables that direction.
#[must_use]
pub fn negotiate_heartbeat(
    client: (u64, u64),
    server: Option<&str>,
) -> (Option<Duration>, Option<Duration>) {
    let (server_out, server_in) = server
        .and_then(|value| value.split_once(','))
        .and_then(|(out, inc)| Some((out.trim().parse().ok()?, inc.trim().parse().ok()?)))
        .unwrap_or((0_u64, 0_u64));

    let pick = |ours: u64, theirs: u64| {
        (ours != 0 && theirs != 0).then(|| Duration::from_millis(ours.max(theirs)))
    };

    (pick(client.0, server_in), pick(client.1, server_out))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_frame_is_not_escaped() {
        let frame = Frame::connect("B-1", "tok:en", (5000, 5000));
        assert_eq!(
            frame.encode(),
            "CONNECT\naccept-version:1.2,1.1,1.0\nlogin:B-1\npasscode:tok:en\nheart-beat:5000,5000\n\n\0"
        );
    }

    #[test]
    fn subscribe_frame() {
        let frame = Frame::subscribe("sub-0", "jms.topic.B-1.data");
        assert_eq!(
            frame.encode(),
            "SUBSCRIBE\nid:sub-0\ndestination:jms.topic.B-1.data\nack:auto\n\n\0"
        );
    }

    #[test]
    fn headers_are_escaped() {
        let frame = Frame::new("SEND").with_header("k:ey", "a\\b\nc\r");
        assert_eq!(frame.encode(), "SEND\nk\\cey:a\\\\b\\nc\\r\n\n\0");

        let decoded = decode(&frame.encode()).unwrap();
        assert_eq!(decoded, vec![frame]);
    }

    #[test]
    fn body_gets_content_length() {
        let encoded = Frame::new("SEND").with_body("héllo").encode();
        assert_eq!(encoded, "SEND\ncontent-length:6\n\nhéllo\0");
    }

    #[test]
    fn decodes_message_with_json_body() {
        let text = "MESSAGE\nsubscription:sub-0\nmessage-id:42\ndestination:jms.topic.B.data\n\n{\"type\":\"IT_STATE\"}\0";
        let frames = decode(text).unwrap();

        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].command, command::MESSAGE);
        assert_eq!(frames[0].header("message-id"), Some("42"));
        assert_eq!(frames[0].body, "{\"type\":\"IT_STATE\"}");
    }

    #[test]
    fn decodes_several_frames_and_heartbeats() {
        let text = "\n\r\nRECEIPT\nreceipt-id:1\n\n\0\nMESSAGE\ncontent-length:3\n\na\0b\0\n";
        let frames = decode(text).unwrap();

        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].command, command::RECEIPT);
        assert_eq!(frames[1].body, "a\0b");
    }

    #[test]
    fn heartbeat_only_decodes_to_nothing() {
        assert!(decode("\n").unwrap().is_empty());
        assert!(decode("\r\n\n").unwrap().is_empty());
    }

    #[test]
    fn crlf_line_endings() {
        let frames = decode("CONNECTED\r\nversion:1.2\r\nheart-beat:0,0\r\n\r\n\0").unwrap();
        assert_eq!(frames[0].header("version"), Some("1.2"));
        assert_eq!(frames[0].header("heart-beat"), Some("0,0"));
    }

    #[test]
    fn first_repeated_header_wins() {
        let frames = decode("MESSAGE\nfoo:1\nfoo:2\n\n\0").unwrap();
        assert_eq!(frames[0].header("foo"), Some("1"));
    }

    #[test]
    fn malformed_frames() {
        for text in [
            "MESSAGE\nfoo:bar\n\nno terminator",
            "MESSAGE\nnocolon\n\n\0",
            "MESSAGE\nfoo:bad\\t\n\n\0",
            "MESSAGE\ncontent-length:x\n\n\0",
            "MESSAGE\ncontent-length:10\n\nshort\0",
            "MESSAGE\nfoo:bar",
        ] {
            assert!(
                matches!(decode(text), Err(ParseError::MalformedFrame(_))),
                "{text:?} should be rejected"
            );
        }
    }

    #[test]
    fn heartbeat_negotiation() {
        assert_eq!(
            negotiate_heartbeat((5000, 5000), Some("10000,1000")),
            (
                Some(Duration::from_millis(5000)),
                Some(Duration::from_millis(10000))
            )
        );
        assert_eq!(
            negotiate_heartbeat((5000, 5000), Some("0,0")),
            (None, None)
        );
        assert_eq!(negotiate_heartbeat((0, 5000), Some("4000,4000")).0, None);
        assert_eq!(negotiate_heartbeat((5000, 5000), None), (None, None));
        assert_eq!(negotiate_heartbeat((5000, 5000), Some("junk")), (None, None));
    }
}
