//! SMTP reply formatting

use std::io::{self, Write};

/// Reply codes used by the server
pub mod codes {
    pub const SERVICE_READY: u16 = 220;
    pub const SERVICE_CLOSING: u16 = 221;
    pub const OK: u16 = 250;
    pub const DATA_START: u16 = 354;
    pub const SERVICE_UNAVAILABLE: u16 = 421;
    pub const UNRECOGNIZED: u16 = 500;
    pub const SYNTAX_ERROR: u16 = 501;
    pub const NOT_IMPLEMENTED: u16 = 502;
    pub const BAD_SEQUENCE: u16 = 503;
    pub const INVALID_MAILBOX: u16 = 553;
}

/// Represents an SMTP reply that can be sent to a client
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SmtpResponse {
    /// The three digit reply code
    pub code: u16,
    /// The human-readable text; embedded newlines produce a multiline reply
    pub message: String,
}

impl SmtpResponse {
    /// Create a new SMTP reply
    pub fn new(code: u16, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }

    /// Create a multiline reply from its individual lines
    pub fn new_multiline(code: u16, lines: &[&str]) -> Self {
        Self::new(code, lines.join("\n"))
    }

    /// Create a success reply (250 OK)
    pub fn ok() -> Self {
        Self::new(codes::OK, "OK")
    }

    /// Create a greeting reply (220)
    pub fn greeting(hostname: &str) -> Self {
        Self::new(
            codes::SERVICE_READY,
            format!("{hostname} Simple Mail Transfer Service Ready"),
        )
    }

    /// Create a HELO reply (250)
    pub fn helo(hostname: &str) -> Self {
        Self::new(codes::OK, format!("HELO {hostname}"))
    }

    /// Create a DATA intermediate reply (354)
    pub fn data_start() -> Self {
        Self::new(codes::DATA_START, "start mail input; end with <CRLF>.<CRLF>")
    }

    /// Create a QUIT reply (221)
    pub fn quit() -> Self {
        Self::new(codes::SERVICE_CLOSING, "Service closing transmission channel")
    }

    /// Format the reply for sending over the wire.
    ///
    /// Every line but the last is `<code>-<text>`, the last is
    /// `<code> <text>`, and each one ends in CRLF.
    pub fn format(&self) -> String {
        let mut lines = self.message.split('\n').peekable();
        let mut result = String::new();
        while let Some(line) = lines.next() {
            let line = line.strip_suffix('\r').unwrap_or(line);
            let sep = if lines.peek().is_some() { '-' } else { ' ' };
            result.push_str(&format!("{}{sep}{line}\r\n", self.code));
        }
        result
    }

    /// Write the formatted reply and flush it to the client
    pub fn write_to<W: Write>(&self, writer: &mut W) -> io::Result<()> {
        writer.write_all(self.format().as_bytes())?;
        writer.flush()
    }

    /// Check if this is a success reply (2xx)
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.code)
    }

    /// Check if this is an error reply (4xx or 5xx)
    pub fn is_error(&self) -> bool {
        (400..600).contains(&self.code)
    }
}
