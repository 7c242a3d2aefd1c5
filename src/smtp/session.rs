//! SMTP session state machine
//!
//! Interprets one connection line by line: resolves the verb, checks it
//! against the verbs allowed after the last completed command, and runs
//! it. A command that wants more input (DATA) receives every following
//! line directly until it finishes.

use std::borrow::Cow;
use std::io::{BufRead, Write};

use tracing::{debug, error, trace};

use crate::smtp::commands::{Command, Successors};
use crate::smtp::error::SmtpError;
use crate::smtp::exchange::Exchange;
use crate::smtp::registry::CommandRegistry;
use crate::smtp::response::SmtpResponse;
use crate::smtp::verb::Verb;

/// Whether a multi-line command is currently collecting input
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmtpState {
    AwaitingCommand,
    InCommand,
}

/// What the connection should do after a line was handled
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Flow {
    Continue(Option<SmtpResponse>),
    Close(SmtpResponse),
}

/// Manages the protocol state for a single connection
#[derive(Debug)]
pub struct SmtpSession<'r> {
    exchange: Exchange,
    registry: &'r CommandRegistry,
    allowed: Vec<Verb>,
    current: Option<Box<dyn Command>>,
}

impl<'r> SmtpSession<'r> {
    pub fn new(exchange: Exchange, registry: &'r CommandRegistry) -> Self {
        Self {
            exchange,
            registry,
            allowed: vec![Verb::Helo],
            current: None,
        }
    }

    pub fn state(&self) -> SmtpState {
        if self.current.is_some() {
            SmtpState::InCommand
        } else {
            SmtpState::AwaitingCommand
        }
    }

    /// Verbs accepted next, apart from stateless ones
    pub fn allowed(&self) -> &[Verb] {
        &self.allowed
    }

    pub fn exchange(&self) -> &Exchange {
        &self.exchange
    }

    pub fn greeting(&self) -> SmtpResponse {
        SmtpResponse::greeting(self.exchange.hostname())
    }

    /// Interpret one input line (without its line terminator)
    pub fn handle_line(&mut self, line: &str) -> Flow {
        if let Some(command) = self.current.take() {
            trace!(line, "command input");
            return Flow::Continue(self.process(command, line));
        }

        debug!(line, "command received");

        let Some(verb) = Verb::from_prefix(line) else {
            return Flow::Continue(Some(SmtpError::Unrecognized.to_response()));
        };

        if verb == Verb::Quit {
            return Flow::Close(SmtpResponse::quit());
        }

        let command = match self.registry.create(verb) {
            Ok(command) => command,
            Err(e) => return Flow::Continue(Some(e.to_response())),
        };

        if !self.can_run(verb, command.as_ref()) {
            debug!(%verb, allowed = ?self.allowed, "command out of sequence");
            return Flow::Continue(Some(SmtpError::BadSequence.to_response()));
        }

        Flow::Continue(self.process(command, line))
    }

    fn can_run(&self, verb: Verb, command: &dyn Command) -> bool {
        command.successors() == Successors::Stateless
            || self.allowed.contains(&verb)
            || (command.allowed_after_greeting() && self.exchange.domain().is_some())
    }

    fn process(&mut self, mut command: Box<dyn Command>, line: &str) -> Option<SmtpResponse> {
        match command.process(line, &mut self.exchange) {
            Ok(step) => {
                if !step.done {
                    self.current = Some(command);
                } else if let Successors::Verbs(next) = command.successors() {
                    if !next.is_empty() {
                        self.allowed = next.to_vec();
                    }
                }
                step.reply
            }
            Err(e) => {
                match &e {
                    SmtpError::Delivery(_) => error!(error = %e, "delivery failed"),
                    _ => debug!(error = %e, "command failed"),
                }
                Some(e.to_response())
            }
        }
    }

    /// Greet the client and serve it until QUIT or end of input.
    ///
    /// A failed read ends the session without a reply. A failed write is
    /// returned to the caller.
    pub fn run<R: BufRead, W: Write>(&mut self, mut reader: R, mut writer: W) -> Result<(), SmtpError> {
        self.greeting().write_to(&mut writer)?;

        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => {
                    debug!("client closed connection");
                    break;
                }
                Ok(_) => {}
                Err(e) => {
                    error!(error = %e, "error reading from client");
                    break;
                }
            }

            let line = decode_line(&buf);
            match self.handle_line(&line) {
                Flow::Continue(Some(response)) => response.write_to(&mut writer)?,
                Flow::Continue(None) => {}
                Flow::Close(response) => {
                    response.write_to(&mut writer)?;
                    break;
                }
            }
        }

        Ok(())
    }
}

/// Strip the line terminator (LF or CRLF) and decode, replacing invalid
/// UTF-8 sequences
fn decode_line(buf: &[u8]) -> Cow<'_, str> {
    let line = buf.strip_suffix(b"\n").unwrap_or(buf);
    let line = line.strip_suffix(b"\r").unwrap_or(line);
    String::from_utf8_lossy(line)
}
