//! Implementation of SMTP commands
//!
//! Each verb is a small [`Command`] that declares which verbs may follow
//! it and processes its own input lines. Instances are created fresh per
//! attempt by the [`CommandRegistry`](crate::smtp::registry::CommandRegistry),
//! so multi-line commands such as DATA can keep state between lines.

use std::fmt::Debug;
use std::io::Cursor;

use crate::smtp::error::SmtpError;
use crate::smtp::exchange::Exchange;
use crate::smtp::response::SmtpResponse;
use crate::smtp::verb::{MAIL_VERBS, Verb};

/// What a command allows to follow it once it has completed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Successors {
    /// The command neither checks nor changes the allowed verbs
    Stateless,
    Verbs(&'static [Verb]),
}

/// Result of feeding one line to a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub reply: Option<SmtpResponse>,
    /// The command has finished; `false` means it wants another line
    pub done: bool,
}

impl Step {
    pub fn done(reply: SmtpResponse) -> Self {
        Self {
            reply: Some(reply),
            done: true,
        }
    }

    pub fn more(reply: SmtpResponse) -> Self {
        Self {
            reply: Some(reply),
            done: false,
        }
    }

    pub fn pending() -> Self {
        Self {
            reply: None,
            done: false,
        }
    }
}

pub trait Command: Debug + Send {
    fn successors(&self) -> Successors;

    fn process(&mut self, line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError>;

    /// Whether the command may run in any state once HELO has succeeded,
    /// regardless of the allowed verbs
    fn allowed_after_greeting(&self) -> bool {
        false
    }
}

/// Strip `prefix` from the start of `line`, comparing case-insensitively.
/// The remainder keeps its original case.
pub(crate) fn strip_prefix_ignore_case<'a>(line: &'a str, prefix: &str) -> Option<&'a str> {
    let head = line.get(..prefix.len())?;
    head.eq_ignore_ascii_case(prefix)
        .then(|| &line[prefix.len()..])
}

/// Handle HELO command
#[derive(Debug, Default)]
pub struct HeloCommand;

impl Command for HeloCommand {
    fn successors(&self) -> Successors {
        Successors::Verbs(MAIL_VERBS)
    }

    fn process(&mut self, line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        let domain = strip_prefix_ignore_case(line, "HELO ")
            .map(str::trim)
            .filter(|domain| !domain.is_empty())
            .ok_or_else(|| SmtpError::Syntax("HELO <domain>".to_string()))?;

        exchange.set_domain(domain)?;
        Ok(Step::done(SmtpResponse::helo(exchange.hostname())))
    }
}

/// Handle MAIL and its aliases SEND, SAML and SOML
#[derive(Debug)]
pub struct MailCommand {
    verb: Verb,
}

impl MailCommand {
    pub fn new(verb: Verb) -> Self {
        Self { verb }
    }
}

impl Command for MailCommand {
    fn successors(&self) -> Successors {
        Successors::Verbs(&[Verb::Rcpt, Verb::Rset])
    }

    fn process(&mut self, line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        let prefix = format!("{} FROM:", self.verb);
        let address = strip_prefix_ignore_case(line, &prefix)
            .ok_or_else(|| SmtpError::Syntax(format!("{prefix}<address>")))?;

        // a new MAIL always starts a new transaction, even if the address is bad
        exchange.reset();
        exchange.set_sender(address)?;
        Ok(Step::done(SmtpResponse::ok()))
    }
}

/// Handle RCPT command
#[derive(Debug, Default)]
pub struct RcptCommand;

impl Command for RcptCommand {
    fn successors(&self) -> Successors {
        Successors::Verbs(&[Verb::Data, Verb::Rcpt, Verb::Rset])
    }

    fn process(&mut self, line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        let address = strip_prefix_ignore_case(line, "RCPT TO:")
            .ok_or_else(|| SmtpError::Syntax("RCPT TO:<address>".to_string()))?;

        exchange.add_recipient(address)?;
        Ok(Step::done(SmtpResponse::ok()))
    }
}

/// Handle RSET command
#[derive(Debug, Default)]
pub struct RsetCommand;

impl Command for RsetCommand {
    fn successors(&self) -> Successors {
        Successors::Verbs(&[Verb::Mail])
    }

    fn process(&mut self, _line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        exchange.reset();
        Ok(Step::done(SmtpResponse::ok()))
    }

    fn allowed_after_greeting(&self) -> bool {
        true
    }
}

/// Handle NOOP command
#[derive(Debug, Default)]
pub struct NoopCommand;

impl Command for NoopCommand {
    fn successors(&self) -> Successors {
        Successors::Stateless
    }

    fn process(&mut self, _line: &str, _exchange: &mut Exchange) -> Result<Step, SmtpError> {
        Ok(Step::done(SmtpResponse::ok()))
    }
}

/// Handle DATA command and the message content that follows it
#[derive(Debug, Default)]
pub struct DataCommand {
    started: bool,
    buffer: String,
}

impl DataCommand {
    fn append(&mut self, line: &str) {
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    fn finish(&mut self, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        let mut body = std::mem::take(&mut self.buffer);
        // the separator after the last line is an artifact of buffering
        if body.ends_with('\n') {
            body.pop();
        }

        exchange.set_body(Cursor::new(body.into_bytes()));
        if let Err(e) = exchange.complete() {
            self.started = false;
            return Err(e);
        }

        Ok(Step::done(SmtpResponse::ok()))
    }
}

impl Command for DataCommand {
    fn successors(&self) -> Successors {
        Successors::Verbs(MAIL_VERBS)
    }

    fn process(&mut self, line: &str, exchange: &mut Exchange) -> Result<Step, SmtpError> {
        if !self.started {
            self.started = true;
            return Ok(Step::more(SmtpResponse::data_start()));
        }

        match line.strip_prefix('.') {
            Some("") => self.finish(exchange),
            Some(unstuffed) => {
                self.append(unstuffed);
                Ok(Step::pending())
            }
            None => {
                self.append(line);
                Ok(Step::pending())
            }
        }
    }
}
