//! Mail transaction state for a single connection

use std::fmt;
use std::io::{self, Read};
use std::sync::Arc;

use tracing::info;

use crate::smtp::address::{Address, AddressParser};
use crate::smtp::domain::is_valid_helo_domain;
use crate::smtp::error::{DeliveryError, SmtpError};
use crate::smtp::mailer::{Mail, Mailer};

/// Holds what the client has told us so far: the HELO identity and the
/// sender, recipients and body of the current transaction.
pub struct Exchange {
    hostname: String,
    mailer: Arc<dyn Mailer>,
    parser: Arc<dyn AddressParser>,

    domain: Option<String>,
    sender: Option<Address>,
    recipients: Vec<Address>,
    body: Option<Box<dyn Read + Send>>,
}

impl Exchange {
    pub fn new(
        hostname: impl Into<String>,
        mailer: Arc<dyn Mailer>,
        parser: Arc<dyn AddressParser>,
    ) -> Self {
        Self {
            hostname: hostname.into(),
            mailer,
            parser,
            domain: None,
            sender: None,
            recipients: Vec::new(),
            body: None,
        }
    }

    /// The name this server advertises
    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// The client identity from the last successful HELO
    pub fn domain(&self) -> Option<&str> {
        self.domain.as_deref()
    }

    pub fn sender(&self) -> Option<&Address> {
        self.sender.as_ref()
    }

    pub fn recipients(&self) -> &[Address] {
        &self.recipients
    }

    /// Record the client identity. On failure the previous value stays.
    pub fn set_domain(&mut self, name: &str) -> Result<(), SmtpError> {
        if !is_valid_helo_domain(name) {
            return Err(SmtpError::InvalidDomain);
        }

        self.domain = Some(name.to_string());
        Ok(())
    }

    /// Replace the sender. Does not clear recipients; MAIL resets first.
    pub fn set_sender(&mut self, raw: &str) -> Result<(), SmtpError> {
        let addr = self.parser.parse(raw)?;
        self.sender = Some(addr);
        Ok(())
    }

    /// Append a recipient. Duplicates are kept, order is preserved.
    pub fn add_recipient(&mut self, raw: &str) -> Result<(), SmtpError> {
        let addr = self.parser.parse(raw)?;
        self.recipients.push(addr);
        Ok(())
    }

    pub fn set_body(&mut self, body: impl Read + Send + 'static) {
        self.body = Some(Box::new(body));
    }

    /// Hand the transaction to the mailer and reset it.
    ///
    /// The body is consumed either way. When delivery fails, sender and
    /// recipients are kept so the client may retry DATA.
    pub fn complete(&mut self) -> Result<(), SmtpError> {
        let body = self
            .body
            .take()
            .unwrap_or_else(|| Box::new(io::empty()));
        let from = self.sender.clone().ok_or(DeliveryError::MissingSender)?;
        if self.recipients.is_empty() {
            return Err(DeliveryError::NoRecipients.into());
        }

        let mail = Mail {
            from,
            to: self.recipients.clone(),
            body,
        };
        let from = mail.from.addr_spec();
        let recipients = mail.to.len();
        self.mailer.send(mail)?;

        info!(%from, recipients, "message delivered");
        self.reset();
        Ok(())
    }

    /// Clear the transaction. The HELO identity persists.
    pub fn reset(&mut self) {
        self.sender = None;
        self.recipients.clear();
        self.body = None;
    }
}

impl fmt::Debug for Exchange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Exchange")
            .field("hostname", &self.hostname)
            .field("domain", &self.domain)
            .field("sender", &self.sender)
            .field("recipients", &self.recipients)
            .field("has_body", &self.body.is_some())
            .finish_non_exhaustive()
    }
}
