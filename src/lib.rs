//! # smtpd
//!
//! A minimal RFC 821 SMTP server. It accepts mail and hands every
//! message to a pluggable [`Mailer`].
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use smtpd::{ChannelMailer, SmtpServer};
//! use std::sync::mpsc;
//! use std::thread;
//! use std::time::Duration;
//!
//! let (tx, rx) = mpsc::channel();
//! let server = SmtpServer::new("test.local").with_mailer(ChannelMailer::new(tx));
//!
//! thread::spawn(move || {
//!     server.start("127.0.0.1:2525").unwrap();
//! });
//!
//! // Application sends email to localhost:2525
//! // ...
//!
//! if let Ok(email) = rx.recv_timeout(Duration::from_millis(100)) {
//!     println!("Received email from: {}", email.from);
//! }
//! ```
//!
//! ## Supported SMTP commands
//!
//! - `HELO` - Identify the client
//! - `MAIL FROM` - Specify the sender's address (`SEND`, `SAML` and `SOML`
//!   are accepted as synonyms)
//! - `RCPT TO` - Specify the destination (multiple destinations are supported)
//! - `DATA` - Send the email body
//! - `RSET` - Reset the current transaction
//! - `NOOP` - Do nothing
//! - `QUIT` - Close connection
//!
//! `EHLO`, `VRFY`, `EXPN` and `HELP` are recognized and answered with 502.
//! The command set can be changed through [`CommandRegistry`].
//!
//! ## Delivery
//!
//! - [`ConsoleMailer`] prints messages to stdout (the default)
//! - [`HttpMailer`] posts them as JSON to a webhook
//! - [`ChannelMailer`] sends them to an `mpsc` channel, handy in tests
//!
//! ## Notes
//!
//! - Runs in-memory only. Email persistence is not supported.
//! - SMTP authentication is not supported.
//! - SSL/TLS connection is not supported.
//! - Mail relay is not supported.

pub mod config;
mod smtp;

pub use smtp::{
    Address, AddressError, AddressParser, ChannelMailer, Command, CommandFactory,
    CommandRegistry, ConsoleIo, ConsoleMailer, DeliveryError, Email, Exchange, Flow, HttpMailer,
    IoLoop, Mail, MailboxParser, Mailer, SmtpError, SmtpLimits, SmtpResponse, SmtpServer,
    SmtpSession, SmtpState, SocketIo, Step, Successors, Verb,
};
