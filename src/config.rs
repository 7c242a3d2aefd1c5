//! Command line configuration

use std::sync::Arc;

use structopt::StructOpt;
use tracing::warn;

use crate::smtp::error::DeliveryError;
use crate::smtp::mailer::{ConsoleMailer, HttpMailer, Mailer};
use crate::smtp::server::{ConsoleIo, IoLoop, SocketIo};

/// Name advertised when neither the flag nor the OS provide one
pub const FALLBACK_HOSTNAME: &str = "local";

#[derive(Debug, Clone, StructOpt)]
#[structopt(name = "smtpd", about = "A minimal RFC 821 SMTP server")]
pub struct Opt {
    /// Talk SMTP over stdin/stdout instead of listening on a socket
    #[structopt(long = "debug")]
    pub debug: bool,

    /// POST every received message as JSON to this URL instead of printing it
    #[structopt(long = "hook-url")]
    pub hook_url: Option<String>,

    /// Listening address
    #[structopt(long = "smtp-host", default_value = "localhost")]
    pub smtp_host: String,

    /// Listening port
    #[structopt(long = "smtp-port", default_value = "8025")]
    pub smtp_port: u16,

    /// Hostname used in the greeting and HELO reply (default: system hostname)
    #[structopt(long = "hostname")]
    pub hostname: Option<String>,

    /// Log filter directives, used when RUST_LOG is not set
    #[structopt(long = "log-filter", default_value = "info")]
    pub log_filter: String,
}

impl Opt {
    pub fn smtp_addr(&self) -> String {
        format!("{}:{}", self.smtp_host, self.smtp_port)
    }

    /// The configured hostname, else the system one
    pub fn resolve_hostname(&self) -> String {
        self.hostname.clone().unwrap_or_else(system_hostname)
    }

    pub fn io_loop(&self) -> Box<dyn IoLoop> {
        if self.debug {
            Box::new(ConsoleIo)
        } else {
            Box::new(SocketIo::new(self.smtp_addr()))
        }
    }

    pub fn mailer(&self) -> Result<Arc<dyn Mailer>, DeliveryError> {
        Ok(match &self.hook_url {
            Some(url) => Arc::new(HttpMailer::new(url.as_str())?),
            None => Arc::new(ConsoleMailer::stdout()),
        })
    }
}

/// Hostname reported by the OS, or [`FALLBACK_HOSTNAME`]
pub fn system_hostname() -> String {
    match nix::unistd::gethostname().map(|name| name.into_string()) {
        Ok(Ok(name)) if !name.is_empty() => name,
        Ok(Ok(_)) => {
            warn!("system hostname is empty, using {FALLBACK_HOSTNAME}");
            FALLBACK_HOSTNAME.to_string()
        }
        Ok(Err(_)) => {
            warn!("system hostname is not UTF-8, using {FALLBACK_HOSTNAME}");
            FALLBACK_HOSTNAME.to_string()
        }
        Err(e) => {
            warn!(error = %e, "failed to determine hostname, using {FALLBACK_HOSTNAME}");
            FALLBACK_HOSTNAME.to_string()
        }
    }
}
