//! Mailbox address parsing

use std::fmt;

use thiserror::Error;

use crate::smtp::domain::{is_address_literal, is_domain_name};

/// Mailbox size limits as defined in RFC 5321
pub struct SmtpLimits;

impl SmtpLimits {
    /// Maximum length of a user name (local part)
    pub const USER_MAX_LENGTH: usize = 64;

    /// Maximum length of a domain name
    pub const DOMAIN_MAX_LENGTH: usize = 255;

    /// Maximum length of a path (reverse-path or forward-path)
    pub const PATH_MAX_LENGTH: usize = 256;
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AddressError {
    #[error("invalid mailbox syntax: empty address")]
    Empty,

    #[error("invalid mailbox syntax: missing @ in address")]
    MissingAt,

    #[error("invalid mailbox syntax: unterminated path")]
    UnterminatedPath,

    #[error("invalid mailbox syntax: bad local part")]
    InvalidLocalPart,

    #[error("invalid mailbox syntax: bad domain")]
    InvalidDomain,

    #[error("User name too long (max {max} characters)")]
    UserTooLong { max: usize },

    #[error("Domain name too long (max {max} characters)")]
    DomainTooLong { max: usize },

    #[error("Path too long (max {max} characters)")]
    PathTooLong { max: usize },
}

/// A parsed mailbox address
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Address {
    pub display_name: Option<String>,
    pub local_part: String,
    pub domain: String,
}

impl Address {
    /// The bare `local@domain` form
    pub fn addr_spec(&self) -> String {
        format!("{}@{}", self.local_part, self.domain)
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.display_name {
            Some(name) => write!(f, "\"{name}\" <{}>", self.addr_spec()),
            None => write!(f, "<{}>", self.addr_spec()),
        }
    }
}

/// Turns the raw argument of MAIL/RCPT into a structured address
pub trait AddressParser: Send + Sync {
    fn parse(&self, raw: &str) -> Result<Address, AddressError>;
}

/// Default parser accepting `local@domain`, `<local@domain>` and
/// `Name <local@domain>`
#[derive(Debug, Default, Clone, Copy)]
pub struct MailboxParser;

impl AddressParser for MailboxParser {
    fn parse(&self, raw: &str) -> Result<Address, AddressError> {
        let raw = raw.trim();
        if raw.is_empty() {
            return Err(AddressError::Empty);
        }

        if raw.len() > SmtpLimits::PATH_MAX_LENGTH {
            return Err(AddressError::PathTooLong {
                max: SmtpLimits::PATH_MAX_LENGTH,
            });
        }

        let (display_name, spec) = if let Some(rest) = raw.strip_suffix('>') {
            let open = rest.rfind('<').ok_or(AddressError::UnterminatedPath)?;
            let name = rest[..open].trim();
            let name = (!name.is_empty()).then(|| unquote(name));
            (name, &rest[open + 1..])
        } else if raw.starts_with('<') {
            return Err(AddressError::UnterminatedPath);
        } else {
            (None, raw)
        };

        let (local_part, domain) = split_addr_spec(spec)?;
        validate_local_part(local_part)?;
        validate_domain(domain)?;

        Ok(Address {
            display_name,
            local_part: local_part.to_string(),
            domain: domain.to_string(),
        })
    }
}

fn unquote(name: &str) -> String {
    name.strip_prefix('"')
        .and_then(|n| n.strip_suffix('"'))
        .unwrap_or(name)
        .to_string()
}

/// Split at the `@` that separates local part and domain, honouring a
/// quoted local part that may itself contain `@`.
fn split_addr_spec(spec: &str) -> Result<(&str, &str), AddressError> {
    if spec.is_empty() {
        return Err(AddressError::Empty);
    }

    if spec.starts_with('"') {
        let end = closing_quote(spec).ok_or(AddressError::InvalidLocalPart)?;
        let (local, rest) = spec.split_at(end + 1);
        let domain = rest.strip_prefix('@').ok_or(AddressError::MissingAt)?;
        return Ok((local, domain));
    }

    spec.rsplit_once('@').ok_or(AddressError::MissingAt)
}

fn closing_quote(s: &str) -> Option<usize> {
    let mut escaped = false;
    for (i, c) in s.char_indices().skip(1) {
        match c {
            _ if escaped => escaped = false,
            '\\' => escaped = true,
            '"' => return Some(i),
            _ => {}
        }
    }
    None
}

fn is_atext(c: char) -> bool {
    c.is_ascii_alphanumeric() || "!#$%&'*+-/=?^_`{|}~".contains(c)
}

fn validate_local_part(local: &str) -> Result<(), AddressError> {
    if local.is_empty() {
        return Err(AddressError::InvalidLocalPart);
    }

    if local.len() > SmtpLimits::USER_MAX_LENGTH {
        return Err(AddressError::UserTooLong {
            max: SmtpLimits::USER_MAX_LENGTH,
        });
    }

    if let Some(inner) = local.strip_prefix('"').and_then(|l| l.strip_suffix('"')) {
        let printable = inner.chars().all(|c| c == ' ' || c.is_ascii_graphic());
        return if printable {
            Ok(())
        } else {
            Err(AddressError::InvalidLocalPart)
        };
    }

    let dot_atom = local
        .split('.')
        .all(|atom| !atom.is_empty() && atom.chars().all(is_atext));
    if dot_atom {
        Ok(())
    } else {
        Err(AddressError::InvalidLocalPart)
    }
}

fn validate_domain(domain: &str) -> Result<(), AddressError> {
    if domain.len() > SmtpLimits::DOMAIN_MAX_LENGTH {
        return Err(AddressError::DomainTooLong {
            max: SmtpLimits::DOMAIN_MAX_LENGTH,
        });
    }

    if is_domain_name(domain) || is_address_literal(domain) {
        Ok(())
    } else {
        Err(AddressError::InvalidDomain)
    }
}
