//! Received message records

use std::time::SystemTime;

use crate::smtp::address::Address;

/// A message as handed over by a completed mail transaction
#[derive(Debug, Clone)]
pub struct Email {
    /// The reverse-path from MAIL
    pub from: Address,

    /// Forward-paths from RCPT, in arrival order
    pub to: Vec<Address>,

    /// The unstuffed message content, lines separated by `\n`
    pub data: String,

    /// When the transaction completed
    pub timestamp: SystemTime,
}

impl Email {
    pub fn new(from: Address, to: Vec<Address>, data: String) -> Self {
        Self {
            from,
            to,
            data,
            timestamp: SystemTime::now(),
        }
    }

    /// Check if this email was addressed to `recipient` (`local@domain`)
    pub fn has_recipient(&self, recipient: &str) -> bool {
        self.to.iter().any(|addr| addr.addr_spec() == recipient)
    }

    /// Recipient addresses in `local@domain` form
    pub fn recipients(&self) -> Vec<String> {
        self.to.iter().map(Address::addr_spec).collect()
    }

    pub fn data_size(&self) -> usize {
        self.data.len()
    }

    /// The value of the first `Subject` header, if any
    pub fn subject(&self) -> Option<&str> {
        self.headers().find_map(|line| {
            let (name, value) = line.split_once(':')?;
            name.eq_ignore_ascii_case("subject").then(|| value.trim())
        })
    }

    /// The content after the blank line ending the header block
    pub fn body(&self) -> Option<&str> {
        self.data
            .split_once("\n\n")
            .map(|(_, body)| body)
            .filter(|body| !body.is_empty())
    }

    fn headers(&self) -> impl Iterator<Item = &str> {
        self.data.lines().take_while(|line| !line.is_empty())
    }
}
