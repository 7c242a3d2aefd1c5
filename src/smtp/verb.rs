//! SMTP command keywords

use std::fmt;

/// Every four letter keyword the server knows about
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Verb {
    Helo,
    Ehlo,
    Mail,
    Send,
    Saml,
    Soml,
    Rcpt,
    Data,
    Rset,
    Noop,
    Quit,
    Vrfy,
    Expn,
    Help,
}

/// Verbs that open a mail transaction
pub const MAIL_VERBS: &[Verb] = &[Verb::Mail, Verb::Send, Verb::Saml, Verb::Soml];

impl Verb {
    pub const ALL: [Verb; 14] = [
        Verb::Helo,
        Verb::Ehlo,
        Verb::Mail,
        Verb::Send,
        Verb::Saml,
        Verb::Soml,
        Verb::Rcpt,
        Verb::Data,
        Verb::Rset,
        Verb::Noop,
        Verb::Quit,
        Verb::Vrfy,
        Verb::Expn,
        Verb::Help,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Verb::Helo => "HELO",
            Verb::Ehlo => "EHLO",
            Verb::Mail => "MAIL",
            Verb::Send => "SEND",
            Verb::Saml => "SAML",
            Verb::Soml => "SOML",
            Verb::Rcpt => "RCPT",
            Verb::Data => "DATA",
            Verb::Rset => "RSET",
            Verb::Noop => "NOOP",
            Verb::Quit => "QUIT",
            Verb::Vrfy => "VRFY",
            Verb::Expn => "EXPN",
            Verb::Help => "HELP",
        }
    }

    /// Resolve the verb from the first four bytes of a command line,
    /// ignoring case. Anything after those four bytes is not looked at,
    /// so `MAILX` resolves to MAIL.
    pub fn from_prefix(line: &str) -> Option<Verb> {
        let prefix = line.get(..4)?;
        Verb::ALL
            .into_iter()
            .find(|verb| verb.as_str().eq_ignore_ascii_case(prefix))
    }
}

impl fmt::Display for Verb {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
