//! Verb to command lookup

use std::collections::HashMap;
use std::fmt;

use crate::smtp::commands::{
    Command, DataCommand, HeloCommand, MailCommand, NoopCommand, RcptCommand, RsetCommand,
};
use crate::smtp::error::SmtpError;
use crate::smtp::verb::Verb;

/// Builds a fresh command instance for one attempt
pub type CommandFactory = Box<dyn Fn() -> Box<dyn Command> + Send + Sync>;

/// Immutable table of the commands a server understands.
///
/// A verb mapped to `None` is known but deliberately unimplemented; a
/// verb missing from the table is unrecognized.
pub struct CommandRegistry {
    commands: HashMap<Verb, Option<CommandFactory>>,
}

impl CommandRegistry {
    pub fn empty() -> Self {
        Self {
            commands: HashMap::new(),
        }
    }

    /// The base RFC 821 command set. SOML and SAML are known but not
    /// implemented, and SEND is not known at all.
    pub fn minimal() -> Self {
        Self::empty()
            .register(Verb::Helo, || Box::new(HeloCommand))
            .register(Verb::Mail, || Box::new(MailCommand::new(Verb::Mail)))
            .register(Verb::Rcpt, || Box::new(RcptCommand))
            .register(Verb::Data, || Box::new(DataCommand::default()))
            .register(Verb::Rset, || Box::new(RsetCommand))
            .register(Verb::Noop, || Box::new(NoopCommand))
            .unimplemented(Verb::Ehlo)
            .unimplemented(Verb::Expn)
            .unimplemented(Verb::Vrfy)
            .unimplemented(Verb::Help)
            .unimplemented(Verb::Soml)
            .unimplemented(Verb::Saml)
    }

    pub fn register<F>(mut self, verb: Verb, factory: F) -> Self
    where
        F: Fn() -> Box<dyn Command> + Send + Sync + 'static,
    {
        self.commands.insert(verb, Some(Box::new(factory)));
        self
    }

    pub fn unimplemented(mut self, verb: Verb) -> Self {
        self.commands.insert(verb, None);
        self
    }

    pub fn is_registered(&self, verb: Verb) -> bool {
        self.commands.contains_key(&verb)
    }

    pub fn is_implemented(&self, verb: Verb) -> bool {
        matches!(self.commands.get(&verb), Some(Some(_)))
    }

    /// Instantiate the command for `verb`
    pub fn create(&self, verb: Verb) -> Result<Box<dyn Command>, SmtpError> {
        match self.commands.get(&verb) {
            Some(Some(factory)) => Ok(factory()),
            Some(None) => Err(SmtpError::NotImplemented),
            None => Err(SmtpError::Unrecognized),
        }
    }
}

impl Default for CommandRegistry {
    /// The base set with SEND, SAML and SOML acting as MAIL
    fn default() -> Self {
        let mut registry = Self::minimal();
        for verb in [Verb::Send, Verb::Saml, Verb::Soml] {
            registry = registry.register(verb, move || Box::new(MailCommand::new(verb)));
        }
        registry
    }
}

impl fmt::Debug for CommandRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut implemented: Vec<_> = Verb::ALL
            .into_iter()
            .filter(|verb| self.is_implemented(*verb))
            .collect();
        implemented.sort_by_key(|verb| verb.as_str());
        f.debug_struct("CommandRegistry")
            .field("implemented", &implemented)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::commands::Successors;

    #[test]
    fn test_minimal_registry() {
        let registry = CommandRegistry::minimal();

        for verb in [Verb::Helo, Verb::Mail, Verb::Rcpt, Verb::Data, Verb::Rset, Verb::Noop] {
            assert!(registry.is_implemented(verb), "{verb} should be implemented");
        }
        for verb in [Verb::Ehlo, Verb::Expn, Verb::Vrfy, Verb::Help, Verb::Soml, Verb::Saml] {
            assert!(matches!(
                registry.create(verb),
                Err(SmtpError::NotImplemented)
            ));
        }
        assert!(!registry.is_registered(Verb::Send));
        assert!(matches!(
            registry.create(Verb::Send),
            Err(SmtpError::Unrecognized)
        ));
    }

    #[test]
    fn test_default_promotes_mail_aliases() {
        let registry = CommandRegistry::default();
        for verb in [Verb::Send, Verb::Saml, Verb::Soml] {
            let command = registry.create(verb).unwrap();
            assert_eq!(
                command.successors(),
                Successors::Verbs(&[Verb::Rcpt, Verb::Rset])
            );
        }
        assert!(matches!(
            registry.create(Verb::Vrfy),
            Err(SmtpError::NotImplemented)
        ));
    }

    #[test]
    fn test_quit_is_not_a_registered_command() {
        let registry = CommandRegistry::default();
        assert!(!registry.is_registered(Verb::Quit));
    }

    #[test]
    fn test_custom_registry() {
        let registry = CommandRegistry::empty()
            .register(Verb::Noop, || Box::new(NoopCommand))
            .unimplemented(Verb::Help);

        assert!(registry.is_implemented(Verb::Noop));
        assert!(registry.is_registered(Verb::Help));
        assert!(!registry.is_implemented(Verb::Help));
        assert!(!registry.is_registered(Verb::Helo));
    }
}
