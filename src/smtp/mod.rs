//! SMTP protocol engine

pub mod address;
pub mod commands;
pub mod domain;
pub mod email;
pub mod error;
pub mod exchange;
pub mod mailer;
pub mod registry;
pub mod response;
pub mod server;
pub mod session;
pub mod verb;

pub use address::{Address, AddressError, AddressParser, MailboxParser, SmtpLimits};
pub use commands::{Command, Step, Successors};
pub use email::Email;
pub use error::{DeliveryError, SmtpError};
pub use exchange::Exchange;
pub use mailer::{ChannelMailer, ConsoleMailer, HttpMailer, Mail, Mailer};
pub use registry::{CommandFactory, CommandRegistry};
pub use response::SmtpResponse;
pub use server::{ConsoleIo, IoLoop, SmtpServer, SocketIo};
pub use session::{Flow, SmtpSession, SmtpState};
pub use verb::Verb;
