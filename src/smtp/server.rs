//! SMTP server implementation

use crate::smtp::address::{AddressParser, MailboxParser};
use crate::smtp::error::SmtpError;
use crate::smtp::exchange::Exchange;
use crate::smtp::mailer::{ConsoleMailer, Mailer};
use crate::smtp::registry::CommandRegistry;
use crate::smtp::session::SmtpSession;

use std::fmt;
use std::io::{self, BufReader, Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

use tracing::{debug, error, info, info_span, warn};

/// Main SMTP server. Cheap to clone; every connection gets its own copy.
#[derive(Clone)]
pub struct SmtpServer {
    /// Server hostname
    hostname: String,
    mailer: Arc<dyn Mailer>,
    parser: Arc<dyn AddressParser>,
    registry: Arc<CommandRegistry>,
}

impl SmtpServer {
    /// Create a new SMTP server that prints received mail to stdout
    pub fn new(hostname: &str) -> Self {
        Self {
            hostname: hostname.to_owned(),
            mailer: Arc::new(ConsoleMailer::stdout()),
            parser: Arc::new(MailboxParser),
            registry: Arc::new(CommandRegistry::default()),
        }
    }

    pub fn with_mailer(self, mailer: impl Mailer + 'static) -> Self {
        self.with_shared_mailer(Arc::new(mailer))
    }

    pub fn with_shared_mailer(mut self, mailer: Arc<dyn Mailer>) -> Self {
        self.mailer = mailer;
        self
    }

    pub fn with_parser(mut self, parser: impl AddressParser + 'static) -> Self {
        self.parser = Arc::new(parser);
        self
    }

    pub fn with_registry(mut self, registry: CommandRegistry) -> Self {
        self.registry = Arc::new(registry);
        self
    }

    pub fn hostname(&self) -> &str {
        &self.hostname
    }

    /// Serve clients using the given transport (blocking)
    pub fn run(&self, io: &dyn IoLoop) -> Result<(), SmtpError> {
        io.run(self)
    }

    /// Start the server on the specified address (blocking)
    pub fn start(&self, addr: &str) -> Result<(), SmtpError> {
        self.run(&SocketIo::new(addr))
    }

    /// Start the server with an existing listener (blocking)
    pub fn start_with_listener(&self, listener: TcpListener) -> Result<(), SmtpError> {
        info!(addr = %listener.local_addr()?, "SMTP server listening");

        for stream in listener.incoming() {
            match stream {
                Ok(stream) => {
                    let server = self.clone();
                    thread::spawn(move || server.handle_tcp(stream));
                }
                Err(e) => {
                    error!(error = %e, "error accepting connection");
                }
            }
        }

        Ok(())
    }

    /// Run one protocol session over a reader and writer until the client
    /// quits or the input ends
    pub fn handle_connection<R: Read, W: Write>(&self, reader: R, writer: W) -> Result<(), SmtpError> {
        let exchange = Exchange::new(
            self.hostname.clone(),
            Arc::clone(&self.mailer),
            Arc::clone(&self.parser),
        );
        let mut session = SmtpSession::new(exchange, &self.registry);
        session.run(BufReader::new(reader), writer)
    }

    fn handle_tcp(&self, stream: TcpStream) {
        let peer = stream
            .peer_addr()
            .map(|addr| addr.to_string())
            .unwrap_or_else(|_| "unknown".to_string());
        let _span = info_span!("connection", %peer).entered();
        debug!("client connected");

        let result = stream
            .try_clone()
            .map_err(SmtpError::from)
            .and_then(|reader| self.handle_connection(reader, stream));
        if let Err(e) = result {
            error!(error = %e, "error handling client");
        }
        debug!("client disconnected");
    }
}

impl fmt::Debug for SmtpServer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpServer")
            .field("hostname", &self.hostname)
            .field("registry", &self.registry)
            .finish_non_exhaustive()
    }
}

/// A way of feeding client connections to the server
pub trait IoLoop {
    fn run(&self, server: &SmtpServer) -> Result<(), SmtpError>;
}

/// Accepts TCP connections, one thread each
#[derive(Debug, Clone)]
pub struct SocketIo {
    addr: String,
}

impl SocketIo {
    pub fn new(addr: impl Into<String>) -> Self {
        Self { addr: addr.into() }
    }

    pub fn addr(&self) -> &str {
        &self.addr
    }
}

impl IoLoop for SocketIo {
    fn run(&self, server: &SmtpServer) -> Result<(), SmtpError> {
        let listener = TcpListener::bind(&self.addr)?;
        server.start_with_listener(listener)
    }
}

/// Talks SMTP over stdin and stdout, for poking at the server by hand
#[derive(Debug, Clone, Copy, Default)]
pub struct ConsoleIo;

impl IoLoop for ConsoleIo {
    fn run(&self, server: &SmtpServer) -> Result<(), SmtpError> {
        warn!("console mode is for debugging only, never use it in production");
        server.handle_connection(io::stdin().lock(), io::stdout())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::email::Email;
    use crate::smtp::mailer::ChannelMailer;
    use crate::smtp::verb::Verb;
    use std::io::{BufRead, Cursor};
    use std::sync::mpsc;
    use std::time::Duration;

    fn channel_server() -> (SmtpServer, mpsc::Receiver<Email>) {
        let (tx, rx) = mpsc::channel();
        let server = SmtpServer::new("test.local").with_mailer(ChannelMailer::new(tx));
        (server, rx)
    }

    fn converse(server: &SmtpServer, input: &str) -> String {
        let mut output = Vec::new();
        server
            .handle_connection(Cursor::new(input.to_string()), &mut output)
            .unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn test_server_creation() {
        let server = SmtpServer::new("test.local");
        assert_eq!(server.hostname(), "test.local");
    }

    #[test]
    fn test_handle_connection_greets() {
        let (server, _rx) = channel_server();
        let output = converse(&server, "");
        assert_eq!(
            output,
            "220 test.local Simple Mail Transfer Service Ready\r\n"
        );
    }

    #[test]
    fn test_handle_connection_delivers() {
        let (server, rx) = channel_server();
        let output = converse(
            &server,
            "HELO client.local\r\n\
             MAIL FROM:<test@example.com>\r\n\
             RCPT TO:<recipient@example.com>\r\n\
             DATA\r\n\
             Subject: Test Email\r\n\
             \r\n\
             This is a test email.\r\n\
             .\r\n\
             QUIT\r\n",
        );

        assert!(output.contains("250 HELO test.local\r\n"));
        assert!(output.ends_with("221 Service closing transmission channel\r\n"));

        let email = rx.recv_timeout(Duration::from_millis(100)).unwrap();
        assert_eq!(email.from.addr_spec(), "test@example.com");
        assert_eq!(email.recipients(), vec!["recipient@example.com"]);
        assert_eq!(email.subject(), Some("Test Email"));
        assert_eq!(email.body(), Some("This is a test email."));
    }

    #[test]
    fn test_custom_registry() {
        let (server, _rx) = channel_server();
        let server = server.with_registry(CommandRegistry::minimal().unimplemented(Verb::Noop));

        let output = converse(&server, "NOOP\r\nHELO client.local\r\nSEND FROM:<a@b.c>\r\n");
        let codes: Vec<_> = output.lines().map(|l| &l[..3]).collect();
        assert_eq!(codes, vec!["220", "502", "250", "500"]);
    }

    #[test]
    fn test_sessions_are_independent() {
        let (server, _rx) = channel_server();

        converse(&server, "HELO client.local\r\nMAIL FROM:<a@b.c>\r\n");
        let output = converse(&server, "RCPT TO:<x@y.z>\r\n");
        assert!(output.ends_with("503 bad command sequence\r\n"));
    }

    #[test]
    fn test_start_with_listener() {
        let (server, rx) = channel_server();
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        thread::spawn(move || server.start_with_listener(listener));

        let mut stream = TcpStream::connect(addr).unwrap();
        let mut reader = io::BufReader::new(stream.try_clone().unwrap());
        let mut line = String::new();
        reader.read_line(&mut line).unwrap();
        assert!(line.starts_with("220 test.local"));

        stream
            .write_all(b"HELO c.test\r\nMAIL FROM:<a@b.c>\r\nRCPT TO:<d@e.f>\r\nDATA\r\nhi\r\n.\r\n")
            .unwrap();
        for expected in ["250", "250", "250", "354", "250"] {
            line.clear();
            reader.read_line(&mut line).unwrap();
            assert!(line.starts_with(expected), "{line}");
        }

        let email = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(email.data, "hi");
    }

    #[test]
    fn test_socket_io_bind_failure() {
        let (server, _rx) = channel_server();
        let result = server.run(&SocketIo::new("not an address"));
        assert!(matches!(result, Err(SmtpError::Io(_))));
    }
}
