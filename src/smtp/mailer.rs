//! Delivery sinks for completed mail transactions

use std::fmt;
use std::io::{self, Read, Write};
use std::sync::{Mutex, mpsc};
use std::time::Duration;

use serde::Serialize;
use tracing::{debug, info};

use crate::smtp::address::Address;
use crate::smtp::email::Email;
use crate::smtp::error::DeliveryError;

/// A completed transaction ready for delivery
pub struct Mail {
    pub from: Address,
    pub to: Vec<Address>,
    pub body: Box<dyn Read + Send>,
}

impl Mail {
    /// Drain the body into a string, replacing invalid UTF-8
    pub fn read_body(&mut self) -> io::Result<String> {
        let mut buf = Vec::new();
        self.body.read_to_end(&mut buf)?;
        Ok(String::from_utf8_lossy(&buf).into_owned())
    }
}

impl fmt::Debug for Mail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Mail")
            .field("from", &self.from)
            .field("to", &self.to)
            .finish_non_exhaustive()
    }
}

/// Accepts or rejects a completed transaction. Called synchronously from
/// the connection's worker.
pub trait Mailer: Send + Sync {
    fn send(&self, mail: Mail) -> Result<(), DeliveryError>;
}

/// Prints each message to a writer (stdout by default)
pub struct ConsoleMailer {
    out: Mutex<Box<dyn Write + Send>>,
}

impl ConsoleMailer {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stdout() -> Self {
        Self::new(io::stdout())
    }
}

impl Default for ConsoleMailer {
    fn default() -> Self {
        Self::stdout()
    }
}

impl Mailer for ConsoleMailer {
    fn send(&self, mut mail: Mail) -> Result<(), DeliveryError> {
        let mut out = self
            .out
            .lock()
            .map_err(|_| io::Error::other("console writer poisoned"))?;

        writeln!(out, "From: {}", mail.from)?;
        for addr in &mail.to {
            writeln!(out, "To: {addr}")?;
        }
        writeln!(out)?;
        io::copy(&mut mail.body, &mut *out)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Serialize)]
struct WebhookPayload {
    from: String,
    to: Vec<String>,
    body: String,
}

/// POSTs each message as JSON to a webhook
#[derive(Debug, Clone)]
pub struct HttpMailer {
    url: String,
    client: reqwest::blocking::Client,
}

impl HttpMailer {
    pub fn new(url: impl Into<String>) -> Result<Self, DeliveryError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()?;
        Ok(Self {
            url: url.into(),
            client,
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }
}

impl Mailer for HttpMailer {
    fn send(&self, mut mail: Mail) -> Result<(), DeliveryError> {
        let payload = WebhookPayload {
            from: mail.from.addr_spec(),
            to: mail.to.iter().map(Address::addr_spec).collect(),
            body: mail.read_body()?,
        };

        debug!(url = %self.url, from = %payload.from, "posting message to webhook");
        let response = self.client.post(&self.url).json(&payload).send()?;
        let status = response.status();
        if !status.is_success() {
            return Err(DeliveryError::Status(status.as_u16()));
        }

        info!(url = %self.url, status = status.as_u16(), "webhook accepted message");
        Ok(())
    }
}

/// Hands each message to an in-process receiver
#[derive(Debug)]
pub struct ChannelMailer {
    tx: mpsc::Sender<Email>,
}

impl ChannelMailer {
    pub fn new(tx: mpsc::Sender<Email>) -> Self {
        Self { tx }
    }
}

impl Mailer for ChannelMailer {
    fn send(&self, mut mail: Mail) -> Result<(), DeliveryError> {
        let data = mail.read_body()?;
        let email = Email::new(mail.from, mail.to, data);
        self.tx
            .send(email)
            .map_err(|_| DeliveryError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::smtp::address::{AddressParser, MailboxParser};
    use std::io::{BufRead, BufReader, Cursor};
    use std::net::TcpListener;
    use std::sync::Arc;
    use std::thread;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    fn mail(body: &str) -> Mail {
        Mail {
            from: MailboxParser.parse("<a@test>").unwrap(),
            to: vec![
                MailboxParser.parse("<b@test>").unwrap(),
                MailboxParser.parse("<c@test>").unwrap(),
            ],
            body: Box::new(Cursor::new(body.as_bytes().to_vec())),
        }
    }

    #[test]
    fn test_console_mailer() {
        let buf = SharedBuf::default();
        let mailer = ConsoleMailer::new(buf.clone());

        mailer.send(mail("Subject: hi\n\nbody")).unwrap();

        let printed = String::from_utf8(buf.0.lock().unwrap().clone()).unwrap();
        assert_eq!(
            printed,
            "From: <a@test>\nTo: <b@test>\nTo: <c@test>\n\nSubject: hi\n\nbody\n"
        );
    }

    #[test]
    fn test_channel_mailer() {
        let (tx, rx) = mpsc::channel();
        let mailer = ChannelMailer::new(tx);

        mailer.send(mail("hello")).unwrap();

        let email = rx.recv().unwrap();
        assert_eq!(email.from.addr_spec(), "a@test");
        assert_eq!(email.recipients(), vec!["b@test", "c@test"]);
        assert_eq!(email.data, "hello");
    }

    #[test]
    fn test_channel_mailer_closed() {
        let (tx, rx) = mpsc::channel();
        drop(rx);
        let mailer = ChannelMailer::new(tx);

        let result = mailer.send(mail("hello"));
        assert!(matches!(result, Err(DeliveryError::ChannelClosed)));
    }

    /// Accepts one HTTP request, answers with `status`, and returns the
    /// request body through the join handle.
    fn fake_webhook(status: &'static str) -> (String, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let url = format!("http://{}/hook", listener.local_addr().unwrap());

        let handle = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut reader = BufReader::new(stream.try_clone().unwrap());

            let mut content_length = 0;
            loop {
                let mut line = String::new();
                reader.read_line(&mut line).unwrap();
                if line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':') {
                    if name.eq_ignore_ascii_case("content-length") {
                        content_length = value.trim().parse().unwrap();
                    }
                }
            }

            let mut body = vec![0; content_length];
            reader.read_exact(&mut body).unwrap();

            write!(
                stream,
                "HTTP/1.1 {status}\r\nContent-Length: 0\r\nConnection: close\r\n\r\n"
            )
            .unwrap();
            stream.flush().unwrap();

            String::from_utf8(body).unwrap()
        });

        (url, handle)
    }

    #[test]
    fn test_http_mailer_posts_json() {
        let (url, handle) = fake_webhook("200 OK");
        let mailer = HttpMailer::new(url).unwrap();

        mailer.send(mail("line one\nline two")).unwrap();

        let body = handle.join().unwrap();
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(json["from"], "a@test");
        assert_eq!(json["to"], serde_json::json!(["b@test", "c@test"]));
        assert_eq!(json["body"], "line one\nline two");
    }

    #[test]
    fn test_http_mailer_rejects_error_status() {
        let (url, handle) = fake_webhook("500 Internal Server Error");
        let mailer = HttpMailer::new(url).unwrap();

        let result = mailer.send(mail("hello"));
        assert!(matches!(result, Err(DeliveryError::Status(500))));
        handle.join().unwrap();
    }
}
