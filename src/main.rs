use smtpd::SmtpServer;
use smtpd::config::Opt;
use structopt::StructOpt;
use tracing::{error, info};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

fn main() {
    let opt = Opt::from_args();

    // stdout carries the SMTP conversation in debug mode, so logs go to stderr
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&opt.log_filter)))
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    if let Err(e) = run(&opt) {
        error!(error = %e, "server failed");
        std::process::exit(1);
    }
}

fn run(opt: &Opt) -> Result<(), smtpd::SmtpError> {
    let hostname = opt.resolve_hostname();
    info!(%hostname, debug = opt.debug, hook_url = ?opt.hook_url, "starting smtpd");

    let server = SmtpServer::new(&hostname).with_shared_mailer(opt.mailer()?);
    server.run(opt.io_loop().as_ref())
}
