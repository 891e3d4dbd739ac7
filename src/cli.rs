use std::net::{IpAddr, SocketAddr};

use conf::{Conf, Subcommands, anstyle::AnsiColor};
use listenfd::ListenFd;

#[derive(Debug, Conf, Clone)]
pub struct RunConfig {
    #[conf(long, env, default_value = "::")]
    /// Address to expose the service
    pub bind: String,

    #[conf(long, env, default(3000))]
    /// Port to expose the service
    pub port: u16,

    #[conf(long, env, default_value = "./mount")]
    /// Root directory containing the buckets and the multipart staging area
    pub mount: std::path::PathBuf,

    #[conf(flatten, prefix)]
    /// Credential pair accepted on every S3 endpoint
    pub auth: crate::s3::authorization::AuthConfig,
}

impl RunConfig {
    /// Provides support for socket activation - such as systemd-socket or `systemfd` hot-reloading utility
    ///
    /// If no socket is passed, it will use the [`RunConfig`] `bind` and `port` to build a listener
    pub async fn listen_socket(&self) -> tokio::net::TcpListener {
        let mut listenfd = ListenFd::from_env();

        if let Ok(Some(l)) = listenfd.take_tcp_listener(0) {
            tracing::info!(addr = ?l, "Using socket from listenfd");
            let () = l
                .set_nonblocking(true)
                .expect("Could not make convert listenfd to a non-blocking socket");
            tokio::net::TcpListener::from_std(l).expect("Failed to convert listenfd to tokio")
        } else {
            // Allow changing the default fallback address using environment variables
            let addr = match self.bind.parse::<IpAddr>() {
                Ok(ip) => SocketAddr::from((ip, self.port)),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to parse HOST address");
                    std::process::exit(1);
                }
            };

            match tokio::net::TcpListener::bind(addr).await {
                Ok(listener) => {
                    tracing::info!(?addr, "Listening on address");
                    listener
                }
                Err(e) => {
                    tracing::error!(error = %e, ?addr, "Failed to bind to address");
                    std::process::exit(1);
                }
            }
        }
    }
}

#[derive(Debug, Subcommands)]
pub enum CliOperations {
    /// Start the server. [Default]
    Run(RunConfig),
    /// Dump parsed configuration
    Config(RunConfig),
    /// Generate credentials to use with config
    Credentials,
}

const HELP_STYLES: conf::Styles = conf::Styles::styled()
    .header(AnsiColor::Blue.on_default().bold())
    .usage(AnsiColor::Blue.on_default().bold())
    .literal(AnsiColor::White.on_default())
    .placeholder(AnsiColor::Green.on_default());

#[derive(Conf, Debug)]
#[conf(
    name = "tapera",
    about = "Filesystem-backed object storage speaking the S3 wire protocol.",
    styles = HELP_STYLES
)]
pub struct Cli {
    #[conf(subcommands)]
    pub command: Option<CliOperations>,

    #[conf(flatten)]
    pub config: RunConfig,
}
