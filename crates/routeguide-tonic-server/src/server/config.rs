use anyhow::bail;
use clap::Parser;
use std::path::PathBuf;

/// Runtime configuration for the `routeguide-tonic-server` binary.
///
/// All values are parsed from CLI arguments or environment variables (a `.env`
/// file is loaded first), with defaults suitable for a local demonstration.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "routeguide-tonic-server",
    version,
    about = "A gRPC route guide service with unary, server-streaming and client-streaming calls"
)]
pub struct CliArgs {
    /// Address to listen on (TCP or Unix socket path; use --uds for Unix
    /// socket).
    ///
    /// Example: "localhost:3000" or "/tmp/routeguide.sock"
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("localhost:3000"))]
    pub server_addr: String,

    /// Listen on a Unix socket instead of TCP. If set, `SERVER_ADDR` must be a
    /// file path.
    #[arg(short, long, default_value_t = false)]
    pub uds: bool,

    /// JSON fixture holding the features served by this instance.
    ///
    /// Loaded once at startup. A missing or malformed file aborts startup.
    ///
    /// Environment variable: `FEATURES_PATH`
    #[arg(long, env = "FEATURES_PATH", default_value = "testdata/route_guide_db.json")]
    pub features_path: PathBuf,

    /// Capacity of the response buffer between a `ListFeatures` producer and
    /// the gRPC stream.
    ///
    /// The producer suspends once this many features are waiting to be sent.
    /// Lower values increase backpressure responsiveness; higher values enable
    /// deeper pipelining.
    ///
    /// Environment variable: `STREAM_BUFFER_SIZE`
    #[arg(long, env = "STREAM_BUFFER_SIZE", default_value_t = 8)]
    pub stream_buffer_size: usize,

    /// Seconds to wait for in-flight calls to drain on shutdown before the
    /// remaining ones are cancelled.
    ///
    /// Environment variable: `SHUTDOWN_TIMEOUT`
    #[arg(long, env = "SHUTDOWN_TIMEOUT", default_value_t = 3)]
    pub shutdown_timeout: u64,
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub server_addr: String,
    pub uds: bool,
    pub features_path: PathBuf,
    pub stream_buffer_size: usize,
    pub shutdown_timeout: u64,
}

impl TryFrom<CliArgs> for ServerConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        if args.features_path.as_os_str().is_empty() {
            bail!("FEATURES_PATH must not be empty");
        }

        // `tokio::sync::mpsc::channel` panics on a zero capacity.
        if args.stream_buffer_size == 0 {
            bail!("STREAM_BUFFER_SIZE must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            uds: args.uds,
            features_path: args.features_path,
            stream_buffer_size: args.stream_buffer_size,
            shutdown_timeout: args.shutdown_timeout,
        })
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            server_addr: "localhost:3000".to_string(),
            uds: false,
            features_path: PathBuf::from("testdata/route_guide_db.json"),
            stream_buffer_size: 8,
            shutdown_timeout: 3,
        }
    }
}
