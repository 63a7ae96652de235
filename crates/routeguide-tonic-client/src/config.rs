use anyhow::bail;
use clap::Parser;
use core::time::Duration;

/// Runtime configuration for the `routeguide-tonic-client` binary.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "routeguide-tonic-client",
    version,
    about = "Exercises every RPC of a running route guide server"
)]
pub struct CliArgs {
    /// Server endpoint, including the scheme.
    ///
    /// Environment variable: `SERVER_ADDR`
    #[arg(long, env = "SERVER_ADDR", default_value_t = String::from("http://localhost:3000"))]
    pub server_addr: String,

    /// Deadline applied to each call, in seconds.
    ///
    /// Environment variable: `DEADLINE_SECS`
    #[arg(long, env = "DEADLINE_SECS", default_value_t = 10)]
    pub deadline_secs: u64,

    /// Number of random points sent by `RecordRoute`.
    ///
    /// Environment variable: `ROUTE_POINTS`
    #[arg(long, env = "ROUTE_POINTS", default_value_t = 10)]
    pub route_points: usize,
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub server_addr: String,
    pub deadline: Duration,
    pub route_points: usize,
}

impl TryFrom<CliArgs> for ClientConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.server_addr.trim().is_empty() {
            bail!("SERVER_ADDR must not be empty");
        }

        if args.deadline_secs == 0 {
            bail!("DEADLINE_SECS must be greater than 0");
        }

        Ok(Self {
            server_addr: args.server_addr,
            deadline: Duration::from_secs(args.deadline_secs),
            route_points: args.route_points,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_parse() {
        let args = CliArgs::try_parse_from(["routeguide-tonic-client"]).unwrap();
        let config = ClientConfig::try_from(args).unwrap();
        assert_eq!(config.deadline, Duration::from_secs(10));
        assert_eq!(config.route_points, 10);
    }

    #[test]
    fn rejects_zero_deadline() {
        let args =
            CliArgs::try_parse_from(["routeguide-tonic-client", "--deadline-secs", "0"]).unwrap();
        assert!(ClientConfig::try_from(args).is_err());
    }
}
