//! Command line arguments

use clap::Parser;

/// Mock REST server over JSON files, with static files for everything else
#[derive(Parser, Debug)]
#[command(name = "mockrest")]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Address to bind (overrides `server.host`)
    pub host: Option<String>,

    /// Port to listen on (overrides `server.port`)
    pub port: Option<u16>,

    /// Configuration file, extension optional
    #[arg(long, short, default_value = "config")]
    pub config: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let args = Args::parse_from(["mockrest"]);
        assert_eq!(args.host, None);
        assert_eq!(args.port, None);
        assert_eq!(args.config, "config");
    }

    #[test]
    fn test_positionals_and_config() {
        let args = Args::parse_from(["mockrest", "0.0.0.0", "9000", "--config", "dev"]);
        assert_eq!(args.host.as_deref(), Some("0.0.0.0"));
        assert_eq!(args.port, Some(9000));
        assert_eq!(args.config, "dev");
    }

    #[test]
    fn test_rejects_bad_port() {
        assert!(Args::try_parse_from(["mockrest", "127.0.0.1", "http"]).is_err());
    }
}
