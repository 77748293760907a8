//! Configuration loader (C8, ambient): builds the immutable `ServerConfig`
//! the rest of the pipeline treats as read-only. Precedence, highest to
//! lowest: CLI flag > environment variable > config file > built-in
//! default (spec §6-ext).

use clap::Parser;
use serde::Deserialize;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub port: u16,
    pub server_name: String,
    pub document_root: String,
    pub dynamic_dir_name: String,
    pub static_dir_name: String,
    pub connection_timeout: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        ServerConfig {
            port: 8080,
            server_name: "littlehttpd/0.1".to_string(),
            document_root: "./content".to_string(),
            dynamic_dir_name: "cgi-bin".to_string(),
            static_dir_name: "static".to_string(),
            connection_timeout: 30,
        }
    }
}

#[derive(Debug, Parser)]
#[command(name = "littlehttpd", about = "A sequential HTTP/1.x origin server")]
pub struct Cli {
    /// Port to listen on.
    #[arg(long, env = "KISS_PORT")]
    pub port: Option<u16>,

    /// Value sent in the `Server:` header and the CGI `SERVER_NAME`/
    /// `SERVER_SOFTWARE` variables.
    #[arg(long, env = "KISS_SERVER_NAME")]
    pub server_name: Option<String>,

    /// Directory resources are served from.
    #[arg(long, env = "KISS_DOCUMENT_ROOT")]
    pub document_root: Option<String>,

    /// First-path-segment name that routes a request to CGI.
    #[arg(long = "cgi-dir", env = "KISS_CGI_DIR")]
    pub dynamic_dir_name: Option<String>,

    /// Informational name of the static subdirectory (not interpreted by
    /// the core pipeline).
    #[arg(long = "static-dir", env = "KISS_STATIC_DIR")]
    pub static_dir_name: Option<String>,

    /// Per-connection deadline, in seconds.
    #[arg(long, env = "KISS_CONNECTION_TIMEOUT")]
    pub connection_timeout: Option<u64>,

    /// Optional TOML file overlaying the built-in defaults.
    #[arg(long, env = "KISS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Debug, Default, Deserialize)]
struct FileConfig {
    port: Option<u16>,
    server_name: Option<String>,
    document_root: Option<String>,
    dynamic_dir_name: Option<String>,
    static_dir_name: Option<String>,
    connection_timeout: Option<u64>,
}

impl ServerConfig {
    /// Builds the effective configuration from the parsed CLI/env layer,
    /// overlaying an optional TOML file, overlaying the defaults.
    pub fn from_cli(cli: Cli) -> std::io::Result<ServerConfig> {
        let file_config = match &cli.config {
            Some(path) => {
                let contents = std::fs::read_to_string(path)?;
                toml::from_str(&contents).map_err(|e| {
                    std::io::Error::new(std::io::ErrorKind::InvalidData, e.to_string())
                })?
            }
            None => FileConfig::default(),
        };

        let defaults = ServerConfig::default();

        let mut document_root = cli
            .document_root
            .or(file_config.document_root)
            .unwrap_or(defaults.document_root);
        if !document_root.ends_with('/') {
            document_root.push('/');
        }

        Ok(ServerConfig {
            port: cli.port.or(file_config.port).unwrap_or(defaults.port),
            server_name: cli
                .server_name
                .or(file_config.server_name)
                .unwrap_or(defaults.server_name),
            document_root,
            dynamic_dir_name: cli
                .dynamic_dir_name
                .or(file_config.dynamic_dir_name)
                .unwrap_or(defaults.dynamic_dir_name),
            static_dir_name: cli
                .static_dir_name
                .or(file_config.static_dir_name)
                .unwrap_or(defaults.static_dir_name),
            connection_timeout: cli
                .connection_timeout
                .or(file_config.connection_timeout)
                .unwrap_or(defaults.connection_timeout),
        })
    }

    #[cfg(test)]
    pub fn default_for_test() -> ServerConfig {
        ServerConfig::default()
    }
}
