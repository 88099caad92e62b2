// Configuration module entry point
// Manages application configuration and the per-process request state

mod state;
mod types;

use std::net::SocketAddr;

// Re-export public types
pub use state::AppState;
pub use types::{Config, LogLevel};

impl Config {
    /// Load configuration from specified file path (without extension)
    /// Default config file is "config.toml" when no path specified
    pub fn load_from(config_path: &str) -> Result<Self, config::ConfigError> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(config_path).required(false))
            .add_source(
                config::Environment::with_prefix("WIKI")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_default("server.host", "127.0.0.1")?
            .set_default("server.port", 8080)?
            .set_default("storage.data_dir", "data")?
            .set_default("templates.dir", "templates")?
            .set_default("logging.level", "info")?
            .set_default("logging.access_log", true)?
            .set_default("logging.access_log_format", "combined")?
            .set_default("performance.keep_alive_timeout", 75)?
            .set_default("performance.read_timeout", 30)?
            .set_default("performance.write_timeout", 30)?
            .set_default("http.server_name", "wiki-server")?
            .set_default("http.max_body_size", 10_485_760)? // 10MB
            .build()?;

        settings.try_deserialize()
    }

    pub fn load() -> Result<Self, config::ConfigError> {
        Self::load_from("config")
    }

    pub fn get_socket_addr(&self) -> Result<SocketAddr, String> {
        format!("{}:{}", self.server.host, self.server.port)
            .parse()
            .map_err(|e| format!("Invalid address: {e}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_without_config_file() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.server.host, "127.0.0.1");
        assert_eq!(cfg.server.port, 8080);
        assert_eq!(cfg.storage.data_dir, "data");
        assert_eq!(cfg.templates.dir, "templates");
        assert_eq!(cfg.logging.access_log_format, "combined");
        assert_eq!(cfg.logging.level, LogLevel::Info);
        assert_eq!(cfg.http.max_body_size, 10_485_760);
        assert!(cfg.server.workers.is_none());
        assert!(cfg.performance.max_connections.is_none());
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("wiki.toml");
        std::fs::write(
            &path,
            "[server]\nport = 9090\n\n[storage]\ndata_dir = \"/srv/wiki\"\n",
        )
        .unwrap();

        let stem = dir.path().join("wiki");
        let cfg = Config::load_from(stem.to_str().unwrap()).unwrap();
        assert_eq!(cfg.server.port, 9090);
        assert_eq!(cfg.storage.data_dir, "/srv/wiki");
        assert_eq!(cfg.templates.dir, "templates");
    }

    #[test]
    fn test_log_level_parsed() {
        let dir = tempfile::tempdir().unwrap();
        let write = |name: &str, level: &str| {
            let path = dir.path().join(format!("{name}.toml"));
            std::fs::write(path, format!("[logging]\nlevel = \"{level}\"\n")).unwrap();
            dir.path().join(name).to_str().unwrap().to_string()
        };

        let cfg = Config::load_from(&write("quiet", "warn")).unwrap();
        assert_eq!(cfg.logging.level, LogLevel::Warn);

        assert!(Config::load_from(&write("loud", "shout")).is_err());
    }

    #[test]
    fn test_socket_addr() {
        let cfg = Config::load_from("does-not-exist/config").unwrap();
        assert_eq!(cfg.get_socket_addr().unwrap().port(), 8080);
    }
}
