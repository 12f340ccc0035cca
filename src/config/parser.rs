//! Configuration parsing from CLI arguments and environment variables

use crate::{
    cli::Cli,
    config::env::EnvManager,
    error::Result,
    models::Config,
};

/// Configuration parser that layers defaults, `.env`, environment variables
/// and CLI arguments, in increasing precedence
pub struct ConfigParser {
    cli: Cli,
}

impl ConfigParser {
    /// Create a new configuration parser with CLI arguments
    pub fn new(cli: Cli) -> Self {
        Self { cli }
    }

    /// Parse and build the complete configuration
    pub fn parse(&self) -> Result<Config> {
        let mut config = Config::default();

        EnvManager::load_env_file()?;
        config.merge_from_env()?;
        self.apply_cli_overrides(&mut config)?;

        config.validate()?;
        Ok(config)
    }

    /// Apply CLI argument overrides to configuration
    fn apply_cli_overrides(&self, config: &mut Config) -> Result<()> {
        let cli = &self.cli;

        if let Some(base_url) = &cli.base_url {
            config.base_url = base_url.clone();
        }
        if let Some(count) = cli.latency_count {
            config.latency_iterations = count;
        }
        if let Some(timeout) = cli.timeout {
            config.timeout_seconds = timeout;
        }
        if let Some(cert) = &cli.cert {
            config.client_cert = Some(cert.clone());
        }
        if let Some(family) = cli.ip_family() {
            config.ip_family = family;
        }
        if let Some(format) = cli.format {
            config.output_format = format;
        }
        if let Some(output) = &cli.output {
            config.output_file = Some(output.clone());
        }
        if let Some(enable_color) = cli.color_override() {
            config.enable_color = enable_color;
        }

        if cli.insecure {
            config.insecure = true;
        }
        config.headers.extend(cli.headers.iter().cloned());

        // CLI-only switches
        config.verbose = cli.verbose;
        config.debug = cli.debug;
        config.log_json = cli.log_json;

        if let Some(labels) = cli.size_labels() {
            config.retain_sizes(&labels)?;
        }

        Ok(())
    }
}

/// Convenience function to load complete configuration from CLI arguments
pub fn load_config(cli: Cli) -> Result<Config> {
    ConfigParser::new(cli).parse()
}

/// Configuration summary for debug output
pub fn display_config_summary(config: &Config) -> String {
    let labels = |specs: &[crate::models::TestSpec]| {
        specs
            .iter()
            .map(|s| format!("{}x{}", s.label, s.iterations))
            .collect::<Vec<_>>()
            .join(", ")
    };

    let mut summary = Vec::new();
    summary.push(format!("Base URL: {}", config.base_url));
    summary.push(format!("Latency Iterations: {}", config.latency_iterations));
    summary.push(format!("Download Tests: {}", labels(&config.download_tests)));
    summary.push(format!("Upload Tests: {}", labels(&config.upload_tests)));
    summary.push(format!("IP Family: {}", config.ip_family));
    summary.push(format!("Timeout: {}s", config.timeout_seconds));
    summary.push(format!("Insecure: {}", config.insecure));
    if let Some(cert) = &config.client_cert {
        summary.push(format!("Client Certificate: {}", cert.display()));
    }
    if !config.headers.is_empty() {
        summary.push(format!("Extra Headers: {}", config.headers.len()));
    }
    summary.push(format!("Output Format: {:?}", config.output_format));
    summary.push(format!("Color Output: {}", config.enable_color));
    summary.push(format!("Verbose: {}", config.verbose));
    summary.push(format!("Debug: {}", config.debug));

    summary.join("\n")
}
