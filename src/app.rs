//! Main application orchestration and execution

use crate::{
    cli::Cli,
    client::{Exchange, TimedExchange},
    config::{display_config_summary, load_config, validate_config, EnvManager, ValidationLevel},
    error::{AppError, Result},
    executor::Orchestrator,
    logging::{Logger, LoggerFactory},
    models::Config,
    output::OutputCoordinator,
};
use std::sync::Arc;

/// Main application struct that coordinates all components
pub struct App {
    cli: Cli,
}

impl App {
    /// Create a new application instance with CLI configuration
    pub fn new(cli: Cli) -> Result<Self> {
        cli.validate().map_err(AppError::validation)?;
        Ok(Self { cli })
    }

    /// Color choice for messages printed before configuration is loaded
    pub fn use_colors(&self) -> bool {
        self.cli.use_colors()
    }

    /// Run the application
    pub async fn run(self) -> Result<()> {
        if let Some(path) = &self.cli.write_env_example {
            EnvManager::save_example_env_file(path)?;
            eprintln!("Wrote example configuration to {}", path.display());
            return Ok(());
        }

        let config = load_config(self.cli.clone())?;
        let factory = LoggerFactory::new(config.clone());
        let logger = factory.create_logger("APP").await;

        logger
            .debug(&format!("{} v{}", crate::PKG_NAME, crate::VERSION))
            .field("session_id", factory.session_id())
            .field("commit", crate::GIT_COMMIT)
            .field("built", crate::BUILD_TIME)
            .field("target", crate::TARGET_TRIPLE)
            .log()
            .await;
        if config.debug {
            for line in display_config_summary(&config).lines() {
                crate::log_debug!(logger, "{}", line);
            }
        }

        report_warnings(&config, &logger).await?;

        let exchange: Arc<dyn Exchange> = Arc::new(TimedExchange::new(
            config.exchange_settings()?,
            factory.create_logger("EXCHANGE").await,
        ));
        let orchestrator = Orchestrator::new(
            config.clone(),
            exchange,
            factory.create_logger("ORCHESTRATOR").await,
        );

        let report = orchestrator.run().await?;

        OutputCoordinator::from_config(&config).emit(&report)?;
        crate::log_info!(logger, "Speed test finished after {} trials", report.trials.len());
        Ok(())
    }
}

async fn report_warnings(config: &Config, logger: &Logger) -> Result<()> {
    for warning in validate_config(config)? {
        let entry = match warning.level {
            ValidationLevel::Info => logger.info(&warning.message),
            ValidationLevel::Warning => logger.warn(&warning.message),
        };
        entry.field("source", "config").log().await;
    }
    Ok(())
}
