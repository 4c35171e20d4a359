//! Main application orchestration and execution

use crate::{
    cli::Cli,
    config::{display_config_summary, load_config, validate_config, ValidationWarning},
    connection::{Connector, HttpConnector, InProcessConnector},
    error::{AppError, Result},
    executor::{ExecutionResults, LoadTestExecutor},
    logging::Logger,
    models::RunConfig,
    output::{JsonReport, OutputCoordinator, OutputFormatterFactory},
};
use std::future::Future;
use std::sync::Arc;
use std::io::BufRead;
use tokio::sync::oneshot;

/// Main application struct that coordinates all components
pub struct App {
    config: RunConfig,
    logger: Logger,
}

impl App {
    /// Build the configuration from CLI arguments, `.env` and environment
    pub fn new(cli: Cli) -> Result<Self> {
        Ok(Self::with_config(load_config(cli)?))
    }

    pub fn with_config(config: RunConfig) -> Self {
        let logger = Logger::with_config(crate::PKG_NAME, &config);
        Self { config, logger }
    }

    pub fn config(&self) -> &RunConfig {
        &self.config
    }

    pub fn logger(&self) -> &Logger {
        &self.logger
    }

    /// Non-fatal configuration warnings
    pub fn warnings(&self) -> Result<Vec<ValidationWarning>> {
        validate_config(&self.config)
    }

    /// Debug banner with build information and the effective configuration
    pub fn debug_banner(&self) -> String {
        format!(
            "{} v{} (built {}, commit {})\n\n{}",
            crate::PKG_NAME,
            crate::VERSION,
            option_env!("BUILD_TIME").unwrap_or("unknown"),
            option_env!("GIT_COMMIT").unwrap_or("unknown"),
            display_config_summary(&self.config)
        )
    }

    /// Connector for the configured endpoint
    pub fn connector(&self) -> Result<Arc<dyn Connector>> {
        if self.config.is_local_endpoint() {
            Ok(Arc::new(InProcessConnector::default()))
        } else {
            Ok(Arc::new(HttpConnector::new(
                self.config.send_timeout(),
                self.logger.child("connector"),
            )?))
        }
    }

    /// Run producers and consumers until `stop` resolves or the run completes
    pub async fn execute<F>(&self, stop: F) -> Result<ExecutionResults>
    where
        F: Future<Output = ()> + Send,
    {
        let executor = LoadTestExecutor::new(self.config.clone(), self.connector()?, self.logger.child("executor"));
        executor.run(stop).await
    }

    /// Render the final report, JSON or text depending on configuration
    pub fn render(&self, results: &ExecutionResults) -> Result<String> {
        if self.config.json_output {
            JsonReport::new(results).render()
        } else {
            let formatter = OutputFormatterFactory::create_formatter(self.config.enable_color, self.config.verbose);
            OutputCoordinator::new(formatter).display_results(results)
        }
    }

    /// Fail the process when no worker at all managed to connect
    pub fn check_outcome(&self, results: &ExecutionResults) -> Result<()> {
        let requested = self.config.producers + self.config.consumers;
        if requested > 0 && results.failures.len() == requested {
            return Err(AppError::execution(format!(
                "All {} workers failed to connect to {}",
                requested, self.config.endpoint
            )));
        }
        Ok(())
    }
}

/// Resolves on Ctrl-C or when a line is entered on stdin
///
/// A closed stdin leaves only Ctrl-C, so piped or detached runs keep going.
/// Stdin is read on a detached thread: a blocking read held by the runtime
/// would keep the process alive after the run completes.
pub async fn interrupt_signal() {
    let enter = async {
        let entered = match stdin_line() {
            Some(line) => line.await.is_ok(),
            None => false,
        };
        if !entered {
            futures::future::pending::<()>().await;
        }
    };

    tokio::select! {
        _ = tokio::signal::ctrl_c() => {}
        _ = enter => {}
    }
}

/// Completes when the first line arrives; the sender is dropped on EOF
fn stdin_line() -> Option<oneshot::Receiver<()>> {
    let (tx, rx) = oneshot::channel();
    std::thread::Builder::new()
        .name("stdin-stop".to_string())
        .spawn(move || {
            let mut line = String::new();
            if let Ok(read) = std::io::stdin().lock().read_line(&mut line) {
                if read > 0 {
                    let _ = tx.send(());
                }
            }
        })
        .ok()?;
    Some(rx)
}
