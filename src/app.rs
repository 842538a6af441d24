use crate::config::Config;
use crate::errors::ToolError;
use crate::mcp::registry::Registry;
use crate::services::gateway::{Gateway, HttpTransport};
use crate::services::logger::Logger;
use std::sync::Arc;

pub struct App {
    pub logger: Logger,
    pub config: Arc<Config>,
    pub registry: Arc<Registry>,
}

impl App {
    /// Builds the whole wiring once at startup. A configuration error here
    /// means the process never starts serving.
    pub fn initialize() -> Result<Self, ToolError> {
        let logger = Logger::new("pingfederate-mcp");
        let config = Arc::new(Config::from_env()?);

        if !config.verify_tls {
            logger.warn(
                "TLS certificate verification is disabled (PF_VERIFY_TLS)",
                None,
            );
        }
        logger.info(
            "configured",
            Some(&serde_json::json!({
                "base_url": config.base_url,
                "verify_tls": config.verify_tls,
                "timeout_secs": config.timeout.as_secs_f64(),
            })),
        );

        let transport = Arc::new(HttpTransport::new(config.clone())?);
        let gateway = Arc::new(Gateway::new(logger.clone(), &config, transport));
        let registry = Arc::new(Registry::new(gateway));

        Ok(Self {
            logger,
            config,
            registry,
        })
    }
}
