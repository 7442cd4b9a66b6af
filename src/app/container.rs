use std::sync::Arc;

use crate::adapters::toml_config::RecodeConfig;
use crate::adapters::{FfmpegAdapter, FfprobeAdapter};
use crate::app::batch_controller::{BatchController, BatchSettings};
use crate::domain::errors::DomainError;
use crate::ports::{EncodePort, ProbePort};

/// Wiring between configuration, adapters and the application services
pub trait AppContainer: Send + Sync {
    fn probe_port(&self) -> Arc<dyn ProbePort>;
    fn encode_port(&self) -> Arc<dyn EncodePort>;
    fn batch_settings(&self) -> BatchSettings;

    /// Fresh controller over this container's ports
    fn batch_controller(&self) -> BatchController {
        BatchController::new(self.probe_port(), self.encode_port(), self.batch_settings())
    }
}

pub struct DefaultAppContainer {
    settings: BatchSettings,
    probe_port: Arc<dyn ProbePort>,
    encode_port: Arc<dyn EncodePort>,
}

impl DefaultAppContainer {
    /// Build the production wiring from a validated configuration
    pub fn new(config: &RecodeConfig) -> Result<Self, DomainError> {
        let probe_port = Arc::new(FfprobeAdapter::new(&config.tools.prober));
        let encode_port = Arc::new(FfmpegAdapter::new(&config.tools.encoder));
        Self::with_ports(config, probe_port, encode_port)
    }

    /// Wire arbitrary port implementations
    pub fn with_ports(
        config: &RecodeConfig,
        probe_port: Arc<dyn ProbePort>,
        encode_port: Arc<dyn EncodePort>,
    ) -> Result<Self, DomainError> {
        config.validate()?;
        let settings = BatchSettings {
            profile: config.profile.clone(),
            output: config.output_template()?,
            on_error: config.batch.on_error,
            stop_grace: config.stop_grace(),
        };

        Ok(Self {
            settings,
            probe_port,
            encode_port,
        })
    }
}

impl AppContainer for DefaultAppContainer {
    fn probe_port(&self) -> Arc<dyn ProbePort> {
        Arc::clone(&self.probe_port)
    }

    fn encode_port(&self) -> Arc<dyn EncodePort> {
        Arc::clone(&self.encode_port)
    }

    fn batch_settings(&self) -> BatchSettings {
        self.settings.clone()
    }
}
