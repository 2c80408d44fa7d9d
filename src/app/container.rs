use std::sync::Arc;

use crate::adapters::{GififyConfig, ProcessLauncher};
use crate::app::convert_interactor::ConvertInteractor;
use crate::engine::{GifPipeline, PipelineSettings};
use crate::ports::StageLauncher;

pub trait AppContainer: Send + Sync {
    fn convert_interactor(&self) -> Arc<ConvertInteractor>;
}

pub struct DefaultAppContainer {
    convert_interactor: Arc<ConvertInteractor>,
}

impl DefaultAppContainer {
    /// Wire the real process launcher from configuration
    pub fn new(config: &GififyConfig) -> Self {
        let launcher = Arc::new(ProcessLauncher::new(config.programs.clone()));
        Self::with_launcher(config, launcher)
    }

    /// Wire a custom launcher, e.g. fakes in tests
    pub fn with_launcher(config: &GififyConfig, launcher: Arc<dyn StageLauncher>) -> Self {
        let pipeline = GifPipeline::new(launcher).with_settings(PipelineSettings {
            defaults: config.defaults.clone(),
            timeout: config.pipeline.timeout(),
        });

        Self {
            convert_interactor: Arc::new(ConvertInteractor::new(pipeline)),
        }
    }
}

impl AppContainer for DefaultAppContainer {
    fn convert_interactor(&self) -> Arc<ConvertInteractor> {
        Arc::clone(&self.convert_interactor)
    }
}
