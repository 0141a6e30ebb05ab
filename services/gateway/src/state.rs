use etl_engine::EtlService;
use tokio_util::sync::CancellationToken;

#[derive(Clone)]
pub struct AppState {
    pub service: EtlService,
    /// Cancelled on process shutdown; request tokens are its children.
    pub shutdown: CancellationToken,
}

impl AppState {
    pub fn new(service: EtlService, shutdown: CancellationToken) -> Self {
        Self { service, shutdown }
    }
}
