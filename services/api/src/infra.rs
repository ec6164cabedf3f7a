use bed_switch::clock::Clock;
use bed_switch::error::AppError;
use bed_switch::workflows::inventory::{Inventory, InventoryImporter};
use bed_switch::workflows::switching::{
    InMemorySwitchRequests, NotifyError, RateLimiter, SwitchNotice, SwitchNotifier,
    SwitchRequestService,
};
use metrics_exporter_prometheus::PrometheusHandle;
use std::io::Cursor;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use tracing::info;

/// Inventory served when no export is supplied on the command line.
pub(crate) const DEMO_INVENTORY: &str = include_str!("../data/demo_inventory.csv");

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

/// Writes every notice to the service log; stands in for a mail or chat relay.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct LoggingNotifier;

impl SwitchNotifier for LoggingNotifier {
    fn publish(&self, notice: SwitchNotice) -> Result<(), NotifyError> {
        let details = serde_json::to_string(&notice.details)
            .map_err(|err| NotifyError::Transport(err.to_string()))?;
        info!(
            template = ?notice.template,
            request_id = %notice.request_id,
            recipient = ?notice.recipient,
            %details,
            "switch notice"
        );
        Ok(())
    }
}

pub(crate) fn load_inventory(path: Option<&Path>) -> Result<Inventory, AppError> {
    let inventory = match path {
        Some(path) => InventoryImporter::from_path(path)?,
        None => InventoryImporter::from_reader(Cursor::new(DEMO_INVENTORY))?,
    };
    Ok(inventory)
}

pub(crate) fn build_service<N: SwitchNotifier + 'static>(
    inventory: Inventory,
    notifier: Arc<N>,
    limiter: RateLimiter,
    clock: Arc<dyn Clock>,
) -> bed_switch::workflows::switching::InMemorySwitchService<N> {
    let (resources, accommodations) = inventory.into_parts();
    SwitchRequestService::new(
        Arc::new(InMemorySwitchRequests::default()),
        Arc::new(resources),
        Arc::new(accommodations),
        notifier,
        limiter,
        clock,
    )
}

pub(crate) fn parse_path(raw: &str) -> Result<std::path::PathBuf, String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err("path must not be empty".to_string());
    }
    Ok(std::path::PathBuf::from(trimmed))
}
