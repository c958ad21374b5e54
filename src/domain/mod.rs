//! # Green-space domain choreography.
//!
//! Domain services commit through repositories and talk to each other only
//! through [`DomainEvent`]s on a shared [`EventManager`].
//!
//! ```text
//!  TreeService ──CreateTree/UpdateTree/DeleteTree──┐
//!  SensorService ──NewSensorData/UpdateTree────────┼──► EventManager ──► handlers
//!  WateringPlanService ──UpdateWateringPlan────────┘
//!
//!  handlers: TreeSensorDataHandler, SensorMappingHandler, TreeClusterHandler × 5
//! ```
//!
//! [`Services`] wires the four services over one store and lists the handlers
//! to hand to a [`Supervisor`](crate::Supervisor).

mod cluster;
mod entities;
mod error;
mod events;
mod memory;
mod sensor;
mod storage;
mod tree;
mod watering;
mod watering_plan;

use std::sync::Arc;

pub use cluster::{TreeClusterHandler, TreeClusterService};
pub use entities::{
    Sensor, SensorData, SensorMessage, SensorStatus, Tree, TreeCluster, TreeCreate, TreeUpdate,
    WateringPlan, WateringPlanCreate, WateringPlanStatus, WateringStatus, Watermark,
};
pub use error::ServiceError;
pub use events::{DomainEvent, EventKind};
pub use memory::MemoryStore;
pub use sensor::{
    SensorConfig, SensorMappingHandler, SensorService, StatusScheduler, haversine_distance,
};
pub use storage::{
    SensorRepository, StorageError, StorageResult, TreeClusterRepository, TreeRepository,
    WateringPlanRepository,
};
pub use tree::{TreeSensorDataHandler, TreeService};
pub use watering::{aggregate_cluster_status, calculate_watering_status};
pub use watering_plan::WateringPlanService;

use crate::error::HandlerError;
use crate::events::{Event, EventManager};
use crate::handlers::Handle;

/// Rejects out-of-range coordinates and the `0` placeholder.
pub fn validate_coordinates(latitude: f64, longitude: f64) -> Result<(), ServiceError> {
    if !(-90.0..=90.0).contains(&latitude) || latitude == 0.0 {
        return Err(ServiceError::BadRequest(format!("invalid latitude: {latitude}")));
    }
    if !(-180.0..=180.0).contains(&longitude) || longitude == 0.0 {
        return Err(ServiceError::BadRequest(format!("invalid longitude: {longitude}")));
    }
    Ok(())
}

fn unexpected(expected: EventKind, actual: &DomainEvent) -> HandlerError {
    HandlerError::UnexpectedEvent {
        expected: expected.as_label().to_string(),
        actual: actual.kind().as_label().to_string(),
    }
}

/// The four domain services sharing one manager.
pub struct Services {
    pub trees: Arc<TreeService>,
    pub clusters: Arc<TreeClusterService>,
    pub sensors: Arc<SensorService>,
    pub watering_plans: Arc<WateringPlanService>,
    pub status_scheduler: Arc<StatusScheduler>,
}

impl Services {
    /// Wires every service over a store implementing all repositories.
    pub fn new<S>(
        store: Arc<S>,
        events: Arc<EventManager<DomainEvent>>,
        sensor_cfg: SensorConfig,
    ) -> Self
    where
        S: TreeRepository + TreeClusterRepository + SensorRepository + WateringPlanRepository,
    {
        let stale_after = sensor_cfg.stale_after;
        Self {
            trees: Arc::new(TreeService::new(
                store.clone(),
                store.clone(),
                store.clone(),
                Arc::clone(&events),
            )),
            clusters: Arc::new(TreeClusterService::new(store.clone(), store.clone())),
            sensors: Arc::new(SensorService::new(
                store.clone(),
                store.clone(),
                Arc::clone(&events),
                sensor_cfg,
            )),
            watering_plans: Arc::new(WateringPlanService::new(
                store.clone(),
                store.clone(),
                events,
            )),
            status_scheduler: Arc::new(StatusScheduler::new(store, stale_after)),
        }
    }

    /// Every event reaction, ready for [`SupervisorBuilder::with_handlers`](crate::SupervisorBuilder::with_handlers).
    pub fn handlers(&self) -> Vec<Arc<dyn Handle<DomainEvent>>> {
        let mut handlers: Vec<Arc<dyn Handle<DomainEvent>>> = vec![
            Arc::new(TreeSensorDataHandler(Arc::clone(&self.trees))),
            Arc::new(SensorMappingHandler(Arc::clone(&self.sensors))),
        ];
        for h in TreeClusterHandler::all(&self.clusters) {
            handlers.push(Arc::new(h));
        }
        handlers
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_coordinates() {
        assert!(validate_coordinates(54.78, 9.43).is_ok());
        assert!(validate_coordinates(-90.0, 180.0).is_ok());
        assert_eq!(validate_coordinates(91.0, 9.43).unwrap_err().code(), 400);
        assert_eq!(validate_coordinates(54.78, -180.5).unwrap_err().code(), 400);
        assert!(validate_coordinates(0.0, 9.43).is_err());
        assert!(validate_coordinates(54.78, 0.0).is_err());
    }

    #[test]
    fn test_handlers_cover_every_kind() {
        let store = Arc::new(MemoryStore::new());
        let manager = Arc::new(EventManager::new(EventKind::ALL));
        let services = Services::new(store, manager, SensorConfig::default());

        let handlers = services.handlers();
        assert_eq!(handlers.len(), 7);
        for kind in EventKind::ALL {
            assert!(handlers.iter().any(|h| h.event_kind() == kind), "{kind:?} has no handler");
        }
    }
}
