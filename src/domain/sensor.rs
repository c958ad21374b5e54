//! # Sensor ingestion and status tracking.
//!
//! ```text
//! MQTT payload ──► SensorService::handle_message
//!                     ├─► upsert sensor (online, position, latest data)
//!                     ├─► insert reading
//!                     └─► publish NewSensorData ──► TreeService / TreeClusterService
//!                                               └─► SensorService: map_sensor_to_tree
//!                                                      └─► publish UpdateTree
//!
//! StatusScheduler::run ──(every check_interval)──► stale sensors → Offline
//! ```

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tracing::{debug, error, info, warn};

use super::entities::{Sensor, SensorData, SensorMessage, SensorStatus, Tree};
use super::error::ServiceError;
use super::events::{DomainEvent, EventKind};
use super::storage::{SensorRepository, TreeRepository};
use super::validate_coordinates;
use super::watering::calculate_watering_status;
use crate::context::Context;
use crate::error::HandlerError;
use crate::events::EventManager;
use crate::handlers::Handle;

const EARTH_RADIUS_M: f64 = 6_371_000.0;

/// Tuning knobs for sensor handling.
#[derive(Clone, Debug)]
pub struct SensorConfig {
    /// Farthest a tree may stand from a sensor to be linked automatically.
    pub max_tree_distance_m: f64,
    /// A sensor not heard from for this long is marked offline.
    pub stale_after: Duration,
    /// Period of the status scheduler.
    pub check_interval: Duration,
}

impl Default for SensorConfig {
    fn default() -> Self {
        Self {
            max_tree_distance_m: 5.0,
            stale_after: Duration::from_secs(72 * 60 * 60),
            check_interval: Duration::from_secs(60 * 60),
        }
    }
}

/// Great-circle distance in metres.
pub fn haversine_distance(lat1: f64, lon1: f64, lat2: f64, lon2: f64) -> f64 {
    let (phi1, phi2) = (lat1.to_radians(), lat2.to_radians());
    let d_phi = (lat2 - lat1).to_radians();
    let d_lambda = (lon2 - lon1).to_radians();

    let a = (d_phi / 2.0).sin().powi(2) + phi1.cos() * phi2.cos() * (d_lambda / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * a.sqrt().atan2((1.0 - a).sqrt())
}

pub struct SensorService {
    sensors: Arc<dyn SensorRepository>,
    trees: Arc<dyn TreeRepository>,
    events: Arc<EventManager<DomainEvent>>,
    cfg: SensorConfig,
}

impl SensorService {
    pub fn new(
        sensors: Arc<dyn SensorRepository>,
        trees: Arc<dyn TreeRepository>,
        events: Arc<EventManager<DomainEvent>>,
        cfg: SensorConfig,
    ) -> Self {
        Self {
            sensors,
            trees,
            events,
            cfg,
        }
    }

    /// Records one uplink and announces the reading.
    pub async fn handle_message(
        &self,
        ctx: &Context,
        msg: SensorMessage,
    ) -> Result<SensorData, ServiceError> {
        if msg.device.trim().is_empty() {
            return Err(ServiceError::BadRequest("sensor message without device id".into()));
        }
        validate_coordinates(msg.latitude, msg.longitude)?;

        let now = Utc::now();
        let data = SensorData {
            sensor_id: msg.device.clone(),
            battery: msg.battery,
            humidity: msg.humidity,
            temperature: msg.temperature,
            watermarks: msg.watermarks,
            received_at: now,
        };

        self.sensors
            .upsert(Sensor {
                id: msg.device,
                status: SensorStatus::Online,
                latitude: msg.latitude,
                longitude: msg.longitude,
                latest_data: Some(data.clone()),
                updated_at: now,
            })
            .await
            .map_err(|err| {
                error!(sensor_id = %data.sensor_id, error = %err, "failed to upsert sensor");
                ServiceError::from(err)
            })?;
        self.sensors.insert_data(data.clone()).await?;
        info!(sensor_id = %data.sensor_id, "sensor data received");

        debug!(
            event = EventKind::NewSensorData.as_label(),
            service = "SensorService",
            "publish new event"
        );
        if let Err(err) = self
            .events
            .publish(ctx, DomainEvent::NewSensorData { new: data.clone() })
            .await
        {
            error!(error = %err, "error while publishing sensor data event");
        }
        Ok(data)
    }

    /// Links `sensor_id` to the nearest free tree within range.
    ///
    /// Returns the linked tree, or `None` when the sensor is already linked or
    /// no candidate is close enough.
    pub async fn map_sensor_to_tree(
        &self,
        ctx: &Context,
        sensor_id: &str,
    ) -> Result<Option<Tree>, ServiceError> {
        match self.trees.get_by_sensor_id(sensor_id).await {
            Ok(_) => return Ok(None),
            Err(err) if err.is_not_found() => {}
            Err(err) => return Err(err.into()),
        }

        let sensor = self.sensors.get_by_id(sensor_id).await?;
        let nearest = self
            .trees
            .get_all()
            .await?
            .into_iter()
            .filter(|t| t.sensor_id.is_none())
            .map(|t| {
                let d =
                    haversine_distance(sensor.latitude, sensor.longitude, t.latitude, t.longitude);
                (d, t)
            })
            .filter(|(d, _)| *d <= self.cfg.max_tree_distance_m)
            .min_by(|(a, _), (b, _)| a.total_cmp(b));

        let Some((distance, prev)) = nearest else {
            debug!(sensor_id, "no tree in range of sensor");
            return Ok(None);
        };

        let watering_status = match &sensor.latest_data {
            Some(data) => {
                calculate_watering_status(prev.planting_year, Utc::now().year(), &data.watermarks)
            }
            None => prev.watering_status,
        };
        let updated = self
            .trees
            .save(Tree {
                sensor_id: Some(sensor.id.clone()),
                watering_status,
                ..prev.clone()
            })
            .await?;
        info!(
            sensor_id,
            tree_id = updated.id,
            distance_m = distance,
            "linked sensor to nearest tree"
        );

        debug!(
            event = EventKind::UpdateTree.as_label(),
            service = "SensorService",
            "publish new event"
        );
        if let Err(err) = self
            .events
            .publish(
                ctx,
                DomainEvent::UpdateTree {
                    prev,
                    new: updated.clone(),
                },
            )
            .await
        {
            error!(error = %err, "error while publishing tree update event");
        }
        Ok(Some(updated))
    }
}

/// Adapter: `NewSensorData` → [`SensorService::map_sensor_to_tree`].
pub struct SensorMappingHandler(pub Arc<SensorService>);

#[async_trait]
impl Handle<DomainEvent> for SensorMappingHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::NewSensorData
    }

    async fn handle_event(&self, ctx: &Context, event: &DomainEvent) -> Result<(), HandlerError> {
        let DomainEvent::NewSensorData { new } = event else {
            return Err(super::unexpected(EventKind::NewSensorData, event));
        };
        self.0.map_sensor_to_tree(ctx, &new.sensor_id).await?;
        Ok(())
    }

    fn name(&self) -> &'static str {
        "sensor.map_to_tree"
    }
}

/// Periodically marks silent sensors offline.
pub struct StatusScheduler {
    sensors: Arc<dyn SensorRepository>,
    stale_after: Duration,
}

impl StatusScheduler {
    pub fn new(sensors: Arc<dyn SensorRepository>, stale_after: Duration) -> Self {
        Self {
            sensors,
            stale_after,
        }
    }

    /// Ticks every `interval` until `ctx` ends. The first check runs immediately.
    pub async fn run(&self, ctx: &Context, interval: Duration) {
        let mut ticker = tokio::time::interval(interval);
        loop {
            tokio::select! {
                biased;
                _ = ctx.done() => {
                    info!("stopping sensor status scheduler");
                    return;
                }
                _ = ticker.tick() => {
                    if let Err(err) = self.update_stale_sensors().await {
                        error!(error = %err, "failed to update sensor status");
                    }
                }
            }
        }
    }

    /// Marks every sensor not updated within `stale_after` offline.
    ///
    /// Returns how many sensors changed state.
    pub async fn update_stale_sensors(&self) -> Result<usize, ServiceError> {
        let stale_after = chrono::Duration::from_std(self.stale_after)
            .map_err(|err| ServiceError::BadRequest(format!("invalid stale period: {err}")))?;
        let Some(cutoff) = Utc::now().checked_sub_signed(stale_after) else {
            return Ok(0);
        };

        let mut changed = 0;
        for sensor in self.sensors.get_all().await? {
            if sensor.status == SensorStatus::Offline || sensor.updated_at >= cutoff {
                continue;
            }
            let id = sensor.id.clone();
            match self
                .sensors
                .upsert(Sensor {
                    status: SensorStatus::Offline,
                    ..sensor
                })
                .await
            {
                Ok(_) => {
                    info!(sensor_id = %id, "sensor marked as offline due to inactivity");
                    changed += 1;
                }
                Err(err) => warn!(sensor_id = %id, error = %err, "failed to mark sensor offline"),
            }
        }
        Ok(changed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::memory::MemoryStore;

    #[test]
    fn test_haversine_distance() {
        assert!(haversine_distance(54.78, 9.43, 54.78, 9.43).abs() < 1e-6);
        // One millidegree of latitude is about 111 m.
        let d = haversine_distance(54.780, 9.43, 54.781, 9.43);
        assert!((d - 111.19).abs() < 0.5, "got {d}");
    }

    #[tokio::test]
    async fn test_stale_sensor_goes_offline() {
        let store = Arc::new(MemoryStore::new());
        let old = Utc::now() - chrono::Duration::hours(80);
        for (id, updated_at) in [("stale", old), ("fresh", Utc::now())] {
            SensorRepository::upsert(
                &*store,
                Sensor {
                    id: id.into(),
                    status: SensorStatus::Online,
                    latitude: 54.78,
                    longitude: 9.43,
                    latest_data: None,
                    updated_at,
                },
            )
            .await
            .unwrap();
        }

        let scheduler = StatusScheduler::new(store.clone(), SensorConfig::default().stale_after);
        assert_eq!(scheduler.update_stale_sensors().await.unwrap(), 1);
        assert_eq!(scheduler.update_stale_sensors().await.unwrap(), 0);

        let stale = SensorRepository::get_by_id(&*store, "stale").await.unwrap();
        assert_eq!(stale.status, SensorStatus::Offline);
        let fresh = SensorRepository::get_by_id(&*store, "fresh").await.unwrap();
        assert_eq!(fresh.status, SensorStatus::Online);
    }

    #[tokio::test]
    async fn test_scheduler_stops_on_cancel() {
        let store = Arc::new(MemoryStore::new());
        let scheduler = StatusScheduler::new(store, Duration::from_secs(1));
        let ctx = Context::background().with_cancel();
        ctx.cancel();

        tokio::time::timeout(Duration::from_secs(1), scheduler.run(&ctx, Duration::from_millis(10)))
            .await
            .expect("scheduler must stop once the context is cancelled");
    }
}
