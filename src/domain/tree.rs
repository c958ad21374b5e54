//! # Tree service.
//!
//! Commits tree mutations, then publishes `CreateTree` / `UpdateTree` /
//! `DeleteTree` with before/after snapshots. Reacts to `NewSensorData` by
//! re-rating the linked tree.
//!
//! Publishing is a side channel: a failed publish is logged and the committed
//! mutation stands.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{Datelike, Utc};
use tracing::{debug, error, info};

use super::entities::{SensorData, Tree, TreeCreate, TreeUpdate};
use super::error::ServiceError;
use super::events::{DomainEvent, EventKind};
use super::storage::{SensorRepository, TreeClusterRepository, TreeRepository};
use super::validate_coordinates;
use super::watering::calculate_watering_status;
use crate::context::Context;
use crate::error::HandlerError;
use crate::events::EventManager;
use crate::handlers::Handle;

pub struct TreeService {
    trees: Arc<dyn TreeRepository>,
    clusters: Arc<dyn TreeClusterRepository>,
    sensors: Arc<dyn SensorRepository>,
    events: Arc<EventManager<DomainEvent>>,
}

impl TreeService {
    pub fn new(
        trees: Arc<dyn TreeRepository>,
        clusters: Arc<dyn TreeClusterRepository>,
        sensors: Arc<dyn SensorRepository>,
        events: Arc<EventManager<DomainEvent>>,
    ) -> Self {
        Self {
            trees,
            clusters,
            sensors,
            events,
        }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<Tree, ServiceError> {
        Ok(self.trees.get_by_id(id).await?)
    }

    pub async fn create(&self, ctx: &Context, create: TreeCreate) -> Result<Tree, ServiceError> {
        validate_coordinates(create.latitude, create.longitude)?;
        self.check_references(create.tree_cluster_id, create.sensor_id.as_deref())
            .await?;

        let tree = self.trees.create(create).await.map_err(|err| {
            error!(error = %err, "failed to create tree");
            ServiceError::from(err)
        })?;

        info!(tree_id = tree.id, "successfully created tree");
        self.publish(ctx, DomainEvent::CreateTree { new: tree.clone() })
            .await;
        Ok(tree)
    }

    pub async fn update(
        &self,
        ctx: &Context,
        id: i32,
        update: TreeUpdate,
    ) -> Result<Tree, ServiceError> {
        validate_coordinates(update.latitude, update.longitude)?;
        let prev = self.trees.get_by_id(id).await?;
        self.check_references(update.tree_cluster_id, update.sensor_id.as_deref())
            .await?;

        let next = Tree {
            tree_cluster_id: update.tree_cluster_id,
            sensor_id: update.sensor_id,
            planting_year: update.planting_year,
            species: update.species,
            number: update.number,
            latitude: update.latitude,
            longitude: update.longitude,
            description: update.description,
            ..prev.clone()
        };
        let updated = self.trees.save(next).await.map_err(|err| {
            error!(error = %err, tree_id = id, "failed to update tree");
            ServiceError::from(err)
        })?;

        info!(tree_id = id, "successfully updated tree");
        self.publish(
            ctx,
            DomainEvent::UpdateTree {
                prev,
                new: updated.clone(),
            },
        )
        .await;
        Ok(updated)
    }

    pub async fn delete(&self, ctx: &Context, id: i32) -> Result<(), ServiceError> {
        let prev = self.trees.get_by_id(id).await?;
        self.trees.delete(id).await.map_err(|err| {
            error!(error = %err, tree_id = id, "failed to delete tree");
            ServiceError::from(err)
        })?;

        info!(tree_id = id, "successfully deleted tree");
        self.publish(ctx, DomainEvent::DeleteTree { prev }).await;
        Ok(())
    }

    /// Re-rates the tree linked to the reporting sensor.
    ///
    /// A reading from a sensor without a tree is not an error.
    pub async fn handle_new_sensor_data(
        &self,
        ctx: &Context,
        data: &SensorData,
    ) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::NewSensorData.as_label(),
            service = "TreeService",
            "handle event"
        );
        let prev = match self.trees.get_by_sensor_id(&data.sensor_id).await {
            Ok(tree) => tree,
            Err(err) if err.is_not_found() => {
                debug!(sensor_id = %data.sensor_id, "no tree linked to sensor");
                return Ok(());
            }
            Err(err) => return Err(err.into()),
        };

        let status =
            calculate_watering_status(prev.planting_year, Utc::now().year(), &data.watermarks);
        if status == prev.watering_status {
            return Ok(());
        }

        let updated = self
            .trees
            .save(Tree {
                watering_status: status,
                ..prev.clone()
            })
            .await?;
        info!(
            tree_id = prev.id,
            prev_status = prev.watering_status.as_label(),
            new_status = status.as_label(),
            "updating tree watering status"
        );

        self.publish(ctx, DomainEvent::UpdateTree { prev, new: updated })
            .await;
        Ok(())
    }

    async fn check_references(
        &self,
        cluster_id: Option<i32>,
        sensor_id: Option<&str>,
    ) -> Result<(), ServiceError> {
        if let Some(id) = cluster_id {
            self.clusters.get_by_id(id).await.map_err(|err| {
                error!(tree_cluster_id = id, "failed to find tree cluster referenced by tree");
                ServiceError::from(err)
            })?;
        }
        if let Some(id) = sensor_id {
            self.sensors.get_by_id(id).await.map_err(|err| {
                error!(sensor_id = id, "failed to find sensor referenced by tree");
                ServiceError::from(err)
            })?;
        }
        Ok(())
    }

    async fn publish(&self, ctx: &Context, event: DomainEvent) {
        let kind = crate::events::Event::kind(&event);
        debug!(event = kind.as_label(), service = "TreeService", "publish new event");
        if let Err(err) = self.events.publish(ctx, event).await {
            error!(event = kind.as_label(), error = %err, "error while publishing tree event");
        }
    }
}

/// Adapter: `NewSensorData` → [`TreeService::handle_new_sensor_data`].
pub struct TreeSensorDataHandler(pub Arc<TreeService>);

#[async_trait]
impl Handle<DomainEvent> for TreeSensorDataHandler {
    fn event_kind(&self) -> EventKind {
        EventKind::NewSensorData
    }

    async fn handle_event(&self, ctx: &Context, event: &DomainEvent) -> Result<(), HandlerError> {
        match event {
            DomainEvent::NewSensorData { new } => {
                Ok(self.0.handle_new_sensor_data(ctx, new).await?)
            }
            other => Err(super::unexpected(EventKind::NewSensorData, other)),
        }
    }

    fn name(&self) -> &'static str {
        "tree.sensor_data"
    }
}
