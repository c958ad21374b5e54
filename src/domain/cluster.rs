//! # Tree cluster reactions.
//!
//! The cluster aggregate is never written by the tree service directly: it
//! follows tree changes through events and is eventually consistent with them.
//!
//! | Event                 | Reaction                                               |
//! |-----------------------|--------------------------------------------------------|
//! | `CreateTree`          | recompute the new tree's cluster                       |
//! | `UpdateTree`          | recompute old and new cluster if cluster or status moved |
//! | `DeleteTree`          | recompute the former cluster                           |
//! | `NewSensorData`       | recompute the cluster of the sensor's tree             |
//! | `UpdateWateringPlan`  | on transition to `Finished`: clusters → `JustWatered`  |
//!
//! Each reaction runs on its own runner. The read-aggregate-save of one
//! cluster runs under a per-cluster lock.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};
use tracing::{debug, info};

use super::entities::{
    SensorData, Tree, TreeCluster, WateringPlan, WateringPlanStatus, WateringStatus,
};
use super::error::ServiceError;
use super::events::{DomainEvent, EventKind};
use super::storage::{TreeClusterRepository, TreeRepository};
use super::watering::aggregate_cluster_status;
use crate::context::Context;
use crate::error::HandlerError;
use crate::handlers::Handle;

pub struct TreeClusterService {
    trees: Arc<dyn TreeRepository>,
    clusters: Arc<dyn TreeClusterRepository>,
    locks: Mutex<HashMap<i32, Arc<AsyncMutex<()>>>>,
}

impl TreeClusterService {
    pub fn new(trees: Arc<dyn TreeRepository>, clusters: Arc<dyn TreeClusterRepository>) -> Self {
        Self {
            trees,
            clusters,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// Exclusive access to one cluster's read-modify-write.
    async fn lock_cluster(&self, id: i32) -> OwnedMutexGuard<()> {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(id).or_default())
        };
        lock.lock_owned().await
    }

    pub async fn get_by_id(&self, id: i32) -> Result<TreeCluster, ServiceError> {
        Ok(self.clusters.get_by_id(id).await?)
    }

    pub async fn handle_create_tree(&self, new: &Tree) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::CreateTree.as_label(),
            service = "TreeClusterService",
            "handle event"
        );
        match new.tree_cluster_id {
            Some(id) => self.recompute(id).await,
            None => Ok(()),
        }
    }

    pub async fn handle_update_tree(&self, prev: &Tree, new: &Tree) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::UpdateTree.as_label(),
            service = "TreeClusterService",
            "handle event"
        );
        if prev.tree_cluster_id == new.tree_cluster_id
            && prev.watering_status == new.watering_status
        {
            return Ok(());
        }

        if prev.tree_cluster_id != new.tree_cluster_id {
            if let Some(id) = prev.tree_cluster_id {
                self.recompute(id).await?;
            }
        }
        match new.tree_cluster_id {
            Some(id) => self.recompute(id).await,
            None => Ok(()),
        }
    }

    pub async fn handle_delete_tree(&self, prev: &Tree) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::DeleteTree.as_label(),
            service = "TreeClusterService",
            "handle event"
        );
        match prev.tree_cluster_id {
            Some(id) => self.recompute(id).await,
            None => Ok(()),
        }
    }

    pub async fn handle_new_sensor_data(&self, data: &SensorData) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::NewSensorData.as_label(),
            service = "TreeClusterService",
            "handle event"
        );
        let tree = match self.trees.get_by_sensor_id(&data.sensor_id).await {
            Ok(tree) => tree,
            Err(err) if err.is_not_found() => return Ok(()),
            Err(err) => return Err(err.into()),
        };
        match tree.tree_cluster_id {
            Some(id) => self.recompute(id).await,
            None => Ok(()),
        }
    }

    pub async fn handle_update_watering_plan(
        &self,
        prev: &WateringPlan,
        new: &WateringPlan,
    ) -> Result<(), ServiceError> {
        debug!(
            event = EventKind::UpdateWateringPlan.as_label(),
            service = "TreeClusterService",
            "handle event"
        );
        if new.status != WateringPlanStatus::Finished
            || prev.status == WateringPlanStatus::Finished
        {
            return Ok(());
        }
        for &id in &new.tree_cluster_ids {
            self.mark_watered(id, new.date).await?;
        }
        Ok(())
    }

    async fn mark_watered(&self, id: i32, date: DateTime<Utc>) -> Result<(), ServiceError> {
        let _guard = self.lock_cluster(id).await;
        let cluster = self.clusters.get_by_id(id).await?;
        self.clusters
            .save(TreeCluster {
                watering_status: WateringStatus::JustWatered,
                last_watered: Some(date),
                ..cluster
            })
            .await?;
        info!(tree_cluster_id = id, "tree cluster marked as just watered");
        Ok(())
    }

    /// Re-aggregates the cluster status; writes only on change.
    async fn recompute(&self, id: i32) -> Result<(), ServiceError> {
        let _guard = self.lock_cluster(id).await;
        let cluster = self.clusters.get_by_id(id).await?;
        let trees = self.trees.get_by_cluster_id(id).await?;
        let status = aggregate_cluster_status(&trees);
        if status == cluster.watering_status {
            return Ok(());
        }

        info!(
            tree_cluster_id = id,
            prev_status = cluster.watering_status.as_label(),
            new_status = status.as_label(),
            "updating tree cluster watering status"
        );
        self.clusters
            .save(TreeCluster {
                watering_status: status,
                ..cluster
            })
            .await?;
        Ok(())
    }
}

/// Subscribes [`TreeClusterService`] to one event kind.
pub struct TreeClusterHandler {
    service: Arc<TreeClusterService>,
    kind: EventKind,
}

impl TreeClusterHandler {
    pub fn new(service: Arc<TreeClusterService>, kind: EventKind) -> Self {
        Self { service, kind }
    }

    /// One handler per kind the cluster service reacts to.
    pub fn all(service: &Arc<TreeClusterService>) -> Vec<Self> {
        EventKind::ALL
            .into_iter()
            .map(|kind| Self::new(Arc::clone(service), kind))
            .collect()
    }
}

#[async_trait]
impl Handle<DomainEvent> for TreeClusterHandler {
    fn event_kind(&self) -> EventKind {
        self.kind
    }

    async fn handle_event(&self, _ctx: &Context, event: &DomainEvent) -> Result<(), HandlerError> {
        let res = match (self.kind, event) {
            (EventKind::CreateTree, DomainEvent::CreateTree { new }) => {
                self.service.handle_create_tree(new).await
            }
            (EventKind::UpdateTree, DomainEvent::UpdateTree { prev, new }) => {
                self.service.handle_update_tree(prev, new).await
            }
            (EventKind::DeleteTree, DomainEvent::DeleteTree { prev }) => {
                self.service.handle_delete_tree(prev).await
            }
            (EventKind::NewSensorData, DomainEvent::NewSensorData { new }) => {
                self.service.handle_new_sensor_data(new).await
            }
            (EventKind::UpdateWateringPlan, DomainEvent::UpdateWateringPlan { prev, new }) => {
                self.service.handle_update_watering_plan(prev, new).await
            }
            (expected, other) => return Err(super::unexpected(expected, other)),
        };
        Ok(res?)
    }

    fn name(&self) -> &'static str {
        match self.kind {
            EventKind::CreateTree => "tree_cluster.create_tree",
            EventKind::UpdateTree => "tree_cluster.update_tree",
            EventKind::DeleteTree => "tree_cluster.delete_tree",
            EventKind::NewSensorData => "tree_cluster.sensor_data",
            EventKind::UpdateWateringPlan => "tree_cluster.watering_plan",
        }
    }
}
