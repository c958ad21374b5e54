//! Watering plans: creation and status transitions.

use std::sync::Arc;

use tracing::{debug, error, info};

use super::entities::{WateringPlan, WateringPlanCreate, WateringPlanStatus};
use super::error::ServiceError;
use super::events::{DomainEvent, EventKind};
use super::storage::{TreeClusterRepository, WateringPlanRepository};
use crate::context::Context;
use crate::events::EventManager;

pub struct WateringPlanService {
    plans: Arc<dyn WateringPlanRepository>,
    clusters: Arc<dyn TreeClusterRepository>,
    events: Arc<EventManager<DomainEvent>>,
}

impl WateringPlanService {
    pub fn new(
        plans: Arc<dyn WateringPlanRepository>,
        clusters: Arc<dyn TreeClusterRepository>,
        events: Arc<EventManager<DomainEvent>>,
    ) -> Self {
        Self {
            plans,
            clusters,
            events,
        }
    }

    pub async fn get_by_id(&self, id: i32) -> Result<WateringPlan, ServiceError> {
        Ok(self.plans.get_by_id(id).await?)
    }

    pub async fn create(&self, create: WateringPlanCreate) -> Result<WateringPlan, ServiceError> {
        if create.tree_cluster_ids.is_empty() {
            return Err(ServiceError::BadRequest(
                "watering plan needs at least one tree cluster".into(),
            ));
        }
        for &id in &create.tree_cluster_ids {
            self.clusters.get_by_id(id).await?;
        }

        let plan = self.plans.create(create).await.map_err(|err| {
            error!(error = %err, "failed to create watering plan");
            ServiceError::from(err)
        })?;
        info!(watering_plan_id = plan.id, "successfully created watering plan");
        Ok(plan)
    }

    /// Moves a plan to `status` and publishes the transition.
    ///
    /// `cancellation_note` is kept only for `Canceled`.
    pub async fn update_status(
        &self,
        ctx: &Context,
        id: i32,
        status: WateringPlanStatus,
        cancellation_note: Option<String>,
    ) -> Result<WateringPlan, ServiceError> {
        let prev = self.plans.get_by_id(id).await?;
        let cancellation_note = match status {
            WateringPlanStatus::Canceled => cancellation_note.unwrap_or_default(),
            _ => String::new(),
        };

        let updated = self
            .plans
            .save(WateringPlan {
                status,
                cancellation_note,
                ..prev.clone()
            })
            .await
            .map_err(|err| {
                error!(watering_plan_id = id, error = %err, "failed to update watering plan");
                ServiceError::from(err)
            })?;
        info!(watering_plan_id = id, status = ?status, "successfully updated watering plan");

        debug!(
            event = EventKind::UpdateWateringPlan.as_label(),
            service = "WateringPlanService",
            "publish new event"
        );
        if let Err(err) = self
            .events
            .publish(
                ctx,
                DomainEvent::UpdateWateringPlan {
                    prev,
                    new: updated.clone(),
                },
            )
            .await
        {
            error!(error = %err, "error while publishing watering plan event");
        }
        Ok(updated)
    }
}
