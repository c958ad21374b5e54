//! # Domain event taxonomy.
//!
//! | Kind                 | Publisher            | Consumers                         |
//! |----------------------|----------------------|-----------------------------------|
//! | `CreateTree`         | TreeService          | TreeClusterService                |
//! | `UpdateTree`         | TreeService, SensorService | TreeClusterService          |
//! | `DeleteTree`         | TreeService          | TreeClusterService                |
//! | `NewSensorData`      | SensorService        | TreeService, TreeClusterService, SensorService |
//! | `UpdateWateringPlan` | WateringPlanService  | TreeClusterService                |

use super::entities::{SensorData, Tree, WateringPlan};
use crate::events::Event;

/// Discrete category of a [`DomainEvent`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    CreateTree,
    UpdateTree,
    DeleteTree,
    NewSensorData,
    UpdateWateringPlan,
}

impl EventKind {
    /// Every kind the green-space services register with the manager.
    pub const ALL: [EventKind; 5] = [
        EventKind::CreateTree,
        EventKind::UpdateTree,
        EventKind::DeleteTree,
        EventKind::NewSensorData,
        EventKind::UpdateWateringPlan,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            EventKind::CreateTree => "create tree",
            EventKind::UpdateTree => "update tree",
            EventKind::DeleteTree => "delete tree",
            EventKind::NewSensorData => "receive sensor data",
            EventKind::UpdateWateringPlan => "update watering plan",
        }
    }
}

/// Snapshot-carrying domain change.
#[derive(Debug, Clone)]
pub enum DomainEvent {
    CreateTree { new: Tree },
    UpdateTree { prev: Tree, new: Tree },
    DeleteTree { prev: Tree },
    NewSensorData { new: SensorData },
    UpdateWateringPlan { prev: WateringPlan, new: WateringPlan },
}

impl Event for DomainEvent {
    type Kind = EventKind;

    fn kind(&self) -> EventKind {
        match self {
            DomainEvent::CreateTree { .. } => EventKind::CreateTree,
            DomainEvent::UpdateTree { .. } => EventKind::UpdateTree,
            DomainEvent::DeleteTree { .. } => EventKind::DeleteTree,
            DomainEvent::NewSensorData { .. } => EventKind::NewSensorData,
            DomainEvent::UpdateWateringPlan { .. } => EventKind::UpdateWateringPlan,
        }
    }
}
