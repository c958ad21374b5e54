//! Repository seams the services commit through.
//!
//! Implementations live outside the event core (Postgres in production,
//! [`MemoryStore`](super::MemoryStore) in tests and demos).

use async_trait::async_trait;
use thiserror::Error;

use super::entities::{
    Sensor, SensorData, Tree, TreeCluster, TreeCreate, WateringPlan, WateringPlanCreate,
};

#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("storage backend error: {0}")]
    Backend(String),
}

impl StorageError {
    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        StorageError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, StorageError::NotFound { .. })
    }
}

pub type StorageResult<T> = Result<T, StorageError>;

#[async_trait]
pub trait TreeRepository: Send + Sync + 'static {
    async fn get_all(&self) -> StorageResult<Vec<Tree>>;
    async fn get_by_id(&self, id: i32) -> StorageResult<Tree>;
    async fn get_by_sensor_id(&self, sensor_id: &str) -> StorageResult<Tree>;
    async fn get_by_cluster_id(&self, cluster_id: i32) -> StorageResult<Vec<Tree>>;
    async fn create(&self, create: TreeCreate) -> StorageResult<Tree>;
    /// Replaces an existing tree; returns the stored value.
    async fn save(&self, tree: Tree) -> StorageResult<Tree>;
    async fn delete(&self, id: i32) -> StorageResult<()>;
}

#[async_trait]
pub trait TreeClusterRepository: Send + Sync + 'static {
    async fn get_by_id(&self, id: i32) -> StorageResult<TreeCluster>;
    async fn save(&self, cluster: TreeCluster) -> StorageResult<TreeCluster>;
}

#[async_trait]
pub trait SensorRepository: Send + Sync + 'static {
    async fn get_all(&self) -> StorageResult<Vec<Sensor>>;
    async fn get_by_id(&self, id: &str) -> StorageResult<Sensor>;
    /// Inserts or replaces a sensor.
    async fn upsert(&self, sensor: Sensor) -> StorageResult<Sensor>;
    async fn insert_data(&self, data: SensorData) -> StorageResult<()>;
}

#[async_trait]
pub trait WateringPlanRepository: Send + Sync + 'static {
    async fn get_by_id(&self, id: i32) -> StorageResult<WateringPlan>;
    async fn create(&self, create: WateringPlanCreate) -> StorageResult<WateringPlan>;
    async fn save(&self, plan: WateringPlan) -> StorageResult<WateringPlan>;
}
