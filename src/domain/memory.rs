//! # In-memory repositories.
//!
//! [`MemoryStore`] implements every repository trait over `tokio::sync::RwLock`
//! maps. Used by tests and the demo in place of Postgres.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::Utc;
use tokio::sync::RwLock;

use super::entities::{
    Sensor, SensorData, Tree, TreeCluster, TreeCreate, WateringPlan, WateringPlanCreate,
    WateringPlanStatus, WateringStatus,
};
use super::storage::{
    SensorRepository, StorageError, StorageResult, TreeClusterRepository, TreeRepository,
    WateringPlanRepository,
};

#[derive(Default)]
struct Tables {
    trees: BTreeMap<i32, Tree>,
    clusters: BTreeMap<i32, TreeCluster>,
    sensors: BTreeMap<String, Sensor>,
    sensor_data: Vec<SensorData>,
    plans: BTreeMap<i32, WateringPlan>,
    next_tree: i32,
    next_cluster: i32,
    next_plan: i32,
}

/// Thread-safe in-memory store.
#[derive(Default)]
pub struct MemoryStore {
    tables: RwLock<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds a tree cluster (cluster management is not part of the event core).
    pub async fn insert_cluster(&self, name: &str) -> TreeCluster {
        let mut t = self.tables.write().await;
        t.next_cluster += 1;
        let cluster = TreeCluster {
            id: t.next_cluster,
            name: name.to_string(),
            watering_status: WateringStatus::Unknown,
            last_watered: None,
            updated_at: Utc::now(),
        };
        t.clusters.insert(cluster.id, cluster.clone());
        cluster
    }

    /// Number of stored sensor readings.
    pub async fn sensor_data_len(&self) -> usize {
        self.tables.read().await.sensor_data.len()
    }
}

#[async_trait]
impl TreeRepository for MemoryStore {
    async fn get_all(&self) -> StorageResult<Vec<Tree>> {
        Ok(self.tables.read().await.trees.values().cloned().collect())
    }

    async fn get_by_id(&self, id: i32) -> StorageResult<Tree> {
        self.tables
            .read()
            .await
            .trees
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("tree", id))
    }

    async fn get_by_sensor_id(&self, sensor_id: &str) -> StorageResult<Tree> {
        self.tables
            .read()
            .await
            .trees
            .values()
            .find(|t| t.sensor_id.as_deref() == Some(sensor_id))
            .cloned()
            .ok_or_else(|| StorageError::not_found("tree by sensor", sensor_id))
    }

    async fn get_by_cluster_id(&self, cluster_id: i32) -> StorageResult<Vec<Tree>> {
        Ok(self
            .tables
            .read()
            .await
            .trees
            .values()
            .filter(|t| t.tree_cluster_id == Some(cluster_id))
            .cloned()
            .collect())
    }

    async fn create(&self, c: TreeCreate) -> StorageResult<Tree> {
        let mut t = self.tables.write().await;
        t.next_tree += 1;
        let tree = Tree {
            id: t.next_tree,
            tree_cluster_id: c.tree_cluster_id,
            sensor_id: c.sensor_id,
            planting_year: c.planting_year,
            species: c.species,
            number: c.number,
            latitude: c.latitude,
            longitude: c.longitude,
            watering_status: WateringStatus::Unknown,
            description: c.description,
            readonly: c.readonly,
            updated_at: Utc::now(),
        };
        t.trees.insert(tree.id, tree.clone());
        Ok(tree)
    }

    async fn save(&self, mut tree: Tree) -> StorageResult<Tree> {
        let mut t = self.tables.write().await;
        if !t.trees.contains_key(&tree.id) {
            return Err(StorageError::not_found("tree", tree.id));
        }
        tree.updated_at = Utc::now();
        t.trees.insert(tree.id, tree.clone());
        Ok(tree)
    }

    async fn delete(&self, id: i32) -> StorageResult<()> {
        self.tables
            .write()
            .await
            .trees
            .remove(&id)
            .map(|_| ())
            .ok_or_else(|| StorageError::not_found("tree", id))
    }
}

#[async_trait]
impl TreeClusterRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> StorageResult<TreeCluster> {
        self.tables
            .read()
            .await
            .clusters
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("tree cluster", id))
    }

    async fn save(&self, mut cluster: TreeCluster) -> StorageResult<TreeCluster> {
        let mut t = self.tables.write().await;
        if !t.clusters.contains_key(&cluster.id) {
            return Err(StorageError::not_found("tree cluster", cluster.id));
        }
        cluster.updated_at = Utc::now();
        t.clusters.insert(cluster.id, cluster.clone());
        Ok(cluster)
    }
}

#[async_trait]
impl SensorRepository for MemoryStore {
    async fn get_all(&self) -> StorageResult<Vec<Sensor>> {
        Ok(self.tables.read().await.sensors.values().cloned().collect())
    }

    async fn get_by_id(&self, id: &str) -> StorageResult<Sensor> {
        self.tables
            .read()
            .await
            .sensors
            .get(id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("sensor", id))
    }

    async fn upsert(&self, sensor: Sensor) -> StorageResult<Sensor> {
        self.tables
            .write()
            .await
            .sensors
            .insert(sensor.id.clone(), sensor.clone());
        Ok(sensor)
    }

    async fn insert_data(&self, data: SensorData) -> StorageResult<()> {
        let mut t = self.tables.write().await;
        if !t.sensors.contains_key(&data.sensor_id) {
            return Err(StorageError::not_found("sensor", &data.sensor_id));
        }
        t.sensor_data.push(data);
        Ok(())
    }
}

#[async_trait]
impl WateringPlanRepository for MemoryStore {
    async fn get_by_id(&self, id: i32) -> StorageResult<WateringPlan> {
        self.tables
            .read()
            .await
            .plans
            .get(&id)
            .cloned()
            .ok_or_else(|| StorageError::not_found("watering plan", id))
    }

    async fn create(&self, c: WateringPlanCreate) -> StorageResult<WateringPlan> {
        let mut t = self.tables.write().await;
        t.next_plan += 1;
        let plan = WateringPlan {
            id: t.next_plan,
            date: c.date,
            description: c.description,
            status: WateringPlanStatus::Planned,
            tree_cluster_ids: c.tree_cluster_ids,
            cancellation_note: String::new(),
        };
        t.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }

    async fn save(&self, plan: WateringPlan) -> StorageResult<WateringPlan> {
        let mut t = self.tables.write().await;
        if !t.plans.contains_key(&plan.id) {
            return Err(StorageError::not_found("watering plan", plan.id));
        }
        t.plans.insert(plan.id, plan.clone());
        Ok(plan)
    }
}
