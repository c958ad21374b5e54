//! Domain entities carried in event payloads.

use chrono::{DateTime, Utc};

/// Watering condition of a tree or a tree cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WateringStatus {
    Good,
    Moderate,
    Bad,
    JustWatered,
    #[default]
    Unknown,
}

impl WateringStatus {
    /// Ordering used to aggregate statuses: higher is worse.
    ///
    /// `Unknown` carries no information and ranks lowest.
    pub fn severity(self) -> u8 {
        match self {
            WateringStatus::Unknown => 0,
            WateringStatus::JustWatered => 1,
            WateringStatus::Good => 2,
            WateringStatus::Moderate => 3,
            WateringStatus::Bad => 4,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            WateringStatus::Good => "good",
            WateringStatus::Moderate => "moderate",
            WateringStatus::Bad => "bad",
            WateringStatus::JustWatered => "just watered",
            WateringStatus::Unknown => "unknown",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SensorStatus {
    Online,
    Offline,
    #[default]
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum WateringPlanStatus {
    #[default]
    Planned,
    Active,
    Canceled,
    Finished,
    NotCompeted,
    Unknown,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Tree {
    pub id: i32,
    pub tree_cluster_id: Option<i32>,
    pub sensor_id: Option<String>,
    pub planting_year: i32,
    pub species: String,
    pub number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub watering_status: WateringStatus,
    pub description: String,
    /// Imported from an external register.
    pub readonly: bool,
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a tree.
#[derive(Debug, Clone, Default)]
pub struct TreeCreate {
    pub tree_cluster_id: Option<i32>,
    pub sensor_id: Option<String>,
    pub planting_year: i32,
    pub species: String,
    pub number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
    pub readonly: bool,
}

/// Full replacement of the mutable tree fields.
#[derive(Debug, Clone, Default)]
pub struct TreeUpdate {
    pub tree_cluster_id: Option<i32>,
    pub sensor_id: Option<String>,
    pub planting_year: i32,
    pub species: String,
    pub number: String,
    pub latitude: f64,
    pub longitude: f64,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TreeCluster {
    pub id: i32,
    pub name: String,
    pub watering_status: WateringStatus,
    pub last_watered: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

/// Soil moisture tension at one depth.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Watermark {
    pub centibar: i32,
    pub resistance: i32,
    /// Depth in centimetres (30, 60 or 90).
    pub depth: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SensorData {
    pub sensor_id: String,
    pub battery: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub watermarks: Vec<Watermark>,
    pub received_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Sensor {
    pub id: String,
    pub status: SensorStatus,
    pub latitude: f64,
    pub longitude: f64,
    pub latest_data: Option<SensorData>,
    pub updated_at: DateTime<Utc>,
}

/// Decoded uplink of a field sensor (the MQTT payload).
#[derive(Debug, Clone, PartialEq)]
pub struct SensorMessage {
    pub device: String,
    pub battery: f64,
    pub humidity: f64,
    pub temperature: f64,
    pub latitude: f64,
    pub longitude: f64,
    pub watermarks: Vec<Watermark>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WateringPlan {
    pub id: i32,
    pub date: DateTime<Utc>,
    pub description: String,
    pub status: WateringPlanStatus,
    pub tree_cluster_ids: Vec<i32>,
    pub cancellation_note: String,
}

/// Input for creating a watering plan.
#[derive(Debug, Clone)]
pub struct WateringPlanCreate {
    pub date: DateTime<Utc>,
    pub description: String,
    pub tree_cluster_ids: Vec<i32>,
}
