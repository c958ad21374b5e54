//! # Example: green_space
//!
//! Wires the green-space services over an in-memory store and drives one
//! sensor through the whole choreography.
//!
//! Shows how to:
//! - Build an [`EventManager`] for every [`EventKind`].
//! - Hand [`Services::handlers`] plus a [`LogWriter`] to a [`Supervisor`].
//! - Run the sensor [`StatusScheduler`](greenbus::domain::StatusScheduler) next to it.
//!
//! ## Flow
//! ```text
//! TreeService::create ──► CreateTree ──► TreeClusterHandler
//! SensorService::handle_message ──► NewSensorData
//!     ├─► SensorMappingHandler ──► UpdateTree ──► TreeClusterHandler, LogWriter
//!     └─► TreeSensorDataHandler
//! WateringPlanService::update_status(Finished) ──► UpdateWateringPlan ──► TreeClusterHandler
//! ```
//!
//! ## Run
//! ```bash
//! RUST_LOG=info,greenbus=debug cargo run --example green_space --features logging
//! ```

use std::sync::Arc;
use std::time::Duration;

use chrono::{Datelike, Utc};
use greenbus::domain::{
    DomainEvent, EventKind, MemoryStore, SensorConfig, SensorMessage, Services, TreeCreate,
    WateringPlanCreate, WateringPlanStatus, Watermark,
};
use greenbus::{Config, Context, EventManager, Handle, LogWriter, Supervisor};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let store = Arc::new(MemoryStore::new());
    let manager = Arc::new(EventManager::<DomainEvent>::new(EventKind::ALL));
    let sensor_cfg = SensorConfig::default();
    let check_interval = sensor_cfg.check_interval;
    let services = Services::new(store.clone(), manager.clone(), sensor_cfg);

    let mut handlers = services.handlers();
    let log: Arc<dyn Handle<DomainEvent>> = Arc::new(LogWriter::new(EventKind::UpdateTree));
    handlers.push(log);
    let sup = Supervisor::builder(Config::default(), manager.clone())
        .with_handlers(handlers)
        .build();

    let ctx = Context::background().with_cancel();
    let run = {
        let (sup, ctx) = (Arc::clone(&sup), ctx.clone());
        tokio::spawn(async move { sup.run(&ctx).await })
    };
    let scheduler = {
        let (scheduler, ctx) = (Arc::clone(&services.status_scheduler), ctx.clone());
        tokio::spawn(async move { scheduler.run(&ctx, check_interval).await })
    };
    // Let the runners subscribe.
    tokio::time::sleep(Duration::from_millis(50)).await;

    let cluster = store.insert_cluster("Solitüde Strand").await;
    let tree = services
        .trees
        .create(
            &ctx,
            TreeCreate {
                tree_cluster_id: Some(cluster.id),
                planting_year: Utc::now().year() - 1,
                species: "Acer platanoides".into(),
                number: "1042".into(),
                latitude: 54.8092,
                longitude: 9.4991,
                ..TreeCreate::default()
            },
        )
        .await?;

    services
        .sensors
        .handle_message(
            &ctx,
            SensorMessage {
                device: "eui-70b3d57ed006209f".into(),
                battery: 3.5,
                humidity: 62.0,
                temperature: 11.2,
                latitude: 54.80921,
                longitude: 9.4991,
                watermarks: vec![
                    Watermark { centibar: 45, resistance: 1800, depth: 30 },
                    Watermark { centibar: 70, resistance: 2400, depth: 60 },
                    Watermark { centibar: 20, resistance: 900, depth: 90 },
                ],
            },
        )
        .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let tree = services.trees.get_by_id(tree.id).await?;
    let rated = services.clusters.get_by_id(cluster.id).await?;
    println!(
        "tree {} linked to {:?}: {}, cluster '{}': {}",
        tree.number,
        tree.sensor_id,
        tree.watering_status.as_label(),
        rated.name,
        rated.watering_status.as_label()
    );

    let plan = services
        .watering_plans
        .create(WateringPlanCreate {
            date: Utc::now(),
            description: "evening round".into(),
            tree_cluster_ids: vec![cluster.id],
        })
        .await?;
    services
        .watering_plans
        .update_status(&ctx, plan.id, WateringPlanStatus::Finished, None)
        .await?;
    tokio::time::sleep(Duration::from_millis(100)).await;

    let watered = services.clusters.get_by_id(cluster.id).await?;
    println!(
        "cluster '{}' after plan {}: {} (last watered {:?})",
        watered.name,
        plan.id,
        watered.watering_status.as_label(),
        watered.last_watered
    );
    println!("dispatcher: {:?}", manager.stats());

    ctx.cancel();
    scheduler.await?;
    run.await??;
    Ok(())
}
