//! Delivery driver and route administration commands.
//!
//! The claimed route is held in memory, so `claim` followed by the shipment
//! commands is meant to run inside `rt-cli shell`.

use std::path::PathBuf;

use clap::{Args, Subcommand};
use redthread_client::AppState;
use redthread_client::api::Evidence;
use redthread_client::services::{DriverBoard, Stage};
use redthread_core::{OrderId, RouteId, ShipmentId};

use super::{CommandError, money};

/// Photo evidence with an optional GPS fix.
#[derive(Args)]
pub struct EvidenceArgs {
    /// Photo of the delivery or the attempt
    #[arg(long)]
    photo: PathBuf,
    #[arg(long, requires = "lng", allow_negative_numbers = true)]
    lat: Option<f64>,
    #[arg(long, requires = "lat", allow_negative_numbers = true)]
    lng: Option<f64>,
}

impl From<EvidenceArgs> for Evidence {
    fn from(args: EvidenceArgs) -> Self {
        let evidence = Self::photo(args.photo);
        match (args.lat, args.lng) {
            (Some(lat), Some(lng)) => evidence.at(lat, lng),
            _ => evidence,
        }
    }
}

#[derive(Subcommand)]
pub enum DriverAction {
    /// List active routes nobody has taken
    Routes,
    /// Take a route and show its shipments
    Claim { id: RouteId },
    /// Reload the claimed route's shipments
    Shipments,
    /// Switch between Recoger, Entregar and Retorno
    Stage { stage: Stage },
    /// Report a shipment as picked up
    Pickup { id: ShipmentId },
    /// Report a shipment as delivered
    Deliver {
        id: ShipmentId,
        /// Who received the package
        #[arg(long)]
        receiver: String,
        #[command(flatten)]
        evidence: EvidenceArgs,
    },
    /// Report a failed delivery attempt
    Fail {
        id: ShipmentId,
        #[arg(long)]
        reason: String,
        #[command(flatten)]
        evidence: EvidenceArgs,
    },
}

#[derive(Subcommand)]
pub enum RoutesAction {
    /// Create a route from orders
    Create {
        #[arg(short, long)]
        name: String,
        /// Comma-separated order IDs
        #[arg(short, long, value_delimiter = ',', required = true)]
        orders: Vec<OrderId>,
    },
    /// List route snapshots kept in the local cache
    List,
    /// Mark a local route snapshot as completed
    Complete { id: i64 },
    /// Delete a local route snapshot
    Delete { id: i64 },
}

pub async fn run(app: &AppState, action: DriverAction) -> Result<(), CommandError> {
    let driver = app.driver();

    let board = match action {
        DriverAction::Routes => {
            let routes = driver.load_active_routes().await?;
            if routes.is_empty() {
                println!("No routes available");
            }
            for route in routes {
                println!(
                    "{}  {}  {} orders  {}",
                    route.id,
                    route.nombre,
                    route.total_pedidos,
                    money(route.total_price)
                );
            }
            return Ok(());
        }
        DriverAction::Claim { id } => driver.claim_route(id).await?,
        DriverAction::Shipments => driver.load_shipments().await?,
        DriverAction::Stage { stage } => driver.select_stage(stage),
        DriverAction::Pickup { id } => driver.mark_picked_up(id).await?,
        DriverAction::Deliver {
            id,
            receiver,
            evidence,
        } => {
            driver
                .mark_delivered(id, &receiver, &evidence.into())
                .await?
        }
        DriverAction::Fail {
            id,
            reason,
            evidence,
        } => driver.mark_failed(id, &reason, &evidence.into()).await?,
    };

    print_board(&board);
    Ok(())
}

pub async fn routes(app: &AppState, action: RoutesAction) -> Result<(), CommandError> {
    let driver = app.driver();

    match action {
        RoutesAction::Create { name, orders } => {
            let route = driver.create_route(&name, &orders).await?;
            println!(
                "Route #{} {} created with {} orders",
                route.id, route.nombre, route.total_pedidos
            );
        }
        RoutesAction::List => {
            for route in driver.local_routes().await? {
                let remote = route
                    .remote_id
                    .map_or_else(|| "-".to_string(), |id| format!("#{id}"));
                let state = match (route.active, route.completed) {
                    (_, true) => "completed",
                    (true, false) => "active",
                    (false, false) => "inactive",
                };
                let orders: Vec<String> = route.order_ids.iter().map(ToString::to_string).collect();
                println!(
                    "{}  remote {remote}  {}  {state}  orders {}",
                    route.id,
                    route.name,
                    orders.join(",")
                );
            }
        }
        RoutesAction::Complete { id } => {
            let mut route = driver
                .local_route(id)
                .await?
                .ok_or_else(|| CommandError::Input(format!("No local route {id}")))?;
            route.completed = true;
            route.active = false;
            driver.update_local_route(&route).await?;
            println!("Route {id} completed");
        }
        RoutesAction::Delete { id } => {
            driver.delete_local_route(id).await?;
            println!("Route {id} deleted");
        }
    }
    Ok(())
}

fn print_board(board: &DriverBoard) {
    if let Some(route) = &board.route {
        println!("Route #{} {}", route.id, route.nombre);
    }
    let tabs: Vec<String> = Stage::ALL
        .iter()
        .map(|stage| {
            let count = board.bucket(*stage).len();
            if *stage == board.stage {
                format!("[{stage} {count}]")
            } else {
                format!(" {stage} {count} ")
            }
        })
        .collect();
    println!("{}", tabs.join(" "));

    let visible = board.visible();
    if visible.is_empty() {
        println!("  Nothing here");
    }
    for shipment in visible {
        let total = shipment
            .total_price
            .map(|t| format!("  {}", money(t)))
            .unwrap_or_default();
        println!(
            "  {}  {}  {}  {}{total}",
            shipment.id,
            shipment.label(),
            shipment.status(),
            shipment.address()
        );
    }
}
