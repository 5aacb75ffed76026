//! Order history commands.

use clap::Subcommand;
use redthread_client::AppState;
use redthread_core::OrderId;

use super::{CommandError, money};

#[derive(Subcommand)]
pub enum OrdersAction {
    /// List your orders
    List,
    /// Show one order
    Show { id: OrderId },
    /// Show an order with customer details (admin)
    Admin { id: OrderId },
    /// List order snapshots kept in the local cache
    Local {
        /// Only snapshots of the logged-in user
        #[arg(long)]
        mine: bool,
    },
    /// Set a local snapshot's status
    SetStatus {
        id: i64,
        status: String,
        #[arg(long)]
        delivered: bool,
    },
    /// Delete a local snapshot
    Forget { id: i64 },
}

pub async fn run(app: &AppState, action: OrdersAction) -> Result<(), CommandError> {
    let orders = app.orders();

    match action {
        OrdersAction::List => {
            let list = orders.list_orders().await?;
            if list.is_empty() {
                println!("No orders yet");
            }
            for order in list {
                println!(
                    "#{}  {}  {}  ({} lines)",
                    order.id,
                    order.status,
                    money(order.total_amount),
                    order.items.len()
                );
            }
        }
        OrdersAction::Show { id } => {
            let order = orders.order(id).await?;
            println!("Order #{}  {}  {}", order.id, order.status, money(order.total_amount));
            for item in &order.items {
                println!(
                    "  variant {}  x{}  {} each  {}",
                    item.variant_id,
                    item.quantity,
                    money(item.unit_price),
                    money(item.line_total)
                );
            }
        }
        OrdersAction::Admin { id } => {
            let order = orders.admin_order_detail(id).await?;
            println!("Order #{}  {}  {}", order.id, order.status, money(order.total_amount));
            println!("Customer: {}", order.user_email);
            println!("Ship to:  {}", order.full_address);
            for item in &order.items {
                println!(
                    "  {} {} / {}  x{}  {}",
                    item.product_name,
                    item.size,
                    item.color,
                    item.quantity,
                    money(item.line_total)
                );
            }
        }
        OrdersAction::Local { mine } => {
            let email = if mine {
                app.auth().session().await?.map(|s| s.email)
            } else {
                None
            };
            for order in orders.local_orders(email.as_deref()).await? {
                let remote = order
                    .remote_id
                    .map_or_else(|| "-".to_string(), |id| format!("#{id}"));
                let delivered = if order.delivered { " (delivered)" } else { "" };
                println!(
                    "{}  remote {remote}  {}  {}  {}  {}{delivered}",
                    order.id,
                    order.created_at.format("%Y-%m-%d %H:%M"),
                    order.user_email,
                    order.total,
                    order.status,
                );
                println!("    {}", order.address);
            }
        }
        OrdersAction::SetStatus {
            id,
            status,
            delivered,
        } => {
            orders.update_local_status(id, &status, delivered).await?;
            println!("Snapshot {id} is now {status}");
        }
        OrdersAction::Forget { id } => {
            orders.delete_local(id).await?;
            println!("Snapshot {id} deleted");
        }
    }
    Ok(())
}
