//! Cart and checkout commands.
//!
//! Without a session the cart is a guest cart that only lives as long as the
//! process, so guest shopping is done inside `rt-cli shell`.

use clap::Subcommand;
use redthread_client::services::{CartSnapshot, LineId};
use redthread_client::types::Address;
use redthread_client::{AppState, ClientError};
use redthread_core::{AddressId, Quantity, VariantId};

use super::{CommandError, money};

#[derive(Subcommand)]
pub enum CartAction {
    /// Show the cart
    Show,
    /// Add a variant
    Add {
        variant: VariantId,
        #[arg(short, long, default_value_t = 1)]
        quantity: u32,
    },
    /// Set a line's quantity (0 removes it)
    Update { line: LineId, quantity: u32 },
    /// Remove a line
    Remove { line: LineId },
    /// Empty the cart
    Clear,
}

pub async fn run(app: &AppState, action: CartAction) -> Result<(), CommandError> {
    let cart = app.cart();

    match action {
        CartAction::Show => cart.refresh().await,
        CartAction::Add { variant, quantity } => {
            let quantity = Quantity::new(quantity)
                .map_err(|e| CommandError::Input(e.to_string()))?;
            let line = app.catalog().cart_line(variant, quantity).await?;
            cart.add(line).await;
        }
        CartAction::Update { line, quantity } => cart.update_qty(line, quantity).await,
        CartAction::Remove { line } => cart.remove(line).await,
        CartAction::Clear => cart.clear().await,
    }

    print_cart(&cart.snapshot());
    Ok(())
}

/// Place an order, shipping to `address` or else to the default address.
pub async fn checkout(app: &AppState, address: Option<i64>) -> Result<(), CommandError> {
    let address = match address {
        Some(id) => find_address(app, AddressId::new(id)).await?,
        None => default_address(app).await?,
    };

    let order = app.orders().checkout(address.as_ref()).await?;
    println!(
        "Order #{} placed ({}), total {}",
        order.id,
        order.status,
        money(order.total_amount)
    );
    for item in &order.items {
        println!(
            "  variant {}  x{}  {}",
            item.variant_id,
            item.quantity,
            money(item.line_total)
        );
    }
    Ok(())
}

async fn find_address(app: &AppState, id: AddressId) -> Result<Option<Address>, CommandError> {
    let addresses = app.addresses().list().await?;
    addresses
        .into_iter()
        .find(|a| a.id == id)
        .map(Some)
        .ok_or_else(|| CommandError::Input(format!("No address #{id}")))
}

/// The cached default address, refreshing the address book once if the
/// cache has none. Logged-out users get `None` and the checkout reports it.
async fn default_address(app: &AppState) -> Result<Option<Address>, CommandError> {
    let Some(session) = app.auth().session().await? else {
        return Ok(None);
    };
    if let Some(address) = app.addresses().cached_default(session.user_id).await? {
        return Ok(Some(address));
    }
    match app.addresses().list().await {
        Ok(addresses) => Ok(addresses
            .iter()
            .find(|a| a.default)
            .or_else(|| addresses.first())
            .cloned()),
        Err(ClientError::NoSession) => Ok(None),
        Err(e) => Err(e.into()),
    }
}

fn print_cart(snapshot: &CartSnapshot) {
    let owner = if snapshot.authenticated { "Cart" } else { "Guest cart" };
    if snapshot.is_empty() {
        println!("{owner} is empty");
        return;
    }

    println!("{owner} ({} items)", snapshot.item_count);
    for line in &snapshot.lines {
        let variant = [line.size.as_str(), line.color.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(" / ");
        println!(
            "  [{}] {} {}  x{}  {}",
            line.id,
            line.name,
            variant,
            line.quantity,
            line.line_total()
        );
    }
    println!("Total: {}", snapshot.total);
}
