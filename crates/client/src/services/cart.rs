//! Cart reconciliation between the in-memory guest cart and the server cart.
//!
//! # Actors
//!
//! - **Guest**: every operation edits a local list. Adding a line that matches
//!   an existing one by product, size and color increases its quantity.
//! - **Authenticated**: every operation is exactly one orders-service call
//!   followed by a full refetch of the server cart. Failures are logged and
//!   absorbed; the published snapshot stays as it was.
//!
//! When a guest logs in, each guest line is pushed to the server cart (which
//! merges by variant) and the guest list is dropped. Logging out starts an
//! empty guest cart.
//!
//! The current state is published as a [`CartSnapshot`] on a `watch` channel.

use std::sync::Arc;

use redthread_core::{CartId, CartItemId, Price, ProductId, Quantity, VariantId};
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use crate::api::{CatalogApi, OrdersApi};
use crate::db::Session;
use crate::types::{AddItemReq, CartItemRes, CartRes};

/// Identifies a line in the current snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LineId {
    /// Position-independent key of a guest line.
    Guest(u32),
    /// Server cart item.
    Server(CartItemId),
}

impl std::fmt::Display for LineId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Guest(n) => write!(f, "g{n}"),
            Self::Server(id) => write!(f, "{id}"),
        }
    }
}

impl std::str::FromStr for LineId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        s.strip_prefix('g').map_or_else(
            || s.parse().map(Self::Server),
            |n| n.parse().map(Self::Guest),
        )
    }
}

/// A cart line ready for display.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartLine {
    pub id: LineId,
    pub product_id: Option<ProductId>,
    pub variant_id: VariantId,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: Quantity,
    pub unit_price: Price,
}

impl CartLine {
    /// Unit price times quantity.
    #[must_use]
    pub fn line_total(&self) -> Price {
        self.unit_price.times(self.quantity.get())
    }
}

/// What the user picked on a product page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewCartLine {
    pub product_id: ProductId,
    pub variant_id: VariantId,
    pub name: String,
    pub size: String,
    pub color: String,
    pub quantity: Quantity,
    pub unit_price: Price,
}

/// Published cart state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CartSnapshot {
    /// Server cart ID when authenticated.
    pub cart_id: Option<CartId>,
    pub lines: Vec<CartLine>,
    /// Sum of line quantities.
    pub item_count: u32,
    /// Server-computed total when authenticated; display subtotal for guests.
    pub total: Price,
    pub authenticated: bool,
}

impl CartSnapshot {
    fn guest(lines: Vec<CartLine>) -> Self {
        let item_count = count_items(&lines);
        let total = lines.iter().fold(Price::zero(), |acc, line| {
            Price::new(acc.amount + line.line_total().amount, acc.currency_code)
        });
        Self {
            cart_id: None,
            lines,
            item_count,
            total,
            authenticated: false,
        }
    }

    fn server(cart: &CartRes, lines: Vec<CartLine>) -> Self {
        Self {
            cart_id: Some(cart.cart_id),
            item_count: count_items(&lines),
            lines,
            total: cart.total_price(),
            authenticated: true,
        }
    }

    /// Whether there is nothing to check out.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

fn count_items(lines: &[CartLine]) -> u32 {
    lines
        .iter()
        .fold(0u32, |acc, line| acc.saturating_add(line.quantity.get()))
}

#[derive(Debug, Default)]
struct CartState {
    authenticated: bool,
    guest: Vec<CartLine>,
    next_guest_id: u32,
}

/// Cart reconciliation service.
#[derive(Clone)]
pub struct CartService {
    orders: Arc<dyn OrdersApi>,
    catalog: Arc<dyn CatalogApi>,
    state: Arc<Mutex<CartState>>,
    tx: Arc<watch::Sender<CartSnapshot>>,
}

impl CartService {
    /// Start as a guest with an empty cart.
    #[must_use]
    pub fn new(orders: Arc<dyn OrdersApi>, catalog: Arc<dyn CatalogApi>) -> Self {
        let (tx, _rx) = watch::channel(CartSnapshot::guest(Vec::new()));
        Self {
            orders,
            catalog,
            state: Arc::new(Mutex::new(CartState::default())),
            tx: Arc::new(tx),
        }
    }

    /// Observe snapshot changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartSnapshot> {
        self.tx.subscribe()
    }

    /// The latest published snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.tx.borrow().clone()
    }

    /// Switch actor. Logging in pushes the guest lines to the server cart;
    /// logging out starts an empty guest cart.
    #[instrument(skip_all, fields(authenticated = session.is_some()))]
    pub async fn bind_session(&self, session: Option<&Session>) {
        let mut state = self.state.lock().await;

        match session {
            Some(session) => {
                let pending = std::mem::take(&mut state.guest);
                state.authenticated = true;
                if !pending.is_empty() {
                    info!(lines = pending.len(), email = %session.email, "Merging guest cart");
                }
                for line in pending {
                    let req = AddItemReq {
                        variant_id: line.variant_id,
                        quantity: line.quantity.get(),
                    };
                    if let Err(e) = self.orders.add_item(req).await {
                        warn!(error = %e, variant_id = %line.variant_id, "Failed to push guest line");
                    }
                }
                self.refetch().await;
            }
            None => {
                *state = CartState::default();
                self.tx.send_replace(CartSnapshot::guest(Vec::new()));
            }
        }
    }

    /// Refetch the server cart (no-op for guests).
    pub async fn refresh(&self) {
        let state = self.state.lock().await;
        if state.authenticated {
            self.refetch().await;
        }
    }

    /// Add a line.
    #[instrument(skip_all, fields(variant_id = %item.variant_id, quantity = %item.quantity))]
    pub async fn add(&self, item: NewCartLine) {
        let mut state = self.state.lock().await;

        if state.authenticated {
            let req = AddItemReq {
                variant_id: item.variant_id,
                quantity: item.quantity.get(),
            };
            self.mutate(self.orders.add_item(req).await.map(|_| ())).await;
            return;
        }

        if let Some(existing) = state.guest.iter_mut().find(|line| {
            line.product_id == Some(item.product_id)
                && line.size == item.size
                && line.color == item.color
        }) {
            existing.quantity = existing.quantity.saturating_add(item.quantity);
        } else {
            state.next_guest_id += 1;
            let id = LineId::Guest(state.next_guest_id);
            state.guest.push(CartLine {
                id,
                product_id: Some(item.product_id),
                variant_id: item.variant_id,
                name: item.name,
                size: item.size,
                color: item.color,
                quantity: item.quantity,
                unit_price: item.unit_price,
            });
        }
        self.publish_guest(&state);
    }

    /// Set a line's quantity. Zero removes the line.
    #[instrument(skip(self))]
    pub async fn update_qty(&self, line: LineId, quantity: u32) {
        let Ok(quantity) = Quantity::new(quantity) else {
            self.remove(line).await;
            return;
        };

        let mut state = self.state.lock().await;
        match line {
            LineId::Server(item_id) if state.authenticated => {
                let result = self.orders.update_item(item_id, quantity.get()).await;
                self.mutate(result.map(|_| ())).await;
            }
            LineId::Guest(_) if !state.authenticated => {
                if let Some(existing) = state.guest.iter_mut().find(|l| l.id == line) {
                    existing.quantity = quantity;
                    self.publish_guest(&state);
                }
            }
            _ => debug!("Line does not belong to the current cart"),
        }
    }

    /// Remove a line.
    #[instrument(skip(self))]
    pub async fn remove(&self, line: LineId) {
        let mut state = self.state.lock().await;
        match line {
            LineId::Server(item_id) if state.authenticated => {
                let result = self.orders.delete_item(item_id).await;
                self.mutate(result).await;
            }
            LineId::Guest(_) if !state.authenticated => {
                state.guest.retain(|l| l.id != line);
                self.publish_guest(&state);
            }
            _ => debug!("Line does not belong to the current cart"),
        }
    }

    /// Empty the cart.
    #[instrument(skip(self))]
    pub async fn clear(&self) {
        let mut state = self.state.lock().await;
        if state.authenticated {
            let result = self.orders.clear_cart().await;
            self.mutate(result).await;
        } else {
            state.guest.clear();
            self.publish_guest(&state);
        }
    }

    // =========================================================================
    // Internals
    // =========================================================================

    /// Refetch after a successful call; log and keep the snapshot otherwise.
    async fn mutate(&self, result: Result<(), crate::api::ApiError>) {
        match result {
            Ok(()) => self.refetch().await,
            Err(e) => warn!(error = %e, "Cart mutation failed, keeping previous state"),
        }
    }

    fn publish_guest(&self, state: &CartState) {
        self.tx.send_replace(CartSnapshot::guest(state.guest.clone()));
    }

    /// Fetch the server cart and publish it with catalog details.
    async fn refetch(&self) {
        let cart = match self.orders.cart().await {
            Ok(cart) => cart,
            Err(e) => {
                warn!(error = %e, "Failed to fetch cart, keeping previous state");
                return;
            }
        };

        let mut lines = Vec::with_capacity(cart.items.len());
        for item in &cart.items {
            if let Some(line) = self.enrich(item).await {
                lines.push(line);
            }
        }
        self.tx.send_replace(CartSnapshot::server(&cart, lines));
    }

    /// Resolve variant and product details for a server line. Lines whose
    /// details cannot be fetched are shown with placeholders.
    async fn enrich(&self, item: &CartItemRes) -> Option<CartLine> {
        let quantity = match Quantity::new(item.quantity) {
            Ok(q) => q,
            Err(_) => {
                warn!(item_id = %item.item_id, "Server returned an empty cart line");
                return None;
            }
        };

        let mut line = CartLine {
            id: LineId::Server(item.item_id),
            product_id: None,
            variant_id: item.variant_id,
            name: format!("Variant #{}", item.variant_id),
            size: String::new(),
            color: String::new(),
            quantity,
            unit_price: Price::from_amount(item.unit_price),
        };

        match self.catalog.variant(item.variant_id).await {
            Ok(variant) => {
                line.product_id = Some(variant.product_id);
                line.size = variant.size_value;
                line.color = variant.color;
                match self.catalog.product(variant.product_id).await {
                    Ok(product) => line.name = product.name,
                    Err(e) => warn!(error = %e, product_id = %variant.product_id, "Product lookup failed"),
                }
            }
            Err(e) => warn!(error = %e, variant_id = %item.variant_id, "Variant lookup failed"),
        }
        Some(line)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use redthread_core::{Role, UserId};
    use rust_decimal::Decimal;
    use secrecy::SecretString;

    use super::*;
    use crate::api::memory::{InMemoryCatalog, InMemoryOrders};

    fn setup() -> (CartService, InMemoryOrders) {
        let catalog = InMemoryCatalog::new();
        catalog.add_product(1, "Polera Oversize", 14990, &[(10, "M", "Negro"), (11, "L", "Negro")]);
        catalog.add_product(2, "Jeans Slim", 29990, &[(20, "42", "Azul")]);
        let orders = InMemoryOrders::new(catalog.clone());
        let cart = CartService::new(Arc::new(orders.clone()), Arc::new(catalog));
        (cart, orders)
    }

    fn session() -> Session {
        Session {
            email: "ana@redthread.cl".to_string(),
            name: "Ana".to_string(),
            user_id: UserId::new(1),
            role: Role::Usuario,
            token: SecretString::from("token-1"),
        }
    }

    fn pick(product: i64, variant: i64, size: &str, qty: u32, price: i64) -> NewCartLine {
        NewCartLine {
            product_id: ProductId::new(product),
            variant_id: VariantId::new(variant),
            name: format!("Producto {product}"),
            size: size.to_string(),
            color: "Negro".to_string(),
            quantity: Quantity::new(qty).unwrap(),
            unit_price: Price::from_amount(Decimal::from(price)),
        }
    }

    #[test]
    fn test_line_id_parse() {
        assert_eq!("g3".parse::<LineId>().unwrap(), LineId::Guest(3));
        assert_eq!("42".parse::<LineId>().unwrap(), LineId::Server(CartItemId::new(42)));
        assert_eq!(LineId::Guest(3).to_string(), "g3");
        assert!("gx".parse::<LineId>().is_err());
    }

    #[tokio::test]
    async fn test_guest_add_merges_matching_lines() {
        let (cart, orders) = setup();

        cart.add(pick(1, 10, "M", 1, 14990)).await;
        cart.add(pick(1, 10, "M", 2, 14990)).await;
        cart.add(pick(1, 11, "L", 1, 14990)).await;

        let snapshot = cart.snapshot();
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].quantity.get(), 3);
        assert_eq!(snapshot.item_count, 4);
        assert_eq!(snapshot.total.amount, Decimal::from(14990 * 4));
        assert!(!snapshot.authenticated);
        assert_eq!(orders.mutation_calls(), 0);
    }

    #[tokio::test]
    async fn test_guest_update_and_remove() {
        let (cart, _) = setup();
        cart.add(pick(1, 10, "M", 1, 14990)).await;
        cart.add(pick(2, 20, "42", 1, 29990)).await;
        let first = cart.snapshot().lines[0].id;

        cart.update_qty(first, 5).await;
        assert_eq!(cart.snapshot().lines[0].quantity.get(), 5);

        cart.update_qty(first, 0).await;
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].variant_id, VariantId::new(20));

        cart.clear().await;
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_login_pushes_guest_lines_and_enriches() {
        let (cart, orders) = setup();
        cart.add(pick(1, 10, "M", 2, 14990)).await;
        cart.add(pick(2, 20, "42", 1, 29990)).await;

        cart.bind_session(Some(&session())).await;

        let snapshot = cart.snapshot();
        assert!(snapshot.authenticated);
        assert_eq!(orders.line_count(), 2);
        assert_eq!(snapshot.lines.len(), 2);
        assert_eq!(snapshot.lines[0].name, "Polera Oversize");
        assert_eq!(snapshot.lines[0].size, "M");
        assert_eq!(snapshot.total.amount, Decimal::from(14990 * 2 + 29990));
    }

    #[tokio::test]
    async fn test_authenticated_mutation_is_one_call_plus_refetch() {
        let (cart, orders) = setup();
        cart.bind_session(Some(&session())).await;
        let fetches = orders.cart_fetches();

        cart.add(pick(1, 10, "M", 1, 14990)).await;
        assert_eq!(orders.mutation_calls(), 1);
        assert_eq!(orders.cart_fetches(), fetches + 1);

        // Server merges by variant
        cart.add(pick(1, 10, "M", 1, 14990)).await;
        let snapshot = cart.snapshot();
        assert_eq!(snapshot.lines.len(), 1);
        assert_eq!(snapshot.lines[0].quantity.get(), 2);

        let line = snapshot.lines[0].id;
        cart.update_qty(line, 4).await;
        assert_eq!(cart.snapshot().item_count, 4);

        cart.remove(line).await;
        assert!(cart.snapshot().is_empty());
    }

    #[tokio::test]
    async fn test_failed_mutation_keeps_previous_state() {
        let (cart, orders) = setup();
        cart.bind_session(Some(&session())).await;
        cart.add(pick(1, 10, "M", 1, 14990)).await;
        let before = cart.snapshot();
        let fetches = orders.cart_fetches();

        orders.set_fail_on_mutation(true);
        cart.add(pick(2, 20, "42", 1, 29990)).await;
        cart.update_qty(before.lines[0].id, 9).await;
        cart.clear().await;

        assert_eq!(cart.snapshot(), before);
        assert_eq!(orders.cart_fetches(), fetches);
    }

    #[tokio::test]
    async fn test_failed_refetch_keeps_previous_state() {
        let (cart, orders) = setup();
        cart.bind_session(Some(&session())).await;
        cart.add(pick(1, 10, "M", 1, 14990)).await;
        let before = cart.snapshot();

        orders.set_fail_on_fetch(true);
        cart.refresh().await;
        assert_eq!(cart.snapshot(), before);
    }

    #[tokio::test]
    async fn test_logout_starts_empty_guest_cart() {
        let (cart, _) = setup();
        cart.bind_session(Some(&session())).await;
        cart.add(pick(1, 10, "M", 1, 14990)).await;
        let mut rx = cart.subscribe();

        cart.bind_session(None).await;

        assert!(rx.has_changed().unwrap());
        let snapshot = rx.borrow_and_update().clone();
        assert!(!snapshot.authenticated);
        assert!(snapshot.is_empty());
    }

    #[tokio::test]
    async fn test_guest_line_ids_ignored_when_authenticated() {
        let (cart, orders) = setup();
        cart.bind_session(Some(&session())).await;
        cart.update_qty(LineId::Guest(1), 3).await;
        cart.remove(LineId::Guest(1)).await;
        assert_eq!(orders.mutation_calls(), 0);
    }
}
