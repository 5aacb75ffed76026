//! In-memory service fakes for testing the orchestration layer.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, RwLock};

use async_trait::async_trait;
use redthread_core::{
    AddressId, BrandId, CartId, CartItemId, CategoryId, ImageId, OrderId, ProductId, RouteId,
    ShipmentId, ShipmentStatus, UserId, VariantId,
};
use rust_decimal::Decimal;
use secrecy::SecretString;

use super::{ApiError, CatalogApi, Credentials, DeliveryApi, Evidence, IdentityApi, OrdersApi};
use crate::types::{
    AddItemReq, Address, AdminOrderDetail, AuthResponse, Brand, CartItemRes, CartRes, Category,
    ChangePasswordRequest, CheckoutReq, CreateAddressRequest, CreateProductRequest,
    CreateRouteRequest, CreateVariantRequest, Image, LoginRequest, OrderItemRes, OrderRes,
    Product, RegisterRequest, ResetPasswordRequest, Route, Shipment, UpdateAddressRequest,
    UpdateMeRequest, UserProfile, Variant,
};

fn unavailable() -> ApiError {
    ApiError::Api {
        status: 503,
        message: "Service unavailable".to_string(),
    }
}

// =============================================================================
// Catalog
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryCatalogState {
    products: HashMap<ProductId, Product>,
    variants: HashMap<VariantId, Variant>,
}

/// In-memory catalog holding products and variants.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    state: Arc<RwLock<InMemoryCatalogState>>,
}

impl InMemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a product with one variant per `(variant_id, size, color)`.
    pub fn add_product(&self, id: i64, name: &str, price: i64, variants: &[(i64, &str, &str)]) {
        let mut state = self.state.write().unwrap();
        let product_id = ProductId::new(id);
        state.products.insert(
            product_id,
            Product {
                id: product_id,
                name: name.to_string(),
                description: None,
                base_price: Decimal::from(price),
                active: true,
                images: Vec::new(),
                category: Some(Category {
                    id: CategoryId::new(1),
                    name: "Poleras".to_string(),
                    description: None,
                    active: true,
                }),
                brand: Some(Brand {
                    id: BrandId::new(1),
                    name: "RedThread".to_string(),
                    active: Some(true),
                }),
                featured: false,
                gender: "UNISEX".to_string(),
            },
        );
        for (variant_id, size, color) in variants {
            let variant_id = VariantId::new(*variant_id);
            state.variants.insert(
                variant_id,
                Variant {
                    id: variant_id,
                    product_id,
                    size_type: "LETTER".to_string(),
                    size_value: (*size).to_string(),
                    color: (*color).to_string(),
                    sku: format!("{id}-{size}-{color}"),
                    price_override: None,
                    stock: Some(10),
                },
            );
        }
    }

    pub fn variant_price(&self, id: VariantId) -> Decimal {
        let state = self.state.read().unwrap();
        let variant = &state.variants[&id];
        variant
            .price_override
            .unwrap_or(state.products[&variant.product_id].base_price)
    }
}

#[async_trait]
impl CatalogApi for InMemoryCatalog {
    async fn categories(&self) -> Result<Vec<Category>, ApiError> {
        let state = self.state.read().unwrap();
        let mut list: Vec<Category> = state
            .products
            .values()
            .filter_map(|p| p.category.clone())
            .collect();
        list.dedup_by_key(|c| c.id);
        Ok(list)
    }

    async fn brands(&self) -> Result<Vec<Brand>, ApiError> {
        let state = self.state.read().unwrap();
        let mut list: Vec<Brand> = state.products.values().filter_map(|p| p.brand.clone()).collect();
        list.dedup_by_key(|b| b.id);
        Ok(list)
    }

    async fn products(&self) -> Result<Vec<Product>, ApiError> {
        let mut list: Vec<Product> = self.state.read().unwrap().products.values().cloned().collect();
        list.sort_by_key(|p| p.id);
        Ok(list)
    }

    async fn product(&self, id: ProductId) -> Result<Product, ApiError> {
        self.state
            .read()
            .unwrap()
            .products
            .get(&id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn variants(&self, product_id: ProductId) -> Result<Vec<Variant>, ApiError> {
        let mut list: Vec<Variant> = self
            .state
            .read()
            .unwrap()
            .variants
            .values()
            .filter(|v| v.product_id == product_id)
            .cloned()
            .collect();
        list.sort_by_key(|v| v.id);
        Ok(list)
    }

    async fn variant(&self, id: VariantId) -> Result<Variant, ApiError> {
        self.state
            .read()
            .unwrap()
            .variants
            .get(&id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn images(&self, product_id: ProductId) -> Result<Vec<Image>, ApiError> {
        Ok(self.product(product_id).await?.images)
    }

    async fn create_product(&self, req: &CreateProductRequest) -> Result<Product, ApiError> {
        let id = i64::try_from(self.state.read().unwrap().products.len()).unwrap() + 100;
        self.add_product(id, &req.name, req.base_price, &[]);
        self.product(ProductId::new(id)).await
    }

    async fn update_product(
        &self,
        id: ProductId,
        req: &CreateProductRequest,
    ) -> Result<Product, ApiError> {
        let mut state = self.state.write().unwrap();
        let product = state.products.get_mut(&id).ok_or(ApiError::NotFound)?;
        product.name.clone_from(&req.name);
        product.base_price = Decimal::from(req.base_price);
        Ok(product.clone())
    }

    async fn delete_product(&self, id: ProductId) -> Result<(), ApiError> {
        self.state
            .write()
            .unwrap()
            .products
            .remove(&id)
            .map(|_| ())
            .ok_or(ApiError::NotFound)
    }

    async fn create_variant(&self, req: &CreateVariantRequest) -> Result<Variant, ApiError> {
        let mut state = self.state.write().unwrap();
        let id = VariantId::new(i64::try_from(state.variants.len()).unwrap() + 100);
        let variant = Variant {
            id,
            product_id: req.product_id,
            size_type: req.size_type.clone(),
            size_value: req.size_value.clone(),
            color: req.color.clone(),
            sku: req.sku.clone(),
            price_override: req.price_override.map(Decimal::from),
            stock: Some(req.stock),
        };
        state.variants.insert(id, variant.clone());
        Ok(variant)
    }

    async fn upload_image(&self, product_id: ProductId, file: PathBuf) -> Result<Image, ApiError> {
        self.upload_image_from_url(product_id, &file.to_string_lossy())
            .await
    }

    async fn upload_image_from_url(
        &self,
        product_id: ProductId,
        url: &str,
    ) -> Result<Image, ApiError> {
        let mut state = self.state.write().unwrap();
        let product = state.products.get_mut(&product_id).ok_or(ApiError::NotFound)?;
        let image = Image {
            id: ImageId::new(i64::try_from(product.images.len()).unwrap() + 1),
            product_id,
            public_url: url.to_string(),
            primary: product.images.is_empty(),
            sort_order: i32::try_from(product.images.len()).unwrap(),
        };
        product.images.push(image.clone());
        Ok(image)
    }

    async fn mark_primary_image(
        &self,
        product_id: ProductId,
        image_id: ImageId,
    ) -> Result<(), ApiError> {
        let mut state = self.state.write().unwrap();
        let product = state.products.get_mut(&product_id).ok_or(ApiError::NotFound)?;
        for image in &mut product.images {
            image.primary = image.id == image_id;
        }
        Ok(())
    }

    async fn delete_image(&self, product_id: ProductId, image_id: ImageId) -> Result<(), ApiError> {
        let mut state = self.state.write().unwrap();
        let product = state.products.get_mut(&product_id).ok_or(ApiError::NotFound)?;
        product.images.retain(|img| img.id != image_id);
        Ok(())
    }
}

// =============================================================================
// Orders
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryOrdersState {
    items: Vec<CartItemRes>,
    next_item_id: i64,
    orders: Vec<OrderRes>,
    addresses: Vec<Address>,
    next_address_id: i64,
    mutation_calls: usize,
    cart_fetches: usize,
    fail_on_mutation: bool,
    fail_on_fetch: bool,
}

/// In-memory orders service. The server cart merges lines by variant.
#[derive(Debug, Clone)]
pub struct InMemoryOrders {
    catalog: InMemoryCatalog,
    state: Arc<RwLock<InMemoryOrdersState>>,
}

impl InMemoryOrders {
    pub fn new(catalog: InMemoryCatalog) -> Self {
        Self {
            catalog,
            state: Arc::default(),
        }
    }

    pub fn set_fail_on_mutation(&self, fail: bool) {
        self.state.write().unwrap().fail_on_mutation = fail;
    }

    pub fn set_fail_on_fetch(&self, fail: bool) {
        self.state.write().unwrap().fail_on_fetch = fail;
    }

    pub fn mutation_calls(&self) -> usize {
        self.state.read().unwrap().mutation_calls
    }

    pub fn cart_fetches(&self) -> usize {
        self.state.read().unwrap().cart_fetches
    }

    pub fn line_count(&self) -> usize {
        self.state.read().unwrap().items.len()
    }

    pub fn order_count(&self) -> usize {
        self.state.read().unwrap().orders.len()
    }

    fn snapshot(state: &InMemoryOrdersState) -> CartRes {
        let total = state
            .items
            .iter()
            .map(|i| i.unit_price * Decimal::from(i.quantity))
            .sum();
        CartRes {
            cart_id: CartId::new(1),
            items: state.items.clone(),
            total,
        }
    }

    fn begin_mutation(&self) -> Result<std::sync::RwLockWriteGuard<'_, InMemoryOrdersState>, ApiError> {
        let mut state = self.state.write().unwrap();
        state.mutation_calls += 1;
        if state.fail_on_mutation {
            return Err(unavailable());
        }
        Ok(state)
    }
}

#[async_trait]
impl OrdersApi for InMemoryOrders {
    async fn cart(&self) -> Result<CartRes, ApiError> {
        let mut state = self.state.write().unwrap();
        state.cart_fetches += 1;
        if state.fail_on_fetch {
            return Err(unavailable());
        }
        Ok(Self::snapshot(&state))
    }

    async fn add_item(&self, req: AddItemReq) -> Result<CartRes, ApiError> {
        let unit_price = self.catalog.variant_price(req.variant_id);
        let mut state = self.begin_mutation()?;
        if let Some(line) = state.items.iter_mut().find(|i| i.variant_id == req.variant_id) {
            line.quantity += req.quantity;
        } else {
            state.next_item_id += 1;
            let item_id = CartItemId::new(state.next_item_id);
            state.items.push(CartItemRes {
                item_id,
                variant_id: req.variant_id,
                quantity: req.quantity,
                unit_price,
            });
        }
        Ok(Self::snapshot(&state))
    }

    async fn update_item(&self, item_id: CartItemId, quantity: u32) -> Result<CartRes, ApiError> {
        let mut state = self.begin_mutation()?;
        let line = state
            .items
            .iter_mut()
            .find(|i| i.item_id == item_id)
            .ok_or(ApiError::NotFound)?;
        line.quantity = quantity;
        Ok(Self::snapshot(&state))
    }

    async fn delete_item(&self, item_id: CartItemId) -> Result<(), ApiError> {
        let mut state = self.begin_mutation()?;
        state.items.retain(|i| i.item_id != item_id);
        Ok(())
    }

    async fn clear_cart(&self) -> Result<(), ApiError> {
        let mut state = self.begin_mutation()?;
        state.items.clear();
        Ok(())
    }

    async fn checkout(&self, req: CheckoutReq) -> Result<OrderRes, ApiError> {
        let mut state = self.begin_mutation()?;
        if !state.addresses.iter().any(|a| a.id == req.address_id) {
            return Err(ApiError::Api {
                status: 400,
                message: "Dirección inválida".to_string(),
            });
        }
        let cart = Self::snapshot(&state);
        let order = OrderRes {
            id: OrderId::new(i64::try_from(state.orders.len()).unwrap() + 1),
            status: "CREATED".to_string(),
            total_amount: cart.total,
            items: cart
                .items
                .iter()
                .map(|i| OrderItemRes {
                    variant_id: i.variant_id,
                    quantity: i.quantity,
                    unit_price: i.unit_price,
                    line_total: i.unit_price * Decimal::from(i.quantity),
                })
                .collect(),
        };
        state.orders.push(order.clone());
        state.items.clear();
        Ok(order)
    }

    async fn orders(&self) -> Result<Vec<OrderRes>, ApiError> {
        Ok(self.state.read().unwrap().orders.clone())
    }

    async fn order(&self, id: OrderId) -> Result<OrderRes, ApiError> {
        self.state
            .read()
            .unwrap()
            .orders
            .iter()
            .find(|o| o.id == id)
            .cloned()
            .ok_or(ApiError::NotFound)
    }

    async fn admin_order_detail(&self, id: OrderId) -> Result<AdminOrderDetail, ApiError> {
        let order = self.order(id).await?;
        Ok(AdminOrderDetail {
            id: order.id,
            status: order.status,
            user_email: "ana@redthread.cl".to_string(),
            full_address: "Los Leones 10, Santiago".to_string(),
            total_amount: order.total_amount,
            items: Vec::new(),
        })
    }

    async fn addresses(&self) -> Result<Vec<Address>, ApiError> {
        let state = self.state.read().unwrap();
        if state.fail_on_fetch {
            return Err(unavailable());
        }
        Ok(state.addresses.clone())
    }

    async fn create_address(&self, req: &CreateAddressRequest) -> Result<Address, ApiError> {
        let mut state = self.begin_mutation()?;
        state.next_address_id += 1;
        let address = Address {
            id: AddressId::new(state.next_address_id),
            line1: req.line1.clone(),
            line2: req.line2.clone(),
            city: req.city.clone(),
            state: req.state.clone(),
            zip: req.zip.clone(),
            country: req.country.clone(),
            default: req.default,
        };
        state.addresses.push(address.clone());
        Ok(address)
    }

    async fn update_address(
        &self,
        id: AddressId,
        req: &UpdateAddressRequest,
    ) -> Result<Address, ApiError> {
        let mut state = self.begin_mutation()?;
        let address = state
            .addresses
            .iter_mut()
            .find(|a| a.id == id)
            .ok_or(ApiError::NotFound)?;
        if let Some(city) = &req.city {
            address.city.clone_from(city);
        }
        if let Some(line1) = &req.line1 {
            address.line1.clone_from(line1);
        }
        if let Some(default) = req.default {
            address.default = default;
        }
        Ok(address.clone())
    }

    async fn delete_address(&self, id: AddressId) -> Result<(), ApiError> {
        let mut state = self.begin_mutation()?;
        state.addresses.retain(|a| a.id != id);
        Ok(())
    }
}

// =============================================================================
// Delivery
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryDeliveryState {
    routes: Vec<Route>,
    shipments: HashMap<RouteId, Vec<Shipment>>,
    reports: Vec<(ShipmentId, String)>,
    fail_on_mutation: bool,
}

/// In-memory delivery service applying the server's status transitions.
#[derive(Debug, Clone, Default)]
pub struct InMemoryDelivery {
    state: Arc<RwLock<InMemoryDeliveryState>>,
}

impl InMemoryDelivery {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an active route whose shipments have the given raw statuses.
    pub fn add_route(&self, id: i64, statuses: &[Option<ShipmentStatus>]) {
        let mut state = self.state.write().unwrap();
        let route_id = RouteId::new(id);
        state.routes.push(Route {
            id: route_id,
            nombre: format!("Ruta {id}"),
            descripcion: None,
            total_pedidos: u32::try_from(statuses.len()).unwrap(),
            total_price: Decimal::ZERO,
            activa: true,
            assigned_user_id: None,
        });
        let shipments = statuses
            .iter()
            .enumerate()
            .map(|(i, status)| {
                let n = id * 100 + i64::try_from(i).unwrap();
                Shipment {
                    id: ShipmentId::new(n),
                    order_id: OrderId::new(n),
                    user_id: None,
                    address_line1: Some(format!("Calle {n}")),
                    address_line2: None,
                    city: Some("Santiago".to_string()),
                    state: None,
                    zip: None,
                    country: None,
                    status: *status,
                    total_price: None,
                }
            })
            .collect();
        state.shipments.insert(route_id, shipments);
    }

    pub fn set_fail_on_mutation(&self, fail: bool) {
        self.state.write().unwrap().fail_on_mutation = fail;
    }

    pub fn reports(&self) -> Vec<(ShipmentId, String)> {
        self.state.read().unwrap().reports.clone()
    }

    fn transition(
        &self,
        id: ShipmentId,
        status: ShipmentStatus,
        report: Option<&str>,
    ) -> Result<Shipment, ApiError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_mutation {
            return Err(unavailable());
        }
        let shipment = state
            .shipments
            .values_mut()
            .flatten()
            .find(|s| s.id == id)
            .ok_or(ApiError::NotFound)?;
        shipment.status = Some(status);
        let updated = shipment.clone();
        if let Some(text) = report {
            state.reports.push((id, text.to_string()));
        }
        Ok(updated)
    }
}

#[async_trait]
impl DeliveryApi for InMemoryDelivery {
    async fn active_routes(&self) -> Result<Vec<Route>, ApiError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .routes
            .iter()
            .filter(|r| r.activa && r.assigned_user_id.is_none())
            .cloned()
            .collect())
    }

    async fn take_route(&self, id: RouteId) -> Result<Route, ApiError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_mutation {
            return Err(unavailable());
        }
        let route = state
            .routes
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or(ApiError::NotFound)?;
        route.assigned_user_id = Some(UserId::new(7));
        let route = route.clone();
        for shipment in state.shipments.entry(id).or_default() {
            if shipment.status() == ShipmentStatus::PendingPickup {
                shipment.status = Some(ShipmentStatus::Assigned);
            }
        }
        Ok(route)
    }

    async fn route_shipments(&self, id: RouteId) -> Result<Vec<Shipment>, ApiError> {
        Ok(self
            .state
            .read()
            .unwrap()
            .shipments
            .get(&id)
            .cloned()
            .unwrap_or_default())
    }

    async fn start_shipment(&self, id: ShipmentId) -> Result<Shipment, ApiError> {
        self.transition(id, ShipmentStatus::InTransit, None)
    }

    async fn mark_delivered(
        &self,
        id: ShipmentId,
        receiver_name: &str,
        _evidence: &Evidence,
    ) -> Result<Shipment, ApiError> {
        self.transition(id, ShipmentStatus::Delivered, Some(receiver_name))
    }

    async fn mark_failed(
        &self,
        id: ShipmentId,
        note: &str,
        _evidence: &Evidence,
    ) -> Result<Shipment, ApiError> {
        self.transition(id, ShipmentStatus::Failed, Some(note))
    }

    async fn create_route(&self, req: &CreateRouteRequest) -> Result<Route, ApiError> {
        let mut state = self.state.write().unwrap();
        if state.fail_on_mutation {
            return Err(unavailable());
        }
        let route = Route {
            id: RouteId::new(i64::try_from(state.routes.len()).unwrap() + 1),
            nombre: req.nombre.clone(),
            descripcion: req.descripcion.clone(),
            total_pedidos: u32::try_from(req.order_ids.len()).unwrap(),
            total_price: req.total_price.map_or(Decimal::ZERO, Decimal::from),
            activa: true,
            assigned_user_id: None,
        };
        state.routes.push(route.clone());
        Ok(route)
    }
}

// =============================================================================
// Identity
// =============================================================================

#[derive(Debug, Default)]
struct InMemoryIdentityState {
    /// email -> (password, profile)
    users: HashMap<String, (String, UserProfile)>,
}

/// In-memory identity service. Tokens are `token-<user id>`; `me` resolves
/// the token currently installed in the shared credentials.
#[derive(Debug, Clone)]
pub struct InMemoryIdentity {
    credentials: Credentials,
    state: Arc<RwLock<InMemoryIdentityState>>,
}

impl InMemoryIdentity {
    pub fn new(credentials: Credentials) -> Self {
        Self {
            credentials,
            state: Arc::default(),
        }
    }

    pub fn add_user(&self, id: i64, name: &str, email: &str, password: &str, role: &str) {
        self.state.write().unwrap().users.insert(
            email.to_string(),
            (
                password.to_string(),
                UserProfile {
                    id: UserId::new(id),
                    full_name: name.to_string(),
                    email: email.to_string(),
                    roles: vec![role.to_string()],
                },
            ),
        );
    }

    fn token_for(profile: &UserProfile) -> AuthResponse {
        AuthResponse {
            token_type: "Bearer".to_string(),
            access_token: SecretString::from(format!("token-{}", profile.id)),
            expires_at: None,
        }
    }

    async fn current_email(&self) -> Result<String, ApiError> {
        let token = self.credentials.bearer().await.ok_or(ApiError::Unauthorized)?;
        self.state
            .read()
            .unwrap()
            .users
            .iter()
            .find(|(_, (_, p))| format!("token-{}", p.id) == token)
            .map(|(email, _)| email.clone())
            .ok_or(ApiError::Unauthorized)
    }
}

#[async_trait]
impl IdentityApi for InMemoryIdentity {
    async fn register(&self, req: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        let mut state = self.state.write().unwrap();
        if state.users.contains_key(&req.email) {
            return Err(ApiError::Api {
                status: 409,
                message: "Email ya registrado".to_string(),
            });
        }
        let profile = UserProfile {
            id: UserId::new(i64::try_from(state.users.len()).unwrap() + 1),
            full_name: req.full_name.clone(),
            email: req.email.clone(),
            roles: vec!["USUARIO".to_string()],
        };
        let response = Self::token_for(&profile);
        state
            .users
            .insert(req.email.clone(), (req.password.clone(), profile));
        Ok(response)
    }

    async fn login(&self, req: &LoginRequest) -> Result<AuthResponse, ApiError> {
        let state = self.state.read().unwrap();
        match state.users.get(&req.email) {
            Some((password, profile)) if *password == req.password => Ok(Self::token_for(profile)),
            _ => Err(ApiError::Unauthorized),
        }
    }

    async fn me(&self) -> Result<UserProfile, ApiError> {
        let email = self.current_email().await?;
        Ok(self.state.read().unwrap().users[&email].1.clone())
    }

    async fn update_me(&self, req: &UpdateMeRequest) -> Result<UserProfile, ApiError> {
        let email = self.current_email().await?;
        let mut state = self.state.write().unwrap();
        let (password, mut profile) = state.users.remove(&email).unwrap();
        profile.full_name.clone_from(&req.full_name);
        profile.email.clone_from(&req.email);
        state
            .users
            .insert(req.email.clone(), (password, profile.clone()));
        Ok(profile)
    }

    async fn change_password(&self, req: &ChangePasswordRequest) -> Result<(), ApiError> {
        let email = self.current_email().await?;
        let mut state = self.state.write().unwrap();
        let entry = state.users.get_mut(&email).unwrap();
        if entry.0 != req.current_password {
            return Err(ApiError::Api {
                status: 400,
                message: "Contraseña actual incorrecta".to_string(),
            });
        }
        entry.0.clone_from(&req.new_password);
        Ok(())
    }

    async fn reset_password(&self, req: &ResetPasswordRequest) -> Result<(), ApiError> {
        let mut state = self.state.write().unwrap();
        let entry = state
            .users
            .get_mut(&req.identifier)
            .ok_or(ApiError::NotFound)?;
        entry.0.clone_from(&req.new_password);
        Ok(())
    }
}
