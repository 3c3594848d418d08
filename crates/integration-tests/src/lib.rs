//! Integration tests for the Mery Salud client.
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p merysalud-integration-tests
//! ```
//!
//! Each test starts a [`FakeBackend`]: an in-process axum server on an
//! ephemeral port that speaks the subset of the pharmacy REST API the client
//! uses (sign-in, `/auth/me`, products, the remote cart, orders, the profile
//! password, and earnings reports). Tests seed it with users and products and
//! can revoke tokens or make the cart endpoint fail to drive the client's
//! recovery paths. Request targets and checkout bodies are recorded.

use std::collections::{BTreeMap, HashMap};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use axum::body::Bytes;
use axum::extract::{Path, Query, State};
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderMap, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post, put};
use axum::{Json, Router};
use serde::Deserialize;
use serde_json::{Value, json};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use merysalud_client::{ClientConfig, MemoryStore, PharmacyClient, ReauthPrompt};

/// Body of the fake daily earnings workbook.
pub const REPORT_WORKBOOK: &[u8] = b"PK\x03\x04ganancias-2024-05-01";

/// Prompt that counts how often it was shown and where it pointed.
#[derive(Debug, Default)]
pub struct CountingPrompt {
    shown: AtomicUsize,
    targets: Mutex<Vec<String>>,
}

impl CountingPrompt {
    #[must_use]
    pub fn count(&self) -> usize {
        self.shown.load(Ordering::SeqCst)
    }

    #[must_use]
    pub fn targets(&self) -> Vec<String> {
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl ReauthPrompt for CountingPrompt {
    fn session_expired(&self, login_entry: &str) {
        self.shown.fetch_add(1, Ordering::SeqCst);
        self.targets
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(login_entry.to_owned());
    }
}

/// A client wired to a fake backend, with handles on its store and prompt.
pub struct TestClient {
    pub client: PharmacyClient,
    pub storage: Arc<MemoryStore>,
    pub prompt: Arc<CountingPrompt>,
}

struct FakeUser {
    id: i64,
    password: String,
    role: &'static str,
}

#[derive(Default)]
struct BackendState {
    users: HashMap<String, FakeUser>,
    tokens: HashMap<String, String>,
    products: BTreeMap<i64, Value>,
    cart: Vec<(i64, u32)>,
    cart_failure: Option<StatusCode>,
    orders: BTreeMap<i64, Value>,
    order_bodies: Vec<String>,
    requests: Vec<String>,
    me_calls: usize,
    issued: usize,
}

type Shared = Arc<Mutex<BackendState>>;

fn lock(state: &Shared) -> MutexGuard<'_, BackendState> {
    state.lock().unwrap_or_else(PoisonError::into_inner)
}

/// In-process pharmacy backend.
pub struct FakeBackend {
    addr: SocketAddr,
    state: Shared,
    server: JoinHandle<()>,
}

impl FakeBackend {
    /// Bind to an ephemeral local port and start serving.
    ///
    /// # Errors
    ///
    /// Returns the I/O error if the listener cannot be bound.
    pub async fn start() -> std::io::Result<Self> {
        let state = Shared::default();
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let app = router(state.clone());
        let server = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });
        Ok(Self {
            addr,
            state,
            server,
        })
    }

    /// Base URL including the `/api` prefix.
    #[must_use]
    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    /// A fresh client with an empty in-memory store.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be configured.
    pub fn client(&self) -> Result<TestClient, Box<dyn std::error::Error>> {
        self.client_over(Arc::new(MemoryStore::new()))
    }

    /// A client over an existing store, as after a restart.
    ///
    /// # Errors
    ///
    /// Returns an error if the client cannot be configured.
    pub fn client_over(
        &self,
        storage: Arc<MemoryStore>,
    ) -> Result<TestClient, Box<dyn std::error::Error>> {
        let config = ClientConfig::with_base_url(&self.base_url())?;
        let prompt = Arc::new(CountingPrompt::default());
        let client = PharmacyClient::new(&config, storage.clone(), prompt.clone())?;
        Ok(TestClient {
            client,
            storage,
            prompt,
        })
    }

    /// Register a user that can sign in. `role` is the backend role name.
    pub fn add_user(&self, id: i64, username: &str, password: &str, role: &'static str) {
        lock(&self.state).users.insert(
            username.to_owned(),
            FakeUser {
                id,
                password: password.to_owned(),
                role,
            },
        );
    }

    /// Add a product priced in cents.
    pub fn add_product(&self, id: i64, name: &str, cents: i64, stock: i64) {
        #[allow(clippy::cast_precision_loss)]
        let price = cents as f64 / 100.0;
        lock(&self.state).products.insert(
            id,
            json!({
                "id": id,
                "name": name,
                "price": price,
                "imageUrl": format!("/img/{id}.jpg"),
                "stock": stock,
                "activo": true,
            }),
        );
    }

    /// Revoke every issued token, as when they expire server-side.
    pub fn expire_sessions(&self) {
        lock(&self.state).tokens.clear();
    }

    /// Make `GET /cart` answer with `status` until reset with `None`.
    pub fn fail_cart_with(&self, status: Option<u16>) {
        lock(&self.state).cart_failure =
            status.and_then(|s| StatusCode::from_u16(s).ok());
    }

    /// Number of `GET /auth/me` requests served.
    #[must_use]
    pub fn me_calls(&self) -> usize {
        lock(&self.state).me_calls
    }

    /// Remote cart contents as `(product id, quantity)`.
    #[must_use]
    pub fn remote_cart(&self) -> Vec<(i64, u32)> {
        lock(&self.state).cart.clone()
    }

    /// Raw body of every `POST /orders`, oldest first.
    #[must_use]
    pub fn order_bodies(&self) -> Vec<String> {
        lock(&self.state).order_bodies.clone()
    }

    /// Path and query of the recorded order, profile, and report requests.
    #[must_use]
    pub fn requests(&self) -> Vec<String> {
        lock(&self.state).requests.clone()
    }
}

impl Drop for FakeBackend {
    fn drop(&mut self) {
        self.server.abort();
    }
}

fn router(state: Shared) -> Router {
    Router::new()
        .route("/api/auth/login", post(login))
        .route("/api/auth/register", post(register))
        .route("/api/auth/me", get(me))
        .route("/api/products", get(list_products))
        .route("/api/products/{id}", get(get_product).put(update_product))
        .route("/api/cart", get(get_cart))
        .route("/api/cart/add", post(add_to_cart))
        .route("/api/cart/remove/{id}", delete(remove_from_cart))
        .route("/api/cart/clear", delete(clear_cart))
        .route("/api/orders", get(my_orders).post(create_order))
        .route("/api/orders/{id}", get(get_order))
        .route("/api/orders/{id}/status", put(update_order_status))
        .route("/api/orders/{id}/assign-delivery", put(assign_delivery))
        .route("/api/users/profile/password", put(change_password))
        .route("/api/reportes/diario-ganancias", get(daily_earnings))
        .route("/api/reportes/exportar-diario-ganancias", get(export_daily_earnings))
        .with_state(state)
}

fn error(status: StatusCode, body: Value) -> Response {
    (status, Json(body)).into_response()
}

fn unauthorized() -> Response {
    error(StatusCode::UNAUTHORIZED, json!({ "error": "Token inválido o expirado" }))
}

/// Username behind the request's bearer token, if it is still valid.
fn caller(state: &BackendState, headers: &HeaderMap) -> Option<String> {
    let token = headers
        .get(AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")?;
    state.tokens.get(token).cloned()
}

fn record(state: &mut BackendState, uri: &Uri) {
    let target = uri
        .path_and_query()
        .map_or_else(|| uri.path().to_owned(), ToString::to_string);
    state.requests.push(target);
}

fn caller_role(state: &BackendState, headers: &HeaderMap) -> Option<&'static str> {
    let username = caller(state, headers)?;
    state.users.get(&username).map(|user| user.role)
}

fn forbidden() -> Response {
    error(StatusCode::FORBIDDEN, json!({ "message": "Acceso denegado" }))
}

#[derive(Deserialize)]
struct LoginBody {
    username: String,
    password: String,
}

async fn login(State(state): State<Shared>, Json(body): Json<LoginBody>) -> Response {
    let mut state = lock(&state);
    let role = match state.users.get(&body.username) {
        Some(user) if user.password == body.password => user.role,
        _ => {
            return error(
                StatusCode::UNAUTHORIZED,
                json!({ "message": "Credenciales inválidas" }),
            );
        }
    };
    state.issued += 1;
    let token = format!("token-{}-{}", body.username, state.issued);
    state.tokens.insert(token.clone(), body.username.clone());
    Json(json!({
        "accessToken": token,
        "refreshToken": format!("refresh-{}", state.issued),
        "type": "Bearer",
        "username": body.username,
        "role": role,
        "expiresIn": 86_400_000,
    }))
    .into_response()
}

#[derive(Deserialize)]
struct RegisterBody {
    username: String,
    email: String,
    telefono: String,
}

async fn register(State(state): State<Shared>, Json(body): Json<RegisterBody>) -> Response {
    let mut state = lock(&state);
    if state.users.contains_key(&body.username) {
        return error(
            StatusCode::BAD_REQUEST,
            json!({ "errors": [
                { "defaultMessage": "El usuario ya existe" },
                { "message": "El email ya está registrado" }
            ] }),
        );
    }
    let id = i64::try_from(state.users.len()).unwrap_or(i64::MAX) + 100;
    state.users.insert(
        body.username.clone(),
        FakeUser {
            id,
            password: String::new(),
            role: "CUSTOMER",
        },
    );
    Json(json!({
        "id": id,
        "username": body.username,
        "email": body.email,
        "telefono": body.telefono,
        "role": "CUSTOMER",
    }))
    .into_response()
}

async fn me(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    state.me_calls += 1;
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let Some(user) = state.users.get(&username) else {
        return unauthorized();
    };
    Json(json!({
        "id": user.id,
        "username": username,
        "email": format!("{username}@merysalud.pe"),
        "telefono": "987654321",
        "role": user.role,
    }))
    .into_response()
}

async fn list_products(State(state): State<Shared>) -> Response {
    let state = lock(&state);
    Json(state.products.values().cloned().collect::<Vec<_>>()).into_response()
}

async fn get_product(State(state): State<Shared>, Path(id): Path<i64>) -> Response {
    let state = lock(&state);
    state.products.get(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, json!({ "message": "Producto no encontrado" })),
        |p| Json(p.clone()).into_response(),
    )
}

async fn get_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    if let Some(status) = state.cart_failure {
        return error(status, json!({ "message": "Carrito no disponible" }));
    }
    if caller(&state, &headers).is_none() {
        return unauthorized();
    }
    let items: Vec<Value> = state
        .cart
        .iter()
        .filter_map(|(id, quantity)| {
            state.products.get(id).map(|product| {
                json!({
                    "id": id,
                    "product": product,
                    "quantity": quantity,
                    "addedAt": "2024-05-01T10:00:00",
                })
            })
        })
        .collect();
    Json(json!({ "id": 1, "items": items })).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AddQuery {
    product_id: i64,
    quantity: u32,
}

async fn add_to_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Query(query): Query<AddQuery>,
) -> Response {
    let mut state = lock(&state);
    if caller(&state, &headers).is_none() {
        return unauthorized();
    }
    if !state.products.contains_key(&query.product_id) {
        return error(StatusCode::NOT_FOUND, json!({ "message": "Producto no encontrado" }));
    }
    if let Some(line) = state.cart.iter_mut().find(|(id, _)| *id == query.product_id) {
        line.1 += query.quantity;
    } else {
        state.cart.push((query.product_id, query.quantity));
    }
    Json(json!({ "id": 1 })).into_response()
}

async fn remove_from_cart(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let mut state = lock(&state);
    if caller(&state, &headers).is_none() {
        return unauthorized();
    }
    state.cart.retain(|(product, _)| *product != id);
    Json(json!({ "id": 1 })).into_response()
}

async fn clear_cart(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let mut state = lock(&state);
    if caller(&state, &headers).is_none() {
        return unauthorized();
    }
    state.cart.clear();
    StatusCode::OK.into_response()
}

async fn my_orders(State(state): State<Shared>, headers: HeaderMap) -> Response {
    let state = lock(&state);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let mine: Vec<Value> = state
        .orders
        .values()
        .filter(|order| order["user"]["username"] == username.as_str())
        .cloned()
        .collect();
    Json(mine).into_response()
}

async fn update_product(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
    Json(draft): Json<Value>,
) -> Response {
    let mut state = lock(&state);
    match caller_role(&state, &headers) {
        None => return unauthorized(),
        Some("ADMIN") => {}
        Some(_) => return forbidden(),
    }
    let mut product = draft;
    product["id"] = json!(id);
    product["activo"] = json!(true);
    state.products.insert(id, product.clone());
    Json(product).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ShippingBody {
    shipping_address: String,
    shipping_district: String,
}

/// Turns the caller's remote cart into an order and empties the cart.
async fn create_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    body: Bytes,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    state
        .order_bodies
        .push(String::from_utf8_lossy(&body).into_owned());
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    if state.cart.is_empty() {
        return error(StatusCode::BAD_REQUEST, json!({ "message": "El carrito está vacío" }));
    }
    let shipping: Option<ShippingBody> = if body.is_empty() {
        None
    } else {
        match serde_json::from_slice(&body) {
            Ok(shipping) => Some(shipping),
            Err(_) => {
                return error(
                    StatusCode::BAD_REQUEST,
                    json!({ "message": "Datos de envío inválidos" }),
                );
            }
        }
    };

    let mut total = 0.0;
    let mut items = Vec::new();
    for (line, (product_id, quantity)) in state.cart.iter().enumerate() {
        let Some(product) = state.products.get(product_id) else {
            continue;
        };
        let price = product["price"].as_f64().unwrap_or_default();
        let subtotal = price * f64::from(*quantity);
        total += subtotal;
        items.push(json!({
            "id": line + 1,
            "product": product,
            "quantity": quantity,
            "price": price,
            "subtotal": subtotal,
        }));
    }

    let id = i64::try_from(state.orders.len()).unwrap_or(i64::MAX) + 1;
    let user_id = state.users.get(&username).map_or(0, |user| user.id);
    let order = json!({
        "id": id,
        "numeroPedido": format!("MS-{id:05}"),
        "user": { "id": user_id, "username": username },
        "items": items,
        "status": "PENDING",
        "totalAmount": total,
        "createdAt": "2024-05-01T10:30:00",
        "shippingAddress": shipping.as_ref().map(|s| s.shipping_address.clone()),
        "shippingDistrict": shipping.as_ref().map(|s| s.shipping_district.clone()),
    });
    state.orders.insert(id, order.clone());
    state.cart.clear();
    Json(order).into_response()
}

async fn get_order(
    State(state): State<Shared>,
    headers: HeaderMap,
    Path(id): Path<i64>,
) -> Response {
    let state = lock(&state);
    if caller(&state, &headers).is_none() {
        return unauthorized();
    }
    state.orders.get(&id).map_or_else(
        || error(StatusCode::NOT_FOUND, json!({ "message": "Pedido no encontrado" })),
        |order| Json(order.clone()).into_response(),
    )
}

#[derive(Deserialize)]
struct StatusQuery {
    status: String,
}

async fn update_order_status(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<i64>,
    Query(query): Query<StatusQuery>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    match caller_role(&state, &headers) {
        None => return unauthorized(),
        Some("ADMIN") => {}
        Some(_) => return forbidden(),
    }
    let Some(order) = state.orders.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, json!({ "message": "Pedido no encontrado" }));
    };
    order["status"] = json!(query.status);
    Json(order.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AssignQuery {
    repartidor_id: i64,
}

async fn assign_delivery(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Path(id): Path<i64>,
    Query(query): Query<AssignQuery>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    match caller_role(&state, &headers) {
        None => return unauthorized(),
        Some("ADMIN") => {}
        Some(_) => return forbidden(),
    }
    let courier = state
        .users
        .iter()
        .find(|(_, user)| user.id == query.repartidor_id && user.role == "REPARTIDOR")
        .map(|(username, user)| json!({ "id": user.id, "username": username }));
    let Some(courier) = courier else {
        return error(StatusCode::BAD_REQUEST, json!({ "message": "Repartidor no válido" }));
    };
    let Some(order) = state.orders.get_mut(&id) else {
        return error(StatusCode::NOT_FOUND, json!({ "message": "Pedido no encontrado" }));
    };
    order["repartidor"] = courier;
    Json(order.clone()).into_response()
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct PasswordBody {
    current_password: String,
    new_password: String,
}

async fn change_password(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Json(body): Json<PasswordBody>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    let Some(username) = caller(&state, &headers) else {
        return unauthorized();
    };
    let Some(user) = state.users.get_mut(&username) else {
        return unauthorized();
    };
    if user.password != body.current_password {
        return error(
            StatusCode::BAD_REQUEST,
            json!({ "error": "La contraseña actual es incorrecta" }),
        );
    }
    user.password = body.new_password;
    Json(json!({ "message": "Contraseña actualizada" })).into_response()
}

#[derive(Deserialize)]
struct ReportQuery {
    fecha: String,
}

async fn daily_earnings(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
    Query(query): Query<ReportQuery>,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    match caller_role(&state, &headers) {
        None => return unauthorized(),
        Some("ADMIN") => {}
        Some(_) => return forbidden(),
    }
    let delivered: Vec<&Value> = state
        .orders
        .values()
        .filter(|order| order["status"] == "DELIVERED")
        .collect();
    let total: f64 = delivered
        .iter()
        .filter_map(|order| order["totalAmount"].as_f64())
        .sum();
    Json(json!({
        "status": "success",
        "message": "Reporte generado",
        "reporte": {
            "fecha": query.fecha,
            "pedidosEntregados": delivered.len(),
            "totalGanancias": total,
        },
    }))
    .into_response()
}

async fn export_daily_earnings(
    State(state): State<Shared>,
    headers: HeaderMap,
    uri: Uri,
) -> Response {
    let mut state = lock(&state);
    record(&mut state, &uri);
    match caller_role(&state, &headers) {
        None => return unauthorized(),
        Some("ADMIN") => {}
        Some(_) => return forbidden(),
    }
    (
        [(
            CONTENT_TYPE,
            "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
        )],
        REPORT_WORKBOOK,
    )
        .into_response()
}
