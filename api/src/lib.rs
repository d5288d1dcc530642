mod flash;
mod session;
mod upload;

use std::{env, path::PathBuf};

use agrimarket_service::{
    sea_orm::{Database, DatabaseConnection},
    Mutation, NewCustomer, NewFarmer, ProductChanges, Query, ServiceError,
};
use anyhow::Context as _;
use axum::{
    body::Bytes,
    extract::{Multipart, Path, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use flash::{flash_redirect, get_flash_cookie, FlashData, FlashResponse};
use migration::{Migrator, MigratorTrait};
use rust_decimal::Decimal;
use serde::Deserialize;
use session::Session;
use tera::Tera;
use tokio::net::TcpListener;
use tower_cookies::{CookieManagerLayer, Cookies, Key};
use tower_http::services::ServeDir;
use upload::UploadError;

type HandlerError = (StatusCode, &'static str);

const PRODUCT_DENIED: &str = "Product not found or you do not have permission to edit it.";

#[tokio::main]
async fn start() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    dotenvy::dotenv().ok();
    let db_url = env_or("DATABASE_URL", "sqlite://agrimarket.db?mode=rwc");
    let host = env_or("HOST", "127.0.0.1");
    let port = env_or("PORT", "8000");
    let upload_dir = PathBuf::from(env_or("UPLOAD_DIR", "./static/images"));
    let server_url = format!("{host}:{port}");

    let conn = Database::connect(&db_url)
        .await
        .context("database connection failed")?;
    Migrator::up(&conn, None).await.context("migration failed")?;

    let templates = Tera::new(concat!(env!("CARGO_MANIFEST_DIR"), "/templates/**/*"))
        .context("tera initialization failed")?;

    let state = AppState {
        templates,
        conn,
        session_key: session_key_from_env(),
        upload_dir: upload_dir.clone(),
    };

    let app = Router::new()
        .route("/", get(home))
        .route("/farmer_signup", get(farmer_signup_page).post(farmer_signup))
        .route("/farmer_login", get(farmer_login_page).post(farmer_login))
        .route("/farmer_dashboard", get(farmer_dashboard))
        .route("/add_product", get(add_product_page).post(add_product))
        .route(
            "/edit_product/{id}",
            get(edit_product_page).post(edit_product),
        )
        .route("/delete_product/{id}", post(delete_product))
        .route("/customer_orders", get(customer_orders))
        .route(
            "/customer_signup",
            get(customer_signup_page).post(customer_signup),
        )
        .route(
            "/customer_login",
            get(customer_login_page).post(customer_login),
        )
        .route("/customer_dashboard", get(customer_dashboard))
        .route("/logout", get(logout))
        .nest_service("/static/images", ServeDir::new(&upload_dir))
        .fallback(not_found)
        .layer(CookieManagerLayer::new())
        .with_state(state);

    let listener = TcpListener::bind(&server_url)
        .await
        .with_context(|| format!("cannot bind {server_url}"))?;
    tracing::info!("listening on http://{server_url}");
    axum::serve(listener, app).await?;

    Ok(())
}

#[derive(Clone)]
struct AppState {
    templates: Tera,
    conn: DatabaseConnection,
    session_key: Key,
    upload_dir: PathBuf,
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key).unwrap_or_else(|_| default.to_owned())
}

fn session_key_from_env() -> Key {
    match env::var("SESSION_SECRET") {
        Ok(secret) if secret.len() >= 64 => Key::derive_from(secret.as_bytes()),
        _ => {
            tracing::warn!(
                "SESSION_SECRET unset or shorter than 64 bytes; generated a fresh key, \
                 sessions will not survive a restart"
            );
            Key::generate()
        }
    }
}

fn internal_error(err: impl std::fmt::Display) -> HandlerError {
    tracing::error!("{err}");
    (StatusCode::INTERNAL_SERVER_ERROR, "internal server error")
}

fn render(
    state: &AppState,
    template: &str,
    ctx: &tera::Context,
) -> Result<Html<String>, HandlerError> {
    state
        .templates
        .render(template, ctx)
        .map(Html)
        .map_err(|_| (StatusCode::INTERNAL_SERVER_ERROR, "Template error"))
}

/// Fresh template context, with any pending flash notice moved into it.
fn base_ctx(cookies: &Cookies) -> tera::Context {
    let mut ctx = tera::Context::new();
    if let Some(flash) = get_flash_cookie::<FlashData>(cookies) {
        ctx.insert("flash", &flash);
    }
    ctx
}

fn require_farmer(
    state: &AppState,
    cookies: &Cookies,
    message: &str,
) -> Result<i32, FlashResponse> {
    Session::load(cookies, &state.session_key)
        .farmer_id
        .ok_or_else(|| flash_redirect(cookies, FlashData::error(message), "/farmer_login"))
}

fn require_customer(
    state: &AppState,
    cookies: &Cookies,
    message: &str,
) -> Result<i32, FlashResponse> {
    Session::load(cookies, &state.session_key)
        .customer_id
        .ok_or_else(|| flash_redirect(cookies, FlashData::error(message), "/customer_login"))
}

async fn home(state: State<AppState>, cookies: Cookies) -> Result<Html<String>, HandlerError> {
    render(&state, "index.html.tera", &base_ctx(&cookies))
}

async fn not_found(state: State<AppState>) -> (StatusCode, Html<String>) {
    let body = state
        .templates
        .render("404.html.tera", &tera::Context::new())
        .unwrap_or_else(|_| "Not Found".to_owned());
    (StatusCode::NOT_FOUND, Html(body))
}

// -- Farmer identity ---------------------------------------------------------

#[derive(Deserialize)]
struct FarmerSignupForm {
    farmer_name: String,
    mobile_no: String,
    district: String,
    village: String,
    city: String,
    state: String,
    acres_owned: String,
    annual_income: String,
    email: String,
    password: String,
}

#[derive(Deserialize)]
struct LoginForm {
    email: String,
    password: String,
}

async fn farmer_signup_page(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, HandlerError> {
    render(&state, "farmer_signup.html.tera", &base_ctx(&cookies))
}

async fn farmer_signup(
    state: State<AppState>,
    cookies: Cookies,
    Form(form): Form<FarmerSignupForm>,
) -> Result<FlashResponse, HandlerError> {
    let (acres_owned, annual_income) = match (
        form.acres_owned.trim().parse::<Decimal>(),
        form.annual_income.trim().parse::<Decimal>(),
    ) {
        (Ok(acres), Ok(income)) => (acres, income),
        _ => {
            return Ok(flash_redirect(
                &cookies,
                FlashData::error("Please enter valid numbers for acres owned and annual income."),
                "/farmer_signup",
            ))
        }
    };

    let new_farmer = NewFarmer {
        name: form.farmer_name,
        mobile_no: form.mobile_no,
        district: form.district,
        village: form.village,
        city: form.city,
        state: form.state,
        acres_owned,
        annual_income,
        email: form.email,
        password: form.password,
    };

    match Mutation::register_farmer(&state.conn, new_farmer).await {
        Ok(_) => Ok(flash_redirect(
            &cookies,
            FlashData::success("Signup Successful! Please log in."),
            "/farmer_login",
        )),
        Err(ServiceError::DuplicateEmail) => Ok(flash_redirect(
            &cookies,
            FlashData::error("Email already exists. Please log in."),
            "/farmer_login",
        )),
        Err(err) => Err(internal_error(err)),
    }
}

async fn farmer_login_page(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, HandlerError> {
    render(&state, "farmer_login.html.tera", &base_ctx(&cookies))
}

async fn farmer_login(
    state: State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<FlashResponse, HandlerError> {
    match Query::authenticate_farmer(&state.conn, &form.email, &form.password).await {
        Ok(farmer) => {
            let mut session = Session::load(&cookies, &state.session_key);
            session.farmer_id = Some(farmer.id);
            session.save(&cookies, &state.session_key);
            Ok(flash_redirect(
                &cookies,
                FlashData::success("Login Successful!"),
                "/farmer_dashboard",
            ))
        }
        Err(ServiceError::InvalidCredentials) => Ok(flash_redirect(
            &cookies,
            FlashData::error("Invalid credentials. Please try again."),
            "/farmer_login",
        )),
        Err(err) => Err(internal_error(err)),
    }
}

async fn farmer_dashboard(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    let farmer_id =
        match require_farmer(&state, &cookies, "Please log in to access your dashboard.") {
            Ok(id) => id,
            Err(redirect) => return Ok(redirect.into_response()),
        };

    let products = Query::products_of_farmer(&state.conn, farmer_id)
        .await
        .map_err(internal_error)?;

    let mut ctx = base_ctx(&cookies);
    ctx.insert("products", &products);
    Ok(render(&state, "farmer_dashboard.html.tera", &ctx)?.into_response())
}

// -- Catalog / listing -------------------------------------------------------

/// Typed view of the add/edit product multipart form. Numeric fields arrive
/// as text and are validated before use.
struct ProductForm {
    name: String,
    cost: String,
    quantity: String,
    image: Option<(String, Bytes)>,
}

async fn read_product_form(mut multipart: Multipart) -> Result<ProductForm, HandlerError> {
    const BAD_FORM: HandlerError = (StatusCode::BAD_REQUEST, "malformed form data");

    let mut form = ProductForm {
        name: String::new(),
        cost: String::new(),
        quantity: String::new(),
        image: None,
    };

    while let Some(field) = multipart.next_field().await.map_err(|_| BAD_FORM)? {
        let field_name = field.name().unwrap_or_default().to_owned();
        match field_name.as_str() {
            "name" => form.name = field.text().await.map_err(|_| BAD_FORM)?,
            "cost" => form.cost = field.text().await.map_err(|_| BAD_FORM)?,
            "quantity" => form.quantity = field.text().await.map_err(|_| BAD_FORM)?,
            "image" => {
                // Browsers submit the field with an empty filename when no
                // file was chosen.
                let file_name = field.file_name().unwrap_or_default().to_owned();
                let data = field.bytes().await.map_err(|_| BAD_FORM)?;
                if !file_name.is_empty() {
                    form.image = Some((file_name, data));
                }
            }
            _ => {}
        }
    }

    Ok(form)
}

fn parse_cost_quantity(cost: &str, quantity: &str) -> Option<(Decimal, i32)> {
    Some((cost.trim().parse().ok()?, quantity.trim().parse().ok()?))
}

async fn add_product_page(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    if let Err(redirect) = require_farmer(&state, &cookies, "Please log in to add products.") {
        return Ok(redirect.into_response());
    }
    Ok(render(&state, "add_product.html.tera", &base_ctx(&cookies))?.into_response())
}

async fn add_product(
    state: State<AppState>,
    cookies: Cookies,
    multipart: Multipart,
) -> Result<Response, HandlerError> {
    let farmer_id = match require_farmer(&state, &cookies, "Please log in to add products.") {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let form = read_product_form(multipart).await?;

    let image = match &form.image {
        Some((filename, data)) => {
            match upload::store_image(&state.upload_dir, filename, data).await {
                Ok(path) => path,
                Err(UploadError::InvalidFileType) => {
                    return Ok(flash_redirect(
                        &cookies,
                        FlashData::error("Invalid image file or no image uploaded."),
                        "/add_product",
                    )
                    .into_response())
                }
                Err(err) => return Err(internal_error(err)),
            }
        }
        None => {
            return Ok(flash_redirect(
                &cookies,
                FlashData::error("Invalid image file or no image uploaded."),
                "/add_product",
            )
            .into_response())
        }
    };

    let (cost, quantity) = match parse_cost_quantity(&form.cost, &form.quantity) {
        Some(parsed) => parsed,
        None => {
            return Ok(flash_redirect(
                &cookies,
                FlashData::error("Please enter a valid cost and quantity."),
                "/add_product",
            )
            .into_response())
        }
    };

    match Mutation::create_product(&state.conn, farmer_id, form.name, cost, quantity, image).await {
        Ok(_) => Ok(flash_redirect(
            &cookies,
            FlashData::success("Product added successfully!"),
            "/farmer_dashboard",
        )
        .into_response()),
        Err(ServiceError::DuplicateListing) => Ok(flash_redirect(
            &cookies,
            FlashData::error("You already have a listing with this name."),
            "/add_product",
        )
        .into_response()),
        Err(err) => Err(internal_error(err)),
    }
}

async fn edit_product_page(
    state: State<AppState>,
    Path(id): Path<i32>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    let farmer_id = match require_farmer(&state, &cookies, "Please log in to edit products.") {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let product = Query::find_product_by_id(&state.conn, id)
        .await
        .map_err(internal_error)?;

    match product {
        Some(product) if product.farmer_id == farmer_id => {
            let mut ctx = base_ctx(&cookies);
            ctx.insert("product", &product);
            Ok(render(&state, "edit_product.html.tera", &ctx)?.into_response())
        }
        // Missing and foreign products get the same notice on purpose.
        _ => Ok(
            flash_redirect(&cookies, FlashData::error(PRODUCT_DENIED), "/farmer_dashboard")
                .into_response(),
        ),
    }
}

async fn edit_product(
    state: State<AppState>,
    Path(id): Path<i32>,
    cookies: Cookies,
    multipart: Multipart,
) -> Result<Response, HandlerError> {
    let farmer_id = match require_farmer(&state, &cookies, "Please log in to edit products.") {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let form = read_product_form(multipart).await?;

    // An invalid or absent upload keeps the stored image.
    let image = match &form.image {
        Some((filename, data)) => {
            match upload::store_image(&state.upload_dir, filename, data).await {
                Ok(path) => Some(path),
                Err(UploadError::InvalidFileType) => None,
                Err(err) => return Err(internal_error(err)),
            }
        }
        None => None,
    };

    let (cost, quantity) = match parse_cost_quantity(&form.cost, &form.quantity) {
        Some(parsed) => parsed,
        None => {
            return Ok(flash_redirect(
                &cookies,
                FlashData::error("Please enter a valid cost and quantity."),
                &format!("/edit_product/{id}"),
            )
            .into_response())
        }
    };

    let changes = ProductChanges {
        name: form.name,
        cost,
        quantity,
        image,
    };

    match Mutation::update_product(&state.conn, farmer_id, id, changes).await {
        Ok(_) => Ok(flash_redirect(
            &cookies,
            FlashData::success("Product updated successfully!"),
            "/farmer_dashboard",
        )
        .into_response()),
        Err(ServiceError::NotFound(_) | ServiceError::Forbidden) => Ok(flash_redirect(
            &cookies,
            FlashData::error(PRODUCT_DENIED),
            "/farmer_dashboard",
        )
        .into_response()),
        Err(ServiceError::DuplicateListing) => Ok(flash_redirect(
            &cookies,
            FlashData::error("You already have a listing with this name."),
            &format!("/edit_product/{id}"),
        )
        .into_response()),
        Err(err) => Err(internal_error(err)),
    }
}

async fn delete_product(
    state: State<AppState>,
    Path(id): Path<i32>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    let farmer_id = match require_farmer(&state, &cookies, "Please log in to delete products.") {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let flash = match Mutation::delete_product(&state.conn, farmer_id, id).await {
        Ok(()) => FlashData::success("Product deleted successfully!"),
        Err(ServiceError::NotFound(_) | ServiceError::Forbidden) => {
            FlashData::error("Product not found or you do not have permission to delete it.")
        }
        Err(ServiceError::HasOrders) => {
            FlashData::error("This product has existing orders and cannot be deleted.")
        }
        Err(err) => return Err(internal_error(err)),
    };

    Ok(flash_redirect(&cookies, flash, "/farmer_dashboard").into_response())
}

// -- Order visibility --------------------------------------------------------

async fn customer_orders(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    let farmer_id = match require_farmer(&state, &cookies, "Please log in to view your orders.") {
        Ok(id) => id,
        Err(redirect) => return Ok(redirect.into_response()),
    };

    let orders = Query::orders_for_farmer(&state.conn, farmer_id)
        .await
        .map_err(internal_error)?;

    let mut ctx = base_ctx(&cookies);
    ctx.insert("orders", &orders);
    Ok(render(&state, "customer_orders.html.tera", &ctx)?.into_response())
}

// -- Customer identity -------------------------------------------------------

#[derive(Deserialize)]
struct CustomerSignupForm {
    name: String,
    email: String,
    phone_no: String,
    address: String,
    password: String,
}

async fn customer_signup_page(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, HandlerError> {
    render(&state, "customer_signup.html.tera", &base_ctx(&cookies))
}

async fn customer_signup(
    state: State<AppState>,
    cookies: Cookies,
    Form(form): Form<CustomerSignupForm>,
) -> Result<FlashResponse, HandlerError> {
    let new_customer = NewCustomer {
        name: form.name,
        email: form.email,
        phone_no: form.phone_no,
        address: form.address,
        password: form.password,
    };

    match Mutation::register_customer(&state.conn, new_customer).await {
        Ok(_) => Ok(flash_redirect(
            &cookies,
            FlashData::success("Signup successful! Please log in."),
            "/customer_login",
        )),
        Err(ServiceError::Validation(_)) => Ok(flash_redirect(
            &cookies,
            FlashData::error("Please fill in all fields."),
            "/customer_signup",
        )),
        Err(ServiceError::DuplicateEmail) => Ok(flash_redirect(
            &cookies,
            FlashData::error("Email already exists. Please log in."),
            "/customer_login",
        )),
        Err(err) => Err(internal_error(err)),
    }
}

async fn customer_login_page(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Html<String>, HandlerError> {
    render(&state, "customer_login.html.tera", &base_ctx(&cookies))
}

async fn customer_login(
    state: State<AppState>,
    cookies: Cookies,
    Form(form): Form<LoginForm>,
) -> Result<FlashResponse, HandlerError> {
    if form.email.trim().is_empty() || form.password.is_empty() {
        return Ok(flash_redirect(
            &cookies,
            FlashData::error("Please fill in all fields."),
            "/customer_login",
        ));
    }

    match Query::authenticate_customer(&state.conn, &form.email, &form.password).await {
        Ok(customer) => {
            let mut session = Session::load(&cookies, &state.session_key);
            session.customer_id = Some(customer.id);
            session.save(&cookies, &state.session_key);
            Ok(flash_redirect(
                &cookies,
                FlashData::success("Login successful!"),
                "/customer_dashboard",
            ))
        }
        Err(ServiceError::InvalidCredentials) => Ok(flash_redirect(
            &cookies,
            FlashData::error("Invalid credentials. Please try again."),
            "/customer_login",
        )),
        Err(err) => Err(internal_error(err)),
    }
}

async fn customer_dashboard(
    state: State<AppState>,
    cookies: Cookies,
) -> Result<Response, HandlerError> {
    if let Err(redirect) =
        require_customer(&state, &cookies, "Please log in to access your dashboard.")
    {
        return Ok(redirect.into_response());
    }

    let products = Query::all_products(&state.conn)
        .await
        .map_err(internal_error)?;

    let mut ctx = base_ctx(&cookies);
    ctx.insert("products", &products);
    Ok(render(&state, "customer_dashboard.html.tera", &ctx)?.into_response())
}

// -- Session teardown --------------------------------------------------------

async fn logout(cookies: Cookies) -> FlashResponse {
    Session::clear(&cookies);
    flash_redirect(&cookies, FlashData::success("You have been logged out."), "/")
}

pub fn main() {
    if let Err(err) = start() {
        eprintln!("Error: {err}");
        std::process::exit(1);
    }
}
