use std::net::{IpAddr, SocketAddr};
use std::sync::Arc;

use axum::{
    Router,
    routing::{delete, get, post, put},
};
use convivio_backend::{
    AppState,
    config::Config,
    middleware::{RateLimiter, auth_middleware, error_context, rate_limit},
    routes,
};
use sqlx::Executor;
use sqlx::postgres::PgPoolOptions;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::new(
            std::env::var("RUST_LOG").unwrap_or_else(|_| "info".into()),
        ))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().expect("Failed to load configuration");

    #[cfg(debug_assertions)]
    tracing::info!("Running in debug mode with CORS enabled");

    #[cfg(not(debug_assertions))]
    tracing::info!("Running in production mode with CORS disabled");

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .after_connect(|conn, _meta| {
            Box::pin(async move {
                conn.execute("SET application_name = 'convivio_backend';")
                    .await?;
                Ok(())
            })
        })
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to Postgres");

    let redis_client =
        redis::Client::open(config.redis_url.clone()).expect("Failed to create Redis client");

    let state = AppState {
        pool,
        config: config.clone(),
    };

    let rate_limiter = Arc::new(RateLimiter::new(redis_client, config.clone()));

    let public_routes = Router::new()
        .route("/health", get(routes::health::health))
        .route("/auth/login", post(routes::auth::login))
        .route("/auth/register", post(routes::auth::register));

    let protected_routes = Router::new()
        // perfil
        .route(
            "/auth/profile",
            get(routes::auth::get_profile).put(routes::auth::update_profile),
        )
        // grupos e invitaciones
        .route("/groups", post(routes::groups::create_group))
        .route("/groups/mine", get(routes::groups::list_mine))
        .route(
            "/groups/invitations",
            get(routes::groups::list_invitations).post(routes::groups::send_invitation),
        )
        .route(
            "/groups/invitations/{id}/accept",
            post(routes::groups::accept_invitation),
        )
        .route("/groups/{id}/members", get(routes::groups::list_members))
        .route("/groups/{id}", delete(routes::groups::delete_group))
        .route(
            "/groups/{id}/rules",
            get(routes::groups::get_rules).put(routes::groups::update_rules),
        )
        // calendario
        .route("/events", post(routes::events::create_event))
        .route(
            "/events/group/{groupId}",
            get(routes::events::list_group_events),
        )
        .route(
            "/events/{id}",
            put(routes::events::update_event).delete(routes::events::delete_event),
        )
        // gastos
        .route("/expenses", post(routes::expenses::create_expense))
        .route(
            "/expenses/group/{groupId}",
            get(routes::expenses::list_group_expenses),
        )
        .route(
            "/expenses/group/{groupId}/balance",
            get(routes::expenses::group_balance),
        )
        .route("/expenses/{id}", delete(routes::expenses::delete_expense))
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            auth_middleware,
        ));

    let router = Router::new().merge(public_routes).merge(protected_routes);

    let router = router.layer(axum::middleware::from_fn(error_context)).layer(
        axum::middleware::from_fn_with_state(rate_limiter, rate_limit),
    );

    #[cfg(debug_assertions)]
    let router = {
        tracing::debug!("Adding CORS layer for development mode");
        let cors = tower_http::cors::CorsLayer::permissive();
        router.layer(cors)
    };

    let app = router.with_state(state.clone());

    let addr = SocketAddr::new(
        state.config.server_host.parse().unwrap_or_else(|_| {
            tracing::warn!("Invalid server_host, falling back to dual-stack default");
            IpAddr::V6(std::net::Ipv6Addr::UNSPECIFIED)
        }),
        state.config.server_port,
    );
    tracing::info!("Server listening on {}", addr);
    axum::serve(
        tokio::net::TcpListener::bind(&addr)
            .await
            .expect("Failed to bind"),
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await
    .expect("Failed to start server");
}
