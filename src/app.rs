use anyhow::Context;
use axum::{
    middleware,
    routing::{delete, get, patch, post},
    Router,
};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use tower_http::{cors::CorsLayer, trace::TraceLayer};
use tracing::{info, warn};

use crate::auth::{self, Role, TokenService};
use crate::config::AppConfig;
use crate::course::{
    self,
    models::CategoryModel,
    repository::{InMemoryCourseRepository, PostgresCourseRepository},
};
use crate::shared::AppState;
use crate::stats::{self, repository::PostgresStatisticRepository};
use crate::user::{
    self,
    repository::{InMemoryUserRepository, PostgresUserRepository},
    UserService,
};

/// Builds the full HTTP surface.
///
/// Admin routes share paths with public ones (`/course`, `/course/:id`); axum
/// merges the method routers so only the admin methods carry the auth layers.
pub fn build_router(state: AppState) -> Router {
    let public = Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/login", post(user::login))
        .route("/register", post(user::register))
        .route("/course", get(course::list_courses))
        .route("/course/:id", get(course::get_course))
        .route("/course-search", get(course::search_courses))
        .route("/course-sort", get(course::sort_courses))
        .route("/category", get(course::get_categories))
        .route("/category/:limit", get(course::get_popular_categories));

    // route_layer runs bottom-up: jwt_auth first, then the role guard
    let admin = Router::new()
        .route("/user/:id", delete(user::delete_user))
        .route("/course", post(course::create_course))
        .route(
            "/course/:id",
            patch(course::update_course).delete(course::delete_course),
        )
        .route("/statistic", get(stats::get_statistics))
        .route_layer(middleware::from_fn_with_state(Role::Admin, auth::require_role))
        .route_layer(middleware::from_fn_with_state(state.clone(), auth::jwt_auth));

    public
        .merge(admin)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Wires repositories from config: Postgres when a database URL is set,
/// in-memory (seeded with starter categories) otherwise. The configured
/// administrator, if any, is created before the state is handed out.
pub async fn build_state(config: &AppConfig) -> anyhow::Result<AppState> {
    let state = connect_repositories(config).await?;

    if let Some(admin) = &config.admin {
        let service = UserService::new(state.user_repository.clone(), state.token_service.clone());
        let created = service
            .bootstrap_admin(&admin.name, &admin.email, admin.password.clone())
            .await
            .context("failed to create administrator account")?;
        if let Some(id) = created {
            info!(user_id = id, "Administrator account created");
        }
    }

    Ok(state)
}

async fn connect_repositories(config: &AppConfig) -> anyhow::Result<AppState> {
    let token_service = TokenService::new(&config.jwt.secret, config.jwt.expiration_minutes);

    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set, using in-memory repositories");
        let courses = InMemoryCourseRepository::with_data(starter_categories(), Vec::new());
        return Ok(AppState::in_memory(
            Arc::new(InMemoryUserRepository::new()),
            Arc::new(courses),
            token_service,
        ));
    };

    let pool = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(database_url)
        .await
        .context("failed to connect to database")?;
    info!(max_connections = config.max_connections, "Connected to database");

    if config.run_migrations {
        sqlx::migrate!("./migrations")
            .run(&pool)
            .await
            .context("failed to run migrations")?;
        info!("Database migrations applied");
    }

    Ok(AppState::new(
        Arc::new(PostgresUserRepository::new(pool.clone())),
        Arc::new(PostgresCourseRepository::new(pool.clone())),
        Arc::new(PostgresStatisticRepository::new(pool)),
        token_service,
    ))
}

fn starter_categories() -> Vec<CategoryModel> {
    ["Programming", "Design", "Business"]
        .into_iter()
        .zip(1..)
        .map(|(name, id)| CategoryModel {
            id,
            name: name.to_string(),
            count: 0,
        })
        .collect()
}

/// Binds the listener and serves until Ctrl-C.
pub async fn serve(config: AppConfig) -> anyhow::Result<()> {
    if config.uses_default_secret() {
        warn!("JWT_SECRET not set, signing tokens with the development secret");
    }

    let state = build_state(&config).await?;
    let app = build_router(state);

    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("failed to bind {address}"))?;
    info!("Server running on http://{}", address);

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Shutdown signal received");
            }
        })
        .await
        .context("server error")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TOKEN_HEADER;
    use crate::shared::test_utils::{token_for, AppStateBuilder};
    use crate::user::repository::UserRepository;
    use axum::{
        body::Body,
        http::{Request, StatusCode},
    };
    use rstest::rstest;
    use tower::ServiceExt; // for `oneshot`

    fn app() -> Router {
        build_router(AppStateBuilder::new().with_sample_catalog().build())
    }

    fn request(method: &str, uri: &str, token: Option<String>) -> Request<Body> {
        let mut builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("content-type", "application/json");
        if let Some(token) = token {
            builder = builder.header(TOKEN_HEADER, token);
        }
        let body = if method == "POST" || method == "PATCH" {
            Body::from(r#"{"category_id":1,"name":"Guarded","price":0,"count":0}"#)
        } else {
            Body::empty()
        };
        builder.body(body).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let response = app()
            .oneshot(request("GET", "/health", None))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[rstest]
    #[case("GET", "/course")]
    #[case("GET", "/course/1")]
    #[case("GET", "/category")]
    #[tokio::test]
    async fn test_public_routes_need_no_token(#[case] method: &str, #[case] uri: &str) {
        let response = app().oneshot(request(method, uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[rstest]
    #[case("POST", "/course")]
    #[case("PATCH", "/course/1")]
    #[case("DELETE", "/course/1")]
    #[case("DELETE", "/user/1")]
    #[case("GET", "/statistic")]
    #[tokio::test]
    async fn test_admin_routes_reject_missing_and_regular_tokens(
        #[case] method: &str,
        #[case] uri: &str,
    ) {
        let response = app().oneshot(request(method, uri, None)).await.unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let response = app()
            .oneshot(request(method, uri, Some(token_for(Role::Regular))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn test_admin_token_reaches_handler() {
        let response = app()
            .oneshot(request("GET", "/statistic", Some(token_for(Role::Admin))))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn test_starter_categories_have_sequential_ids() {
        let ids: Vec<i32> = starter_categories().iter().map(|c| c.id).collect();
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[tokio::test]
    async fn test_build_state_bootstraps_configured_admin() {
        let vars = [
            ("ADMIN_EMAIL", "root@example.com"),
            ("ADMIN_PASSWORD", "s3cret"),
        ];
        let config = AppConfig::from_lookup(|key| {
            vars.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap();

        let state = build_state(&config).await.unwrap();
        let admin = state
            .user_repository
            .find_by_email("root@example.com")
            .await
            .unwrap();
        assert_eq!(admin.role, Role::Admin);
    }
}
