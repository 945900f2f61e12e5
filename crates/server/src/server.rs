use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::Response,
    routing::{delete, get, patch, post},
};
use axum_extra::{
    TypedHeader,
    headers::{Authorization, authorization::Basic},
};
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter};

use std::sync::Arc;

use crate::{accounts, entries, meals, purchases, stock, user, vehicles};
use engine::Engine;

#[derive(Clone)]
pub struct ServerState {
    pub engine: Arc<Engine>,
    pub db: DatabaseConnection,
}

/// Basic auth against the users table; the user lands in the request
/// extensions and acts for the whole request.
async fn auth(
    auth_header: TypedHeader<Authorization<Basic>>,
    State(state): State<ServerState>,
    mut request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    if auth_header.username().is_empty() || auth_header.password().is_empty() {
        return Err(StatusCode::UNAUTHORIZED);
    }

    let user: Option<user::Model> = user::Entity::find()
        .filter(user::Column::Username.eq(auth_header.username()))
        .filter(user::Column::Password.eq(auth_header.password()))
        .one(&state.db)
        .await
        .map_err(|_| StatusCode::UNAUTHORIZED)?;

    let Some(user) = user else {
        return Err(StatusCode::UNAUTHORIZED);
    };

    request.extensions_mut().insert(user);
    Ok(next.run(request).await)
}

pub(crate) fn router(state: ServerState) -> Router {
    Router::new()
        .route("/accounts", post(accounts::account_new))
        .route("/accounts/{id}", delete(accounts::delete))
        .route("/accounts/{id}/balance", get(accounts::balance))
        .route("/entries", post(entries::entry_new))
        .route("/entries/list", post(entries::list))
        .route(
            "/entries/{id}",
            patch(entries::update).delete(entries::delete),
        )
        .route("/stock", post(stock::stock_new))
        .route("/stock/low", get(stock::low))
        .route("/stock/history", post(stock::history))
        .route(
            "/stock/{id}",
            get(stock::get).patch(stock::update).delete(stock::delete),
        )
        .route("/stock/{id}/adjust", post(stock::adjust))
        .route("/meals", post(meals::meal_new))
        .route("/meals/{id}", delete(meals::delete))
        .route("/vehicles", post(vehicles::vehicle_new))
        .route("/vehicles/{id}/services", post(vehicles::service_new))
        .route("/maintenance", post(vehicles::maintenance_new))
        .route(
            "/maintenance/{id}",
            patch(vehicles::maintenance_update).delete(vehicles::maintenance_delete),
        )
        .route("/fuel", post(vehicles::fuel_new))
        .route(
            "/fuel/{id}",
            patch(vehicles::fuel_update).delete(vehicles::fuel_delete),
        )
        .route("/purchases", post(purchases::purchase_new))
        .route(
            "/purchases/lines/{line_id}",
            patch(purchases::line_update).delete(purchases::line_delete),
        )
        .route(
            "/purchases/{id}",
            get(purchases::get)
                .patch(purchases::update)
                .delete(purchases::delete),
        )
        .route("/purchases/{id}/lines", post(purchases::line_new))
        .route(
            "/purchases/{id}/expense",
            post(purchases::expense_post).delete(purchases::expense_revert),
        )
        .route_layer(middleware::from_fn_with_state(state.clone(), auth))
        .with_state(state)
}

pub async fn run(engine: Engine, db: DatabaseConnection) {
    let listener = match tokio::net::TcpListener::bind("127.0.0.1:3000").await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!("failed to bind server listener: {err}");
            return;
        }
    };
    if let Err(err) = run_with_listener(engine, db, listener).await {
        tracing::error!("server failed: {err}");
    }
}

pub async fn run_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<(), std::io::Error> {
    let addr = listener.local_addr()?;
    tracing::info!("Server listening on {}", addr);

    let state = ServerState {
        engine: Arc::new(engine),
        db,
    };

    axum::serve(listener, router(state)).await
}

pub fn spawn_with_listener(
    engine: Engine,
    db: DatabaseConnection,
    listener: tokio::net::TcpListener,
) -> Result<std::net::SocketAddr, std::io::Error> {
    let addr = listener.local_addr()?;

    tokio::spawn(async move {
        if let Err(err) = run_with_listener(engine, db, listener).await {
            tracing::error!("server failed: {err}");
        }
    });

    Ok(addr)
}

#[cfg(test)]
mod tests {
    use super::*;

    use axum::{
        body::Body,
        http::{Request as HttpRequest, header},
    };
    use base64::Engine as _;
    use http_body_util::BodyExt;
    use migration::MigratorTrait;
    use sea_orm::{ConnectionTrait, Database, Statement};
    use tower::ServiceExt;

    async fn app() -> Router {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        migration::Migrator::up(&db, None).await.unwrap();
        db.execute(Statement::from_sql_and_values(
            db.get_database_backend(),
            "INSERT INTO users (username, password) VALUES (?, ?)",
            vec!["alice".into(), "secret".into()],
        ))
        .await
        .unwrap();
        let engine = Engine::builder().database(db.clone()).build().await.unwrap();
        router(ServerState {
            engine: Arc::new(engine),
            db,
        })
    }

    fn basic(user: &str, password: &str) -> String {
        let token = base64::engine::general_purpose::STANDARD.encode(format!("{user}:{password}"));
        format!("Basic {token}")
    }

    fn json_request(method: &str, uri: &str, body: serde_json::Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method(method)
            .uri(uri)
            .header(header::AUTHORIZATION, basic("alice", "secret"))
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn wrong_password_is_unauthorized() {
        let app = app().await;
        let request = HttpRequest::builder()
            .uri("/stock/low")
            .header(header::AUTHORIZATION, basic("alice", "nope"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn stock_round_trip() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/stock",
                serde_json::json!({
                    "name": "Rice",
                    "place": { "kind": "household", "room": "Kitchen", "spot": null },
                    "quantity_milli": 2000,
                    "min_quantity_milli": 1000
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let id = body_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/stock/{id}/adjust"),
                serde_json::json!({ "delta_milli": -1500 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["quantity_milli"], 500);

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                &format!("/stock/{id}/adjust"),
                serde_json::json!({ "delta_milli": -1000 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let error = body_json(response).await["error"].as_str().unwrap().to_string();
        assert_eq!(
            error,
            "Insufficient stock for \"Rice\": available 0.500, requested 1.000"
        );

        let request = HttpRequest::builder()
            .uri("/stock/low")
            .header(header::AUTHORIZATION, basic("alice", "secret"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        let body = body_json(response).await;
        assert_eq!(body["items"][0]["id"], id.as_str());
        assert_eq!(body["items"][0]["low"], true);
        assert_eq!(body["items"][0]["location"], "Kitchen");
    }

    #[tokio::test]
    async fn synchronized_entry_is_not_editable_over_http() {
        let app = app().await;

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/accounts",
                serde_json::json!({ "name": "Checking", "starting_balance_minor": 10000 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let account = body_json(response).await["id"].as_str().unwrap().to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "POST",
                "/purchases",
                serde_json::json!({
                    "store": "Bakery",
                    "purchased_on": "2025-03-08",
                    "declared_total_minor": 450
                }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CREATED);
        let entry = body_json(response).await["ledger_entry_id"]
            .as_str()
            .unwrap()
            .to_string();

        let response = app
            .clone()
            .oneshot(json_request(
                "PATCH",
                &format!("/entries/{entry}"),
                serde_json::json!({ "amount_minor": 100 }),
            ))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::CONFLICT);

        let request = HttpRequest::builder()
            .uri(format!("/accounts/{account}/balance"))
            .header(header::AUTHORIZATION, basic("alice", "secret"))
            .body(Body::empty())
            .unwrap();
        let response = app.oneshot(request).await.unwrap();
        assert_eq!(body_json(response).await["balance_minor"], 9550);
    }
}
