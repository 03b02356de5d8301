use axum::routing::{delete, get, post, put};
use axum::Router;
use tower_http::trace::TraceLayer;

use crate::config::{create_cors_layer, create_security_headers_layer, Config};
use crate::handlers::{bookings, health_check, occurrences, payments};
use crate::state::AppState;
use crate::store::BookingStore;

pub fn create_routes<S: BookingStore>(state: AppState<S>, config: &Config) -> Router {
    let booking_routes = Router::new()
        .route(
            "/",
            get(bookings::list_bookings::<S>).post(bookings::create_booking::<S>),
        )
        .route("/:id", get(bookings::get_booking::<S>))
        .route(
            "/:id/cancel",
            post(bookings::cancel_booking::<S>).put(bookings::cancel_booking::<S>),
        )
        .route("/:id/cancel-refund", post(bookings::cancel_with_refund::<S>));

    let payment_routes = Router::new()
        .route("/validate-coupon", post(payments::validate_coupon::<S>))
        .route("/finalize-booking", post(payments::finalize_booking::<S>))
        .route("/booking/:id", get(payments::get_booking_payment::<S>));

    let event_routes = Router::new()
        .route("/:event_id", delete(occurrences::cancel_event::<S>))
        .route(
            "/:event_id/occurrences/:occurrence_id",
            delete(occurrences::cancel_occurrence::<S>),
        )
        .route(
            "/:event_id/occurrences/:occurrence_id/capacity",
            put(occurrences::update_capacity::<S>),
        );

    Router::new()
        .route("/health", get(health_check))
        .nest("/api/bookings", booking_routes)
        .nest("/api/payment", payment_routes)
        .nest("/api/events", event_routes)
        .with_state(state)
        .layer(TraceLayer::new_for_http())
        .layer(create_security_headers_layer(config))
        .layer(create_cors_layer(config))
}
