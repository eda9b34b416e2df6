use axum::{
    Router,
    routing::{get, post, put},
};
use tower::ServiceBuilder;
use tower_http::trace::TraceLayer;

use paydesk_core::health::healthz;
use paydesk_core::middleware::{propagate_request_id_layer, request_id_layer};

use crate::handlers::{
    broker::{broker_stats, configure_failure_simulation, reset_failure_simulation},
    health::readyz,
    invoice::{get_invoice, get_invoice_by_order, invoice_stats, list_invoices},
    order::{create_order, get_order, list_orders, pay_order},
    outbox::{get_outbox_event, outbox_stats},
};
use crate::state::AppState;

pub fn build_router(state: AppState) -> Router {
    Router::new()
        // Health
        .route("/healthz", get(healthz))
        .route("/readyz", get(readyz))
        // Orders
        .route("/orders", post(create_order).get(list_orders))
        .route("/orders/{id}", get(get_order))
        .route("/orders/{id}/pay", post(pay_order))
        // Invoices
        .route("/invoices", get(list_invoices))
        .route("/invoices/stats", get(invoice_stats))
        .route("/invoices/{id}", get(get_invoice))
        .route("/invoices/order/{order_id}", get(get_invoice_by_order))
        // Outbox inspection
        .route("/outbox/stats", get(outbox_stats))
        .route("/outbox/events/{id}", get(get_outbox_event))
        // Broker controls
        .route("/broker/stats", get(broker_stats))
        .route(
            "/broker/failure-simulation",
            put(configure_failure_simulation).delete(reset_failure_simulation),
        )
        .layer(
            ServiceBuilder::new()
                .layer(request_id_layer())
                .layer(TraceLayer::new_for_http())
                .layer(propagate_request_id_layer()),
        )
        .with_state(state)
}
