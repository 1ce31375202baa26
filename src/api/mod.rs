pub mod analytics;
pub mod handlers;
pub mod routes;

pub use handlers::FunnelState;
pub use routes::{create_admin_router, create_funnel_router};
