//! HTTP REST API endpoints.
//!
//! | Endpoint | Method | Permission | Description |
//! |----------|--------|------------|-------------|
//! | `/drinks` | GET | - | List drinks (short view) |
//! | `/drinks-detail` | GET | `get:drinks-detail` | List drinks (long view) |
//! | `/drinks` | POST | `post:drinks` | Create a drink |
//! | `/drinks/:id` | PATCH | `patch:drinks` | Replace a drink |
//! | `/drinks/:id` | DELETE | `delete:drinks` | Delete a drink |
//! | `/health` | GET | - | Liveness probe |
//! | `/ready` | GET | - | Readiness probe |

pub mod routes;
pub mod state;

pub use routes::{
    create_router, create_router_with_body_limit, create_router_with_observability, ApiError,
    DeleteResponse, DrinksResponse, MetricsEndpoint, ObservabilityOptions, DEFAULT_BODY_LIMIT,
};
pub use state::AppState;
