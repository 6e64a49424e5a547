//! HTTP control surface for the host's recording view.
//!
//! This module provides the REST API that drives recording sessions:
//! - POST   /episodes/:id/session                    - Create + initialize a session
//! - POST   /episodes/:id/session/initialize         - Retry after a device failure
//! - POST   /episodes/:id/session/record/start       - Start recording
//! - POST   /episodes/:id/session/record/stop        - Stop and flush
//! - POST   /episodes/:id/session/complete           - Persist + save the artifact
//! - POST   /episodes/:id/session/questions/next     - Teleprompter forward
//! - POST   /episodes/:id/session/questions/previous - Teleprompter back
//! - POST   /episodes/:id/session/questions/jump     - Teleprompter jump
//! - GET    /episodes/:id/session                    - Live status
//! - DELETE /episodes/:id/session                    - Teardown + drop
//! - GET    /health                                  - Health check

mod handlers;
mod routes;
mod state;

pub use routes::create_router;
pub use state::AppState;
