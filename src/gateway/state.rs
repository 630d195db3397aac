use std::time::Duration;

use crate::db::Database;
use crate::ledger::TransferEngine;
use crate::user_auth::AuthService;

/// Shared gateway state. Always wrapped in an `Arc` by the router.
pub struct AppState {
    pub db: Database,
    pub auth: AuthService,
    pub engine: TransferEngine,
    /// Caller deadline applied around each transfer invocation
    pub request_timeout: Duration,
}

impl AppState {
    pub fn new(
        db: Database,
        auth: AuthService,
        engine: TransferEngine,
        request_timeout: Duration,
    ) -> Self {
        Self {
            db,
            auth,
            engine,
            request_timeout,
        }
    }
}
