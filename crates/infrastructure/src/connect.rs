//! Default wiring of a connector.

use std::sync::Arc;

use tollgate_application::{Connector, ConnectorResult};
use tollgate_domain::ConnectorConfig;

use crate::adapters::{ReqwestTransportFactory, SystemClock};
use crate::persistence::FileSessionStore;

/// Creates a connector with the file session store, the reqwest transport
/// and the system clock.
///
/// Sessions live in `config.session_dir`, or in the per-user default
/// directory when it is unset.
///
/// # Errors
///
/// Returns an error if the session id is invalid or no session directory
/// can be determined.
pub fn connect(config: ConnectorConfig) -> ConnectorResult<Connector> {
    let store = match &config.session_dir {
        Some(dir) => FileSessionStore::new(dir),
        None => FileSessionStore::at_default_location()?,
    };
    tracing::debug!(dir = %store.dir().display(), "using file session store");

    Connector::new(
        config,
        Arc::new(store),
        Arc::new(ReqwestTransportFactory::new()),
        Arc::new(SystemClock::new()),
    )
}
