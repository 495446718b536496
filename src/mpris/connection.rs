//! D-Bus connection management and player discovery for MPRIS.

use std::sync::Arc;
use tokio::sync::OnceCell;
use zbus::fdo::DBusProxy;
use zbus::names::BusName;

/// Errors that can occur during MPRIS operations
#[derive(thiserror::Error, Debug)]
pub enum MprisError {
    #[error("D-Bus error: {0}")]
    ZBus(#[from] zbus::Error),
    #[error("D-Bus error: {0}")]
    Fdo(#[from] zbus::fdo::Error),
    #[error("Failed to establish D-Bus connection")]
    NoConnection,
    #[error("Player {0} did not report a usable position")]
    NoPosition(String),
}

/// Global D-Bus connection singleton
static DBUS_CONNECTION: OnceCell<Arc<zbus::Connection>> = OnceCell::const_new();

/// Get or create a shared D-Bus session connection
pub async fn get_dbus_conn() -> Result<Arc<zbus::Connection>, MprisError> {
    DBUS_CONNECTION
        .get_or_try_init(|| async {
            let conn = zbus::Connection::session()
                .await
                .map_err(|_| MprisError::NoConnection)?;
            Ok(Arc::new(conn))
        })
        .await
        .cloned()
}

/// Well-known names currently owned on the session bus.
pub async fn list_bus_names(conn: &zbus::Connection) -> Result<Vec<String>, MprisError> {
    let proxy = DBusProxy::new(conn).await?;
    let names = proxy.list_names().await?;
    Ok(names
        .into_iter()
        .map(|name| name.to_string())
        .filter(|name| !name.starts_with(':'))
        .collect())
}

/// Resolve a well-known name to the unique connection name that owns it.
///
/// A player that quits and restarts keeps its well-known name but gets a new
/// owner, so the owner is what identifies one particular player instance.
pub async fn name_owner(conn: &zbus::Connection, service: &str) -> Result<Option<String>, MprisError> {
    let proxy = DBusProxy::new(conn).await?;
    let name = BusName::try_from(service).map_err(zbus::Error::from)?;
    match proxy.get_name_owner(name).await {
        Ok(owner) => Ok(Some(owner.to_string())),
        Err(zbus::fdo::Error::NameHasNoOwner(_)) => Ok(None),
        Err(e) => Err(e.into()),
    }
}
