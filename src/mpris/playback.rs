//! Minimal playback status and position querying for MPRIS.

use crate::mpris::connection::MprisError;
use zbus::Proxy;
use zvariant::OwnedValue;

const PLAYER_PATH: &str = "/org/mpris/MediaPlayer2";
const PLAYER_INTERFACE: &str = "org.mpris.MediaPlayer2.Player";

fn parse_position_from_owned(val: &OwnedValue) -> Option<f64> {
    // Try direct integer types
    if let Ok(i) = i64::try_from(val.clone()) {
        return Some(i as f64 / 1_000_000.0);
    }
    if let Ok(u) = u64::try_from(val.clone()) {
        return Some(u as f64 / 1_000_000.0);
    }

    // Try tuple forms like (i64,) or (u64,)
    if let Ok((i,)) = <(i64,)>::try_from(val.clone()) {
        return Some(i as f64 / 1_000_000.0);
    }
    if let Ok((u,)) = <(u64,)>::try_from(val.clone()) {
        return Some(u as f64 / 1_000_000.0);
    }

    None
}

async fn get_player_property(
    conn: &zbus::Connection,
    destination: &str,
    property: &str,
) -> Result<OwnedValue, MprisError> {
    // Use targeted Properties.Get to avoid triggering GetAll on some players
    let props_proxy = Proxy::new(conn, destination, PLAYER_PATH, "org.freedesktop.DBus.Properties").await?;
    let reply = props_proxy.call_method("Get", &(PLAYER_INTERFACE, property)).await?;
    Ok(reply.body().deserialize::<OwnedValue>()?)
}

/// Query the playback position (seconds) of a specific player.
pub async fn get_position(conn: &zbus::Connection, destination: &str) -> Result<f64, MprisError> {
    let val = get_player_property(conn, destination, "Position").await?;
    parse_position_from_owned(&val).ok_or_else(|| MprisError::NoPosition(destination.to_string()))
}

/// Query the playback status of a specific player ("Playing", "Paused", "Stopped").
pub async fn get_playback_status(conn: &zbus::Connection, destination: &str) -> Result<String, MprisError> {
    let val = get_player_property(conn, destination, "PlaybackStatus").await?;
    Ok(String::try_from(val).unwrap_or_else(|_| "Stopped".to_string()))
}
