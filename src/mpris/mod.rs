//! MPRIS module: the desktop media bus as a host of media elements.

pub mod connection;
pub mod host;
pub mod playback;

pub use host::MprisHost;
