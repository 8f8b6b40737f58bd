//! Pure domain logic: tax, order status, cart, and message rendering.
//!
//! Nothing in here touches the database or the network, so services and
//! routes can share it freely.

pub mod cart;
pub mod gst;
pub mod i18n;
pub mod notify;
pub mod status;
pub mod whatsapp;
