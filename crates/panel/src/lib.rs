//! Client for the upstream SMM reseller panel. The panel exposes a single
//! form-encoded endpoint; `action=add` submits an order and the JSON answer
//! carries either an `order` id or an `error` message.

pub mod client;
pub mod types;

pub use client::{interpret_response, HttpPanelClient, PanelClient, PanelError};
pub use types::{PanelOrder, PanelReceipt};
