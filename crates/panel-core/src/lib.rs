//! Client-side state and orchestration for the store control panel.
//!
//! [`state`] is the pure part: one [`state::PanelState`] document advanced by
//! [`state::PanelEvent`]s, nothing async, nothing on the wire. [`controller`]
//! drives the store over HTTP through [`client_sdk::StoreClient`] and feeds
//! the outcomes back into the state as events.

pub mod controller;
pub mod state;

pub use controller::PanelController;
pub use state::{KeyEntry, KeyListPane, LookupPane, PanelEvent, PanelState, StatsPane, StatusLine};
