//! Relay Module - Conversazioni e messaggi
//!
//! - `ops`: operazioni sullo store condivise tra gli handler HTTP e il Relay
//! - `view`: stato locale lato client, riconciliato con il feed live degli inserimenti

pub mod ops;
pub mod view;

pub use view::Relay;
