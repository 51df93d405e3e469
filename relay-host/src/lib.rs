//! # relay-host
//!
//! The encoder-side binary: captures the local screen via DXGI Desktop
//! Duplication, builds an [`relay_core::EncoderSession`] once a viewer
//! connects and negotiates `K`/scale percent, and streams delta frames back
//! per the request gate in §4.8.
//!
//! ## Modes
//!
//! - **Console**: run in the foreground (the default).
//! - **Service**: run as a Windows service (launched by the SCM).
//! - **Install / Uninstall**: register or remove the Windows service.

pub mod capture;
pub mod config;
pub mod service;

#[cfg(target_os = "windows")]
pub mod win_service;
