//! Bluetooth Module
//!
//! Hosts the keypad GATT service.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────┐
//! │               BluetoothWorker                │
//! │  (own thread, current-thread tokio runtime)  │
//! └──────────────────────┬───────────────────────┘
//!                        │ GattHost
//!            ┌───────────┴───────────┐
//!            ▼                       ▼
//!     ┌────────────┐         ┌───────────────┐
//!     │ WinRtHost  │         │UnsupportedHost│
//!     │ (Windows)  │         │  (elsewhere)  │
//!     └────────────┘         └───────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`service`] - Worker thread, write dispatch and shutdown
//! - `winrt` - GATT server on `Windows.Devices.Bluetooth`
//! - `unsupported` - Backend reporting no adapter on other platforms

pub mod service;

#[cfg(not(windows))]
mod unsupported;
#[cfg(windows)]
mod winrt;

pub use service::BluetoothWorker;

#[cfg(not(windows))]
pub use unsupported::UnsupportedHost as PlatformHost;
#[cfg(windows)]
pub use winrt::WinRtHost as PlatformHost;
