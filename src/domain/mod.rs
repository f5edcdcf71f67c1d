//! Platform-independent model of the keypad bridge.
//!
//! Nothing in here touches WinRT or Win32 directly. Platform bindings live in
//! [`crate::infrastructure`] and plug in through the traits in [`gatt`] and
//! [`keypad`].

pub mod gatt;
pub mod keypad;
pub mod models;
pub mod publisher;
pub mod settings;
pub mod write_handler;

#[cfg(test)]
pub mod testing;
