//! Single-instance lock.
//!
//! The first process binds a namespaced local socket and keeps it for its
//! whole lifetime. A later process either reaches that socket or fails to
//! bind the name, and backs off.

use anyhow::{Context, Result};
use interprocess::local_socket::{
    traits::{ListenerExt, Stream as _},
    GenericNamespaced, ListenerOptions, Stream as LocalStream, ToNsName,
};
use std::io;
use tracing::debug;

pub const INSTANCE_SOCKET: &str = "jelling.instance.sock";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstanceLock {
    Acquired,
    AlreadyRunning,
}

pub fn acquire_instance_lock(socket_name: &str) -> Result<InstanceLock> {
    let name = socket_name.to_ns_name::<GenericNamespaced>()?;
    if LocalStream::connect(name).is_ok() {
        return Ok(InstanceLock::AlreadyRunning);
    }

    let name = socket_name.to_ns_name::<GenericNamespaced>()?;
    let listener = match ListenerOptions::new().name(name).create_sync() {
        Ok(listener) => listener,
        Err(e) if e.kind() == io::ErrorKind::AddrInUse => {
            return Ok(InstanceLock::AlreadyRunning)
        }
        Err(e) => return Err(e).context("Failed to bind instance lock socket"),
    };

    // The listener lives on this thread until the process exits.
    std::thread::Builder::new()
        .name("instance-lock".to_string())
        .spawn(move || {
            for _probe in listener.incoming().filter_map(|conn| conn.ok()) {
                debug!("Another instance probed the instance lock");
            }
        })
        .context("Failed to spawn instance lock thread")?;

    Ok(InstanceLock::Acquired)
}
