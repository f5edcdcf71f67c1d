use crate::domain::write_handler::WriteOutcome;

/// Name shown on the status surface and used as the status text prefix
pub const PRODUCT_NAME: &str = "Jelling";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceState {
    Starting,
    Advertising,
    /// Setup failed; carries the status text to display
    Unavailable(String),
    Stopped,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageSeverity {
    Info,
    Success,
    Warning,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub message: String,
    pub severity: MessageSeverity,
}

/// Everything the Bluetooth worker reports to the shell
#[derive(Debug, Clone)]
pub enum AppEvent {
    ServiceState(ServiceState),
    WriteHandled(WriteOutcome),
    LogMessage(StatusMessage),
}

#[derive(Debug)]
pub enum BluetoothCommand {
    /// Stop advertising, release in-flight writes, then acknowledge
    Shutdown(std::sync::mpsc::Sender<()>),
}
