//! GATT Model
//!
//! Identities, parameters and the seams between the keypad core and a
//! platform BLE stack.
//!
//! A platform implements [`GattHost`] once. The publisher drives it through
//! the setup sequence, and the host forwards every incoming write into the
//! [`WriteSender`] it was handed, as an [`IncomingWrite`] whose deferral was
//! taken before anything else happened.

use std::future::Future;
use std::pin::Pin;
use thiserror::Error;
use tokio::sync::mpsc;
use tracing::warn;

/// Keypad GATT service UUID
pub const SERVICE_UUID: &str = "B670003C-0079-465C-9BA7-6C0539CCD67F";

/// Digit entry characteristic UUID - the only characteristic on the service
pub const CHARACTERISTIC_UUID: &str = "F4186B06-D796-4327-AF39-AC22C50BDCA8";

#[derive(Debug, Error)]
pub enum BleError {
    #[error("platform call failed: {0}")]
    Platform(String),
    #[error("platform reported {0}")]
    Status(String),
    #[error("invalid UUID: {0}")]
    InvalidUuid(String),
}

/// Parse a UUID string into its 128-bit value
pub fn parse_uuid(uuid_str: &str) -> Result<u128, BleError> {
    let hex = uuid_str.replace('-', "");

    if hex.len() != 32 || !hex.bytes().all(|b| b.is_ascii_hexdigit()) {
        return Err(BleError::InvalidUuid(uuid_str.to_string()));
    }

    u128::from_str_radix(&hex, 16).map_err(|_| BleError::InvalidUuid(uuid_str.to_string()))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProtectionLevel {
    /// No encryption or authentication required
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicProperties {
    pub write: bool,
    pub reliable_writes: bool,
    pub extended_properties: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CharacteristicParameters {
    pub write_protection: ProtectionLevel,
    pub properties: CharacteristicProperties,
}

impl CharacteristicParameters {
    /// Parameters of the digit entry characteristic
    pub const KEYPAD: Self = Self {
        write_protection: ProtectionLevel::Plain,
        properties: CharacteristicProperties {
            write: true,
            reliable_writes: true,
            extended_properties: true,
        },
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AdvertisingParameters {
    pub connectable: bool,
    pub discoverable: bool,
}

impl AdvertisingParameters {
    pub const KEYPAD: Self = Self {
        connectable: true,
        discoverable: true,
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AdvertisementStatus {
    Created,
    Stopped,
    Started,
    /// Advertising, but the platform could not fit every advertisement field
    StartedWithoutAllData,
    Aborted,
}

impl AdvertisementStatus {
    pub fn is_started(self) -> bool {
        matches!(self, Self::Started | Self::StartedWithoutAllData)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteOption {
    WithResponse,
    WithoutResponse,
}

/// Result of probing the default Bluetooth adapter
#[derive(Debug)]
pub enum AdapterState<A> {
    NoAdapter,
    NoPeripheralSupport,
    Ready(A),
}

/// Suspends the platform's automatic completion of a write request.
///
/// `complete` consumes the token, so a second completion does not type-check.
pub trait Deferral: Send + 'static {
    fn complete(self) -> Result<(), BleError>;
}

/// A fetched write request
pub trait WriteRequest: Send + 'static {
    /// Payload bytes, exactly as long as the platform buffer declares
    fn value(&self) -> Result<Vec<u8>, BleError>;
    fn option(&self) -> Result<WriteOption, BleError>;
    /// Send a success response to the central
    fn respond(&self) -> Result<(), BleError>;
}

/// Completes the wrapped deferral exactly once.
///
/// If the guard is dropped without [`complete`](Self::complete) being called,
/// e.g. because the task owning it was aborted at shutdown, the deferral is
/// completed from `Drop`.
pub struct DeferralGuard<D: Deferral> {
    deferral: Option<D>,
}

impl<D: Deferral> DeferralGuard<D> {
    pub fn new(deferral: D) -> Self {
        Self {
            deferral: Some(deferral),
        }
    }

    pub fn complete(mut self) -> Result<(), BleError> {
        match self.deferral.take() {
            Some(deferral) => deferral.complete(),
            None => Ok(()),
        }
    }
}

impl<D: Deferral> Drop for DeferralGuard<D> {
    fn drop(&mut self) {
        if let Some(deferral) = self.deferral.take() {
            warn!("Write request abandoned before completion, releasing its deferral");
            if let Err(e) = deferral.complete() {
                warn!("Failed to release write deferral: {}", e);
            }
        }
    }
}

pub type RequestFuture<R> = Pin<Box<dyn Future<Output = Result<R, BleError>> + Send>>;

/// One write as delivered by the platform: the deferral, guarded the moment
/// it was taken, and the still-pending fetch of the request object.
pub struct IncomingWrite<D: Deferral, R> {
    pub deferral: DeferralGuard<D>,
    pub request: RequestFuture<R>,
}

pub type WriteSender<D, R> = mpsc::UnboundedSender<IncomingWrite<D, R>>;
pub type WriteReceiver<D, R> = mpsc::UnboundedReceiver<IncomingWrite<D, R>>;

/// Live GATT service registration
pub trait ServiceProvider {
    fn advertisement_status(&self) -> Result<AdvertisementStatus, BleError>;
    fn start_advertising(&self, params: &AdvertisingParameters) -> Result<(), BleError>;
    fn stop_advertising(&self) -> Result<(), BleError>;
}

/// A platform BLE stack able to host a GATT server
pub trait GattHost {
    type Adapter;
    type Provider: ServiceProvider;
    type Characteristic;
    type Deferral: Deferral;
    type Request: WriteRequest;

    async fn default_adapter(&self) -> Result<AdapterState<Self::Adapter>, BleError>;

    async fn create_service(
        &self,
        adapter: &Self::Adapter,
        uuid: u128,
    ) -> Result<Self::Provider, BleError>;

    async fn create_characteristic(
        &self,
        provider: &Self::Provider,
        uuid: u128,
        params: &CharacteristicParameters,
    ) -> Result<Self::Characteristic, BleError>;

    /// Route every write on `characteristic` into `sink`
    fn subscribe_writes(
        &self,
        characteristic: &Self::Characteristic,
        sink: WriteSender<Self::Deferral, Self::Request>,
    ) -> Result<(), BleError>;
}
