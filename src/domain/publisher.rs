//! Service Publisher
//!
//! Brings the keypad service up in a fixed order and takes advertising down
//! again on exit:
//!
//! ```text
//! adapter probe -> create service -> create characteristic -> subscribe writes -> advertise
//! ```
//!
//! The first failing step ends the sequence. Nothing created before it is
//! torn down; a provider that never started advertising needs no stop call.

use crate::domain::gatt::{
    parse_uuid, AdapterState, AdvertisementStatus, AdvertisingParameters, BleError,
    CharacteristicParameters, GattHost, ServiceProvider, WriteSender, CHARACTERISTIC_UUID,
    SERVICE_UUID,
};
use crate::domain::models::PRODUCT_NAME;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum SetupError {
    #[error("No Bluetooth adapter found!")]
    NoAdapter,
    #[error("Peripheral mode not supported!")]
    NoPeripheralSupport,
    #[error("Error creating service!")]
    ServiceCreation(#[source] BleError),
    #[error("Error creating characteristic!")]
    CharacteristicCreation(#[source] BleError),
    #[error("Error starting advertising!")]
    Advertising(#[source] BleError),
    #[error("Keypad service was already published")]
    AlreadyPublished,
}

impl SetupError {
    /// Text for the status surface, e.g. `Jelling (No Bluetooth adapter found!)`
    pub fn status_text(&self) -> String {
        format!("{} ({})", PRODUCT_NAME, self)
    }
}

/// Owns the one service provider and characteristic of the process
pub struct ServicePublisher<H: GattHost> {
    host: H,
    attempted: bool,
    provider: Option<H::Provider>,
    characteristic: Option<H::Characteristic>,
}

impl<H: GattHost> ServicePublisher<H> {
    pub fn new(host: H) -> Self {
        Self {
            host,
            attempted: false,
            provider: None,
            characteristic: None,
        }
    }

    /// Run the setup sequence once. Writes on the characteristic are sent to
    /// `writes` from then on.
    pub async fn publish(
        &mut self,
        writes: WriteSender<H::Deferral, H::Request>,
    ) -> Result<(), SetupError> {
        if self.attempted {
            return Err(SetupError::AlreadyPublished);
        }
        self.attempted = true;

        let adapter = match self.host.default_adapter().await {
            Ok(AdapterState::Ready(adapter)) => adapter,
            Ok(AdapterState::NoAdapter) => return Err(SetupError::NoAdapter),
            Ok(AdapterState::NoPeripheralSupport) => return Err(SetupError::NoPeripheralSupport),
            Err(e) => {
                warn!("Bluetooth adapter query failed: {}", e);
                return Err(SetupError::NoAdapter);
            }
        };
        info!("Bluetooth adapter supports the peripheral role");

        let service_uuid = parse_uuid(SERVICE_UUID).map_err(SetupError::ServiceCreation)?;
        let provider = self
            .host
            .create_service(&adapter, service_uuid)
            .await
            .map_err(SetupError::ServiceCreation)?;
        let provider = self.provider.insert(provider);
        info!("GATT service {} created", SERVICE_UUID);

        let characteristic_uuid =
            parse_uuid(CHARACTERISTIC_UUID).map_err(SetupError::CharacteristicCreation)?;
        let characteristic = self
            .host
            .create_characteristic(
                provider,
                characteristic_uuid,
                &CharacteristicParameters::KEYPAD,
            )
            .await
            .map_err(SetupError::CharacteristicCreation)?;
        let characteristic = self.characteristic.insert(characteristic);
        info!("GATT characteristic {} created", CHARACTERISTIC_UUID);

        self.host
            .subscribe_writes(characteristic, writes)
            .map_err(SetupError::Advertising)?;

        provider
            .start_advertising(&AdvertisingParameters::KEYPAD)
            .map_err(SetupError::Advertising)?;
        info!("Advertising keypad service");

        Ok(())
    }

    pub fn advertisement_status(&self) -> Option<AdvertisementStatus> {
        self.provider
            .as_ref()
            .and_then(|p| p.advertisement_status().ok())
    }

    /// Stop advertising if, and only if, it is currently started.
    ///
    /// Returns whether a stop was issued.
    pub fn stop_advertising(&self) -> Result<bool, BleError> {
        let Some(provider) = &self.provider else {
            return Ok(false);
        };

        if !provider.advertisement_status()?.is_started() {
            return Ok(false);
        }

        provider.stop_advertising()?;
        info!("Stopped advertising keypad service");
        Ok(true)
    }
}
