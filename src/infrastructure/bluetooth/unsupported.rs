//! Host for platforms without a GATT server backend. The adapter probe always
//! comes back empty, so none of the later setup steps can be reached.

use crate::domain::gatt::{
    AdapterState, AdvertisementStatus, AdvertisingParameters, BleError, CharacteristicParameters,
    Deferral, GattHost, ServiceProvider, WriteOption, WriteRequest, WriteSender,
};
use tracing::info;

/// Uninhabited handle type: no value of it can exist
#[derive(Debug)]
pub enum Unavailable {}

impl ServiceProvider for Unavailable {
    fn advertisement_status(&self) -> Result<AdvertisementStatus, BleError> {
        match *self {}
    }

    fn start_advertising(&self, _params: &AdvertisingParameters) -> Result<(), BleError> {
        match *self {}
    }

    fn stop_advertising(&self) -> Result<(), BleError> {
        match *self {}
    }
}

impl Deferral for Unavailable {
    fn complete(self) -> Result<(), BleError> {
        match self {}
    }
}

impl WriteRequest for Unavailable {
    fn value(&self) -> Result<Vec<u8>, BleError> {
        match *self {}
    }

    fn option(&self) -> Result<WriteOption, BleError> {
        match *self {}
    }

    fn respond(&self) -> Result<(), BleError> {
        match *self {}
    }
}

pub struct UnsupportedHost;

impl UnsupportedHost {
    pub fn new() -> Self {
        Self
    }
}

impl GattHost for UnsupportedHost {
    type Adapter = Unavailable;
    type Provider = Unavailable;
    type Characteristic = Unavailable;
    type Deferral = Unavailable;
    type Request = Unavailable;

    async fn default_adapter(&self) -> Result<AdapterState<Unavailable>, BleError> {
        info!("No Bluetooth peripheral backend for this platform");
        Ok(AdapterState::NoAdapter)
    }

    async fn create_service(
        &self,
        adapter: &Unavailable,
        _uuid: u128,
    ) -> Result<Unavailable, BleError> {
        match *adapter {}
    }

    async fn create_characteristic(
        &self,
        provider: &Unavailable,
        _uuid: u128,
        _params: &CharacteristicParameters,
    ) -> Result<Unavailable, BleError> {
        match *provider {}
    }

    fn subscribe_writes(
        &self,
        characteristic: &Unavailable,
        _sink: WriteSender<Unavailable, Unavailable>,
    ) -> Result<(), BleError> {
        match *characteristic {}
    }
}
