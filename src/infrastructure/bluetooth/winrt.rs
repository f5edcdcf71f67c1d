//! WinRT GATT Server
//!
//! [`GattHost`] on top of `Windows.Devices.Bluetooth.GenericAttributeProfile`.

use crate::domain::gatt::{
    AdapterState, AdvertisementStatus, AdvertisingParameters, BleError, CharacteristicParameters,
    CharacteristicProperties, Deferral, DeferralGuard, GattHost, IncomingWrite, ProtectionLevel,
    RequestFuture, ServiceProvider, WriteOption, WriteRequest, WriteSender,
};
use tokio::sync::mpsc::error::SendError;
use tracing::{debug, info, trace, warn};
use windows::core::GUID;
use windows::Devices::Bluetooth::GenericAttributeProfile::{
    GattCharacteristicProperties, GattLocalCharacteristic, GattLocalCharacteristicParameters,
    GattProtectionLevel, GattServiceProvider, GattServiceProviderAdvertisementStatus,
    GattServiceProviderAdvertisingParameters, GattWriteOption, GattWriteRequest,
    GattWriteRequestedEventArgs,
};
use windows::Devices::Bluetooth::{BluetoothAdapter, BluetoothError};
use windows::Foundation::TypedEventHandler;
use windows::Storage::Streams::DataReader;

impl From<windows::core::Error> for BleError {
    fn from(e: windows::core::Error) -> Self {
        BleError::Platform(e.to_string())
    }
}

fn check(error: BluetoothError) -> Result<(), BleError> {
    if error == BluetoothError::Success {
        Ok(())
    } else {
        Err(BleError::Status(format!("{:?}", error)))
    }
}

fn protection_level(level: ProtectionLevel) -> GattProtectionLevel {
    match level {
        ProtectionLevel::Plain => GattProtectionLevel::Plain,
    }
}

fn characteristic_properties(props: &CharacteristicProperties) -> GattCharacteristicProperties {
    let mut flags = GattCharacteristicProperties::None;
    if props.write {
        flags = flags | GattCharacteristicProperties::Write;
    }
    if props.reliable_writes {
        flags = flags | GattCharacteristicProperties::ReliableWrites;
    }
    if props.extended_properties {
        flags = flags | GattCharacteristicProperties::ExtendedProperties;
    }
    flags
}

/// The Windows Bluetooth LE stack
pub struct WinRtHost;

impl WinRtHost {
    pub fn new() -> Self {
        Self
    }
}

impl GattHost for WinRtHost {
    type Adapter = BluetoothAdapter;
    type Provider = GattServiceProvider;
    type Characteristic = GattLocalCharacteristic;
    type Deferral = windows::Foundation::Deferral;
    type Request = GattWriteRequest;

    async fn default_adapter(&self) -> Result<AdapterState<BluetoothAdapter>, BleError> {
        // A machine without an adapter yields an empty result, which surfaces
        // as an error here.
        let adapter = match BluetoothAdapter::GetDefaultAsync()?.await {
            Ok(adapter) => adapter,
            Err(e) => {
                debug!("No default Bluetooth adapter: {}", e);
                return Ok(AdapterState::NoAdapter);
            }
        };

        if !adapter.IsPeripheralRoleSupported()? {
            return Ok(AdapterState::NoPeripheralSupport);
        }

        info!("Using Bluetooth adapter {:#X}", adapter.BluetoothAddress()?);
        Ok(AdapterState::Ready(adapter))
    }

    async fn create_service(
        &self,
        _adapter: &BluetoothAdapter,
        uuid: u128,
    ) -> Result<GattServiceProvider, BleError> {
        let result = GattServiceProvider::CreateAsync(GUID::from_u128(uuid))?.await?;
        check(result.Error()?)?;
        Ok(result.ServiceProvider()?)
    }

    async fn create_characteristic(
        &self,
        provider: &GattServiceProvider,
        uuid: u128,
        params: &CharacteristicParameters,
    ) -> Result<GattLocalCharacteristic, BleError> {
        let parameters = GattLocalCharacteristicParameters::new()?;
        parameters.SetWriteProtectionLevel(protection_level(params.write_protection))?;
        parameters.SetCharacteristicProperties(characteristic_properties(&params.properties))?;

        let result = provider
            .Service()?
            .CreateCharacteristicAsync(GUID::from_u128(uuid), &parameters)?
            .await?;
        check(result.Error()?)?;
        Ok(result.Characteristic()?)
    }

    fn subscribe_writes(
        &self,
        characteristic: &GattLocalCharacteristic,
        sink: WriteSender<Self::Deferral, GattWriteRequest>,
    ) -> Result<(), BleError> {
        let handler = TypedEventHandler::new(
            move |_: windows::core::Ref<GattLocalCharacteristic>,
                  args: windows::core::Ref<GattWriteRequestedEventArgs>| {
                if let Some(args) = args.as_ref() {
                    // Take the deferral before anything can suspend.
                    let deferral = DeferralGuard::new(args.GetDeferral()?);
                    let operation = args.GetRequestAsync();
                    let request: RequestFuture<GattWriteRequest> = Box::pin(async move {
                        let request = operation?.await?;
                        Ok::<_, BleError>(request)
                    });

                    trace!("Write request received");
                    if let Err(SendError(write)) = sink.send(IncomingWrite { deferral, request }) {
                        warn!("Bluetooth worker gone, releasing write request");
                        if let Err(e) = write.deferral.complete() {
                            warn!("Failed to release write request: {}", e);
                        }
                    }
                }
                Ok(())
            },
        );

        characteristic.WriteRequested(&handler)?;
        Ok(())
    }
}

impl ServiceProvider for GattServiceProvider {
    fn advertisement_status(&self) -> Result<AdvertisementStatus, BleError> {
        let status = match self.AdvertisementStatus()? {
            GattServiceProviderAdvertisementStatus::Started => AdvertisementStatus::Started,
            GattServiceProviderAdvertisementStatus::StartedWithoutAllAdvertisementData => {
                AdvertisementStatus::StartedWithoutAllData
            }
            GattServiceProviderAdvertisementStatus::Stopped => AdvertisementStatus::Stopped,
            GattServiceProviderAdvertisementStatus::Aborted => AdvertisementStatus::Aborted,
            _ => AdvertisementStatus::Created,
        };
        Ok(status)
    }

    fn start_advertising(&self, params: &AdvertisingParameters) -> Result<(), BleError> {
        let parameters = GattServiceProviderAdvertisingParameters::new()?;
        parameters.SetIsConnectable(params.connectable)?;
        parameters.SetIsDiscoverable(params.discoverable)?;
        self.StartAdvertisingWithParameters(&parameters)?;
        Ok(())
    }

    fn stop_advertising(&self) -> Result<(), BleError> {
        self.StopAdvertising()?;
        Ok(())
    }
}

impl Deferral for windows::Foundation::Deferral {
    fn complete(self) -> Result<(), BleError> {
        self.Complete()?;
        Ok(())
    }
}

impl WriteRequest for GattWriteRequest {
    fn value(&self) -> Result<Vec<u8>, BleError> {
        let buffer = self.Value()?;
        let length = buffer.Length()? as usize;
        let reader = DataReader::FromBuffer(&buffer)?;

        let mut bytes = vec![0u8; length];
        reader.ReadBytes(&mut bytes)?;
        Ok(bytes)
    }

    fn option(&self) -> Result<WriteOption, BleError> {
        Ok(match self.Option()? {
            GattWriteOption::WriteWithResponse => WriteOption::WithResponse,
            _ => WriteOption::WithoutResponse,
        })
    }

    fn respond(&self) -> Result<(), BleError> {
        self.Respond()?;
        Ok(())
    }
}
