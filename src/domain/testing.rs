//! Test doubles for the GATT and keystroke seams.
//!
//! Every double appends to a shared [`CallLog`] so tests can assert on the
//! order in which platform calls happened.

use crate::domain::gatt::{
    AdapterState, AdvertisementStatus, AdvertisingParameters, BleError, CharacteristicParameters,
    Deferral, DeferralGuard, GattHost, IncomingWrite, ServiceProvider, WriteOption, WriteRequest,
    WriteSender,
};
use crate::domain::keypad::{Keystroke, KeystrokeInjector};
use std::sync::{Arc, Mutex};

pub type CallLog = Arc<Mutex<Vec<String>>>;

pub fn calls(log: &CallLog) -> Vec<String> {
    log.lock().unwrap().clone()
}

fn record(log: &CallLog, call: impl Into<String>) {
    log.lock().unwrap().push(call.into());
}

pub struct MockDeferral {
    log: CallLog,
}

impl MockDeferral {
    pub fn new(log: &CallLog) -> Self {
        Self { log: log.clone() }
    }
}

impl Deferral for MockDeferral {
    fn complete(self) -> Result<(), BleError> {
        record(&self.log, "complete");
        Ok(())
    }
}

pub struct MockRequest {
    log: CallLog,
    payload: Vec<u8>,
    option: WriteOption,
    pub fail_value: bool,
    pub fail_respond: bool,
}

impl MockRequest {
    pub fn new(log: &CallLog, payload: &[u8], option: WriteOption) -> Self {
        Self {
            log: log.clone(),
            payload: payload.to_vec(),
            option,
            fail_value: false,
            fail_respond: false,
        }
    }
}

impl WriteRequest for MockRequest {
    fn value(&self) -> Result<Vec<u8>, BleError> {
        if self.fail_value {
            return Err(BleError::Platform("buffer unavailable".to_string()));
        }
        Ok(self.payload.clone())
    }

    fn option(&self) -> Result<WriteOption, BleError> {
        Ok(self.option)
    }

    fn respond(&self) -> Result<(), BleError> {
        record(&self.log, "respond");
        if self.fail_respond {
            return Err(BleError::Platform("central disconnected".to_string()));
        }
        Ok(())
    }
}

/// A write whose request object is already available
pub fn incoming(
    log: &CallLog,
    payload: &[u8],
    option: WriteOption,
) -> IncomingWrite<MockDeferral, MockRequest> {
    let request = MockRequest::new(log, payload, option);
    IncomingWrite {
        deferral: DeferralGuard::new(MockDeferral::new(log)),
        request: Box::pin(async move { Ok::<_, BleError>(request) }),
    }
}

/// A write whose request object never arrives
pub fn stalled(log: &CallLog) -> IncomingWrite<MockDeferral, MockRequest> {
    IncomingWrite {
        deferral: DeferralGuard::new(MockDeferral::new(log)),
        request: Box::pin(std::future::pending::<Result<MockRequest, BleError>>()),
    }
}

/// Records key sequences as text, e.g. `inject 12<enter>`
pub struct RecordingInjector {
    log: CallLog,
    pub fail: bool,
}

impl RecordingInjector {
    pub fn new(log: CallLog) -> Self {
        Self { log, fail: false }
    }
}

impl KeystrokeInjector for RecordingInjector {
    fn inject(&self, keys: &[Keystroke]) -> anyhow::Result<()> {
        let rendered: String = keys
            .iter()
            .map(|key| match key {
                Keystroke::Digit(d) => d.to_string(),
                Keystroke::Enter => "<enter>".to_string(),
            })
            .collect();
        record(&self.log, format!("inject {}", rendered));
        if self.fail {
            anyhow::bail!("input desktop locked");
        }
        Ok(())
    }
}

pub struct MockProvider {
    log: CallLog,
    status: Arc<Mutex<AdvertisementStatus>>,
    fail_start: bool,
}

impl ServiceProvider for MockProvider {
    fn advertisement_status(&self) -> Result<AdvertisementStatus, BleError> {
        Ok(*self.status.lock().unwrap())
    }

    fn start_advertising(&self, params: &AdvertisingParameters) -> Result<(), BleError> {
        record(
            &self.log,
            format!(
                "start_advertising connectable={} discoverable={}",
                params.connectable, params.discoverable
            ),
        );
        if self.fail_start {
            return Err(BleError::Platform("radio busy".to_string()));
        }
        *self.status.lock().unwrap() = AdvertisementStatus::Started;
        Ok(())
    }

    fn stop_advertising(&self) -> Result<(), BleError> {
        record(&self.log, "stop_advertising");
        *self.status.lock().unwrap() = AdvertisementStatus::Stopped;
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MockAdapter {
    Ready,
    Missing,
    CentralOnly,
    /// The adapter query itself errors
    QueryFails,
}

/// Scriptable [`GattHost`]. Flip the `fail_*` flags to make a step fail.
pub struct MockHost {
    log: CallLog,
    pub adapter: MockAdapter,
    pub fail_service: bool,
    pub fail_characteristic: bool,
    pub fail_subscribe: bool,
    pub fail_start: bool,
    /// Advertisement status shared with the provider once it exists
    pub status: Arc<Mutex<AdvertisementStatus>>,
    /// The sink handed over by `subscribe_writes`
    pub writes: Arc<Mutex<Option<WriteSender<MockDeferral, MockRequest>>>>,
}

impl MockHost {
    pub fn new(log: &CallLog) -> Self {
        Self {
            log: log.clone(),
            adapter: MockAdapter::Ready,
            fail_service: false,
            fail_characteristic: false,
            fail_subscribe: false,
            fail_start: false,
            status: Arc::new(Mutex::new(AdvertisementStatus::Created)),
            writes: Arc::new(Mutex::new(None)),
        }
    }
}

impl GattHost for MockHost {
    type Adapter = ();
    type Provider = MockProvider;
    type Characteristic = u128;
    type Deferral = MockDeferral;
    type Request = MockRequest;

    async fn default_adapter(&self) -> Result<AdapterState<()>, BleError> {
        record(&self.log, "default_adapter");
        Ok(match self.adapter {
            MockAdapter::Ready => AdapterState::Ready(()),
            MockAdapter::Missing => AdapterState::NoAdapter,
            MockAdapter::CentralOnly => AdapterState::NoPeripheralSupport,
            MockAdapter::QueryFails => {
                return Err(BleError::Platform("radio switched off".to_string()))
            }
        })
    }

    async fn create_service(&self, _adapter: &(), uuid: u128) -> Result<MockProvider, BleError> {
        record(&self.log, format!("create_service {:032X}", uuid));
        if self.fail_service {
            return Err(BleError::Status("ResourceInUse".to_string()));
        }
        Ok(MockProvider {
            log: self.log.clone(),
            status: self.status.clone(),
            fail_start: self.fail_start,
        })
    }

    async fn create_characteristic(
        &self,
        _provider: &MockProvider,
        uuid: u128,
        params: &CharacteristicParameters,
    ) -> Result<u128, BleError> {
        assert_eq!(*params, CharacteristicParameters::KEYPAD);
        record(&self.log, format!("create_characteristic {:032X}", uuid));
        if self.fail_characteristic {
            return Err(BleError::Status("RadioNotAvailable".to_string()));
        }
        Ok(uuid)
    }

    fn subscribe_writes(
        &self,
        _characteristic: &u128,
        sink: WriteSender<MockDeferral, MockRequest>,
    ) -> Result<(), BleError> {
        record(&self.log, "subscribe_writes");
        if self.fail_subscribe {
            return Err(BleError::Platform("event registration failed".to_string()));
        }
        *self.writes.lock().unwrap() = Some(sink);
        Ok(())
    }
}
