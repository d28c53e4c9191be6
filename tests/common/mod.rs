//! Shared test fixtures: an in-memory device fake that records every
//! outbound command, and a controller wired to it.

#![allow(dead_code)]

use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use corridor_lighting::clock::FixedClock;
use corridor_lighting::devices::{
    DeviceError, LightCommand, MotionFlagStore, PowerSwitch, PrimaryLight, SecondaryCommand,
    SecondaryLight, SensorPoller,
};
use corridor_lighting::{Controller, Devices, LightingConfig, PrimaryStatus};

/// Outbound commands in the order the controller issued them.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceCall {
    PrimarySet(LightCommand),
    Secondary(SecondaryCommand),
    PowerOn(Option<Duration>),
    FlagSet(bool),
}

/// Device calls that can be made to fail with a transport-style error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Fault {
    PrimarySet,
    PrimaryStatus,
    Secondary,
    Power,
    FlagRead,
    FlagWrite,
}

#[derive(Debug, Default)]
pub struct FakeDevices {
    calls: Mutex<Vec<DeviceCall>>,
    faults: Mutex<HashSet<Fault>>,
    primary: Mutex<PrimaryStatus>,
    flag: Mutex<Option<bool>>,
    motion: Mutex<HashMap<String, bool>>,
}

impl FakeDevices {
    pub fn new() -> Arc<Self> {
        let fake = Self::default();
        *fake.flag.lock().unwrap() = Some(true);
        Arc::new(fake)
    }

    pub fn devices(self: &Arc<Self>, secondary_enabled: bool) -> Devices {
        Devices::new(
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            self.clone(),
            secondary_enabled,
        )
    }

    pub fn calls(&self) -> Vec<DeviceCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.calls.lock().unwrap().clear();
    }

    pub fn primary_sets(&self) -> Vec<LightCommand> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::PrimarySet(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    pub fn secondary_commands(&self) -> Vec<SecondaryCommand> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                DeviceCall::Secondary(cmd) => Some(cmd),
                _ => None,
            })
            .collect()
    }

    /// Pretend someone changed the light outside the controller.
    pub fn set_primary_status(&self, output: bool, brightness: Option<u8>) {
        *self.primary.lock().unwrap() = PrimaryStatus { output, brightness };
    }

    pub fn primary_status(&self) -> PrimaryStatus {
        *self.primary.lock().unwrap()
    }

    pub fn set_flag(&self, value: Option<bool>) {
        *self.flag.lock().unwrap() = value;
    }

    pub fn flag(&self) -> Option<bool> {
        *self.flag.lock().unwrap()
    }

    pub fn set_sensor_motion(&self, url: &str, motion: bool) {
        self.motion.lock().unwrap().insert(url.to_string(), motion);
    }

    /// Make every later call of this kind fail without being recorded.
    pub fn fail(&self, fault: Fault) {
        self.faults.lock().unwrap().insert(fault);
    }

    pub fn heal(&self, fault: Fault) {
        self.faults.lock().unwrap().remove(&fault);
    }

    fn check(&self, fault: Fault) -> Result<(), DeviceError> {
        if self.faults.lock().unwrap().contains(&fault) {
            Err(DeviceError::Status(503))
        } else {
            Ok(())
        }
    }

    fn record(&self, call: DeviceCall) {
        self.calls.lock().unwrap().push(call);
    }
}

#[async_trait]
impl PrimaryLight for FakeDevices {
    async fn set(&self, command: LightCommand) -> Result<(), DeviceError> {
        self.check(Fault::PrimarySet)?;
        self.record(DeviceCall::PrimarySet(command));
        let mut status = self.primary.lock().unwrap();
        status.output = command.on;
        if let Some(b) = command.brightness {
            status.brightness = Some(b);
        }
        Ok(())
    }

    async fn status(&self) -> Result<PrimaryStatus, DeviceError> {
        self.check(Fault::PrimaryStatus)?;
        Ok(self.primary_status())
    }
}

#[async_trait]
impl SecondaryLight for FakeDevices {
    async fn apply(&self, command: SecondaryCommand) -> Result<(), DeviceError> {
        self.check(Fault::Secondary)?;
        self.record(DeviceCall::Secondary(command));
        Ok(())
    }
}

#[async_trait]
impl PowerSwitch for FakeDevices {
    async fn turn_on(&self, toggle_after: Option<Duration>) -> Result<(), DeviceError> {
        self.check(Fault::Power)?;
        self.record(DeviceCall::PowerOn(toggle_after));
        Ok(())
    }
}

#[async_trait]
impl MotionFlagStore for FakeDevices {
    async fn get(&self) -> Result<Option<bool>, DeviceError> {
        self.check(Fault::FlagRead)?;
        Ok(self.flag())
    }

    async fn set(&self, enabled: bool) -> Result<(), DeviceError> {
        self.check(Fault::FlagWrite)?;
        self.record(DeviceCall::FlagSet(enabled));
        self.set_flag(Some(enabled));
        Ok(())
    }
}

#[async_trait]
impl SensorPoller for FakeDevices {
    async fn motion(&self, status_url: &str) -> Result<bool, DeviceError> {
        match self.motion.lock().unwrap().get(status_url) {
            Some(motion) => Ok(*motion),
            None => Err(DeviceError::Status(503)),
        }
    }
}

pub struct Harness {
    pub fake: Arc<FakeDevices>,
    pub clock: Arc<FixedClock>,
    pub controller: Controller,
}

/// Controller over a fresh fake, with the clock pinned to `hour`.
pub fn harness_with(config: LightingConfig, hour: u32) -> Harness {
    let fake = FakeDevices::new();
    let clock = Arc::new(FixedClock::new(hour));
    let devices = fake.devices(config.secondary.enabled);
    let controller = Controller::new(Arc::new(config), devices, clock.clone());
    Harness {
        fake,
        clock,
        controller,
    }
}

pub fn harness(hour: u32) -> Harness {
    harness_with(LightingConfig::default(), hour)
}

/// Let spawned continuations and timers run for `ms` of (paused) time.
pub async fn settle(ms: u64) {
    tokio::time::sleep(Duration::from_millis(ms)).await;
}

pub fn ms(ms: u64) -> Duration {
    Duration::from_millis(ms)
}
