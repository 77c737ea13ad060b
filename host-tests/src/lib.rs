//! Host-based scenario tests for the ESP32 OTA beacon
//! These tests run on the development machine, not on the ESP32. They drive
//! `ota-core` the way the firmware main loop does, with a fake clock, an
//! in-memory flash sink and the real espota client over loopback sockets.

use ota_core::lifecycle::{Effect, OtaLifecycle};
use ota_core::protocol::Command;
use ota_core::service::{FirmwareSink, OtaService};
use ota_core::Clock;
use std::cell::Cell;
use std::net::SocketAddr;
use std::time::Duration;

/// Clock that only moves when something sleeps
#[derive(Default)]
pub struct FakeClock {
    now: Cell<Duration>,
}

impl Clock for FakeClock {
    fn now(&self) -> Duration {
        self.now.get()
    }

    fn sleep(&self, duration: Duration) {
        self.now.set(self.now.get() + duration);
    }
}

/// Flash stand-in that keeps the image in memory
#[derive(Default, Debug)]
pub struct MemorySink {
    pub data: Vec<u8>,
    pub expected: Option<usize>,
    pub finished: bool,
    pub aborted: bool,
}

impl FirmwareSink for MemorySink {
    type Error = String;

    fn begin(&mut self, size: usize, command: Command) -> Result<(), Self::Error> {
        if command != Command::Flash {
            return Err("filesystem images are not supported".to_string());
        }
        self.data.clear();
        self.expected = Some(size);
        self.finished = false;
        self.aborted = false;
        Ok(())
    }

    fn write(&mut self, chunk: &[u8]) -> Result<(), Self::Error> {
        self.data.extend_from_slice(chunk);
        Ok(())
    }

    fn finish(&mut self) -> Result<(), Self::Error> {
        if Some(self.data.len()) != self.expected {
            return Err("short image".to_string());
        }
        self.finished = true;
        Ok(())
    }

    fn abort(&mut self) {
        self.aborted = true;
    }
}

/// What the panel and LED would have shown
#[derive(Default, Debug)]
pub struct PanelLog {
    pub effects: Vec<Effect>,
    pub led_on: bool,
    pub halted: usize,
}

impl PanelLog {
    pub fn record(&mut self, effects: Vec<Effect>) {
        for effect in effects {
            match effect {
                Effect::ToggleIndicator => self.led_on = !self.led_on,
                Effect::PrepareIndicator => self.led_on = false,
                Effect::HaltAppTasks => self.halted += 1,
                _ => {}
            }
            self.effects.push(effect);
        }
    }

    pub fn progress_values(&self) -> Vec<u8> {
        self.effects
            .iter()
            .filter_map(|e| match e {
                Effect::ShowProgress(pct) => Some(*pct),
                _ => None,
            })
            .collect()
    }

    /// Text of the last full-screen state that was drawn
    pub fn last_screen(&self) -> Vec<String> {
        self.effects
            .iter()
            .rev()
            .find(|e| {
                matches!(
                    e,
                    Effect::ShowStartScreen | Effect::ShowFinished | Effect::ShowError(_)
                )
            })
            .map(|e| e.text())
            .unwrap_or_default()
    }
}

pub fn loopback_service(settings: ota_core::OtaSettings) -> OtaService<MemorySink> {
    let addr: SocketAddr = "127.0.0.1:0".parse().expect("loopback address");
    OtaService::bind_addr(addr, settings, MemorySink::default()).expect("bind loopback service")
}

/// One main loop iteration: poll the service and feed its events to the lifecycle
pub fn poll_once(
    service: &mut OtaService<MemorySink>,
    lifecycle: &mut OtaLifecycle,
    panel: &mut PanelLog,
) -> ota_core::ServiceStatus {
    service
        .handle(|event| panel.record(lifecycle.apply(event)))
        .expect("listening socket")
}
