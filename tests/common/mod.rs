//! Host-side test doubles shared by the integration tests
//!
//! `MockBus` is a register file keyed by (chip, page, address). Reads can
//! be scripted per register: queued values are returned in order and the
//! last one sticks. Every access is logged.

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Barrier, Mutex};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embedded_hal::delay::DelayNs;
use mtv_tdmb::config::HardwareProfile;
use mtv_tdmb::error::{Error, TdmbResult, TunerError};
use mtv_tdmb::hal::{Page, RegisterBus, RfTuner};
use mtv_tdmb::types::ChipIndex;
use mtv_tdmb::Tdmb;

/// Driver type used by every test
pub type TestTdmb = Tdmb<CriticalSectionRawMutex, MockBus, MockTuner, MockDelay>;

/// Transport failure injected by the mock
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MockBusError;

/// One logged bus access
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Access {
    Write { chip: u8, page: Page, addr: u8, value: u8 },
    Read { chip: u8, page: Page, addr: u8 },
    Burst { chip: u8, page: Page, addr: u8, len: usize },
}

type Key = (u8, Page, u8);

struct BusModel {
    chip: u8,
    page: Page,
    regs: HashMap<Key, u8>,
    scripts: HashMap<Key, VecDeque<u8>>,
    log: Vec<Access>,
    burst_fill: u8,
    failing_page: Option<Page>,
}

impl Default for BusModel {
    fn default() -> Self {
        Self {
            chip: 0,
            page: Page::Host,
            regs: HashMap::new(),
            scripts: HashMap::new(),
            log: Vec::new(),
            burst_fill: 0xA5,
            failing_page: None,
        }
    }
}

/// Shared handle to a simulated register file
#[derive(Clone, Default)]
pub struct MockBus(Arc<Mutex<BusModel>>);

impl MockBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Preset a master-chip register
    pub fn set(&self, page: Page, addr: u8, value: u8) {
        self.0.lock().unwrap().regs.insert((0, page, addr), value);
    }

    /// Script master-chip reads; the last value sticks
    pub fn script(&self, page: Page, addr: u8, values: &[u8]) {
        self.0
            .lock()
            .unwrap()
            .scripts
            .insert((0, page, addr), values.iter().copied().collect());
    }

    /// Current master-chip register content
    pub fn value(&self, page: Page, addr: u8) -> u8 {
        self.value_on(ChipIndex::MASTER, page, addr)
    }

    pub fn value_on(&self, chip: ChipIndex, page: Page, addr: u8) -> u8 {
        let model = self.0.lock().unwrap();
        model
            .regs
            .get(&(chip.as_u8(), page, addr))
            .copied()
            .unwrap_or(0)
    }

    /// Values written to one master-chip register, in order
    pub fn writes_to(&self, page: Page, addr: u8) -> Vec<u8> {
        self.writes_on(ChipIndex::MASTER, page, addr)
    }

    pub fn writes_on(&self, chip: ChipIndex, page: Page, addr: u8) -> Vec<u8> {
        self.0
            .lock()
            .unwrap()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write {
                    chip: c,
                    page: p,
                    addr: r,
                    value,
                } if c == chip.as_u8() && p == page && r == addr => Some(value),
                _ => None,
            })
            .collect()
    }

    /// Every write in order as (page, addr, value)
    pub fn writes(&self) -> Vec<(Page, u8, u8)> {
        self.0
            .lock()
            .unwrap()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Write {
                    page, addr, value, ..
                } => Some((page, addr, value)),
                _ => None,
            })
            .collect()
    }

    pub fn read_count(&self) -> usize {
        self.0
            .lock()
            .unwrap()
            .log
            .iter()
            .filter(|a| matches!(a, Access::Read { .. }))
            .count()
    }

    pub fn access_count(&self) -> usize {
        self.0.lock().unwrap().log.len()
    }

    /// Lengths of every burst read in order
    pub fn bursts(&self) -> Vec<usize> {
        self.0
            .lock()
            .unwrap()
            .log
            .iter()
            .filter_map(|a| match *a {
                Access::Burst { len, .. } => Some(len),
                _ => None,
            })
            .collect()
    }

    pub fn clear_log(&self) {
        self.0.lock().unwrap().log.clear();
    }

    pub fn set_burst_fill(&self, byte: u8) {
        self.0.lock().unwrap().burst_fill = byte;
    }

    /// Fail every selection of `page`
    pub fn fail_on_page(&self, page: Page) {
        self.0.lock().unwrap().failing_page = Some(page);
    }
}

impl RegisterBus for MockBus {
    type Error = MockBusError;

    fn select_chip(&mut self, chip: ChipIndex) -> Result<(), MockBusError> {
        self.0.lock().unwrap().chip = chip.as_u8();
        Ok(())
    }

    fn select_page(&mut self, page: Page) -> Result<(), MockBusError> {
        let mut model = self.0.lock().unwrap();
        if model.failing_page == Some(page) {
            return Err(MockBusError);
        }
        model.page = page;
        Ok(())
    }

    fn write(&mut self, addr: u8, value: u8) -> Result<(), MockBusError> {
        let mut model = self.0.lock().unwrap();
        let (chip, page) = (model.chip, model.page);
        model.regs.insert((chip, page, addr), value);
        model.log.push(Access::Write {
            chip,
            page,
            addr,
            value,
        });
        Ok(())
    }

    fn read(&mut self, addr: u8) -> Result<u8, MockBusError> {
        let mut model = self.0.lock().unwrap();
        let key = (model.chip, model.page, addr);
        model.log.push(Access::Read {
            chip: key.0,
            page: key.1,
            addr,
        });
        let scripted = match model.scripts.get_mut(&key) {
            Some(queue) if queue.len() > 1 => queue.pop_front(),
            Some(queue) => queue.front().copied(),
            None => None,
        };
        Ok(scripted.unwrap_or_else(|| model.regs.get(&key).copied().unwrap_or(0)))
    }

    fn burst_read(&mut self, addr: u8, buffer: &mut [u8]) -> Result<(), MockBusError> {
        let mut model = self.0.lock().unwrap();
        let (chip, page) = (model.chip, model.page);
        buffer.fill(model.burst_fill);
        model.log.push(Access::Burst {
            chip,
            page,
            addr,
            len: buffer.len(),
        });
        Ok(())
    }
}

#[derive(Default)]
struct TunerModel {
    initialized: Vec<u8>,
    tuned: Vec<(u8, u32)>,
    failure: Option<TunerError>,
    gate: Option<(Arc<Barrier>, Arc<Barrier>)>,
}

/// RF tuner double recording every request
#[derive(Clone, Default)]
pub struct MockTuner(Arc<Mutex<TunerModel>>);

impl MockTuner {
    pub fn new() -> Self {
        Self::default()
    }

    /// Frequencies tuned, in order
    pub fn tuned(&self) -> Vec<u32> {
        self.0.lock().unwrap().tuned.iter().map(|&(_, f)| f).collect()
    }

    /// Chips initialized, in order
    pub fn initialized(&self) -> Vec<u8> {
        self.0.lock().unwrap().initialized.clone()
    }

    pub fn fail_with(&self, failure: Option<TunerError>) {
        self.0.lock().unwrap().failure = failure;
    }

    /// Make the next retune wait: it meets `entered`, then waits on
    /// `release`
    pub fn block_next_retune(&self, entered: Arc<Barrier>, release: Arc<Barrier>) {
        self.0.lock().unwrap().gate = Some((entered, release));
    }
}

impl RfTuner<MockBus> for MockTuner {
    fn initialize(&mut self, _bus: &mut MockBus, chip: ChipIndex) -> TdmbResult<(), MockBusError> {
        let mut model = self.0.lock().unwrap();
        model.initialized.push(chip.as_u8());
        match model.failure {
            Some(e) => Err(Error::Tuner(e)),
            None => Ok(()),
        }
    }

    fn set_frequency(
        &mut self,
        _bus: &mut MockBus,
        chip: ChipIndex,
        frequency_khz: u32,
    ) -> TdmbResult<(), MockBusError> {
        let (gate, failure) = {
            let mut model = self.0.lock().unwrap();
            model.tuned.push((chip.as_u8(), frequency_khz));
            (model.gate.take(), model.failure)
        };
        if let Some((entered, release)) = gate {
            entered.wait();
            release.wait();
        }
        match failure {
            Some(e) => Err(Error::Tuner(e)),
            None => Ok(()),
        }
    }
}

/// Delay double adding up the requested time
#[derive(Clone, Default)]
pub struct MockDelay(Arc<AtomicU64>);

impl MockDelay {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn total_ms(&self) -> u64 {
        self.0.load(Ordering::SeqCst) / 1_000_000
    }

    pub fn reset(&self) {
        self.0.store(0, Ordering::SeqCst);
    }
}

impl DelayNs for MockDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.0.fetch_add(u64::from(ns), Ordering::SeqCst);
    }

    fn delay_ms(&mut self, ms: u32) {
        self.0.fetch_add(u64::from(ms) * 1_000_000, Ordering::SeqCst);
    }
}

/// Driver plus handles onto its collaborators
pub struct Rig {
    pub tdmb: TestTdmb,
    pub bus: MockBus,
    pub tuner: MockTuner,
    pub delay: MockDelay,
}

pub fn rig(profile: HardwareProfile) -> Rig {
    let bus = MockBus::new();
    let tuner = MockTuner::new();
    let delay = MockDelay::new();
    let tdmb = Tdmb::new(profile, bus.clone(), tuner.clone(), delay.clone());
    Rig {
        tdmb,
        bus,
        tuner,
        delay,
    }
}

/// Script the master chip so a scan at 8 MHz ADC clock is detected on the
/// first fine check
pub fn script_detectable_ensemble(bus: &MockBus) {
    bus.script(Page::Ofdm, 0xCF, &[0x03]);
    // scan power 0x0A00 = 2560
    bus.script(Page::Comm, 0x38, &[0x00]);
    bus.script(Page::Comm, 0x39, &[0x0A]);
    // pre-AGC gain 0x80 << 2 = 512
    bus.script(Page::Ofdm, 0x66, &[0x00]);
    bus.script(Page::Ofdm, 0x67, &[0x80]);
    // mode I, null length 0x100
    bus.script(Page::Ofdm, 0x27, &[0x01]);
    bus.script(Page::Ofdm, 0x26, &[0x00]);
    bus.script(Page::Ofdm, 0x18, &[0x00]);
    bus.script(Page::Ofdm, 0x30, &[0x00]);
    bus.script(Page::Ofdm, 0x37, &[0x00]);
    bus.script(Page::Ofdm, 0x17, &[0x02]);
    bus.script(Page::Ofdm, 0x12, &[0x80]);
    bus.script(Page::Ofdm, 0x7E, &[0x20]);
    bus.script(Page::Ofdm, 0x7F, &[0x00]);
    bus.script(Page::Fec, 0xFB, &[0x03]);
}

/// Scripted pre-AGC gain (10 bits)
pub fn script_gain(bus: &MockBus, gain: u16) {
    bus.script(Page::Ofdm, 0x66, &[(gain & 0x03) as u8]);
    bus.script(Page::Ofdm, 0x67, &[(gain >> 2) as u8]);
}

/// Scripted scan power
pub fn script_power(bus: &MockBus, power: u16) {
    let [lo, hi] = power.to_le_bytes();
    bus.script(Page::Comm, 0x38, &[lo]);
    bus.script(Page::Comm, 0x39, &[hi]);
}
