//! Register access shim.
//!
//! The chip sits behind whatever host bus the platform provides (SDIO, USB or
//! PCIe glue), so every register touch goes through [`RtwBus`]. Only the six
//! primitive accessors plus the RF SIPI pair have to be supplied; the masked
//! and set/clear forms are derived.

use embedded_hal::delay::DelayNs;

/// RF chain selector. The 8723D is 1T1R, but calibration drives the shared
/// S0 circuitry through the second path index as well.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RfPath {
    A,
    B,
}

impl RfPath {
    pub const fn index(self) -> usize {
        match self {
            RfPath::A => 0,
            RfPath::B => 1,
        }
    }
}

/// Blocking register access to the chip.
///
/// MAC registers are byte addressed with 8/16/32-bit views, RF sub-registers
/// are 20 bits wide and always accessed with an explicit bitmask. Accesses
/// are infallible; a wedged bus is the platform's problem, not this layer's.
pub trait RtwBus {
    fn read8(&mut self, addr: u32) -> u8;
    fn read16(&mut self, addr: u32) -> u16;
    fn read32(&mut self, addr: u32) -> u32;
    fn write8(&mut self, addr: u32, val: u8);
    fn write16(&mut self, addr: u32, val: u16);
    fn write32(&mut self, addr: u32, val: u32);

    /// Read the masked field of a 20-bit RF sub-register, shifted down.
    fn read_rf(&mut self, path: RfPath, addr: u32, mask: u32) -> u32;
    /// Write the masked field of a 20-bit RF sub-register.
    fn write_rf(&mut self, path: RfPath, addr: u32, mask: u32, val: u32);

    fn read32_mask(&mut self, addr: u32, mask: u32) -> u32 {
        (self.read32(addr) & mask) >> mask.trailing_zeros()
    }

    fn write32_mask(&mut self, addr: u32, mask: u32, val: u32) {
        let shift = mask.trailing_zeros();
        let orig = self.read32(addr);
        self.write32(addr, (orig & !mask) | ((val << shift) & mask));
    }

    fn write8_set(&mut self, addr: u32, bits: u8) {
        let orig = self.read8(addr);
        self.write8(addr, orig | bits);
    }

    fn write8_clr(&mut self, addr: u32, bits: u8) {
        let orig = self.read8(addr);
        self.write8(addr, orig & !bits);
    }

    fn write8_mask(&mut self, addr: u32, mask: u8, val: u8) {
        let shift = mask.trailing_zeros();
        let orig = self.read8(addr);
        self.write8(addr, (orig & !mask) | ((val << shift) & mask));
    }

    fn write16_set(&mut self, addr: u32, bits: u16) {
        let orig = self.read16(addr);
        self.write16(addr, orig | bits);
    }

    fn write16_clr(&mut self, addr: u32, bits: u16) {
        let orig = self.read16(addr);
        self.write16(addr, orig & !bits);
    }

    fn write32_set(&mut self, addr: u32, bits: u32) {
        let orig = self.read32(addr);
        self.write32(addr, orig | bits);
    }

    fn write32_clr(&mut self, addr: u32, bits: u32) {
        let orig = self.read32(addr);
        self.write32(addr, orig & !bits);
    }
}

pub(crate) const POLL_RETRY: u32 = 20;

/// Poll a masked register field until it reads `target`, with 1 ms backoff.
pub(crate) fn check_hw_ready<B: RtwBus, D: DelayNs>(
    bus: &mut B,
    delay: &mut D,
    addr: u32,
    mask: u32,
    target: u32,
) -> bool {
    for _ in 0..POLL_RETRY {
        if bus.read32_mask(addr, mask) == target {
            return true;
        }
        delay.delay_ms(1);
    }
    false
}

#[cfg(test)]
pub(crate) mod mock {
    use super::*;
    use crate::regs;
    use std::collections::HashMap;
    use std::vec::Vec;

    /// A single bus mutation, in issue order.
    #[derive(Clone, Debug, PartialEq, Eq)]
    pub enum Access {
        W8(u32, u8),
        W16(u32, u16),
        W32(u32, u32),
        Rf(RfPath, u32, u32, u32),
    }

    /// Scripted register values for one calibration round, loaded into the
    /// IQK result registers every time the one-shot trigger fires.
    #[derive(Clone, Copy, Debug, Default)]
    pub struct IqkRoundScript {
        pub tx_x: u32,
        pub tx_y: u32,
        pub rx_x: u32,
        pub rx_y: u32,
        pub tx_fail: bool,
        pub rx_fail: bool,
    }

    /// In-memory register file standing in for the chip.
    ///
    /// MAC/BB space is modeled as little-endian byte storage so that mixed
    /// width accesses to the same address overlay the way hardware does.
    #[derive(Default)]
    pub struct MockBus {
        mem: HashMap<u32, u8>,
        rf: HashMap<(usize, u32), u32>,
        pub writes: Vec<Access>,
        pub iqk_rounds: Vec<IqkRoundScript>,
        pub one_shots: usize,
        rounds_started: usize,
    }

    impl MockBus {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn preload32(&mut self, addr: u32, val: u32) {
            for (i, b) in val.to_le_bytes().iter().enumerate() {
                self.mem.insert(addr + i as u32, *b);
            }
        }

        pub fn preload_rf(&mut self, path: RfPath, addr: u32, val: u32) {
            self.rf.insert((path.index(), addr), val & regs::RFREG_MASK);
        }

        pub fn peek32(&mut self, addr: u32) -> u32 {
            self.read32_silent(addr)
        }

        pub fn peek_rf(&self, path: RfPath, addr: u32) -> u32 {
            *self.rf.get(&(path.index(), addr)).unwrap_or(&0)
        }

        /// All raw 32-bit writes to `addr`, in order.
        pub fn writes32_to(&self, addr: u32) -> Vec<u32> {
            self.writes
                .iter()
                .filter_map(|w| match w {
                    Access::W32(a, v) if *a == addr => Some(*v),
                    _ => None,
                })
                .collect()
        }

        fn read32_silent(&mut self, addr: u32) -> u32 {
            let mut bytes = [0u8; 4];
            for (i, b) in bytes.iter_mut().enumerate() {
                *b = *self.mem.get(&(addr + i as u32)).unwrap_or(&0);
            }
            u32::from_le_bytes(bytes)
        }

        fn store32(&mut self, addr: u32, val: u32) {
            for (i, b) in val.to_le_bytes().iter().enumerate() {
                self.mem.insert(addr + i as u32, *b);
            }
        }

        /// Trigger writes to the AGC point-select register publish the
        /// scripted measurement for the current round into the result
        /// registers. Rounds are delimited by the per-round RX path
        /// preamble write, so retries within a round keep the same script.
        fn maybe_run_one_shot(&mut self, addr: u32, val: u32) {
            if addr == regs::REG_BB_RX_PATH_11N && val == 0x03a0_5611 {
                self.rounds_started += 1;
                return;
            }
            if addr != regs::REG_IQK_AGC_PTS_11N || val != 0xf800_0000 {
                return;
            }
            self.one_shots += 1;
            let round = self.rounds_started.saturating_sub(1);
            let Some(script) = self.iqk_rounds.get(round).copied() else {
                return;
            };
            let mut ry = regs::BIT_IQK_DONE | ((script.rx_y & 0x3ff) << 16);
            if script.tx_fail {
                ry |= regs::BIT_IQK_TX_FAIL;
            }
            if script.rx_fail {
                ry |= regs::BIT_IQK_RX_FAIL;
            }
            self.store32(regs::REG_IQK_RES_TX, (script.tx_x & 0x3ff) << 16);
            self.store32(regs::REG_IQK_RES_TY, (script.tx_y & 0x3ff) << 16);
            self.store32(regs::REG_IQK_RES_RX, (script.rx_x & 0x3ff) << 16);
            self.store32(regs::REG_IQK_RES_RY, ry);
        }
    }

    impl RtwBus for MockBus {
        fn read8(&mut self, addr: u32) -> u8 {
            *self.mem.get(&addr).unwrap_or(&0)
        }

        fn read16(&mut self, addr: u32) -> u16 {
            u16::from_le_bytes([self.read8(addr), self.read8(addr + 1)])
        }

        fn read32(&mut self, addr: u32) -> u32 {
            self.read32_silent(addr)
        }

        fn write8(&mut self, addr: u32, val: u8) {
            self.writes.push(Access::W8(addr, val));
            self.mem.insert(addr, val);
        }

        fn write16(&mut self, addr: u32, val: u16) {
            self.writes.push(Access::W16(addr, val));
            for (i, b) in val.to_le_bytes().iter().enumerate() {
                self.mem.insert(addr + i as u32, *b);
            }
        }

        fn write32(&mut self, addr: u32, val: u32) {
            self.writes.push(Access::W32(addr, val));
            self.store32(addr, val);
            self.maybe_run_one_shot(addr, val);
        }

        fn read_rf(&mut self, path: RfPath, addr: u32, mask: u32) -> u32 {
            let raw = *self.rf.get(&(path.index(), addr)).unwrap_or(&0);
            (raw & mask) >> mask.trailing_zeros()
        }

        fn write_rf(&mut self, path: RfPath, addr: u32, mask: u32, val: u32) {
            self.writes.push(Access::Rf(path, addr, mask, val));
            let shift = mask.trailing_zeros();
            let entry = self.rf.entry((path.index(), addr)).or_insert(0);
            *entry = ((*entry & !mask) | ((val << shift) & mask)) & regs::RFREG_MASK;
        }
    }

    /// Delay provider that burns no time; the mock has no timing to wait out.
    pub struct NoDelay;

    impl DelayNs for NoDelay {
        fn delay_ns(&mut self, _ns: u32) {}
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn masked_write_preserves_other_bits() {
            let mut bus = MockBus::new();
            bus.preload32(0x0c50, 0xdead_be7f);
            bus.write32_mask(0x0c50, 0x0000_00ff, 0x20);
            assert_eq!(bus.peek32(0x0c50), 0xdead_be20);
        }

        #[test]
        fn masked_read_shifts_field_down() {
            let mut bus = MockBus::new();
            bus.preload32(0x0e94, 0x0123_0000);
            assert_eq!(bus.read32_mask(0x0e94, 0x03ff_0000), 0x123);
        }

        #[test]
        fn rf_write_is_confined_to_mask_and_20_bits() {
            let mut bus = MockBus::new();
            bus.preload_rf(RfPath::A, 0x18, 0xf_ffff);
            bus.write_rf(RfPath::A, 0x18, 0x0000_7c00, 3);
            assert_eq!(bus.peek_rf(RfPath::A, 0x18), 0xf_ffff & !0x7c00 | (3 << 10));
            assert_eq!(bus.read_rf(RfPath::A, 0x18, 0x0000_7c00), 3);
        }

        #[test]
        fn mixed_width_accesses_overlay() {
            let mut bus = MockBus::new();
            bus.write32(0x0100, 0x1122_3344);
            bus.write8(0x0101, 0xaa);
            assert_eq!(bus.read32(0x0100), 0x1122_aa44);
            assert_eq!(bus.read16(0x0102), 0x1122);
        }
    }
}
