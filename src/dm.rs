//! Persistent dynamic-mechanism state.
//!
//! Everything the tracking loops carry between invocations lives here, so
//! that a calibration cycle can compare against what the previous cycle
//! applied.

use crate::bus::RfPath;
use crate::rate::DescRate;

/// Factory calibration data relevant to this layer, already parsed out of
/// the efuse map by the host.
#[derive(Clone, Copy, Debug)]
pub struct Efuse {
    /// Reference thermal meter reading per path. 0xFF means the factory
    /// never calibrated it and thermal tracking must stay off.
    pub thermal_meter: [u8; 2],
    pub thermal_meter_k: u8,
    pub crystal_cap: u8,
    pub afe: u8,
    /// Non-zero selects a tracking scheme this chip does not implement.
    pub power_track_type: u8,
}

impl Default for Efuse {
    fn default() -> Self {
        Self {
            thermal_meter: [0xff; 2],
            thermal_meter_k: 0xff,
            crystal_cap: 0x20,
            afe: 0,
            power_track_type: 0,
        }
    }
}

/// Exponentially weighted moving average of the thermal meter, fixed point
/// with 10 fractional bits and a weight of 4.
#[derive(Clone, Copy, Debug, Default)]
pub struct EwmaThermal {
    internal: u32,
}

impl EwmaThermal {
    const PRECISION: u32 = 10;
    const WEIGHT_SHIFT: u32 = 2;

    pub fn init(&mut self) {
        self.internal = 0;
    }

    pub fn add(&mut self, val: u8) {
        let scaled = (val as u32) << Self::PRECISION;
        self.internal = if self.internal == 0 {
            scaled
        } else {
            (((self.internal << Self::WEIGHT_SHIFT) - self.internal) + scaled)
                >> Self::WEIGHT_SHIFT
        };
    }

    pub fn read(&self) -> u8 {
        (self.internal >> Self::PRECISION) as u8
    }
}

/// Raw TX-side IQ coefficients of the round that won calibration.
#[derive(Clone, Copy, Debug, Default)]
pub struct IqkResult {
    pub s1_x: i32,
    pub s1_y: i32,
    pub s0_x: i32,
    pub s0_y: i32,
}

#[derive(Clone, Copy, Debug, Default)]
pub struct IqkState {
    pub result: IqkResult,
    /// Set once a calibration produced a usable coefficient set. Until
    /// then the swing values are written uncorrected.
    pub done: bool,
}

/// Dynamic-mechanism bookkeeping, one instance per device.
#[derive(Clone, Debug, Default)]
pub struct DmInfo {
    pub iqk: IqkState,

    pub delta_power_index: [i8; 2],
    pub delta_power_index_last: [i8; 2],
    pub default_ofdm_index: u8,
    pub txagc_remnant_ofdm: i8,
    pub txagc_remnant_cck: i8,

    pub avg_thermal: [EwmaThermal; 2],
    pub thermal_avg: [u8; 2],
    /// Thermal reading at the time of the last IQ calibration.
    pub thermal_meter_k: u8,
    pub pwrtrack_trigger: bool,
    pub pwrtrack_initial_trigger: bool,

    pub tx_rate: DescRate,
    pub curr_rx_rate: DescRate,
    pub rssi: [u8; 2],
    pub rx_snr: [u8; 2],
    pub cfo_tail: [i8; 2],
    pub rx_evm_dbm: [u8; 2],

    pub cck_fa_cnt: u32,
    pub ofdm_fa_cnt: u32,
    pub total_fa_cnt: u32,
    pub cck_cca_cnt: u32,
    pub ofdm_cca_cnt: u32,
    pub total_cca_cnt: u32,
    pub cck_err_cnt: u32,
    pub cck_ok_cnt: u32,
    pub ofdm_err_cnt: u32,
    pub ofdm_ok_cnt: u32,
    pub ht_err_cnt: u32,
    pub ht_ok_cnt: u32,
}

impl DmInfo {
    pub fn rssi(&self, path: RfPath) -> u8 {
        self.rssi[path.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ewma_first_sample_is_exact() {
        let mut avg = EwmaThermal::default();
        avg.add(25);
        assert_eq!(avg.read(), 25);
    }

    #[test]
    fn ewma_converges_with_weight_four() {
        let mut avg = EwmaThermal::default();
        avg.add(20);
        // One step towards a higher reading moves a quarter of the way.
        avg.add(28);
        assert_eq!(avg.read(), 22);
        for _ in 0..16 {
            avg.add(28);
        }
        assert_eq!(avg.read(), 27);
    }

    #[test]
    fn ewma_init_resets_history() {
        let mut avg = EwmaThermal::default();
        avg.add(40);
        avg.add(40);
        avg.init();
        avg.add(10);
        assert_eq!(avg.read(), 10);
    }
}
