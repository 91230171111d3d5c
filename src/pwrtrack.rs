//! Thermal TX power tracking.
//!
//! The RF thermal meter is sampled periodically; drift relative to the
//! factory reading moves the OFDM/CCK gain swing, retunes the crystal cap
//! and eventually forces a fresh IQ calibration. Swing movement beyond the
//! table limits spills into a TXAGC remnant the rate control adds back in.

use embedded_hal::delay::DelayNs;

use crate::bus::{RfPath, RtwBus};
use crate::phy::Rtw8723d;
use crate::rate::DescRate;
use crate::regs::*;
use crate::tables::{
    ofdm_swing_a, ofdm_swing_b, ofdm_swing_c, ofdm_swing_d, CCK_SWING_TABLE,
    DEF_CCK_SWING_INDEX, DEF_OFDM_SWING_INDEX, OFDM_SWING_TABLE, OFDM_SWING_TABLE_SIZE,
};
use crate::util::{bits_to_s32, q16_to_q8, q16_to_q9};

/// Swing ceiling for the current TX rate. Higher rates need more headroom
/// for their tighter EVM budget.
fn pwrtrack_limit_ofdm(tx_rate: DescRate) -> u8 {
    use DescRate::*;

    match tx_rate {
        Rate1M | Rate2M | Rate5_5M | Rate11M => 30,
        Rate6M | Rate9M | Rate12M | Rate18M | Rate24M | Rate36M | Rate48M => 36,
        Rate54M => 34,
        Mcs0 | Mcs1 | Mcs2 => 38,
        Mcs3 | Mcs4 => 36,
        Mcs5 | Mcs6 | Mcs7 => 34,
        Unknown(_) => 30,
    }
}

impl<B: RtwBus, D: DelayNs> Rtw8723d<B, D> {
    fn set_iqk_matrix_with_result(&mut self, ofdm_swing: u32, rf_path: RfPath) {
        let (mut iqk_result_x, mut iqk_result_y) = match rf_path {
            RfPath::A => (self.dm.iqk.result.s1_x, self.dm.iqk.result.s1_y),
            RfPath::B => (self.dm.iqk.result.s0_x, self.dm.iqk.result.s0_y),
        };

        let ele_d = ofdm_swing_d(ofdm_swing) as i32;
        // the D extension uses the raw 10-bit X, unlike A and C below
        let ele_d_ext = q16_to_q9(iqk_result_x * ele_d) & 0x1;

        iqk_result_x = bits_to_s32(iqk_result_x, 9, 0);
        let ele_a = q16_to_q8(iqk_result_x * ele_d) & 0x3ff;
        let ele_a_ext = q16_to_q9(iqk_result_x * ele_d) & 0x1;

        iqk_result_y = bits_to_s32(iqk_result_y, 9, 0);
        let ele_c = q16_to_q8(iqk_result_y * ele_d) & 0x3ff;
        let ele_c_ext = q16_to_q9(iqk_result_y * ele_d) & 0x1;

        match rf_path {
            RfPath::A => {
                // element B is always 0
                self.bus.write32(
                    REG_OFDM_0_XA_TX_IQ_IMBALANCE,
                    txiq_elm_acd(ele_a, ele_c, ele_d),
                );
                self.bus.write32_mask(
                    REG_TXIQK_MATRIXA_LSB2_11N,
                    MASKH4BITS,
                    txiq_elm_c1(ele_c),
                );
                let mut value32 = self.bus.read32(REG_OFDM_0_ECCA_THRESHOLD);
                value32 &= !BIT_MASK_OFDM0_EXTS;
                value32 |= ofdm0_exts(ele_a_ext, ele_c_ext, ele_d_ext);
                self.bus.write32(REG_OFDM_0_ECCA_THRESHOLD, value32);
            }
            RfPath::B => {
                self.bus
                    .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_D_S0, ele_d as u32);
                self.bus
                    .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_C_S0, ele_c as u32);
                self.bus
                    .write32_mask(REG_TXIQ_AB_S0, BIT_MASK_TXIQ_A_S0, ele_a as u32);

                self.bus.write32_mask(
                    REG_TXIQ_CD_S0,
                    BIT_MASK_TXIQ_D_EXT_S0,
                    ele_d_ext as u32,
                );
                self.bus.write32_mask(
                    REG_TXIQ_AB_S0,
                    BIT_MASK_TXIQ_A_EXT_S0,
                    ele_a_ext as u32,
                );
                self.bus.write32_mask(
                    REG_TXIQ_CD_S0,
                    BIT_MASK_TXIQ_C_EXT_S0,
                    ele_c_ext as u32,
                );
            }
        }
    }

    /// Program the OFDM swing at `ofdm_index`, folded with the calibrated IQ
    /// coefficients once a calibration has succeeded.
    fn set_iqk_matrix(&mut self, ofdm_index: i8, rf_path: RfPath) {
        let ofdm_index = (ofdm_index as i32).clamp(0, OFDM_SWING_TABLE_SIZE as i32 - 1);
        let ofdm_swing = OFDM_SWING_TABLE[ofdm_index as usize];

        if self.dm.iqk.done {
            self.set_iqk_matrix_with_result(ofdm_swing, rf_path);
            return;
        }

        match rf_path {
            RfPath::A => {
                self.bus.write32(REG_OFDM_0_XA_TX_IQ_IMBALANCE, ofdm_swing);
                self.bus
                    .write32_mask(REG_TXIQK_MATRIXA_LSB2_11N, MASKH4BITS, 0x00);
                let value32 = self.bus.read32(REG_OFDM_0_ECCA_THRESHOLD);
                self.bus
                    .write32(REG_OFDM_0_ECCA_THRESHOLD, value32 & !BIT_MASK_OFDM0_EXTS);
            }
            RfPath::B => {
                // image S1 swing fields into the S0 registers
                self.bus.write32_mask(
                    REG_TXIQ_AB_S0,
                    BIT_MASK_TXIQ_A_S0,
                    ofdm_swing_a(ofdm_swing),
                );
                self.bus.write32_mask(
                    REG_TXIQ_AB_S0,
                    BIT_MASK_TXIQ_B_S0,
                    ofdm_swing_b(ofdm_swing),
                );
                self.bus.write32_mask(
                    REG_TXIQ_CD_S0,
                    BIT_MASK_TXIQ_C_S0,
                    ofdm_swing_c(ofdm_swing),
                );
                self.bus.write32_mask(
                    REG_TXIQ_CD_S0,
                    BIT_MASK_TXIQ_D_S0,
                    ofdm_swing_d(ofdm_swing),
                );
                self.bus
                    .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_D_EXT_S0, 0x0);
                self.bus
                    .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_C_EXT_S0, 0x0);
                self.bus
                    .write32_mask(REG_TXIQ_AB_S0, BIT_MASK_TXIQ_A_EXT_S0, 0x0);
            }
        }
    }

    fn pwrtrack_set_ofdm_pwr(&mut self, swing_idx: i8, txagc_idx: i8) {
        self.dm.txagc_remnant_ofdm = txagc_idx;

        self.set_iqk_matrix(swing_idx, RfPath::A);
        self.set_iqk_matrix(swing_idx, RfPath::B);
    }

    fn pwrtrack_set_cck_pwr(&mut self, swing_idx: i8, txagc_idx: i8) {
        self.dm.txagc_remnant_cck = txagc_idx;

        self.bus.write32_mask(
            REG_CCK0_TX_FILTER2,
            BIT_MASK_CCK_SWING,
            CCK_SWING_TABLE[swing_idx as usize],
        );
    }

    fn pwrtrack_set(&mut self, path: usize) {
        let limit_ofdm = pwrtrack_limit_ofdm(self.dm.tx_rate) as i8;
        let limit_cck: i8 = 40;

        let final_ofdm_swing_index = DEF_OFDM_SWING_INDEX as i8 + self.dm.delta_power_index[path];
        let final_cck_swing_index = DEF_CCK_SWING_INDEX as i8 + self.dm.delta_power_index[path];

        if final_ofdm_swing_index > limit_ofdm {
            self.pwrtrack_set_ofdm_pwr(limit_ofdm, final_ofdm_swing_index - limit_ofdm);
        } else if final_ofdm_swing_index < 0 {
            self.pwrtrack_set_ofdm_pwr(0, final_ofdm_swing_index);
        } else {
            self.pwrtrack_set_ofdm_pwr(final_ofdm_swing_index, 0);
        }

        if final_cck_swing_index > limit_cck {
            self.pwrtrack_set_cck_pwr(limit_cck, final_cck_swing_index - limit_cck);
        } else if final_cck_swing_index < 0 {
            self.pwrtrack_set_cck_pwr(0, final_cck_swing_index);
        } else {
            self.pwrtrack_set_cck_pwr(final_cck_swing_index, 0);
        }

        self.set_tx_power_index();
    }

    fn pwrtrack_set_xtal(&mut self, therm_path: RfPath, delta: u8) {
        let tbl = self.chip.pwr_track_tbl;
        let idx = therm_path.index();

        let pwrtrk_xtal = if self.dm.thermal_avg[idx] > self.efuse.thermal_meter[idx] {
            tbl.pwrtrk_xtal_p
        } else {
            tbl.pwrtrk_xtal_n
        };

        let xtal_cap = (self.efuse.crystal_cap & 0x3f) as i8;
        let xtal_cap = (xtal_cap + pwrtrk_xtal[delta as usize]).clamp(0, 0x3f) as u32;
        self.bus
            .write32_mask(REG_AFE_CTRL3, BIT_MASK_XTAL, xtal_cap | (xtal_cap << 6));
    }

    fn phy_pwrtrack(&mut self) {
        let swing_table = self.config_swing_table();

        if self.efuse.thermal_meter[0] == 0xff {
            return;
        }

        let thermal_value = self.bus.read_rf(RfPath::A, RF_T_METER, 0xfc00) as u8;

        self.pwrtrack_avg(thermal_value, RfPath::A);

        let do_iqk = self.pwrtrack_need_iqk();

        if do_iqk {
            self.lck();
        }

        let track = if self.dm.pwrtrack_initial_trigger {
            self.dm.pwrtrack_initial_trigger = false;
            true
        } else {
            self.pwrtrack_thermal_changed(thermal_value, RfPath::A)
        };

        if track {
            let delta = self.pwrtrack_get_delta(RfPath::A);

            for path in 0..self.chip.rf_path_num {
                let pwr_idx = self.pwrtrack_get_pwridx(&swing_table, path, RfPath::A, delta);
                if pwr_idx == self.dm.delta_power_index_last[path] {
                    continue;
                }
                self.dm.delta_power_index[path] = pwr_idx;
                self.dm.delta_power_index_last[path] = pwr_idx;
                self.pwrtrack_set(path);
            }

            self.pwrtrack_set_xtal(RfPath::A, delta);
        }

        if do_iqk {
            self.phy_calibration();
        }
    }

    /// Power-tracking tick, to be called from the periodic watchdog.
    ///
    /// Works in two phases: the first call arms the thermal meter, the next
    /// one reads it back and applies compensation. Chips fuse-marked for a
    /// different tracking scheme are left alone.
    pub fn pwrtrack_check(&mut self) {
        if self.efuse.power_track_type != 0 {
            return;
        }

        if !self.dm.pwrtrack_trigger {
            self.bus
                .write_rf(RfPath::A, RF_T_METER, 0x0003_0000, 0x03);
            self.dm.pwrtrack_trigger = true;
            return;
        }

        self.phy_pwrtrack();
        self.dm.pwrtrack_trigger = false;
    }
}
