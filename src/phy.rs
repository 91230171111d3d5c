//! Device handle, PHY bring-up and channel management.

use embedded_hal::delay::DelayNs;

use crate::bus::{RfPath, RtwBus};
use crate::dm::{DmInfo, Efuse};
use crate::rate::{DescRate, DESC_RATE_NUM};
use crate::regs::*;
use crate::tables::{
    self, ChipInfo, SwingTable, CCK_DFIR_CFG, DEF_OFDM_SWING_INDEX, PWRTRACK_TBL_SIZE,
    RATE_SECTIONS, TXAGC,
};
use crate::{ChannelWidth, PrimaryChannel, RtwError};

const WLAN_TXQ_RPT_EN: u8 = 0x1f;
const WLAN_SLOT_TIME: u8 = 0x09;
const WLAN_RL_VAL: u16 = 0x3030;
const WLAN_BAR_VAL: u32 = 0x0201ffff;
const WLAN_TBTT_TIME_STOP_BCN: u32 = 0x6404;
const BIT_MASK_TBTT: u32 = 0x000f_ffff;
const WLAN_PIFS_VAL: u8 = 0;
const WLAN_AGG_BRK_TIME: u8 = 0x16;
const WLAN_NAV_PROT_LEN: u16 = 0x0040;
const WLAN_SPEC_SIFS: u16 = 0x100a;
const WLAN_RX_PKT_LIMIT: u8 = 0x17;
const WLAN_MAX_AGG_NR: u8 = 0x0a;
const WLAN_AMPDU_MAX_TIME: u8 = 0x1c;
const WLAN_ANT_SEL: u8 = 0x82;
const WLAN_LTR_IDLE_LAT: u32 = 0x883c883c;
const WLAN_LTR_ACT_LAT: u32 = 0x880b880b;
const WLAN_LTR_CTRL1: u32 = 0xcb004010;
const WLAN_LTR_CTRL2: u32 = 0x01233425;

const BIT_TCR_CFG: u32 = BIT_CFENDFORM | BIT_WMAC_TCR_ERR0 | BIT_WMAC_TCR_ERR1;
const WLAN_RX_FILTER0: u16 = 0xffff;
const WLAN_RX_FILTER1: u16 = 0x400;
const WLAN_RX_FILTER2: u16 = 0xffff;
const WLAN_RCR_CFG: u32 = 0x700060ce;

/// The RTL8723D calibration and bring-up layer.
///
/// Owns the bus handle, the delay provider and all tracking state. All
/// operations are blocking; the longest (`phy_calibration`) stalls in the
/// tens of milliseconds.
pub struct Rtw8723d<B, D> {
    pub(crate) bus: B,
    pub(crate) delay: D,
    pub(crate) chip: &'static ChipInfo,
    pub efuse: Efuse,
    pub dm: DmInfo,
    pub(crate) current_channel: u8,
    /// Power index per path and rate, programmed by [`Self::set_tx_power_index`].
    pub tx_pwr_tbl: [[u8; DESC_RATE_NUM]; 2],
}

impl<B: RtwBus, D: DelayNs> Rtw8723d<B, D> {
    pub fn new(bus: B, delay: D, efuse: Efuse) -> Self {
        Self {
            bus,
            delay,
            chip: &tables::RTW8723D,
            efuse,
            dm: DmInfo::default(),
            current_channel: 1,
            tx_pwr_tbl: [[0; DESC_RATE_NUM]; 2],
        }
    }

    /// Give the bus and delay provider back, dropping all tracking state.
    pub fn release(self) -> (B, D) {
        (self.bus, self.delay)
    }

    /// Full PHY parameter bring-up, to run once after power-on and firmware
    /// init. Leaves the chip with a calibrated LC tank, a kicked AGC and
    /// armed power-tracking state.
    pub fn phy_set_param(&mut self) {
        // power on BB/RF domain
        self.bus.write16_set(
            REG_SYS_FUNC_EN,
            BIT_FEN_EN_25_1 | BIT_FEN_BB_GLB_RST | BIT_FEN_BB_RSTB,
        );
        self.bus
            .write8_set(REG_RF_CTRL, BIT_RF_EN | BIT_RF_RSTB | BIT_RF_SDM_RSTB);
        self.bus.write8(REG_AFE_CTRL1 + 1, 0x80);

        self.bus.write32_clr(REG_RCR, BIT_RCR_ADF);
        self.bus
            .write8_set(REG_HIQ_NO_LMT_EN, BIT_HIQ_NO_LMT_EN_ROOT);
        self.bus
            .write16_set(REG_AFE_CTRL_4, BIT_CK320M_AFE_EN | BIT_EN_SYN);

        let xtal_cap = (self.efuse.crystal_cap & 0x3f) as u32;
        self.bus
            .write32_mask(REG_AFE_CTRL3, BIT_MASK_XTAL, xtal_cap | (xtal_cap << 6));
        self.bus.write32_set(REG_FPGA0_RFMOD, BIT_CCKEN | BIT_OFDMEN);
        if (self.efuse.afe >> 4) == 14 {
            self.bus.write32_set(REG_AFE_CTRL3, BIT_XTAL_GMP_BIT4);
            self.bus.write32_clr(REG_AFE_CTRL1, BITS_PLL);
            self.bus.write32_set(REG_LDO_SWR_CTRL, BIT_XTA1);
            self.bus.write32_clr(REG_LDO_SWR_CTRL, BIT_XTA0);
        }

        self.bus.write8(REG_SLOT, WLAN_SLOT_TIME);
        self.bus.write8(REG_FWHW_TXQ_CTRL + 1, WLAN_TXQ_RPT_EN);
        self.bus.write16(REG_RETRY_LIMIT, WLAN_RL_VAL);
        self.bus.write32(REG_BAR_MODE_CTRL, WLAN_BAR_VAL);
        self.bus.write8(REG_ATIMWND, 0x2);
        self.bus.write8(
            REG_BCN_CTRL,
            BIT_DIS_TSF_UDT | BIT_EN_BCN_FUNCTION | BIT_EN_TXBCN_RPT,
        );
        let mut val32 = self.bus.read32(REG_TBTT_PROHIBIT);
        val32 &= !BIT_MASK_TBTT;
        val32 |= WLAN_TBTT_TIME_STOP_BCN;
        self.bus.write8(REG_TBTT_PROHIBIT, val32 as u8);
        self.bus.write8(REG_PIFS, WLAN_PIFS_VAL);
        self.bus.write8(REG_AGGR_BREAK_TIME, WLAN_AGG_BRK_TIME);
        self.bus.write16(REG_NAV_PROT_LEN, WLAN_NAV_PROT_LEN);
        self.bus.write16(REG_MAC_SPEC_SIFS, WLAN_SPEC_SIFS);
        self.bus.write16(REG_SIFS, WLAN_SPEC_SIFS);
        self.bus.write16(REG_SIFS + 2, WLAN_SPEC_SIFS);
        self.bus
            .write8(REG_SINGLE_AMPDU_CTRL, BIT_EN_SINGLE_APMDU);
        self.bus.write8(REG_RX_PKT_LIMIT, WLAN_RX_PKT_LIMIT);
        self.bus.write8(REG_MAX_AGGR_NUM, WLAN_MAX_AGG_NR);
        self.bus.write8(REG_AMPDU_MAX_TIME, WLAN_AMPDU_MAX_TIME);
        self.bus.write8(REG_LEDCFG2, WLAN_ANT_SEL);

        self.bus.write32(REG_LTR_IDLE_LATENCY, WLAN_LTR_IDLE_LAT);
        self.bus.write32(REG_LTR_ACTIVE_LATENCY, WLAN_LTR_ACT_LAT);
        self.bus.write32(REG_LTR_CTRL_BASIC, WLAN_LTR_CTRL1);
        self.bus.write32(REG_LTR_CTRL_BASIC + 4, WLAN_LTR_CTRL2);

        self.bus
            .write16_set(REG_TXDMA_OFFSET_CHK, BIT_DROP_DATA_EN);

        self.lck();

        // kick the AGC once
        self.bus.write32_mask(REG_OFDM0_XAAGC1, MASKBYTE0, 0x50);
        self.bus.write32_mask(REG_OFDM0_XAAGC1, MASKBYTE0, 0x20);

        self.pwrtrack_init();
    }

    pub fn mac_init(&mut self) {
        self.bus.write8(REG_FWHW_TXQ_CTRL + 1, WLAN_TXQ_RPT_EN);
        self.bus.write32(REG_TCR, BIT_TCR_CFG);

        self.bus.write16(REG_RXFLTMAP0, WLAN_RX_FILTER0);
        self.bus.write16(REG_RXFLTMAP1, WLAN_RX_FILTER1);
        self.bus.write16(REG_RXFLTMAP2, WLAN_RX_FILTER2);
        self.bus.write32(REG_RCR, WLAN_RCR_CFG);

        self.bus.write32(REG_INT_MIG, 0);
        self.bus.write32(REG_MCUTST_1, 0);

        self.bus.write8(REG_MISC_CTRL, BIT_DIS_SECOND_CCA);
        self.bus.write8(REG_2ND_CCA_CTRL, 0);
    }

    pub fn mac_init_system_cfg(&mut self) {
        self.bus.write8(REG_CR, 0xff);
        self.delay.delay_ms(2);
        self.bus.write8(REG_HWSEQ_CTRL, 0x7f);
        self.delay.delay_ms(2);

        self.bus.write8_set(REG_SYS_CLKR, BIT_WAKEPAD_EN as u8);
        self.bus.write16_clr(REG_GPIO_MUXCFG, BIT_EN_SIC);

        self.bus.write16(REG_CR, 0x2ff);
    }

    pub fn shutdown(&mut self) {
        self.bus.write16_set(REG_HCI_OPT_CTRL, BIT_USB_SUS_DIS);
    }

    pub fn cfg_ldo25(&mut self, enable: bool) {
        let mut ldo_pwr = self.bus.read8(REG_LDO_EFUSE_CTRL + 3);
        if enable {
            ldo_pwr = (BIT_LDO25_VOLTAGE_V25 << 4) | BIT_LDO25_EN;
        } else {
            ldo_pwr &= !BIT_LDO25_EN;
        }
        self.bus.write8(REG_LDO_EFUSE_CTRL + 3, ldo_pwr);
    }

    pub fn efuse_en(&mut self, enable: bool) {
        if enable {
            self.bus.write8(REG_EFUSE_ACCESS, EFUSE_ACCESS_ON);
            self.bus.write16_set(REG_SYS_FUNC_EN, BIT_FEN_ELDR);
            self.bus
                .write16_set(REG_SYS_CLKR, BIT_LOADER_CLK_EN | BIT_ANA8M);
        } else {
            self.bus.write8(REG_EFUSE_ACCESS, EFUSE_ACCESS_OFF);
        }
    }

    /// LC tank calibration. TX is paused (or the CTX type cleared) for the
    /// duration so the synthesizer settles on a clean carrier.
    pub fn lck(&mut self) {
        let val_ctx = self.bus.read8(REG_CTX);
        if val_ctx & BIT_MASK_CTX_TYPE != 0 {
            self.bus.write8(REG_CTX, val_ctx & !BIT_MASK_CTX_TYPE);
        } else {
            self.bus.write8(REG_TXPAUSE, 0xff);
        }
        let lc_cal = self.bus.read_rf(RfPath::A, RF_CFGCH, RFREG_MASK);

        self.bus
            .write_rf(RfPath::A, RF_CFGCH, RFREG_MASK, lc_cal | BIT_LCK);
        for _ in 0..100 {
            if self.bus.read_rf(RfPath::A, RF_CFGCH, BIT_LCK) != 0x1 {
                break;
            }
            self.delay.delay_ms(10);
        }

        self.bus.write_rf(RfPath::A, RF_CFGCH, RFREG_MASK, lc_cal);
        if val_ctx & BIT_MASK_CTX_TYPE != 0 {
            self.bus.write8(REG_CTX, val_ctx);
        } else {
            self.bus.write8(REG_TXPAUSE, 0x00);
        }
    }

    /// Switch to a 2.4 GHz channel. Retunes both RF paths, reconfigures the
    /// baseband filters for the bandwidth and runs the CCK spur check on
    /// channels 13/14.
    pub fn set_channel(
        &mut self,
        channel: u8,
        bw: ChannelWidth,
        primary: PrimaryChannel,
    ) -> Result<(), RtwError> {
        if channel == 0 || channel > 14 {
            return Err(RtwError::UnsupportedChannel);
        }

        self.set_channel_rf(channel, bw);
        self.set_channel_bb(channel, bw, primary);
        self.current_channel = channel;
        debug!("switched to channel {} ({} MHz wide)", channel, match bw {
            ChannelWidth::Width20 => 20,
            ChannelWidth::Width40 => 40,
        });
        Ok(())
    }

    fn set_channel_rf(&mut self, channel: u8, bw: ChannelWidth) {
        const RFCFGCH_CHANNEL_MASK: u32 = 0xff;
        const RFCFGCH_BW_MASK: u32 = (1 << 11) | (1 << 10);
        const RFCFGCH_BW_20M: u32 = (1 << 11) | (1 << 10);
        const RFCFGCH_BW_40M: u32 = 1 << 10;

        let mut rf_cfgch = [
            self.bus.read_rf(RfPath::A, RF_CFGCH, RFREG_MASK),
            self.bus.read_rf(RfPath::B, RF_CFGCH, RFREG_MASK),
        ];

        for cfgch in rf_cfgch.iter_mut() {
            *cfgch &= !RFCFGCH_CHANNEL_MASK;
            *cfgch |= channel as u32 & RFCFGCH_CHANNEL_MASK;
        }

        rf_cfgch[0] &= !RFCFGCH_BW_MASK;
        rf_cfgch[0] |= match bw {
            ChannelWidth::Width20 => RFCFGCH_BW_20M,
            ChannelWidth::Width40 => RFCFGCH_BW_40M,
        };

        self.bus
            .write_rf(RfPath::A, RF_CFGCH, RFREG_MASK, rf_cfgch[0]);
        self.bus
            .write_rf(RfPath::B, RF_CFGCH, RFREG_MASK, rf_cfgch[1]);

        self.spur_cal(channel);
    }

    fn set_channel_bb(&mut self, channel: u8, bw: ChannelWidth, primary: PrimaryChannel) {
        let cck_dfir = if channel <= 13 {
            &CCK_DFIR_CFG[0]
        } else {
            &CCK_DFIR_CFG[1]
        };
        for cfg in cck_dfir {
            self.bus.write32(cfg.reg, cfg.val);
        }

        match bw {
            ChannelWidth::Width20 => {
                self.bus.write32_mask(REG_FPGA0_RFMOD, BIT_MASK_RFMOD, 0x0);
                self.bus.write32_mask(REG_FPGA1_RFMOD, BIT_MASK_RFMOD, 0x0);
                self.bus.write32_mask(REG_BBRX_DFIR, BIT_RXBB_DFIR_EN, 1);
                self.bus.write32_mask(REG_BBRX_DFIR, BIT_MASK_RXBB_DFIR, 0xa);
            }
            ChannelWidth::Width40 => {
                self.bus.write32_mask(REG_FPGA0_RFMOD, BIT_MASK_RFMOD, 0x1);
                self.bus.write32_mask(REG_FPGA1_RFMOD, BIT_MASK_RFMOD, 0x1);
                self.bus.write32_mask(REG_BBRX_DFIR, BIT_RXBB_DFIR_EN, 0);
                self.bus.write32_mask(
                    REG_CCK0_SYS,
                    BIT_CCK_SIDE_BAND,
                    (primary == PrimaryChannel::Upper) as u32,
                );
            }
        }
    }

    fn spur_cal(&mut self, channel: u8) {
        const SPUR_THRES: u32 = 0x16;
        let notch = channel >= 13 && self.check_spur_ov_thres(channel, SPUR_THRES);
        self.cfg_notch(channel, notch);
    }

    /// Probe the PSD at the CCK spur frequency of channel 13/14 and report
    /// whether it crosses `thres`.
    fn check_spur_ov_thres(&mut self, channel: u8, thres: u32) -> bool {
        const DIS_3WIRE: u32 = 0xccf000c0;
        const EN_3WIRE: u32 = 0xccc000c0;
        const START_PSD: u32 = 0x400000;
        const FREQ_CH13: u32 = 0xfccd;
        const FREQ_CH14: u32 = 0xff9a;

        let freq = match channel {
            13 => FREQ_CH13,
            14 => FREQ_CH14,
            _ => return false,
        };

        self.bus.write32(REG_ANALOG_P4, DIS_3WIRE);
        self.bus.write32(REG_PSDFN, freq);
        self.bus.write32(REG_PSDFN, START_PSD | freq);

        self.delay.delay_ms(30);
        let over = self.bus.read32(REG_PSDRPT) >= thres;
        if over {
            debug!("spur over threshold on channel {}", channel);
        }

        self.bus.write32(REG_PSDFN, freq);
        self.bus.write32(REG_ANALOG_P4, EN_3WIRE);

        over
    }

    fn cfg_notch(&mut self, channel: u8, notch: bool) {
        if !notch {
            self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_MASK_RXDSP, 0x1f);
            self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_EN_RXDSP, 0x0);
            self.bus.write32(REG_OFDM1_CSI1, 0x00000000);
            self.bus.write32(REG_OFDM1_CSI2, 0x00000000);
            self.bus.write32(REG_OFDM1_CSI3, 0x00000000);
            self.bus.write32(REG_OFDM1_CSI4, 0x00000000);
            self.bus.write32_mask(REG_OFDM1_CFOTRK, BIT_EN_CFOTRK, 0x0);
            return;
        }

        match channel {
            13 => {
                self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_MASK_RXDSP, 0xb);
                self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_EN_RXDSP, 0x1);
                self.bus.write32(REG_OFDM1_CSI1, 0x04000000);
                self.bus.write32(REG_OFDM1_CSI2, 0x00000000);
                self.bus.write32(REG_OFDM1_CSI3, 0x00000000);
                self.bus.write32(REG_OFDM1_CSI4, 0x00000000);
                self.bus.write32_mask(REG_OFDM1_CFOTRK, BIT_EN_CFOTRK, 0x1);
            }
            14 => {
                self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_MASK_RXDSP, 0x5);
                self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_EN_RXDSP, 0x1);
                self.bus.write32(REG_OFDM1_CSI1, 0x00000000);
                self.bus.write32(REG_OFDM1_CSI2, 0x00000000);
                self.bus.write32(REG_OFDM1_CSI3, 0x00000000);
                self.bus.write32(REG_OFDM1_CSI4, 0x00080000);
                self.bus.write32_mask(REG_OFDM1_CFOTRK, BIT_EN_CFOTRK, 0x1);
            }
            _ => {
                self.bus.write32_mask(REG_OFDM0_RXDSP, BIT_EN_RXDSP, 0x0);
                self.bus.write32_mask(REG_OFDM1_CFOTRK, BIT_EN_CFOTRK, 0x0);
            }
        }
    }

    /// Program the TXAGC registers from [`Self::tx_pwr_tbl`].
    pub fn set_tx_power_index(&mut self) {
        for path in 0..self.chip.rf_path_num {
            for section in RATE_SECTIONS {
                self.set_tx_power_index_by_rate(path, section);
            }
        }
    }

    fn set_tx_power_index_by_rate(&mut self, path: usize, section: &[DescRate]) {
        for &rate in section {
            let idx = rate.into_bits() as usize;
            let Some(txagc) = TXAGC.get(idx) else {
                warn!("rate {:x} isn't supported", rate.into_bits());
                continue;
            };
            let pwr_index = self.tx_pwr_tbl[path][idx];
            self.bus
                .write32_mask(txagc.addr, txagc.mask, pwr_index as u32);
        }
    }

    /// Harvest and reset the false-alarm and CRC32 counters.
    pub fn false_alarm_statistics(&mut self) {
        let bus = &mut self.bus;
        let dm = &mut self.dm;

        // hold counters
        bus.write32_mask(REG_OFDM_FA_HOLDC_11N, 1 << 31, 1);
        bus.write32_mask(REG_OFDM_FA_RSTD_11N, 1 << 31, 1);
        bus.write32_mask(REG_CCK_FA_RST_11N, 1 << 12, 1);
        bus.write32_mask(REG_CCK_FA_RST_11N, 1 << 14, 1);

        let mut cck_fa_cnt = bus.read32_mask(REG_CCK_FA_LSB_11N, MASKBYTE0);
        cck_fa_cnt += bus.read32_mask(REG_CCK_FA_MSB_11N, MASKBYTE3) << 8;

        let mut val32 = bus.read32(REG_OFDM_FA_TYPE1_11N);
        let mut ofdm_fa_cnt = val32 & 0xffff;
        ofdm_fa_cnt += (val32 & 0xffff_0000) >> 16;
        val32 = bus.read32(REG_OFDM_FA_TYPE2_11N);
        dm.ofdm_cca_cnt = val32 & 0xffff;
        ofdm_fa_cnt += (val32 & 0xffff_0000) >> 16;
        val32 = bus.read32(REG_OFDM_FA_TYPE3_11N);
        ofdm_fa_cnt += val32 & 0xffff;
        ofdm_fa_cnt += (val32 & 0xffff_0000) >> 16;
        val32 = bus.read32(REG_OFDM_FA_TYPE4_11N);
        ofdm_fa_cnt += val32 & 0xffff;

        dm.cck_fa_cnt = cck_fa_cnt;
        dm.ofdm_fa_cnt = ofdm_fa_cnt;
        dm.total_fa_cnt = cck_fa_cnt + ofdm_fa_cnt;

        dm.cck_err_cnt = bus.read32(REG_IGI_C_11N);
        dm.cck_ok_cnt = bus.read32(REG_IGI_D_11N);
        let crc32_cnt = bus.read32(REG_OFDM_CRC32_CNT_11N);
        dm.ofdm_err_cnt = (crc32_cnt & 0xffff_0000) >> 16;
        dm.ofdm_ok_cnt = crc32_cnt & 0xffff;
        let crc32_cnt = bus.read32(REG_HT_CRC32_CNT_11N);
        dm.ht_err_cnt = (crc32_cnt & 0xffff_0000) >> 16;
        dm.ht_ok_cnt = crc32_cnt & 0xffff;

        let val32 = bus.read32(REG_CCK_CCA_CNT_11N);
        dm.cck_cca_cnt = ((val32 & 0xff) << 8) | ((val32 & 0xff00) >> 8);
        dm.total_cca_cnt = dm.cck_cca_cnt + dm.ofdm_cca_cnt;

        // reset counters
        bus.write32_mask(REG_OFDM_FA_RSTC_11N, 1 << 31, 1);
        bus.write32_mask(REG_OFDM_FA_RSTC_11N, 1 << 31, 0);
        bus.write32_mask(REG_OFDM_FA_RSTD_11N, 1 << 27, 1);
        bus.write32_mask(REG_OFDM_FA_RSTD_11N, 1 << 27, 0);
        bus.write32_mask(REG_OFDM_FA_HOLDC_11N, 1 << 31, 0);
        bus.write32_mask(REG_OFDM_FA_RSTD_11N, 1 << 31, 0);
        bus.write32_mask(REG_CCK_FA_RST_11N, (1 << 13) | (1 << 12), 0);
        bus.write32_mask(REG_CCK_FA_RST_11N, (1 << 13) | (1 << 12), 2);
        bus.write32_mask(REG_CCK_FA_RST_11N, (1 << 15) | (1 << 14), 0);
        bus.write32_mask(REG_CCK_FA_RST_11N, (1 << 15) | (1 << 14), 2);
        bus.write32_mask(REG_PAGE_F_RST_11N, 1 << 16, 1);
        bus.write32_mask(REG_PAGE_F_RST_11N, 1 << 16, 0);
    }

    // Power-tracking support. The moving average and threshold decisions
    // live here; the actual compensation loop is in the pwrtrack module.

    pub(crate) fn pwrtrack_init(&mut self) {
        self.dm.default_ofdm_index = DEF_OFDM_SWING_INDEX as u8;

        for path in 0..self.chip.rf_path_num {
            self.dm.avg_thermal[path].init();
            self.dm.delta_power_index[path] = 0;
            self.dm.delta_power_index_last[path] = 0;
        }
        self.dm.pwrtrack_trigger = false;
        self.dm.pwrtrack_initial_trigger = true;
        self.dm.thermal_meter_k = self.efuse.thermal_meter_k;
        self.dm.txagc_remnant_cck = 0;
        self.dm.txagc_remnant_ofdm = 0;
    }

    pub(crate) fn pwrtrack_avg(&mut self, thermal: u8, path: RfPath) {
        let idx = path.index();
        self.dm.avg_thermal[idx].add(thermal);
        self.dm.thermal_avg[idx] = self.dm.avg_thermal[idx].read();
    }

    /// The averaged thermal reading drifted past the IQK threshold since the
    /// last calibration; rebase and request a new one.
    pub(crate) fn pwrtrack_need_iqk(&mut self) -> bool {
        let delta_iqk = self.dm.thermal_avg[0].abs_diff(self.dm.thermal_meter_k);
        if delta_iqk >= self.chip.iqk_threshold {
            self.dm.thermal_meter_k = self.dm.thermal_avg[0];
            return true;
        }
        false
    }

    pub(crate) fn pwrtrack_thermal_changed(&self, thermal: u8, path: RfPath) -> bool {
        self.dm.avg_thermal[path.index()].read() != thermal
    }

    pub(crate) fn pwrtrack_get_delta(&self, path: RfPath) -> u8 {
        let idx = path.index();
        let delta = self.dm.thermal_avg[idx].abs_diff(self.efuse.thermal_meter[idx]);
        delta.min(PWRTRACK_TBL_SIZE as u8 - 1)
    }

    pub(crate) fn pwrtrack_get_pwridx(
        &self,
        swing_table: &SwingTable,
        tbl_path: usize,
        therm_path: RfPath,
        delta: u8,
    ) -> i8 {
        if delta as usize >= PWRTRACK_TBL_SIZE {
            warn!("power track delta {} out of range", delta);
            return 0;
        }
        let idx = therm_path.index();
        if self.dm.thermal_avg[idx] > self.efuse.thermal_meter[idx] {
            swing_table.p[tbl_path][delta as usize] as i8
        } else {
            -(swing_table.n[tbl_path][delta as usize] as i8)
        }
    }

    pub(crate) fn config_swing_table(&self) -> SwingTable {
        let tbl = self.chip.pwr_track_tbl;
        SwingTable {
            n: [tbl.pwrtrk_2ga_n, tbl.pwrtrk_2gb_n],
            p: [tbl.pwrtrk_2ga_p, tbl.pwrtrk_2gb_p],
        }
    }
}

/// Map a per-path RF power (dBm) to the 0..=100 RSSI scale.
pub(crate) fn rf_power_to_rssi(rx_power: i8) -> u8 {
    (rx_power as i16 + 100).clamp(0, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{Access, MockBus, NoDelay};

    fn device() -> Rtw8723d<MockBus, NoDelay> {
        let efuse = Efuse {
            thermal_meter: [0x1a, 0x1a],
            thermal_meter_k: 0x1a,
            crystal_cap: 0x28,
            afe: 0,
            power_track_type: 0,
        };
        Rtw8723d::new(MockBus::new(), NoDelay, efuse)
    }

    #[test]
    fn lck_pauses_tx_when_no_ctx_type() {
        let mut dev = device();
        dev.bus.preload_rf(RfPath::A, RF_CFGCH, 0x0_7123);
        dev.lck();

        let w = &dev.bus.writes;
        // TX paused for the duration, released afterwards.
        assert!(w.contains(&Access::W8(REG_TXPAUSE, 0xff)));
        assert_eq!(w.last(), Some(&Access::W8(REG_TXPAUSE, 0x00)));
        // LCK strobe set, then the original value written back.
        assert!(w.contains(&Access::Rf(
            RfPath::A,
            RF_CFGCH,
            RFREG_MASK,
            0x0_7123 | BIT_LCK
        )));
        assert_eq!(dev.bus.peek_rf(RfPath::A, RF_CFGCH), 0x0_7123);
    }

    #[test]
    fn lck_clears_ctx_type_instead_of_pausing() {
        let mut dev = device();
        dev.bus.preload32(REG_CTX, 0x30);
        dev.lck();

        let w = &dev.bus.writes;
        assert!(w.contains(&Access::W8(REG_CTX, 0x00)));
        assert!(!w.contains(&Access::W8(REG_TXPAUSE, 0xff)));
        assert_eq!(w.last(), Some(&Access::W8(REG_CTX, 0x30)));
    }

    #[test]
    fn set_channel_rejects_out_of_band() {
        let mut dev = device();
        assert_eq!(
            dev.set_channel(0, ChannelWidth::Width20, PrimaryChannel::Lower),
            Err(RtwError::UnsupportedChannel)
        );
        assert_eq!(
            dev.set_channel(15, ChannelWidth::Width20, PrimaryChannel::Lower),
            Err(RtwError::UnsupportedChannel)
        );
    }

    #[test]
    fn set_channel_programs_both_rf_paths() {
        let mut dev = device();
        dev.bus.preload_rf(RfPath::A, RF_CFGCH, 0x0_0c01);
        dev.bus.preload_rf(RfPath::B, RF_CFGCH, 0x0_0c01);
        dev.set_channel(6, ChannelWidth::Width20, PrimaryChannel::Lower)
            .unwrap();

        // Channel number replaced, 20 MHz bandwidth bits set on path A.
        assert_eq!(dev.bus.peek_rf(RfPath::A, RF_CFGCH), 0x0_0c06);
        assert_eq!(dev.bus.peek_rf(RfPath::B, RF_CFGCH), 0x0_0c06);
    }

    #[test]
    fn set_channel_40m_selects_sideband() {
        let mut dev = device();
        dev.set_channel(6, ChannelWidth::Width40, PrimaryChannel::Upper)
            .unwrap();
        assert_eq!(dev.bus.peek32(REG_CCK0_SYS) & BIT_CCK_SIDE_BAND, BIT_CCK_SIDE_BAND);
        // 40 MHz clears the 20 MHz RX DFIR override.
        assert_eq!(dev.bus.peek32(REG_BBRX_DFIR) & BIT_RXBB_DFIR_EN, 0);
    }

    #[test]
    fn channel_14_uses_narrow_cck_dfir() {
        let mut dev = device();
        dev.set_channel(14, ChannelWidth::Width20, PrimaryChannel::Lower)
            .unwrap();
        assert_eq!(dev.bus.peek32(0x0a24), 0x0000b81c);
        assert_eq!(dev.bus.peek32(0x0aac), 0x00003667);
    }

    #[test]
    fn spur_detection_enables_notch_on_ch13() {
        let mut dev = device();
        dev.bus.preload32(REG_PSDRPT, 0x20);
        dev.set_channel(13, ChannelWidth::Width20, PrimaryChannel::Lower)
            .unwrap();
        // Notch engaged: RXDSP filter bank 0xb and CFO tracking on.
        assert_eq!(
            dev.bus.peek32(REG_OFDM0_RXDSP) & BIT_MASK_RXDSP,
            0xb << BIT_MASK_RXDSP.trailing_zeros()
        );
        assert_eq!(
            dev.bus.peek32(REG_OFDM1_CFOTRK) & BIT_EN_CFOTRK,
            BIT_EN_CFOTRK
        );
    }

    #[test]
    fn clean_psd_leaves_notch_off() {
        let mut dev = device();
        dev.bus.preload32(REG_PSDRPT, 0x01);
        dev.set_channel(13, ChannelWidth::Width20, PrimaryChannel::Lower)
            .unwrap();
        assert_eq!(dev.bus.peek32(REG_OFDM0_RXDSP) & BIT_EN_RXDSP, 0);
    }

    #[test]
    fn tx_power_index_lands_in_per_rate_fields() {
        let mut dev = device();
        dev.tx_pwr_tbl[0][DescRate::Rate1M.into_bits() as usize] = 0x2e;
        dev.tx_pwr_tbl[0][DescRate::Rate11M.into_bits() as usize] = 0x2c;
        dev.tx_pwr_tbl[0][DescRate::Mcs7.into_bits() as usize] = 0x24;
        dev.set_tx_power_index();

        assert_eq!(dev.bus.peek32(0xe08) & 0x0000ff00, 0x2e << 8);
        assert_eq!(dev.bus.peek32(0x86c) & 0xff000000, 0x2c << 24);
        assert_eq!(dev.bus.peek32(0xe14) & 0xff000000, 0x24 << 24);
    }

    #[test]
    fn false_alarm_counters_are_summed_and_reset() {
        let mut dev = device();
        dev.bus.preload32(REG_CCK_FA_LSB_11N, 0x34);
        dev.bus.preload32(REG_CCK_FA_MSB_11N, 0x12 << 24);
        dev.bus.preload32(REG_OFDM_FA_TYPE1_11N, 0x0002_0001);
        dev.bus.preload32(REG_OFDM_FA_TYPE2_11N, 0x0004_0099);
        dev.bus.preload32(REG_OFDM_FA_TYPE3_11N, 0x0010_0008);
        dev.bus.preload32(REG_OFDM_FA_TYPE4_11N, 0x0000_0020);
        dev.bus.preload32(REG_CCK_CCA_CNT_11N, 0x0000_2211);

        dev.false_alarm_statistics();

        assert_eq!(dev.dm.cck_fa_cnt, 0x1234);
        assert_eq!(dev.dm.ofdm_fa_cnt, 0x3f);
        assert_eq!(dev.dm.total_fa_cnt, 0x1234 + 0x3f);
        assert_eq!(dev.dm.ofdm_cca_cnt, 0x99);
        assert_eq!(dev.dm.cck_cca_cnt, 0x1122);
        // Counter reset strobes issued.
        let rstc = dev.bus.writes32_to(REG_OFDM_FA_RSTC_11N);
        assert!(rstc.iter().any(|v| v & (1 << 31) != 0));
    }

    #[test]
    fn pwrtrack_polarity_lookup() {
        let mut dev = device();
        let table = dev.config_swing_table();

        // Hotter than the factory reference uses the positive table.
        dev.dm.thermal_avg[0] = 0x20;
        assert_eq!(dev.pwrtrack_get_pwridx(&table, 0, RfPath::A, 5), 2);
        // Cooler uses the negated negative table.
        dev.dm.thermal_avg[0] = 0x10;
        assert_eq!(dev.pwrtrack_get_pwridx(&table, 0, RfPath::A, 5), -2);
        // Out-of-range delta is refused.
        assert_eq!(dev.pwrtrack_get_pwridx(&table, 0, RfPath::A, 30), 0);
    }

    #[test]
    fn need_iqk_rebases_reference() {
        let mut dev = device();
        dev.pwrtrack_init();
        dev.dm.thermal_avg[0] = 0x1a + 7;
        assert!(!dev.pwrtrack_need_iqk());
        dev.dm.thermal_avg[0] = 0x1a + 8;
        assert!(dev.pwrtrack_need_iqk());
        assert_eq!(dev.dm.thermal_meter_k, 0x1a + 8);
        // Once rebased the same reading no longer trips it.
        assert!(!dev.pwrtrack_need_iqk());
    }

    #[test]
    fn rssi_scale_clamps() {
        assert_eq!(rf_power_to_rssi(-110), 0);
        assert_eq!(rf_power_to_rssi(-50), 50);
        assert_eq!(rf_power_to_rssi(10), 100);
    }
}
