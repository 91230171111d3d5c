//! IQ imbalance calibration.
//!
//! The hardware measures TX and RX IQ mismatch with a one-shot tone engine.
//! A full calibration runs up to three rounds of eight measurements (TX and
//! RX, X and Y coefficient, on the S1 WiFi path and the S0 path shared with
//! BT) and accepts a round once two rounds agree within tolerance. The
//! winning coefficients are folded into the OFDM TX/RX imbalance matrices.

use embedded_hal::delay::DelayNs;

use crate::bus::{check_hw_ready, RfPath, RtwBus};
use crate::phy::Rtw8723d;
use crate::regs::*;
use crate::util::{bits_to_s32, q16_to_q8, q16_to_q9};

const MAX_TOLERANCE: u32 = 5;
const PATH_IQK_RETRY: usize = 2;

const IQK_S1_TX_X: usize = 0;
const IQK_S1_TX_Y: usize = 1;
const IQK_S1_RX_X: usize = 2;
#[allow(dead_code)]
const IQK_S1_RX_Y: usize = 3;
const IQK_S0_TX_X: usize = 4;
const IQK_S0_TX_Y: usize = 5;
const IQK_S0_RX_X: usize = 6;
#[allow(dead_code)]
const IQK_S0_RX_Y: usize = 7;
/// Measurement slots per round.
const IQK_NR: usize = 8;
/// Slots per path, the first two being the TX pair.
const IQK_SX_NR: usize = 4;

const IQK_ROUND_2: usize = 2;
/// Synthetic row merged from partially agreeing rounds.
const IQK_ROUND_HYBRID: usize = 3;
const IQK_ROUND_SIZE: usize = 4;

const IQK_TX_OK: u8 = 1 << 0;
const IQK_RX_OK: u8 = 1 << 1;

const IQK_ADDA_REGS: [u32; 16] = [
    0x85c, 0xe6c, 0xe70, 0xe74, 0xe78, 0xe7c, 0xe80, 0xe84, 0xe88, 0xe8c,
    0xed0, 0xed4, 0xed8, 0xedc, 0xee0, 0xeec,
];

const IQK_MAC8_REGS: [u32; 3] = [0x522, 0x550, 0x551];
const IQK_MAC32_REGS: [u32; 1] = [0x40];

const IQK_BB_REGS: [u32; 9] = [
    0xc04, 0xc08, 0x874, 0xb68, 0xb6c, 0x870, 0x860, 0x864, 0xa04,
];

#[derive(Default)]
struct IqkBackup {
    adda: [u32; IQK_ADDA_REGS.len()],
    mac8: [u8; IQK_MAC8_REGS.len()],
    mac32: [u32; IQK_MAC32_REGS.len()],
    bb: [u32; IQK_BB_REGS.len()],

    lte_path: u32,
    lte_gnt: u32,

    btg_sel: u8,
    bb_sel_btg: u32,

    igia: u8,
    igib: u8,
}

/// Per-side calibration parameters. The S0 side reaches its RF controls
/// through a different set of shadow registers than S1.
struct IqkCfg {
    name: &'static str,
    val_bb_sel_btg: u32,
    reg_lutwe: u32,
    val_txiqk_pi: u32,
    reg_padlut: u32,
    reg_gaintx: u32,
    reg_bspad: u32,
    val_wlint: u32,
    val_wlsel: u32,
    val_iqkpts: u32,
}

static IQK_CFG_S1: IqkCfg = IqkCfg {
    name: "S1",
    val_bb_sel_btg: 0x99000000,
    reg_lutwe: RF_LUTWE,
    val_txiqk_pi: 0x8214019f,
    reg_padlut: RF_LUTDBG,
    reg_gaintx: RF_GAINTX,
    reg_bspad: RF_BSPAD,
    val_wlint: 0xe0d,
    val_wlsel: 0x60d,
    val_iqkpts: 0xfa000000,
};

static IQK_CFG_S0: IqkCfg = IqkCfg {
    name: "S0",
    val_bb_sel_btg: 0x99000280,
    reg_lutwe: RF_LUTWE2,
    val_txiqk_pi: 0x8214018a,
    reg_padlut: RF_TXADBG,
    reg_gaintx: RF_TRXIQ,
    reg_bspad: RF_TXATANK,
    val_wlint: 0xe6d,
    val_wlsel: 0x66d,
    val_iqkpts: 0xf9000000,
};

/// TX result acceptance. 0x142/0x42 are the hardware's "no result" codes.
fn iqk_tx_ok(tx_fail: bool, tx_x: u32, tx_y: u32) -> bool {
    !tx_fail && tx_x != 0x142 && tx_y != 0x42
}

/// RX result acceptance, on the raw 10-bit X and Y readings.
fn iqk_rx_ok(rx_fail: bool, rx_x: u32, rx_y: u32) -> bool {
    let rx_y = bits_to_s32(rx_y as i32, 9, 0).unsigned_abs();

    !rx_fail && rx_x != 0x132 && rx_x < 0x11a && rx_x > 0xe6 && rx_y != 0x36 && rx_y < 0x1a
}

/// Compare rounds `c1` and `c2` slot by slot. Returns true when every slot
/// agrees within tolerance. A disagreeing RX pair whose counterpart in one
/// round is all zero is treated as a missing measurement: the other round's
/// TX pair is promoted into the hybrid row instead of failing the match.
fn iqk_similarity_cmp(result: &mut [[i32; IQK_NR]; IQK_ROUND_SIZE], c1: usize, c2: usize) -> bool {
    let mut bitmap: u32 = 0;
    let mut candidate: [Option<usize>; 2] = [None, None];

    for i in 0..IQK_NR {
        let tmp1 = bits_to_s32(result[c1][i], 9, 0);
        let tmp2 = bits_to_s32(result[c2][i], 9, 0);
        let diff = (tmp1 - tmp2).unsigned_abs();

        if diff <= MAX_TOLERANCE {
            continue;
        }

        if (i == IQK_S1_RX_X || i == IQK_S0_RX_X) && bitmap == 0 {
            if result[c1][i] + result[c1][i + 1] == 0 {
                candidate[i / IQK_SX_NR] = Some(c2);
            } else if result[c2][i] + result[c2][i + 1] == 0 {
                candidate[i / IQK_SX_NR] = Some(c1);
            } else {
                bitmap |= 1 << i;
            }
        } else {
            bitmap |= 1 << i;
        }
    }

    if bitmap == 0 {
        let mut ret = true;
        for (path, cand) in candidate.iter().enumerate() {
            let Some(cand) = cand else {
                continue;
            };
            for j in path * IQK_SX_NR..path * IQK_SX_NR + 2 {
                result[IQK_ROUND_HYBRID][j] = result[*cand][j];
            }
            ret = false;
        }
        return ret;
    }

    for i in 0..IQK_NR {
        // X and Y of one measurement stand or fall together.
        let j = i & !1;
        if bitmap & (0x3 << j) != 0 {
            continue;
        }
        result[IQK_ROUND_HYBRID][i] = result[c1][i];
    }

    false
}

impl<B: RtwBus, D: DelayNs> Rtw8723d<B, D> {
    fn iqk_backup_regs(&mut self, backup: &mut IqkBackup) {
        for (reg, slot) in IQK_ADDA_REGS.iter().zip(backup.adda.iter_mut()) {
            *slot = self.bus.read32(*reg);
        }
        for (reg, slot) in IQK_MAC8_REGS.iter().zip(backup.mac8.iter_mut()) {
            *slot = self.bus.read8(*reg);
        }
        for (reg, slot) in IQK_MAC32_REGS.iter().zip(backup.mac32.iter_mut()) {
            *slot = self.bus.read32(*reg);
        }
        for (reg, slot) in IQK_BB_REGS.iter().zip(backup.bb.iter_mut()) {
            *slot = self.bus.read32(*reg);
        }

        backup.igia = self.bus.read32_mask(REG_OFDM0_XAAGC1, MASKBYTE0) as u8;
        backup.igib = self.bus.read32_mask(REG_OFDM0_XBAGC1, MASKBYTE0) as u8;

        backup.bb_sel_btg = self.bus.read32(REG_BB_SEL_BTG);
    }

    fn iqk_restore_regs(&mut self, backup: &IqkBackup) {
        for (reg, val) in IQK_ADDA_REGS.iter().zip(backup.adda.iter()) {
            self.bus.write32(*reg, *val);
        }
        for (reg, val) in IQK_MAC8_REGS.iter().zip(backup.mac8.iter()) {
            self.bus.write8(*reg, *val);
        }
        for (reg, val) in IQK_MAC32_REGS.iter().zip(backup.mac32.iter()) {
            self.bus.write32(*reg, *val);
        }
        for (reg, val) in IQK_BB_REGS.iter().zip(backup.bb.iter()) {
            self.bus.write32(*reg, *val);
        }

        self.bus.write32_mask(REG_OFDM0_XAAGC1, MASKBYTE0, 0x50);
        self.bus
            .write32_mask(REG_OFDM0_XAAGC1, MASKBYTE0, backup.igia as u32);

        self.bus.write32_mask(REG_OFDM0_XBAGC1, MASKBYTE0, 0x50);
        self.bus
            .write32_mask(REG_OFDM0_XBAGC1, MASKBYTE0, backup.igib as u32);

        self.bus.write32(REG_TXIQK_TONE_A_11N, 0x01008c00);
        self.bus.write32(REG_RXIQK_TONE_A_11N, 0x01008c00);
    }

    fn iqk_backup_path_ctrl(&mut self, backup: &mut IqkBackup) {
        backup.btg_sel = self.bus.read8(REG_BTG_SEL);
    }

    fn iqk_config_path_ctrl(&mut self) {
        self.bus.write32_mask(REG_PAD_CTRL1, BIT_BT_BTG_SEL, 0x1);
    }

    fn iqk_restore_path_ctrl(&mut self, backup: &IqkBackup) {
        self.bus.write8(REG_BTG_SEL, backup.btg_sel);
    }

    fn iqk_backup_lte_path_gnt(&mut self, backup: &mut IqkBackup) {
        backup.lte_path = self.bus.read32(REG_LTECOEX_PATH_CONTROL);
        self.bus.write32(REG_LTECOEX_CTRL, 0x800f0038);
        self.delay.delay_ms(1);
        backup.lte_gnt = self.bus.read32(REG_LTECOEX_READ_DATA);
        debug!("original LTE coex grant {:x}", backup.lte_gnt);
    }

    fn iqk_config_lte_path_gnt(&mut self) {
        self.bus.write32(REG_LTECOEX_WRITE_DATA, 0x0000ff00);
        self.bus.write32(REG_LTECOEX_CTRL, 0xc0020038);
        self.bus
            .write32_mask(REG_LTECOEX_PATH_CONTROL, BIT_LTE_MUX_CTRL_PATH, 0x1);
    }

    fn iqk_restore_lte_path_gnt(&mut self, backup: &IqkBackup) {
        self.bus.write32(REG_LTECOEX_WRITE_DATA, backup.lte_gnt);
        self.bus.write32(REG_LTECOEX_CTRL, 0xc00f0038);
        self.bus
            .write32(REG_LTECOEX_PATH_CONTROL, backup.lte_path);
    }

    fn iqk_check_tx_failed(&mut self, cfg: &IqkCfg) -> u8 {
        let tx_fail = self.bus.read32_mask(REG_IQK_RES_RY, BIT_IQK_TX_FAIL) != 0;
        let tx_x = self.bus.read32_mask(REG_IQK_RES_TX, BIT_MASK_RES_TX);
        let tx_y = self.bus.read32_mask(REG_IQK_RES_TY, BIT_MASK_RES_TY);

        if iqk_tx_ok(tx_fail, tx_x, tx_y) {
            return IQK_TX_OK;
        }

        debug!("{} TX IQK failed", cfg.name);
        0
    }

    fn iqk_check_rx_failed(&mut self, cfg: &IqkCfg) -> u8 {
        let rx_fail = self.bus.read32_mask(REG_IQK_RES_RY, BIT_IQK_RX_FAIL) != 0;
        let rx_x = self.bus.read32_mask(REG_IQK_RES_RX, BIT_MASK_RES_RX);
        let rx_y = self.bus.read32_mask(REG_IQK_RES_RY, BIT_MASK_RES_RY);

        if iqk_rx_ok(rx_fail, rx_x, rx_y) {
            return IQK_RX_OK;
        }

        debug!("{} RX IQK step 2 failed", cfg.name);
        0
    }

    fn iqk_one_shot(&mut self, tx: bool, cfg: &IqkCfg) {
        let pts = if tx { cfg.val_iqkpts } else { 0xf9000000 };

        // enter IQK mode
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, EN_IQK);
        self.iqk_config_lte_path_gnt();

        self.bus.write32(REG_LTECOEX_CTRL, 0x800f0054);
        self.delay.delay_ms(1);

        // one shot, LOK and IQK
        self.bus.write32(REG_IQK_AGC_PTS_11N, pts);
        self.bus.write32(REG_IQK_AGC_PTS_11N, 0xf8000000);

        if !check_hw_ready(
            &mut self.bus,
            &mut self.delay,
            REG_IQK_RES_RY,
            BIT_IQK_DONE,
            1,
        ) {
            warn!("{} {} IQK isn't done", cfg.name, if tx { "TX" } else { "RX" });
        }
    }

    fn iqk_txrx_path_post(&mut self, cfg: &IqkCfg, backup: &IqkBackup) {
        self.iqk_restore_lte_path_gnt(backup);
        self.bus.write32(REG_BB_SEL_BTG, backup.bb_sel_btg);

        // leave IQK mode
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);
        self.delay.delay_ms(1);
        self.bus.write_rf(RfPath::A, cfg.reg_padlut, 0x800, 0x0);
        self.bus.write_rf(RfPath::A, RF_WLINT, 1 << 0, 0x0);
        self.bus.write_rf(RfPath::A, RF_WLSEL, 1 << 0, 0x0);
    }

    fn iqk_tx_path(&mut self, cfg: &IqkCfg, backup: &IqkBackup) -> u8 {
        let mut result = 0x00;

        debug!("path {} TX IQK", cfg.name);

        self.bus.write32(REG_BB_SEL_BTG, cfg.val_bb_sel_btg);
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);
        self.delay.delay_ms(1);
        self.bus
            .write_rf(RfPath::A, cfg.reg_lutwe, RFREG_MASK, 0x80000);
        self.bus.write_rf(RfPath::A, RF_LUTWA, RFREG_MASK, 0x00004);
        self.bus.write_rf(RfPath::A, RF_LUTWD1, RFREG_MASK, 0x0005d);
        self.bus.write_rf(RfPath::A, RF_LUTWD0, RFREG_MASK, 0xbffe0);
        self.bus
            .write_rf(RfPath::A, cfg.reg_lutwe, RFREG_MASK, 0x00000);

        // IQK setting
        self.bus.write32(REG_TXIQK_TONE_A_11N, 0x08008c0c);
        self.bus.write32(REG_RXIQK_TONE_A_11N, 0x38008c1c);
        self.bus.write32(REG_TXIQK_PI_A_11N, cfg.val_txiqk_pi);
        self.bus.write32(REG_RXIQK_PI_A_11N, 0x28160200);
        self.bus.write32(REG_TXIQK_11N, 0x01007c00);
        self.bus.write32(REG_RXIQK_11N, 0x01004800);

        // LOK setting
        self.bus.write32(REG_IQK_AGC_RSP_11N, 0x00462911);

        // PA, PAD setting
        self.bus.write_rf(RfPath::A, cfg.reg_padlut, 0x800, 0x1);
        self.bus.write_rf(RfPath::A, cfg.reg_gaintx, 0x600, 0x0);
        self.bus.write_rf(RfPath::A, cfg.reg_gaintx, 0x1e0, 0x3);
        self.bus.write_rf(RfPath::A, RF_RXIQGEN, 0x1f, 0xf);

        // LOK path selection
        self.bus.write_rf(RfPath::A, cfg.reg_lutwe, 0x10, 0x1);
        self.bus.write_rf(RfPath::A, cfg.reg_bspad, 0x1, 0x1);

        self.bus
            .write_rf(RfPath::A, RF_WLINT, RFREG_MASK, cfg.val_wlint);
        self.bus
            .write_rf(RfPath::A, RF_WLSEL, RFREG_MASK, cfg.val_wlsel);

        self.iqk_one_shot(true, cfg);
        result |= self.iqk_check_tx_failed(cfg);

        self.iqk_txrx_path_post(cfg, backup);

        result
    }

    fn iqk_rx_path(&mut self, cfg: &IqkCfg, backup: &IqkBackup) -> u8 {
        let mut result = 0x00;

        debug!("path {} RX IQK step 1", cfg.name);
        self.bus.write32(REG_BB_SEL_BTG, cfg.val_bb_sel_btg);

        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);

        // IQK setting
        self.bus.write32(REG_TXIQK_11N, 0x01007c00);
        self.bus.write32(REG_RXIQK_11N, 0x01004800);

        // path IQK setting
        self.bus.write32(REG_TXIQK_TONE_A_11N, 0x18008c1c);
        self.bus.write32(REG_RXIQK_TONE_A_11N, 0x38008c1c);
        self.bus.write32(REG_TX_IQK_TONE_B, 0x38008c1c);
        self.bus.write32(REG_RX_IQK_TONE_B, 0x38008c1c);
        self.bus.write32(REG_TXIQK_PI_A_11N, 0x82160000);
        self.bus.write32(REG_RXIQK_PI_A_11N, 0x28160000);

        // LOK setting
        self.bus.write32(REG_IQK_AGC_RSP_11N, 0x0046a911);

        // RXIQK mode
        self.bus
            .write_rf(RfPath::A, cfg.reg_lutwe, RFREG_MASK, 0x80000);
        self.bus.write_rf(RfPath::A, RF_LUTWA, RFREG_MASK, 0x00006);
        self.bus.write_rf(RfPath::A, RF_LUTWD1, RFREG_MASK, 0x0005f);
        self.bus.write_rf(RfPath::A, RF_LUTWD0, RFREG_MASK, 0xa7ffb);
        self.bus
            .write_rf(RfPath::A, cfg.reg_lutwe, RFREG_MASK, 0x00000);

        // PA/PAD off
        self.bus.write_rf(RfPath::A, cfg.reg_padlut, 0x800, 0x1);
        self.bus.write_rf(RfPath::A, cfg.reg_gaintx, 0x600, 0x0);
        self.bus
            .write_rf(RfPath::A, RF_WLINT, RFREG_MASK, cfg.val_wlint);
        self.bus
            .write_rf(RfPath::A, RF_WLSEL, RFREG_MASK, cfg.val_wlsel);

        self.iqk_one_shot(false, cfg);
        result |= self.iqk_check_tx_failed(cfg);

        if result != 0 {
            let tx_x = self.bus.read32_mask(REG_IQK_RES_TX, BIT_MASK_RES_TX);
            let tx_y = self.bus.read32_mask(REG_IQK_RES_TY, BIT_MASK_RES_TY);

            // feed the step 1 coefficients into step 2
            self.bus.write32(REG_TXIQK_11N, txiqk_11n(tx_x, tx_y));

            debug!("path {} RX IQK step 2", cfg.name);

            self.bus.write32(REG_RXIQK_11N, 0x01004800);
            self.bus.write32(REG_TXIQK_TONE_A_11N, 0x38008c1c);
            self.bus.write32(REG_RXIQK_TONE_A_11N, 0x18008c1c);
            self.bus.write32(REG_TX_IQK_TONE_B, 0x38008c1c);
            self.bus.write32(REG_RX_IQK_TONE_B, 0x38008c1c);
            self.bus.write32(REG_TXIQK_PI_A_11N, 0x82170000);
            self.bus.write32(REG_RXIQK_PI_A_11N, 0x28171400);

            // LOK setting
            self.bus.write32(REG_IQK_AGC_RSP_11N, 0x0046a8d1);

            // RXIQK mode
            self.bus
                .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);
            self.delay.delay_ms(1);
            self.bus.write_rf(RfPath::A, cfg.reg_lutwe, 0x80000, 0x1);
            self.bus.write_rf(RfPath::A, RF_LUTWA, RFREG_MASK, 0x00007);
            self.bus.write_rf(RfPath::A, RF_LUTWD1, RFREG_MASK, 0x0005f);
            self.bus.write_rf(RfPath::A, RF_LUTWD0, RFREG_MASK, 0xb3fdb);
            self.bus
                .write_rf(RfPath::A, cfg.reg_lutwe, RFREG_MASK, 0x00000);

            self.iqk_one_shot(false, cfg);
            result |= self.iqk_check_rx_failed(cfg);
        }

        self.iqk_txrx_path_post(cfg, backup);

        result
    }

    fn iqk_fill_s1_matrix(&mut self, result: &[i32; IQK_NR]) {
        if result[IQK_S1_TX_X] == 0 {
            return;
        }

        let oldval_1 = self
            .bus
            .read32_mask(REG_OFDM_0_XA_TX_IQ_IMBALANCE, BIT_MASK_TXIQ_ELM_D) as i32;

        let x = bits_to_s32(result[IQK_S1_TX_X], 9, 0);
        let tx1_a = q16_to_q8(x * oldval_1);
        let tx1_a_ext = q16_to_q9(x * oldval_1) & 0x1;
        self.bus.write32_mask(
            REG_OFDM_0_XA_TX_IQ_IMBALANCE,
            BIT_MASK_TXIQ_ELM_A,
            tx1_a as u32,
        );
        self.bus.write32_mask(
            REG_OFDM_0_ECCA_THRESHOLD,
            BIT_MASK_OFDM0_EXT_A,
            tx1_a_ext as u32,
        );

        let y = bits_to_s32(result[IQK_S1_TX_Y], 9, 0);
        let tx1_c = q16_to_q8(y * oldval_1);
        let tx1_c_ext = q16_to_q9(y * oldval_1) & 0x1;
        self.bus.write32_mask(
            REG_TXIQK_MATRIXA_LSB2_11N,
            MASKH4BITS,
            txiq_elm_c1(tx1_c),
        );
        self.bus.write32_mask(
            REG_OFDM_0_XA_TX_IQ_IMBALANCE,
            BIT_MASK_TXIQ_ELM_C,
            txiq_elm_c2(tx1_c),
        );
        self.bus.write32_mask(
            REG_OFDM_0_ECCA_THRESHOLD,
            BIT_MASK_OFDM0_EXT_C,
            tx1_c_ext as u32,
        );

        if result[IQK_S1_RX_X] == 0 {
            return;
        }

        self.bus.write32_mask(
            REG_A_RXIQI,
            BIT_MASK_RXIQ_S1_X,
            result[IQK_S1_RX_X] as u32,
        );
        self.bus.write32_mask(
            REG_A_RXIQI,
            BIT_MASK_RXIQ_S1_Y1,
            rxiq_s1_y1(result[IQK_S1_RX_Y]),
        );
        self.bus.write32_mask(
            REG_RXIQK_MATRIX_LSB_11N,
            BIT_MASK_RXIQ_S1_Y2,
            rxiq_s1_y2(result[IQK_S1_RX_Y]),
        );
    }

    fn iqk_fill_s0_matrix(&mut self, result: &[i32; IQK_NR]) {
        if result[IQK_S0_TX_X] == 0 {
            return;
        }

        let oldval_0 = self.bus.read32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_D_S0) as i32;

        let x = bits_to_s32(result[IQK_S0_TX_X], 9, 0);
        let tx0_a = q16_to_q8(x * oldval_0);
        let tx0_a_ext = q16_to_q9(x * oldval_0) & 0x1;

        self.bus
            .write32_mask(REG_TXIQ_AB_S0, BIT_MASK_TXIQ_A_S0, tx0_a as u32);
        self.bus
            .write32_mask(REG_TXIQ_AB_S0, BIT_MASK_TXIQ_A_EXT_S0, tx0_a_ext as u32);

        let y = bits_to_s32(result[IQK_S0_TX_Y], 9, 0);
        let tx0_c = q16_to_q8(y * oldval_0) & 0x3ff;
        let tx0_c_ext = q16_to_q9(y * oldval_0) & 0x1;

        self.bus
            .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_C_S0, tx0_c as u32);
        self.bus
            .write32_mask(REG_TXIQ_CD_S0, BIT_MASK_TXIQ_C_EXT_S0, tx0_c_ext as u32);

        if result[IQK_S0_RX_X] == 0 {
            return;
        }

        self.bus.write32_mask(
            REG_RXIQ_AB_S0,
            BIT_MASK_RXIQ_X_S0,
            result[IQK_S0_RX_X] as u32,
        );
        self.bus.write32_mask(
            REG_RXIQ_AB_S0,
            BIT_MASK_RXIQ_Y_S0,
            result[IQK_S0_RX_Y] as u32,
        );
    }

    fn iqk_path_adda_on(&mut self) {
        for reg in IQK_ADDA_REGS {
            self.bus.write32(reg, 0x03c00016);
        }
    }

    fn iqk_config_mac(&mut self) {
        self.bus.write8(REG_TXPAUSE, 0xff);
    }

    fn iqk_rf_standby(&mut self, path: RfPath) {
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);
        self.delay.delay_ms(1);
        self.bus.write_rf(path, RF_MODE, RFREG_MASK, 0x10000);
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, EN_IQK);
    }

    fn iqk_precfg_s0(&mut self) {
        self.iqk_rf_standby(RfPath::A);
        self.iqk_path_adda_on();

        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, EN_IQK);
        self.bus.write32(REG_TXIQK_11N, 0x01007c00);
        self.bus.write32(REG_RXIQK_11N, 0x01004800);
    }

    fn iqk_precfg_s1(&mut self) {
        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, EN_IQK);
        self.bus.write32(REG_TXIQK_11N, 0x01007c00);
        self.bus.write32(REG_RXIQK_11N, 0x01004800);

        self.iqk_rf_standby(RfPath::B);
        self.iqk_path_adda_on();
    }

    fn iqk_one_round(
        &mut self,
        result: &mut [[i32; IQK_NR]; IQK_ROUND_SIZE],
        t: usize,
        backup: &IqkBackup,
    ) {
        debug!("IQ calibration round {}", t);

        self.iqk_path_adda_on();
        self.iqk_config_mac();
        self.bus
            .write32_mask(REG_CCK_ANT_SEL_11N, 0x0f000000, 0xf);
        self.bus.write32(REG_BB_RX_PATH_11N, 0x03a05611);
        self.bus.write32(REG_TRMUX_11N, 0x000800e4);
        self.bus.write32(REG_BB_PWR_SAV1_11N, 0x25204200);
        self.iqk_precfg_s1();

        let mut s1_ok = 0;
        for _ in 0..PATH_IQK_RETRY {
            s1_ok = self.iqk_tx_path(&IQK_CFG_S1, backup);
            if s1_ok == IQK_TX_OK {
                result[t][IQK_S1_TX_X] =
                    self.bus.read32_mask(REG_IQK_RES_TX, BIT_MASK_RES_TX) as i32;
                result[t][IQK_S1_TX_Y] =
                    self.bus.read32_mask(REG_IQK_RES_TY, BIT_MASK_RES_TY) as i32;
                break;
            }

            result[t][IQK_S1_TX_X] = 0x100;
            result[t][IQK_S1_TX_Y] = 0x0;
        }

        for _ in 0..PATH_IQK_RETRY {
            s1_ok = self.iqk_rx_path(&IQK_CFG_S1, backup);
            if s1_ok == (IQK_TX_OK | IQK_RX_OK) {
                result[t][IQK_S1_RX_X] =
                    self.bus.read32_mask(REG_IQK_RES_RX, BIT_MASK_RES_RX) as i32;
                result[t][IQK_S1_RX_Y] =
                    self.bus.read32_mask(REG_IQK_RES_RY, BIT_MASK_RES_RY) as i32;
                break;
            }

            result[t][IQK_S1_RX_X] = 0x100;
            result[t][IQK_S1_RX_Y] = 0x0;
        }

        if s1_ok == 0 {
            debug!("path S1 IQK failed");
        }

        self.iqk_precfg_s0();

        let mut s0_ok = 0;
        for _ in 0..PATH_IQK_RETRY {
            s0_ok = self.iqk_tx_path(&IQK_CFG_S0, backup);
            if s0_ok == IQK_TX_OK {
                result[t][IQK_S0_TX_X] =
                    self.bus.read32_mask(REG_IQK_RES_TX, BIT_MASK_RES_TX) as i32;
                result[t][IQK_S0_TX_Y] =
                    self.bus.read32_mask(REG_IQK_RES_TY, BIT_MASK_RES_TY) as i32;
                break;
            }

            result[t][IQK_S0_TX_X] = 0x100;
            result[t][IQK_S0_TX_Y] = 0x0;
        }

        for _ in 0..PATH_IQK_RETRY {
            s0_ok = self.iqk_rx_path(&IQK_CFG_S0, backup);
            if s0_ok == (IQK_TX_OK | IQK_RX_OK) {
                result[t][IQK_S0_RX_X] =
                    self.bus.read32_mask(REG_IQK_RES_RX, BIT_MASK_RES_RX) as i32;
                result[t][IQK_S0_RX_Y] =
                    self.bus.read32_mask(REG_IQK_RES_RY, BIT_MASK_RES_RY) as i32;
                break;
            }

            result[t][IQK_S0_RX_X] = 0x100;
            result[t][IQK_S0_RX_Y] = 0x0;
        }

        if s0_ok == 0 {
            debug!("path S0 IQK failed");
        }

        self.bus
            .write32_mask(REG_FPGA0_IQK_11N, BIT_MASK_IQK_MOD, RST_IQK);
        self.delay.delay_ms(1);
    }

    /// Run the full IQ calibration and program the winning coefficients.
    ///
    /// On total failure (no two rounds agree and no partial hybrid result
    /// exists) the matrices are left untouched and `dm.iqk.done` stays false.
    pub fn phy_calibration(&mut self) {
        let mut result = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        let mut backup = IqkBackup::default();
        let mut final_candidate = None;

        debug!("IQK start");

        self.iqk_backup_path_ctrl(&mut backup);
        self.iqk_backup_lte_path_gnt(&mut backup);
        self.iqk_backup_regs(&mut backup);

        'rounds: for i in 0..=IQK_ROUND_2 {
            self.iqk_config_path_ctrl();
            self.iqk_config_lte_path_gnt();

            self.iqk_one_round(&mut result, i, &backup);

            if i > 0 {
                self.iqk_restore_regs(&backup);
            }
            self.iqk_restore_lte_path_gnt(&backup);
            self.iqk_restore_path_ctrl(&backup);

            for j in 0..i {
                if iqk_similarity_cmp(&mut result, j, i) {
                    final_candidate = Some(j);
                    break 'rounds;
                }
            }
        }

        if final_candidate.is_none()
            && result[IQK_ROUND_HYBRID].iter().sum::<i32>() != 0
        {
            final_candidate = Some(IQK_ROUND_HYBRID);
        }

        if let Some(candidate) = final_candidate {
            self.iqk_fill_s1_matrix(&result[candidate]);
            self.iqk_fill_s0_matrix(&result[candidate]);

            self.dm.iqk.result.s1_x = result[candidate][IQK_S1_TX_X];
            self.dm.iqk.result.s1_y = result[candidate][IQK_S1_TX_Y];
            self.dm.iqk.result.s0_x = result[candidate][IQK_S0_TX_X];
            self.dm.iqk.result.s0_y = result[candidate][IQK_S0_TX_Y];
            self.dm.iqk.done = true;

            debug!("IQK finished, candidate round {}", candidate);
        } else {
            warn!("IQK failed");
        }

        self.bus.write32(REG_BB_SEL_BTG, backup.bb_sel_btg);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{IqkRoundScript, MockBus, NoDelay};
    use crate::dm::Efuse;

    fn device() -> Rtw8723d<MockBus, NoDelay> {
        Rtw8723d::new(MockBus::new(), NoDelay, Efuse::default())
    }

    #[test]
    fn tx_acceptance_window() {
        assert!(iqk_tx_ok(false, 0x110, 0x20));
        assert!(!iqk_tx_ok(true, 0x110, 0x20));
        assert!(!iqk_tx_ok(false, 0x142, 0x20));
        assert!(!iqk_tx_ok(false, 0x110, 0x42));
        // One off the stuck code is a regular result.
        assert!(iqk_tx_ok(false, 0x141, 0x41));
    }

    #[test]
    fn rx_acceptance_window() {
        assert!(iqk_rx_ok(false, 0x100, 0x10));
        assert!(!iqk_rx_ok(true, 0x100, 0x10));
        assert!(!iqk_rx_ok(false, 0x132, 0x10));
        // X boundaries are exclusive.
        assert!(!iqk_rx_ok(false, 0xe6, 0x10));
        assert!(iqk_rx_ok(false, 0xe7, 0x10));
        assert!(iqk_rx_ok(false, 0x119, 0x10));
        assert!(!iqk_rx_ok(false, 0x11a, 0x10));
        // Y is checked on its absolute value after sign extension.
        assert!(!iqk_rx_ok(false, 0x100, 0x36));
        assert!(!iqk_rx_ok(false, 0x100, 0x3ca)); // -0x36
        assert!(iqk_rx_ok(false, 0x100, 0x19));
        assert!(!iqk_rx_ok(false, 0x100, 0x1a));
        assert!(iqk_rx_ok(false, 0x100, 0x3e7)); // -0x19
    }

    #[test]
    fn similarity_accepts_within_tolerance() {
        let mut result = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        result[0] = [0x110, 0x20, 0x100, 0x10, 0x10f, 0x1f, 0xff, 0xf];
        result[1] = [0x115, 0x1b, 0x105, 0x15, 0x10a, 0x24, 0x104, 0x14];
        assert!(iqk_similarity_cmp(&mut result, 0, 1));
    }

    #[test]
    fn similarity_sign_extends_before_comparing() {
        let mut result = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        // 0x3ff is -1 in 10-bit two's complement, close to 0x001.
        result[0] = [0x3ff, 0x3ff, 0x3ff, 0x3ff, 0x3ff, 0x3ff, 0x3ff, 0x3ff];
        result[1] = [0x001, 0x001, 0x001, 0x001, 0x001, 0x001, 0x001, 0x001];
        assert!(iqk_similarity_cmp(&mut result, 0, 1));
    }

    #[test]
    fn similarity_rejects_disagreeing_tx() {
        let mut result = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        result[0] = [0x110, 0x20, 0x100, 0x10, 0x110, 0x20, 0x100, 0x10];
        result[1] = [0x150, 0x20, 0x100, 0x10, 0x110, 0x20, 0x100, 0x10];
        assert!(!iqk_similarity_cmp(&mut result, 0, 1));
        // The agreeing pairs are promoted into the hybrid row.
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S1_TX_X], 0);
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S1_RX_X], 0x100);
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S0_TX_X], 0x110);
    }

    #[test]
    fn similarity_verdict_is_symmetric() {
        let rows = [
            [0x110, 0x20, 0x100, 0x10, 0x110, 0x20, 0x100, 0x10],
            [0x150, 0x60, 0x101, 0x11, 0x111, 0x21, 0x140, 0x50],
        ];
        let mut fwd = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        fwd[0] = rows[0];
        fwd[1] = rows[1];
        let mut rev = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        rev[0] = rows[1];
        rev[1] = rows[0];
        assert!(!iqk_similarity_cmp(&mut fwd, 0, 1));
        assert!(!iqk_similarity_cmp(&mut rev, 0, 1));
        // The same slot pairs are classified dissimilar in both orders, so
        // both hybrid rows carry the agreeing S1 RX and S0 TX pairs of
        // their respective first row.
        assert_eq!(fwd[IQK_ROUND_HYBRID][IQK_S1_RX_X], rows[0][IQK_S1_RX_X]);
        assert_eq!(rev[IQK_ROUND_HYBRID][IQK_S1_RX_X], rows[1][IQK_S1_RX_X]);
        assert_eq!(fwd[IQK_ROUND_HYBRID][IQK_S1_TX_X], 0);
        assert_eq!(rev[IQK_ROUND_HYBRID][IQK_S1_TX_X], 0);
        assert_eq!(fwd[IQK_ROUND_HYBRID][IQK_S0_RX_X], 0);
        assert_eq!(rev[IQK_ROUND_HYBRID][IQK_S0_RX_X], 0);
    }

    #[test]
    fn similarity_promotes_candidate_on_zero_rx() {
        let mut result = [[0i32; IQK_NR]; IQK_ROUND_SIZE];
        // Round 0 never produced an RX result for S1, round 1 did.
        result[0] = [0x110, 0x20, 0x000, 0x00, 0x110, 0x20, 0x100, 0x10];
        result[1] = [0x110, 0x20, 0x100, 0x10, 0x110, 0x20, 0x100, 0x10];
        assert!(!iqk_similarity_cmp(&mut result, 0, 1));
        // The round with the measurement donates its S1 TX pair.
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S1_TX_X], 0x110);
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S1_TX_Y], 0x20);
        // Slots beyond the TX pair stay unclaimed.
        assert_eq!(result[IQK_ROUND_HYBRID][IQK_S1_RX_X], 0);
    }

    fn good_round(tx_x: u32, tx_y: u32, rx_x: u32, rx_y: u32) -> IqkRoundScript {
        IqkRoundScript {
            tx_x,
            tx_y,
            rx_x,
            rx_y,
            tx_fail: false,
            rx_fail: false,
        }
    }

    #[test]
    fn calibration_accepts_two_agreeing_rounds() {
        let mut dev = device();
        dev.bus.preload32(REG_BB_SEL_BTG, 0x99000044);
        dev.bus.iqk_rounds = vec![
            good_round(0x110, 0x20, 0x100, 0x10),
            good_round(0x112, 0x21, 0x101, 0x11),
            good_round(0x200, 0x80, 0xf0, 0x05),
        ];

        dev.phy_calibration();

        assert!(dev.dm.iqk.done);
        assert_eq!(dev.dm.iqk.result.s1_x, 0x110);
        assert_eq!(dev.dm.iqk.result.s1_y, 0x20);
        assert_eq!(dev.dm.iqk.result.s0_x, 0x110);
        // Agreement after round 1 means the third script never ran.
        assert_eq!(dev.bus.one_shots, 2 * 6);
        // The BTG selection is restored on the way out.
        assert_eq!(
            dev.bus.writes32_to(REG_BB_SEL_BTG).last(),
            Some(&0x99000044)
        );
        // RX coefficients landed in the S1 RX matrix.
        assert_eq!(dev.bus.peek32(REG_A_RXIQI) & BIT_MASK_RXIQ_S1_X, 0x100);
    }

    #[test]
    fn calibration_recovers_after_an_outlier_round() {
        let mut dev = device();
        dev.bus.iqk_rounds = vec![
            good_round(0x110, 0x20, 0x100, 0x10),
            good_round(0x130, 0x30, 0x110, 0x00),
            good_round(0x110, 0x20, 0x100, 0x10),
        ];

        dev.phy_calibration();

        // Round 1 disagrees with round 0 everywhere; round 2 matches round
        // 0, which wins as the earlier of the pair.
        assert!(dev.dm.iqk.done);
        assert_eq!(dev.dm.iqk.result.s1_x, 0x110);
        assert_eq!(dev.dm.iqk.result.s1_y, 0x20);
        assert_eq!(dev.bus.one_shots, 3 * 6);
    }

    #[test]
    fn calibration_fails_when_rounds_disagree() {
        let mut dev = device();
        dev.bus.preload32(REG_BB_SEL_BTG, 0x99000044);
        dev.bus.iqk_rounds = vec![
            good_round(0x110, 0x20, 0x100, 0x00),
            good_round(0x120, 0x30, 0x110, 0x10),
            good_round(0x130, 0x10, 0xf0, 0x19),
        ];

        dev.phy_calibration();

        assert!(!dev.dm.iqk.done);
        // All three rounds ran to the end.
        assert_eq!(dev.bus.one_shots, 3 * 6);
        // No coefficients were programmed but the BTG selection came back.
        assert_eq!(dev.bus.peek32(REG_A_RXIQI) & BIT_MASK_RXIQ_S1_X, 0);
        assert_eq!(
            dev.bus.writes32_to(REG_BB_SEL_BTG).last(),
            Some(&0x99000044)
        );
    }

    #[test]
    fn failed_measurements_leave_sentinel() {
        let mut dev = device();
        // Everything fails; each path retries twice.
        dev.bus.iqk_rounds = vec![
            IqkRoundScript {
                tx_fail: true,
                rx_fail: true,
                ..Default::default()
            };
            3
        ];

        dev.phy_calibration();

        assert!(!dev.dm.iqk.done);
        // TX and RX measurements of both paths fail twice per round,
        // with RX step 2 never reached.
        assert_eq!(dev.bus.one_shots, 3 * 2 * 4);
    }
}
