//! Register map of the RTL8723D.
//!
//! Addresses and field layouts are chip-internal ABI and are reproduced as
//! literal constants. MAC registers are byte addressed, baseband registers
//! are 32-bit, RF registers are 20-bit sub-registers accessed through the
//! SIPI interface with an explicit bitmask.

pub const MASKBYTE0: u32 = 0x0000_00ff;
pub const MASKBYTE3: u32 = 0xff00_0000;
pub const MASKH4BITS: u32 = 0xf000_0000;
pub const MASKDWORD: u32 = 0xffff_ffff;
/// All 20 bits of an RF sub-register.
pub const RFREG_MASK: u32 = 0x000f_ffff;

// System / MAC registers.
pub const REG_SYS_FUNC_EN: u32 = 0x0002;
pub const BIT_FEN_BB_RSTB: u16 = 1 << 0;
pub const BIT_FEN_BB_GLB_RST: u16 = 1 << 1;
pub const BIT_FEN_ELDR: u16 = 1 << 12;
pub const BIT_FEN_EN_25_1: u16 = 1 << 13;
pub const REG_SYS_CLKR: u32 = 0x0008;
pub const BIT_ANA8M: u16 = 1 << 1;
pub const BIT_WAKEPAD_EN: u16 = 1 << 3;
pub const BIT_LOADER_CLK_EN: u16 = 1 << 5;
pub const REG_RF_CTRL: u32 = 0x001f;
pub const BIT_RF_EN: u8 = 1 << 0;
pub const BIT_RF_RSTB: u8 = 1 << 1;
pub const BIT_RF_SDM_RSTB: u8 = 1 << 2;
pub const REG_AFE_CTRL1: u32 = 0x0024;
pub const BITS_PLL: u32 = 0xf0;
pub const REG_AFE_CTRL3: u32 = 0x002c;
pub const BIT_MASK_XTAL: u32 = 0x00fff000;
pub const BIT_XTAL_GMP_BIT4: u32 = 1 << 28;
pub const REG_LDO_EFUSE_CTRL: u32 = 0x0034;
pub const BIT_MASK_LDO25_VOLTAGE: u8 = 0x70;
pub const BIT_LDO25_VOLTAGE_V25: u8 = 0x7;
pub const BIT_LDO25_EN: u8 = 1 << 7;
pub const REG_GPIO_MUXCFG: u32 = 0x0040;
pub const BIT_EN_SIC: u16 = 1 << 12;
pub const REG_PAD_CTRL1: u32 = 0x0064;
pub const BIT_BT_BTG_SEL: u32 = 1 << 31;
pub const REG_BTG_SEL: u32 = 0x0067;
pub const REG_LTECOEX_PATH_CONTROL: u32 = 0x0070;
pub const BIT_LTE_MUX_CTRL_PATH: u32 = 1 << 26;
pub const REG_HCI_OPT_CTRL: u32 = 0x0074;
pub const BIT_USB_SUS_DIS: u16 = 1 << 8;
pub const REG_AFE_CTRL_4: u32 = 0x0078;
pub const BIT_CK320M_AFE_EN: u16 = 1 << 14;
pub const BIT_EN_SYN: u16 = 1 << 15;
pub const REG_LDO_SWR_CTRL: u32 = 0x007c;
pub const BIT_XTA0: u32 = 1 << 28;
pub const BIT_XTA1: u32 = 1 << 29;
pub const REG_EFUSE_ACCESS: u32 = 0x00cf;
pub const EFUSE_ACCESS_ON: u8 = 0x69;
pub const EFUSE_ACCESS_OFF: u8 = 0x00;
pub const REG_CR: u32 = 0x0100;
pub const REG_MISC_CTRL: u32 = 0x0120;
pub const BIT_DIS_SECOND_CCA: u8 = 1 << 1;
pub const REG_MCUTST_1: u32 = 0x01c4;
pub const REG_TXDMA_OFFSET_CHK: u32 = 0x020c;
pub const BIT_DROP_DATA_EN: u16 = 1 << 9;
pub const REG_INT_MIG: u32 = 0x0304;
pub const REG_FWHW_TXQ_CTRL: u32 = 0x0420;
pub const REG_HWSEQ_CTRL: u32 = 0x0423;
pub const REG_RETRY_LIMIT: u32 = 0x042a;
pub const REG_CTX: u32 = 0x043b;
pub const BIT_MASK_CTX_TYPE: u8 = 0x70;
pub const REG_AMPDU_MAX_TIME: u32 = 0x0456;
pub const REG_SINGLE_AMPDU_CTRL: u32 = 0x04c7;
pub const BIT_EN_SINGLE_APMDU: u8 = 1 << 7;
pub const REG_MAX_AGGR_NUM: u32 = 0x04ca;
pub const REG_BAR_MODE_CTRL: u32 = 0x04cc;
pub const REG_RX_PKT_LIMIT: u32 = 0x04ce;
pub const REG_LEDCFG2: u32 = 0x04e2;
pub const REG_SLOT: u32 = 0x0508;
pub const REG_PIFS: u32 = 0x0512;
pub const REG_SIFS: u32 = 0x0514;
pub const REG_AGGR_BREAK_TIME: u32 = 0x051a;
pub const REG_TXPAUSE: u32 = 0x0522;
pub const REG_TBTT_PROHIBIT: u32 = 0x0540;
pub const REG_BCN_CTRL: u32 = 0x0550;
pub const BIT_EN_TXBCN_RPT: u8 = 1 << 2;
pub const BIT_EN_BCN_FUNCTION: u8 = 1 << 3;
pub const BIT_DIS_TSF_UDT: u8 = 1 << 4;
pub const REG_ATIMWND: u32 = 0x055a;
pub const REG_HIQ_NO_LMT_EN: u32 = 0x05a7;
pub const BIT_HIQ_NO_LMT_EN_ROOT: u8 = 1 << 0;
pub const REG_TCR: u32 = 0x0604;
pub const BIT_CFENDFORM: u32 = 1 << 9;
pub const BIT_WMAC_TCR_ERR0: u32 = 1 << 12;
pub const BIT_WMAC_TCR_ERR1: u32 = 1 << 13;
pub const REG_RCR: u32 = 0x0608;
pub const BIT_RCR_ADF: u32 = 1 << 11;
pub const REG_MAC_SPEC_SIFS: u32 = 0x063a;
pub const REG_NAV_PROT_LEN: u32 = 0x0640;
pub const REG_RXFLTMAP0: u32 = 0x06a0;
pub const REG_RXFLTMAP1: u32 = 0x06a2;
pub const REG_RXFLTMAP2: u32 = 0x06a4;
pub const REG_LTR_IDLE_LATENCY: u32 = 0x0798;
pub const REG_LTR_ACTIVE_LATENCY: u32 = 0x079c;
pub const REG_LTR_CTRL_BASIC: u32 = 0x07a4;
pub const REG_LTECOEX_CTRL: u32 = 0x07c0;
pub const REG_LTECOEX_WRITE_DATA: u32 = 0x07c4;
pub const REG_LTECOEX_READ_DATA: u32 = 0x07c8;
pub const REG_2ND_CCA_CTRL: u32 = 0x0976;

// Baseband registers.
pub const REG_FPGA0_RFMOD: u32 = 0x0800;
pub const BIT_CCKEN: u32 = 1 << 24;
pub const BIT_OFDMEN: u32 = 1 << 25;
pub const BIT_MASK_RFMOD: u32 = 1 << 0;
pub const REG_PSDFN: u32 = 0x0808;
pub const REG_ANALOG_P4: u32 = 0x088c;
pub const REG_PSDRPT: u32 = 0x08b4;
pub const REG_FPGA1_RFMOD: u32 = 0x0900;
pub const REG_BB_SEL_BTG: u32 = 0x0948;
pub const REG_BBRX_DFIR: u32 = 0x0954;
pub const BIT_RXBB_DFIR_EN: u32 = 1 << 19;
pub const BIT_MASK_RXBB_DFIR: u32 = 0x0f00_0000;
pub const REG_CCK0_SYS: u32 = 0x0a00;
pub const BIT_CCK_SIDE_BAND: u32 = 1 << 4;
pub const REG_CCK_ANT_SEL_11N: u32 = 0x0a04;
pub const REG_CCK_FA_RST_11N: u32 = 0x0a2c;
pub const REG_CCK_FA_MSB_11N: u32 = 0x0a58;
pub const REG_CCK_FA_LSB_11N: u32 = 0x0a5c;
pub const REG_CCK_CCA_CNT_11N: u32 = 0x0a60;
pub const REG_CCK0_TX_FILTER2: u32 = 0x0ab4;
pub const BIT_MASK_CCK_SWING: u32 = 0x0000_07ff;
pub const REG_BB_PWR_SAV1_11N: u32 = 0x0874;
pub const REG_OFDM_FA_HOLDC_11N: u32 = 0x0c00;
pub const REG_BB_RX_PATH_11N: u32 = 0x0c04;
pub const REG_TRMUX_11N: u32 = 0x0c08;
pub const REG_OFDM_FA_RSTC_11N: u32 = 0x0c0c;
pub const REG_A_RXIQI: u32 = 0x0c14;
pub const BIT_MASK_RXIQ_S1_X: u32 = 0x0000_03ff;
pub const BIT_MASK_RXIQ_S1_Y1: u32 = 0x0000_fc00;
pub const REG_OFDM0_RXDSP: u32 = 0x0c40;
pub const BIT_MASK_RXDSP: u32 = 0x1f00_0000;
pub const BIT_EN_RXDSP: u32 = 1 << 9;
pub const REG_OFDM_0_ECCA_THRESHOLD: u32 = 0x0c4c;
pub const BIT_MASK_OFDM0_EXT_A: u32 = 1 << 31;
pub const BIT_MASK_OFDM0_EXT_C: u32 = 1 << 29;
pub const BIT_MASK_OFDM0_EXT_D: u32 = 1 << 28;
pub const BIT_MASK_OFDM0_EXTS: u32 = (1 << 31) | (1 << 29) | (1 << 28);
pub const REG_OFDM0_XAAGC1: u32 = 0x0c50;
pub const REG_OFDM0_XBAGC1: u32 = 0x0c58;
pub const REG_OFDM_0_XA_TX_IQ_IMBALANCE: u32 = 0x0c80;
pub const BIT_MASK_TXIQ_ELM_A: u32 = 0x0000_03ff;
pub const BIT_MASK_TXIQ_ELM_C: u32 = 0x003f_0000;
pub const BIT_MASK_TXIQ_ELM_D: u32 = 0xffc0_0000;
pub const REG_TXIQK_MATRIXA_LSB2_11N: u32 = 0x0c94;
pub const REG_RXIQK_MATRIX_LSB_11N: u32 = 0x0ca0;
pub const BIT_MASK_RXIQ_S1_Y2: u32 = 0xf000_0000;
pub const REG_TXIQ_AB_S0: u32 = 0x0cd0;
pub const BIT_MASK_TXIQ_A_EXT_S0: u32 = 1 << 0;
pub const BIT_MASK_TXIQ_A_S0: u32 = 0x0000_07fe;
pub const BIT_MASK_TXIQ_B_S0: u32 = 0x0001_f800;
pub const REG_TXIQ_CD_S0: u32 = 0x0cd4;
pub const BIT_MASK_TXIQ_C_EXT_S0: u32 = 1 << 0;
pub const BIT_MASK_TXIQ_C_S0: u32 = 0x0000_07fe;
pub const BIT_MASK_TXIQ_D_EXT_S0: u32 = 1 << 11;
pub const BIT_MASK_TXIQ_D_S0: u32 = 0x003f_f000;
pub const REG_RXIQ_AB_S0: u32 = 0x0cd8;
pub const BIT_MASK_RXIQ_X_S0: u32 = 0x0000_03ff;
pub const BIT_MASK_RXIQ_Y_S0: u32 = 0x003f_f000;
pub const REG_OFDM_FA_TYPE1_11N: u32 = 0x0cf0;
pub const REG_OFDM_FA_RSTD_11N: u32 = 0x0d00;
pub const REG_OFDM1_CFOTRK: u32 = 0x0d2c;
pub const BIT_EN_CFOTRK: u32 = 1 << 28;
pub const REG_OFDM1_CSI1: u32 = 0x0d40;
pub const REG_OFDM1_CSI2: u32 = 0x0d44;
pub const REG_OFDM1_CSI3: u32 = 0x0d48;
pub const REG_OFDM1_CSI4: u32 = 0x0d4c;
pub const REG_OFDM_FA_TYPE2_11N: u32 = 0x0da0;
pub const REG_OFDM_FA_TYPE3_11N: u32 = 0x0da4;
pub const REG_OFDM_FA_TYPE4_11N: u32 = 0x0da8;
pub const REG_PAGE_F_RST_11N: u32 = 0x0f14;
pub const REG_IGI_C_11N: u32 = 0x0f84;
pub const REG_IGI_D_11N: u32 = 0x0f88;
pub const REG_HT_CRC32_CNT_11N: u32 = 0x0f90;
pub const REG_OFDM_CRC32_CNT_11N: u32 = 0x0f94;

// TX AGC.
pub const REG_TXAGC_B_CCK11_A_CCK2_11: u32 = 0x086c;
pub const REG_TXAGC_A_RATE18_06: u32 = 0x0e00;
pub const REG_TXAGC_A_RATE54_24: u32 = 0x0e04;
pub const REG_TXAGC_A_CCK1_MCS32: u32 = 0x0e08;
pub const REG_TXAGC_A_MCS03_MCS00: u32 = 0x0e10;
pub const REG_TXAGC_A_MCS07_MCS04: u32 = 0x0e14;

// IQK one-shot and result registers (11n generation baseband).
pub const REG_FPGA0_IQK_11N: u32 = 0x0e28;
pub const BIT_MASK_IQK_MOD: u32 = 0xffff_ff00;
pub const EN_IQK: u32 = 0x808000;
pub const RST_IQK: u32 = 0x000000;
pub const REG_TXIQK_TONE_A_11N: u32 = 0x0e30;
pub const REG_RXIQK_TONE_A_11N: u32 = 0x0e34;
pub const REG_TXIQK_PI_A_11N: u32 = 0x0e38;
pub const REG_RXIQK_PI_A_11N: u32 = 0x0e3c;
pub const REG_TXIQK_11N: u32 = 0x0e40;
pub const REG_RXIQK_11N: u32 = 0x0e44;
pub const REG_IQK_AGC_PTS_11N: u32 = 0x0e48;
pub const REG_IQK_AGC_RSP_11N: u32 = 0x0e4c;
pub const REG_TX_IQK_TONE_B: u32 = 0x0e50;
pub const REG_RX_IQK_TONE_B: u32 = 0x0e54;
pub const REG_IQK_RES_TX: u32 = 0x0e94;
pub const BIT_MASK_RES_TX: u32 = 0x03ff_0000;
pub const REG_IQK_RES_TY: u32 = 0x0e9c;
pub const BIT_MASK_RES_TY: u32 = 0x03ff_0000;
pub const REG_IQK_RES_RX: u32 = 0x0ea4;
pub const BIT_MASK_RES_RX: u32 = 0x03ff_0000;
pub const REG_IQK_RES_RY: u32 = 0x0eac;
pub const BIT_IQK_TX_FAIL: u32 = 1 << 28;
pub const BIT_IQK_RX_FAIL: u32 = 1 << 27;
pub const BIT_IQK_DONE: u32 = 1 << 26;
pub const BIT_MASK_RES_RY: u32 = 0x03ff_0000;

// RF sub-registers.
pub const RF_MODE: u32 = 0x00;
pub const RF_WLINT: u32 = 0x01;
pub const RF_WLSEL: u32 = 0x02;
pub const RF_CFGCH: u32 = 0x18;
pub const BIT_LCK: u32 = 1 << 15;
pub const RF_BSPAD: u32 = 0x2e;
pub const RF_GAINTX: u32 = 0x31;
pub const RF_LUTWA: u32 = 0x33;
pub const RF_LUTWD1: u32 = 0x3e;
pub const RF_LUTWD0: u32 = 0x3f;
pub const RF_T_METER: u32 = 0x42;
pub const RF_RXIQGEN: u32 = 0x43;
pub const RF_TXATANK: u32 = 0x64;
pub const RF_TRXIQ: u32 = 0x66;
pub const RF_TXADBG: u32 = 0xde;
pub const RF_LUTDBG: u32 = 0xdf;
pub const RF_LUTWE2: u32 = 0xed;
pub const RF_LUTWE: u32 = 0xee;

// Field packing helpers for the IQ imbalance matrices.

/// High four bits of the 10-bit C element, written to 0xc94[31:28].
pub const fn txiq_elm_c1(c: i32) -> u32 {
    ((c as u32) & 0x3c0) >> 6
}

/// Low six bits of the 10-bit C element, written to 0xc80[21:16].
pub const fn txiq_elm_c2(c: i32) -> u32 {
    (c as u32) & 0x3f
}

/// Pack elements A, C (low part) and D into the S1 TX IQ imbalance word.
pub const fn txiq_elm_acd(a: i32, c: i32, d: i32) -> u32 {
    ((a as u32) & 0x3ff) | (((c as u32) & 0x3f) << 16) | (((d as u32) & 0x3ff) << 22)
}

/// Pack the three one-bit coefficient extensions into 0xc4c.
pub const fn ofdm0_exts(a_ext: i32, c_ext: i32, d_ext: i32) -> u32 {
    (((a_ext as u32) & 0x1) << 31) | (((c_ext as u32) & 0x1) << 29) | (((d_ext as u32) & 0x1) << 28)
}

/// High six bits of the 10-bit S1 RX Y element, for 0xc14[15:10].
pub const fn rxiq_s1_y1(y: i32) -> u32 {
    ((y as u32) >> 4) & 0x3f
}

/// Low four bits of the 10-bit S1 RX Y element, for 0xca0[31:28].
pub const fn rxiq_s1_y2(y: i32) -> u32 {
    (y as u32) & 0xf
}

/// Composite TXIQK coefficient word fed back between the two RX IQK steps.
pub const fn txiqk_11n(tx_x: u32, tx_y: u32) -> u32 {
    0x8000_7c00 | ((tx_x & 0x3ff) << 16) | (tx_y & 0x3ff)
}
