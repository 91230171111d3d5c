//! Static chip description data.
//!
//! Swing tables, thermal compensation tables, the per-rate TXAGC register
//! map and the power-on/off command sequences. The numeric content is
//! factory characterization data for the RTL8723D and must not be edited.

use crate::rate::{DescRate, DESC_RATE_NUM};

pub const OFDM_SWING_TABLE_SIZE: usize = 43;
pub const CCK_SWING_TABLE_SIZE: usize = 41;
/// Index written when no thermal offset applies (0 dB gain).
pub const DEF_OFDM_SWING_INDEX: usize = 28;
pub const DEF_CCK_SWING_INDEX: usize = 28;
pub const PWRTRACK_TBL_SIZE: usize = 30;

/// OFDM gain words. Bits [9:0] element A, [15:10] element B, [21:16]
/// element C, [31:22] element D.
pub static OFDM_SWING_TABLE: [u32; OFDM_SWING_TABLE_SIZE] = [
    0x0b40002d, 0x0c000030, 0x0cc00033, 0x0d800036, 0x0e400039, 0x0f00003c,
    0x10000040, 0x11000044, 0x12000048, 0x1300004c, 0x14400051, 0x15800056,
    0x16c0005b, 0x18000060, 0x19800066, 0x1b00006c, 0x1c800072, 0x1e400079,
    0x20000080, 0x22000088, 0x24000090, 0x26000098, 0x288000a2, 0x2ac000ab,
    0x2d4000b5, 0x300000c0, 0x32c000cb, 0x35c000d7, 0x390000e4, 0x3c8000f2,
    0x40000100, 0x43c0010f, 0x47c0011f, 0x4c000130, 0x50800142, 0x55400155,
    0x5a400169, 0x5fc0017f, 0x65400195, 0x6b8001ae, 0x71c001c7, 0x788001e2,
    0x7f8001fe,
];

pub const fn ofdm_swing_a(swing: u32) -> u32 {
    swing & 0x0000_03ff
}

pub const fn ofdm_swing_b(swing: u32) -> u32 {
    (swing & 0x0000_fc00) >> 10
}

pub const fn ofdm_swing_c(swing: u32) -> u32 {
    (swing & 0x003f_0000) >> 16
}

pub const fn ofdm_swing_d(swing: u32) -> u32 {
    (swing & 0xffc0_0000) >> 22
}

/// CCK TX filter gain values, 11 bits each.
pub static CCK_SWING_TABLE: [u32; CCK_SWING_TABLE_SIZE] = [
    0x0CD, 0x0D9, 0x0E6, 0x0F3, 0x102, 0x111, 0x121, 0x132, 0x144, 0x158,
    0x16C, 0x182, 0x198, 0x1B1, 0x1CA, 0x1E5, 0x202, 0x221, 0x241, 0x263,
    0x287, 0x2AE, 0x2D6, 0x301, 0x32F, 0x35F, 0x392, 0x3C9, 0x402, 0x43F,
    0x47F, 0x4C3, 0x50C, 0x558, 0x5A9, 0x5FF, 0x65A, 0x6BA, 0x720, 0x78C,
    0x7FF,
];

// Thermal-delta to power-index compensation, indexed by the absolute
// difference between the averaged and the factory thermal reading. The _p
// tables apply when the chip runs hotter than at characterization, the _n
// tables when it runs cooler.

static PWRTRK_2GB_N: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 1, 2, 2, 3, 4, 4, 4, 4, 5, 5, 5,
    6, 6, 7, 7, 8, 8, 8, 9, 9, 9, 10, 10, 10, 10, 10,
];

static PWRTRK_2GB_P: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 2, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7,
    7, 8, 8, 8, 9, 9, 10, 10, 10, 10, 10, 10, 10, 10, 10,
];

static PWRTRK_2GA_N: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 1, 2, 2, 3, 4, 4, 4, 4, 5, 5, 5,
    6, 6, 7, 7, 8, 8, 8, 9, 9, 9, 10, 10, 10, 10, 10,
];

static PWRTRK_2GA_P: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 2, 2, 2, 3, 3, 4, 4, 5, 5, 6, 7,
    7, 8, 8, 8, 9, 9, 10, 10, 10, 10, 10, 10, 10, 10, 10,
];

static PWRTRK_2G_CCK_B_N: [u8; PWRTRACK_TBL_SIZE] = [
    0, 1, 1, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6,
    6, 7, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 11, 11, 11,
];

static PWRTRK_2G_CCK_B_P: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7,
    7, 8, 9, 9, 10, 10, 11, 11, 11, 11, 11, 11, 11, 11, 11,
];

static PWRTRK_2G_CCK_A_N: [u8; PWRTRACK_TBL_SIZE] = [
    0, 1, 1, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6,
    6, 7, 7, 7, 8, 8, 9, 9, 10, 10, 11, 11, 11, 11, 11,
];

static PWRTRK_2G_CCK_A_P: [u8; PWRTRACK_TBL_SIZE] = [
    0, 0, 1, 1, 2, 2, 3, 3, 4, 4, 5, 5, 6, 6, 7,
    7, 8, 9, 9, 10, 10, 11, 11, 11, 11, 11, 11, 11, 11, 11,
];

static PWRTRK_XTAL_N: [i8; PWRTRACK_TBL_SIZE] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
];

static PWRTRK_XTAL_P: [i8; PWRTRACK_TBL_SIZE] = [
    0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0,
    0, -10, -12, -14, -16, -16, -16, -16, -16, -16, -16, -16, -16, -16, -16,
];

/// Thermal compensation table bundle for one chip.
pub struct PwrTrackTbl {
    pub pwrtrk_2gb_n: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2gb_p: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2ga_n: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2ga_p: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2g_cckb_n: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2g_cckb_p: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2g_ccka_n: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_2g_ccka_p: &'static [u8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_xtal_n: &'static [i8; PWRTRACK_TBL_SIZE],
    pub pwrtrk_xtal_p: &'static [i8; PWRTRACK_TBL_SIZE],
}

pub static PWR_TRACK_TBL: PwrTrackTbl = PwrTrackTbl {
    pwrtrk_2gb_n: &PWRTRK_2GB_N,
    pwrtrk_2gb_p: &PWRTRK_2GB_P,
    pwrtrk_2ga_n: &PWRTRK_2GA_N,
    pwrtrk_2ga_p: &PWRTRK_2GA_P,
    pwrtrk_2g_cckb_n: &PWRTRK_2G_CCK_B_N,
    pwrtrk_2g_cckb_p: &PWRTRK_2G_CCK_B_P,
    pwrtrk_2g_ccka_n: &PWRTRK_2G_CCK_A_N,
    pwrtrk_2g_ccka_p: &PWRTRK_2G_CCK_A_P,
    pwrtrk_xtal_n: &PWRTRK_XTAL_N,
    pwrtrk_xtal_p: &PWRTRK_XTAL_P,
};

/// Per-path positive/negative table selection resolved for the current band.
pub struct SwingTable {
    pub n: [&'static [u8; PWRTRACK_TBL_SIZE]; 2],
    pub p: [&'static [u8; PWRTRACK_TBL_SIZE]; 2],
}

/// A register field, address plus mask.
#[derive(Clone, Copy, Debug)]
pub struct HwReg {
    pub addr: u32,
    pub mask: u32,
}

/// TXAGC destination per rate; four 8-bit power indexes share each word.
pub static TXAGC: [HwReg; DESC_RATE_NUM] = [
    HwReg { addr: 0xe08, mask: 0x0000ff00 }, // 1M
    HwReg { addr: 0x86c, mask: 0x0000ff00 }, // 2M
    HwReg { addr: 0x86c, mask: 0x00ff0000 }, // 5.5M
    HwReg { addr: 0x86c, mask: 0xff000000 }, // 11M
    HwReg { addr: 0xe00, mask: 0x000000ff }, // 6M
    HwReg { addr: 0xe00, mask: 0x0000ff00 }, // 9M
    HwReg { addr: 0xe00, mask: 0x00ff0000 }, // 12M
    HwReg { addr: 0xe00, mask: 0xff000000 }, // 18M
    HwReg { addr: 0xe04, mask: 0x000000ff }, // 24M
    HwReg { addr: 0xe04, mask: 0x0000ff00 }, // 36M
    HwReg { addr: 0xe04, mask: 0x00ff0000 }, // 48M
    HwReg { addr: 0xe04, mask: 0xff000000 }, // 54M
    HwReg { addr: 0xe10, mask: 0x000000ff }, // MCS0
    HwReg { addr: 0xe10, mask: 0x0000ff00 }, // MCS1
    HwReg { addr: 0xe10, mask: 0x00ff0000 }, // MCS2
    HwReg { addr: 0xe10, mask: 0xff000000 }, // MCS3
    HwReg { addr: 0xe14, mask: 0x000000ff }, // MCS4
    HwReg { addr: 0xe14, mask: 0x0000ff00 }, // MCS5
    HwReg { addr: 0xe14, mask: 0x00ff0000 }, // MCS6
    HwReg { addr: 0xe14, mask: 0xff000000 }, // MCS7
];

/// Rate sections in TXAGC programming order.
pub static RATE_SECTIONS: [&[DescRate]; 3] = [
    &[
        DescRate::Rate1M,
        DescRate::Rate2M,
        DescRate::Rate5_5M,
        DescRate::Rate11M,
    ],
    &[
        DescRate::Rate6M,
        DescRate::Rate9M,
        DescRate::Rate12M,
        DescRate::Rate18M,
        DescRate::Rate24M,
        DescRate::Rate36M,
        DescRate::Rate48M,
        DescRate::Rate54M,
    ],
    &[
        DescRate::Mcs0,
        DescRate::Mcs1,
        DescRate::Mcs2,
        DescRate::Mcs3,
        DescRate::Mcs4,
        DescRate::Mcs5,
        DescRate::Mcs6,
        DescRate::Mcs7,
    ],
];

/// CCK DFIR coefficient set, selected by channel (<= 13 vs 14).
pub static CCK_DFIR_CFG: [[HwRegVal; 3]; 2] = [
    [
        HwRegVal { reg: 0x0a24, val: 0x64b80c1c },
        HwRegVal { reg: 0x0a28, val: 0x00008810 },
        HwRegVal { reg: 0x0aac, val: 0x01235667 },
    ],
    [
        HwRegVal { reg: 0x0a24, val: 0x0000b81c },
        HwRegVal { reg: 0x0a28, val: 0x00000000 },
        HwRegVal { reg: 0x0aac, val: 0x00003667 },
    ],
];

#[derive(Clone, Copy, Debug)]
pub struct HwRegVal {
    pub reg: u32,
    pub val: u32,
}

// Power sequence command tables. These are data for the host's sequence
// executor; the interface masks select which entries apply to the bus the
// chip actually sits on.

pub const PWR_CUT_TEST_MSK: u8 = 1 << 0;
pub const PWR_CUT_ALL_MSK: u8 = 0xff;
pub const PWR_INTF_SDIO_MSK: u8 = 1 << 0;
pub const PWR_INTF_USB_MSK: u8 = 1 << 1;
pub const PWR_INTF_PCI_MSK: u8 = 1 << 2;
pub const PWR_INTF_ALL_MSK: u8 = 0x0f;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwrAddrBase {
    Mac,
    Sdio,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PwrCmd {
    Write,
    Polling,
    DelayUs,
    DelayMs,
    End,
}

#[derive(Clone, Copy, Debug)]
pub struct PwrSeqCmd {
    pub offset: u16,
    pub cut_mask: u8,
    pub intf_mask: u8,
    pub base: PwrAddrBase,
    pub cmd: PwrCmd,
    pub mask: u8,
    pub value: u8,
}

const fn pwr_cmd(
    offset: u16,
    cut_mask: u8,
    intf_mask: u8,
    base: PwrAddrBase,
    cmd: PwrCmd,
    mask: u8,
    value: u8,
) -> PwrSeqCmd {
    PwrSeqCmd { offset, cut_mask, intf_mask, base, cmd, mask, value }
}

use PwrAddrBase::{Mac, Sdio};
use PwrCmd::{DelayMs, DelayUs, End, Polling, Write};

static TRANS_CARDDIS_TO_CARDEMU: [PwrSeqCmd; 8] = [
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 3 | 1 << 7, 0),
    pwr_cmd(0x0086, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Sdio, Write, 1 << 0, 0),
    pwr_cmd(0x0086, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Sdio, Polling, 1 << 1, 1 << 1),
    pwr_cmd(0x004a, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 3 | 1 << 4, 0),
    pwr_cmd(0x0023, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Mac, Write, 1 << 4, 0),
    pwr_cmd(0x0301, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 0xff, 0),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_CARDEMU_TO_ACT: [PwrSeqCmd; 26] = [
    pwr_cmd(0x0020, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0001, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, DelayMs, 1, 0),
    pwr_cmd(0x0000, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, Write, 1 << 5, 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 4 | 1 << 3 | 1 << 2, 0),
    pwr_cmd(0x0075, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0006, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 1 << 1, 1 << 1),
    pwr_cmd(0x0075, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0x0006, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 1 << 1 | 1 << 0, 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 7, 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 4 | 1 << 3, 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 1 << 0, 0),
    pwr_cmd(0x0010, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 6, 1 << 6),
    pwr_cmd(0x0049, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 1 << 1),
    pwr_cmd(0x0063, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 1 << 1),
    pwr_cmd(0x0062, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 0),
    pwr_cmd(0x0058, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x005a, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 1 << 1),
    pwr_cmd(0x0068, PWR_CUT_TEST_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 3, 1 << 3),
    pwr_cmd(0x0069, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 6, 1 << 6),
    pwr_cmd(0x001f, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x00),
    pwr_cmd(0x0077, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x00),
    pwr_cmd(0x001f, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x07),
    pwr_cmd(0x0077, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x07),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_ACT_TO_LPS: [PwrSeqCmd; 14] = [
    pwr_cmd(0x0301, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 0xff, 0xff),
    pwr_cmd(0x0522, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0xff),
    pwr_cmd(0x05f8, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 0xff, 0),
    pwr_cmd(0x05f9, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 0xff, 0),
    pwr_cmd(0x05fa, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 0xff, 0),
    pwr_cmd(0x05fb, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 0xff, 0),
    pwr_cmd(0x0002, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0x0002, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, DelayUs, 0, 0),
    pwr_cmd(0x0002, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 0),
    pwr_cmd(0x0100, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x03),
    pwr_cmd(0x0101, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 0),
    pwr_cmd(0x0093, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Mac, Write, 0xff, 0x00),
    pwr_cmd(0x0553, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 5, 1 << 5),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_ACT_TO_PRE_CARDDIS: [PwrSeqCmd; 3] = [
    pwr_cmd(0x0003, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 2, 0),
    pwr_cmd(0x0080, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_ACT_TO_CARDEMU: [PwrSeqCmd; 9] = [
    pwr_cmd(0x0002, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0x0049, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 0),
    pwr_cmd(0x0006, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 1, 1 << 1),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Polling, 1 << 1, 0),
    pwr_cmd(0x0010, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 6, 0),
    pwr_cmd(0x0000, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, Write, 1 << 5, 1 << 5),
    pwr_cmd(0x0020, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_CARDEMU_TO_CARDDIS: [PwrSeqCmd; 9] = [
    pwr_cmd(0x0007, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Mac, Write, 0xff, 0x20),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK | PWR_INTF_SDIO_MSK, Mac, Write, 1 << 3 | 1 << 4, 1 << 3),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 1 << 2, 1 << 2),
    pwr_cmd(0x0005, PWR_CUT_ALL_MSK, PWR_INTF_PCI_MSK, Mac, Write, 1 << 3 | 1 << 4, 1 << 3 | 1 << 4),
    pwr_cmd(0x004a, PWR_CUT_ALL_MSK, PWR_INTF_USB_MSK, Mac, Write, 1 << 0, 1),
    pwr_cmd(0x0023, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Mac, Write, 1 << 4, 1 << 4),
    pwr_cmd(0x0086, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Sdio, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x0086, PWR_CUT_ALL_MSK, PWR_INTF_SDIO_MSK, Sdio, Polling, 1 << 1, 0),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

static TRANS_ACT_TO_POST_CARDDIS: [PwrSeqCmd; 4] = [
    pwr_cmd(0x001d, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 0),
    pwr_cmd(0x001d, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 1 << 0, 1 << 0),
    pwr_cmd(0x001c, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, Write, 0xff, 0x0e),
    pwr_cmd(0xffff, PWR_CUT_ALL_MSK, PWR_INTF_ALL_MSK, Mac, End, 0, 0),
];

pub static CARD_ENABLE_FLOW: [&[PwrSeqCmd]; 2] =
    [&TRANS_CARDDIS_TO_CARDEMU, &TRANS_CARDEMU_TO_ACT];

pub static CARD_DISABLE_FLOW: [&[PwrSeqCmd]; 5] = [
    &TRANS_ACT_TO_LPS,
    &TRANS_ACT_TO_PRE_CARDDIS,
    &TRANS_ACT_TO_CARDEMU,
    &TRANS_CARDEMU_TO_CARDDIS,
    &TRANS_ACT_TO_POST_CARDDIS,
];

/// Compile-time chip description.
pub struct ChipInfo {
    pub rx_pkt_desc_sz: usize,
    pub rf_path_num: usize,
    pub max_power_index: u8,
    pub dig_min: u8,
    /// Thermal drift (in meter units) that forces an IQ recalibration.
    pub iqk_threshold: u8,
    pub pwr_track_tbl: &'static PwrTrackTbl,
    pub pwr_on_seq: &'static [&'static [PwrSeqCmd]],
    pub pwr_off_seq: &'static [&'static [PwrSeqCmd]],
}

pub static RTW8723D: ChipInfo = ChipInfo {
    rx_pkt_desc_sz: 24,
    rf_path_num: 1,
    max_power_index: 0x3f,
    dig_min: 0x20,
    iqk_threshold: 8,
    pwr_track_tbl: &PWR_TRACK_TBL,
    pwr_on_seq: &CARD_ENABLE_FLOW,
    pwr_off_seq: &CARD_DISABLE_FLOW,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swing_field_extraction() {
        let swing = OFDM_SWING_TABLE[DEF_OFDM_SWING_INDEX];
        assert_eq!(swing, 0x390000e4);
        assert_eq!(ofdm_swing_a(swing), 0xe4);
        assert_eq!(ofdm_swing_b(swing), 0);
        assert_eq!(ofdm_swing_c(swing), 0);
        assert_eq!(ofdm_swing_d(swing), 0xe4);
    }

    #[test]
    fn swing_tables_are_monotonic() {
        // Gain must grow with the index or the tracking loop inverts.
        assert!(OFDM_SWING_TABLE
            .windows(2)
            .all(|w| ofdm_swing_d(w[0]) < ofdm_swing_d(w[1])));
        assert!(CCK_SWING_TABLE.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn txagc_covers_all_rates() {
        for (idx, reg) in TXAGC.iter().enumerate() {
            assert_ne!(reg.addr, 0, "rate {idx} unmapped");
            assert_eq!(reg.mask.count_ones(), 8);
        }
        let section_len: usize = RATE_SECTIONS.iter().map(|s| s.len()).sum();
        assert_eq!(section_len, DESC_RATE_NUM);
    }

    #[test]
    fn power_sequences_terminate() {
        for flow in CARD_ENABLE_FLOW.iter().chain(CARD_DISABLE_FLOW.iter()) {
            let last = flow.last().unwrap();
            assert_eq!(last.cmd, PwrCmd::End);
            assert_eq!(last.offset, 0xffff);
        }
    }
}
