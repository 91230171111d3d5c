//! # `rtw8723d-hal`
//! Bring-up, channel management and RF calibration for the Realtek RTL8723D
//! 802.11n transceiver. The crate talks to the chip through a host-provided
//! register bus and implements the pieces of the vendor flow that have to
//! run close to the hardware: MAC/BB initialization, channel switching, the
//! IQ calibration engine and thermal TX power tracking.
//! ## Hardware overview
//! This chapter gives a short overview of the chip structures this crate
//! drives.
//!
//! ### Register spaces
//! The chip exposes a byte-addressed MAC register space with 8/16/32-bit
//! access, a 32-bit baseband (BB) space, and 20-bit RF sub-registers reached
//! through a serial interface, always with an explicit bitmask. All of this
//! sits behind the [RtwBus] trait, so the crate is independent of whether
//! the host attaches over SDIO, USB or PCIe.
//!
//! ### Paths S1 and S0
//! The 8723D is a 1T1R design, but the radio has two signal paths: S1 is the
//! dedicated WiFi path, S0 is shared with Bluetooth. Calibration has to run
//! on both, and the S0 coefficients live in their own register images. The
//! driver-facing [RfPath] selector maps A to S1 and B to S0.
//!
//! ### IQ calibration
//! A tone generator in the baseband measures TX and RX IQ imbalance per
//! path. [Rtw8723d::phy_calibration] runs up to three measurement rounds
//! and accepts a result once two rounds agree within tolerance; the winning
//! coefficients are folded into the TX/RX imbalance matrices and kept so
//! that power tracking can re-fold them when it moves the gain swing.
//!
//! ### Power tracking
//! The RF thermal meter drifts with temperature and pulls the PA gain with
//! it. [Rtw8723d::pwrtrack_check] alternates between arming the meter and
//! reading it back; drift moves an index into factory characterized swing
//! tables, retunes the crystal cap, and past a threshold schedules a fresh
//! IQ calibration.
//!
//! ### RX status
//! Received frames carry a 24 byte descriptor and, for most frames, a PHY
//! status blob. [Rtw8723d::query_rx_desc] decodes both and feeds the signal
//! statistics (RSSI, SNR, EVM, CFO) into the tracking state.

#![cfg_attr(not(test), no_std)]

pub(crate) mod fmt;

mod bus;
mod dm;
mod iqk;
mod phy;
mod pwrtrack;
mod rate;
pub mod regs;
mod rx;
mod tables;
mod util;

pub use bus::{RfPath, RtwBus};
pub use dm::{DmInfo, Efuse, EwmaThermal, IqkResult, IqkState};
pub use phy::Rtw8723d;
pub use rate::{DescRate, DESC_RATE_NUM};
pub use rx::RxPktStat;
pub use tables::{
    ChipInfo, PwrAddrBase, PwrCmd, PwrSeqCmd, PwrTrackTbl, CARD_DISABLE_FLOW, CARD_ENABLE_FLOW,
    RTW8723D,
};

/// Channel bandwidth of an operating channel or a single reception.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ChannelWidth {
    Width20,
    Width40,
}

/// Which half of a 40 MHz channel carries the primary 20 MHz channel.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PrimaryChannel {
    Upper,
    Lower,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RtwError {
    /// The requested channel is outside the 2.4 GHz band plan.
    UnsupportedChannel,
}
