use macro_bits::serializable_enum;

serializable_enum! {
    #[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
    /// Rate indices as used by the TX/RX descriptors and the TXAGC map.
    pub enum DescRate: u8 {
        #[default]
        Rate1M => 0x00,
        Rate2M => 0x01,
        Rate5_5M => 0x02,
        Rate11M => 0x03,
        Rate6M => 0x04,
        Rate9M => 0x05,
        Rate12M => 0x06,
        Rate18M => 0x07,
        Rate24M => 0x08,
        Rate36M => 0x09,
        Rate48M => 0x0a,
        Rate54M => 0x0b,
        Mcs0 => 0x0c,
        Mcs1 => 0x0d,
        Mcs2 => 0x0e,
        Mcs3 => 0x0f,
        Mcs4 => 0x10,
        Mcs5 => 0x11,
        Mcs6 => 0x12,
        Mcs7 => 0x13
    }
}

/// Number of rates the chip can signal.
pub const DESC_RATE_NUM: usize = 20;

impl DescRate {
    /// Look a rate up from a raw descriptor field. The descriptor carries a
    /// 7-bit field, of which only the single-stream 11n subset is valid for
    /// this chip.
    pub const fn from_index(idx: u8) -> Option<Self> {
        Some(match idx {
            0x00 => DescRate::Rate1M,
            0x01 => DescRate::Rate2M,
            0x02 => DescRate::Rate5_5M,
            0x03 => DescRate::Rate11M,
            0x04 => DescRate::Rate6M,
            0x05 => DescRate::Rate9M,
            0x06 => DescRate::Rate12M,
            0x07 => DescRate::Rate18M,
            0x08 => DescRate::Rate24M,
            0x09 => DescRate::Rate36M,
            0x0a => DescRate::Rate48M,
            0x0b => DescRate::Rate54M,
            0x0c => DescRate::Mcs0,
            0x0d => DescRate::Mcs1,
            0x0e => DescRate::Mcs2,
            0x0f => DescRate::Mcs3,
            0x10 => DescRate::Mcs4,
            0x11 => DescRate::Mcs5,
            0x12 => DescRate::Mcs6,
            0x13 => DescRate::Mcs7,
            _ => return None,
        })
    }

    /// Check if the rate belongs to the CCK PHY.
    pub const fn is_cck(&self) -> bool {
        self.into_bits() <= 0x03
    }

    /// Check if the rate is using the HT PHY.
    pub const fn is_ht(&self) -> bool {
        self.into_bits() >= 0x0c
    }
}
