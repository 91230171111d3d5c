//! RX descriptor and PHY status decoding.
//!
//! Every received frame is preceded by a 24 byte descriptor, optionally
//! followed by a PHY status blob and a driver info area before the 802.11
//! header starts. The PHY status comes in pages; page 0 is emitted for CCK
//! receptions, page 1 for OFDM and HT.

use bitfield_struct::bitfield;
use embedded_hal::delay::DelayNs;

use crate::bus::{RfPath, RtwBus};
use crate::phy::{rf_power_to_rssi, Rtw8723d};
use crate::rate::DescRate;
use crate::ChannelWidth;

#[bitfield(u32)]
struct RxDescW0 {
    #[bits(14)]
    pkt_len: u16,
    crc32: bool,
    icv_err: bool,
    #[bits(4)]
    drv_info_size: u8,
    #[bits(3)]
    security: u8,
    qos: bool,
    #[bits(2)]
    shift: u8,
    physt: bool,
    swdec: bool,
    ls: bool,
    fs: bool,
    eor: bool,
    own: bool,
}

#[bitfield(u32)]
struct RxDescW1 {
    #[bits(7)]
    macid: u8,
    #[bits(25)]
    __: u32,
}

#[bitfield(u32)]
struct RxDescW2 {
    #[bits(28)]
    __: u32,
    c2h: bool,
    #[bits(3)]
    __: u8,
}

#[bitfield(u32)]
struct RxDescW3 {
    #[bits(7)]
    rx_rate: u8,
    #[bits(25)]
    __: u32,
}

#[bitfield(u32)]
struct P1StatusW3 {
    __: u8,
    #[bits(4)]
    l_rxsc: u8,
    #[bits(4)]
    ht_rxsc: u8,
    #[bits(12)]
    __: u16,
    #[bits(2)]
    rf_mode: u8,
    #[bits(2)]
    __: u8,
}

/// Everything decoded out of one RX descriptor and its PHY status.
#[derive(Clone, Copy, Debug, Default)]
pub struct RxPktStat {
    pub pkt_len: u16,
    pub crc_err: bool,
    pub icv_err: bool,
    /// The frame was decrypted in hardware.
    pub decrypted: bool,
    /// Firmware-to-host message, not an 802.11 frame.
    pub is_c2h: bool,
    pub phy_status: bool,
    pub drv_info_sz: u16,
    pub shift: u8,
    pub rate: DescRate,
    pub cam_id: u8,
    pub tsf_low: u32,

    pub bw: Option<ChannelWidth>,
    pub rx_power: i8,
    pub rssi: u8,
    pub signal_power: i8,
    pub rx_evm: i8,
    pub rx_snr: u8,
    pub cfo_tail: i8,
}

impl RxPktStat {
    /// Byte offset of the 802.11 header inside the receive buffer.
    pub fn hdr_offset(&self, desc_sz: usize) -> usize {
        desc_sz + self.shift as usize + self.drv_info_sz as usize
    }
}

fn desc_dword(buf: &[u8], idx: usize) -> u32 {
    let off = idx * 4;
    u32::from_le_bytes([buf[off], buf[off + 1], buf[off + 2], buf[off + 3]])
}

impl<B: RtwBus, D: DelayNs> Rtw8723d<B, D> {
    /// Decode an RX descriptor and, when present, the trailing PHY status.
    ///
    /// `buf` must start at the descriptor. Returns `None` when the buffer is
    /// too short to hold what the descriptor claims is there.
    pub fn query_rx_desc(&mut self, buf: &[u8]) -> Option<RxPktStat> {
        let desc_sz = self.chip.rx_pkt_desc_sz;
        if buf.len() < desc_sz {
            warn!("rx buffer shorter than the descriptor");
            return None;
        }

        let w0 = RxDescW0::from(desc_dword(buf, 0));
        let w1 = RxDescW1::from(desc_dword(buf, 1));
        let w2 = RxDescW2::from(desc_dword(buf, 2));
        let w3 = RxDescW3::from(desc_dword(buf, 3));

        let mut pkt_stat = RxPktStat {
            pkt_len: w0.pkt_len(),
            crc_err: w0.crc32(),
            icv_err: w0.icv_err(),
            decrypted: !w0.swdec(),
            is_c2h: w2.c2h(),
            phy_status: w0.physt(),
            drv_info_sz: w0.drv_info_size() as u16 * 8,
            shift: w0.shift(),
            rate: DescRate::from_index(w3.rx_rate()).unwrap_or_default(),
            cam_id: w1.macid(),
            tsf_low: desc_dword(buf, 5),
            ..RxPktStat::default()
        };

        if pkt_stat.is_c2h {
            return Some(pkt_stat);
        }

        if pkt_stat.phy_status {
            let phy_status = buf.get(desc_sz + pkt_stat.shift as usize..)?;
            self.query_phy_status(phy_status, &mut pkt_stat)?;
        }

        Some(pkt_stat)
    }

    fn query_phy_status(&mut self, phy_status: &[u8], pkt_stat: &mut RxPktStat) -> Option<()> {
        let page = phy_status.first()? & 0xf;
        match page {
            0 => self.query_phy_status_page0(phy_status, pkt_stat),
            1 => self.query_phy_status_page1(phy_status, pkt_stat),
            _ => {
                warn!("unknown phy status page {}", page);
                pkt_stat.phy_status = false;
                Some(())
            }
        }
    }

    fn query_phy_status_page0(
        &mut self,
        phy_status: &[u8],
        pkt_stat: &mut RxPktStat,
    ) -> Option<()> {
        const MIN_RX_POWER: i8 = -120;
        let pwdb = *phy_status.get(1)?;

        pkt_stat.rx_power = (pwdb as i16 - 97).clamp(i8::MIN as i16, i8::MAX as i16) as i8;
        pkt_stat.rssi = rf_power_to_rssi(pkt_stat.rx_power);
        pkt_stat.bw = Some(ChannelWidth::Width20);
        pkt_stat.signal_power = pkt_stat.rx_power.max(MIN_RX_POWER);

        self.dm.rssi[RfPath::A.index()] = pkt_stat.rssi;
        Some(())
    }

    fn query_phy_status_page1(
        &mut self,
        phy_status: &[u8],
        pkt_stat: &mut RxPktStat,
    ) -> Option<()> {
        const MIN_RX_POWER: i8 = -120;
        if phy_status.len() < 28 {
            return None;
        }

        let w3 = P1StatusW3::from(desc_dword(phy_status, 3));
        let is_ofdm = !pkt_stat.rate.is_cck() && !pkt_stat.rate.is_ht();
        let rxsc = if is_ofdm { w3.l_rxsc() } else { w3.ht_rxsc() };

        pkt_stat.bw = Some(if w3.rf_mode() == 0 || rxsc == 1 || rxsc == 2 {
            ChannelWidth::Width20
        } else {
            ChannelWidth::Width40
        });

        let pwdb = phy_status[1];
        pkt_stat.rx_power = (pwdb as i16 - 110).clamp(i8::MIN as i16, i8::MAX as i16) as i8;
        pkt_stat.rssi = rf_power_to_rssi(pkt_stat.rx_power);
        pkt_stat.signal_power = pkt_stat.rx_power.max(MIN_RX_POWER);
        pkt_stat.rx_evm = phy_status[16] as i8;
        pkt_stat.cfo_tail = phy_status[20] as i8;
        pkt_stat.rx_snr = phy_status[24];

        let a = RfPath::A.index();
        self.dm.curr_rx_rate = pkt_stat.rate;
        self.dm.rssi[a] = pkt_stat.rssi;
        self.dm.rx_snr[a] = pkt_stat.rx_snr >> 1;
        self.dm.cfo_tail[a] = (((pkt_stat.cfo_tail as i32) * 5) >> 1) as i8;
        // 64 wraps to 0, the unused second stream of a 1SS rate reports 64.
        let rx_evm = ((-(pkt_stat.rx_evm as i32)) >> 1).clamp(0, 64) & 0x3f;
        self.dm.rx_evm_dbm[a] = rx_evm as u8;
        Some(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::mock::{MockBus, NoDelay};
    use crate::dm::Efuse;

    const DESC_SZ: usize = 24;

    fn device() -> Rtw8723d<MockBus, NoDelay> {
        Rtw8723d::new(MockBus::new(), NoDelay, Efuse::default())
    }

    fn put_dword(buf: &mut [u8], idx: usize, val: u32) {
        buf[idx * 4..idx * 4 + 4].copy_from_slice(&val.to_le_bytes());
    }

    fn desc(pkt_len: u16, rate: DescRate, physt: bool) -> [u8; 24] {
        let mut buf = [0u8; 24];
        let w0 = RxDescW0::new()
            .with_pkt_len(pkt_len)
            .with_physt(physt)
            .with_swdec(true);
        put_dword(&mut buf, 0, w0.into());
        put_dword(&mut buf, 3, RxDescW3::new().with_rx_rate(rate.into_bits()).into());
        buf
    }

    #[test]
    fn plain_frame_fields() {
        let mut dev = device();
        let mut buf = desc(1234, DescRate::Rate54M, false);
        put_dword(&mut buf, 1, RxDescW1::new().with_macid(5).into());
        put_dword(&mut buf, 5, 0xdeadbeef);

        let stat = dev.query_rx_desc(&buf).unwrap();
        assert_eq!(stat.pkt_len, 1234);
        assert_eq!(stat.rate, DescRate::Rate54M);
        assert_eq!(stat.cam_id, 5);
        assert_eq!(stat.tsf_low, 0xdeadbeef);
        assert!(!stat.decrypted);
        assert!(!stat.phy_status);
        assert_eq!(stat.bw, None);
        assert_eq!(stat.hdr_offset(DESC_SZ), DESC_SZ);
    }

    #[test]
    fn c2h_skips_phy_status() {
        let mut dev = device();
        let mut buf = desc(32, DescRate::Rate1M, true);
        put_dword(&mut buf, 2, RxDescW2::new().with_c2h(true).into());

        // No phy status bytes follow, which must not matter for C2H.
        let stat = dev.query_rx_desc(&buf).unwrap();
        assert!(stat.is_c2h);
        assert_eq!(stat.bw, None);
    }

    #[test]
    fn short_buffer_is_rejected() {
        let mut dev = device();
        assert!(dev.query_rx_desc(&[0u8; 8]).is_none());
    }

    #[test]
    fn page0_cck_power() {
        let mut dev = device();
        let mut buf = [0u8; 24 + 32];
        buf[..24].copy_from_slice(&desc(64, DescRate::Rate11M, true));
        buf[24] = 0x00; // page 0
        buf[25] = 0x28; // pwdb

        let stat = dev.query_rx_desc(&buf).unwrap();
        assert_eq!(stat.rx_power, 0x28 - 97);
        assert_eq!(stat.bw, Some(ChannelWidth::Width20));
        assert_eq!(stat.rssi, (0x28 - 97 + 100) as u8);
        assert_eq!(dev.dm.rssi[0], stat.rssi);
    }

    #[test]
    fn page0_signal_power_floor() {
        let mut dev = device();
        let mut buf = [0u8; 24 + 32];
        buf[..24].copy_from_slice(&desc(64, DescRate::Rate1M, true));
        buf[24] = 0x00;
        buf[25] = 0; // pwdb 0 gives -97, above the floor

        let stat = dev.query_rx_desc(&buf).unwrap();
        assert_eq!(stat.signal_power, -97);
        assert_eq!(stat.rssi, 3);
    }

    fn page1_buf(rate: DescRate, rf_mode: u8, l_rxsc: u8, ht_rxsc: u8) -> [u8; 24 + 32] {
        let mut buf = [0u8; 24 + 32];
        buf[..24].copy_from_slice(&desc(64, rate, true));
        buf[24] = 0x01;
        buf[25] = 60; // pwdb, -50 dBm
        let w3 = P1StatusW3::new()
            .with_rf_mode(rf_mode)
            .with_l_rxsc(l_rxsc)
            .with_ht_rxsc(ht_rxsc);
        buf[24 + 12..24 + 16].copy_from_slice(&u32::from(w3).to_le_bytes());
        buf
    }

    #[test]
    fn page1_bandwidth_from_rxsc() {
        let mut dev = device();

        // 20 MHz RF mode always reports 20 MHz.
        let stat = dev
            .query_rx_desc(&page1_buf(DescRate::Mcs7, 0, 0, 0))
            .unwrap();
        assert_eq!(stat.bw, Some(ChannelWidth::Width20));

        // 40 MHz RF mode with a subchannel gives a 20 MHz reception.
        let stat = dev
            .query_rx_desc(&page1_buf(DescRate::Mcs7, 1, 0, 2))
            .unwrap();
        assert_eq!(stat.bw, Some(ChannelWidth::Width20));

        // Full band otherwise.
        let stat = dev
            .query_rx_desc(&page1_buf(DescRate::Mcs7, 1, 0, 0))
            .unwrap();
        assert_eq!(stat.bw, Some(ChannelWidth::Width40));

        // OFDM legacy rates use the legacy subchannel field.
        let stat = dev
            .query_rx_desc(&page1_buf(DescRate::Rate54M, 1, 1, 0))
            .unwrap();
        assert_eq!(stat.bw, Some(ChannelWidth::Width20));
    }

    #[test]
    fn page1_tracking_state() {
        let mut dev = device();
        let mut buf = page1_buf(DescRate::Mcs5, 0, 0, 0);
        buf[24 + 16] = (-54i8) as u8; // evm
        buf[24 + 20] = 10; // cfo
        buf[24 + 24] = 40; // snr

        let stat = dev.query_rx_desc(&buf).unwrap();
        assert_eq!(stat.rx_power, 60 - 110);
        assert_eq!(dev.dm.curr_rx_rate, DescRate::Mcs5);
        assert_eq!(dev.dm.rx_snr[0], 20);
        assert_eq!(dev.dm.cfo_tail[0], 25);
        assert_eq!(dev.dm.rx_evm_dbm[0], 27);
    }

    #[test]
    fn page1_evm_wraps_at_64() {
        let mut dev = device();
        let mut buf = page1_buf(DescRate::Mcs0, 0, 0, 0);
        buf[24 + 16] = (-128i8) as u8;

        dev.query_rx_desc(&buf).unwrap();
        // clamp(64) then the 6-bit wrap maps the idle stream marker to 0
        assert_eq!(dev.dm.rx_evm_dbm[0], 0);
    }

    #[test]
    fn unknown_page_drops_phy_status() {
        let mut dev = device();
        let mut buf = [0u8; 24 + 32];
        buf[..24].copy_from_slice(&desc(64, DescRate::Rate6M, true));
        buf[24] = 0x07;

        let stat = dev.query_rx_desc(&buf).unwrap();
        assert!(!stat.phy_status);
        assert_eq!(stat.bw, None);
    }
}
