use lte_core::{BitBuffer, PduParseErr, let_field};

/// 36.213 6.2: Random Access Response Grant, 20 bits, carried in every MAC RAR
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RarUlGrant {
    /// 1 bit
    pub hopping_flag: bool,
    /// 10 bits, fixed size resource block assignment
    pub rb_assignment: u16,
    /// 4 bits, truncated modulation and coding scheme
    pub mcs: u8,
    /// 3 bits, TPC command for the scheduled PUSCH
    pub tpc: u8,
    /// 1 bit, if set Msg3 is delayed to the next available UL subframe
    pub ul_delay: bool,
    /// 1 bit
    pub csi_request: bool,
}

impl RarUlGrant {
    pub const BITS: usize = 20;

    pub fn from_bitbuf(buf: &mut BitBuffer) -> Result<Self, PduParseErr> {
        let_field!(buf, hopping_flag, 1);
        let_field!(buf, rb_assignment, 10);
        let_field!(buf, mcs, 4);
        let_field!(buf, tpc, 3);
        let_field!(buf, ul_delay, 1);
        let_field!(buf, csi_request, 1);
        Ok(RarUlGrant {
            hopping_flag: hopping_flag != 0,
            rb_assignment: rb_assignment as u16,
            mcs: mcs as u8,
            tpc: tpc as u8,
            ul_delay: ul_delay != 0,
            csi_request: csi_request != 0,
        })
    }

    pub fn to_bitbuf(&self, buf: &mut BitBuffer) {
        buf.write_bits(self.hopping_flag as u64, 1);
        buf.write_bits(self.rb_assignment as u64, 10);
        buf.write_bits(self.mcs as u64, 4);
        buf.write_bits(self.tpc as u64, 3);
        buf.write_bits(self.ul_delay as u64, 1);
        buf.write_bits(self.csi_request as u64, 1);
    }

    /// Parse from the 20 least significant bits of `raw`
    pub fn from_raw(raw: u32) -> Self {
        RarUlGrant {
            hopping_flag: (raw >> 19) & 1 != 0,
            rb_assignment: ((raw >> 9) & 0x3FF) as u16,
            mcs: ((raw >> 5) & 0xF) as u8,
            tpc: ((raw >> 2) & 0x7) as u8,
            ul_delay: (raw >> 1) & 1 != 0,
            csi_request: raw & 1 != 0,
        }
    }

    pub fn into_raw(self) -> u32 {
        (self.hopping_flag as u32) << 19
            | (self.rb_assignment as u32 & 0x3FF) << 9
            | (self.mcs as u32 & 0xF) << 5
            | (self.tpc as u32 & 0x7) << 2
            | (self.ul_delay as u32) << 1
            | self.csi_request as u32
    }

    /// 36.213 Table 6.2-1: TPC command for scheduled PUSCH, in dB
    pub fn tpc_db(&self) -> i32 {
        2 * self.tpc as i32 - 6
    }
}

impl core::fmt::Display for RarUlGrant {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(
            f,
            "RarUlGrant {{ hop: {}, rba: {}, mcs: {}, tpc: {}dB, delay: {}, csi: {} }}",
            self.hopping_flag as u8,
            self.rb_assignment,
            self.mcs,
            self.tpc_db(),
            self.ul_delay as u8,
            self.csi_request as u8
        )
    }
}
