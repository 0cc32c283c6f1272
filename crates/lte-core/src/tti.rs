use core::fmt;

/// Number of subframes per radio frame
pub const SUBFRAMES_PER_FRAME: u32 = 10;

/// Value of the TTI counter where it wraps back to 0 (1024 frames of 10 subframes)
pub const TTI_WRAP: u32 = 1024 * SUBFRAMES_PER_FRAME;

/// Difference between two int TTIs, handling wrap-around of the system frame number.
pub fn tti_int_diff(a: u32, b: u32) -> i32 {
    let wrap = TTI_WRAP as i32;
    let mut diff = a as i32 - b as i32;
    while diff < -wrap / 2 {
        diff += wrap;
    }
    while diff >= wrap / 2 {
        diff -= wrap;
    }
    diff
}

/// Transmission time interval: one LTE subframe, indexed modulo TTI_WRAP
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Tti(u32);

impl Tti {
    /// Creates a Tti from a raw counter value, wrapping it into range
    pub fn new(tti: u32) -> Tti {
        Tti(tti % TTI_WRAP)
    }

    /// Creates a Tti from a system frame number (0..1023) and subframe index (0..9)
    pub fn from_sfn_sf(sfn: u16, sf_idx: u8) -> Tti {
        Tti::new(sfn as u32 * SUBFRAMES_PER_FRAME + sf_idx as u32)
    }

    pub fn to_int(self) -> u32 {
        self.0
    }

    /// System frame number, 0 to 1023
    pub fn sfn(self) -> u16 {
        (self.0 / SUBFRAMES_PER_FRAME) as u16
    }

    /// Subframe index within the radio frame, 0 to 9
    pub fn sf_idx(self) -> u8 {
        (self.0 % SUBFRAMES_PER_FRAME) as u8
    }

    /// Add a (possibly negative) number of subframes
    pub fn add_subframes(self, num_sf: i32) -> Tti {
        let v = (self.0 as i64 + num_sf as i64).rem_euclid(TTI_WRAP as i64);
        Tti(v as u32)
    }

    /// Difference between two Ttis in subframes
    pub fn diff(self, b: Self) -> i32 {
        tti_int_diff(self.0, b.0)
    }

    /// Returns true if `self` lies in the inclusive window [start, end], wrap-aware
    pub fn in_window(self, start: Tti, end: Tti) -> bool {
        self.diff(start) >= 0 && end.diff(self) >= 0
    }
}

impl fmt::Display for Tti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}.{}", self.sfn(), self.sf_idx())
    }
}

impl fmt::Debug for Tti {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:4}.{} ({})", self.sfn(), self.sf_idx(), self.0)
    }
}
