/// 36.321 Table 7.2-1: Backoff Parameter values, in ms, indexed by the 4 bit Backoff Indicator.
/// Indices 13 to 15 are reserved and treated as the largest value.
pub const BACKOFF_TABLE_MS: [u32; 16] = [0, 10, 20, 30, 40, 60, 80, 120, 160, 240, 320, 480, 960, 960, 960, 960];

/// Backoff parameter in ms for a received Backoff Indicator
pub fn backoff_ms_from_indicator(bi: u8) -> u32 {
    BACKOFF_TABLE_MS[(bi & 0x0F) as usize]
}
