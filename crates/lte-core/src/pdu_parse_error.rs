/// Failure to interpret a MAC PDU or one of its fields
#[derive(Debug, PartialEq, Eq)]
pub enum PduParseErr {
    /// Fewer bits left than the named field needs
    BufferEnded { field: Option<&'static str> },
    /// Transport block larger than the receive buffer
    BufferTooLong { len: usize, max: usize },
    InvalidValue { field: &'static str, value: u64 },
    /// Sub-header lengths do not add up to the transport block size
    InconsistentLength { expected: usize, found: usize },
    Inconsistency { field: &'static str, reason: &'static str },
}

impl core::fmt::Display for PduParseErr {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            PduParseErr::BufferEnded { field: Some(field) } => write!(f, "PDU ended while reading {}", field),
            PduParseErr::BufferEnded { field: None } => write!(f, "PDU ended"),
            PduParseErr::BufferTooLong { len, max } => write!(f, "PDU of {} bytes exceeds {} bytes", len, max),
            PduParseErr::InvalidValue { field, value } => write!(f, "invalid {}: {}", field, value),
            PduParseErr::InconsistentLength { expected, found } => {
                write!(f, "sub-headers announce {} bytes, {} present", expected, found)
            }
            PduParseErr::Inconsistency { field, reason } => write!(f, "{}: {}", field, reason),
        }
    }
}

impl std::error::Error for PduParseErr {}

/// Reads a field of `$bits` bits into a binding named after the field
#[macro_export]
macro_rules! let_field {
    ($buf:expr, $ident:ident, $bits:expr) => {
        let $ident = $buf.read_field($bits, stringify!($ident))?;
    };
}
