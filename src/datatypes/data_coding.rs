// ABOUTME: Character encoding tags attached to message content, with fixed numeric identities
// ABOUTME: The numeric values are a wire-level contract shared with the protocol engine

use num_enum::{IntoPrimitive, TryFromPrimitive};
use std::fmt;

/// Character encoding scheme a message is tagged with.
///
/// The discriminants are the values handed to the engine and must not change.
/// `Utf8` (11) occupies a value the protocol reserves; the engine uses it for
/// servers that accept UTF-8 content directly.
#[derive(TryFromPrimitive, IntoPrimitive)]
#[repr(u32)]
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash, Default)]
pub enum DataCoding {
    /// Use the server's default alphabet
    #[default]
    SmscDefault = 0,
    /// IA5/ASCII
    Ansi = 1,
    /// GSM 03.38 default alphabet
    Gsm0338 = 2,
    /// Latin-1 (ISO-8859-1)
    Latin1 = 3,
    /// UCS-2 (ISO/IEC-10646)
    Unicode = 8,
    /// UTF-8
    Utf8 = 11,
}

impl DataCoding {
    /// All supported codings, in ascending wire order
    pub const ALL: [DataCoding; 6] = [
        DataCoding::SmscDefault,
        DataCoding::Ansi,
        DataCoding::Gsm0338,
        DataCoding::Latin1,
        DataCoding::Unicode,
        DataCoding::Utf8,
    ];

    /// Returns the raw value used on the wire
    pub fn code(&self) -> u32 {
        u32::from(*self)
    }

    /// Returns true if this tag defers to the server's default alphabet
    pub fn is_server_default(&self) -> bool {
        *self == DataCoding::SmscDefault
    }

    /// Returns true if characters are encoded with more than one byte each
    pub fn is_multibyte(&self) -> bool {
        matches!(self, DataCoding::Unicode | DataCoding::Utf8)
    }
}

impl fmt::Display for DataCoding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            DataCoding::SmscDefault => "Default",
            DataCoding::Ansi => "Ansi",
            DataCoding::Gsm0338 => "Gsm0338",
            DataCoding::Latin1 => "Latin1",
            DataCoding::Unicode => "Unicode",
            DataCoding::Utf8 => "UTF8",
        };
        f.write_str(name)
    }
}
