// ABOUTME: Delivery encoding and protocol feature flags pushed to the engine before each bind
// ABOUTME: Replaced as a whole record so a concurrent bind never observes a partial update

use crate::datatypes::DataCoding;

/// Longest message, in characters, the engine accepts in one request.
///
/// Longer texts are split according to the concatenation and payload flags.
pub const MAX_MESSAGE_LENGTH: u32 = 1024;

/// Settings for message delivery and reception
///
/// Lets the engine work around common message-center limitations: servers
/// that misreport their default alphabet, that lack `submit_multi`, or that
/// cannot take long messages as a payload TLV.
///
/// A session only accepts new settings while unbound; they are pushed to the
/// engine as part of the next bind.
///
/// # Example
///
/// ```rust
/// use smpp_session::datatypes::{DataCoding, MessageSettings};
///
/// let settings = MessageSettings::default()
///     .with_deliver_data_coding(DataCoding::Latin1)
///     .with_gsm7bit_packing(true)
///     .with_submit_multi(false);
///
/// assert_eq!(settings.effective_data_coding(), DataCoding::Latin1);
/// assert!(settings.enable_payload_tlv);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MessageSettings {
    /// Data coding used to send messages
    pub deliver_data_coding: DataCoding,

    /// Encoding the server uses for its default alphabet.
    ///
    /// Only consulted when `deliver_data_coding` is `SmscDefault`.
    pub server_default_encoding: DataCoding,

    /// Pack GSM 03.38 content into septets
    pub enable_gsm7bit_packing: bool,

    /// Maximum message length in characters; 0 selects `MAX_MESSAGE_LENGTH`.
    ///
    /// When `enable_payload_tlv` is set, longer messages can still be sent.
    pub max_message_length: u32,

    /// Split long messages using concatenated short messages
    pub enable_message_concatenation: bool,

    /// Send long messages in the `message_payload` TLV
    pub enable_payload_tlv: bool,

    /// The server supports `submit_multi`; otherwise multi-recipient
    /// requests are split into individual `submit_sm` operations
    pub enable_submit_multi: bool,

    /// Swap byte order of UCS-2 content received in `deliver_sm`, for
    /// servers that send it little-endian
    pub big_endian_unicode: bool,
}

impl Default for MessageSettings {
    fn default() -> Self {
        Self {
            deliver_data_coding: DataCoding::SmscDefault,
            server_default_encoding: DataCoding::SmscDefault,
            enable_gsm7bit_packing: false,
            max_message_length: 0,
            enable_message_concatenation: true,
            enable_payload_tlv: true,
            enable_submit_multi: true,
            big_endian_unicode: false,
        }
    }
}

impl MessageSettings {
    /// Set the data coding used for outbound messages
    pub fn with_deliver_data_coding(mut self, coding: DataCoding) -> Self {
        self.deliver_data_coding = coding;
        self
    }

    /// Set the encoding behind the server's default alphabet
    pub fn with_server_default_encoding(mut self, coding: DataCoding) -> Self {
        self.server_default_encoding = coding;
        self
    }

    /// Enable or disable GSM 7-bit packing
    pub fn with_gsm7bit_packing(mut self, enabled: bool) -> Self {
        self.enable_gsm7bit_packing = enabled;
        self
    }

    /// Set the maximum message length (0 for the engine default)
    pub fn with_max_message_length(mut self, length: u32) -> Self {
        self.max_message_length = length;
        self
    }

    /// Enable or disable concatenated short messages
    pub fn with_message_concatenation(mut self, enabled: bool) -> Self {
        self.enable_message_concatenation = enabled;
        self
    }

    /// Enable or disable the payload TLV for long messages
    pub fn with_payload_tlv(mut self, enabled: bool) -> Self {
        self.enable_payload_tlv = enabled;
        self
    }

    /// Declare whether the server supports `submit_multi`
    pub fn with_submit_multi(mut self, enabled: bool) -> Self {
        self.enable_submit_multi = enabled;
        self
    }

    /// Enable or disable byte swapping of inbound UCS-2 content
    pub fn with_big_endian_unicode(mut self, enabled: bool) -> Self {
        self.big_endian_unicode = enabled;
        self
    }

    /// Coding actually applied to outbound content
    pub fn effective_data_coding(&self) -> DataCoding {
        if self.deliver_data_coding.is_server_default() {
            self.server_default_encoding
        } else {
            self.deliver_data_coding
        }
    }

    /// Maximum message length with the engine default resolved
    pub fn effective_max_message_length(&self) -> u32 {
        match self.max_message_length {
            0 => MAX_MESSAGE_LENGTH,
            length => length,
        }
    }
}
