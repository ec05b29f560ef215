mod bind_result;
mod bind_type;
mod data_coding;
mod delivery_result;
mod disconnect_reason;
mod inbound_message;
mod message_settings;

pub use bind_result::BindResult;
pub use bind_type::BindType;
pub use data_coding::DataCoding;
pub use delivery_result::DeliveryResult;
pub use disconnect_reason::DisconnectReason;
pub use inbound_message::InboundMessage;
pub use message_settings::{MAX_MESSAGE_LENGTH, MessageSettings};
