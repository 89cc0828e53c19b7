pub mod message;
pub mod record;

pub use message::{Message, MessageBody, Role};
pub use record::{
    AddressSpec, KeyRef, MemoryRecord, MemorySpec, MemoryStatus, RecordMetadata, ServiceRef,
    ValueFrom,
};
