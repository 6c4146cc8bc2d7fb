//! INFT minting.

pub mod chain;
pub mod contract;
pub mod events;
pub mod metadata;
pub mod orchestrator;

pub use chain::{ChainDescriptor, ChainSwitch, ensure_chain};
pub use contract::{InftContract, MintMethod};
pub use events::{EventSink, MintDetail, MintEvent, MintStage};
pub use metadata::{MintMetadata, SealedMetadata};
pub use orchestrator::{MintOrchestrator, MintReceipt, StoragePointers};
