//! Core library: folder-derived tags, directory mappings, and reconciliation
//! of document tag lists as the vault changes.

pub mod bulk;
pub mod config;
pub mod deriver;
pub mod engine;
pub mod events;
pub mod mappings;
pub mod path;
pub mod reconcile;
pub mod resolver;
pub mod settings;

pub use bulk::{BulkAction, BulkReport, FailedDocument};
pub use deriver::{derive_tags, FolderDepth, FormattingPolicy};
pub use engine::{DocumentChange, EngineError, MappingChange, TagEngine};
pub use events::{event_loop, EventLoop, EventSender, VaultEvent};
pub use mappings::{parse_tag_list, DirectoryMapping, DirectoryMappingStore, MappingError};
pub use reconcile::{reconcile, TagEdit};
pub use resolver::{ResolvedTagSet, TagResolver};
pub use settings::{Settings, TagSettings};
