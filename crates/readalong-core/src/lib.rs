pub mod config;
pub mod document;
pub mod library;
pub mod navigator;
pub mod schedule;
pub mod search;
pub mod session;
pub mod settings;
pub mod source;
pub mod storage;
pub mod viewport;

// Re-export main types for convenience
pub use config::Config;
pub use document::{Anchor, Document, LayoutParams, Row, Section};
pub use library::{Book, Chapter, Library, ParseError};
pub use navigator::{JumpMode, Navigator, ScrollState};
pub use schedule::{TaskId, TaskKind, TaskQueue};
pub use search::{MatchMode, Query, SearchHit};
pub use session::{Session, SESSION_KEY};
pub use settings::NavigatorSettings;
pub use source::{fetch_library, DataSource, LoadError};
pub use storage::{FileStorage, MemoryStorage, Storage};
pub use viewport::Viewport;
