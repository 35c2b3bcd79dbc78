pub mod config;
pub mod export;
pub mod input;
pub mod interaction;
pub mod session;
pub mod shortcuts;
pub mod store;
pub mod viewport;

pub use config::SessionConfig;
pub use export::{
    ExportError, ExportSink, Exported, FileSink, OutlineRenderer, Rendered, Renderer, SvgRenderer,
    export, suggested_filename,
};
pub use input::InputEvent;
pub use interaction::{
    Command, CommandOutcome, InteractionController, InteractionState, PendingConfirmation,
    TreeMutation,
};
pub use session::MindMapSession;
pub use shortcuts::{ShortcutAction, ShortcutMap};
pub use store::{JsonFileStore, MemoryStore, NodeStore, StoreError};
pub use viewport::{ViewportController, ViewportSize};
