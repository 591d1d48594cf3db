//! Service adapters: OS/runtime specific implementations (IO/async).

pub mod chat;
pub mod completion;
pub mod sandbox;
pub mod settings;
pub mod storage;
pub mod suggestion;

pub use chat::{ChatService, OpenAiChatProvider, SYSTEM_PROMPT};
pub use completion::HttpCompletionClient;
pub use sandbox::{LocalSandbox, LocalSandboxProvider, SandboxHandle, SandboxRuntimeManager};
pub use settings::{
    ensure_log_dir, ensure_settings_file, get_log_dir, get_settings_path, load_settings,
    parse_settings,
};
pub use storage::InMemoryPlaygroundStore;
pub use suggestion::SuggestionRunner;
