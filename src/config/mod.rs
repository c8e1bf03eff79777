//! Bridge settings: types, persistence, validation and the settings panel.

pub mod debounce;
pub mod env;
pub mod store;
pub mod surface;
pub mod types;
pub mod validate;

pub use debounce::{DebouncedSave, SAVE_DEBOUNCE};
pub use store::JsonFileStore;
pub use surface::{FieldView, SettingsField, SettingsPanel};
pub use types::{BridgeSettings, EXTENSION_KEY};
