pub mod notifier;

pub use notifier::{CacheChange, ChangeListener, ChangeNotifier, ListenerId};
