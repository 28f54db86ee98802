mod error;
mod store_history;

pub use error::{PersistenceError, PersistenceResult};
pub use store_history::{StoreHistory, CURRENT_STORE_FILE, HISTORY_FILE, MAX_HISTORY};
