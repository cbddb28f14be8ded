pub mod model;
pub mod printer;
pub mod storage;

pub use model::ResultRecord;
pub use printer::history_table;
pub use storage::ResultStore;
