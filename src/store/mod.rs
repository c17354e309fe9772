pub mod memory;
pub mod options;
pub mod registry;
pub mod table;

pub use memory::RecordStore;
pub use options::ServiceOptions;
pub use registry::StoreRegistry;
pub use table::RecordTable;
