// Report computations. Synchronous and free of I/O; pipelines feed them tables.

pub mod assignment;
pub mod categories;
pub mod columns;
pub mod fifo;
pub mod inventory_kpi;
pub mod pivot;
pub mod search;
pub mod stock_summary;
pub mod values;
pub mod vessel;

pub use categories::ContainerCategories;
pub use columns::Columns;
