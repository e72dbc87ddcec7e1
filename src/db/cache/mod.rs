pub mod memory;

mod macros;

pub use memory::Cache;
pub use memory::CacheKey;
pub use memory::CacheTtl;
pub use memory::TtlPresets;
