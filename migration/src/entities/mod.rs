pub mod key_pool;
pub mod url_mapping;

pub use key_pool::Entity as KeyPoolEntity;
pub use url_mapping::Entity as UrlMappingEntity;
