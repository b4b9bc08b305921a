pub mod files;
pub mod logger;
pub mod referer;
pub mod utils;
