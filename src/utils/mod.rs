pub mod config;
pub mod imgpack_toml;
pub mod logger;
pub mod shutdown;

pub use config::*;
pub use imgpack_toml::{ImgpackToml, apply_file_to_opts, load_imgpack_toml};
pub use logger::setup_logging;
pub use shutdown::ShutdownSignal;
