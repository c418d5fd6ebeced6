//! Engine module: CLI surface, codec calls, progress, and filesystem helpers

pub mod arg_parser;
pub mod cli;
pub mod codec;
pub mod progress;
pub mod tools;

// Re-export commonly used functions
pub use arg_parser::Cli;
pub use cli::handle_run;
pub use codec::{encode_into, fit_width, open_and_decode, scaled_dimensions};
pub use progress::{ProgressAggregator, RunningTotals};
pub use tools::{
    archive_path_for, count_eligible_files, format_bytes, identity_of, is_image_file,
    is_os_hidden_file, list_input_sets,
};
