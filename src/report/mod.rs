//! Report generation.

pub mod generator;
pub mod plots;

pub use generator::{generate_json_report, generate_markdown_report, MarkdownOptions};
pub use plots::{build_plot_data, write_plot_data};
