pub mod summary;
pub mod svg;

pub use summary::{format_thousands, plot_title, render_results};
pub use svg::{write_preview_svg, write_svg};
