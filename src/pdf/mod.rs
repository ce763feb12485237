mod document;
mod typst;

pub use document::{render_print_document, PrintDocument};
pub use typst::{arm_cleanup, Printer, RenderSurface};
