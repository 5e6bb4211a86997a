//! Plan output formats.

mod dot;
mod json;
mod text;

pub use dot::Dot;
pub use json::render_json;
pub use text::Summary;

use crate::Result;
use crate::plan::Plan;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum Format {
    #[default]
    Json,
    Dot,
    Text,
}

pub fn render(plan: &Plan, format: Format) -> Result<String> {
    match format {
        Format::Json => render_json(plan),
        Format::Dot => Ok(Dot(plan).to_string()),
        Format::Text => Ok(Summary(plan).to_string()),
    }
}
