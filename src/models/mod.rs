mod report;
mod validators;

pub use report::*;
pub use validators::*;
