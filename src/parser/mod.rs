//! HTML-side passes: reduce markup to text, recognize day names and section
//! headings, and the structured extractors built on top of them.

pub mod days;
pub mod extract;
pub mod reduce;
pub mod sections;
pub mod text;
