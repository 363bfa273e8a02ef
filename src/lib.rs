pub mod db;
pub mod deadline;
pub mod domain;
pub mod fetch;
pub mod llm;
pub mod menu;
pub mod parser;
pub mod pipeline;
pub mod refresh;
pub mod render;
pub mod settings;

pub use menu::{DayMenu, Dish, WeeklyMenu};
pub use pipeline::Pipeline;
pub use settings::{PipelineError, Settings};
