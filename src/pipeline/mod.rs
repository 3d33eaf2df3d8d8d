pub mod aggregate;
pub mod artifacts;
pub mod definitions;
pub mod executor;
pub mod input;
pub mod progress;

pub use aggregate::{assemble, publish, Bilingual, Narration, ResultBundle};
pub use definitions::{PipelineDefinition, Step};
pub use executor::{Executor, ProgressSink};
pub use input::{clean_text, validate_source, InputType, Mode, SourceMaterial};
pub use progress::{ProgressEntry, ProgressLog};
