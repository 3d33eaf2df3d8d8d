pub mod load;
pub mod schema;

pub use load::{load_config, CliOverrides};
pub use schema::{
    AppConfig, DiagnosticsConfig, OutputConfig, OutputFormat, OverlapPolicy, PipelineConfig,
    ServiceConfig,
};
