pub mod catalog;
pub mod invoker;
pub mod payload;

pub use catalog::{RequestEncoding, Stage};
pub use invoker::{invoke_stage, BackendProbe, HttpStageInvoker, StageInvoker};
pub use payload::{StageOutput, StageReply, StageRequest};
