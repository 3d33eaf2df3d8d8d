pub mod downloads;

pub use downloads::{artifact_file_name, fetch_to, save_audio, save_texts};
