pub mod prepare_env;
mod recording_queue;

pub use recording_queue::RecordingQueue;
