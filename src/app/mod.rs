pub mod jobs;
pub mod model;
pub mod pipeline;
pub mod pool;
pub mod queue;
pub mod supervisor;
