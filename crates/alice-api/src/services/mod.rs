//! Service layer for analysis and upload logic.

pub mod materializer;
pub mod normalizer;
pub mod orchestrator;
pub mod uploads;

pub use materializer::FileMaterializer;
pub use normalizer::AnalysisNormalizer;
pub use orchestrator::AnalysisOrchestrator;
pub use uploads::{IncomingFile, ProjectFiles, SavedFile, UploadStore};
