//! Services for skipmark-ia

pub mod edl_writer;
pub mod episode_queue;
pub mod fingerprint;
pub mod intro_detection;
pub mod library_scanner;
pub mod media_library;
pub mod segment_cache;

pub use edl_writer::EdlWriter;
pub use episode_queue::EpisodeQueue;
pub use fingerprint::{Fingerprinter, FingerprintError};
pub use intro_detection::{
    AnalysisError, AnalysisParams, FingerprintService, IntroFingerprintService,
};
pub use library_scanner::{LibraryScanner, ScanError};
pub use media_library::{LibraryError, MediaLibrary};
pub use segment_cache::SegmentCache;
