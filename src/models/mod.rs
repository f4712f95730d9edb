//! Data models for pfpgen.
//!
//! - [`AppConfig`]: Service, slot, download and logging settings loaded from `pfpgen.yaml`
//! - [`SelectedFile`], [`EncodedPayload`], [`GeneratedImage`]: Image data as it moves
//!   from the file picker to the generation service and back
//! - [`SessionStatus`], [`SessionSnapshot`]: Session state owned by
//!   [`SessionController`](crate::session::SessionController)

pub mod config;
pub mod payload;
pub mod session;

pub use config::{AppConfig, DownloadSettings, LoggingSettings, ServiceSettings, SlotSettings};
pub use payload::{EncodedPayload, FileSource, GeneratedImage, SelectedFile};
pub use session::{
    ErrorKind, FailureReason, GenerationResult, SessionSnapshot, SessionStatus, SlotKind,
    StatusKind,
};
