//! lume-builder - build and export macOS VM images with lume
//!
//! lume-builder drives the `lume` CLI to create and configure a VM, wait
//! for it to come up, and package its disk and metadata into an exportable
//! (optionally chunked) file set.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │  lume-builder CLI (build / export / ip)         │
//! ├────────────────────────┬────────────────────────┤
//! │  builder               │  export                │
//! │  create → set → ip     │  copy / split / list   │
//! ├────────────────────────┴────────────────────────┤
//! │  lume runner (subprocess, delay, cancellation)  │
//! ├─────────────────────────────────────────────────┤
//! │  lume CLI                                       │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! # Example
//!
//! ```no_run
//! use lume_builder::{BuildConfig, Builder, CancelToken, ConsoleUi, Lume, LumeHome};
//!
//! let config = BuildConfig {
//!     vm_name: "runner".into(),
//!     ipsw: Some("latest".into()),
//!     cpu_count: 4,
//!     memory_mb: 8192,
//!     ..Default::default()
//! };
//!
//! let builder = Builder::prepare(config).unwrap();
//! let home = LumeHome::resolve(None).unwrap();
//! let artifact = builder
//!     .run(&CancelToken::new(), &ConsoleUi::new("lume.cli"), &Lume::default(), &home)
//!     .unwrap();
//!
//! println!("built {}", artifact);
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod builder;
pub mod cancel;
pub mod config;
pub mod error;
pub mod export;
pub mod home;
pub mod lume;
pub mod process;
pub mod ui;

// Re-export main types for convenience
pub use builder::{Artifact, Builder};
pub use cancel::CancelToken;
pub use config::{BuildConfig, ExportConfig, Template};
pub use error::{Error, Result};
pub use export::{Manifest, ManifestEntry, MediaType, PostProcessed, PostProcessor};
pub use home::LumeHome;
pub use lume::{Invocation, Lume};
pub use ui::{ConsoleUi, NullUi, RecordingUi, Ui};

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
