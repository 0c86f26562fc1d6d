//! Stubserve - stub-first mock backend responder
//!
//! Fakes an HTTP backend during testing: each incoming request is checked
//! against a registry of programmer-defined stubs (url + method + optional
//! parameter constraints mapping to a canned JSON response); when no stub
//! matches, the responder falls back to a static file under a configurable
//! root, with virtual-directory remapping; when neither resolves, it
//! reports a not-found outcome for the host server to render.
//!
//! # Features
//!
//! - **Stub Matching**: exact url, case-insensitive method, parameter
//!   subset matching; the first registered match wins
//! - **Uniform Parameters**: JSON request bodies and pre-parsed form or
//!   query parameters feed the same matching rules
//! - **Static Fallback**: path-to-file resolution under a configurable
//!   root with an optional virtual directory prefix, delegated to a
//!   file-send collaborator
//! - **Test Isolation**: `clear()` empties the registry between cases
//!
//! # Example Configuration
//!
//! ```yaml
//! static_files:
//!   root_path: build
//!   virtual_dir: /assets
//! stubs:
//!   - url: /api/session
//!     method: POST
//!     params:
//!       user: admin
//!     response:
//!       token: "0xdeadbeef"
//! ```
//!
//! The host HTTP server owns the socket and routing; it hands each request
//! to [`Responder::respond`] through the [`Request`] trait and renders the
//! returned [`Resolution`].

pub mod config;
pub mod registry;
pub mod responder;

pub use config::{ResponderConfig, StaticFileConfig, Stub};
pub use registry::{ParamMap, StubRegistry};
pub use responder::{
    FileSender, FileSystem, Request, Resolution, RespondError, Responder, Response, StdFs,
};
