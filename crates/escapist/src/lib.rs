//! **escapist** -- leave insert mode by typing `jk` quickly.
//!
//! This is the umbrella crate that re-exports everything needed to wire
//! escapist into an editor from a single dependency:
//!
//! ```toml
//! [dependencies]
//! escapist = "0.1"
//! ```
//!
//! # Re-exports
//!
//! * All public items from [`escapist_core`] are available at the crate root
//!   ([`Config`], [`Detector`], [`Host`], [`Session`], [`Runtime`], [`run`],
//!   etc.).
//! * [`crossterm`] and [`tokio`] are re-exported so integrations build key
//!   events and drive the runtime without depending on them directly.
//!
//! # Quick start
//!
//! ```ignore
//! use escapist::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
//! use escapist::{Config, Runtime};
//!
//! #[tokio::main]
//! async fn main() {
//!     let config = Config::default_path()
//!         .and_then(|path| Config::load_or_default(&path).ok())
//!         .unwrap_or_default();
//!     let (runtime, diagnostics) = Runtime::new(my_editor, config);
//!     let handle = runtime.handle();
//!     tokio::spawn(runtime.run());
//!
//!     // For every keystroke, instead of applying it directly:
//!     handle.input(KeyEvent::new(KeyCode::Char('j'), KeyModifiers::NONE));
//! }
//! ```

pub use escapist_core::*;

// Re-export dependencies for use in demos and downstream crates
pub use crossterm;
pub use tokio;
