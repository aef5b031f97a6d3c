//! Checks conda channels for package builds matching configured specs and
//! reports their download URLs, rewritten to a mirror where one exists.
//!
//! ```text
//! ┌──────────┐     ┌───────────┐     ┌──────────┐     ┌──────────┐
//! │  config  │────▶│   spec    │────▶│  check   │────▶│  report  │
//! │  (TOML)  │     │ (compile) │     │ (match)  │     │ (print)  │
//! └──────────┘     └───────────┘     └──────────┘     └──────────┘
//!                                          │                │
//!                                          ▼                ▼
//!                                    ┌──────────┐     ┌──────────┐
//!                                    │ repodata │     │  mirror  │
//!                                    │ (fetch)  │     │ (rewrite)│
//!                                    └──────────┘     └──────────┘
//! ```

pub mod check;
pub mod config;
pub mod mirror;
pub mod report;
pub mod repodata;
pub mod spec;
