// Copyright (C) 2026  Apex Contributors
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.
//! Apex observability
//!
//! Installs the `tracing` subscriber for apex binaries. The `apex-metrics`
//! library only emits events; this crate decides where they go.
//!
//! # Features
//!
//! - **Output formats**: pretty, compact and JSON
//! - **Filtering**: `EnvFilter` directives with a `RUST_LOG` fallback
//! - **Destinations**: stderr or stdout
//!
//! # Example
//!
//! ```ignore
//! use apex_observability::{init_tracing_with_config, LogConfig, LogFormat};
//!
//! let config = LogConfig::new()
//!     .with_format(LogFormat::Json)
//!     .with_level("info")
//!     .with_directive("apex_metrics=debug");
//! init_tracing_with_config(config)?;
//! ```

pub mod config;
pub mod initialization;

pub use config::{LogConfig, LogError, LogFormat, LogOutput, DEFAULT_FILTER};
pub use initialization::{build_env_filter, init_tracing, init_tracing_with_config};
