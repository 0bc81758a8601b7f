// SPDX-License-Identifier: MPL-2.0

mod refresh;
pub mod settings;

pub use refresh::{RefreshContext, RefreshController, RefreshInterval, RefreshOutcome};
pub use settings::AppSettings;
