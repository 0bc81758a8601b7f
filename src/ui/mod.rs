// SPDX-License-Identifier: MPL-2.0

mod dashboard;

pub use dashboard::Dashboard;
