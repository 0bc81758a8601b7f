// SPDX-License-Identifier: MPL-2.0

//! Shared async runtime for network operations.
//!
//! The rest of the program is synchronous: a render runs the whole
//! fetch-score-store pipeline to completion. Network calls are async, so they
//! are driven to completion here on a single current-thread runtime.

use once_cell::sync::Lazy;
use std::future::Future;
use tokio::runtime::Runtime;

static RUNTIME: Lazy<Runtime> = Lazy::new(|| {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .thread_name("threadmood-io")
        .build()
        .expect("failed to create async runtime")
});

/// Execute a future on the shared runtime, blocking until completion.
/// Must not be called from inside another tokio runtime.
pub fn block_on<F: Future>(future: F) -> F::Output {
    RUNTIME.block_on(future)
}
