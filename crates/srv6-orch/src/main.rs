//! srv6d entry point.
//!
//! Stands up an [`SrContext`] with an in-process forwarding-handle
//! allocator, suitable for standalone operation and integration
//! testing. Production deployments replace the allocator with a
//! provider backed by the platform forwarding plane.

use clap::Parser;
use log::{debug, info};
use srv6_orch::fwd::{FwdHandle, FwdProvider, FwdRequest, FwdType};
use srv6_orch::SrContext;
use std::process::ExitCode;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};
use std::sync::Arc;

/// SRv6 policy and endpoint state daemon
#[derive(Parser, Debug)]
#[command(name = "srv6d")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Log level (trace, debug, info, warn, error)
    #[arg(short = 'l', long, default_value = "info")]
    log_level: String,

    /// Default routing table for policies and LocalSIDs
    #[arg(long, default_value = "0")]
    fib_table: u32,
}

/// Handle allocator used when no platform forwarding plane is
/// attached. Hands out sequential handles and tracks the aggregate
/// reference balance.
struct InProcessFwdProvider {
    next_index: AtomicU32,
    refs: AtomicI64,
}

impl InProcessFwdProvider {
    fn new() -> Self {
        Self {
            next_index: AtomicU32::new(1),
            refs: AtomicI64::new(0),
        }
    }
}

impl FwdProvider for InProcessFwdProvider {
    fn acquire(&self, fwd_type: FwdType, request: &FwdRequest) -> Result<FwdHandle, String> {
        let handle = FwdHandle {
            fwd_type,
            index: self.next_index.fetch_add(1, Ordering::SeqCst),
        };
        self.refs.fetch_add(1, Ordering::SeqCst);
        debug!("acquired {} for {:?}", handle, request);
        Ok(handle)
    }

    fn lock(&self, handle: FwdHandle) {
        self.refs.fetch_add(1, Ordering::SeqCst);
        debug!("locked {}", handle);
    }

    fn unlock(&self, handle: FwdHandle) {
        self.refs.fetch_sub(1, Ordering::SeqCst);
        debug!("unlocked {}", handle);
    }
}

fn main() -> ExitCode {
    let args = Args::parse();

    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(&args.log_level))
        .init();

    info!("====================================================================");
    info!("Starting srv6d");
    info!("====================================================================");
    info!("Default routing table: {}", args.fib_table);

    let provider = Arc::new(InProcessFwdProvider::new());
    let context = SrContext::new(provider);

    info!(
        "SR context ready: {} behaviors registered, {} policies, {} localsids, {} steering rules",
        context.localsids().registry().len(),
        context.policies().policy_count(),
        context.localsids().len(),
        context.steering().len()
    );

    // Management frontends drive the context from here; without one
    // attached there is nothing further to do.
    info!("srv6d initialized, no management frontend attached, exiting");
    ExitCode::SUCCESS
}
