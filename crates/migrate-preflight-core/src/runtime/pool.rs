// crates/migrate-preflight-core/src/runtime/pool.rs
// ============================================================================
// Module: Bounded Worker Pool
// Description: Scoped-thread fan-out with a fixed concurrency bound.
// Purpose: Run independent scopes in parallel while preserving input order.
// Dependencies: std
// ============================================================================

//! ## Overview
//! Scopes are independent, so the pool needs no shared mutable state beyond
//! a work index: each worker claims the next item, computes its result, and
//! the pool reassembles results in input order. Saturation queues additional
//! scopes behind the bound.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::sync::Mutex;
use std::sync::atomic::AtomicUsize;
use std::sync::atomic::Ordering;
use std::thread;

// ============================================================================
// SECTION: Parallelism Defaults
// ============================================================================

/// Upper bound on the default pool size.
const MAX_DEFAULT_PARALLELISM: usize = 8;

/// Default worker bound: `min(cpus * 2, 8)`, at least 1.
#[must_use]
pub fn default_parallelism() -> usize {
    thread::available_parallelism()
        .map_or(1, |cpus| cpus.get().saturating_mul(2))
        .clamp(1, MAX_DEFAULT_PARALLELISM)
}

// ============================================================================
// SECTION: Bounded Execution
// ============================================================================

/// Applies `work` to every item with at most `parallelism` workers.
///
/// Results are returned in input order regardless of completion order.
pub fn run_bounded<T, R, F>(parallelism: usize, items: &[T], work: F) -> Vec<R>
where
    T: Sync,
    R: Send,
    F: Fn(usize, &T) -> R + Sync,
{
    if parallelism <= 1 || items.len() <= 1 {
        return items.iter().enumerate().map(|(index, item)| work(index, item)).collect();
    }

    let workers = parallelism.min(items.len());
    let next = AtomicUsize::new(0);
    let collected = Mutex::new(Vec::with_capacity(items.len()));

    thread::scope(|scope| {
        for _ in 0..workers {
            scope.spawn(|| {
                let mut local: Vec<(usize, R)> = Vec::new();
                loop {
                    let index = next.fetch_add(1, Ordering::SeqCst);
                    if index >= items.len() {
                        break;
                    }
                    local.push((index, work(index, &items[index])));
                }
                let mut collected =
                    collected.lock().unwrap_or_else(std::sync::PoisonError::into_inner);
                collected.append(&mut local);
            });
        }
    });

    let mut collected =
        collected.into_inner().unwrap_or_else(std::sync::PoisonError::into_inner);
    collected.sort_by_key(|(index, _)| *index);
    collected.into_iter().map(|(_, result)| result).collect()
}
