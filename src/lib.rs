pub use cv_core as core;
pub use cv_depth as depth;
pub use cv_dnn as dnn;
pub use cv_imgproc as imgproc;
pub use cv_io as io;

/// Initialize a single global Rayon thread pool for all batch-parallel routines.
///
/// Call this once at application startup before evaluating large batches.
/// Repeated calls are idempotent and return the first initialization result.
///
/// Priority order:
/// 1. explicit `num_threads`
/// 2. `CVDEPTH_CPU_THREADS` env var
/// 3. Rayon default
pub fn init_thread_pool(num_threads: Option<usize>) -> cv_core::Result<()> {
    cv_core::init_global_thread_pool(num_threads)
}
