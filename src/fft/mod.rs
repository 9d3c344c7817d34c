pub mod radix2;

use lazy_static::lazy_static;
use num_complex::Complex32;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;

/// Base interface for all DFT implementations.
pub trait DFTBase: Send + Sync {
    /// Forward transform of `buffer` in place.
    fn xform_inplace(&self, buffer: &mut [Complex32]);

    fn name(&self) -> String;
    fn size(&self) -> usize;
}

lazy_static! {
    static ref PLAN_CACHE: Mutex<HashMap<usize, Arc<dyn DFTBase>>> = Mutex::new(HashMap::new());
}

/// Returns a DFT plan for size `n`, reusing a cached plan when one exists.
///
/// Only power-of-two sizes are planned; the analyser rejects anything else
/// before it gets here.
pub fn find_dft(n: usize) -> Arc<dyn DFTBase> {
    // Cached plan lookup.
    {
        let cache = PLAN_CACHE.lock();
        if let Some(plan) = cache.get(&n) {
            return plan.clone();
        }
    }

    debug_assert!(n.is_power_of_two(), "DFT size {} is not a power of two", n);
    let plan: Arc<dyn DFTBase> = Arc::new(radix2::DFTRadix2::new(n));
    log::debug!("Planned {}", plan.name());

    // Cache the plan.
    let mut cache = PLAN_CACHE.lock();
    cache.insert(n, plan.clone());
    plan
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn plans_are_cached_per_size() {
        let a = find_dft(64);
        let b = find_dft(64);
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(a.size(), 64);
        assert_ne!(find_dft(128).size(), a.size());
    }
}
