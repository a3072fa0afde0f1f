use crate::location::LocationResolver;
use std::sync::{Mutex, MutexGuard};

pub struct AppState {
    pub resolver: Mutex<LocationResolver>,
}

impl AppState {
    pub fn new(resolver: LocationResolver) -> Self {
        Self {
            resolver: Mutex::new(resolver),
        }
    }

    /// A panic in one request must not take the resolver down for the rest.
    pub fn resolver(&self) -> MutexGuard<'_, LocationResolver> {
        self.resolver.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
