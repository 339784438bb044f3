//! A simple mutex API.
#![cfg_attr(not(feature = "std"), no_std)]

use core::ops::DerefMut;

/// A mutex.
pub trait Mutex {
    /// The type of the data that the mutex protects.
    type Data;

    /// The type of the guard that the `lock` method returns.
    type Guard<'a>: DerefMut<Target = Self::Data>
    where
        Self: 'a;

    /// Creates a new mutex.
    fn new(data: Self::Data) -> Self;

    /// Locks the mutex.
    fn lock(&self) -> Self::Guard<'_>;
}

#[cfg(feature = "std")]
mod std_mutex {
    use std::sync;

    /// [`super::Mutex`] backed by [`std::sync::Mutex`].
    ///
    /// Poisoning is treated as a bug in the owner thread and unwrapped.
    pub struct StdMutex<T>(sync::Mutex<T>);

    impl<T> super::Mutex for StdMutex<T> {
        type Data = T;

        type Guard<'a>
            = sync::MutexGuard<'a, T>
        where
            Self: 'a;

        fn new(data: Self::Data) -> Self {
            Self(sync::Mutex::new(data))
        }

        fn lock(&self) -> Self::Guard<'_> {
            self.0.lock().unwrap()
        }
    }
}

#[cfg(feature = "std")]
pub use self::std_mutex::StdMutex;
