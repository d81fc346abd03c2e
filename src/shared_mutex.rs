//! This module provides (simplified) implementation of [Mutex in C#].
//!
//! This implementation only supports locks in `Global\\` namespace for simplicity.
//!
//! On windows, this module is based on shared windows mutex ([`CreateMutexExW`])
//! and this is machine-shared lock.
//!
//! [Mutex in C#]: https://learn.microsoft.com/en-us/dotnet/api/system.threading.mutex?view=net-8.0
//! [`CreateMutexExW`]: windows::Win32::System::Threading::CreateMutexExW

#[cfg(windows)]
use windows::*;

use std::ffi::OsStr;
use std::io;

/// The Shared Mutex
pub struct SharedMutex {
    inner: SharedMutexImpl,
}

pub struct SharedMutexGuard<'a> {
    inner: MutexGuardImpl<'a>,
}

impl SharedMutex {
    pub fn new(name: impl AsRef<OsStr>) -> io::Result<SharedMutex> {
        let name = name.as_ref();
        let name_bytes = name.as_encoded_bytes();

        if !name_bytes.starts_with(b"Global\\") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Global Mutex is only supported",
            ));
        }

        let global_name = &name_bytes[b"Global\\".len()..];

        if !global_name
            .iter()
            .all(|&x| matches!(x, b'0'..=b'9' | b'A'..=b'Z' | b'a'..=b'z' | b'.'| b'-'| b'_'))
        {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Invalid character in mutex name",
            ));
        }

        Ok(SharedMutex {
            inner: SharedMutexImpl::new(name)?,
        })
    }

    pub fn lock(&self) -> io::Result<SharedMutexGuard> {
        Ok(SharedMutexGuard { inner: self.inner.lock()? })
    }
}

#[allow(dead_code)]
fn _type_check() {
    use crate::utils::checker::*;

    check_sync_send(dummy::<SharedMutex>());
}

#[cfg(windows)]
mod windows {
    use std::ffi::OsStr;
    use std::io;
    use std::marker::PhantomData;
    use std::ops::Deref;
    use windows::Win32::Foundation::*;
    use windows::Win32::System::SystemServices::MAXIMUM_ALLOWED;
    use windows::Win32::System::Threading::*;
    use windows::core::{Free, Owned};

    // https://github.com/dotnet/runtime/blob/2fef8277b701cfa6636d8ab55c14da6e001b9218/src/libraries/System.Private.CoreLib/src/System/Threading/EventWaitHandle.Windows.cs#L12
    const ACCESS_RIGHTS: u32 = MAXIMUM_ALLOWED | PROCESS_SYNCHRONIZE.0 | MUTEX_MODIFY_STATE.0;

    #[derive(Copy, Clone)]
    #[repr(transparent)]
    struct SendHandle(HANDLE);
    unsafe impl Send for SendHandle {}

    impl Free for SendHandle {
        unsafe fn free(&mut self) {
            self.0.free();
        }
    }

    pub(super) struct SharedMutexImpl {
        handle: Owned<SendHandle>,
    }

    pub(super) struct MutexGuardImpl<'a> {
        handle: SendHandle,
        _phantom: PhantomData<&'a SharedMutexImpl>,
    }

    impl SharedMutexImpl {
        pub fn new(name: &OsStr) -> io::Result<Self> {
            let name = windows::core::HSTRING::from(name);

            let handle = match unsafe { CreateMutexExW(None, &name, 0, ACCESS_RIGHTS) } {
                Ok(handle) => SendHandle(handle),
                Err(e) => return Err(e.into()),
            };

            Ok(Self {
                handle: unsafe { Owned::new(handle) },
            })
        }

        pub fn lock(&self) -> io::Result<MutexGuardImpl> {
            let handle = *self.handle.deref();

            unsafe {
                match WaitForSingleObject(handle.0, INFINITE) {
                    WAIT_FAILED => return Err(io::Error::last_os_error()),
                    WAIT_ABANDONED => {
                        return Err(io::Error::new(
                            io::ErrorKind::Deadlock,
                            "The mutex is held by another thread and the thread exited with lock in kept.",
                        ));
                    }
                    _ => {}
                }
            }

            Ok(MutexGuardImpl {
                handle,
                _phantom: PhantomData,
            })
        }
    }

    impl Drop for MutexGuardImpl<'_> {
        fn drop(&mut self) {
            unsafe {
                ReleaseMutex(self.handle.0).ok();
            }
        }
    }
}
