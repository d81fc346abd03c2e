/// Structured per-subsystem debug logging (`debug_log!(COMMAND: "...")`),
/// routed through the `log` crate with the subsystem name as the target so
/// callers can filter per-module instead of crate-wide.
macro_rules! debug_log {
    ($target:ident: $($arg:tt)*) => {
        ::log::debug!(target: ::core::stringify!($target), $($arg)*)
    };
}

macro_rules! into_ok {
    ($expr: expr) => {
        match $expr {
            ::std::result::Result::Ok(ok) => ok,
            ::std::result::Result::Err(e) => match e {},
        }
    };
}

/// Declares a struct that implements `Drop` but also needs to move its
/// fields out whole (see `PartialRefMut::into_value`/`removing`). Emits the
/// struct plus a private `Destruct` twin and an `into_destruct` method that
/// relocates the fields without running `Self`'s destructor.
///
/// `[bounded generics]` is the full `<...>` parameter list (with trait
/// bounds, for the struct/impl declarations); `[bare names]` is the same
/// list with bounds stripped (for using the type as `$name<...>`).
macro_rules! into_non_drop {
    (
        $(#[$meta:meta])*
        $vis:vis struct $name:ident [$($generics:tt)*] [$($names:tt)*]
        {
            $($field_vis:vis $field:ident : $ty:ty),* $(,)?
        }
    ) => {
        $(#[$meta])*
        $vis struct $name<$($generics)*> {
            $($field_vis $field : $ty),*
        }

        #[allow(dead_code)]
        struct Destruct<$($generics)*> {
            $($field_vis $field : $ty),*
        }

        impl<$($generics)*> $name<$($names)*> {
            #[allow(dead_code)]
            fn into_destruct(self) -> Destruct<$($names)*> {
                let this = ::std::mem::ManuallyDrop::new(self);
                // SAFETY: `this` is never touched again and its `Drop` impl
                // (which only removes its own borrow-tracking entry) never
                // runs on this instance.
                unsafe {
                    Destruct {
                        $($field: ::std::ptr::read(&this.$field)),*
                    }
                }
            }
        }
    };
}

/// Implements `ExtendLifetime<'target>` for a single-lifetime-parameter
/// type by transmuting its lifetime. Used to let a borrow tracked by
/// `PartialBorrower` outlive the closure that produced it; soundness comes
/// from `PartialBorrower`'s own by-key bookkeeping, not from the compiler.
macro_rules! extend_lifetime {
    ($name:ident) => {
        unsafe impl<'__short, '__target> crate::engine::utils::ExtendLifetime<'__target>
            for $name<'__short>
        {
            type Extended = $name<'__target>;

            unsafe fn extend_lifetime(self) -> Self::Extended {
                unsafe { ::std::mem::transmute(self) }
            }
        }
    };
}
