//! Types and traits specific to time-keeping and timestamped streams.

/// Event time in milliseconds. This is the time domain all provided operators work in.
pub type EventTime = i64;

/// Trait implemented by all types usable as timestamps in Firewatch
pub trait Timestamp: Ord + Clone + Send + std::fmt::Debug + 'static {
    /// Maximum or final value of this type. This is the last possible timestamp.
    /// A watermark of `MAX` means the input is complete.
    const MAX: Self;
    /// Minimum value of this type.
    const MIN: Self;

    /// Merges two timestamps. Merging is used to align watermarks coming from
    /// multiple inputs. Merging must yield the lowest common timestamp of the two values,
    /// for numeric types this is the minimum.
    fn merge(&self, other: &Self) -> Self;
}

/// Implements `Timestamp` for numeric types
macro_rules! timestamp_impl {
    ($t:ty) => {
        impl Timestamp for $t {
            const MAX: $t = <$t>::MAX;
            const MIN: $t = <$t>::MIN;

            fn merge(&self, other: &$t) -> $t {
                *self.min(other)
            }
        }
    };
}

timestamp_impl!(usize);
timestamp_impl!(u8);
timestamp_impl!(u16);
timestamp_impl!(u32);
timestamp_impl!(u64);
timestamp_impl!(u128);

timestamp_impl!(isize);
timestamp_impl!(i8);
timestamp_impl!(i16);
timestamp_impl!(i32);
timestamp_impl!(i64);
timestamp_impl!(i128);
