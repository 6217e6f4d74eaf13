/// Builds an [`ArgumentPool`](crate::ArgumentPool) from positional values and `name = value` pairs,
/// keeping the written order.
///
/// # Examples
/// ```rust
/// use bindery::pool;
///
/// let pool = pool![2, 3, first = 1, "text"];
/// assert_eq!(pool.len(), 4);
/// ```
#[macro_export]
macro_rules! pool {
    (@push $pool:expr;) => {
        $pool
    };
    (@push $pool:expr; $name:ident = $value:expr $(, $($rest:tt)*)?) => {
        $crate::pool!(@push $pool.named(stringify!($name), $value); $($($rest)*)?)
    };
    (@push $pool:expr; $value:expr $(, $($rest:tt)*)?) => {
        $crate::pool!(@push $pool.positional($value); $($($rest)*)?)
    };
    () => {
        $crate::ArgumentPool::new()
    };
    ($($rest:tt)+) => {
        $crate::pool!(@push $crate::ArgumentPool::new(); $($rest)+)
    };
}
