pub type Result<T> = std::result::Result<T, crate::error::Error>;

/// Verifies that a range argument `from..to` is well-formed and within
/// `limit`, producing an `InvalidRange` error naming the failed operation
/// otherwise.
#[macro_export]
macro_rules! verify_range {
    ($name:expr, $from:expr, $to:expr, $limit:expr) => {{
        $crate::result::check_range($from as u64, $to as u64, $limit as u64, $name)?;
    }};
}

#[inline]
pub fn check_range(from: u64, to: u64, limit: u64, name: &str) -> Result<()> {
    if from <= to && to <= limit {
        Ok(())
    } else {
        range_failure(from, to, name)
    }
}

#[cold]
fn range_failure(from: u64, to: u64, name: &str) -> Result<()> {
    Err(crate::error::Error::invalid_range(name, from, to))
}
