//! Utility maths functions

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use num_traits::Float;

/// Map a value from one range into another.
pub fn lin_map<T>(source_range: (T, T), target_range: (T, T), value: T) -> T
where 
    T: Float 
{
    target_range.0 
        + ((value - source_range.0) 
        * (target_range.1 - target_range.0) 
        / (source_range.1 - source_range.0))
}

/// Clamp a value into the range `[min, max]`.
pub fn clamp<T>(value: T, min: T, max: T) -> T 
where
    T: Float
{
    value.max(min).min(max)
}

/// Linearly interpolate into a lookup table.
///
/// `table` is a list of `(x, y)` pairs sorted by ascending `x`. Values outside the table are
/// held at the first or last `y`. Returns `None` if the table is empty.
pub fn interp_table<T>(table: &[(T, T)], x: T) -> Option<T>
where
    T: Float
{
    let first = table.first()?;
    let last = table.last()?;

    if x <= first.0 {
        return Some(first.1);
    }
    if x >= last.0 {
        return Some(last.1);
    }

    for pair in table.windows(2) {
        let (x0, y0) = pair[0];
        let (x1, y1) = pair[1];

        if x <= x1 {
            if x1 == x0 {
                return Some(y1);
            }
            return Some(lin_map((x0, x1), (y0, y1), x));
        }
    }

    Some(last.1)
}
