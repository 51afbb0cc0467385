use num_traits::{Float, FromPrimitive};

pub fn mean<T: Float + FromPrimitive>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }

    let n = T::from_usize(values.len())?;
    let sum = values.iter().fold(T::zero(), |acc, &v| acc + v);

    Some(sum / n)
}

/// Median of the values; averages the two middle elements for even lengths.
pub fn median<T: Float + FromPrimitive>(values: &[T]) -> Option<T> {
    if values.is_empty() {
        return None;
    }

    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));

    let mid = sorted.len() / 2;

    if sorted.len() % 2 == 0 {
        let two = T::from_f32(2.0)?;
        Some((sorted[mid - 1] + sorted[mid]) / two)
    } else {
        Some(sorted[mid])
    }
}

/// Population standard deviation.
pub fn std_dev<T: Float + FromPrimitive>(values: &[T]) -> Option<T> {
    let m = mean(values)?;
    let n = T::from_usize(values.len())?;

    let var = values
        .iter()
        .fold(T::zero(), |acc, &v| acc + (v - m) * (v - m))
        / n;

    Some(var.sqrt())
}
