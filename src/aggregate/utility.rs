use rust_decimal::Decimal;

/// Mean of a decimal sum over `count` items. Returns zero for an empty
/// group rather than dividing by zero.
pub fn mean(sum: Decimal, count: u64) -> Decimal {
    if count == 0 {
        Decimal::ZERO
    } else {
        sum / Decimal::from(count)
    }
}
