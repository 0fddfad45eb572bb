/// Number of base-10 digits in `n` (`0` still takes one column)
pub fn digit_width(mut n: usize) -> usize {
    let mut width = 0;
    loop {
        n /= 10;
        width += 1;
        if n == 0 {
            break;
        }
    }
    width
}

/// A run of spaces exactly as wide as the decimal rendering of `value`, for
/// blank gutter lines under a line number
pub fn gutter_pad(value: usize) -> String {
    " ".repeat(digit_width(value))
}
