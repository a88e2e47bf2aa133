//! Signal sinks.

/// Number of inputs of the hex display.
pub const DISPLAY_INPUTS: usize = 4;

/// Decodes display inputs into the shown digit, input 0 being the least
/// significant bit.
pub fn display_value(inputs: &[bool]) -> u8 {
    inputs
        .iter()
        .take(DISPLAY_INPUTS)
        .enumerate()
        .filter(|&(_, &bit)| bit)
        .fold(0u8, |acc, (i, _)| acc | (1 << i))
}
