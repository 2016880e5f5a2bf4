pub mod batch;
pub mod run;

/// Maps an item or batch exit code onto a process exit status.
///
/// Codes outside 1..=255 that still signal failure become 1.
pub fn clamp_exit_code(code: i32) -> u8 {
    match u8::try_from(code) {
        Ok(code) => code,
        Err(_) => 1,
    }
}
