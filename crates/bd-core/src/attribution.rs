//! Cause attribution for joined records.

/// Cause reported while the thread is blocked on I/O.
pub const IO_CAUSE: &str = "io";

/// Cause reported for interrupt context with no slice on the stack.
pub const IRQ_CAUSE: &str = "irq";

/// Maps one joined record to its cause.
///
/// Priority: I/O wait, then the slice label, then interrupt context, then
/// the thread state verbatim.
pub fn attribute_cause(
    slice_label: Option<&str>,
    thread_state: &str,
    io_wait: bool,
    irq_context: bool,
) -> String {
    if io_wait {
        return IO_CAUSE.to_string();
    }
    match slice_label {
        Some(label) => label.to_string(),
        None if irq_context => IRQ_CAUSE.to_string(),
        None => thread_state.to_string(),
    }
}
