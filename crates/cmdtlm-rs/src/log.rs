// crates/cmdtlm-rs/src/log.rs

/// Trait for structs that provide metadata for logging
pub trait LogMetadata {
    fn meta(&self) -> String;
}

impl<T: LogMetadata + ?Sized> LogMetadata for &T {
    fn meta(&self) -> String {
        (**self).meta()
    }
}

/// Names the packet a log line refers to.
pub struct PacketContext<'a> {
    pub target_name: &'a str,
    pub packet_name: &'a str,
}

impl LogMetadata for PacketContext<'_> {
    fn meta(&self) -> String {
        format!("{} {}", self.target_name, self.packet_name)
    }
}

impl LogMetadata for crate::packets::Packet {
    fn meta(&self) -> String {
        format!("{} {}", self.target_name(), self.packet_name())
    }
}

/// Logs `message` as a warning and appends it to the caller-visible list.
pub fn record_warning(warnings: &mut Vec<String>, message: String) {
    ::log::warn!("{}", message);
    warnings.push(message);
}

// =============================================
// Logging Macros (namespaced under crate::log)
// =============================================

// ===== pkt_debug! =====
macro_rules! pkt_debug {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::debug!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::debug!($fmt $(, $($arg)+)?);
    }};
}

// ===== pkt_trace! =====
macro_rules! pkt_trace {
    ($ctx:expr, $fmt:literal $(, $($arg:tt)+)?) => {{
        let meta = $crate::log::LogMetadata::meta(&$ctx);
        ::log::trace!(concat!("[{}] ", $fmt), meta $(, $($arg)+)?);
    }};
    ($fmt:literal $(, $($arg:tt)+)?) => {{
        ::log::trace!($fmt $(, $($arg)+)?);
    }};
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_warning_appends_message() {
        let mut warnings = Vec::new();
        record_warning(&mut warnings, "first".to_string());
        record_warning(&mut warnings, "second".to_string());
        assert_eq!(warnings, vec!["first".to_string(), "second".to_string()]);
    }

    #[test]
    fn test_packet_context_meta() {
        let ctx = PacketContext {
            target_name: "INST",
            packet_name: "HEALTH_STATUS",
        };
        assert_eq!(ctx.meta(), "INST HEALTH_STATUS");
    }
}
