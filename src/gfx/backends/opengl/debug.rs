//! Routing of driver debug output into the log.

use crate::gfx::backends::opengl::convert;
use crate::logging::LogMode;
use log::Level;

/// Level a driver message is logged at, or `None` when `mode` drops it.
pub fn classify(mode: LogMode, ty: u32, severity: u32) -> Option<Level> {
    match mode {
        LogMode::None => return None,
        LogMode::Default
            if severity == glow::DEBUG_SEVERITY_NOTIFICATION && ty == glow::DEBUG_TYPE_OTHER =>
        {
            return None;
        }
        LogMode::Default | LogMode::All => {}
    }

    Some(if ty == glow::DEBUG_TYPE_ERROR {
        Level::Error
    } else if severity != glow::DEBUG_SEVERITY_NOTIFICATION {
        Level::Warn
    } else {
        Level::Info
    })
}

pub fn on_message(mode: LogMode, ty: u32, severity: u32, message: &str) {
    if let Some(level) = classify(mode, ty, severity) {
        log::log!(
            level,
            "GL ({}:{}) {message}",
            convert::type_name(ty),
            convert::severity_name(severity)
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn errors_outrank_severity() {
        let level = classify(
            LogMode::Default,
            glow::DEBUG_TYPE_ERROR,
            glow::DEBUG_SEVERITY_NOTIFICATION,
        );
        assert_eq!(level, Some(Level::Error));
    }

    #[test]
    fn non_notification_severity_warns() {
        let level = classify(
            LogMode::Default,
            glow::DEBUG_TYPE_PERFORMANCE,
            glow::DEBUG_SEVERITY_LOW,
        );
        assert_eq!(level, Some(Level::Warn));
    }

    #[test]
    fn default_mode_drops_other_notifications() {
        let (ty, sev) = (glow::DEBUG_TYPE_OTHER, glow::DEBUG_SEVERITY_NOTIFICATION);
        assert_eq!(classify(LogMode::Default, ty, sev), None);
        assert_eq!(classify(LogMode::All, ty, sev), Some(Level::Info));
        assert_eq!(classify(LogMode::None, glow::DEBUG_TYPE_ERROR, sev), None);
    }
}
