/// Get platform name
pub fn get_platform_name() -> &'static str {
    #[cfg(target_os = "windows")]
    return "windows";

    #[cfg(target_os = "macos")]
    return "macos";

    #[cfg(target_os = "linux")]
    return "linux";

    #[cfg(not(any(target_os = "windows", target_os = "macos", target_os = "linux")))]
    return "unknown";
}

/// Flag selecting the number of echo requests for the system `ping`
pub fn ping_count_flag() -> &'static str {
    #[cfg(target_os = "windows")]
    return "-n";

    #[cfg(not(target_os = "windows"))]
    return "-c";
}

/// Arguments for a single-reply `ping` against `host`
pub fn single_ping_args(host: &str) -> Vec<String> {
    vec![ping_count_flag().to_string(), "1".to_string(), host.to_string()]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_platform_detection() {
        let platform = get_platform_name();
        assert!(["windows", "macos", "linux", "unknown"].contains(&platform));
    }

    #[test]
    fn test_single_ping_args() {
        let args = single_ping_args("192.168.0.83");
        assert_eq!(args.len(), 3);
        assert_eq!(args[1], "1");
        assert_eq!(args[2], "192.168.0.83");
        if cfg!(windows) {
            assert_eq!(args[0], "-n");
        } else {
            assert_eq!(args[0], "-c");
        }
    }
}
