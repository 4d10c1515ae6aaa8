/// Read a console setting from the environment, falling back to the default
/// declared in [`crate::config`].
#[macro_export]
macro_rules! get_krkn_setting {
    ($setting:ident) => {
        ::std::env::var(stringify!($setting))
            .unwrap_or($crate::config::$setting.to_string())
    };
    ($setting:ident, usize) => {
        match ::std::env::var(stringify!($setting)) {
            Ok(v) => match v.trim().parse::<usize>() {
                Ok(i) => i,
                Err(_e) => {
                    ::log::warn!(
                        "Env var setting {}, is not a valid unsigned integer. Using default",
                        stringify!($setting)
                    );
                    $crate::config::$setting
                }
            },
            Err(_e) => $crate::config::$setting,
        }
    };
    ($setting:ident, bool) => {
        match ::std::env::var(stringify!($setting)) {
            Ok(v) => match v.trim().to_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => true,
                "0" | "false" | "no" | "off" => false,
                _ => {
                    ::log::warn!(
                        "Env var setting {}, is not a valid boolean. Using default",
                        stringify!($setting)
                    );
                    $crate::config::$setting
                }
            },
            Err(_e) => $crate::config::$setting,
        }
    };
}

#[cfg(test)]
mod tests {
    use crate::config;

    #[test]
    fn test_string_setting_default() {
        std::env::remove_var("KRKN_DEFAULT_SCENARIO_IMAGE");
        assert_eq!(
            get_krkn_setting!(KRKN_DEFAULT_SCENARIO_IMAGE),
            config::KRKN_DEFAULT_SCENARIO_IMAGE
        );
    }

    #[test]
    fn test_usize_setting_override() {
        std::env::set_var("KRKN_RUN_POLL_INTERVAL_MS", "1234");
        assert_eq!(get_krkn_setting!(KRKN_RUN_POLL_INTERVAL_MS, usize), 1234);
        std::env::remove_var("KRKN_RUN_POLL_INTERVAL_MS");
    }

    #[test]
    fn test_usize_setting_invalid_falls_back() {
        std::env::set_var("KRKN_LOG_RECONNECT_MAX_MS", "soon");
        assert_eq!(
            get_krkn_setting!(KRKN_LOG_RECONNECT_MAX_MS, usize),
            config::KRKN_LOG_RECONNECT_MAX_MS
        );
        std::env::remove_var("KRKN_LOG_RECONNECT_MAX_MS");
    }

    #[test]
    fn test_bool_setting() {
        std::env::set_var("KRKN_DEBUG_MODE", "TRUE");
        assert!(get_krkn_setting!(KRKN_DEBUG_MODE, bool));
        std::env::set_var("KRKN_DEBUG_MODE", "maybe");
        assert_eq!(get_krkn_setting!(KRKN_DEBUG_MODE, bool), config::KRKN_DEBUG_MODE);
        std::env::remove_var("KRKN_DEBUG_MODE");
    }
}
