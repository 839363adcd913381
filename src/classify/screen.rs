// Call-Screen Heuristic
//
// Pure classification of a foreground-surface transition as
// "call-screen-like" or not, plus the monitored-app allowlist check.
// No I/O here; everything is a string predicate over a fixed table.

/// Surface-identity keywords that mark an active call interface.
const CALL_SCREEN_KEYWORDS: [&str; 7] = [
    "voip",
    "call",
    "incall",
    "incoming",
    "calling",
    "answer",
    "videoactive",
];

/// App identities eligible for VoIP-session tracking.
const MONITORED_APP_KEYWORDS: [&str; 4] = [
    "whatsapp",
    "telegram",
    "facebook.orca",
    "messenger",
];

/// Bare layout/view-group containers. These fire on every transition and
/// carry no signal, so events naming them are dropped before
/// classification.
const GENERIC_CONTAINERS: [&str; 3] = [
    "android.widget.FrameLayout",
    "android.view.ViewGroup",
    "android.view.View",
];

/// Result of classifying a single UI event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Classification {
    pub is_call_screen: bool,
    pub is_monitored_app: bool,
    pub app_identity: String,
}

/// Classify a `(app, surface)` pair.
///
/// Empty identities fail safe: they classify as neither a call screen nor
/// a monitored app.
pub fn classify(app_identity: &str, surface_identity: &str) -> Classification {
    Classification {
        is_call_screen: is_call_screen(surface_identity),
        is_monitored_app: is_monitored_app(app_identity),
        app_identity: app_identity.to_string(),
    }
}

/// Does this surface identity look like an active call interface?
///
/// Case-insensitive substring match against the fixed keyword set.
pub fn is_call_screen(surface_identity: &str) -> bool {
    if surface_identity.is_empty() {
        return false;
    }
    let lower = surface_identity.to_lowercase();
    CALL_SCREEN_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Is this app identity on the monitored messaging-app allowlist?
pub fn is_monitored_app(app_identity: &str) -> bool {
    if app_identity.is_empty() {
        return false;
    }
    let lower = app_identity.to_lowercase();
    MONITORED_APP_KEYWORDS.iter().any(|kw| lower.contains(kw))
}

/// Is this surface a bare container with no semantic name?
pub fn is_generic_container(surface_identity: &str) -> bool {
    GENERIC_CONTAINERS.contains(&surface_identity)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_call_screen_keywords() {
        assert!(is_call_screen("com.whatsapp.voipcalling.VoipActivityV2"));
        assert!(is_call_screen("com.whatsapp.calling.callscreen.CallScreen"));
        assert!(is_call_screen("org.telegram.ui.VoIPActivity"));
        assert!(is_call_screen("IncomingCallActivity"));
        assert!(is_call_screen("AnswerFragment"));
        assert!(is_call_screen("VideoActiveScreen"));
        assert!(is_call_screen("com.android.incallui.InCallActivity"));
    }

    #[test]
    fn test_call_screen_is_case_insensitive() {
        assert!(is_call_screen("CALLING"));
        assert!(is_call_screen("VoIp"));
    }

    #[test]
    fn test_non_call_surfaces() {
        assert!(!is_call_screen("com.whatsapp.HomeActivity"));
        assert!(!is_call_screen("org.telegram.ui.LaunchActivity"));
        assert!(!is_call_screen("SettingsFragment"));
    }

    #[test]
    fn test_monitored_apps() {
        assert!(is_monitored_app("com.whatsapp"));
        assert!(is_monitored_app("com.whatsapp.w4b"));
        assert!(is_monitored_app("org.telegram.messenger"));
        assert!(is_monitored_app("com.facebook.orca"));
        assert!(!is_monitored_app("com.android.chrome"));
        assert!(!is_monitored_app("com.spotify.music"));
    }

    #[test]
    fn test_empty_identities_fail_safe() {
        assert!(!is_call_screen(""));
        assert!(!is_monitored_app(""));

        let c = classify("", "");
        assert!(!c.is_call_screen);
        assert!(!c.is_monitored_app);
    }

    #[test]
    fn test_generic_containers() {
        assert!(is_generic_container("android.widget.FrameLayout"));
        assert!(is_generic_container("android.view.ViewGroup"));
        assert!(is_generic_container("android.view.View"));
        // Named surfaces are not containers, even when they embed one
        assert!(!is_generic_container("com.whatsapp.voipcalling.VoipActivityV2"));
        assert!(!is_generic_container("android.widget.FrameLayout$Inner"));
    }

    #[test]
    fn test_classify_bundles_both_predicates() {
        let c = classify("com.whatsapp", "com.whatsapp.voipcalling.VoipActivityV2");
        assert!(c.is_call_screen);
        assert!(c.is_monitored_app);
        assert_eq!(c.app_identity, "com.whatsapp");

        let c = classify("com.whatsapp", "com.whatsapp.HomeActivity");
        assert!(!c.is_call_screen);
        assert!(c.is_monitored_app);
    }
}
