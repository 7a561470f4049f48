/// Construct Chrome command‑line arguments for the engine.
///
/// `window` is the jittered window size; `user_agent` and `lang` come from
/// the context fingerprint so every session presents the same identity.
pub fn build_hardening_arguments(
    window: (u32, u32),
    user_agent: &str,
    lang: &str,
    headless: bool,
) -> Vec<String> {
    let mut args = vec![
        "--disable-blink-features=AutomationControlled".to_string(),
        "--no-sandbox".to_string(),
        "--disable-dev-shm-usage".to_string(),
        "--disable-accelerated-2d-canvas".to_string(),
        "--disable-gpu".to_string(),
        "--no-first-run".to_string(),
        "--no-zygote".to_string(),
        "--hide-scrollbars".to_string(),
        "--mute-audio".to_string(),
        format!("--window-size={},{}", window.0, window.1),
        format!("--user-agent={user_agent}"),
        format!("--lang={lang}"),
    ];
    if headless {
        args.push("--headless=new".to_string());
    }
    args
}

/// Headers a desktop Chrome sends on a top-level navigation.
pub fn realistic_headers() -> Vec<(String, String)> {
    [
        (
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,*/*;q=0.8",
        ),
        ("Accept-Language", "en-US,en;q=0.9"),
        ("Cache-Control", "max-age=0"),
        ("Upgrade-Insecure-Requests", "1"),
        ("Sec-Fetch-Dest", "document"),
        ("Sec-Fetch-Mode", "navigate"),
        ("Sec-Fetch-Site", "none"),
        ("Sec-Fetch-User", "?1"),
    ]
    .into_iter()
    .map(|(k, v)| (k.to_string(), v.to_string()))
    .collect()
}

/// JavaScript evasions applied before any page script runs.
pub struct StealthScripts;

impl StealthScripts {
    pub fn core_evasions() -> &'static str {
        r#"
            Object.defineProperty(navigator, 'webdriver', { get: () => undefined });
            Object.defineProperty(navigator, 'languages', {
                get: () => ['en-US', 'en']
            });
            window.addEventListener('mousemove', function () {
                window._lastMouseMove = Date.now();
            });
        "#
    }
}
