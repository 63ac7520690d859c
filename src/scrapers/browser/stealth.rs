//! Fingerprint suppression for the automated session.
//!
//! Scripts are registered once per page and run before any page script on
//! every subsequent document.

/// Launch flags applied to every Chromium instance.
pub const STEALTH_ARGS: &[&str] = &[
    "--disable-blink-features=AutomationControlled",
    "--disable-infobars",
    "--disable-dev-shm-usage",
    "--no-first-run",
    "--no-default-browser-check",
    "--no-sandbox",
    "--disable-gpu",
    "--mute-audio",
    "--autoplay-policy=no-user-gesture-required",
    "--window-size=1920,1080",
];

pub const STEALTH_SCRIPTS: &[&str] = &[
    // Remove webdriver property
    r#"
    Object.defineProperty(navigator, 'webdriver', {
        get: () => undefined,
        configurable: true
    });
    "#,
    // Chrome object present on real desktop browsers
    r#"
    if (!window.chrome) {
        window.chrome = {
            runtime: {},
            loadTimes: function() {},
            csi: function() {},
            app: {}
        };
    }
    "#,
    r#"
    Object.defineProperty(navigator, 'plugins', {
        get: () => [
            { name: 'Chrome PDF Plugin', filename: 'internal-pdf-viewer', description: 'Portable Document Format' },
            { name: 'Chrome PDF Viewer', filename: 'mhjfbmdgcfjbbpaeojofohoefgiehjai', description: '' }
        ],
        configurable: true
    });
    "#,
    r#"
    Object.defineProperty(navigator, 'languages', {
        get: () => ['en-US', 'en'],
        configurable: true
    });
    "#,
    r#"
    if (window.navigator.permissions) {
        const originalQuery = window.navigator.permissions.query;
        window.navigator.permissions.query = (parameters) => (
            parameters.name === 'notifications' ?
            Promise.resolve({ state: Notification.permission }) :
            originalQuery(parameters)
        );
    }
    "#,
];

/// Chrome flags for one launch: fixed stealth flags, proxy, then user args.
pub fn launch_args(proxy: Option<&str>, extra: &[String]) -> Vec<String> {
    let mut args: Vec<String> = STEALTH_ARGS.iter().map(|a| a.to_string()).collect();
    if let Some(proxy) = proxy.filter(|p| !p.trim().is_empty()) {
        args.push(format!("--proxy-server={}", proxy.trim()));
    }
    args.extend(extra.iter().cloned());
    args
}
