pub mod behavioral;
pub mod driver;
pub mod engine;
pub mod fingerprint;
pub mod page;
pub mod stealth;

pub use driver::{WebDriverEngine, WebDriverLauncher};
pub use engine::{
    BrowserEngine, BrowserLauncher, BrowsingContext, LaunchOptions, NavigationOutcome,
};
pub use fingerprint::{ContextFingerprint, FingerprintRotator};
