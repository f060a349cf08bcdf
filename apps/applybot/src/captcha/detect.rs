//! Challenge detection over page source and iframe sources.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChallengeKind {
    Recaptcha,
    Turnstile,
}

impl fmt::Display for ChallengeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeKind::Recaptcha => f.write_str("reCAPTCHA"),
            ChallengeKind::Turnstile => f.write_str("Turnstile"),
        }
    }
}

const TURNSTILE_MARKERS: &[&str] = &[
    "cf-turnstile",
    "challenges.cloudflare.com",
    "verify you are human",
    "additional verification",
];

const RECAPTCHA_MARKERS: &[&str] = &["g-recaptcha", "i'm not a robot", "google.com/recaptcha"];

/// Which challenge, if any, the page shows. Turnstile is checked first because its
/// interstitial can embed reCAPTCHA fallbacks.
pub fn detect(page_source: &str, iframe_srcs: &[String]) -> Option<ChallengeKind> {
    let source = page_source.to_lowercase();
    let frames: Vec<String> = iframe_srcs.iter().map(|s| s.to_lowercase()).collect();
    let any_marker = |markers: &[&str]| {
        markers.iter().any(|m| source.contains(m))
            || frames.iter().any(|f| markers.iter().any(|m| f.contains(m)))
    };
    if any_marker(TURNSTILE_MARKERS) {
        Some(ChallengeKind::Turnstile)
    } else if any_marker(RECAPTCHA_MARKERS) || frames.iter().any(|f| f.contains("recaptcha")) {
        Some(ChallengeKind::Recaptcha)
    } else {
        None
    }
}

/// Site key from a challenge iframe's `k=` parameter, else from a `data-sitekey`
/// attribute in the page source.
pub fn extract_site_key(page_source: &str, iframe_srcs: &[String]) -> Option<String> {
    let from_frame = regex_lite::Regex::new(r"[?&]k=([^&#]+)").ok()?;
    let in_frames = iframe_srcs
        .iter()
        .filter(|s| {
            let s = s.to_lowercase();
            s.contains("recaptcha") || s.contains("turnstile") || s.contains("cloudflare")
        })
        .find_map(|s| from_frame.captures(s).and_then(|c| c.get(1)))
        .map(|m| m.as_str().to_string());
    if in_frames.is_some() {
        return in_frames;
    }
    let from_attr = regex_lite::Regex::new(r#"data-sitekey=["']([^"']+)["']"#).ok()?;
    from_attr
        .captures(page_source)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string())
}
