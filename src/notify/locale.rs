/// Language used to render a notification. Passed explicitly into every
/// render call; there is no process-wide active language.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Locale {
    En,
    Ru,
}

impl Locale {
    pub const SUPPORTED: [Locale; 2] = [Locale::En, Locale::Ru];

    /// Accepts bare codes and region variants (`ru`, `ru-RU`, `en_GB`).
    pub fn from_code(code: &str) -> Option<Self> {
        let primary = code
            .trim()
            .split(|c| c == '-' || c == '_')
            .next()
            .unwrap_or_default()
            .to_ascii_lowercase();
        match primary.as_str() {
            "en" => Some(Locale::En),
            "ru" => Some(Locale::Ru),
            _ => None,
        }
    }

    /// The recipient's preferred language, else the site default, else English.
    pub fn resolve(preferred: Option<&str>, default_code: &str) -> Self {
        preferred
            .filter(|code| !code.trim().is_empty())
            .and_then(Locale::from_code)
            .or_else(|| Locale::from_code(default_code))
            .unwrap_or(Locale::En)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Locale::En => "en",
            Locale::Ru => "ru",
        }
    }
}
