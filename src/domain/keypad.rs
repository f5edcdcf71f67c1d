//! Digit payloads and the keystrokes they turn into.

/// A single synthetic key press
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Keystroke {
    /// Digit key, 0-9
    Digit(u8),
    Enter,
}

/// Host-wide keyboard input synthesis
pub trait KeystrokeInjector: Send + Sync + 'static {
    fn inject(&self, keys: &[Keystroke]) -> anyhow::Result<()>;
}

/// A payload that passed validation: one or more ASCII digits and nothing else.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DigitString(String);

impl DigitString {
    pub fn parse(text: &str) -> Option<Self> {
        if !text.is_empty() && text.bytes().all(|b| b.is_ascii_digit()) {
            Some(Self(text.to_string()))
        } else {
            None
        }
    }

    /// Decode a raw write payload. Every byte counts, including NULs and
    /// trailing whitespace, so those payloads are rejected.
    pub fn decode(payload: &[u8]) -> Option<Self> {
        std::str::from_utf8(payload).ok().and_then(Self::parse)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The digits in order, then Enter
    pub fn keystrokes(&self) -> Vec<Keystroke> {
        self.0
            .bytes()
            .map(|b| Keystroke::Digit(b - b'0'))
            .chain(std::iter::once(Keystroke::Enter))
            .collect()
    }
}
